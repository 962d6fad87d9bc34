//! Sync command handler

use anyhow::{bail, Result};

use diary_core::remote::RemoteStore;
use diary_core::storage::StorageArea;
use diary_core::{Diary, SyncError, SyncOutcome};

use crate::output::Output;

/// Sync with the remote store now
pub async fn sync<A, R>(diary: &Diary<A, R>, output: &Output) -> Result<()>
where
    A: StorageArea + 'static,
    R: RemoteStore + 'static,
{
    output.message("Syncing with remote store...");

    match diary.manual_sync().await {
        Ok(outcome) => report(&outcome, output),
        Err(SyncError::NoSyncCode) => bail!(
            "No sync code configured. Set one with:\n  \
             diary settings set sync_code <code>"
        ),
        Err(e) => Err(e.into()),
    }
}

/// Print the result of a sync cycle; failures become errors
pub fn report(outcome: &SyncOutcome, output: &Output) -> Result<()> {
    match outcome {
        SyncOutcome::Merged => output.success("Data synchronized"),
        SyncOutcome::Uploaded => output.success("Data uploaded to remote store"),
        SyncOutcome::Skipped => {}
        SyncOutcome::Failed { message, transient } => {
            if *transient {
                bail!("{}\n{}", message, RETRY_HINT);
            }
            bail!("{}", message);
        }
    }
    Ok(())
}

const RETRY_HINT: &str = "Local changes are saved; the next sync will try again.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_report_transient_failure_hints_retry() {
        let output = Output::new(OutputFormat::Quiet);
        let err = report(
            &SyncOutcome::Failed {
                message: "Sync failed: Network error: timed out".to_string(),
                transient: true,
            },
            &output,
        )
        .unwrap_err();
        assert!(err.to_string().contains(RETRY_HINT));

        let err = report(
            &SyncOutcome::Failed {
                message: "Sync failed: Invalid remote document".to_string(),
                transient: false,
            },
            &output,
        )
        .unwrap_err();
        assert!(!err.to_string().contains(RETRY_HINT));
    }

    #[test]
    fn test_report_success_and_skip() {
        let output = Output::new(OutputFormat::Quiet);
        assert!(report(&SyncOutcome::Merged, &output).is_ok());
        assert!(report(&SyncOutcome::Skipped, &output).is_ok());
    }
}
