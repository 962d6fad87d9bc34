//! Command handlers

pub mod config;
pub mod homework;
pub mod settings;
pub mod status;
pub mod sync;
