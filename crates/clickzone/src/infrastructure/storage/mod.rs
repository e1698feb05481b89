//! Persistent storage for clickzone settings.

pub mod config;
