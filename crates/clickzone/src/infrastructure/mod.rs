//! Infrastructure layer: OS adapters and configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `clickzone_core`, but MUST NOT be imported by the application layer
//! outside of tests.

pub mod platform;
pub mod storage;
