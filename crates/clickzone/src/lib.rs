//! # clickzone
//!
//! Global input hook multiplexer with a click remapping engine.
//!
//! Subscribers register for typed mouse and keyboard events through
//! [`application::hook_manager::HookManager`]; the manager installs the native
//! low-level hook for a device class only while that class has subscribers.
//! [`application::remap::RemapEngine`] is the built-in subscriber that moves
//! every physical left click into a configured target zone.

pub mod application;
pub mod infrastructure;
