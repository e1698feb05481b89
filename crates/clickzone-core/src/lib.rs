//! # clickzone-core
//!
//! Shared library for clickzone containing the typed input event model, the raw
//! hook notification payloads, double-click recognition, and the target-zone
//! coordinate transform.
//!
//! This crate has zero dependencies on OS APIs.  Everything that talks to the
//! operating system (hook installation, cursor movement, synthetic input) lives
//! in the `clickzone` crate behind traits.
//!
//! # Architecture overview
//!
//! clickzone listens to every mouse and keyboard notification on the system
//! through a global low-level hook, turns each raw notification into typed
//! events, and hands those events to subscribers.  One subscriber, the remap
//! engine, swallows physical left clicks and replays them inside a smaller
//! rectangle of the screen (the "target zone").
//!
//! - **`domain`** – Pure data types and state machines: events, notifications,
//!   the double-click detector and the target zone.
//!
//! - **`keymap`** – Virtual-key helpers used when a key-down has to be turned
//!   into the character it produces.

pub mod domain;
pub mod keymap;

pub use domain::double_click::{DoubleClickDetector, DoubleClickState};
pub use domain::event::{
    DeviceClass, EventKind, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
    Point,
};
pub use domain::notification::{
    Disposition, KeyMessage, KeyboardNotification, MouseAction, MouseMessage, MouseNotification,
};
pub use domain::zone::{ScreenSize, TargetZone, ZoneError};
