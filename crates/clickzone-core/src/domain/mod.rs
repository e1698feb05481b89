//! Domain entities for clickzone.
//!
//! This module contains pure logic with no infrastructure dependencies.  It
//! can be compiled and tested on any platform: nothing in here installs a hook
//! or moves a cursor.  The application layer feeds these types with data
//! coming from the platform adapter and acts on what they decide.

/// Typed events handed to subscribers.
pub mod event;

/// Raw hook payloads as delivered by the platform.
pub mod notification;

/// Application-level double-click recognition.
pub mod double_click;

/// Target rectangle and the click coordinate transform.
pub mod zone;
