//! The OS boundary seen by the application layer.
//!
//! Hook installation, screen metrics, cursor control and synthetic input are
//! all platform primitives.  They are expressed here as traits so the hook
//! manager, translator and remap engine can be exercised against the
//! in-memory platform in `infrastructure::platform::mock`.

use std::sync::Arc;
use std::time::Duration;

use clickzone_core::{
    DeviceClass, Disposition, KeyboardNotification, MouseNotification, Point, ScreenSize,
};
use thiserror::Error;

/// Failure reported by a platform primitive.
///
/// `code` is the OS error code where one exists.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("hook installation refused (os error {code})")]
    HookInstall { code: i32 },
    #[error("hook removal failed (os error {code})")]
    HookRemove { code: i32 },
    #[error("synthetic input injection failed: {0}")]
    Inject(String),
    #[error("cursor query or move failed: {0}")]
    Cursor(String),
    #[error("hook thread unavailable: {0}")]
    HookThread(String),
    #[error("platform not supported: {0}")]
    Unsupported(String),
}

/// An installed hook.  Owned by the hook manager and released exactly once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct HookHandle {
    class: DeviceClass,
    raw: isize,
}

impl HookHandle {
    pub fn new(class: DeviceClass, raw: isize) -> Self {
        Self { class, raw }
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    /// The native handle value.
    pub fn raw(&self) -> isize {
        self.raw
    }
}

/// Shift and Caps Lock state sampled while translating a key-down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockKeyState {
    pub shift_down: bool,
    pub caps_lock_on: bool,
}

/// Receiver of raw notifications, called from the hook callback context.
pub trait NotificationSink: Send + Sync {
    /// Handles one mouse notification.  Position overrides are written into
    /// `notification` before this returns.
    fn on_mouse(&self, notification: &mut MouseNotification) -> Disposition;

    fn on_keyboard(&self, notification: &KeyboardNotification) -> Disposition;
}

/// Hook installation and the input queries the translator and remap engine need.
pub trait HookPlatform: Send + Sync {
    /// Installs the global low-level hook for `class`, routing its callbacks to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::HookInstall`] if the OS refuses the hook.
    fn install_hook(
        &self,
        class: DeviceClass,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<HookHandle, PlatformError>;

    /// Removes a hook previously returned by [`HookPlatform::install_hook`].
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::HookRemove`] if the OS reports a failure.
    fn remove_hook(&self, handle: HookHandle) -> Result<(), PlatformError>;

    /// Runs install and remove requests queued for the calling thread.
    ///
    /// The hook manager calls this while it waits for another thread's
    /// install or removal to finish.  A platform that serves those requests
    /// on its hook thread must run them here when called from that thread,
    /// otherwise a handler waiting inside a callback would block the very
    /// request it is waiting for.
    fn service_pending(&self) {}

    /// Primary screen size in pixels.
    fn screen_size(&self) -> ScreenSize;

    /// Current system cursor position.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Cursor`] if the position cannot be read.
    fn cursor_position(&self) -> Result<Point, PlatformError>;

    /// # Errors
    ///
    /// Returns [`PlatformError::Cursor`] if the cursor cannot be moved.
    fn set_cursor_position(&self, position: Point) -> Result<(), PlatformError>;

    /// The system double-click interval.
    fn double_click_time(&self) -> Duration;

    /// The single character `notification` produces on the active layout, if any.
    fn key_char(&self, notification: &KeyboardNotification) -> Option<char>;

    fn lock_key_state(&self) -> LockKeyState;
}

/// Synthetic left-click injection.
#[cfg_attr(test, mockall::automock)]
pub trait ClickInjector: Send + Sync {
    /// Injects a left press and release at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Inject`] if the OS rejects the input.
    fn inject_click(&self, position: Point) -> Result<(), PlatformError>;
}
