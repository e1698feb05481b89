//! In-memory platform for tests and benchmarks.
//!
//! [`MockPlatform`] records hook installs and removals, cursor moves and
//! injected clicks, and lets callers fire raw notifications at whatever sink
//! is currently hooked, as if they came from hardware.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use clickzone_core::keymap::us_layout_char;
use clickzone_core::{
    DeviceClass, Disposition, KeyMessage, KeyboardNotification, MouseMessage, MouseNotification,
    Point, ScreenSize,
};

use crate::application::platform::{
    ClickInjector, HookHandle, HookPlatform, LockKeyState, NotificationSink, PlatformError,
};

/// OS error code reported for refused installs (ERROR_ACCESS_DENIED).
const ACCESS_DENIED: i32 = 5;
/// OS error code reported for failed removals (ERROR_INVALID_HOOK_HANDLE).
const INVALID_HOOK_HANDLE: i32 = 1404;

#[derive(Default)]
struct ClassState {
    hooks: Vec<(isize, Arc<dyn NotificationSink>)>,
    installs: usize,
    removes: usize,
    peak: usize,
}

struct MockState {
    classes: HashMap<DeviceClass, ClassState>,
    next_raw: isize,
    fail_install: bool,
    fail_remove: bool,
    fail_inject: bool,
    fail_cursor: bool,
    screen: ScreenSize,
    cursor: Point,
    cursor_moves: Vec<Point>,
    clicks: Vec<Point>,
    double_click_time: Duration,
    locks: LockKeyState,
}

/// A recording [`HookPlatform`] and [`ClickInjector`].
pub struct MockPlatform {
    state: Mutex<MockState>,
}

impl MockPlatform {
    /// A 1920×1080 screen, cursor at the origin, 500 ms double-click time.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                classes: HashMap::new(),
                next_raw: 0x1000,
                fail_install: false,
                fail_remove: false,
                fail_inject: false,
                fail_cursor: false,
                screen: ScreenSize::new(1920, 1080),
                cursor: Point::default(),
                cursor_moves: Vec::new(),
                clicks: Vec::new(),
                double_click_time: Duration::from_millis(500),
                locks: LockKeyState::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_fail_install(&self, fail: bool) {
        self.lock().fail_install = fail;
    }

    pub fn set_fail_remove(&self, fail: bool) {
        self.lock().fail_remove = fail;
    }

    pub fn set_fail_inject(&self, fail: bool) {
        self.lock().fail_inject = fail;
    }

    /// Makes [`HookPlatform::cursor_position`] fail.
    pub fn set_fail_cursor(&self, fail: bool) {
        self.lock().fail_cursor = fail;
    }

    pub fn set_screen_size(&self, screen: ScreenSize) {
        self.lock().screen = screen;
    }

    /// Places the cursor without recording a move.
    pub fn set_cursor(&self, position: Point) {
        self.lock().cursor = position;
    }

    pub fn set_double_click_time(&self, interval: Duration) {
        self.lock().double_click_time = interval;
    }

    pub fn set_lock_keys(&self, shift_down: bool, caps_lock_on: bool) {
        self.lock().locks = LockKeyState {
            shift_down,
            caps_lock_on,
        };
    }

    pub fn is_installed(&self, class: DeviceClass) -> bool {
        self.lock()
            .classes
            .get(&class)
            .map_or(false, |state| !state.hooks.is_empty())
    }

    pub fn install_count(&self, class: DeviceClass) -> usize {
        self.lock().classes.get(&class).map_or(0, |state| state.installs)
    }

    pub fn remove_count(&self, class: DeviceClass) -> usize {
        self.lock().classes.get(&class).map_or(0, |state| state.removes)
    }

    /// Largest number of hooks of `class` that were ever installed at once.
    pub fn peak_installed(&self, class: DeviceClass) -> usize {
        self.lock().classes.get(&class).map_or(0, |state| state.peak)
    }

    /// Positions passed to [`HookPlatform::set_cursor_position`], oldest first.
    pub fn cursor_moves(&self) -> Vec<Point> {
        self.lock().cursor_moves.clone()
    }

    /// Positions passed to [`ClickInjector::inject_click`], oldest first.
    pub fn clicks(&self) -> Vec<Point> {
        self.lock().clicks.clone()
    }

    fn sink(&self, class: DeviceClass) -> Option<Arc<dyn NotificationSink>> {
        self.lock()
            .classes
            .get(&class)
            .and_then(|state| state.hooks.last())
            .map(|(_, sink)| Arc::clone(sink))
    }

    /// Delivers `notification` to the installed mouse hook.
    ///
    /// Returns the disposition and the notification as rewritten by the
    /// handlers.  Without an installed hook the notification is forwarded
    /// untouched.
    pub fn fire(&self, mut notification: MouseNotification) -> (Disposition, MouseNotification) {
        // The sink is cloned out first so handlers may call back into the platform.
        let disposition = match self.sink(DeviceClass::Mouse) {
            Some(sink) => sink.on_mouse(&mut notification),
            None => Disposition::Forward,
        };
        (disposition, notification)
    }

    pub fn fire_mouse(&self, message: MouseMessage, position: Point) -> (Disposition, MouseNotification) {
        self.fire(MouseNotification::new(message, position))
    }

    pub fn fire_wheel(&self, position: Point, delta: i16) -> (Disposition, MouseNotification) {
        self.fire(MouseNotification::wheel(position, delta))
    }

    pub fn fire_keyboard(&self, message: KeyMessage, vk_code: u32) -> Disposition {
        let notification = KeyboardNotification::new(message, vk_code);
        match self.sink(DeviceClass::Keyboard) {
            Some(sink) => sink.on_keyboard(&notification),
            None => Disposition::Forward,
        }
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HookPlatform for MockPlatform {
    fn install_hook(
        &self,
        class: DeviceClass,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<HookHandle, PlatformError> {
        let mut state = self.lock();
        if state.fail_install {
            return Err(PlatformError::HookInstall { code: ACCESS_DENIED });
        }
        state.next_raw += 1;
        let raw = state.next_raw;
        let class_state = state.classes.entry(class).or_default();
        class_state.hooks.push((raw, sink));
        class_state.installs += 1;
        class_state.peak = class_state.peak.max(class_state.hooks.len());
        Ok(HookHandle::new(class, raw))
    }

    fn remove_hook(&self, handle: HookHandle) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if state.fail_remove {
            return Err(PlatformError::HookRemove {
                code: INVALID_HOOK_HANDLE,
            });
        }
        let class_state = state.classes.entry(handle.class()).or_default();
        let index = class_state
            .hooks
            .iter()
            .position(|(raw, _)| *raw == handle.raw())
            .ok_or(PlatformError::HookRemove {
                code: INVALID_HOOK_HANDLE,
            })?;
        class_state.hooks.remove(index);
        class_state.removes += 1;
        Ok(())
    }

    fn screen_size(&self) -> ScreenSize {
        self.lock().screen
    }

    fn cursor_position(&self) -> Result<Point, PlatformError> {
        let state = self.lock();
        if state.fail_cursor {
            return Err(PlatformError::Cursor("cursor position unavailable".into()));
        }
        Ok(state.cursor)
    }

    fn set_cursor_position(&self, position: Point) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state.cursor = position;
        state.cursor_moves.push(position);
        Ok(())
    }

    fn double_click_time(&self) -> Duration {
        self.lock().double_click_time
    }

    fn key_char(&self, notification: &KeyboardNotification) -> Option<char> {
        let shift_down = self.lock().locks.shift_down;
        // Letters come back unshifted; case is applied by the translator.
        let ch = us_layout_char(notification.vk_code, shift_down)?;
        Some(if ch.is_ascii_alphabetic() {
            ch.to_ascii_lowercase()
        } else {
            ch
        })
    }

    fn lock_key_state(&self) -> LockKeyState {
        self.lock().locks
    }
}

impl ClickInjector for MockPlatform {
    fn inject_click(&self, position: Point) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if state.fail_inject {
            return Err(PlatformError::Inject("injection blocked".into()));
        }
        state.clicks.push(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSink;

    impl NotificationSink for CountingSink {
        fn on_mouse(&self, notification: &mut MouseNotification) -> Disposition {
            notification.position = Point::new(1, 1);
            Disposition::Suppress
        }

        fn on_keyboard(&self, _notification: &KeyboardNotification) -> Disposition {
            Disposition::Suppress
        }
    }

    #[test]
    fn test_fire_without_hook_forwards_untouched() {
        let platform = MockPlatform::new();

        let (disposition, n) = platform.fire_mouse(MouseMessage::Move, Point::new(9, 9));

        assert_eq!(disposition, Disposition::Forward);
        assert_eq!(n.position, Point::new(9, 9));
    }

    #[test]
    fn test_fire_reaches_installed_sink() {
        // Arrange
        let platform = MockPlatform::new();
        platform.install_hook(DeviceClass::Mouse, Arc::new(CountingSink)).unwrap();

        // Act
        let (disposition, n) = platform.fire_mouse(MouseMessage::LeftDown, Point::new(9, 9));

        // Assert
        assert_eq!(disposition, Disposition::Suppress);
        assert_eq!(n.position, Point::new(1, 1));
        assert_eq!(platform.fire_keyboard(KeyMessage::KeyDown, 0x41), Disposition::Forward);
    }

    #[test]
    fn test_remove_unknown_handle_fails() {
        let platform = MockPlatform::new();

        let result = platform.remove_hook(HookHandle::new(DeviceClass::Keyboard, 42));

        assert!(matches!(result, Err(PlatformError::HookRemove { .. })));
    }

    #[test]
    fn test_peak_tracks_overlapping_installs() {
        let platform = MockPlatform::new();
        let a = platform.install_hook(DeviceClass::Mouse, Arc::new(CountingSink)).unwrap();
        platform.install_hook(DeviceClass::Mouse, Arc::new(CountingSink)).unwrap();
        platform.remove_hook(a).unwrap();

        assert_eq!(platform.peak_installed(DeviceClass::Mouse), 2);
        assert_eq!(platform.install_count(DeviceClass::Mouse), 2);
        assert_eq!(platform.remove_count(DeviceClass::Mouse), 1);
    }

    #[test]
    fn test_inject_failure_records_nothing() {
        let platform = MockPlatform::new();
        platform.set_fail_inject(true);

        assert!(platform.inject_click(Point::new(1, 2)).is_err());
        assert!(platform.clicks().is_empty());
    }

    #[test]
    fn test_key_char_returns_lowercase_letters_and_shifted_symbols() {
        let platform = MockPlatform::new();
        platform.set_lock_keys(true, false);

        assert_eq!(platform.key_char(&KeyboardNotification::new(KeyMessage::KeyDown, 0x41)), Some('a'));
        assert_eq!(platform.key_char(&KeyboardNotification::new(KeyMessage::KeyDown, 0x31)), Some('!'));
        assert_eq!(platform.key_char(&KeyboardNotification::new(KeyMessage::KeyDown, 0x10)), None);
    }
}
