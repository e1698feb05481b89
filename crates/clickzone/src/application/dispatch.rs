//! Event translator: turns raw hook notifications into typed events.
//!
//! One mouse notification is delivered in a fixed order:
//!
//! ```text
//! Move → MoveExt → ButtonUp (→ synthesized DoubleClick) → ButtonDown
//!      → Click → ClickExt → DoubleClick (platform) → Wheel
//! ```
//!
//! and one keyboard notification as `KeyDown → KeyPress → KeyUp`.
//!
//! After every handler call a pending override position is written back into
//! the notification, so the next handler and the rest of the hook chain see
//! the new coordinates.  Consuming an event only decides whether the raw
//! notification is forwarded at the end; it never stops delivery to the
//! other kinds derived from the same notification.
//!
//! # Threading
//!
//! Dispatch runs on the hook callback thread.  Handler lists are read from an
//! immutable snapshot that the hook manager replaces on every subscribe and
//! unsubscribe, so no lock is held while a handler runs and an unsubscription
//! takes effect from the next notification.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use clickzone_core::keymap::fold_case;
use clickzone_core::{
    DeviceClass, Disposition, DoubleClickDetector, EventKind, KeyEvent, KeyEventKind, KeyMessage,
    KeyboardNotification, MouseButton, MouseEvent, MouseEventKind, MouseNotification, Point,
};
use tracing::{error, trace};

use super::platform::{HookPlatform, NotificationSink};

/// A mouse subscriber.
pub type MouseHandler = Arc<dyn Fn(&mut MouseEvent) + Send + Sync>;

/// A keyboard subscriber.
pub type KeyHandler = Arc<dyn Fn(&mut KeyEvent) + Send + Sync>;

pub(crate) type SubscriptionId = u64;

/// A handler together with the kind it listens to.
pub(crate) enum Registration {
    Mouse(MouseEventKind, MouseHandler),
    Keyboard(KeyEventKind, KeyHandler),
}

impl Registration {
    pub(crate) fn kind(&self) -> EventKind {
        match self {
            Registration::Mouse(kind, _) => EventKind::Mouse(*kind),
            Registration::Keyboard(kind, _) => EventKind::Keyboard(*kind),
        }
    }
}

/// Ordered handler lists per event kind.
#[derive(Clone, Default)]
pub(crate) struct HandlerTable {
    mouse: HashMap<MouseEventKind, Vec<(SubscriptionId, MouseHandler)>>,
    keyboard: HashMap<KeyEventKind, Vec<(SubscriptionId, KeyHandler)>>,
}

impl HandlerTable {
    pub(crate) fn insert(&mut self, id: SubscriptionId, registration: Registration) {
        match registration {
            Registration::Mouse(kind, handler) => {
                self.mouse.entry(kind).or_default().push((id, handler));
            }
            Registration::Keyboard(kind, handler) => {
                self.keyboard.entry(kind).or_default().push((id, handler));
            }
        }
    }

    /// Removes one registration.  Returns `false` if `id` was not registered for `kind`.
    pub(crate) fn remove(&mut self, id: SubscriptionId, kind: EventKind) -> bool {
        fn remove_from<H>(list: Option<&mut Vec<(SubscriptionId, H)>>, id: SubscriptionId) -> bool {
            let Some(list) = list else {
                return false;
            };
            match list.iter().position(|(entry, _)| *entry == id) {
                Some(index) => {
                    list.remove(index);
                    true
                }
                None => false,
            }
        }

        match kind {
            EventKind::Mouse(kind) => remove_from(self.mouse.get_mut(&kind), id),
            EventKind::Keyboard(kind) => remove_from(self.keyboard.get_mut(&kind), id),
        }
    }

    pub(crate) fn count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Mouse(kind) => self.mouse_handlers(kind).len(),
            EventKind::Keyboard(kind) => self.key_handlers(kind).len(),
        }
    }

    /// Whether any kind routed through `class` has at least one subscriber.
    pub(crate) fn has_subscribers(&self, class: DeviceClass) -> bool {
        match class {
            DeviceClass::Mouse => self.mouse.values().any(|list| !list.is_empty()),
            DeviceClass::Keyboard => self.keyboard.values().any(|list| !list.is_empty()),
        }
    }

    fn mouse_handlers(&self, kind: MouseEventKind) -> &[(SubscriptionId, MouseHandler)] {
        self.mouse.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    fn key_handlers(&self, kind: KeyEventKind) -> &[(SubscriptionId, KeyHandler)] {
        self.keyboard.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Translator state shared between the hook manager and the hook callback.
pub(crate) struct Dispatcher {
    platform: Arc<dyn HookPlatform>,
    table: RwLock<Arc<HandlerTable>>,
    last_position: Mutex<Option<Point>>,
    double_click: Mutex<Option<DoubleClickDetector>>,
}

impl Dispatcher {
    pub(crate) fn new(platform: Arc<dyn HookPlatform>) -> Self {
        Self {
            platform,
            table: RwLock::new(Arc::new(HandlerTable::default())),
            last_position: Mutex::new(None),
            double_click: Mutex::new(None),
        }
    }

    /// Replaces the handler snapshot used by subsequent notifications.
    pub(crate) fn publish(&self, table: HandlerTable) {
        *self.table.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(table);
    }

    fn snapshot(&self) -> Arc<HandlerTable> {
        Arc::clone(&self.table.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Starts application-level double-click recognition.
    pub(crate) fn enable_double_click(&self, interval: Duration) {
        *self.double_click.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(DoubleClickDetector::new(interval));
    }

    pub(crate) fn disable_double_click(&self) {
        *self.double_click.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub(crate) fn double_click_enabled(&self) -> bool {
        self.double_click
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn position_changed(&self, position: Point) -> bool {
        let mut last = self.last_position.lock().unwrap_or_else(PoisonError::into_inner);
        if *last == Some(position) {
            return false;
        }
        *last = Some(position);
        true
    }

    fn release_completes_double_click(&self, button: MouseButton, clicks: u32) -> bool {
        self.double_click
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .map_or(false, |detector| detector.observe_release(button, clicks, Instant::now()))
    }

    pub(crate) fn dispatch_mouse(&self, notification: &mut MouseNotification) -> Disposition {
        let table = self.snapshot();
        let action = notification.decode();
        let mut event = MouseEvent::new(
            MouseEventKind::Move,
            action.button,
            action.clicks,
            notification.position,
            action.wheel_delta,
        );
        let mut deliver = |kind: MouseEventKind, event: &mut MouseEvent| {
            deliver_mouse(table.mouse_handlers(kind), kind, event, notification);
        };

        let watches_moves = table.count(MouseEventKind::Move.into()) > 0
            || table.count(MouseEventKind::MoveExt.into()) > 0;
        if watches_moves && self.position_changed(event.position()) {
            deliver(MouseEventKind::Move, &mut event);
            deliver(MouseEventKind::MoveExt, &mut event);
        }

        if action.up {
            deliver(MouseEventKind::ButtonUp, &mut event);
            if let Some(button) = action.button {
                if self.release_completes_double_click(button, action.clicks) {
                    deliver(MouseEventKind::DoubleClick, &mut event);
                }
            }
        }

        if action.down {
            deliver(MouseEventKind::ButtonDown, &mut event);
        }

        if action.clicks > 0 {
            deliver(MouseEventKind::Click, &mut event);
            deliver(MouseEventKind::ClickExt, &mut event);
        }

        if action.clicks == 2 {
            deliver(MouseEventKind::DoubleClick, &mut event);
        }

        if action.wheel_delta != 0 {
            deliver(MouseEventKind::Wheel, &mut event);
        }

        if event.is_consumed() {
            Disposition::Suppress
        } else {
            Disposition::Forward
        }
    }

    pub(crate) fn dispatch_keyboard(&self, notification: &KeyboardNotification) -> Disposition {
        let table = self.snapshot();
        let (down, plain_down, up) = match notification.message {
            KeyMessage::KeyDown => (true, true, false),
            KeyMessage::SysKeyDown => (true, false, false),
            KeyMessage::KeyUp | KeyMessage::SysKeyUp => (false, false, true),
            KeyMessage::Other(_) => (false, false, false),
        };
        let mut consumed = false;

        if down {
            consumed |= deliver_key(
                table.key_handlers(KeyEventKind::KeyDown),
                KeyEvent::new(
                    KeyEventKind::KeyDown,
                    notification.vk_code,
                    notification.scan_code,
                    None,
                ),
            );
        }

        let press_handlers = table.key_handlers(KeyEventKind::KeyPress);
        if plain_down && !press_handlers.is_empty() {
            if let Some(ch) = self.platform.key_char(notification) {
                let locks = self.platform.lock_key_state();
                let ch = fold_case(ch, locks.shift_down, locks.caps_lock_on);
                consumed |= deliver_key(
                    press_handlers,
                    KeyEvent::new(
                        KeyEventKind::KeyPress,
                        notification.vk_code,
                        notification.scan_code,
                        Some(ch),
                    ),
                );
            }
        }

        if up {
            consumed |= deliver_key(
                table.key_handlers(KeyEventKind::KeyUp),
                KeyEvent::new(
                    KeyEventKind::KeyUp,
                    notification.vk_code,
                    notification.scan_code,
                    None,
                ),
            );
        }

        if consumed {
            Disposition::Suppress
        } else {
            Disposition::Forward
        }
    }
}

impl NotificationSink for Dispatcher {
    fn on_mouse(&self, notification: &mut MouseNotification) -> Disposition {
        self.dispatch_mouse(notification)
    }

    fn on_keyboard(&self, notification: &KeyboardNotification) -> Disposition {
        self.dispatch_keyboard(notification)
    }
}

fn deliver_mouse(
    handlers: &[(SubscriptionId, MouseHandler)],
    kind: MouseEventKind,
    event: &mut MouseEvent,
    notification: &mut MouseNotification,
) {
    event.set_kind(kind);
    for (id, handler) in handlers {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
            error!(subscription = id, ?kind, "mouse handler panicked: {}", panic_message(&*payload));
        }
        if let Some(position) = event.take_override() {
            trace!(?kind, ?position, "rewriting notification position");
            notification.position = position;
        }
    }
}

/// Delivers `event` to every handler and reports whether it ended up consumed.
fn deliver_key(handlers: &[(SubscriptionId, KeyHandler)], mut event: KeyEvent) -> bool {
    for (id, handler) in handlers {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(&mut event))) {
            let kind = event.kind();
            error!(subscription = id, ?kind, "key handler panicked: {}", panic_message(&*payload));
        }
    }
    event.is_consumed()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::platform::mock::MockPlatform;
    use clickzone_core::MouseMessage;

    type Log = Arc<Mutex<Vec<String>>>;

    fn make_dispatcher() -> (Dispatcher, Arc<MockPlatform>) {
        let platform = Arc::new(MockPlatform::new());
        let dispatcher = Dispatcher::new(Arc::clone(&platform) as Arc<dyn HookPlatform>);
        (dispatcher, platform)
    }

    fn recorder(log: &Log, label: &'static str) -> MouseHandler {
        let log = Arc::clone(log);
        Arc::new(move |e: &mut MouseEvent| {
            log.lock().unwrap().push(format!("{label}@{},{}", e.x(), e.y()));
        })
    }

    fn key_recorder(log: &Log, label: &'static str) -> KeyHandler {
        let log = Arc::clone(log);
        Arc::new(move |e: &mut KeyEvent| {
            let text = match e.key_char() {
                Some(ch) => format!("{label}:{ch}"),
                None => format!("{label}:{:#x}", e.vk_code()),
            };
            log.lock().unwrap().push(text);
        })
    }

    fn table_with(entries: Vec<Registration>) -> HandlerTable {
        let mut table = HandlerTable::default();
        for (id, registration) in entries.into_iter().enumerate() {
            table.insert(id as SubscriptionId, registration);
        }
        table
    }

    #[test]
    fn test_handler_table_counts_and_removes_by_id() {
        // Arrange
        let log: Log = Arc::default();
        let mut table = table_with(vec![
            Registration::Mouse(MouseEventKind::Move, recorder(&log, "a")),
            Registration::Mouse(MouseEventKind::Move, recorder(&log, "b")),
        ]);

        // Act
        let removed = table.remove(0, MouseEventKind::Move.into());
        let removed_again = table.remove(0, MouseEventKind::Move.into());

        // Assert
        assert!(removed);
        assert!(!removed_again);
        assert_eq!(table.count(MouseEventKind::Move.into()), 1);
        assert!(table.has_subscribers(DeviceClass::Mouse));
        assert!(!table.has_subscribers(DeviceClass::Keyboard));
    }

    #[test]
    fn test_left_down_delivers_move_then_button_down_then_click() {
        // Arrange
        let (dispatcher, _) = make_dispatcher();
        let log: Log = Arc::default();
        dispatcher.publish(table_with(vec![
            Registration::Mouse(MouseEventKind::Wheel, recorder(&log, "wheel")),
            Registration::Mouse(MouseEventKind::ClickExt, recorder(&log, "click-ext")),
            Registration::Mouse(MouseEventKind::Click, recorder(&log, "click")),
            Registration::Mouse(MouseEventKind::ButtonDown, recorder(&log, "down")),
            Registration::Mouse(MouseEventKind::ButtonUp, recorder(&log, "up")),
            Registration::Mouse(MouseEventKind::MoveExt, recorder(&log, "move-ext")),
            Registration::Mouse(MouseEventKind::Move, recorder(&log, "move")),
        ]));
        let mut n = MouseNotification::new(MouseMessage::LeftDown, Point::new(10, 20));

        // Act
        let disposition = dispatcher.dispatch_mouse(&mut n);

        // Assert
        assert_eq!(disposition, Disposition::Forward);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["move@10,20", "move-ext@10,20", "down@10,20", "click@10,20", "click-ext@10,20"]
        );
    }

    #[test]
    fn test_move_is_not_repeated_for_unchanged_position() {
        let (dispatcher, _) = make_dispatcher();
        let log: Log = Arc::default();
        dispatcher.publish(table_with(vec![Registration::Mouse(
            MouseEventKind::Move,
            recorder(&log, "move"),
        )]));

        let mut first = MouseNotification::new(MouseMessage::Move, Point::new(5, 5));
        let mut second = MouseNotification::new(MouseMessage::LeftDown, Point::new(5, 5));
        dispatcher.dispatch_mouse(&mut first);
        dispatcher.dispatch_mouse(&mut second);

        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_platform_double_click_raises_click_and_double_click() {
        // Arrange
        let (dispatcher, _) = make_dispatcher();
        let log: Log = Arc::default();
        dispatcher.publish(table_with(vec![
            Registration::Mouse(MouseEventKind::DoubleClick, recorder(&log, "double")),
            Registration::Mouse(MouseEventKind::Click, recorder(&log, "click")),
        ]));
        let mut n = MouseNotification::new(MouseMessage::LeftDoubleClick, Point::new(1, 1));

        // Act
        dispatcher.dispatch_mouse(&mut n);

        // Assert
        assert_eq!(*log.lock().unwrap(), vec!["click@1,1", "double@1,1"]);
    }

    #[test]
    fn test_wheel_is_delivered_with_delta() {
        let (dispatcher, _) = make_dispatcher();
        let deltas = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&deltas);
        dispatcher.publish(table_with(vec![Registration::Mouse(
            MouseEventKind::Wheel,
            Arc::new(move |e: &mut MouseEvent| sink.lock().unwrap().push(e.delta())),
        )]));

        dispatcher.dispatch_mouse(&mut MouseNotification::wheel(Point::default(), 240));

        assert_eq!(*deltas.lock().unwrap(), vec![240]);
    }

    #[test]
    fn test_consumed_event_still_reaches_sibling_kinds_and_suppresses_notification() {
        // Arrange
        let (dispatcher, _) = make_dispatcher();
        let log: Log = Arc::default();
        dispatcher.publish(table_with(vec![
            Registration::Mouse(
                MouseEventKind::ButtonDown,
                Arc::new(|e: &mut MouseEvent| e.consume()),
            ),
            Registration::Mouse(MouseEventKind::ButtonDown, recorder(&log, "down-2")),
            Registration::Mouse(MouseEventKind::Click, recorder(&log, "click")),
        ]));
        let mut n = MouseNotification::new(MouseMessage::LeftDown, Point::new(3, 4));

        // Act
        let disposition = dispatcher.dispatch_mouse(&mut n);

        // Assert
        assert_eq!(disposition, Disposition::Suppress);
        assert_eq!(*log.lock().unwrap(), vec!["down-2@3,4", "click@3,4"]);
    }

    #[test]
    fn test_override_position_is_seen_by_later_handlers_and_written_back() {
        // Arrange
        let (dispatcher, _) = make_dispatcher();
        let log: Log = Arc::default();
        dispatcher.publish(table_with(vec![
            Registration::Mouse(
                MouseEventKind::Move,
                Arc::new(|e: &mut MouseEvent| e.set_override_position(Point::new(100, 200))),
            ),
            Registration::Mouse(MouseEventKind::Move, recorder(&log, "move")),
            Registration::Mouse(MouseEventKind::MoveExt, recorder(&log, "move-ext")),
        ]));
        let mut n = MouseNotification::new(MouseMessage::Move, Point::new(1, 2));

        // Act
        dispatcher.dispatch_mouse(&mut n);

        // Assert
        assert_eq!(*log.lock().unwrap(), vec!["move@100,200", "move-ext@100,200"]);
        assert_eq!(n.position, Point::new(100, 200));
    }

    #[test]
    fn test_panicking_handler_does_not_stop_delivery() {
        let (dispatcher, _) = make_dispatcher();
        let log: Log = Arc::default();
        dispatcher.publish(table_with(vec![
            Registration::Mouse(
                MouseEventKind::ButtonDown,
                Arc::new(|_: &mut MouseEvent| panic!("handler failure")),
            ),
            Registration::Mouse(MouseEventKind::ButtonDown, recorder(&log, "down")),
        ]));

        let mut n = MouseNotification::new(MouseMessage::RightDown, Point::new(7, 7));
        dispatcher.dispatch_mouse(&mut n);

        assert_eq!(*log.lock().unwrap(), vec!["down@7,7"]);
    }

    #[test]
    fn test_synthesized_double_click_follows_second_button_up() {
        // Arrange
        let (dispatcher, _) = make_dispatcher();
        let log: Log = Arc::default();
        dispatcher.publish(table_with(vec![
            Registration::Mouse(MouseEventKind::ButtonUp, recorder(&log, "up")),
            Registration::Mouse(MouseEventKind::DoubleClick, recorder(&log, "double")),
        ]));
        dispatcher.enable_double_click(Duration::from_secs(5));

        // Act
        dispatcher.dispatch_mouse(&mut MouseNotification::new(MouseMessage::LeftUp, Point::new(1, 1)));
        dispatcher.dispatch_mouse(&mut MouseNotification::new(MouseMessage::LeftUp, Point::new(2, 2)));

        // Assert
        assert_eq!(*log.lock().unwrap(), vec!["up@1,1", "up@2,2", "double@2,2"]);
    }

    #[test]
    fn test_no_double_click_synthesis_when_disabled() {
        let (dispatcher, _) = make_dispatcher();
        let log: Log = Arc::default();
        dispatcher.publish(table_with(vec![Registration::Mouse(
            MouseEventKind::DoubleClick,
            recorder(&log, "double"),
        )]));

        dispatcher.dispatch_mouse(&mut MouseNotification::new(MouseMessage::LeftUp, Point::default()));
        dispatcher.dispatch_mouse(&mut MouseNotification::new(MouseMessage::LeftUp, Point::default()));

        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_key_down_delivers_key_down_then_key_press() {
        // Arrange
        let (dispatcher, _) = make_dispatcher();
        let log: Log = Arc::default();
        dispatcher.publish(table_with(vec![
            Registration::Keyboard(KeyEventKind::KeyUp, key_recorder(&log, "up")),
            Registration::Keyboard(KeyEventKind::KeyPress, key_recorder(&log, "press")),
            Registration::Keyboard(KeyEventKind::KeyDown, key_recorder(&log, "down")),
        ]));

        // Act
        dispatcher.dispatch_keyboard(&KeyboardNotification::new(KeyMessage::KeyDown, 0x41));
        dispatcher.dispatch_keyboard(&KeyboardNotification::new(KeyMessage::KeyUp, 0x41));

        // Assert
        assert_eq!(*log.lock().unwrap(), vec!["down:0x41", "press:a", "up:0x41"]);
    }

    #[test]
    fn test_key_press_is_case_folded_with_caps_lock() {
        let (dispatcher, platform) = make_dispatcher();
        platform.set_lock_keys(false, true);
        let log: Log = Arc::default();
        dispatcher.publish(table_with(vec![Registration::Keyboard(
            KeyEventKind::KeyPress,
            key_recorder(&log, "press"),
        )]));

        dispatcher.dispatch_keyboard(&KeyboardNotification::new(KeyMessage::KeyDown, 0x42));

        assert_eq!(*log.lock().unwrap(), vec!["press:B"]);
    }

    #[test]
    fn test_sys_key_down_raises_key_down_but_no_key_press() {
        let (dispatcher, _) = make_dispatcher();
        let log: Log = Arc::default();
        dispatcher.publish(table_with(vec![
            Registration::Keyboard(KeyEventKind::KeyDown, key_recorder(&log, "down")),
            Registration::Keyboard(KeyEventKind::KeyPress, key_recorder(&log, "press")),
        ]));

        dispatcher.dispatch_keyboard(&KeyboardNotification::new(KeyMessage::SysKeyDown, 0x41));

        assert_eq!(*log.lock().unwrap(), vec!["down:0x41"]);
    }

    #[test]
    fn test_non_character_key_raises_no_key_press() {
        let (dispatcher, _) = make_dispatcher();
        let log: Log = Arc::default();
        dispatcher.publish(table_with(vec![Registration::Keyboard(
            KeyEventKind::KeyPress,
            key_recorder(&log, "press"),
        )]));

        dispatcher.dispatch_keyboard(&KeyboardNotification::new(KeyMessage::KeyDown, 0x10));

        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_consumed_key_down_suppresses_notification() {
        let (dispatcher, _) = make_dispatcher();
        dispatcher.publish(table_with(vec![Registration::Keyboard(
            KeyEventKind::KeyDown,
            Arc::new(|e: &mut KeyEvent| e.consume()),
        )]));

        let disposition =
            dispatcher.dispatch_keyboard(&KeyboardNotification::new(KeyMessage::KeyDown, 0x41));

        assert_eq!(disposition, Disposition::Suppress);
    }
}
