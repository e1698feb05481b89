//! Typed input events.
//!
//! A single raw notification from the hook can produce several events (a
//! left-button release is both a `ButtonUp` and a `Click`).  The translator
//! reuses one [`MouseEvent`] for all of them and re-tags it with the kind
//! being delivered, so a handler that consumes or repositions the event
//! affects the whole notification.

use serde::{Deserialize, Serialize};

/// The two independently hookable input domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Mouse,
    Keyboard,
}

/// A position in physical screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

/// Mouse event kinds, declared in the order they are delivered for one
/// notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    /// Pointer moved; only raised when the position changed.
    Move,
    /// Extended move subscribers, delivered right after [`MouseEventKind::Move`].
    MoveExt,
    ButtonUp,
    ButtonDown,
    /// Any button transition that carries a click count.
    Click,
    /// Extended click subscribers, delivered right after [`MouseEventKind::Click`].
    ClickExt,
    DoubleClick,
    Wheel,
}

impl MouseEventKind {
    /// Every mouse kind in dispatch order.
    pub const ALL: [MouseEventKind; 8] = [
        MouseEventKind::Move,
        MouseEventKind::MoveExt,
        MouseEventKind::ButtonUp,
        MouseEventKind::ButtonDown,
        MouseEventKind::Click,
        MouseEventKind::ClickExt,
        MouseEventKind::DoubleClick,
        MouseEventKind::Wheel,
    ];
}

/// Keyboard event kinds in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEventKind {
    KeyDown,
    /// A character-producing key went down.
    KeyPress,
    KeyUp,
}

impl KeyEventKind {
    pub const ALL: [KeyEventKind; 3] =
        [KeyEventKind::KeyDown, KeyEventKind::KeyPress, KeyEventKind::KeyUp];
}

/// Any subscribable event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Mouse(MouseEventKind),
    Keyboard(KeyEventKind),
}

impl EventKind {
    /// Which hook has to be installed to observe this kind.
    pub fn device_class(self) -> DeviceClass {
        match self {
            EventKind::Mouse(_) => DeviceClass::Mouse,
            EventKind::Keyboard(_) => DeviceClass::Keyboard,
        }
    }
}

impl From<MouseEventKind> for EventKind {
    fn from(kind: MouseEventKind) -> Self {
        EventKind::Mouse(kind)
    }
}

impl From<KeyEventKind> for EventKind {
    fn from(kind: KeyEventKind) -> Self {
        EventKind::Keyboard(kind)
    }
}

/// A pointer event as seen by a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct MouseEvent {
    kind: MouseEventKind,
    button: Option<MouseButton>,
    clicks: u32,
    position: Point,
    delta: i16,
    consumed: bool,
    override_position: Option<Point>,
}

impl MouseEvent {
    pub fn new(
        kind: MouseEventKind,
        button: Option<MouseButton>,
        clicks: u32,
        position: Point,
        delta: i16,
    ) -> Self {
        Self {
            kind,
            button,
            clicks,
            position,
            delta,
            consumed: false,
            override_position: None,
        }
    }

    /// The kind currently being delivered.
    pub fn kind(&self) -> MouseEventKind {
        self.kind
    }

    /// Re-tags the event before it is handed to the next group of subscribers.
    pub fn set_kind(&mut self, kind: MouseEventKind) {
        self.kind = kind;
    }

    pub fn button(&self) -> Option<MouseButton> {
        self.button
    }

    /// 1 for a single press/release, 2 for a platform double click, 0 otherwise.
    pub fn clicks(&self) -> u32 {
        self.clicks
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn x(&self) -> i32 {
        self.position.x
    }

    pub fn y(&self) -> i32 {
        self.position.y
    }

    /// Signed wheel delta; one notch is 120.
    pub fn delta(&self) -> i16 {
        self.delta
    }

    /// Whether the raw notification will be withheld from other applications.
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Withholds the raw notification from the rest of the system.
    ///
    /// Other subscribers of this notification still receive their events.
    pub fn consume(&mut self) {
        self.consumed = true;
    }

    pub fn set_consumed(&mut self, consumed: bool) {
        self.consumed = consumed;
    }

    /// Requests that the notification be rewritten to `position` before it
    /// reaches the next subscriber and, eventually, other applications.
    pub fn set_override_position(&mut self, position: Point) {
        self.override_position = Some(position);
    }

    /// The override requested by the last handler, if it has not been applied yet.
    pub fn pending_override(&self) -> Option<Point> {
        self.override_position
    }

    /// Applies a pending override to this event and returns it, clearing the request.
    pub fn take_override(&mut self) -> Option<Point> {
        let position = self.override_position.take()?;
        self.position = position;
        Some(position)
    }
}

/// A keyboard event as seen by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    kind: KeyEventKind,
    vk_code: u32,
    scan_code: u32,
    key_char: Option<char>,
    consumed: bool,
}

impl KeyEvent {
    pub fn new(kind: KeyEventKind, vk_code: u32, scan_code: u32, key_char: Option<char>) -> Self {
        Self {
            kind,
            vk_code,
            scan_code,
            key_char,
            consumed: false,
        }
    }

    pub fn kind(&self) -> KeyEventKind {
        self.kind
    }

    /// Windows virtual-key code.
    pub fn vk_code(&self) -> u32 {
        self.vk_code
    }

    pub fn scan_code(&self) -> u32 {
        self.scan_code
    }

    /// The produced character; only set for [`KeyEventKind::KeyPress`].
    pub fn key_char(&self) -> Option<char> {
        self.key_char
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    pub fn consume(&mut self) {
        self.consumed = true;
    }

    pub fn set_consumed(&mut self, consumed: bool) {
        self.consumed = consumed;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn left_down_at(x: i32, y: i32) -> MouseEvent {
        MouseEvent::new(
            MouseEventKind::ButtonDown,
            Some(MouseButton::Left),
            1,
            Point::new(x, y),
            0,
        )
    }

    #[test]
    fn test_new_mouse_event_is_not_consumed() {
        let event = left_down_at(10, 20);
        assert!(!event.is_consumed());
        assert_eq!(event.pending_override(), None);
    }

    #[test]
    fn test_take_override_moves_event_and_clears_request() {
        // Arrange
        let mut event = left_down_at(10, 20);
        event.set_override_position(Point::new(300, 400));

        // Act
        let applied = event.take_override();

        // Assert
        assert_eq!(applied, Some(Point::new(300, 400)));
        assert_eq!(event.position(), Point::new(300, 400));
        assert_eq!(event.pending_override(), None);
    }

    #[test]
    fn test_take_override_without_request_keeps_position() {
        let mut event = left_down_at(10, 20);
        assert_eq!(event.take_override(), None);
        assert_eq!(event.position(), Point::new(10, 20));
    }

    #[test]
    fn test_event_kind_reports_device_class() {
        assert_eq!(EventKind::from(MouseEventKind::Wheel).device_class(), DeviceClass::Mouse);
        assert_eq!(
            EventKind::from(KeyEventKind::KeyPress).device_class(),
            DeviceClass::Keyboard
        );
    }

    #[test]
    fn test_mouse_kinds_are_listed_in_dispatch_order() {
        let all = MouseEventKind::ALL;
        let pos = |k| all.iter().position(|x| *x == k).unwrap();
        assert!(pos(MouseEventKind::Move) < pos(MouseEventKind::ButtonDown));
        assert!(pos(MouseEventKind::ButtonDown) < pos(MouseEventKind::Click));
        assert!(pos(MouseEventKind::Click) < pos(MouseEventKind::DoubleClick));
        assert!(pos(MouseEventKind::DoubleClick) < pos(MouseEventKind::Wheel));
    }
}
