//! Raw hook notification payloads.
//!
//! These mirror what a low-level hook callback receives: a message code and a
//! small payload.  The mouse payload is handed to the translator by mutable
//! reference so that a subscriber's override position can be written back
//! before the notification continues down the hook chain.

use super::event::{MouseButton, Point};

/// Mouse message codes delivered by the low-level mouse hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMessage {
    Move,
    LeftDown,
    LeftUp,
    LeftDoubleClick,
    RightDown,
    RightUp,
    RightDoubleClick,
    MiddleDown,
    MiddleUp,
    MiddleDoubleClick,
    /// X button pressed; the high word of `mouse_data` tells which one.
    XDown,
    XUp,
    XDoubleClick,
    /// Vertical wheel; the high word of `mouse_data` is the signed delta.
    Wheel,
    /// Anything else (horizontal wheel, non-client messages).
    Other(u32),
}

/// A raw mouse notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseNotification {
    pub message: MouseMessage,
    /// Pointer position in screen coordinates; rewritten in place by overrides.
    pub position: Point,
    /// Message-specific data (wheel delta or X button id in the high word).
    pub mouse_data: u32,
}

/// What a mouse notification means in terms of buttons and clicks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseAction {
    pub button: Option<MouseButton>,
    pub clicks: u32,
    pub down: bool,
    pub up: bool,
    pub wheel_delta: i16,
}

impl MouseNotification {
    pub fn new(message: MouseMessage, position: Point) -> Self {
        Self {
            message,
            position,
            mouse_data: 0,
        }
    }

    /// Builds a vertical wheel notification for `delta` (120 per notch).
    pub fn wheel(position: Point, delta: i16) -> Self {
        Self {
            message: MouseMessage::Wheel,
            position,
            mouse_data: u32::from(delta as u16) << 16,
        }
    }

    fn high_word(&self) -> u16 {
        (self.mouse_data >> 16) as u16
    }

    fn x_button(&self) -> MouseButton {
        if self.high_word() == 2 {
            MouseButton::X2
        } else {
            MouseButton::X1
        }
    }

    /// Decodes the message code into button, click count and transition flags.
    pub fn decode(&self) -> MouseAction {
        let press = |button| MouseAction {
            button: Some(button),
            clicks: 1,
            down: true,
            ..MouseAction::default()
        };
        let release = |button| MouseAction {
            button: Some(button),
            clicks: 1,
            up: true,
            ..MouseAction::default()
        };
        let double = |button| MouseAction {
            button: Some(button),
            clicks: 2,
            ..MouseAction::default()
        };

        match self.message {
            MouseMessage::LeftDown => press(MouseButton::Left),
            MouseMessage::LeftUp => release(MouseButton::Left),
            MouseMessage::LeftDoubleClick => double(MouseButton::Left),
            MouseMessage::RightDown => press(MouseButton::Right),
            MouseMessage::RightUp => release(MouseButton::Right),
            MouseMessage::RightDoubleClick => double(MouseButton::Right),
            MouseMessage::MiddleDown => press(MouseButton::Middle),
            MouseMessage::MiddleUp => release(MouseButton::Middle),
            MouseMessage::MiddleDoubleClick => double(MouseButton::Middle),
            MouseMessage::XDown => press(self.x_button()),
            MouseMessage::XUp => release(self.x_button()),
            MouseMessage::XDoubleClick => double(self.x_button()),
            MouseMessage::Wheel => MouseAction {
                wheel_delta: self.high_word() as i16,
                ..MouseAction::default()
            },
            MouseMessage::Move | MouseMessage::Other(_) => MouseAction::default(),
        }
    }
}

/// Keyboard message codes delivered by the low-level keyboard hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMessage {
    KeyDown,
    KeyUp,
    /// Key pressed while Alt is held (or F10).
    SysKeyDown,
    SysKeyUp,
    Other(u32),
}

/// A raw keyboard notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardNotification {
    pub message: KeyMessage,
    pub vk_code: u32,
    pub scan_code: u32,
    /// Raw hook flags (extended key, injected, alt down, transition).
    pub flags: u32,
}

impl KeyboardNotification {
    pub fn new(message: KeyMessage, vk_code: u32) -> Self {
        Self {
            message,
            vk_code,
            scan_code: 0,
            flags: 0,
        }
    }
}

/// What the hook callback should do with the raw notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Pass it on to the next hook and the target application.
    Forward,
    /// A subscriber consumed it; swallow it.
    Suppress,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
