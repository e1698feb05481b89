//! Virtual-key helpers for turning key-downs into characters.
//!
//! The native platform asks the OS keyboard layout which character a key
//! produces; this module holds the layout-independent parts of that step and
//! a fixed US-layout table for platforms without a layout service.

pub mod windows_vk;

pub use windows_vk::{us_layout_char, VK_CAPITAL, VK_SHIFT};

/// Applies the Shift / Caps Lock case rule to a produced character.
///
/// Letters are upper-cased when exactly one of Shift and Caps Lock is active.
/// Everything else is returned unchanged.
pub fn fold_case(ch: char, shift_down: bool, caps_lock_on: bool) -> char {
    if (shift_down ^ caps_lock_on) && ch.is_alphabetic() {
        ch.to_uppercase().next().unwrap_or(ch)
    } else {
        ch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_case_uppercases_letter_with_shift() {
        assert_eq!(fold_case('a', true, false), 'A');
    }

    #[test]
    fn test_fold_case_uppercases_letter_with_caps_lock() {
        assert_eq!(fold_case('q', false, true), 'Q');
    }

    #[test]
    fn test_fold_case_leaves_letter_when_shift_and_caps_cancel() {
        assert_eq!(fold_case('a', true, true), 'a');
    }

    #[test]
    fn test_fold_case_leaves_non_letters_alone() {
        assert_eq!(fold_case('1', true, false), '1');
        assert_eq!(fold_case(' ', false, true), ' ');
    }
}
