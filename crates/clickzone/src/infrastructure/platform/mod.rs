//! Platform adapters implementing [`HookPlatform`] and [`ClickInjector`].
//!
//! On Windows the low-level hooks (`WH_MOUSE_LL`, `WH_KEYBOARD_LL`) live on a
//! dedicated message-loop thread; see [`windows`].  The [`mock`] platform
//! records every call and lets tests fire raw notifications by hand.
//!
//! [`HookPlatform`]: crate::application::platform::HookPlatform
//! [`ClickInjector`]: crate::application::platform::ClickInjector

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;
