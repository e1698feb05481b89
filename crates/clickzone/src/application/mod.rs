//! Application layer: hook lifecycle, event translation and click remapping.
//!
//! Nothing in here calls the OS directly.  Every platform primitive is reached
//! through the traits in [`platform`], so the whole layer runs against the
//! in-memory platform in tests.
//!
//! - **`platform`**     – The OS boundary: hook install/remove, cursor and
//!   screen queries, synthetic click injection.
//! - **`hook_manager`** – Installs one native hook per device class on the
//!   first subscriber and removes it after the last one.
//! - **`dispatch`**     – Turns raw notifications into typed events and
//!   delivers them in a fixed order; also synthesizes double clicks.
//! - **`remap`**        – Swallows physical left clicks and replays them
//!   inside the target zone.

pub mod dispatch;
pub mod hook_manager;
pub mod platform;
pub mod remap;
