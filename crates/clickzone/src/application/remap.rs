//! Remap engine: replays physical left clicks inside the target zone.
//!
//! On a left `ButtonDown` the engine swallows the physical click, maps the
//! current cursor position into the zone, moves the cursor there and
//! schedules a synthetic click on the tokio runtime.  The synthetic click
//! travels back through the same global hook, so a [`ReentrancyGuard`] is
//! held from the moment the click is scheduled until the settle delay after
//! injection has passed.  Button-downs that arrive while the guard is held are
//! left alone entirely.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clickzone_core::{MouseButton, MouseEvent, MouseEventKind, ScreenSize, TargetZone, ZoneError};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, info, trace, warn};

use super::hook_manager::{HookError, HookManager, Subscription};
use super::platform::{ClickInjector, HookPlatform};

/// Time the injected press/release is given to reach the hook before the
/// guard is released.
pub const CLICK_SETTLE_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum RemapError {
    #[error("invalid remap configuration: {0}")]
    Zone(#[from] ZoneError),

    #[error(transparent)]
    Hook(#[from] HookError),
}

/// Set while a synthetic click is in flight.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    flag: Arc<AtomicBool>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Sets the guard unless it is already set.  The guard is cleared when the
    /// returned [`GuardRelease`] is dropped.
    pub fn try_acquire(&self) -> Option<GuardRelease> {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GuardRelease {
                flag: Arc::clone(&self.flag),
            })
    }
}

/// Clears the owning [`ReentrancyGuard`] on drop.
#[must_use = "the guard is released as soon as this is dropped"]
pub struct GuardRelease {
    flag: Arc<AtomicBool>,
}

impl Drop for GuardRelease {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct ClickRemapper {
    zone: TargetZone,
    screen: ScreenSize,
    guard: ReentrancyGuard,
    platform: Arc<dyn HookPlatform>,
    injector: Arc<dyn ClickInjector>,
    runtime: Handle,
}

impl ClickRemapper {
    fn on_button_down(&self, event: &mut MouseEvent) {
        if event.button() != Some(MouseButton::Left) {
            return;
        }
        let Some(release) = self.guard.try_acquire() else {
            trace!("synthetic click in flight; ignoring button down");
            return;
        };

        event.consume();

        let cursor = match self.platform.cursor_position() {
            Ok(position) => position,
            Err(e) => {
                warn!(error = %e, "cursor position unavailable; using event position");
                event.position()
            }
        };
        let target = self.zone.map(cursor, self.screen);
        if let Err(e) = self.platform.set_cursor_position(target) {
            warn!(error = %e, ?target, "failed to move cursor into zone");
        }

        let injector = Arc::clone(&self.injector);
        self.runtime.spawn(async move {
            let _release = release;
            let started = Instant::now();
            match injector.inject_click(target) {
                Ok(()) => debug!(?cursor, ?target, "synthetic click injected"),
                Err(e) => warn!(error = %e, ?target, "synthetic click injection failed"),
            }
            tokio::time::sleep(CLICK_SETTLE_DELAY).await;
            debug!(elapsed_ms = started.elapsed().as_millis() as u64, "synthetic click settled");
        });
    }
}

/// A running click remapper.  Stops when dropped or via [`RemapEngine::stop`].
pub struct RemapEngine {
    zone: TargetZone,
    screen: ScreenSize,
    guard: ReentrancyGuard,
    subscription: Subscription,
}

impl RemapEngine {
    /// Validates the configuration and subscribes to `ButtonDown`.
    ///
    /// The screen size is read once here.  Synthetic clicks are spawned onto
    /// `runtime`.
    ///
    /// # Errors
    ///
    /// - [`RemapError::Zone`] if the zone or the reported screen has no area.
    ///   No hook is installed in that case.
    /// - [`RemapError::Hook`] if the mouse hook could not be installed.
    pub fn start(
        manager: &HookManager,
        zone: TargetZone,
        platform: Arc<dyn HookPlatform>,
        injector: Arc<dyn ClickInjector>,
        runtime: Handle,
    ) -> Result<Self, RemapError> {
        zone.validate()?;
        let screen = platform.screen_size();
        screen.validate()?;

        let guard = ReentrancyGuard::new();
        let remapper = ClickRemapper {
            zone,
            screen,
            guard: guard.clone(),
            platform,
            injector,
            runtime,
        };
        let subscription = manager.subscribe_mouse(MouseEventKind::ButtonDown, move |event| {
            remapper.on_button_down(event)
        })?;

        info!(
            width = zone.width,
            height = zone.height,
            left = zone.left,
            top = zone.top,
            screen_width = screen.width,
            screen_height = screen.height,
            "click remapping started"
        );

        Ok(Self {
            zone,
            screen,
            guard,
            subscription,
        })
    }

    pub fn zone(&self) -> TargetZone {
        self.zone
    }

    /// Screen size captured at start.
    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    pub fn guard(&self) -> &ReentrancyGuard {
        &self.guard
    }

    /// Unsubscribes, removing the mouse hook if nothing else uses it.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::Remove`] if the hook could not be removed.
    pub fn stop(self) -> Result<(), HookError> {
        info!("click remapping stopped");
        self.subscription.unsubscribe()
    }
}

impl fmt::Debug for RemapEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemapEngine")
            .field("zone", &self.zone)
            .field("screen", &self.screen)
            .field("guard", &self.guard.is_set())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
