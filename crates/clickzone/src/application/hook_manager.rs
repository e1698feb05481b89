//! Hook lifecycle management.
//!
//! The [`HookManager`] owns at most one native hook per device class.  The
//! hook for a class is installed when the first event kind of that class gains
//! a subscriber and removed when the last subscriber of the last such kind
//! goes away.  A second subscriber to an already-watched kind (or to a sibling
//! kind of the same class) never touches the platform.
//!
//! Subscribe and unsubscribe may be called from any thread, including from a
//! handler running inside the hook callback.  One lifecycle lock covers the
//! handler table and the per-class hook state, and every mutation publishes a
//! fresh handler snapshot to the dispatcher.  The lock is never held across a
//! platform install or removal: the class is marked `Installing` or
//! `Removing`, the lock is released for the platform call, and the result is
//! committed under the lock again.  Callers that find a class in transition
//! wait on a condition variable, so at most one hook per class ever exists.
//! The hook callback itself never takes this lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use clickzone_core::{
    DeviceClass, EventKind, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind,
};
use thiserror::Error;
use tracing::{debug, error};

use super::dispatch::{Dispatcher, HandlerTable, Registration, SubscriptionId};
use super::platform::{HookHandle, HookPlatform, NotificationSink, PlatformError};

/// A hook could not be installed or removed.
///
/// Both are fatal for the operation that triggered them: the manager never
/// retries and never leaves a subscriber registered without a live hook.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HookError {
    #[error("failed to install the {class:?} hook")]
    Install {
        class: DeviceClass,
        #[source]
        source: PlatformError,
    },

    #[error("failed to remove the {class:?} hook")]
    Remove {
        class: DeviceClass,
        #[source]
        source: PlatformError,
    },
}

/// How long a waiter sleeps before re-running queued platform work.
const TRANSITION_POLL: Duration = Duration::from_millis(5);

/// Native hook state of one device class.
#[derive(Debug)]
enum HookSlot {
    Absent,
    /// A platform install is running without the lifecycle lock.
    Installing,
    Installed(HookHandle),
    /// A platform removal is running without the lifecycle lock.
    Removing,
}

impl HookSlot {
    fn is_installed(&self) -> bool {
        matches!(self, HookSlot::Installed(_))
    }

    fn in_transition(&self) -> bool {
        matches!(self, HookSlot::Installing | HookSlot::Removing)
    }
}

struct Lifecycle {
    table: HandlerTable,
    mouse_hook: HookSlot,
    keyboard_hook: HookSlot,
}

impl Lifecycle {
    fn slot(&mut self, class: DeviceClass) -> &mut HookSlot {
        match class {
            DeviceClass::Mouse => &mut self.mouse_hook,
            DeviceClass::Keyboard => &mut self.keyboard_hook,
        }
    }
}

struct Inner {
    platform: Arc<dyn HookPlatform>,
    dispatcher: Arc<Dispatcher>,
    lifecycle: Mutex<Lifecycle>,
    /// Signalled whenever a class leaves `Installing` or `Removing`.
    transition: Condvar,
    next_id: AtomicU64,
}

/// Process-wide subscription point for global input events.
///
/// Cloning is cheap; all clones share the same hooks and subscribers.
#[derive(Clone)]
pub struct HookManager {
    inner: Arc<Inner>,
}

impl HookManager {
    pub fn new(platform: Arc<dyn HookPlatform>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&platform)));
        Self {
            inner: Arc::new(Inner {
                platform,
                dispatcher,
                lifecycle: Mutex::new(Lifecycle {
                    table: HandlerTable::default(),
                    mouse_hook: HookSlot::Absent,
                    keyboard_hook: HookSlot::Absent,
                }),
                transition: Condvar::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers `handler` for a mouse event kind, installing the mouse hook
    /// if this is the first mouse subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::Install`] if the hook had to be installed and the
    /// platform refused.  Nothing is registered in that case.
    pub fn subscribe_mouse<F>(&self, kind: MouseEventKind, handler: F) -> Result<Subscription, HookError>
    where
        F: Fn(&mut MouseEvent) + Send + Sync + 'static,
    {
        self.subscribe(Registration::Mouse(kind, Arc::new(handler)))
    }

    /// Registers `handler` for a keyboard event kind, installing the keyboard
    /// hook if this is the first keyboard subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::Install`] if the hook had to be installed and the
    /// platform refused.
    pub fn subscribe_keyboard<F>(&self, kind: KeyEventKind, handler: F) -> Result<Subscription, HookError>
    where
        F: Fn(&mut KeyEvent) + Send + Sync + 'static,
    {
        self.subscribe(Registration::Keyboard(kind, Arc::new(handler)))
    }

    /// Whether the native hook for `class` is currently installed.
    pub fn is_installed(&self, class: DeviceClass) -> bool {
        self.lock_lifecycle().slot(class).is_installed()
    }

    pub fn subscriber_count(&self, kind: impl Into<EventKind>) -> usize {
        self.lock_lifecycle().table.count(kind.into())
    }

    /// Whether the application-level double-click detector is running.
    pub fn double_click_armed(&self) -> bool {
        self.inner.dispatcher.double_click_enabled()
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Releases `lifecycle` and waits for a class transition to finish,
    /// serving queued platform work in between.
    fn wait_for_transition<'a>(&'a self, lifecycle: MutexGuard<'a, Lifecycle>) -> MutexGuard<'a, Lifecycle> {
        drop(lifecycle);
        self.inner.platform.service_pending();
        let lifecycle = self.lock_lifecycle();
        self.inner
            .transition
            .wait_timeout(lifecycle, TRANSITION_POLL)
            .unwrap_or_else(PoisonError::into_inner)
            .0
    }

    fn subscribe(&self, registration: Registration) -> Result<Subscription, HookError> {
        let kind = registration.kind();
        let class = kind.device_class();
        let mut lifecycle = self.lock_lifecycle();

        loop {
            if lifecycle.slot(class).is_installed() {
                break;
            }
            if lifecycle.slot(class).in_transition() {
                lifecycle = self.wait_for_transition(lifecycle);
                continue;
            }

            *lifecycle.slot(class) = HookSlot::Installing;
            drop(lifecycle);
            let sink: Arc<dyn NotificationSink> = self.inner.dispatcher.clone();
            let installed = self.inner.platform.install_hook(class, sink);

            lifecycle = self.lock_lifecycle();
            let outcome = match installed {
                Ok(handle) => {
                    debug!(?class, raw = handle.raw(), "hook installed");
                    *lifecycle.slot(class) = HookSlot::Installed(handle);
                    Ok(())
                }
                Err(source) => {
                    *lifecycle.slot(class) = HookSlot::Absent;
                    Err(HookError::Install { class, source })
                }
            };
            self.inner.transition.notify_all();
            outcome?;
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        lifecycle.table.insert(id, registration);

        if is_double_click(kind) && lifecycle.table.count(kind) == 1 {
            let interval = self.inner.platform.double_click_time();
            debug!(?interval, "double-click detection started");
            self.inner.dispatcher.enable_double_click(interval);
        }

        self.inner.dispatcher.publish(lifecycle.table.clone());
        debug!(id, ?kind, "subscribed");

        Ok(Subscription {
            manager: self.clone(),
            id,
            kind,
            active: true,
        })
    }

    fn unsubscribe(&self, id: SubscriptionId, kind: EventKind) -> Result<(), HookError> {
        let class = kind.device_class();
        let mut lifecycle = self.lock_lifecycle();

        if !lifecycle.table.remove(id, kind) {
            return Ok(());
        }
        debug!(id, ?kind, "unsubscribed");

        if is_double_click(kind) && lifecycle.table.count(kind) == 0 {
            debug!("double-click detection stopped");
            self.inner.dispatcher.disable_double_click();
        }

        self.inner.dispatcher.publish(lifecycle.table.clone());

        if lifecycle.table.has_subscribers(class) {
            return Ok(());
        }
        let handle = match std::mem::replace(lifecycle.slot(class), HookSlot::Removing) {
            HookSlot::Installed(handle) => handle,
            other => {
                *lifecycle.slot(class) = other;
                return Ok(());
            }
        };
        drop(lifecycle);

        let raw = handle.raw();
        let removed = self.inner.platform.remove_hook(handle);

        // The handle is gone either way; a failed removal is reported, not retried.
        *self.lock_lifecycle().slot(class) = HookSlot::Absent;
        self.inner.transition.notify_all();

        removed.map_err(|source| HookError::Remove { class, source })?;
        debug!(?class, raw, "hook removed");
        Ok(())
    }
}

impl fmt::Debug for HookManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lifecycle = self.lock_lifecycle();
        f.debug_struct("HookManager")
            .field("mouse_hook", &lifecycle.mouse_hook)
            .field("keyboard_hook", &lifecycle.keyboard_hook)
            .finish_non_exhaustive()
    }
}

fn is_double_click(kind: EventKind) -> bool {
    kind == EventKind::Mouse(MouseEventKind::DoubleClick)
}

/// A live registration.  Dropping it unsubscribes.
///
/// Use [`Subscription::unsubscribe`] to observe a hook removal failure; the
/// `Drop` path can only log it.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    manager: HookManager,
    id: SubscriptionId,
    kind: EventKind,
    active: bool,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Unsubscribes, removing the hook if this was its last subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::Remove`] if the platform failed to remove the hook.
    pub fn unsubscribe(mut self) -> Result<(), HookError> {
        self.active = false;
        self.manager.unsubscribe(self.id, self.kind)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(e) = self.manager.unsubscribe(self.id, self.kind) {
            error!(error = %e, kind = ?self.kind, "unsubscribe on drop failed");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
