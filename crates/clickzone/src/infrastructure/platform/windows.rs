//! Win32 implementation of the hook platform.
//!
//! Low-level hooks (`WH_MOUSE_LL`, `WH_KEYBOARD_LL`) call back on the thread
//! that installed them, and only while that thread pumps messages.  All hooks
//! are therefore installed and removed on one dedicated message-loop thread.
//! Other threads hand it requests over a channel and wake it with a thread
//! message; a request made from the hook thread itself (a handler subscribing
//! from inside a callback) is served directly.  A handler that has to wait for
//! another thread's request drains the queue through
//! [`HookPlatform::service_pending`].
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::mem::size_of;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use clickzone_core::keymap::{VK_CAPITAL, VK_SHIFT};
use clickzone_core::{
    DeviceClass, Disposition, KeyMessage, KeyboardNotification, MouseMessage, MouseNotification,
    Point, ScreenSize,
};
use tracing::{debug, warn};
use windows::Win32::Foundation::{LPARAM, LRESULT, POINT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetDoubleClickTime, GetKeyState, GetKeyboardState, SendInput, ToAscii, INPUT, INPUT_0,
    INPUT_MOUSE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
    MOUSEEVENTF_MOVE, MOUSEINPUT, MOUSE_EVENT_FLAGS,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetCursorPos, GetMessageW, GetSystemMetrics,
    PeekMessageW, PostThreadMessageW, SetCursorPos, SetWindowsHookExW, UnhookWindowsHookEx,
    HC_ACTION, HHOOK, HOOKPROC, KBDLLHOOKSTRUCT, MSG, MSLLHOOKSTRUCT, PM_NOREMOVE,
    SM_CXSCREEN, SM_CYSCREEN, WH_KEYBOARD_LL, WH_MOUSE_LL, WM_APP, WM_KEYDOWN, WM_KEYUP,
    WM_LBUTTONDBLCLK, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDBLCLK, WM_MBUTTONDOWN,
    WM_MBUTTONUP, WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_QUIT, WM_RBUTTONDBLCLK, WM_RBUTTONDOWN,
    WM_RBUTTONUP, WM_SYSKEYDOWN, WM_SYSKEYUP, WM_XBUTTONDBLCLK, WM_XBUTTONDOWN, WM_XBUTTONUP,
};

use crate::application::platform::{
    ClickInjector, HookHandle, HookPlatform, LockKeyState, NotificationSink, PlatformError,
};

/// Thread message that tells the hook thread to drain its request queue.
const WM_HOOK_REQUEST: u32 = WM_APP + 1;

/// Sinks the hook procedures deliver to.  Written only by the hook thread.
static MOUSE_SINK: Mutex<Option<Arc<dyn NotificationSink>>> = Mutex::new(None);
static KEYBOARD_SINK: Mutex<Option<Arc<dyn NotificationSink>>> = Mutex::new(None);

fn sink_slot(class: DeviceClass) -> &'static Mutex<Option<Arc<dyn NotificationSink>>> {
    match class {
        DeviceClass::Mouse => &MOUSE_SINK,
        DeviceClass::Keyboard => &KEYBOARD_SINK,
    }
}

fn current_sink(class: DeviceClass) -> Option<Arc<dyn NotificationSink>> {
    sink_slot(class)
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

enum Request {
    Install {
        class: DeviceClass,
        sink: Arc<dyn NotificationSink>,
        reply: Sender<Result<HookHandle, PlatformError>>,
    },
    Remove {
        handle: HookHandle,
        reply: Sender<Result<(), PlatformError>>,
    },
}

/// The Win32 [`HookPlatform`] and [`ClickInjector`].
pub struct WindowsPlatform {
    thread_id: u32,
    requests: Sender<Request>,
    pending: Arc<Mutex<Receiver<Request>>>,
    thread: Option<JoinHandle<()>>,
}

impl WindowsPlatform {
    /// Spawns the hook message-loop thread.  No hook is installed yet.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::HookThread`] if the thread cannot be started.
    pub fn start() -> Result<Self, PlatformError> {
        let (request_tx, request_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let pending = Arc::new(Mutex::new(request_rx));

        let queue = Arc::clone(&pending);
        let thread = thread::Builder::new()
            .name("clickzone-hook-loop".to_string())
            .spawn(move || run_hook_thread(&queue, ready_tx))
            .map_err(|e| PlatformError::HookThread(e.to_string()))?;

        let thread_id = ready_rx
            .recv()
            .map_err(|_| PlatformError::HookThread("hook thread exited during start-up".into()))?;
        debug!(thread_id, "hook thread started");

        Ok(Self {
            thread_id,
            requests: request_tx,
            pending,
            thread: Some(thread),
        })
    }

    fn on_hook_thread(&self) -> bool {
        // SAFETY: GetCurrentThreadId has no preconditions.
        unsafe { GetCurrentThreadId() == self.thread_id }
    }

    fn call<T>(&self, make: impl FnOnce(Sender<T>) -> Request) -> Result<T, PlatformError> {
        let stopped = || PlatformError::HookThread("hook thread stopped".into());
        let (reply_tx, reply_rx) = mpsc::channel();
        self.requests.send(make(reply_tx)).map_err(|_| stopped())?;
        // SAFETY: posting a thread message has no memory-safety preconditions.
        unsafe { PostThreadMessageW(self.thread_id, WM_HOOK_REQUEST, WPARAM(0), LPARAM(0)) }
            .map_err(|e| PlatformError::HookThread(e.to_string()))?;
        reply_rx.recv().map_err(|_| stopped())
    }
}

impl Drop for WindowsPlatform {
    fn drop(&mut self) {
        // SAFETY: see `call`.
        if let Err(e) = unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
            warn!(error = %e, "failed to stop hook thread");
            return;
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("hook thread panicked");
            }
        }
    }
}

impl HookPlatform for WindowsPlatform {
    fn install_hook(
        &self,
        class: DeviceClass,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<HookHandle, PlatformError> {
        if self.on_hook_thread() {
            return install(class, sink);
        }
        self.call(|reply| Request::Install { class, sink, reply })?
    }

    fn remove_hook(&self, handle: HookHandle) -> Result<(), PlatformError> {
        if self.on_hook_thread() {
            return remove(handle);
        }
        self.call(|reply| Request::Remove { handle, reply })?
    }

    fn service_pending(&self) {
        if !self.on_hook_thread() {
            return;
        }
        drain(&self.pending);
    }

    fn screen_size(&self) -> ScreenSize {
        // SAFETY: GetSystemMetrics has no preconditions.
        unsafe { ScreenSize::new(GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
    }

    fn cursor_position(&self) -> Result<Point, PlatformError> {
        let mut pt = POINT::default();
        // SAFETY: `pt` is a valid, writable POINT on the stack.
        unsafe { GetCursorPos(&mut pt) }.map_err(|e| PlatformError::Cursor(e.to_string()))?;
        Ok(Point::new(pt.x, pt.y))
    }

    fn set_cursor_position(&self, position: Point) -> Result<(), PlatformError> {
        // SAFETY: SetCursorPos takes plain integers.
        unsafe { SetCursorPos(position.x, position.y) }
            .map_err(|e| PlatformError::Cursor(e.to_string()))
    }

    fn double_click_time(&self) -> Duration {
        // SAFETY: GetDoubleClickTime has no preconditions.
        Duration::from_millis(u64::from(unsafe { GetDoubleClickTime() }))
    }

    fn key_char(&self, notification: &KeyboardNotification) -> Option<char> {
        let mut keyboard_state = [0u8; 256];
        // SAFETY: the buffer is exactly the 256 bytes GetKeyboardState writes.
        unsafe { GetKeyboardState(&mut keyboard_state) }.ok()?;

        let mut buffer = [0u16; 2];
        // SAFETY: `buffer` has room for the two characters ToAscii may write
        // and `keyboard_state` is a full 256-byte key state array.
        let produced = unsafe {
            ToAscii(
                notification.vk_code,
                notification.scan_code,
                Some(&keyboard_state),
                buffer.as_mut_ptr(),
                0,
            )
        };
        if produced != 1 {
            return None;
        }
        char::from_u32(u32::from(buffer[0]))
    }

    fn lock_key_state(&self) -> LockKeyState {
        // SAFETY: GetKeyState takes a plain virtual-key code.
        let (shift, caps) = unsafe { (GetKeyState(VK_SHIFT as i32), GetKeyState(VK_CAPITAL as i32)) };
        LockKeyState {
            shift_down: (shift as u16) & 0x8000 != 0,
            caps_lock_on: caps & 1 != 0,
        }
    }
}

impl ClickInjector for WindowsPlatform {
    fn inject_click(&self, position: Point) -> Result<(), PlatformError> {
        let (dx, dy) = normalize_coords(position, self.screen_size());
        let inputs = [
            mouse_input(dx, dy, MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_MOVE),
            mouse_input(0, 0, MOUSEEVENTF_LEFTDOWN),
            mouse_input(0, 0, MOUSEEVENTF_LEFTUP),
        ];
        // SAFETY: `inputs` is a valid array of INPUT structures on the stack.
        let sent = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(PlatformError::Inject(format!(
                "SendInput accepted {sent} of {} events",
                inputs.len()
            )));
        }
        Ok(())
    }
}

fn mouse_input(dx: i32, dy: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

/// Maps a pixel position to the `[0, 65535]` range used by absolute `SendInput` moves.
fn normalize_coords(position: Point, screen: ScreenSize) -> (i32, i32) {
    fn axis(value: i32, extent: i32) -> i32 {
        let span = i64::from((extent - 1).max(1));
        (i64::from(value) * 65535 / span).clamp(0, 65535) as i32
    }
    (axis(position.x, screen.width), axis(position.y, screen.height))
}

fn install(class: DeviceClass, sink: Arc<dyn NotificationSink>) -> Result<HookHandle, PlatformError> {
    *sink_slot(class).lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);

    let (id, proc_): (_, HOOKPROC) = match class {
        DeviceClass::Mouse => (WH_MOUSE_LL, Some(mouse_hook_proc)),
        DeviceClass::Keyboard => (WH_KEYBOARD_LL, Some(keyboard_hook_proc)),
    };
    // SAFETY: called on the hook thread, which pumps messages for as long as
    // the hook exists; the procedure is a valid `extern "system"` function.
    match unsafe { SetWindowsHookExW(id, proc_, None, 0) } {
        Ok(hook) => Ok(HookHandle::new(class, hook.0 as isize)),
        Err(e) => {
            *sink_slot(class).lock().unwrap_or_else(PoisonError::into_inner) = None;
            Err(PlatformError::HookInstall { code: e.code().0 })
        }
    }
}

fn remove(handle: HookHandle) -> Result<(), PlatformError> {
    let class = handle.class();
    // SAFETY: the handle came from SetWindowsHookExW and is released only here.
    unsafe { UnhookWindowsHookEx(HHOOK(handle.raw() as _)) }
        .map_err(|e| PlatformError::HookRemove { code: e.code().0 })?;
    *sink_slot(class).lock().unwrap_or_else(PoisonError::into_inner) = None;
    Ok(())
}

/// Entry point for the dedicated Win32 message loop thread.
fn run_hook_thread(requests: &Mutex<Receiver<Request>>, ready: Sender<u32>) {
    let mut msg = MSG::default();
    // SAFETY: PeekMessageW forces creation of this thread's message queue so
    // that PostThreadMessageW cannot race ahead of it.
    let thread_id = unsafe {
        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
        GetCurrentThreadId()
    };
    if ready.send(thread_id).is_err() {
        return;
    }

    // SAFETY: Standard Win32 GetMessage/DispatchMessage loop pattern.
    // GetMessageW returns 0 on WM_QUIT and -1 on failure.
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
            if msg.message == WM_HOOK_REQUEST {
                drain(requests);
                continue;
            }
            DispatchMessageW(&msg);
        }
    }
    // Hooks still installed at this point die with the thread.
    debug!("hook thread exiting");
}

/// Serves every queued request.  The queue lock is not held while serving.
fn drain(requests: &Mutex<Receiver<Request>>) {
    loop {
        let next = requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv();
        match next {
            Ok(request) => serve(request),
            Err(_) => return,
        }
    }
}

fn serve(request: Request) {
    // A dropped reply channel means the caller gave up; nothing to report.
    match request {
        Request::Install { class, sink, reply } => {
            let _ = reply.send(install(class, sink));
        }
        Request::Remove { handle, reply } => {
            let _ = reply.send(remove(handle));
        }
    }
}

fn mouse_message(code: u32) -> MouseMessage {
    match code {
        WM_MOUSEMOVE => MouseMessage::Move,
        WM_LBUTTONDOWN => MouseMessage::LeftDown,
        WM_LBUTTONUP => MouseMessage::LeftUp,
        WM_LBUTTONDBLCLK => MouseMessage::LeftDoubleClick,
        WM_RBUTTONDOWN => MouseMessage::RightDown,
        WM_RBUTTONUP => MouseMessage::RightUp,
        WM_RBUTTONDBLCLK => MouseMessage::RightDoubleClick,
        WM_MBUTTONDOWN => MouseMessage::MiddleDown,
        WM_MBUTTONUP => MouseMessage::MiddleUp,
        WM_MBUTTONDBLCLK => MouseMessage::MiddleDoubleClick,
        WM_XBUTTONDOWN => MouseMessage::XDown,
        WM_XBUTTONUP => MouseMessage::XUp,
        WM_XBUTTONDBLCLK => MouseMessage::XDoubleClick,
        WM_MOUSEWHEEL => MouseMessage::Wheel,
        other => MouseMessage::Other(other),
    }
}

fn key_message(code: u32) -> KeyMessage {
    match code {
        WM_KEYDOWN => KeyMessage::KeyDown,
        WM_KEYUP => KeyMessage::KeyUp,
        WM_SYSKEYDOWN => KeyMessage::SysKeyDown,
        WM_SYSKEYUP => KeyMessage::SysKeyUp,
        other => KeyMessage::Other(other),
    }
}

/// Low-level mouse hook callback.
///
/// # Safety
///
/// Called by Windows from the hook message loop thread; must return quickly.
unsafe extern "system" fn mouse_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code != HC_ACTION as i32 {
        // SAFETY: Must call CallNextHookEx when n_code < 0.
        return CallNextHookEx(None, n_code, w_param, l_param);
    }
    let Some(sink) = current_sink(DeviceClass::Mouse) else {
        return CallNextHookEx(None, n_code, w_param, l_param);
    };

    // SAFETY: l_param points to a MSLLHOOKSTRUCT when n_code == HC_ACTION.
    let info = &mut *(l_param.0 as *mut MSLLHOOKSTRUCT);
    let mut notification = MouseNotification {
        message: mouse_message(w_param.0 as u32),
        position: Point::new(info.pt.x, info.pt.y),
        mouse_data: info.mouseData,
    };

    let disposition = sink.on_mouse(&mut notification);
    info.pt.x = notification.position.x;
    info.pt.y = notification.position.y;

    if disposition == Disposition::Suppress {
        return LRESULT(1);
    }
    // SAFETY: Forward to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

/// Low-level keyboard hook callback.
///
/// # Safety
///
/// Called by Windows from the hook message loop thread; must return quickly.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code != HC_ACTION as i32 {
        // SAFETY: Must call CallNextHookEx when n_code < 0.
        return CallNextHookEx(None, n_code, w_param, l_param);
    }
    let Some(sink) = current_sink(DeviceClass::Keyboard) else {
        return CallNextHookEx(None, n_code, w_param, l_param);
    };

    // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
    let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
    let notification = KeyboardNotification {
        message: key_message(w_param.0 as u32),
        vk_code: kbs.vkCode,
        scan_code: kbs.scanCode,
        flags: kbs.flags.0,
    };

    if sink.on_keyboard(&notification) == Disposition::Suppress {
        return LRESULT(1);
    }
    // SAFETY: Forward the event to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_coords_maps_screen_corners_to_extremes() {
        let screen = ScreenSize::new(1920, 1080);
        assert_eq!(normalize_coords(Point::new(0, 0), screen), (0, 0));
        assert_eq!(normalize_coords(Point::new(1919, 1079), screen), (65535, 65535));
    }

    #[test]
    fn test_normalize_coords_clamps_positions_past_the_screen() {
        let screen = ScreenSize::new(1920, 1080);
        assert_eq!(normalize_coords(Point::new(4000, -5), screen), (65535, 0));
    }

    #[test]
    fn test_mouse_message_decodes_wheel_and_unknown_codes() {
        assert_eq!(mouse_message(WM_MOUSEWHEEL), MouseMessage::Wheel);
        assert_eq!(mouse_message(0x020E), MouseMessage::Other(0x020E));
    }

    #[test]
    fn test_key_message_maps_system_keys() {
        assert_eq!(key_message(WM_SYSKEYDOWN), KeyMessage::SysKeyDown);
        assert_eq!(key_message(WM_KEYUP), KeyMessage::KeyUp);
    }
}
