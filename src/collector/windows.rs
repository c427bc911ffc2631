//! Windows input source using low-level hooks.
//!
//! Installs `WH_KEYBOARD_LL` / `WH_MOUSE_LL` hooks on a listener thread that
//! pumps messages until asked to quit.

use crate::collector::types::{InputEvent, MouseButton, RawKey};
use crate::collector::{CollectorConfig, CollectorError, InputSource};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, PostThreadMessageW, SetWindowsHookExW, UnhookWindowsHookEx,
    HHOOK, KBDLLHOOKSTRUCT, MSG, MSLLHOOKSTRUCT, WH_KEYBOARD_LL, WH_MOUSE_LL, WM_KEYDOWN,
    WM_KEYUP, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEHWHEEL,
    WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_QUIT, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SYSKEYDOWN,
    WM_SYSKEYUP, WM_XBUTTONDOWN, WM_XBUTTONUP,
};

/// Wheel units per notch.
const WHEEL_DELTA: i32 = 120;

/// The Windows event collector using Windows Hooks.
pub struct WindowsCollector {
    config: CollectorConfig,
    /// Handed to the listener thread on start
    sender: Option<Sender<InputEvent>>,
    receiver: Receiver<InputEvent>,
    running: Arc<AtomicBool>,
    thread_id: Arc<AtomicU32>,
    thread_handle: Option<JoinHandle<()>>,
}

impl WindowsCollector {
    /// Create a new Windows collector with the given configuration.
    pub fn new(config: CollectorConfig) -> Self {
        let (sender, receiver) = unbounded();

        Self {
            config,
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            thread_id: Arc::new(AtomicU32::new(0)),
            thread_handle: None,
        }
    }
}

impl InputSource for WindowsCollector {
    fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }

        self.running.store(true, Ordering::SeqCst);

        // The listener holds the only sender, so its exit disconnects the
        // channel and the pipeline sees it
        let sender = match self.sender.take() {
            Some(sender) => sender,
            None => {
                let (sender, receiver) = unbounded();
                self.receiver = receiver;
                sender
            }
        };
        let running = self.running.clone();
        let thread_id = self.thread_id.clone();
        let config = self.config.clone();

        let handle = thread::spawn(move || {
            if let Err(e) = run_hook_loop(sender, running.clone(), thread_id, config) {
                tracing::error!("Hook loop stopped: {e}");
            }
            running.store(false, Ordering::SeqCst);
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        // GetMessageW blocks; wake the listener with WM_QUIT
        let id = self.thread_id.swap(0, Ordering::SeqCst);
        if id != 0 {
            unsafe {
                let _ = PostThreadMessageW(id, WM_QUIT, WPARAM(0), LPARAM(0));
            }
        }

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn receiver(&self) -> &Receiver<InputEvent> {
        &self.receiver
    }
}

impl Drop for WindowsCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

// Hook procedures cannot capture state; the listener thread owns this.
thread_local! {
    static EVENT_SENDER: std::cell::RefCell<Option<Sender<InputEvent>>> = const { std::cell::RefCell::new(None) };
}

fn deliver(event: InputEvent) {
    EVENT_SENDER.with(|sender| {
        if let Some(ref s) = *sender.borrow() {
            let _ = s.send(event);
        }
    });
}

unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code >= 0 {
        let kb_struct = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        let key = RawKey::from_windows_vk(kb_struct.vkCode);

        match w_param.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => deliver(InputEvent::KeyDown(key)),
            WM_KEYUP | WM_SYSKEYUP => deliver(InputEvent::KeyUp(key)),
            _ => {}
        }
    }

    CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
}

unsafe extern "system" fn mouse_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code >= 0 {
        let mouse_struct = &*(l_param.0 as *const MSLLHOOKSTRUCT);
        if let Some(event) = process_mouse_message(w_param.0 as u32, mouse_struct) {
            deliver(event);
        }
    }

    CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
}

fn process_mouse_message(message: u32, data: &MSLLHOOKSTRUCT) -> Option<InputEvent> {
    let (x, y) = (data.pt.x, data.pt.y);
    // High word of mouseData: signed wheel delta, or X button number
    let high_word = ((data.mouseData >> 16) & 0xFFFF) as u16;

    let button = |button: MouseButton, pressed: bool| InputEvent::Button {
        x,
        y,
        button,
        pressed,
    };

    match message {
        WM_MOUSEMOVE => Some(InputEvent::Move { x, y }),
        WM_LBUTTONDOWN => Some(button(MouseButton::Left, true)),
        WM_LBUTTONUP => Some(button(MouseButton::Left, false)),
        WM_RBUTTONDOWN => Some(button(MouseButton::Right, true)),
        WM_RBUTTONUP => Some(button(MouseButton::Right, false)),
        WM_MBUTTONDOWN => Some(button(MouseButton::Middle, true)),
        WM_MBUTTONUP => Some(button(MouseButton::Middle, false)),
        WM_XBUTTONDOWN => Some(button(MouseButton::Other(high_word + 2), true)),
        WM_XBUTTONUP => Some(button(MouseButton::Other(high_word + 2), false)),
        WM_MOUSEWHEEL => Some(InputEvent::Scroll {
            x,
            y,
            dx: 0,
            dy: wheel_notches(high_word as i16),
        }),
        WM_MOUSEHWHEEL => Some(InputEvent::Scroll {
            x,
            y,
            dx: wheel_notches(high_word as i16),
            dy: 0,
        }),
        _ => None,
    }
}

/// Convert a raw wheel delta to notches, rounding away from zero.
///
/// Precision touchpads report fractions of a notch; any movement counts as
/// at least one.
fn wheel_notches(delta: i16) -> i32 {
    let delta = i32::from(delta);
    (delta + delta.signum() * (WHEEL_DELTA - 1)) / WHEEL_DELTA
}

fn run_hook_loop(
    sender: Sender<InputEvent>,
    running: Arc<AtomicBool>,
    thread_id: Arc<AtomicU32>,
    config: CollectorConfig,
) -> Result<(), CollectorError> {
    EVENT_SENDER.with(|s| {
        *s.borrow_mut() = Some(sender);
    });

    let result = pump_hooks(&running, &thread_id, &config);

    // Dropping the sender disconnects the pipeline, on failure too
    EVENT_SENDER.with(|s| {
        *s.borrow_mut() = None;
    });

    result
}

fn pump_hooks(
    running: &AtomicBool,
    thread_id: &AtomicU32,
    config: &CollectorConfig,
) -> Result<(), CollectorError> {
    unsafe {
        thread_id.store(GetCurrentThreadId(), Ordering::SeqCst);

        let mut hooks: Vec<HHOOK> = Vec::new();

        if config.capture_keyboard {
            match SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) {
                Ok(hook) => hooks.push(hook),
                Err(_) => return Err(CollectorError::HookInstallationFailed),
            }
        }

        if config.capture_mouse {
            match SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), None, 0) {
                Ok(hook) => hooks.push(hook),
                Err(_) => {
                    for hook in hooks {
                        let _ = UnhookWindowsHookEx(hook);
                    }
                    return Err(CollectorError::HookInstallationFailed);
                }
            }
        }

        // Hooks run inside GetMessageW; nothing needs dispatching
        let mut msg = MSG::default();
        while running.load(Ordering::SeqCst) {
            let result = GetMessageW(&mut msg, HWND::default(), 0, 0);
            if result.0 <= 0 {
                // WM_QUIT or error
                break;
            }
        }

        for hook in hooks {
            let _ = UnhookWindowsHookEx(hook);
        }
    }

    Ok(())
}

/// Check whether a low-level hook can be installed.
pub fn check_permission() -> bool {
    unsafe {
        match SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) {
            Ok(hook) => {
                let _ = UnhookWindowsHookEx(hook);
                true
            }
            Err(_) => false,
        }
    }
}
