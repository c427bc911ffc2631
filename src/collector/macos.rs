//! macOS input source using a CGEvent tap.
//!
//! Captures keyboard and mouse events at the session level. Requires the
//! Input Monitoring permission.

use crate::collector::types::{InputEvent, MouseButton, RawKey};
use crate::collector::{CollectorConfig, CollectorError, InputSource};
use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTap, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventType, CallbackResult, EventField,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// The macOS event collector using CGEvent tap.
pub struct MacOSCollector {
    config: CollectorConfig,
    /// Handed to the listener thread on start
    sender: Option<Sender<InputEvent>>,
    receiver: Receiver<InputEvent>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl MacOSCollector {
    /// Create a new macOS collector with the given configuration.
    pub fn new(config: CollectorConfig) -> Self {
        // Unbounded: a slow writer delays events, it never drops them
        let (sender, receiver) = unbounded();

        Self {
            config,
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }
}

impl InputSource for MacOSCollector {
    /// Start the event tap on a dedicated listener thread.
    fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        if !check_permission() {
            return Err(CollectorError::PermissionDenied);
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
        let config = self.config.clone();

        let handle = thread::spawn(move || {
            if let Err(e) = run_event_loop(sender, running.clone(), config) {
                tracing::error!("Event tap stopped: {e}");
            }
            running.store(false, Ordering::SeqCst);
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            // The run loop wakes every 100ms and sees the flag
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

impl Drop for MacOSCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build a list of event types to capture based on configuration.
fn build_event_types(config: &CollectorConfig) -> Vec<CGEventType> {
    let mut types = Vec::new();

    if config.capture_keyboard {
        types.push(CGEventType::KeyDown);
        types.push(CGEventType::KeyUp);
        types.push(CGEventType::FlagsChanged);
    }

    if config.capture_mouse {
        types.push(CGEventType::MouseMoved);
        types.push(CGEventType::LeftMouseDown);
        types.push(CGEventType::LeftMouseUp);
        types.push(CGEventType::RightMouseDown);
        types.push(CGEventType::RightMouseUp);
        types.push(CGEventType::OtherMouseDown);
        types.push(CGEventType::OtherMouseUp);
        types.push(CGEventType::LeftMouseDragged);
        types.push(CGEventType::RightMouseDragged);
        types.push(CGEventType::OtherMouseDragged);
        types.push(CGEventType::ScrollWheel);
    }

    types
}

fn run_event_loop(
    sender: Sender<InputEvent>,
    running: Arc<AtomicBool>,
    config: CollectorConfig,
) -> Result<(), CollectorError> {
    let event_types = build_event_types(&config);

    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        event_types,
        move |_proxy, event_type, event| {
            if let Some(input) = process_cg_event(event_type, event) {
                let _ = sender.send(input);
            }
            // Passive observer
            CallbackResult::Keep
        },
    )
    .map_err(|_| CollectorError::TapCreationFailed)?;

    let source = tap
        .mach_port()
        .create_runloop_source(0)
        .map_err(|_| CollectorError::RunLoopSourceFailed)?;

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&source, kCFRunLoopCommonModes);
    }

    tap.enable();

    while running.load(Ordering::SeqCst) {
        CFRunLoop::run_in_mode(
            unsafe { kCFRunLoopCommonModes },
            std::time::Duration::from_millis(100),
            false,
        );
    }

    Ok(())
}

/// Convert a CGEvent into a raw input event.
fn process_cg_event(event_type: CGEventType, event: &CGEvent) -> Option<InputEvent> {
    use core_graphics::event::CGEventType::*;

    let point = event.location();
    let (x, y) = (point.x.round() as i32, point.y.round() as i32);

    match event_type {
        KeyDown => Some(InputEvent::KeyDown(key_of(event))),
        KeyUp => Some(InputEvent::KeyUp(key_of(event))),
        FlagsChanged => {
            let code = keycode_of(event);
            let key = RawKey::from_mac_keycode(code);
            if modifier_is_down(code, event.get_flags()) {
                Some(InputEvent::KeyDown(key))
            } else {
                Some(InputEvent::KeyUp(key))
            }
        }

        MouseMoved | LeftMouseDragged | RightMouseDragged | OtherMouseDragged => {
            Some(InputEvent::Move { x, y })
        }

        LeftMouseDown | LeftMouseUp => Some(InputEvent::Button {
            x,
            y,
            button: MouseButton::Left,
            pressed: matches!(event_type, LeftMouseDown),
        }),
        RightMouseDown | RightMouseUp => Some(InputEvent::Button {
            x,
            y,
            button: MouseButton::Right,
            pressed: matches!(event_type, RightMouseDown),
        }),
        OtherMouseDown | OtherMouseUp => {
            let number = event.get_integer_value_field(EventField::MOUSE_EVENT_BUTTON_NUMBER);
            Some(InputEvent::Button {
                x,
                y,
                button: MouseButton::from_number(number.clamp(0, u16::MAX as i64) as u16),
                pressed: matches!(event_type, OtherMouseDown),
            })
        }

        ScrollWheel => {
            // Axis 1 is vertical, axis 2 horizontal; both in lines
            let dy = event.get_integer_value_field(EventField::SCROLL_WHEEL_EVENT_DELTA_AXIS_1);
            let dx = event.get_integer_value_field(EventField::SCROLL_WHEEL_EVENT_DELTA_AXIS_2);
            Some(InputEvent::Scroll {
                x,
                y,
                dx: dx as i32,
                dy: dy as i32,
            })
        }

        _ => None,
    }
}

fn keycode_of(event: &CGEvent) -> u16 {
    event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16
}

fn key_of(event: &CGEvent) -> RawKey {
    RawKey::from_mac_keycode(keycode_of(event))
}

/// FlagsChanged carries no up/down; infer it from the modifier mask.
fn modifier_is_down(code: u16, flags: CGEventFlags) -> bool {
    let mask = match code {
        54 | 55 => CGEventFlags::CGEventFlagCommand,
        56 | 60 => CGEventFlags::CGEventFlagShift,
        57 => CGEventFlags::CGEventFlagAlphaShift,
        58 | 61 => CGEventFlags::CGEventFlagAlternate,
        59 | 62 => CGEventFlags::CGEventFlagControl,
        _ => return true,
    };
    flags.contains(mask)
}

/// Check if the application has Input Monitoring permission.
///
/// macOS has no direct query; creating a throwaway listen-only tap fails
/// when the permission is missing.
pub fn check_permission() -> bool {
    CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown],
        |_proxy, _type, _event| CallbackResult::Keep,
    )
    .is_ok()
}
