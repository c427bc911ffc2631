//! Input sources for the capture pipelines.
//!
//! Hooking the OS is platform-specific and kept behind [`InputSource`]: a
//! source delivers [`InputEvent`]s on a channel and the pipelines only ever
//! see that channel. The synthetic source is always compiled so pipelines can
//! be driven without a real hook.

pub mod synthetic;
pub mod types;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "windows")]
pub mod windows;

use crossbeam_channel::Receiver;

// Re-export commonly used types
pub use synthetic::{Injector, SyntheticCollector};
pub use types::{InputEvent, KeyName, MouseButton, RawKey};

#[cfg(target_os = "macos")]
pub use macos::{check_permission, MacOSCollector};

/// Platform collector type alias
#[cfg(target_os = "macos")]
pub type Collector = MacOSCollector;

#[cfg(target_os = "windows")]
pub use windows::{check_permission, WindowsCollector};

/// Platform collector type alias
#[cfg(target_os = "windows")]
pub type Collector = WindowsCollector;

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub use synthetic::check_permission;

/// Platform collector type alias
///
/// No hook backend exists here; the synthetic collector never emits unless
/// something injects into it.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub type Collector = SyntheticCollector;

/// Whether this target has a real OS hook backend.
pub const HAS_HOOK_BACKEND: bool = cfg!(any(target_os = "macos", target_os = "windows"));

/// Which event families a collector should capture.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub capture_keyboard: bool,
    pub capture_mouse: bool,
}

impl CollectorConfig {
    /// Capture keyboard events only.
    pub fn keyboard() -> Self {
        Self {
            capture_keyboard: true,
            capture_mouse: false,
        }
    }

    /// Capture mouse events only.
    pub fn mouse() -> Self {
        Self {
            capture_keyboard: false,
            capture_mouse: true,
        }
    }

    /// Whether an event falls within this configuration.
    pub fn accepts(&self, event: &InputEvent) -> bool {
        if event.is_keyboard() {
            self.capture_keyboard
        } else {
            self.capture_mouse
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            capture_keyboard: true,
            capture_mouse: true,
        }
    }
}

/// Errors that can occur while starting a source.
#[derive(Debug)]
pub enum CollectorError {
    AlreadyRunning,
    PermissionDenied,
    TapCreationFailed,
    RunLoopSourceFailed,
    HookInstallationFailed,
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorError::AlreadyRunning => write!(f, "Collector is already running"),
            CollectorError::PermissionDenied => {
                write!(f, "Input Monitoring permission not granted")
            }
            CollectorError::TapCreationFailed => write!(f, "Failed to create CGEvent tap"),
            CollectorError::RunLoopSourceFailed => {
                write!(f, "Failed to create run loop source")
            }
            CollectorError::HookInstallationFailed => {
                write!(f, "Failed to install Windows hook")
            }
        }
    }
}

impl std::error::Error for CollectorError {}

/// A source of raw input events, owned by exactly one pipeline.
pub trait InputSource {
    /// Start delivering events.
    fn start(&mut self) -> Result<(), CollectorError>;

    /// Stop delivering events. Idempotent.
    fn stop(&mut self);

    /// Check if the source is currently delivering.
    fn is_running(&self) -> bool;

    /// The channel events arrive on, in delivery order.
    fn receiver(&self) -> &Receiver<InputEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_config_filters() {
        let keyboard = CollectorConfig::keyboard();
        assert!(keyboard.accepts(&InputEvent::KeyUp(RawKey::Char('x'))));
        assert!(!keyboard.accepts(&InputEvent::Move { x: 0, y: 0 }));

        let mouse = CollectorConfig::mouse();
        assert!(mouse.accepts(&InputEvent::Scroll {
            x: 0,
            y: 0,
            dx: 0,
            dy: -1
        }));
        assert!(!mouse.accepts(&InputEvent::KeyDown(RawKey::Char('x'))));
    }

    #[test]
    fn test_collector_config_default() {
        let config = CollectorConfig::default();
        assert!(config.capture_keyboard);
        assert!(config.capture_mouse);
    }
}
