//! Raw input event types delivered by an input source.
//!
//! These are the un-normalized shapes a hook backend hands to a pipeline:
//! key identifiers, screen-space coordinates, button identifiers and scroll
//! deltas. Rendering to text happens here too, since it never fails.

use std::fmt;

/// A single raw event from the input-hook layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(RawKey),
    KeyUp(RawKey),
    Move {
        x: i32,
        y: i32,
    },
    Button {
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    },
    Scroll {
        x: i32,
        y: i32,
        dx: i32,
        dy: i32,
    },
}

impl InputEvent {
    /// Whether this event belongs to the keyboard pipeline.
    pub fn is_keyboard(&self) -> bool {
        matches!(self, InputEvent::KeyDown(_) | InputEvent::KeyUp(_))
    }
}

/// Symbolic names for non-printable and modifier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyName {
    Alt,
    AltR,
    Backspace,
    CapsLock,
    Cmd,
    CmdR,
    Ctrl,
    CtrlR,
    Delete,
    Down,
    End,
    Enter,
    Esc,
    /// Function keys, `F(1)` through `F(20)`.
    F(u8),
    Home,
    Insert,
    Left,
    Menu,
    NumLock,
    PageDown,
    PageUp,
    Pause,
    PrintScreen,
    Right,
    ScrollLock,
    Shift,
    ShiftR,
    Space,
    Tab,
    Up,
}

impl KeyName {
    fn as_str(&self) -> &'static str {
        match self {
            KeyName::Alt => "alt",
            KeyName::AltR => "alt_r",
            KeyName::Backspace => "backspace",
            KeyName::CapsLock => "caps_lock",
            KeyName::Cmd => "cmd",
            KeyName::CmdR => "cmd_r",
            KeyName::Ctrl => "ctrl",
            KeyName::CtrlR => "ctrl_r",
            KeyName::Delete => "delete",
            KeyName::Down => "down",
            KeyName::End => "end",
            KeyName::Enter => "enter",
            KeyName::Esc => "esc",
            KeyName::F(_) => "f",
            KeyName::Home => "home",
            KeyName::Insert => "insert",
            KeyName::Left => "left",
            KeyName::Menu => "menu",
            KeyName::NumLock => "num_lock",
            KeyName::PageDown => "page_down",
            KeyName::PageUp => "page_up",
            KeyName::Pause => "pause",
            KeyName::PrintScreen => "print_screen",
            KeyName::Right => "right",
            KeyName::ScrollLock => "scroll_lock",
            KeyName::Shift => "shift",
            KeyName::ShiftR => "shift_r",
            KeyName::Space => "space",
            KeyName::Tab => "tab",
            KeyName::Up => "up",
        }
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyName::F(n) => write!(f, "Key.f{n}"),
            other => write!(f, "Key.{}", other.as_str()),
        }
    }
}

/// A physical or virtual key as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawKey {
    /// A printable character.
    Char(char),
    /// A known non-printable or modifier key.
    Named(KeyName),
    /// A platform key code we have no name for.
    Code(u32),
}

impl RawKey {
    /// Render the key as a stable textual identifier.
    ///
    /// Never fails: unknown codes render as `<code>`.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Map a macOS virtual key code (ANSI layout) to a key.
    pub fn from_mac_keycode(code: u16) -> Self {
        if let Some(&(_, c)) = MAC_ANSI_CHARS.iter().find(|(k, _)| *k == code) {
            return RawKey::Char(c);
        }

        let name = match code {
            36 | 76 => KeyName::Enter,
            48 => KeyName::Tab,
            49 => KeyName::Space,
            51 => KeyName::Backspace,
            53 => KeyName::Esc,
            54 => KeyName::CmdR,
            55 => KeyName::Cmd,
            56 => KeyName::Shift,
            57 => KeyName::CapsLock,
            58 => KeyName::Alt,
            59 => KeyName::Ctrl,
            60 => KeyName::ShiftR,
            61 => KeyName::AltR,
            62 => KeyName::CtrlR,
            122 => KeyName::F(1),
            120 => KeyName::F(2),
            99 => KeyName::F(3),
            118 => KeyName::F(4),
            96 => KeyName::F(5),
            97 => KeyName::F(6),
            98 => KeyName::F(7),
            100 => KeyName::F(8),
            101 => KeyName::F(9),
            109 => KeyName::F(10),
            103 => KeyName::F(11),
            111 => KeyName::F(12),
            114 => KeyName::Insert,
            115 => KeyName::Home,
            116 => KeyName::PageUp,
            117 => KeyName::Delete,
            119 => KeyName::End,
            121 => KeyName::PageDown,
            123 => KeyName::Left,
            124 => KeyName::Right,
            125 => KeyName::Down,
            126 => KeyName::Up,
            _ => return RawKey::Code(u32::from(code)),
        };
        RawKey::Named(name)
    }

    /// Map a Windows virtual-key code to a key.
    ///
    /// Letters are reported lowercase; shift state is recorded by its own
    /// key events.
    pub fn from_windows_vk(vk: u32) -> Self {
        match vk {
            0x30..=0x39 => return RawKey::Char(char::from(b'0' + (vk - 0x30) as u8)),
            0x41..=0x5A => return RawKey::Char(char::from(b'a' + (vk - 0x41) as u8)),
            0x60..=0x69 => return RawKey::Char(char::from(b'0' + (vk - 0x60) as u8)),
            0x70..=0x83 => return RawKey::Named(KeyName::F((vk - 0x6F) as u8)),
            _ => {}
        }

        if let Some(&(_, c)) = WINDOWS_VK_CHARS.iter().find(|(k, _)| *k == vk) {
            return RawKey::Char(c);
        }

        let name = match vk {
            0x08 => KeyName::Backspace,
            0x09 => KeyName::Tab,
            0x0D => KeyName::Enter,
            0x10 | 0xA0 => KeyName::Shift,
            0xA1 => KeyName::ShiftR,
            0x11 | 0xA2 => KeyName::Ctrl,
            0xA3 => KeyName::CtrlR,
            0x12 | 0xA4 => KeyName::Alt,
            0xA5 => KeyName::AltR,
            0x13 => KeyName::Pause,
            0x14 => KeyName::CapsLock,
            0x1B => KeyName::Esc,
            0x20 => KeyName::Space,
            0x21 => KeyName::PageUp,
            0x22 => KeyName::PageDown,
            0x23 => KeyName::End,
            0x24 => KeyName::Home,
            0x25 => KeyName::Left,
            0x26 => KeyName::Up,
            0x27 => KeyName::Right,
            0x28 => KeyName::Down,
            0x2C => KeyName::PrintScreen,
            0x2D => KeyName::Insert,
            0x2E => KeyName::Delete,
            0x5B => KeyName::Cmd,
            0x5C => KeyName::CmdR,
            0x5D => KeyName::Menu,
            0x90 => KeyName::NumLock,
            0x91 => KeyName::ScrollLock,
            _ => return RawKey::Code(vk),
        };
        RawKey::Named(name)
    }
}

impl fmt::Display for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawKey::Char(c) => write!(f, "{c}"),
            RawKey::Named(name) => write!(f, "{name}"),
            RawKey::Code(code) => write!(f, "<{code}>"),
        }
    }
}

/// macOS ANSI virtual key codes for printable keys.
const MAC_ANSI_CHARS: &[(u16, char)] = &[
    (0, 'a'),
    (1, 's'),
    (2, 'd'),
    (3, 'f'),
    (4, 'h'),
    (5, 'g'),
    (6, 'z'),
    (7, 'x'),
    (8, 'c'),
    (9, 'v'),
    (11, 'b'),
    (12, 'q'),
    (13, 'w'),
    (14, 'e'),
    (15, 'r'),
    (16, 'y'),
    (17, 't'),
    (18, '1'),
    (19, '2'),
    (20, '3'),
    (21, '4'),
    (22, '6'),
    (23, '5'),
    (24, '='),
    (25, '9'),
    (26, '7'),
    (27, '-'),
    (28, '8'),
    (29, '0'),
    (30, ']'),
    (31, 'o'),
    (32, 'u'),
    (33, '['),
    (34, 'i'),
    (35, 'p'),
    (37, 'l'),
    (38, 'j'),
    (39, '\''),
    (40, 'k'),
    (41, ';'),
    (42, '\\'),
    (43, ','),
    (44, '/'),
    (45, 'n'),
    (46, 'm'),
    (47, '.'),
    (50, '`'),
];

/// Windows numpad operators and US-layout OEM keys.
const WINDOWS_VK_CHARS: &[(u32, char)] = &[
    (0x6A, '*'),
    (0x6B, '+'),
    (0x6D, '-'),
    (0x6E, '.'),
    (0x6F, '/'),
    (0xBA, ';'),
    (0xBB, '='),
    (0xBC, ','),
    (0xBD, '-'),
    (0xBE, '.'),
    (0xBF, '/'),
    (0xC0, '`'),
    (0xDB, '['),
    (0xDC, '\\'),
    (0xDD, ']'),
    (0xDE, '\''),
];

/// A pointer button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    /// Any extra button, by platform button number.
    Other(u16),
}

impl MouseButton {
    /// Render the button as a stable textual identifier.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Map a platform button number (0 = left, 1 = right, 2 = middle).
    pub fn from_number(n: u16) -> Self {
        match n {
            0 => MouseButton::Left,
            1 => MouseButton::Right,
            2 => MouseButton::Middle,
            n => MouseButton::Other(n),
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseButton::Left => write!(f, "Button.left"),
            MouseButton::Right => write!(f, "Button.right"),
            MouseButton::Middle => write!(f, "Button.middle"),
            MouseButton::Other(n) => write!(f, "Button.button{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_rendering() {
        assert_eq!(RawKey::Char('a').render(), "a");
        assert_eq!(RawKey::Named(KeyName::Shift).render(), "Key.shift");
        assert_eq!(RawKey::Named(KeyName::F(5)).render(), "Key.f5");
        assert_eq!(RawKey::Code(255).render(), "<255>");
    }

    #[test]
    fn test_mac_keycodes() {
        assert_eq!(RawKey::from_mac_keycode(0), RawKey::Char('a'));
        assert_eq!(RawKey::from_mac_keycode(49), RawKey::Named(KeyName::Space));
        assert_eq!(RawKey::from_mac_keycode(122), RawKey::Named(KeyName::F(1)));
        assert_eq!(RawKey::from_mac_keycode(200), RawKey::Code(200));
    }

    #[test]
    fn test_windows_vk_codes() {
        assert_eq!(RawKey::from_windows_vk(0x41), RawKey::Char('a'));
        assert_eq!(RawKey::from_windows_vk(0x5A), RawKey::Char('z'));
        assert_eq!(RawKey::from_windows_vk(0x37), RawKey::Char('7'));
        assert_eq!(RawKey::from_windows_vk(0x70), RawKey::Named(KeyName::F(1)));
        assert_eq!(RawKey::from_windows_vk(0x7B), RawKey::Named(KeyName::F(12)));
        assert_eq!(RawKey::from_windows_vk(0xA1), RawKey::Named(KeyName::ShiftR));
        assert_eq!(RawKey::from_windows_vk(0xFF), RawKey::Code(0xFF));
    }

    #[test]
    fn test_windows_punctuation_and_numpad() {
        assert_eq!(RawKey::from_windows_vk(0xBA).render(), ";");
        assert_eq!(RawKey::from_windows_vk(0xBC).render(), ",");
        assert_eq!(RawKey::from_windows_vk(0xDC).render(), "\\");
        assert_eq!(RawKey::from_windows_vk(0xDE).render(), "'");
        assert_eq!(RawKey::from_windows_vk(0x60).render(), "0");
        assert_eq!(RawKey::from_windows_vk(0x69).render(), "9");
        assert_eq!(RawKey::from_windows_vk(0x6B).render(), "+");
    }

    #[test]
    fn test_button_rendering() {
        assert_eq!(MouseButton::Left.render(), "Button.left");
        assert_eq!(MouseButton::from_number(2).render(), "Button.middle");
        assert_eq!(MouseButton::from_number(4).render(), "Button.button4");
    }

    #[test]
    fn test_event_pipeline_split() {
        assert!(InputEvent::KeyDown(RawKey::Char('a')).is_keyboard());
        assert!(!InputEvent::Move { x: 1, y: 2 }.is_keyboard());
    }
}
