//! Keyboard shortcuts guarded by the warn-before-quit gesture.

use crate::event::InputEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::fmt;

/// A key plus the modifier keys that must be held with it (e.g. ⌘Q).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shortcut {
    /// The base key.
    pub code: KeyCode,
    /// Modifiers that must be held alongside the base key.
    pub modifiers: KeyModifiers,
}

impl Shortcut {
    /// A shortcut with an explicit modifier set.
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Command (super) + `c`.
    pub const fn cmd(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::SUPER)
    }

    /// Control + `c`.
    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Whether `key` is this shortcut's base key, regardless of kind.
    pub fn is_same_key(&self, key: &KeyEvent) -> bool {
        match (self.code, key.code) {
            (KeyCode::Char(a), KeyCode::Char(b)) => a.eq_ignore_ascii_case(&b),
            (a, b) => a == b,
        }
    }

    /// A fresh (non-repeat) press of this shortcut with its modifiers held.
    pub fn matches_press(&self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Key(key) => {
                key.kind == KeyEventKind::Press
                    && self.is_same_key(key)
                    && key.modifiers.contains(self.modifiers)
            }
            _ => false,
        }
    }

    /// An auto-repeat of this shortcut's base key.
    pub fn matches_repeat(&self, event: &InputEvent) -> bool {
        matches!(event, InputEvent::Key(key) if key.kind == KeyEventKind::Repeat && self.is_same_key(key))
    }

    /// A release of this shortcut's base key, whatever modifiers are held.
    pub fn matches_release(&self, event: &InputEvent) -> bool {
        matches!(event, InputEvent::Key(key) if key.kind == KeyEventKind::Release && self.is_same_key(key))
    }

    /// Whether a modifier mask no longer holds every modifier this shortcut needs.
    pub fn modifiers_released(&self, held: KeyModifiers) -> bool {
        !held.contains(self.modifiers)
    }

    /// Whether `event` ends a press of this shortcut: a base-key release or a
    /// modifier change that drops one of the required modifiers.
    pub fn is_released_by(&self, event: &InputEvent) -> bool {
        match event {
            InputEvent::FlagsChanged(held) => self.modifiers_released(*held),
            other => self.matches_release(other),
        }
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, symbol) in [
            (KeyModifiers::CONTROL, "⌃"),
            (KeyModifiers::ALT, "⌥"),
            (KeyModifiers::SHIFT, "⇧"),
            (KeyModifiers::SUPER, "⌘"),
        ] {
            if self.modifiers.contains(flag) {
                f.write_str(symbol)?;
            }
        }
        match self.code {
            KeyCode::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            other => write!(f, "{other}"),
        }
    }
}
