use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::ops::BitOr;

/// Native input events as seen by the termination pipeline.
///
/// Key and mouse payloads are crossterm's, so key events carry their
/// press / repeat / release [`KeyEventKind`]. Presses and releases of bare
/// modifier keys are folded into [`FlagsChanged`](InputEvent::FlagsChanged),
/// which carries the modifier mask that is held *after* the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A keyboard event for a non-modifier key.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
    /// The set of held modifier keys changed.
    FlagsChanged(KeyModifiers),
    /// Terminal resized to (columns, rows).
    Resize(u16, u16),
    /// Window gained focus.
    FocusGained,
    /// Window lost focus.
    FocusLost,
    /// Bracketed paste content.
    Paste(String),
}

impl InputEvent {
    /// A key press with the given modifiers.
    pub fn key_down(code: KeyCode, modifiers: KeyModifiers) -> Self {
        InputEvent::Key(KeyEvent::new_with_kind(code, modifiers, KeyEventKind::Press))
    }

    /// An auto-repeat key press.
    pub fn key_repeat(code: KeyCode, modifiers: KeyModifiers) -> Self {
        InputEvent::Key(KeyEvent::new_with_kind(code, modifiers, KeyEventKind::Repeat))
    }

    /// A key release with the given modifiers.
    pub fn key_up(code: KeyCode, modifiers: KeyModifiers) -> Self {
        InputEvent::Key(KeyEvent::new_with_kind(code, modifiers, KeyEventKind::Release))
    }

    /// A left-button press at (column, row).
    pub fn mouse_down(column: u16, row: u16) -> Self {
        InputEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    /// Pointer motion to (column, row).
    pub fn mouse_moved(column: u16, row: u16) -> Self {
        InputEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Moved,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    /// The mask bit this event belongs to.
    pub fn kind(&self) -> EventMask {
        match self {
            InputEvent::Key(key) => match key.kind {
                KeyEventKind::Press | KeyEventKind::Repeat => EventMask::KEY_DOWN,
                KeyEventKind::Release => EventMask::KEY_UP,
            },
            InputEvent::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
                EventMask::MOUSE_DOWN
            }
            InputEvent::FlagsChanged(_) => EventMask::FLAGS_CHANGED,
            _ => EventMask::OTHER,
        }
    }

    /// Returns `true` for a non-repeat Escape press.
    pub fn is_escape_press(&self) -> bool {
        matches!(
            self,
            InputEvent::Key(KeyEvent { code: KeyCode::Esc, kind: KeyEventKind::Press, .. })
        )
    }
}

impl From<crossterm::event::Event> for InputEvent {
    fn from(event: crossterm::event::Event) -> Self {
        use crossterm::event::Event;
        match event {
            Event::Key(key) => match key.code {
                KeyCode::Modifier(_) => InputEvent::FlagsChanged(key.modifiers),
                _ => InputEvent::Key(key),
            },
            Event::Mouse(mouse) => InputEvent::Mouse(mouse),
            Event::Resize(w, h) => InputEvent::Resize(w, h),
            Event::FocusGained => InputEvent::FocusGained,
            Event::FocusLost => InputEvent::FocusLost,
            Event::Paste(text) => InputEvent::Paste(text),
        }
    }
}

/// A set of [`InputEvent`] kinds, used to filter the event queue.
///
/// ```
/// use quitguard_core::event::{EventMask, InputEvent};
/// use crossterm::event::{KeyCode, KeyModifiers};
///
/// let mask = EventMask::KEY_DOWN | EventMask::KEY_UP;
/// assert!(mask.matches(&InputEvent::key_down(KeyCode::Char('q'), KeyModifiers::SUPER)));
/// assert!(!mask.matches(&InputEvent::mouse_down(0, 0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventMask(u8);

impl EventMask {
    /// Key presses and auto-repeats.
    pub const KEY_DOWN: EventMask = EventMask(1);
    /// Key releases.
    pub const KEY_UP: EventMask = EventMask(1 << 1);
    /// Modifier flag changes.
    pub const FLAGS_CHANGED: EventMask = EventMask(1 << 2);
    /// Mouse button presses.
    pub const MOUSE_DOWN: EventMask = EventMask(1 << 3);
    /// Everything else (motion, resize, focus, paste).
    pub const OTHER: EventMask = EventMask(1 << 4);
    /// Every event kind.
    pub const ALL: EventMask = EventMask(0b1_1111);

    /// Whether `event` belongs to this set.
    pub fn matches(self, event: &InputEvent) -> bool {
        self.contains(event.kind())
    }

    /// Whether every kind in `other` is in this set.
    pub fn contains(self, other: EventMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}
