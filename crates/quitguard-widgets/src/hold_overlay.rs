//! The hold-to-quit prompt: a centered box with the instruction, a progress
//! gauge and a "don't ask again" line.
//!
//! The overlay is driven entirely by [`WarnBeforeQuitState`] updates. It
//! reports pointer hover back to the manager through
//! [`HoldToQuitOverlay::hover_change`] and handles the "don't ask again"
//! click itself.

use crate::overlay::{centered_box, contains, render_boxed};
use crossterm::event::{MouseButton, MouseEventKind};
use quitguard_core::{InputEvent, Shortcut, WarnBeforeQuitAction, WarnBeforeQuitPreferences, WarnBeforeQuitState};
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph};
use ratatui::Frame;
use std::cell::Cell;
use std::time::Instant;
use unicode_width::UnicodeWidthStr;

const DONT_ASK_AGAIN: &str = "Don't ask again";
const MIN_WIDTH: u16 = 34;
// Border, message, gauge, spacer, hint, border.
const HEIGHT: u16 = 6;

/// Colors for [`HoldToQuitOverlay`].
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    /// Border and title.
    pub border: Style,
    /// The instruction line.
    pub message: Style,
    /// Filled part of the gauge.
    pub gauge: Style,
    /// The "don't ask again" line.
    pub hint: Style,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            border: Style::default().fg(Color::Yellow),
            message: Style::default().add_modifier(Modifier::BOLD),
            gauge: Style::default().fg(Color::Yellow).bg(Color::DarkGray),
            hint: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::UNDERLINED),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    outer: Rect,
    hint: Rect,
}

/// Presentation of one warn-before-quit session.
pub struct HoldToQuitOverlay {
    shortcut: Shortcut,
    action: WarnBeforeQuitAction,
    state: WarnBeforeQuitState,
    frozen_progress: f64,
    // Set from the first early release until the session ends, so the
    // prompt survives the brief KeyDown of a second press.
    second_press: bool,
    style: OverlayStyle,
    placement: Cell<Option<Placement>>,
}

impl HoldToQuitOverlay {
    pub fn new(shortcut: Shortcut, action: WarnBeforeQuitAction) -> Self {
        Self {
            shortcut,
            action,
            state: WarnBeforeQuitState::Idle,
            frozen_progress: 0.0,
            second_press: false,
            style: OverlayStyle::default(),
            placement: Cell::new(None),
        }
    }

    /// Replace the default colors.
    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    /// Apply a state published by the manager.
    pub fn update(&mut self, state: WarnBeforeQuitState) {
        self.update_at(state, Instant::now());
    }

    /// Like [`update`](Self::update), with an explicit clock.
    pub fn update_at(&mut self, state: WarnBeforeQuitState, now: Instant) {
        match (self.state, state) {
            (held @ WarnBeforeQuitState::Holding { .. }, WarnBeforeQuitState::WaitingForSecondPress) => {
                self.frozen_progress = held.progress_at(now).unwrap_or(0.0);
            }
            (_, WarnBeforeQuitState::WaitingForSecondPress) => {}
            (WarnBeforeQuitState::WaitingForSecondPress, WarnBeforeQuitState::KeyDown) => {}
            _ => self.frozen_progress = 0.0,
        }
        self.second_press = match state {
            WarnBeforeQuitState::WaitingForSecondPress => true,
            WarnBeforeQuitState::KeyDown | WarnBeforeQuitState::Holding { .. } => self.second_press,
            WarnBeforeQuitState::Idle | WarnBeforeQuitState::Completed { .. } => false,
        };
        self.state = state;
        if !self.is_visible() {
            self.placement.set(None);
        }
    }

    /// The last state applied.
    pub fn state(&self) -> WarnBeforeQuitState {
        self.state
    }

    /// Whether the prompt is on screen.
    pub fn is_visible(&self) -> bool {
        match self.state {
            WarnBeforeQuitState::Holding { .. } | WarnBeforeQuitState::WaitingForSecondPress => true,
            WarnBeforeQuitState::KeyDown => self.second_press,
            _ => false,
        }
    }

    /// Gauge fill in `0.0..=1.0` at `now`. Frozen while waiting for the
    /// second press.
    pub fn progress_at(&self, now: Instant) -> f64 {
        match self.state {
            WarnBeforeQuitState::Holding { .. } => self.state.progress_at(now).unwrap_or(0.0),
            WarnBeforeQuitState::WaitingForSecondPress => self.frozen_progress,
            WarnBeforeQuitState::KeyDown if self.second_press => self.frozen_progress,
            _ => 0.0,
        }
    }

    /// The instruction for the current state.
    pub fn message(&self) -> String {
        let verb = match self.action {
            WarnBeforeQuitAction::Quit => "quit",
            WarnBeforeQuitAction::CloseTab => "close",
        };
        match self.state {
            WarnBeforeQuitState::WaitingForSecondPress | WarnBeforeQuitState::KeyDown
                if self.second_press =>
            {
                format!("Press {} again to {verb}", self.shortcut)
            }
            _ => format!("Hold {} to {verb}", self.shortcut),
        }
    }

    /// Render at the current time.
    pub fn view(&self, frame: &mut Frame, area: Rect) {
        self.view_at(frame, area, Instant::now());
    }

    /// Render as of `now`. Draws nothing unless visible.
    pub fn view_at(&self, frame: &mut Frame, area: Rect, now: Instant) {
        if !self.is_visible() {
            self.placement.set(None);
            return;
        }
        let message = self.message();
        let width = (message.width() as u16 + 6).max(MIN_WIDTH);
        let outer = centered_box(width, HEIGHT, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(self.style.border);
        let inner = render_boxed(frame, outer, &block);

        let row = |offset: u16| Rect::new(inner.x, inner.y + offset, inner.width, 1).intersection(inner);
        frame.render_widget(
            Paragraph::new(Line::from(message)).style(self.style.message).alignment(Alignment::Center),
            row(0),
        );
        let ratio = self.progress_at(now).clamp(0.0, 1.0);
        frame.render_widget(
            Gauge::default()
                .gauge_style(self.style.gauge)
                .ratio(ratio)
                .label(format!("{:.0}%", ratio * 100.0)),
            row(1),
        );

        let hint_row = row(3);
        let hint_width = (DONT_ASK_AGAIN.width() as u16).min(hint_row.width);
        let hint = Rect::new(
            hint_row.x + (hint_row.width - hint_width) / 2,
            hint_row.y,
            hint_width,
            hint_row.height,
        );
        frame.render_widget(Paragraph::new(DONT_ASK_AGAIN).style(self.style.hint), hint);
        self.placement.set(Some(Placement { outer, hint }));
    }

    /// Whether (`column`, `row`) is over the rendered prompt.
    pub fn hit_test(&self, column: u16, row: u16) -> bool {
        self.placement
            .get()
            .is_some_and(|placed| contains(placed.outer, column, row))
    }

    /// For pointer motion, whether it is now over the prompt. `None` for
    /// every other event.
    pub fn hover_change(&self, event: &InputEvent) -> Option<bool> {
        match event {
            InputEvent::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Moved) => {
                Some(self.hit_test(mouse.column, mouse.row))
            }
            _ => None,
        }
    }

    /// Handle a click. Clicking "don't ask again" turns the warning off and
    /// returns `true`.
    pub fn click(&self, column: u16, row: u16, preferences: &dyn WarnBeforeQuitPreferences) -> bool {
        let on_hint = self
            .placement
            .get()
            .is_some_and(|placed| contains(placed.hint, column, row));
        if on_hint {
            preferences.set_warning_enabled(false);
        }
        on_hint
    }

    /// [`click`](Self::click) for a left-button press event.
    pub fn handle_click(&self, event: &InputEvent, preferences: &dyn WarnBeforeQuitPreferences) -> bool {
        match event {
            InputEvent::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                self.click(mouse.column, mouse.row, preferences)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quitguard_core::InMemoryPreferences;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::time::Duration;

    fn render_string(overlay: &HoldToQuitOverlay, width: u16, height: u16, now: Instant) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|frame| {
                let area = frame.area();
                overlay.view_at(frame, area, now)
            })
            .unwrap();
        let buffer = terminal.backend().buffer();
        let mut output = String::new();
        for y in 0..height {
            for x in 0..width {
                output.push_str(buffer[(x, y)].symbol());
            }
            output.push('\n');
        }
        output
    }

    fn holding(start: Instant) -> WarnBeforeQuitState {
        WarnBeforeQuitState::Holding {
            started_at: start,
            target_time: start + Duration::from_millis(600),
        }
    }

    fn quit_overlay() -> HoldToQuitOverlay {
        HoldToQuitOverlay::new(Shortcut::cmd('q'), WarnBeforeQuitAction::Quit)
    }

    #[test]
    fn hidden_until_holding() {
        let mut overlay = quit_overlay();
        let now = Instant::now();
        assert!(!overlay.is_visible());
        overlay.update_at(WarnBeforeQuitState::KeyDown, now);
        assert!(!overlay.is_visible());
        let screen = render_string(&overlay, 60, 12, now);
        assert!(screen.trim().is_empty());
        assert!(!overlay.hit_test(30, 6));
    }

    #[test]
    fn holding_renders_message_and_progress() {
        let mut overlay = quit_overlay();
        let start = Instant::now();
        overlay.update_at(holding(start), start);

        let screen = render_string(&overlay, 60, 12, start + Duration::from_millis(300));
        assert!(screen.contains("Hold ⌘Q to quit"), "{screen}");
        assert!(screen.contains("50%"), "{screen}");
        assert!(screen.contains(DONT_ASK_AGAIN), "{screen}");
    }

    #[test]
    fn waiting_freezes_progress_and_changes_message() {
        let mut overlay = quit_overlay();
        let start = Instant::now();
        overlay.update_at(holding(start), start);
        overlay.update_at(
            WarnBeforeQuitState::WaitingForSecondPress,
            start + Duration::from_millis(150),
        );

        let later = start + Duration::from_secs(3);
        assert!((overlay.progress_at(later) - 0.25).abs() < 1e-9);
        let screen = render_string(&overlay, 60, 12, later);
        assert!(screen.contains("Press ⌘Q again to quit"), "{screen}");
        assert!(screen.contains("25%"), "{screen}");
    }

    #[test]
    fn second_press_keeps_the_prompt_up() {
        let mut overlay = quit_overlay();
        let start = Instant::now();
        overlay.update_at(holding(start), start);
        overlay.update_at(
            WarnBeforeQuitState::WaitingForSecondPress,
            start + Duration::from_millis(150),
        );
        render_string(&overlay, 60, 12, start);

        let pressed = start + Duration::from_secs(1);
        overlay.update_at(WarnBeforeQuitState::KeyDown, pressed);
        assert!(overlay.is_visible());
        assert!(overlay.hit_test(30, 6));
        assert!((overlay.progress_at(pressed) - 0.25).abs() < 1e-9);
        let screen = render_string(&overlay, 60, 12, pressed);
        assert!(screen.contains("Press ⌘Q again to quit"), "{screen}");
        assert!(screen.contains("25%"), "{screen}");

        overlay.update_at(WarnBeforeQuitState::Completed { should_proceed: true }, pressed);
        overlay.update_at(WarnBeforeQuitState::Idle, pressed);
        overlay.update_at(WarnBeforeQuitState::KeyDown, pressed);
        assert!(!overlay.is_visible());
    }

    #[test]
    fn completion_hides_and_forgets_placement() {
        let mut overlay = quit_overlay();
        let start = Instant::now();
        overlay.update_at(holding(start), start);
        render_string(&overlay, 60, 12, start);
        assert!(overlay.hit_test(30, 6));

        overlay.update_at(WarnBeforeQuitState::Completed { should_proceed: true }, start);
        assert!(!overlay.is_visible());
        assert!(!overlay.hit_test(30, 6));
        assert_eq!(overlay.progress_at(start), 0.0);
    }

    #[test]
    fn hover_tracks_pointer_motion() {
        let mut overlay = quit_overlay();
        let start = Instant::now();
        overlay.update_at(WarnBeforeQuitState::WaitingForSecondPress, start);
        render_string(&overlay, 60, 12, start);

        assert_eq!(overlay.hover_change(&InputEvent::mouse_moved(30, 6)), Some(true));
        assert_eq!(overlay.hover_change(&InputEvent::mouse_moved(0, 0)), Some(false));
        assert_eq!(overlay.hover_change(&InputEvent::FocusLost), None);
    }

    #[test]
    fn dont_ask_again_click_disables_warning() {
        let mut overlay = quit_overlay();
        let start = Instant::now();
        overlay.update_at(WarnBeforeQuitState::WaitingForSecondPress, start);
        let screen = render_string(&overlay, 60, 12, start);

        let (row, line) = screen
            .lines()
            .enumerate()
            .find(|(_, line)| line.contains(DONT_ASK_AGAIN))
            .expect("hint rendered");
        let column = line.chars().take_while(|c| *c != 'D').count() as u16;

        let preferences = InMemoryPreferences::new();
        assert!(!overlay.click(0, 0, &preferences));
        assert!(preferences.is_warning_enabled());

        let click = InputEvent::mouse_down(column + 2, row as u16);
        assert!(overlay.handle_click(&click, &preferences));
        assert!(!preferences.is_warning_enabled());
    }

    #[test]
    fn close_tab_wording() {
        let mut overlay = HoldToQuitOverlay::new(Shortcut::cmd('w'), WarnBeforeQuitAction::CloseTab);
        assert_eq!(overlay.message(), "Hold ⌘W to close");
        overlay.update(WarnBeforeQuitState::WaitingForSecondPress);
        assert_eq!(overlay.message(), "Press ⌘W again to close");
    }
}
