//! # Hold-to-Quit Example
//!
//! A terminal stand-in for a desktop application's quit handling:
//! - Ctrl+Q runs the termination chain (downloads, hold gesture, auto-clear,
//!   stats flush)
//! - Hold Ctrl+Q to quit, or tap it and press it again
//! - The prompt is drawn from the manager's state stream; hovering it pauses
//!   the timeout and "Don't ask again" turns the warning off
//!
//! Key release events need a terminal that supports the kitty keyboard
//! protocol. Without it every press looks like a quick tap.
//!
//! Set `QUITGUARD_LOG=path` to write logs to a file.
//!
//! Run with: `cargo run -p quitguard --example hold_to_quit`

use quitguard::crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEventKind, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use quitguard::crossterm::execute;
use quitguard::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use quitguard::ratatui::backend::CrosstermBackend;
use quitguard::ratatui::layout::{Constraint, Layout};
use quitguard::ratatui::style::{Color, Modifier, Style};
use quitguard::ratatui::text::{Line, Span};
use quitguard::ratatui::widgets::{Block, Borders, Paragraph};
use quitguard::ratatui::{Frame, Terminal};
use quitguard::tokio::sync::broadcast;
use quitguard::tokio::task::LocalSet;
use quitguard::widgets::HoldToQuitOverlay;
use quitguard::{
    spawn_terminal_feed, ActiveDownloadsDecider, AutoClearHandler, AutoClearPreferences,
    ChannelEventQueue, ClearChoice, ClearConfirmation, DataClearer, DeciderSlot,
    DownloadsConfirmation, DownloadsQuery, EventMask, EventSource, FeedError, FlushDecider,
    InMemoryPreferences, InputEvent, InterceptorSlot, NoopAnalytics, QuitEnvironment, Shortcut,
    TerminationChain, TerminationDeciderHandler, TerminationReply, TerminationReplySink,
    WarnBeforeQuitAction, WarnBeforeQuitManager, WarnBeforeQuitOptions,
    WarnBeforeQuitPreferences, WarnBeforeQuitState,
};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::cell::{Cell, RefCell};
use std::io::{self, Stdout};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing_subscriber::util::SubscriberInitExt;

const FRAME: Duration = Duration::from_millis(16);

type DemoTerminal = Terminal<CrosstermBackend<Stdout>>;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("input feed stopped: {0}")]
    Feed(#[from] FeedError),
    #[error("could not install logger: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}

/// The "operating system": records the deferred reply to the quit request.
#[derive(Default)]
struct Platform {
    exit: Cell<bool>,
    last_reply: Cell<Option<bool>>,
}

impl TerminationReplySink for Platform {
    fn reply_to_should_terminate(&self, should_terminate: bool) {
        self.last_reply.set(Some(should_terminate));
        if should_terminate {
            self.exit.set(true);
        }
    }
}

struct FakeDownloads(Rc<Cell<usize>>);

impl DownloadsQuery for FakeDownloads {
    fn active_downloads(&self) -> usize {
        self.0.get()
    }
}

impl DownloadsConfirmation for FakeDownloads {
    fn confirm_quit(&self, active_downloads: usize) -> bool {
        tracing::info!(active_downloads, "keeping downloads; quit refused");
        false
    }
}

struct RememberedChoice;

impl ClearConfirmation for RememberedChoice {
    fn confirm(&self) -> ClearChoice {
        ClearChoice::ClearAndQuit
    }
}

struct SlowClearer;

impl DataClearer for SlowClearer {
    fn clear(&self) -> LocalBoxFuture<'static, ()> {
        async {
            tokio::time::sleep(Duration::from_millis(800)).await;
            tracing::info!("browsing data cleared");
        }
        .boxed_local()
    }
}

/// Event source that keeps the screen painted while a gesture blocks on it.
struct RedrawingQueue {
    queue: ChannelEventQueue,
    redraw: Box<dyn FnMut()>,
}

impl RedrawingQueue {
    fn next_event(&mut self) -> Result<Option<InputEvent>, FeedError> {
        self.queue.next_event(Duration::ZERO)
    }
}

impl EventSource for RedrawingQueue {
    fn now(&self) -> Instant {
        self.queue.now()
    }

    fn next_event_matching(&mut self, mask: EventMask, deadline: Instant) -> Option<InputEvent> {
        loop {
            (self.redraw)();
            let slice = (Instant::now() + FRAME).min(deadline);
            if let Some(event) = self.queue.next_event_matching(mask, slice) {
                return Some(event);
            }
            if self.queue.is_disconnected() || Instant::now() >= deadline {
                return None;
            }
        }
    }

    fn is_disconnected(&self) -> bool {
        self.queue.is_disconnected()
    }

    fn post_event(&mut self, event: InputEvent, at_start: bool) {
        self.queue.post_event(event, at_start);
    }
}

struct Ui {
    overlay: Option<HoldToQuitOverlay>,
    states: Option<broadcast::Receiver<WarnBeforeQuitState>>,
    status: String,
    downloads: Rc<Cell<usize>>,
    preferences: Rc<InMemoryPreferences>,
    shortcut: Shortcut,
}

impl Ui {
    fn follow(&mut self, manager: &WarnBeforeQuitManager) {
        self.overlay = Some(HoldToQuitOverlay::new(manager.shortcut(), manager.action()));
        self.states = Some(manager.subscribe());
    }

    fn sync_states(&mut self) {
        let (Some(states), Some(overlay)) = (self.states.as_mut(), self.overlay.as_mut()) else {
            return;
        };
        loop {
            match states.try_recv() {
                Ok(state) => overlay.update(state),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }

    fn view(&self, frame: &mut Frame) {
        let area = frame.area();
        let [body, footer] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(3)]).areas(area);

        let on_off = |on: bool| if on { "on" } else { "off" };
        let key = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        let lines = vec![
            Line::from(vec![
                Span::styled(format!("{} ", self.shortcut), key),
                Span::raw("quit (hold, or tap twice)"),
            ]),
            Line::from(vec![
                Span::styled("d ", key),
                Span::raw(format!("active downloads: {}", self.downloads.get())),
            ]),
            Line::from(vec![
                Span::styled("w ", key),
                Span::raw(format!(
                    "warn before quitting: {}",
                    on_off(self.preferences.is_warning_enabled())
                )),
            ]),
            Line::from(vec![
                Span::styled("a ", key),
                Span::raw(format!(
                    "clear data on quit: {}",
                    on_off(self.preferences.is_auto_clear_enabled())
                )),
            ]),
        ];
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" quitguard ")),
            body,
        );
        frame.render_widget(
            Paragraph::new(self.status.as_str()).block(Block::default().borders(Borders::TOP)),
            footer,
        );

        if let Some(overlay) = &self.overlay {
            overlay.view(frame, area);
        }
    }
}

fn redraw(terminal: &RefCell<DemoTerminal>, ui: &RefCell<Ui>) {
    ui.borrow_mut().sync_states();
    let ui = ui.borrow();
    if let Err(err) = terminal.borrow_mut().draw(|frame| ui.view(frame)) {
        tracing::warn!(%err, "redraw failed");
    }
}

/// Restores the terminal however the demo exits.
struct TerminalGuard {
    enhanced: bool,
}

impl TerminalGuard {
    fn enter() -> Result<Self, DemoError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let enhanced = supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                )
            )?;
        } else {
            tracing::warn!("terminal does not report key releases; holds cannot be detected");
        }
        Ok(Self { enhanced })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        if self.enhanced {
            let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(stdout, DisableMouseCapture, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

fn init_logging() -> Result<(), DemoError> {
    let Some(path) = std::env::var_os("QUITGUARD_LOG") else {
        return Ok(());
    };
    let file = quitguard::log_to_file(path)?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("quitguard_core=debug,hold_to_quit=debug")
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .finish()
        .try_init()?;
    Ok(())
}

async fn run() -> Result<(), DemoError> {
    let _guard = TerminalGuard::enter()?;
    let terminal = Rc::new(RefCell::new(Terminal::new(CrosstermBackend::new(io::stdout()))?));

    let options = WarnBeforeQuitOptions {
        quit_shortcut: Shortcut::ctrl('q'),
        close_shortcut: Shortcut::ctrl('w'),
        ..WarnBeforeQuitOptions::default()
    };
    let preferences = Rc::new(InMemoryPreferences::new());
    let downloads = Rc::new(Cell::new(0));
    let ui = Rc::new(RefCell::new(Ui {
        overlay: None,
        states: None,
        status: String::from("Ready."),
        downloads: downloads.clone(),
        preferences: preferences.clone(),
        shortcut: options.quit_shortcut,
    }));

    let (sender, queue) = ChannelEventQueue::new();
    let _feed = spawn_terminal_feed(sender);
    let redraw_ui = ui.clone();
    let redraw_terminal = terminal.clone();
    let events = Rc::new(RefCell::new(RedrawingQueue {
        queue,
        redraw: Box::new(move || redraw(&redraw_terminal, &redraw_ui)),
    }));

    let interceptors = InterceptorSlot::new();
    let env = QuitEnvironment {
        events: events.clone(),
        interceptors: interceptors.clone(),
        preferences: preferences.clone(),
        analytics: Rc::new(NoopAnalytics),
    };
    let platform = Rc::new(Platform::default());
    let handler = TerminationDeciderHandler::new(platform.clone());
    let fake_downloads = Rc::new(FakeDownloads(downloads.clone()));
    let auto_clear = AutoClearHandler::new(
        preferences.clone(),
        Rc::new(RememberedChoice),
        Rc::new(SlowClearer),
    );
    if auto_clear.burn_on_startup_if_needed().await {
        ui.borrow_mut().status = String::from("Cleared data left over from an interrupted quit.");
    }
    auto_clear.reset_termination_flag();

    let mut active: Option<WarnBeforeQuitManager> = None;
    loop {
        redraw(&terminal, &ui);
        if platform.exit.get() {
            return Ok(());
        }
        if let Some(reply) = platform.last_reply.take() {
            if !reply {
                ui.borrow_mut().status = String::from("Quit cancelled.");
            }
        }

        let next = events.borrow_mut().next_event()?;
        let Some(event) = next else {
            tokio::time::sleep(FRAME).await;
            continue;
        };
        let Some(event) = interceptors.dispatch(event) else {
            continue;
        };

        if let Some(manager) = &active {
            let overlay_ui = ui.borrow();
            if let Some(overlay) = &overlay_ui.overlay {
                if let Some(hovering) = overlay.hover_change(&event) {
                    manager.set_hovering(hovering);
                }
                overlay.handle_click(&event, &*preferences);
            }
        }

        let InputEvent::Key(key) = &event else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if options.quit_shortcut.matches_press(&event) {
            if handler.is_in_flight() {
                ui.borrow_mut().status = String::from("A quit is already pending.");
                continue;
            }
            let Some(manager) =
                WarnBeforeQuitManager::new(&event, WarnBeforeQuitAction::Quit, env.clone(), options.clone())
            else {
                continue;
            };
            {
                let mut ui = ui.borrow_mut();
                ui.follow(&manager);
                ui.status = String::from("Quitting...");
            }
            handler.on_finish(manager.completion_hook());
            let chain = TerminationChain::new()
                .with(
                    DeciderSlot::ActiveDownloads,
                    ActiveDownloadsDecider::new(fake_downloads.clone(), fake_downloads.clone()),
                )
                .with(DeciderSlot::WarnBeforeQuit, manager.clone())
                .with(DeciderSlot::AutoClear, auto_clear.clone())
                .with(
                    DeciderSlot::PrivacyStatsFlush,
                    FlushDecider::new("privacy-stats", || tokio::time::sleep(Duration::from_millis(200)))
                        .with_timeout(Duration::from_secs(1)),
                );
            active = Some(manager);
            match handler.execute_deciders(chain.build(), false) {
                TerminationReply::TerminateNow => return Ok(()),
                TerminationReply::TerminateCancel => {
                    ui.borrow_mut().status = String::from("Quit cancelled.");
                }
                TerminationReply::TerminateLater => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('d') => downloads.set(if downloads.get() == 0 { 2 } else { 0 }),
            KeyCode::Char('w') => preferences.set_warning_enabled(!preferences.is_warning_enabled()),
            KeyCode::Char('a') => {
                preferences.set_auto_clear_enabled(!preferences.is_auto_clear_enabled())
            }
            _ => {}
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), DemoError> {
    init_logging()?;
    LocalSet::new().run_until(run()).await
}
