mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use swiftkeys::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    history::{ResultEntry, ResultsLog},
    passage,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner, SystemClock},
    store::FileStore,
    Mode, Phase, SessionController,
};
use tracing::{debug, info};

const TICK_RATE_MS: u64 = 50;
const RECENT_RESULTS: usize = 8;

/// typing practice against simulated racers, with lessons and a stats dashboard
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Race simulated opponents over short passages, work through keyboard drills, and track your speed and accuracy over time."
)]
pub struct Cli {
    /// tab to open on start
    #[clap(short = 'm', long, value_enum, default_value_t = Tab::Race)]
    mode: Tab,

    /// start this lesson right away
    #[clap(short = 'l', long)]
    lesson: Option<u32>,

    /// seed for passage selection and the simulated competitors
    #[clap(long)]
    seed: Option<u64>,

    /// seconds counted down before a race starts
    #[clap(short = 'c', long)]
    countdown: Option<u8>,

    /// stats store file (defaults to the state directory)
    #[clap(long)]
    store: Option<PathBuf>,

    /// verbosity of the log file
    #[clap(long, default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,

    /// persist the effective settings to the config file
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(countdown) = self.countdown {
            config.countdown_secs = countdown;
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display)]
pub enum Tab {
    Race,
    Learn,
    Stats,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Race, Tab::Learn, Tab::Stats];

    fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

pub struct App {
    pub controller: SessionController,
    pub tab: Tab,
    pub input: String,
    pub lesson_cursor: usize,
    pub recent_results: Vec<ResultEntry>,
}

impl App {
    pub fn new(controller: SessionController, tab: Tab, lesson: Option<u32>) -> Self {
        let mut app = Self {
            controller,
            tab,
            input: String::new(),
            lesson_cursor: 0,
            recent_results: Vec::new(),
        };
        match lesson {
            Some(id) => {
                app.tab = Tab::Learn;
                app.controller.start_lesson(id);
            }
            None => app.switch_to(tab),
        }
        app
    }

    fn switch_to(&mut self, tab: Tab) {
        self.controller.leave();
        self.input.clear();
        self.tab = tab;
        match tab {
            Tab::Race => {}
            Tab::Learn => self.controller.select_lesson(None),
            Tab::Stats => self.refresh_results(),
        }
        debug!(%tab, "switched tab");
    }

    fn refresh_results(&mut self) {
        self.recent_results = match self.controller.history() {
            Some(log) => log.recent(RECENT_RESULTS).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "could not read results log");
                Vec::new()
            }),
            None => Vec::new(),
        };
    }

    fn submit(&mut self) {
        if let Err(e) = self.controller.submit_input(&self.input) {
            debug!(error = %e, "input rejected");
            self.input = self.controller.state().typed.clone();
        }
    }

    fn on_typing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => {
                self.input.push(c);
                self.submit();
            }
            KeyCode::Backspace => {
                if self.input.pop().is_some() {
                    self.submit();
                }
            }
            _ => {}
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Control {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return Control::Quit;
        }
        match key.code {
            KeyCode::Tab => {
                self.switch_to(self.tab.next());
                return Control::Continue;
            }
            KeyCode::BackTab => {
                self.switch_to(self.tab.previous());
                return Control::Continue;
            }
            _ => {}
        }

        let phase = self.controller.state().phase;
        match self.tab {
            Tab::Race => match phase {
                Phase::InProgress => self.on_typing_key(key),
                Phase::Idle if key.code == KeyCode::Enter => {
                    self.input.clear();
                    self.controller.start_race();
                }
                Phase::Complete if key.code == KeyCode::Enter => {
                    self.input.clear();
                    if let Err(e) = self.controller.restart() {
                        debug!(error = %e, "restart rejected");
                    }
                }
                _ => {}
            },
            Tab::Learn => match phase {
                Phase::InProgress if key.code == KeyCode::Left => {
                    self.input.clear();
                    self.controller.select_lesson(None);
                }
                Phase::InProgress => self.on_typing_key(key),
                Phase::Complete => match key.code {
                    KeyCode::Char('r') | KeyCode::Enter => {
                        self.input.clear();
                        if let Err(e) = self.controller.retry() {
                            debug!(error = %e, "retry rejected");
                        }
                    }
                    KeyCode::Char('n') | KeyCode::Left => {
                        self.input.clear();
                        if let Err(e) = self.controller.next_lesson() {
                            debug!(error = %e, "next lesson rejected");
                        }
                    }
                    _ => {}
                },
                _ => self.on_lesson_menu_key(key),
            },
            Tab::Stats => {
                if key.code == KeyCode::Char('r') {
                    self.refresh_results();
                }
            }
        }
        Control::Continue
    }

    fn on_lesson_menu_key(&mut self, key: KeyEvent) {
        let lessons = passage::lessons();
        match key.code {
            KeyCode::Up => self.lesson_cursor = self.lesson_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.lesson_cursor = (self.lesson_cursor + 1).min(lessons.len().saturating_sub(1))
            }
            KeyCode::Enter => {
                if let Some(lesson) = lessons.get(self.lesson_cursor) {
                    self.input.clear();
                    self.controller.start_lesson(lesson.id);
                }
            }
            KeyCode::Char(c) => {
                if let Some(lesson) = c.to_digit(10).and_then(passage::lesson) {
                    self.input.clear();
                    self.controller.start_lesson(lesson.id);
                }
            }
            _ => {}
        }
    }

    pub fn mode(&self) -> Mode {
        self.controller.state().mode
    }
}

fn init_logging(level: tracing::Level) {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging(cli.log_level);

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply(&mut config);
    config.validate()?;
    if cli.save_config {
        config_store.save(&config)?;
    }

    let store = cli
        .store
        .as_ref()
        .map(FileStore::with_path)
        .unwrap_or_default();
    let controller = SessionController::new(&config, Box::new(SystemClock), Box::new(store))
        .with_history(ResultsLog::new());
    let mut app = App::new(controller, cli.mode, cli.lesson);
    info!(tab = %app.tab, "starting");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        let redraw = match runner.step() {
            AppEvent::Tick => app.controller.poll(),
            AppEvent::Resize => true,
            AppEvent::Key(key) => {
                if app.on_key(key) == Control::Quit {
                    break;
                }
                true
            }
        };
        if redraw {
            terminal.draw(|f| f.render_widget(&*app, f.area()))?;
        }
    }

    info!("bye");
    Ok(())
}
