use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use keybomb::{
    app::{Action, App},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    content::{Corpus, Difficulty, FixedSentence, RandomSentences, SentenceSource},
    history::HistoryStore,
    logging,
    runtime::{AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};

/// sentence typing test with persisted wpm/cpm/accuracy history
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type a sentence as fast and accurately as you can. Every finished test is appended to your history, which keeps running averages of WPM, CPM and accuracy."
)]
pub struct Cli {
    /// custom sentence to type instead of one from the built-in corpus
    #[clap(short = 'p', long, value_parser = parse_prompt)]
    prompt: Option<String>,

    /// only draw sentences of this difficulty (default: random difficulty)
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// history file to read and append to
    #[clap(long)]
    history: Option<PathBuf>,

    /// print history averages and exit
    #[clap(long)]
    summary: bool,
}

fn parse_prompt(s: &str) -> Result<String, String> {
    if s.is_empty() {
        Err("prompt must not be empty".to_string())
    } else if s.chars().any(char::is_control) {
        Err("prompt must not contain control characters".to_string())
    } else {
        Ok(s.to_string())
    }
}

impl Cli {
    /// Command line flags win over the config file
    fn resolve(&self, config: &Config) -> (Option<Difficulty>, PathBuf) {
        let difficulty = self.difficulty.or(config.difficulty);
        let history = self
            .history
            .clone()
            .unwrap_or_else(|| config.history_path());
        (difficulty, history)
    }

    fn sentence_source(
        &self,
        difficulty: Option<Difficulty>,
    ) -> Result<Box<dyn SentenceSource>, Box<dyn Error>> {
        Ok(match &self.prompt {
            Some(prompt) => Box::new(FixedSentence(prompt.clone())),
            None => Box::new(RandomSentences::new(Corpus::embedded()?, difficulty)),
        })
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&AppDirs::log_path()) {
        eprintln!("logging disabled: {e}");
    }

    let config = FileConfigStore::new().load();
    let (difficulty, history_path) = cli.resolve(&config);
    let history = HistoryStore::open(&history_path);

    if cli.summary {
        let summary = history.aggregate();
        println!("Sessions: {}", history.len());
        println!("Average WPM: {:.2}", summary.avg_wpm);
        println!("Average CPM: {:.2}", summary.avg_cpm);
        println!("Average Accuracy: {:.2}", summary.avg_accuracy);
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut app = App::new(cli.sentence_source(difficulty)?, history)?;
    info!(history = %history_path.display(), "starting typing test");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(config.tick_rate_ms.max(10))),
    );
    let outcome = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Some(notice) = &app.notice {
        warn!(notice = %notice, "exiting with unresolved notice");
    }

    outcome
}

fn start_tui<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        let action = match runner.step() {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize => Action::Redraw,
            AppEvent::Key(key) => app.on_key(key),
        };

        match action {
            Action::Quit => break,
            Action::Redraw => {
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            Action::Continue => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use ratatui::backend::TestBackend;
    use std::sync::mpsc;
    use tempfile::tempdir;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["keybomb"]);

        assert_eq!(cli.prompt, None);
        assert_eq!(cli.difficulty, None);
        assert_eq!(cli.history, None);
        assert!(!cli.summary);
    }

    #[test]
    fn test_cli_custom_prompt() {
        let cli = Cli::parse_from(["keybomb", "-p", "hello world"]);
        assert_eq!(cli.prompt, Some("hello world".to_string()));

        let cli = Cli::parse_from(["keybomb", "--prompt", "custom text"]);
        assert_eq!(cli.prompt, Some("custom text".to_string()));
    }

    #[test]
    fn test_cli_rejects_empty_prompt() {
        assert!(Cli::try_parse_from(["keybomb", "-p", ""]).is_err());
        assert!(Cli::try_parse_from(["keybomb", "-p", "tab\there"]).is_err());
    }

    #[test]
    fn test_cli_difficulty() {
        let cli = Cli::parse_from(["keybomb", "-d", "hard"]);
        assert_eq!(cli.difficulty, Some(Difficulty::Hard));

        let cli = Cli::parse_from(["keybomb", "--difficulty", "simple"]);
        assert_eq!(cli.difficulty, Some(Difficulty::Simple));

        assert!(Cli::try_parse_from(["keybomb", "-d", "impossible"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = Config {
            difficulty: Some(Difficulty::Medium),
            history_path: Some(PathBuf::from("/tmp/from-config.json")),
            tick_rate_ms: 100,
        };

        let cli = Cli::parse_from(["keybomb"]);
        assert_eq!(
            cli.resolve(&config),
            (
                Some(Difficulty::Medium),
                PathBuf::from("/tmp/from-config.json")
            )
        );

        let cli = Cli::parse_from(["keybomb", "-d", "hard", "--history", "/tmp/cli.json"]);
        assert_eq!(
            cli.resolve(&config),
            (Some(Difficulty::Hard), PathBuf::from("/tmp/cli.json"))
        );
    }

    #[test]
    fn test_sentence_source_prefers_prompt() {
        let cli = Cli::parse_from(["keybomb", "-p", "fixed text"]);
        let mut source = cli.sentence_source(None).unwrap();
        assert_eq!(source.next_sentence(), "fixed text");

        let cli = Cli::parse_from(["keybomb"]);
        let mut source = cli.sentence_source(Some(Difficulty::Simple)).unwrap();
        assert!(!source.next_sentence().is_empty());
    }

    #[test]
    fn test_start_tui_runs_until_quit() {
        use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

        let dir = tempdir().unwrap();
        let mut app = App::new(
            Box::new(FixedSentence("hi".to_string())),
            HistoryStore::with_path(dir.path().join("history.json")),
        )
        .unwrap();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

        let (tx, rx) = mpsc::channel();
        for code in [KeyCode::Char('h'), KeyCode::Char('i'), KeyCode::Esc] {
            tx.send(AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
                .unwrap();
        }
        let runner = Runner::new(
            keybomb::runtime::TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(5)),
        );

        start_tui(&mut terminal, &mut app, &runner).unwrap();

        assert_eq!(app.history.len(), 1);
        assert!(app.engine.is_finished());
    }
}
