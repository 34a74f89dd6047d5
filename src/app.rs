use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, error, info};

use crate::clock::{Clock, SystemClock};
use crate::content::SentenceSource;
use crate::error::SessionError;
use crate::history::{HistoryRecord, HistoryStore};
use crate::session::{SessionEngine, SessionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Typing,
    Results,
    History,
}

/// What the event loop should do after an event was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Redraw,
    Quit,
}

/// Presentation coordinator: owns the engine, the history store and all
/// screen state, and turns key events into engine calls.
pub struct App<C: Clock = SystemClock> {
    pub engine: SessionEngine<C>,
    pub history: HistoryStore,
    pub screen: Screen,
    pub last_result: Option<SessionResult>,
    pub last_record: Option<HistoryRecord>,
    /// set when something went wrong that the user should know about
    pub notice: Option<String>,
    source: Box<dyn SentenceSource>,
}

impl App<SystemClock> {
    pub fn new(
        source: Box<dyn SentenceSource>,
        history: HistoryStore,
    ) -> Result<Self, SessionError> {
        Self::with_engine(SessionEngine::new(), source, history)
    }
}

impl<C: Clock> App<C> {
    pub fn with_engine(
        engine: SessionEngine<C>,
        source: Box<dyn SentenceSource>,
        mut history: HistoryStore,
    ) -> Result<Self, SessionError> {
        history.load();

        let mut app = Self {
            engine,
            history,
            screen: Screen::Typing,
            last_result: None,
            last_record: None,
            notice: None,
            source,
        };
        app.restart(false)?;
        Ok(app)
    }

    /// Start a new session, on the same text when `retry` is set
    pub fn restart(&mut self, retry: bool) -> Result<(), SessionError> {
        let text = if retry && !self.engine.is_empty() {
            self.engine.text()
        } else {
            self.source.next_sentence()
        };

        self.engine.start_session(&text)?;
        self.screen = Screen::Typing;
        self.last_result = None;
        self.last_record = None;
        self.notice = None;
        Ok(())
    }

    pub fn on_tick(&mut self) -> Action {
        if self.screen == Screen::Typing && self.engine.has_started() && !self.engine.is_finished() {
            Action::Redraw
        } else {
            Action::Continue
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Action {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Action::Quit,
            KeyCode::Char('c') if ctrl => return Action::Quit,
            KeyCode::Tab => {
                self.toggle_history();
                return Action::Redraw;
            }
            _ => {}
        }

        match self.screen {
            Screen::Typing => self.on_typing_key(key.code, ctrl),
            Screen::Results => self.on_results_key(key.code),
            Screen::History => self.on_history_key(key.code),
        }
    }

    fn on_typing_key(&mut self, code: KeyCode, ctrl: bool) -> Action {
        match code {
            KeyCode::Char(_) if ctrl => Action::Continue,
            KeyCode::Char(c) => {
                let submission = self.engine.submit_char(c);
                if let Some(result) = submission.result {
                    self.finish(result);
                }
                Action::Redraw
            }
            KeyCode::Backspace => {
                if self.engine.is_finished() {
                    return Action::Continue;
                }
                match self.engine.backspace() {
                    Ok(_) => Action::Redraw,
                    Err(e) => {
                        debug!(error = %e, "backspace ignored");
                        Action::Continue
                    }
                }
            }
            KeyCode::Left => self.restart_or_notice(true),
            KeyCode::Right => self.restart_or_notice(false),
            _ => Action::Continue,
        }
    }

    fn on_results_key(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('n') => self.restart_or_notice(false),
            KeyCode::Left | KeyCode::Char('r') => self.restart_or_notice(true),
            KeyCode::Char('h') => {
                self.screen = Screen::History;
                Action::Redraw
            }
            _ => Action::Continue,
        }
    }

    fn on_history_key(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Char('b') | KeyCode::Backspace => {
                self.toggle_history();
                Action::Redraw
            }
            KeyCode::Enter | KeyCode::Char('n') => self.restart_or_notice(false),
            _ => Action::Continue,
        }
    }

    fn toggle_history(&mut self) {
        self.screen = match self.screen {
            Screen::History if self.engine.is_finished() => Screen::Results,
            Screen::History => Screen::Typing,
            Screen::Typing | Screen::Results => Screen::History,
        };
    }

    fn restart_or_notice(&mut self, retry: bool) -> Action {
        if let Err(e) = self.restart(retry) {
            error!(error = %e, "could not start a new session");
            self.notice = Some(e.to_string());
        }
        Action::Redraw
    }

    /// Persist the result; the displayed result stands even if saving fails
    fn finish(&mut self, result: SessionResult) {
        match self.history.append(&result) {
            Ok(record) => {
                info!(id = record.id, "result recorded");
                self.last_record = Some(record);
                self.notice = None;
            }
            Err(e) => {
                error!(error = %e, path = %self.history.path().display(), "history write failed");
                self.notice = Some(format!("result not saved: {e}"));
                self.last_record = e.into_record();
            }
        }
        self.last_result = Some(result);
        self.screen = Screen::Results;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::content::FixedSentence;
    use crate::session::EngineState;
    use std::rc::Rc;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(text: &str) -> (App<Rc<ManualClock>>, Rc<ManualClock>, TempDir) {
        let dir = tempdir().unwrap();
        let clock = Rc::new(ManualClock::new());
        let app = App::with_engine(
            SessionEngine::with_clock(clock.clone()),
            Box::new(FixedSentence(text.to_string())),
            HistoryStore::with_path(dir.path().join("history.json")),
        )
        .unwrap();
        (app, clock, dir)
    }

    fn type_str<C: Clock>(app: &mut App<C>, s: &str) {
        for c in s.chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn new_app_starts_typing() {
        let (app, _, _dir) = app("hi");
        assert_eq!(app.screen, Screen::Typing);
        assert_eq!(app.engine.state(), EngineState::InProgress);
        assert_eq!(app.engine.text(), "hi");
        assert!(app.history.is_empty());
    }

    #[test]
    fn empty_sentence_is_rejected() {
        let dir = tempdir().unwrap();
        let res = App::new(
            Box::new(FixedSentence(String::new())),
            HistoryStore::with_path(dir.path().join("history.json")),
        );
        assert!(matches!(res, Err(SessionError::EmptyText)));
    }

    #[test]
    fn completing_text_records_history() {
        let (mut app, clock, _dir) = app("abcde");

        app.on_key(key(KeyCode::Char('a')));
        clock.advance(Duration::from_secs(6));
        type_str(&mut app, "bcde");

        assert_eq!(app.screen, Screen::Results);
        let result = app.last_result.clone().unwrap();
        assert_eq!(result.accuracy_percent, 100.0);
        assert!((result.cpm - 50.0).abs() < 1e-9);
        assert!((result.wpm - 10.0).abs() < 1e-9);

        let record = app.last_record.unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.metrics.wpm, 10);
        assert_eq!(app.history.len(), 1);
        assert!(app.notice.is_none());
    }

    #[test]
    fn backspace_corrects_a_mistake() {
        let (mut app, _, _dir) = app("abc");

        type_str(&mut app, "ax");
        assert_eq!(app.on_key(key(KeyCode::Backspace)), Action::Redraw);
        type_str(&mut app, "bc");

        assert_eq!(app.last_result.as_ref().unwrap().correct_count, 3);
    }

    #[test]
    fn backspace_on_results_screen_does_nothing() {
        let (mut app, _, _dir) = app("ab");
        type_str(&mut app, "ab");

        assert_eq!(app.on_key(key(KeyCode::Backspace)), Action::Continue);
        assert_eq!(app.engine.current_index(), 2);
        assert_eq!(app.screen, Screen::Results);
    }

    #[test]
    fn enter_only_restarts_from_results() {
        let (mut app, _, _dir) = app("ab");

        app.on_key(key(KeyCode::Char('a')));
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.engine.current_index(), 1);

        app.on_key(key(KeyCode::Char('b')));
        assert_eq!(app.screen, Screen::Results);
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.screen, Screen::Typing);
        assert_eq!(app.engine.current_index(), 0);
        assert!(app.last_result.is_none());
    }

    #[test]
    fn retry_keeps_the_same_text() {
        let (mut app, _, _dir) = app("same");
        type_str(&mut app, "same");

        app.on_key(key(KeyCode::Char('r')));
        assert_eq!(app.engine.text(), "same");
        assert_eq!(app.engine.state(), EngineState::InProgress);
    }

    #[test]
    fn tab_toggles_history_screen() {
        let (mut app, _, _dir) = app("ab");

        app.on_key(key(KeyCode::Tab));
        assert_eq!(app.screen, Screen::History);
        // typing is not routed to the engine while history is shown
        app.on_key(key(KeyCode::Char('a')));
        assert_eq!(app.engine.current_index(), 0);

        app.on_key(key(KeyCode::Char('b')));
        assert_eq!(app.screen, Screen::Typing);

        type_str(&mut app, "ab");
        app.on_key(key(KeyCode::Char('h')));
        assert_eq!(app.screen, Screen::History);
        app.on_key(key(KeyCode::Tab));
        assert_eq!(app.screen, Screen::Results);
    }

    #[test]
    fn quit_keys() {
        let (mut app, _, _dir) = app("ab");
        assert_eq!(app.on_key(key(KeyCode::Esc)), Action::Quit);
        assert_eq!(
            app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert_eq!(app.engine.current_index(), 0);
    }

    #[test]
    fn tick_redraws_only_while_typing() {
        let (mut app, _, _dir) = app("ab");
        assert_eq!(app.on_tick(), Action::Continue);

        app.on_key(key(KeyCode::Char('a')));
        assert_eq!(app.on_tick(), Action::Redraw);

        app.on_key(key(KeyCode::Char('b')));
        assert_eq!(app.on_tick(), Action::Continue);
    }

    #[test]
    fn failed_save_keeps_result_and_sets_notice() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::create_dir(&path).unwrap();

        let mut app = App::new(
            Box::new(FixedSentence("ok".to_string())),
            HistoryStore::with_path(&path),
        )
        .unwrap();
        type_str(&mut app, "ok");

        assert_eq!(app.screen, Screen::Results);
        assert_eq!(app.last_result.as_ref().unwrap().correct_count, 2);
        assert_eq!(app.last_record.map(|r| r.id), Some(1));
        assert!(app.notice.as_deref().unwrap().contains("not saved"));
    }
}
