use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::SessionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotStatus {
    Untested,
    Correct,
    Incorrect,
}

/// One character position of the target text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharacterSlot {
    pub expected: char,
    pub status: SlotStatus,
    /// true once input was recorded here; cleared again by backspace
    pub touched: bool,
}

impl CharacterSlot {
    fn new(expected: char) -> Self {
        Self {
            expected,
            status: SlotStatus::Untested,
            touched: false,
        }
    }

    fn reset(&mut self) {
        self.status = SlotStatus::Untested;
        self.touched = false;
    }

    pub fn counts_as_correct(&self) -> bool {
        self.status == SlotStatus::Correct && self.touched
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    InProgress,
    Finished,
}

/// What happened to a single submitted character
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotOutcome {
    Ignored,
    Correct { index: usize },
    Incorrect { index: usize },
}

/// Return value of `SessionEngine::submit_char`. `result` is only set on the
/// keystroke that completes the text.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub outcome: SlotOutcome,
    pub result: Option<SessionResult>,
}

impl Submission {
    fn ignored() -> Self {
        Self {
            outcome: SlotOutcome::Ignored,
            result: None,
        }
    }

    pub fn finished(&self) -> bool {
        self.result.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backspace {
    /// cursor was already at the start of the text
    Ignored,
    Reverted { index: usize },
}

/// Scoring for a finished session
#[derive(Clone, Debug, PartialEq)]
pub struct SessionResult {
    pub correct_count: usize,
    pub total_count: usize,
    pub accuracy_percent: f64,
    pub elapsed_minutes: f64,
    pub wpm: f64,
    pub cpm: f64,
    pub completed_at: DateTime<Local>,
}

impl SessionResult {
    pub fn compute(correct_count: usize, total_count: usize, elapsed: Option<Duration>) -> Self {
        let accuracy_percent = if total_count > 0 {
            100.0 * correct_count as f64 / total_count as f64
        } else {
            0.0
        };

        let elapsed_minutes = elapsed.map_or(0.0, |d| d.as_secs_f64() / 60.0);

        let (wpm, cpm) = if elapsed_minutes > 0.0 {
            let total = total_count as f64;
            ((total / 5.0) / elapsed_minutes, total / elapsed_minutes)
        } else {
            (0.0, 0.0)
        };

        Self {
            correct_count,
            total_count,
            accuracy_percent,
            elapsed_minutes,
            wpm,
            cpm,
            completed_at: Local::now(),
        }
    }
}

/// Owns one typing attempt: the target text, per-slot correctness, the
/// cursor and the timer.
#[derive(Debug)]
pub struct SessionEngine<C: Clock = SystemClock> {
    clock: C,
    slots: Vec<CharacterSlot>,
    cursor: usize,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    phase: EngineState,
    result: Option<SessionResult>,
}

impl SessionEngine<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for SessionEngine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SessionEngine<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            slots: Vec::new(),
            cursor: 0,
            started_at: None,
            finished_at: None,
            phase: EngineState::Idle,
            result: None,
        }
    }

    /// Discard whatever was in progress and begin a fresh attempt at `text`.
    pub fn start_session(&mut self, text: &str) -> Result<(), SessionError> {
        if text.is_empty() {
            return Err(SessionError::EmptyText);
        }

        self.slots = text.chars().map(CharacterSlot::new).collect();
        self.cursor = 0;
        self.started_at = None;
        self.finished_at = None;
        self.phase = EngineState::InProgress;
        self.result = None;

        info!(chars = self.slots.len(), "session started");
        Ok(())
    }

    pub fn submit_char(&mut self, input: char) -> Submission {
        if self.phase != EngineState::InProgress || self.cursor >= self.slots.len() {
            return Submission::ignored();
        }

        let now = self.clock.now();
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }

        let index = self.cursor;
        let slot = &mut self.slots[index];
        let outcome = if input == slot.expected {
            slot.status = SlotStatus::Correct;
            SlotOutcome::Correct { index }
        } else {
            slot.status = SlotStatus::Incorrect;
            SlotOutcome::Incorrect { index }
        };
        slot.touched = true;
        debug!(index, ?input, expected = ?slot.expected, "keystroke");
        self.cursor += 1;

        let result = if self.cursor == self.slots.len() {
            self.finished_at = Some(now);
            self.phase = EngineState::Finished;
            let result = self.score();
            info!(
                wpm = result.wpm,
                cpm = result.cpm,
                accuracy = result.accuracy_percent,
                "session finished"
            );
            self.result = Some(result.clone());
            Some(result)
        } else {
            None
        };

        Submission { outcome, result }
    }

    pub fn backspace(&mut self) -> Result<Backspace, SessionError> {
        if self.phase != EngineState::InProgress {
            return Err(SessionError::InvalidState {
                operation: "backspace",
                state: self.phase,
            });
        }

        if self.cursor == 0 {
            return Ok(Backspace::Ignored);
        }

        self.cursor -= 1;
        self.slots[self.cursor].reset();
        debug!(index = self.cursor, "backspace");

        Ok(Backspace::Reverted { index: self.cursor })
    }

    pub fn current_index(&self) -> usize {
        self.cursor
    }

    pub fn slot_at(&self, index: usize) -> Option<&CharacterSlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[CharacterSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The target text this session was started with
    pub fn text(&self) -> String {
        self.slots.iter().map(|s| s.expected).collect()
    }

    pub fn state(&self) -> EngineState {
        self.phase
    }

    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == EngineState::Finished
    }

    /// Time since the first keystroke, frozen once the session finishes
    pub fn elapsed(&self) -> Duration {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => self.clock.now().saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }

    /// The finalized scoring, available once the session is finished
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    fn score(&self) -> SessionResult {
        let correct = self.slots.iter().filter(|s| s.counts_as_correct()).count();
        let elapsed = self
            .started_at
            .zip(self.finished_at)
            .map(|(start, end)| end.saturating_duration_since(start));

        SessionResult::compute(correct, self.slots.len(), elapsed)
    }
}
