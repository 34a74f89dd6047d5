use thiserror::Error;

use crate::history::HistoryRecord;
use crate::session::EngineState;

#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error("cannot start a session with empty text")]
    EmptyText,

    #[error("{operation} is not allowed while the session is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: EngineState,
    },
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("IO Error reading history: {0}")]
    Read(#[from] std::io::Error),

    #[error("JSON Parsing Error in history: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to persist session #{}: {source}", .record.id)]
    Persist {
        record: HistoryRecord,
        #[source]
        source: std::io::Error,
    },
}

impl HistoryError {
    /// The record that was appended in memory, if this error came from a write
    pub fn record(&self) -> Option<&HistoryRecord> {
        match self {
            HistoryError::Persist { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<HistoryRecord> {
        match self {
            HistoryError::Persist { record, .. } => Some(record),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Corpus Error: {0}")]
    Corpus(String),

    #[error("JSON Parsing Error in corpus: {0}")]
    Json(#[from] serde_json::Error),
}
