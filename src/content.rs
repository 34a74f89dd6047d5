use std::collections::HashMap;

use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ContentError;

static CORPUS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/corpus");
const CORPUS_FILE: &str = "sentences.json";

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    ValueEnum,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Simple,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Simple, Difficulty::Medium, Difficulty::Hard];
}

/// Sentences grouped by difficulty. Corpus keys look like `medium_12`.
#[derive(Debug, Clone)]
pub struct Corpus {
    sentences: HashMap<Difficulty, Vec<String>>,
}

impl Corpus {
    /// The corpus compiled into the binary
    pub fn embedded() -> Result<Self, ContentError> {
        let file = CORPUS_DIR
            .get_file(CORPUS_FILE)
            .ok_or_else(|| ContentError::Corpus(format!("{CORPUS_FILE} not embedded")))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| ContentError::Corpus(format!("{CORPUS_FILE} is not UTF-8")))?;
        Self::from_json(contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;

        let sentences = raw
            .into_iter()
            .filter_map(|(key, sentence)| match parse_key(&key) {
                Some((difficulty, index)) if is_typeable(&sentence) => {
                    Some((difficulty, (index, sentence)))
                }
                Some(_) => {
                    warn!(key = %key, "skipping corpus entry that cannot be typed");
                    None
                }
                None => {
                    warn!(key = %key, "skipping corpus entry with unrecognised key");
                    None
                }
            })
            .into_group_map()
            .into_iter()
            .map(|(difficulty, entries)| {
                let ordered = entries
                    .into_iter()
                    .sorted_by_key(|(index, _)| *index)
                    .map(|(_, sentence)| sentence)
                    .collect::<Vec<_>>();
                (difficulty, ordered)
            })
            .collect::<HashMap<_, _>>();

        if sentences.is_empty() {
            return Err(ContentError::Corpus("corpus has no usable sentences".into()));
        }

        Ok(Self { sentences })
    }

    pub fn sentences(&self, difficulty: Difficulty) -> &[String] {
        self.sentences
            .get(&difficulty)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn difficulties(&self) -> Vec<Difficulty> {
        Difficulty::ALL
            .into_iter()
            .filter(|d| !self.sentences(*d).is_empty())
            .collect()
    }

    /// A random sentence of the given difficulty, or of a random difficulty
    /// when none is requested.
    pub fn pick<R: Rng + ?Sized>(&self, difficulty: Option<Difficulty>, rng: &mut R) -> Option<&str> {
        let difficulty = match difficulty {
            Some(d) => d,
            None => *self.difficulties().choose(rng)?,
        };
        self.sentences(difficulty)
            .choose(rng)
            .map(String::as_str)
    }
}

fn parse_key(key: &str) -> Option<(Difficulty, usize)> {
    let (name, index) = key.rsplit_once('_')?;
    let difficulty = Difficulty::from_str(name, true).ok()?;
    let index = index.parse().ok()?;
    Some((difficulty, index))
}

fn is_typeable(sentence: &str) -> bool {
    !sentence.is_empty() && !sentence.chars().any(char::is_control)
}

/// Supplies target text for new sessions
pub trait SentenceSource {
    fn next_sentence(&mut self) -> String;
}

/// Draws from the embedded corpus
pub struct RandomSentences<R: Rng = rand::rngs::ThreadRng> {
    corpus: Corpus,
    difficulty: Option<Difficulty>,
    rng: R,
}

impl RandomSentences {
    pub fn new(corpus: Corpus, difficulty: Option<Difficulty>) -> Self {
        Self::with_rng(corpus, difficulty, rand::thread_rng())
    }
}

impl<R: Rng> RandomSentences<R> {
    pub fn with_rng(corpus: Corpus, difficulty: Option<Difficulty>, rng: R) -> Self {
        Self {
            corpus,
            difficulty,
            rng,
        }
    }
}

impl<R: Rng> SentenceSource for RandomSentences<R> {
    fn next_sentence(&mut self) -> String {
        self.corpus
            .pick(self.difficulty, &mut self.rng)
            // a difficulty missing from the corpus falls back to any sentence
            .or_else(|| self.corpus.pick(None, &mut self.rng))
            .map(str::to_owned)
            .unwrap_or_default()
    }
}

/// Always hands out the same text, e.g. a prompt given on the command line
#[derive(Debug, Clone)]
pub struct FixedSentence(pub String);

impl SentenceSource for FixedSentence {
    fn next_sentence(&mut self) -> String {
        self.0.clone()
    }
}
