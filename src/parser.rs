use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::config::ScoringConfig;

/// Daily puzzle number, e.g. the `245` in `Wordle 245 3/6`.
pub type PuzzleId = i64;

const LOSS_MARKER: &str = "X";

static RESULT_REGEX: OnceLock<Regex> = OnceLock::new();

fn result_regex() -> &'static Regex {
    // ASCII digits only; `\d` would also accept other Unicode digit classes.
    RESULT_REGEX.get_or_init(|| Regex::new(r"Wordle ([0-9]+) ([1-6X])/6").expect("Invalid Regex"))
}

/// A game result extracted from a shared message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResult {
    pub puzzle_id: PuzzleId,
    pub score: i64,
    pub won: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ResultParser {
    loss_score: i64,
}

impl Default for ResultParser {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}

impl ResultParser {
    pub fn new(scoring: &ScoringConfig) -> Self {
        Self {
            loss_score: scoring.loss_score,
        }
    }

    /// Extracts a result from message text.
    ///
    /// Returns `None` for anything that is not a result share; ordinary chat
    /// is expected and is not an error. Text around the result is ignored.
    pub fn parse(&self, text: &str) -> Option<ParsedResult> {
        let captures = result_regex().captures(text)?;

        // Puzzle numbers too large for i64 cannot be real puzzles.
        let puzzle_id = captures[1].parse::<PuzzleId>().ok()?;
        let outcome = &captures[2];

        if outcome == LOSS_MARKER {
            return Some(ParsedResult {
                puzzle_id,
                score: self.loss_score,
                won: false,
            });
        }

        let score = outcome.parse::<i64>().ok()?;
        Some(ParsedResult {
            puzzle_id,
            score,
            won: true,
        })
    }
}
