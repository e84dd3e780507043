//! Per-session transcript with duplicate suppression

use std::collections::HashSet;

use serde::Serialize;

use super::event::Role;

/// One line of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    /// Unix epoch milliseconds
    pub timestamp: i64,
}

/// Append-only transcript for one session
///
/// The capability may deliver the same utterance more than once, so every
/// `(role, text)` pair is accepted at most once until [`forget_seen`] or
/// [`clear`] is called. Two genuinely repeated utterances are therefore
/// indistinguishable from a duplicated event and the second is dropped.
///
/// [`forget_seen`]: Transcript::forget_seen
/// [`clear`]: Transcript::clear
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    seen: HashSet<String>,
}

impl Transcript {
    /// Append an utterance unless it is blank or already recorded
    ///
    /// Returns `true` if an entry was appended.
    pub fn record(&mut self, role: Role, text: &str, timestamp: i64) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        if !self.seen.insert(format!("{role}|{text}")) {
            return false;
        }

        self.entries.push(TranscriptEntry {
            role,
            text: text.to_string(),
            timestamp,
        });
        true
    }

    /// Drop dedup memory but keep the entries visible
    pub fn forget_seen(&mut self) {
        self.seen.clear();
    }

    /// Drop entries and dedup memory together
    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen.clear();
    }

    #[must_use]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
