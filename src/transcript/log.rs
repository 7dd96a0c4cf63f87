use chrono::Local;
use tracing::debug;

use super::turn::{Speaker, TranscriptItem, TranscriptTurn, TurnId};

/// Ordered, append-only log of dialogue turns.
///
/// Insertion order is display order. Ids come from a counter that is never
/// reset, so two turns appended in the same instant (or either side of a
/// `clear`) never share an id.
#[derive(Debug, Clone, Default)]
pub struct TranscriptLog {
    turns: Vec<TranscriptTurn>,
    next_id: u64,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Blank text is rejected and returns `None`.
    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) -> Option<TurnId> {
        let text = text.into();
        if text.trim().is_empty() {
            debug!("Skipping blank {:?} turn", speaker);
            return None;
        }

        let id = TurnId(self.next_id);
        self.next_id += 1;

        self.turns.push(TranscriptTurn {
            id,
            speaker,
            text,
            captured_at: Local::now(),
        });

        Some(id)
    }

    /// Append several turns in the given order as one update
    pub fn batch_append<I>(&mut self, items: I) -> Vec<TurnId>
    where
        I: IntoIterator<Item = TranscriptItem>,
    {
        let items = items.into_iter();
        self.turns.reserve(items.size_hint().0);

        items
            .filter_map(|item| self.append(item.speaker, item.text))
            .collect()
    }

    /// Drop every turn. Used when a call ends.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[TranscriptTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptTurn> {
        self.turns.last()
    }
}
