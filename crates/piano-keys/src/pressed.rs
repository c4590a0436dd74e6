//! Pressed notes
//!
//! The set of notes currently held down. The host owns and mutates it; the
//! keyboard only reads a snapshot per render.

use crate::error::Result;
use crate::event::{NoteEvent, NoteEventKind};
use crate::note::{Note, PitchClass, Register, REGISTER_COUNT};
use std::collections::BTreeSet;

/// Ordered set of held notes, lowest key first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PressedNotes {
    notes: BTreeSet<Note>,
}

impl PressedNotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from host strings such as `"C#4"` or `"Db4"`
    pub fn parse<I, S>(notes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        notes
            .into_iter()
            .map(|s| s.as_ref().parse::<Note>())
            .collect()
    }

    /// Returns `true` if the note was not already held
    pub fn insert(&mut self, note: Note) -> bool {
        self.notes.insert(note)
    }

    /// Returns `true` if the note was held
    pub fn remove(&mut self, note: &Note) -> bool {
        self.notes.remove(note)
    }

    pub fn contains(&self, note: &Note) -> bool {
        self.notes.contains(note)
    }

    /// Whether a pitch class is held in a register
    pub fn is_held(&self, pitch_class: PitchClass, register: Register) -> bool {
        self.contains(&Note::new(pitch_class, register))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> + '_ {
        self.notes.iter()
    }

    /// Notes held in one register
    pub fn in_register(&self, register: Register) -> PressedNotes {
        self.notes
            .iter()
            .filter(|n| n.register == register)
            .copied()
            .collect()
    }

    /// Split the set by register, index `i` holding register `i`
    pub fn partition(&self) -> [PressedNotes; REGISTER_COUNT] {
        let mut parts: [PressedNotes; REGISTER_COUNT] = Default::default();
        for note in &self.notes {
            parts[note.register.index() as usize].insert(*note);
        }
        parts
    }

    /// Host-side bookkeeping: insert on press, remove on release.
    ///
    /// Returns whether the set changed.
    pub fn apply(&mut self, event: &NoteEvent) -> bool {
        let note = event.as_note();
        match event.kind {
            NoteEventKind::Press => self.insert(note),
            NoteEventKind::Release => self.remove(&note),
        }
    }

    /// Space-separated note names, `-` when empty
    pub fn describe(&self) -> String {
        if self.is_empty() {
            "-".to_string()
        } else {
            self.notes
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

impl FromIterator<Note> for PressedNotes {
    fn from_iter<T: IntoIterator<Item = Note>>(iter: T) -> Self {
        Self {
            notes: iter.into_iter().collect(),
        }
    }
}

impl Extend<Note> for PressedNotes {
    fn extend<T: IntoIterator<Item = Note>>(&mut self, iter: T) {
        self.notes.extend(iter);
    }
}

impl<'a> IntoIterator for &'a PressedNotes {
    type Item = &'a Note;
    type IntoIter = std::collections::btree_set::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collapses_aliases() {
        let pressed = PressedNotes::parse(["C#4", "Db4", "E2"]).unwrap();
        assert_eq!(pressed.len(), 2);
        assert!(pressed.contains(&"Db4".parse().unwrap()));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(PressedNotes::parse(["C4", "nope"]).is_err());
    }

    #[test]
    fn test_partition_reassembles_exactly() {
        let pressed = PressedNotes::parse(["A0", "A#0", "C1", "G#4", "C4", "B7", "C8", "C#8"]).unwrap();
        let parts = pressed.partition();

        let total: usize = parts.iter().map(|p| p.len()).sum();
        assert_eq!(total, pressed.len());

        for (i, part) in parts.iter().enumerate() {
            for note in part {
                assert_eq!(note.register.index() as usize, i);
            }
        }

        let reassembled: PressedNotes = parts.iter().flat_map(|p| p.iter().copied()).collect();
        assert_eq!(reassembled, pressed);
    }

    #[test]
    fn test_in_register_matches_partition() {
        let pressed = PressedNotes::parse(["C4", "E4", "C5"]).unwrap();
        let four = Register::new(4).unwrap();
        assert_eq!(pressed.in_register(four), pressed.partition()[4]);
        assert_eq!(pressed.in_register(four).len(), 2);
    }

    #[test]
    fn test_describe() {
        assert_eq!(PressedNotes::new().describe(), "-");
        let pressed = PressedNotes::parse(["E4", "Db4"]).unwrap();
        assert_eq!(pressed.describe(), "C#4 E4");
    }
}
