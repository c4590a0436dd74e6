//! Note catalog
//!
//! The twelve pitch classes of an octave, the seventeen spellings the
//! keyboard accepts for them, the nine registers of the keyboard and the
//! `(pitch class, register)` pair that identifies a physical key.
//!
//! Enharmonic spellings (`C#`/`Db`, `D#`/`Eb`, `F#`/`Gb`, `G#`/`Ab`,
//! `A#`/`Bb`) all resolve to a single [`PitchClass`], so two notes that name
//! the same physical key always compare equal.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of registers on the keyboard (0-8)
pub const REGISTER_COUNT: usize = 9;

/// Highest register index
pub const MAX_REGISTER: u8 = 8;

/// One of the twelve chromatic pitch classes, low to high
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes in ascending order
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C (0-11)
    pub fn semitone(self) -> u8 {
        self as u8
    }

    /// Pitch class for a semitone offset (wraps modulo 12)
    pub fn from_semitone(semitone: u8) -> Self {
        Self::ALL[(semitone % 12) as usize]
    }

    /// Whether this pitch class sits on a black key
    pub fn is_black(self) -> bool {
        matches!(
            self,
            PitchClass::CSharp
                | PitchClass::DSharp
                | PitchClass::FSharp
                | PitchClass::GSharp
                | PitchClass::ASharp
        )
    }

    /// Canonical name (sharps for black keys)
    pub fn primary_name(self) -> &'static str {
        self.primary().as_str()
    }

    /// Flat spelling of a black key, `None` for white keys
    pub fn alias(self) -> Option<&'static str> {
        self.names().get(1).map(|n| n.as_str())
    }

    /// Canonical spelling as a [`NoteName`]
    pub fn primary(self) -> NoteName {
        self.names()[0]
    }

    /// Equivalence group: the primary spelling first, then the alias if any
    pub fn names(self) -> &'static [NoteName] {
        match self {
            PitchClass::C => &[NoteName::C],
            PitchClass::CSharp => &[NoteName::CSharp, NoteName::DFlat],
            PitchClass::D => &[NoteName::D],
            PitchClass::DSharp => &[NoteName::DSharp, NoteName::EFlat],
            PitchClass::E => &[NoteName::E],
            PitchClass::F => &[NoteName::F],
            PitchClass::FSharp => &[NoteName::FSharp, NoteName::GFlat],
            PitchClass::G => &[NoteName::G],
            PitchClass::GSharp => &[NoteName::GSharp, NoteName::AFlat],
            PitchClass::A => &[NoteName::A],
            PitchClass::ASharp => &[NoteName::ASharp, NoteName::BFlat],
            PitchClass::B => &[NoteName::B],
        }
    }

    /// `"C#/Db"` for black keys, `"C"` for white keys
    pub fn label(self) -> String {
        match self.alias() {
            Some(alias) => format!("{}/{}", self.primary_name(), alias),
            None => self.primary_name().to_string(),
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.primary_name())
    }
}

impl FromStr for PitchClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<NoteName>().map(NoteName::pitch_class)
    }
}

impl Serialize for PitchClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.primary_name())
    }
}

impl<'de> Deserialize<'de> for PitchClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// A spelling of a pitch class as the host writes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteName {
    A,
    AFlat,
    ASharp,
    B,
    BFlat,
    C,
    CSharp,
    D,
    DSharp,
    DFlat,
    E,
    EFlat,
    F,
    FSharp,
    G,
    GSharp,
    GFlat,
}

impl NoteName {
    /// Every accepted spelling
    pub const ALL: [NoteName; 17] = [
        NoteName::A,
        NoteName::AFlat,
        NoteName::ASharp,
        NoteName::B,
        NoteName::BFlat,
        NoteName::C,
        NoteName::CSharp,
        NoteName::D,
        NoteName::DSharp,
        NoteName::DFlat,
        NoteName::E,
        NoteName::EFlat,
        NoteName::F,
        NoteName::FSharp,
        NoteName::G,
        NoteName::GSharp,
        NoteName::GFlat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NoteName::A => "A",
            NoteName::AFlat => "Ab",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
            NoteName::BFlat => "Bb",
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::DFlat => "Db",
            NoteName::E => "E",
            NoteName::EFlat => "Eb",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::GFlat => "Gb",
        }
    }

    /// The physical key this spelling names
    pub fn pitch_class(self) -> PitchClass {
        match self {
            NoteName::C => PitchClass::C,
            NoteName::CSharp | NoteName::DFlat => PitchClass::CSharp,
            NoteName::D => PitchClass::D,
            NoteName::DSharp | NoteName::EFlat => PitchClass::DSharp,
            NoteName::E => PitchClass::E,
            NoteName::F => PitchClass::F,
            NoteName::FSharp | NoteName::GFlat => PitchClass::FSharp,
            NoteName::G => PitchClass::G,
            NoteName::GSharp | NoteName::AFlat => PitchClass::GSharp,
            NoteName::A => PitchClass::A,
            NoteName::ASharp | NoteName::BFlat => PitchClass::ASharp,
            NoteName::B => PitchClass::B,
        }
    }

    /// Equivalence group this spelling belongs to
    pub fn equivalents(self) -> &'static [NoteName] {
        self.pitch_class().names()
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        NoteName::ALL
            .iter()
            .copied()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| Error::UnknownNoteName(s.to_string()))
    }
}

/// Look up the enharmonic equivalence group of a spelling.
///
/// `"Db"` and `"C#"` both yield `[C#, Db]`; natural names yield a singleton.
pub fn equivalence_group(name: &str) -> Result<&'static [NoteName]> {
    name.parse::<NoteName>().map(NoteName::equivalents)
}

/// One octave span of the keyboard, 0 (lowest) to 8 (highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Register(u8);

impl Register {
    /// All registers in ascending order
    pub const ALL: [Register; REGISTER_COUNT] = [
        Register(0),
        Register(1),
        Register(2),
        Register(3),
        Register(4),
        Register(5),
        Register(6),
        Register(7),
        Register(8),
    ];

    /// Validate a register index
    pub fn new(index: u8) -> Result<Self> {
        if index <= MAX_REGISTER {
            Ok(Self(index))
        } else {
            Err(Error::RegisterOutOfRange(index))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// Registers 0 and 8 only carry part of an octave
    pub fn is_partial(self) -> bool {
        self.0 == 0 || self.0 == MAX_REGISTER
    }
}

impl TryFrom<u8> for Register {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self> {
        Self::new(index)
    }
}

impl From<Register> for u8 {
    fn from(register: Register) -> u8 {
        register.0
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical key: pitch class within a register.
///
/// Ordering is by register, then pitch, so a sorted set of notes reads from
/// the lowest key to the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Note {
    pub register: Register,
    pub pitch_class: PitchClass,
}

impl Note {
    pub fn new(pitch_class: PitchClass, register: Register) -> Self {
        Self {
            register,
            pitch_class,
        }
    }

    /// MIDI note number (A0 = 21, C4 = 60, C8 = 108)
    pub fn midi_number(self) -> u8 {
        12 * (self.register.index() + 1) + self.pitch_class.semitone()
    }

    /// Note for a MIDI note number, `None` outside registers 0-8
    pub fn from_midi(number: u8) -> Option<Self> {
        let octave = number / 12;
        if octave == 0 {
            return None;
        }
        let register = Register::new(octave - 1).ok()?;
        Some(Self::new(PitchClass::from_semitone(number), register))
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class, self.register)
    }
}

impl FromStr for Note {
    type Err = Error;

    /// Parse the host form `"<name><register>"`, e.g. `"Db4"` or `"A0"`
    fn from_str(s: &str) -> Result<Self> {
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| Error::InvalidNote(s.to_string()))?;
        let (name, register) = s.split_at(split);
        let name: NoteName = name.parse()?;
        let register: u8 = register
            .parse()
            .map_err(|_| Error::InvalidNote(s.to_string()))?;
        Ok(Self::new(name.pitch_class(), Register::new(register)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalence_group_is_bidirectional() {
        let from_flat = equivalence_group("Db").unwrap();
        let from_sharp = equivalence_group("C#").unwrap();
        assert_eq!(from_flat, from_sharp);
        assert_eq!(from_flat, &[NoteName::CSharp, NoteName::DFlat]);
    }

    #[test]
    fn test_white_keys_have_singleton_groups() {
        for name in ["C", "D", "E", "F", "G", "A", "B"] {
            let group = equivalence_group(name).unwrap();
            assert_eq!(group.len(), 1, "{} should have no alias", name);
            assert_eq!(group[0].as_str(), name);
        }
    }

    #[test]
    fn test_one_group_per_black_key() {
        let black: Vec<_> = PitchClass::ALL.iter().filter(|pc| pc.is_black()).collect();
        assert_eq!(black.len(), 5);
        for pc in black {
            assert_eq!(pc.names().len(), 2);
            assert!(pc.alias().is_some());
        }
    }

    #[test]
    fn test_unknown_name_fails_fast() {
        assert!(matches!(equivalence_group("H"), Err(Error::UnknownNoteName(_))));
        assert!(matches!("Cb".parse::<NoteName>(), Err(Error::UnknownNoteName(_))));
    }

    #[test]
    fn test_every_spelling_round_trips_through_display() {
        for name in NoteName::ALL {
            assert_eq!(name.as_str().parse::<NoteName>().unwrap(), name);
        }
    }

    #[test]
    fn test_register_bounds() {
        assert!(Register::new(0).is_ok());
        assert!(Register::new(8).is_ok());
        assert!(matches!(Register::new(9), Err(Error::RegisterOutOfRange(9))));
        assert!(Register::new(0).unwrap().is_partial());
        assert!(Register::new(8).unwrap().is_partial());
        assert!(!Register::new(4).unwrap().is_partial());
    }

    #[test]
    fn test_aliases_are_the_same_note() {
        let sharp: Note = "C#3".parse().unwrap();
        let flat: Note = "Db3".parse().unwrap();
        assert_eq!(sharp, flat);
        assert_ne!(sharp, "Db4".parse::<Note>().unwrap());
        assert_eq!(flat.to_string(), "C#3");
    }

    #[test]
    fn test_invalid_note_strings() {
        assert!(matches!("C".parse::<Note>(), Err(Error::InvalidNote(_))));
        assert!(matches!("X4".parse::<Note>(), Err(Error::UnknownNoteName(_))));
        assert!(matches!("C9".parse::<Note>(), Err(Error::RegisterOutOfRange(9))));
    }

    #[test]
    fn test_midi_numbers() {
        assert_eq!("A0".parse::<Note>().unwrap().midi_number(), 21);
        assert_eq!("C4".parse::<Note>().unwrap().midi_number(), 60);
        assert_eq!("C8".parse::<Note>().unwrap().midi_number(), 108);
        assert_eq!(Note::from_midi(61).unwrap().to_string(), "C#4");
        assert_eq!(Note::from_midi(11), None);
        assert_eq!(Note::from_midi(120), None);
        assert_eq!(Note::from_midi(119).unwrap().to_string(), "B8");
    }

    #[test]
    fn test_register_serde_rejects_out_of_range() {
        let ok: Register = serde_json::from_str("8").unwrap();
        assert_eq!(ok.index(), 8);
        assert!(serde_json::from_str::<Register>("9").is_err());
    }
}
