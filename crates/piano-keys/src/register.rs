//! Register policy
//!
//! Decides which keys exist in each register. A real 88-key piano starts at
//! A0 and ends at C8, so register 0 only carries A, A#/Bb and B, and
//! register 8 only carries C and C#/Db. Registers 1-7 are full octaves.
//!
//! Each white key slot carries the black key drawn next to it:
//!
//! ```text
//!   C(+C#)  D(+D#)  E  F(+F#)  G(+G#)  A  B(+A#)
//! ```
//!
//! E and B never carry one, since the diatonic scale has no black key
//! between E-F and B-C.

use crate::note::{PitchClass, Register, MAX_REGISTER};

/// A white key and the black key attached to it, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhiteKeySlot {
    pub pitch_class: PitchClass,
    pub black: Option<PitchClass>,
}

impl WhiteKeySlot {
    const fn new(pitch_class: PitchClass, black: Option<PitchClass>) -> Self {
        Self { pitch_class, black }
    }
}

const FULL_OCTAVE: [WhiteKeySlot; 7] = [
    WhiteKeySlot::new(PitchClass::C, Some(PitchClass::CSharp)),
    WhiteKeySlot::new(PitchClass::D, Some(PitchClass::DSharp)),
    WhiteKeySlot::new(PitchClass::E, None),
    WhiteKeySlot::new(PitchClass::F, Some(PitchClass::FSharp)),
    WhiteKeySlot::new(PitchClass::G, Some(PitchClass::GSharp)),
    WhiteKeySlot::new(PitchClass::A, None),
    WhiteKeySlot::new(PitchClass::B, Some(PitchClass::ASharp)),
];

const LOWEST_OCTAVE: [WhiteKeySlot; 2] = [
    WhiteKeySlot::new(PitchClass::A, None),
    WhiteKeySlot::new(PitchClass::B, Some(PitchClass::ASharp)),
];

const HIGHEST_OCTAVE: [WhiteKeySlot; 1] = [WhiteKeySlot::new(PitchClass::C, Some(PitchClass::CSharp))];

/// The full seven-slot layout of an octave
pub fn octave_layout() -> &'static [WhiteKeySlot] {
    &FULL_OCTAVE
}

/// Visible white keys of a register, low to high, with their black keys
pub fn visible_white_keys(register: Register) -> &'static [WhiteKeySlot] {
    match register.index() {
        0 => &LOWEST_OCTAVE,
        MAX_REGISTER => &HIGHEST_OCTAVE,
        _ => &FULL_OCTAVE,
    }
}

/// Whether a key (white or black) exists in a register
pub fn is_visible(pitch_class: PitchClass, register: Register) -> bool {
    visible_white_keys(register)
        .iter()
        .any(|slot| slot.pitch_class == pitch_class || slot.black == Some(pitch_class))
}

/// Number of visible (white, black) keys in a register
pub fn key_counts(register: Register) -> (usize, usize) {
    let slots = visible_white_keys(register);
    let black = slots.iter().filter(|s| s.black.is_some()).count();
    (slots.len(), black)
}
