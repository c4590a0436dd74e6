//! Key state resolver
//!
//! Turns a pressed-notes snapshot and a register into the visual state of
//! each key. Pure: the output depends only on the two inputs.

use crate::note::{PitchClass, Register};
use crate::pressed::PressedNotes;
use crate::register::{is_visible, octave_layout, visible_white_keys, WhiteKeySlot};

/// Derived state of one key for the current render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyVisualState {
    pub pitch_class: PitchClass,
    pub is_black_key: bool,
    pub visible: bool,
    pub pressed: bool,
}

impl KeyVisualState {
    /// `"C#/Db"` for black keys, `"C"` for white keys
    pub fn label(&self) -> String {
        self.pitch_class.label()
    }
}

fn slot_states(
    slots: &[WhiteKeySlot],
    pressed: &PressedNotes,
    register: Register,
) -> Vec<KeyVisualState> {
    let mut keys = Vec::with_capacity(slots.len() * 2);
    for slot in slots {
        keys.push(key_state(slot.pitch_class, pressed, register));
        if let Some(black) = slot.black {
            keys.push(key_state(black, pressed, register));
        }
    }
    keys
}

fn key_state(pitch_class: PitchClass, pressed: &PressedNotes, register: Register) -> KeyVisualState {
    let visible = is_visible(pitch_class, register);
    KeyVisualState {
        pitch_class,
        is_black_key: pitch_class.is_black(),
        visible,
        // Notes are keyed by canonical pitch class, so a held `Db` and a held
        // `C#` hit the same entry.
        pressed: visible && pressed.is_held(pitch_class, register),
    }
}

/// Visible keys of a register in layout order: each white key followed by
/// its attached black key.
pub fn resolve(pressed: &PressedNotes, register: Register) -> Vec<KeyVisualState> {
    slot_states(visible_white_keys(register), pressed, register)
}

/// All twelve keys of the octave layout, hidden keys flagged `visible: false`
/// and never pressed.
pub fn resolve_full(pressed: &PressedNotes, register: Register) -> Vec<KeyVisualState> {
    slot_states(octave_layout(), pressed, register)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(i: u8) -> Register {
        Register::new(i).unwrap()
    }

    fn pressed_classes(keys: &[KeyVisualState]) -> Vec<PitchClass> {
        keys.iter().filter(|k| k.pressed).map(|k| k.pitch_class).collect()
    }

    #[test]
    fn test_enharmonic_spellings_press_the_same_key() {
        let flat = resolve(&PressedNotes::parse(["Db3"]).unwrap(), reg(3));
        let sharp = resolve(&PressedNotes::parse(["C#3"]).unwrap(), reg(3));
        assert_eq!(flat, sharp);
        assert_eq!(pressed_classes(&flat), vec![PitchClass::CSharp]);
    }

    #[test]
    fn test_c_and_c_sharp_in_register_four() {
        let pressed = PressedNotes::parse(["C4", "C#4"]).unwrap();
        let keys = resolve(&pressed, reg(4));

        assert_eq!(keys.len(), 12);
        for key in &keys {
            let expected = matches!(key.pitch_class, PitchClass::C | PitchClass::CSharp);
            assert_eq!(key.pressed, expected, "{}", key.label());
            assert!(key.visible);
        }
    }

    #[test]
    fn test_order_follows_layout() {
        let keys = resolve(&PressedNotes::new(), reg(2));
        let order: Vec<_> = keys.iter().map(|k| k.pitch_class.primary_name()).collect();
        assert_eq!(order, vec!["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "B", "A#"]);
        assert!(keys.iter().filter(|k| k.is_black_key).count() == 5);
    }

    #[test]
    fn test_other_registers_are_ignored() {
        let pressed = PressedNotes::parse(["C3", "C5"]).unwrap();
        assert!(pressed_classes(&resolve(&pressed, reg(4))).is_empty());
    }

    #[test]
    fn test_partial_registers() {
        let pressed = PressedNotes::parse(["A0", "Bb0", "C0", "C8", "Db8", "D8"]).unwrap();

        let low = resolve(&pressed, reg(0));
        assert_eq!(low.len(), 3);
        assert_eq!(pressed_classes(&low), vec![PitchClass::A, PitchClass::ASharp]);

        let high = resolve(&pressed, reg(8));
        assert_eq!(high.len(), 2);
        assert_eq!(pressed_classes(&high), vec![PitchClass::C, PitchClass::CSharp]);
    }

    #[test]
    fn test_full_resolution_hides_missing_keys() {
        let pressed = PressedNotes::parse(["C0", "A0"]).unwrap();
        let keys = resolve_full(&pressed, reg(0));
        assert_eq!(keys.len(), 12);

        let c = keys.iter().find(|k| k.pitch_class == PitchClass::C).unwrap();
        assert!(!c.visible);
        assert!(!c.pressed);

        let a = keys.iter().find(|k| k.pitch_class == PitchClass::A).unwrap();
        assert!(a.visible);
        assert!(a.pressed);

        assert_eq!(keys.iter().filter(|k| k.visible).count(), 3);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let pressed = PressedNotes::parse(["F#6", "B6"]).unwrap();
        assert_eq!(resolve(&pressed, reg(6)), resolve(&pressed, reg(6)));
    }
}
