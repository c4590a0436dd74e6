//! Note events and input normalization
//!
//! Every interaction ends up as a [`NoteEvent`]: a pitch class, a register
//! and whether the key went down or up. Pointer interactions map one to one;
//! device input is translated from MIDI note numbers and silently dropped
//! when it falls outside the keyboard.

use crate::midi::MidiMessage;
use crate::note::{Note, PitchClass, Register};
use crate::register::is_visible;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Whether a key went down or up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteEventKind {
    Press,
    Release,
}

impl fmt::Display for NoteEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteEventKind::Press => f.write_str("press"),
            NoteEventKind::Release => f.write_str("release"),
        }
    }
}

/// Canonical press/release notification.
///
/// Serializes as `{"note": "C#", "register": 4, "kind": "press"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteEvent {
    pub note: PitchClass,
    pub register: Register,
    pub kind: NoteEventKind,
}

impl NoteEvent {
    pub fn press(note: PitchClass, register: Register) -> Self {
        Self {
            note,
            register,
            kind: NoteEventKind::Press,
        }
    }

    pub fn release(note: PitchClass, register: Register) -> Self {
        Self {
            note,
            register,
            kind: NoteEventKind::Release,
        }
    }

    pub fn as_note(&self) -> Note {
        Note::new(self.note, self.register)
    }
}

impl fmt::Display for NoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.kind, self.note, self.register)
    }
}

/// Translates raw interactions into [`NoteEvent`]s.
///
/// Holds no state besides the MIDI channel filter; one raw interaction
/// yields at most one event, and repeated presses are not de-duplicated.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventNormalizer {
    /// Only accept device input on this channel (0-15); `None` accepts all
    channel: Option<u8>,
}

impl EventNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict device input to one MIDI channel (0-15)
    pub fn with_channel(mut self, channel: Option<u8>) -> Self {
        self.channel = channel;
        self
    }

    pub fn channel(&self) -> Option<u8> {
        self.channel
    }

    /// Pointer went down on a key
    pub fn on_interaction_start(&self, pitch_class: PitchClass, register: Register) -> NoteEvent {
        NoteEvent::press(pitch_class, register)
    }

    /// Pointer went up on a key
    pub fn on_interaction_end(&self, pitch_class: PitchClass, register: Register) -> NoteEvent {
        NoteEvent::release(pitch_class, register)
    }

    /// Translate inbound device input.
    ///
    /// Note-on is a press, note-off (or note-on with velocity 0) a release.
    /// Anything else is dropped, as are notes on a filtered-out channel and
    /// notes with no key on the keyboard (below A0, above C#8).
    pub fn from_external_input(&self, message: &MidiMessage) -> Option<NoteEvent> {
        let (channel, number, kind) = match *message {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
                ..
            } => {
                let kind = if velocity == 0 {
                    NoteEventKind::Release
                } else {
                    NoteEventKind::Press
                };
                (channel, note, kind)
            }
            MidiMessage::NoteOff { channel, note, .. } => (channel, note, NoteEventKind::Release),
            _ => return None,
        };

        if self.channel.is_some_and(|c| c != channel) {
            log::trace!("Dropping MIDI note {} on channel {}", number, channel);
            return None;
        }

        let Some(note) = Note::from_midi(number) else {
            log::trace!("Dropping MIDI note {} outside registers 0-8", number);
            return None;
        };
        if !is_visible(note.pitch_class, note.register) {
            log::trace!("Dropping MIDI note {} ({}), not on the keyboard", number, note);
            return None;
        }

        Some(NoteEvent {
            note: note.pitch_class,
            register: note.register,
            kind,
        })
    }

    /// Parse raw MIDI bytes and translate them
    pub fn from_raw_bytes(&self, bytes: &[u8]) -> Option<NoteEvent> {
        MidiMessage::from_bytes(bytes, 0).and_then(|msg| self.from_external_input(&msg))
    }
}

/// Tracks which key the pointer is currently holding.
///
/// A pointer-up releases the key the pointer went down on, wherever the
/// pointer is by then. A pointer-down while a key is still held releases
/// that key first, so a lost pointer-up never leaves a note stuck.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerTracker {
    held: Option<Note>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held(&self) -> Option<Note> {
        self.held
    }

    pub fn down(
        &mut self,
        normalizer: &EventNormalizer,
        pitch_class: PitchClass,
        register: Register,
    ) -> Vec<NoteEvent> {
        let mut events = Vec::with_capacity(2);
        if let Some(previous) = self.held.take() {
            events.push(normalizer.on_interaction_end(previous.pitch_class, previous.register));
        }
        events.push(normalizer.on_interaction_start(pitch_class, register));
        self.held = Some(Note::new(pitch_class, register));
        events
    }

    /// Release the held key, if any
    pub fn up(&mut self, normalizer: &EventNormalizer) -> Option<NoteEvent> {
        self.held
            .take()
            .map(|note| normalizer.on_interaction_end(note.pitch_class, note.register))
    }
}

/// Notes currently held down on the input device.
///
/// Lets the keyboard release them when the device goes away or power is
/// switched off, since the matching note-offs will never be delivered.
#[derive(Debug, Clone, Default)]
pub struct DeviceNotes {
    held: BTreeSet<Note>,
}

impl DeviceNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.held.iter()
    }

    /// Record an event that came from the device
    pub fn track(&mut self, event: &NoteEvent) {
        match event.kind {
            NoteEventKind::Press => {
                self.held.insert(event.as_note());
            }
            NoteEventKind::Release => {
                self.held.remove(&event.as_note());
            }
        }
    }

    /// Release every held note, lowest first
    pub fn release_all(&mut self, normalizer: &EventNormalizer) -> Vec<NoteEvent> {
        std::mem::take(&mut self.held)
            .into_iter()
            .map(|note| normalizer.on_interaction_end(note.pitch_class, note.register))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(i: u8) -> Register {
        Register::new(i).unwrap()
    }

    fn note_on(note: u8, velocity: u8) -> MidiMessage {
        MidiMessage::NoteOn {
            channel: 0,
            note,
            velocity,
            timestamp: 0,
        }
    }

    #[test]
    fn test_interactions() {
        let normalizer = EventNormalizer::new();
        let press = normalizer.on_interaction_start(PitchClass::C, reg(4));
        assert_eq!(press.kind, NoteEventKind::Press);
        let release = normalizer.on_interaction_end(PitchClass::C, reg(4));
        assert_eq!(release.kind, NoteEventKind::Release);
        assert_eq!(press.as_note(), release.as_note());
    }

    #[test]
    fn test_repeated_press_is_not_deduplicated() {
        let normalizer = EventNormalizer::new();
        let a = normalizer.on_interaction_start(PitchClass::E, reg(4));
        let b = normalizer.on_interaction_start(PitchClass::E, reg(4));
        assert_eq!(a, b);
    }

    #[test]
    fn test_device_note_on_and_off() {
        let normalizer = EventNormalizer::new();
        assert_eq!(
            normalizer.from_external_input(&note_on(61, 90)),
            Some(NoteEvent::press(PitchClass::CSharp, reg(4)))
        );
        assert_eq!(
            normalizer.from_external_input(&MidiMessage::NoteOff { channel: 0, note: 21, timestamp: 0 }),
            Some(NoteEvent::release(PitchClass::A, reg(0)))
        );
        assert_eq!(
            normalizer.from_external_input(&note_on(108, 0)),
            Some(NoteEvent::release(PitchClass::C, reg(8)))
        );
    }

    #[test]
    fn test_out_of_range_device_input_is_dropped() {
        let normalizer = EventNormalizer::new();
        // 120 would be C in register 9
        assert_eq!(normalizer.from_external_input(&note_on(120, 100)), None);
        assert_eq!(normalizer.from_external_input(&note_on(127, 100)), None);
        assert_eq!(normalizer.from_external_input(&note_on(5, 100)), None);
    }

    #[test]
    fn test_device_notes_without_a_key_are_dropped() {
        let normalizer = EventNormalizer::new();
        // C0 and G#0 sit below A0, D8 and B8 above C#8
        for number in [12, 20, 110, 119] {
            assert_eq!(normalizer.from_external_input(&note_on(number, 100)), None);
        }
        assert_eq!(
            normalizer.from_external_input(&note_on(109, 100)),
            Some(NoteEvent::press(PitchClass::CSharp, reg(8)))
        );
    }

    #[test]
    fn test_device_notes_release_all() {
        let normalizer = EventNormalizer::new();
        let mut notes = DeviceNotes::new();
        notes.track(&NoteEvent::press(PitchClass::E, reg(4)));
        notes.track(&NoteEvent::press(PitchClass::C, reg(4)));
        notes.track(&NoteEvent::press(PitchClass::G, reg(2)));
        notes.track(&NoteEvent::release(PitchClass::G, reg(2)));

        assert_eq!(
            notes.release_all(&normalizer),
            vec![
                NoteEvent::release(PitchClass::C, reg(4)),
                NoteEvent::release(PitchClass::E, reg(4)),
            ]
        );
        assert!(notes.is_empty());
        assert!(notes.release_all(&normalizer).is_empty());
    }

    #[test]
    fn test_non_note_messages_are_dropped() {
        let normalizer = EventNormalizer::new();
        let cc = MidiMessage::ControlChange { channel: 0, controller: 64, value: 127, timestamp: 0 };
        assert_eq!(normalizer.from_external_input(&cc), None);
        assert_eq!(normalizer.from_raw_bytes(&[0xF8]), None);
        assert_eq!(normalizer.from_raw_bytes(&[]), None);
    }

    #[test]
    fn test_channel_filter() {
        let normalizer = EventNormalizer::new().with_channel(Some(2));
        assert_eq!(normalizer.from_raw_bytes(&[0x90, 60, 100]), None);
        assert_eq!(
            normalizer.from_raw_bytes(&[0x92, 60, 100]),
            Some(NoteEvent::press(PitchClass::C, reg(4)))
        );
    }

    #[test]
    fn test_outward_shape() {
        let event = NoteEvent::press(PitchClass::CSharp, reg(4));
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json, serde_json::json!({"note": "C#", "register": 4, "kind": "press"}));

        let back: NoteEvent =
            serde_json::from_str(r#"{"note": "Db", "register": 4, "kind": "press"}"#).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_pointer_tracker_releases_the_held_key() {
        let normalizer = EventNormalizer::new();
        let mut pointer = PointerTracker::new();

        let events = pointer.down(&normalizer, PitchClass::G, reg(3));
        assert_eq!(events, vec![NoteEvent::press(PitchClass::G, reg(3))]);
        assert_eq!(pointer.held(), Some(Note::new(PitchClass::G, reg(3))));

        assert_eq!(pointer.up(&normalizer), Some(NoteEvent::release(PitchClass::G, reg(3))));
        assert_eq!(pointer.up(&normalizer), None);
    }

    #[test]
    fn test_pointer_tracker_recovers_from_lost_up() {
        let normalizer = EventNormalizer::new();
        let mut pointer = PointerTracker::new();
        pointer.down(&normalizer, PitchClass::C, reg(4));
        let events = pointer.down(&normalizer, PitchClass::D, reg(4));
        assert_eq!(
            events,
            vec![
                NoteEvent::release(PitchClass::C, reg(4)),
                NoteEvent::press(PitchClass::D, reg(4)),
            ]
        );
    }
}
