//! piano-keys - Nine-register piano keyboard
//!
//! Reconciles a host-owned set of pressed notes against the keys of a piano
//! spanning registers 0-8, and turns pointer and MIDI input into note
//! press/release events.
//!
//! - Note catalog with enharmonic aliases (`C#` and `Db` are one key)
//! - Register policy for the partial registers 0 (A-B) and 8 (C-C#)
//! - Pure key state resolution per register
//! - Event normalization for pointer and MIDI input
//! - A keyboard aggregate with synchronous subscriptions and a power gate
//! - A ratatui renderer with mouse hit testing
//!
//! # Usage as a Library
//!
//! ```no_run
//! use piano_keys::{Keyboard, KeyboardEvent, PitchClass, PressedNotes, Register};
//!
//! let mut keyboard = Keyboard::default();
//! keyboard.subscribe(|event| {
//!     if let KeyboardEvent::Note(note) = event {
//!         println!("{} {}{}", note.kind, note.note, note.register);
//!     }
//! });
//! keyboard.set_power(true);
//!
//! let register = Register::new(4).unwrap();
//! keyboard.press(PitchClass::C, register);
//!
//! let pressed = PressedNotes::parse(["C4", "Db4"]).unwrap();
//! for (register, keys) in keyboard.render(&pressed) {
//!     let held = keys.iter().filter(|k| k.pressed).count();
//!     println!("register {}: {} keys held", register, held);
//! }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod keyboard;
pub mod midi;
pub mod note;
pub mod pressed;
pub mod register;
pub mod resolver;
pub mod ui;

// Re-export main types
pub use config::{Config, Theme};
pub use error::{Error, Result};
pub use event::{EventNormalizer, NoteEvent, NoteEventKind, PointerTracker};
pub use keyboard::{Command, Keyboard, KeyboardEvent, KeyboardState, SubscriptionId};
pub use midi::{DeviceProvider, InputDevice, MidiInputManager, MidiMessage};
pub use note::{equivalence_group, Note, NoteName, PitchClass, Register};
pub use pressed::PressedNotes;
pub use register::{is_visible, visible_white_keys, WhiteKeySlot};
pub use resolver::{resolve, resolve_full, KeyVisualState};
pub use ui::{render_screen, KeyboardLayout, PianoWidget};
