//! Keyboard aggregate
//!
//! Composes the nine registers into one keyboard view and fans events from
//! every register into a single outward stream.
//!
//! The keyboard never owns the pressed notes: the host passes a snapshot to
//! [`Keyboard::render`] and updates its own set from the events it receives.
//! Power and device selection are host controls too; the keyboard keeps a
//! copy of them as [`KeyboardState`] and changes it only through
//! [`Command`]s, emitting a notification for each change.

use crate::error::{Error, Result};
use crate::event::{DeviceNotes, EventNormalizer, NoteEvent, PointerTracker};
use crate::midi::{InputDevice, MidiMessage};
use crate::note::{PitchClass, Register};
use crate::pressed::PressedNotes;
use crate::register::is_visible;
use crate::resolver::{resolve, resolve_full, KeyVisualState};
use serde::Serialize;
use std::io::Write;

/// Handle returned by [`Keyboard::subscribe`]
pub type SubscriptionId = u64;

/// One register's keys, in layout order
pub type RegisterView = (Register, Vec<KeyVisualState>);

/// Everything the keyboard reports to subscribers.
///
/// Note events serialize as `{"note", "register", "kind"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KeyboardEvent {
    Note(NoteEvent),
    PowerChanged { power: bool },
    DeviceSelected { device: Option<String> },
}

/// Write one event as a JSON line, for hosts that forward or log events
pub fn write_event_line<W: Write>(writer: &mut W, event: &KeyboardEvent) -> Result<()> {
    serde_json::to_writer(&mut *writer, event)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Host-owned controls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardState {
    pub power: bool,
    pub devices: Vec<InputDevice>,
    pub selected: Option<usize>,
}

impl KeyboardState {
    pub fn selected_device(&self) -> Option<&InputDevice> {
        self.selected.and_then(|i| self.devices.get(i))
    }
}

/// State transitions of [`KeyboardState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetPower(bool),
    TogglePower,
    SelectDevice(Option<usize>),
    SetDevices(Vec<InputDevice>),
}

type Handler = Box<dyn FnMut(&KeyboardEvent)>;

/// The nine-register keyboard
pub struct Keyboard {
    state: KeyboardState,
    normalizer: EventNormalizer,
    pointer: PointerTracker,
    device_notes: DeviceNotes,
    subscribers: Vec<(SubscriptionId, Handler)>,
    next_subscription: SubscriptionId,
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new(EventNormalizer::default())
    }
}

impl std::fmt::Debug for Keyboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyboard")
            .field("state", &self.state)
            .field("normalizer", &self.normalizer)
            .field("pointer", &self.pointer)
            .field("device_notes", &self.device_notes)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Keyboard {
    /// Create a powered-off keyboard with no devices
    pub fn new(normalizer: EventNormalizer) -> Self {
        Self {
            state: KeyboardState::default(),
            normalizer,
            pointer: PointerTracker::new(),
            device_notes: DeviceNotes::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Start from an existing controls snapshot
    pub fn with_state(mut self, state: KeyboardState) -> Self {
        self.state = state;
        if self.state.selected_device().is_none() {
            self.state.selected = None;
        }
        self
    }

    pub fn state(&self) -> &KeyboardState {
        &self.state
    }

    pub fn is_powered(&self) -> bool {
        self.state.power
    }

    pub fn devices(&self) -> &[InputDevice] {
        &self.state.devices
    }

    pub fn selected_device(&self) -> Option<&InputDevice> {
        self.state.selected_device()
    }

    /// Key currently held by the pointer
    pub fn pointer_held(&self) -> Option<crate::note::Note> {
        self.pointer.held()
    }

    /// Notes currently held on the selected input device
    pub fn device_held(&self) -> impl Iterator<Item = &crate::note::Note> {
        self.device_notes.iter()
    }

    /// Visible keys of every register, 0 to 8
    pub fn render(&self, pressed: &PressedNotes) -> Vec<RegisterView> {
        Self::render_with(pressed, resolve)
    }

    /// All twelve key slots of every register, hidden ones flagged
    pub fn render_full(&self, pressed: &PressedNotes) -> Vec<RegisterView> {
        Self::render_with(pressed, resolve_full)
    }

    fn render_with(
        pressed: &PressedNotes,
        resolver: fn(&PressedNotes, Register) -> Vec<KeyVisualState>,
    ) -> Vec<RegisterView> {
        pressed
            .partition()
            .iter()
            .zip(Register::ALL)
            .map(|(notes, register)| (register, resolver(notes, register)))
            .collect()
    }

    /// Register a listener. Listeners run synchronously, in registration
    /// order, once per event.
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&KeyboardEvent) + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Returns `false` if the id was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    fn emit(&mut self, event: KeyboardEvent) {
        log::debug!("Keyboard event: {:?}", event);
        for (_, handler) in self.subscribers.iter_mut() {
            handler(&event);
        }
    }

    fn emit_note(&mut self, event: NoteEvent) -> NoteEvent {
        self.emit(KeyboardEvent::Note(event));
        event
    }

    /// Release whatever the device still holds; its note-offs are lost
    fn release_device_notes(&mut self) -> Vec<KeyboardEvent> {
        let releases = self.device_notes.release_all(&self.normalizer);
        if !releases.is_empty() {
            log::debug!("Releasing {} notes held on the device", releases.len());
        }
        releases
            .into_iter()
            .map(|event| KeyboardEvent::Note(self.emit_note(event)))
            .collect()
    }

    /// Apply a host command, returning the notifications it produced
    pub fn apply(&mut self, command: Command) -> Result<Vec<KeyboardEvent>> {
        match command {
            Command::SetPower(on) => Ok(self.set_power(on)),
            Command::TogglePower => Ok(self.set_power(!self.state.power)),
            Command::SelectDevice(index) => self.select_device(index),
            Command::SetDevices(devices) => Ok(self.set_devices(devices)),
        }
    }

    /// Switch power. Turning it off releases the pointer-held key and the
    /// device-held notes first. Nothing is emitted when the value does not
    /// change.
    pub fn set_power(&mut self, on: bool) -> Vec<KeyboardEvent> {
        if self.state.power == on {
            return Vec::new();
        }

        let mut events = Vec::new();
        if !on {
            if let Some(release) = self.pointer.up(&self.normalizer) {
                events.push(KeyboardEvent::Note(self.emit_note(release)));
            }
            events.extend(self.release_device_notes());
        }

        self.state.power = on;
        log::info!("Keyboard power {}", if on { "on" } else { "off" });
        let changed = KeyboardEvent::PowerChanged { power: on };
        self.emit(changed.clone());
        events.push(changed);
        events
    }

    /// Select an input device by index into the device list, or none.
    ///
    /// Switching away from a device releases the notes still held on it,
    /// before the selection notification.
    pub fn select_device(&mut self, index: Option<usize>) -> Result<Vec<KeyboardEvent>> {
        if let Some(i) = index {
            if i >= self.state.devices.len() {
                return Err(Error::UnknownDevice {
                    index: i,
                    available: self.state.devices.len(),
                });
            }
        }

        let mut events = Vec::new();
        if self.state.selected != index {
            events.extend(self.release_device_notes());
        }

        self.state.selected = index;
        let event = KeyboardEvent::DeviceSelected {
            device: self.selected_device().map(|d| d.name.clone()),
        };
        self.emit(event.clone());
        events.push(event);
        Ok(events)
    }

    /// Replace the device list. The selection follows the selected device
    /// by name, or is cleared (with a notification) if it disappeared.
    /// Notes held on a vanished device are released first.
    pub fn set_devices(&mut self, devices: Vec<InputDevice>) -> Vec<KeyboardEvent> {
        let selected_name = self.selected_device().map(|d| d.name.clone());
        self.state.devices = devices;

        let Some(name) = selected_name else {
            return Vec::new();
        };
        match self.state.devices.iter().position(|d| d.name == name) {
            Some(index) => {
                self.state.selected = Some(index);
                Vec::new()
            }
            None => {
                log::warn!("Selected MIDI device {} disappeared", name);
                let mut events = self.release_device_notes();
                self.state.selected = None;
                let event = KeyboardEvent::DeviceSelected { device: None };
                self.emit(event.clone());
                events.push(event);
                events
            }
        }
    }

    /// Power is on and the key exists in its register
    fn accepts(&self, pitch_class: PitchClass, register: Register) -> bool {
        self.state.power && is_visible(pitch_class, register)
    }

    /// A key went down (one raw interaction, one event)
    pub fn press(&mut self, pitch_class: PitchClass, register: Register) -> Option<NoteEvent> {
        if !self.accepts(pitch_class, register) {
            return None;
        }
        let event = self.normalizer.on_interaction_start(pitch_class, register);
        Some(self.emit_note(event))
    }

    /// A key went up
    pub fn release(&mut self, pitch_class: PitchClass, register: Register) -> Option<NoteEvent> {
        if !self.accepts(pitch_class, register) {
            return None;
        }
        let event = self.normalizer.on_interaction_end(pitch_class, register);
        Some(self.emit_note(event))
    }

    /// Pointer went down on a key
    pub fn pointer_down(&mut self, pitch_class: PitchClass, register: Register) -> Vec<NoteEvent> {
        if !self.accepts(pitch_class, register) {
            return Vec::new();
        }
        let events = self.pointer.down(&self.normalizer, pitch_class, register);
        for event in &events {
            self.emit_note(*event);
        }
        events
    }

    /// Pointer went up anywhere: releases the key it went down on
    pub fn pointer_up(&mut self) -> Option<NoteEvent> {
        if !self.state.power {
            return None;
        }
        let event = self.pointer.up(&self.normalizer)?;
        Some(self.emit_note(event))
    }

    /// Inbound device message. Dropped without a selected device, with
    /// power off, or when it is not a note on the keyboard.
    pub fn device_input(&mut self, message: &MidiMessage) -> Option<NoteEvent> {
        if !self.state.power || self.state.selected.is_none() {
            return None;
        }
        let event = self.normalizer.from_external_input(message)?;
        self.device_notes.track(&event);
        Some(self.emit_note(event))
    }
}
