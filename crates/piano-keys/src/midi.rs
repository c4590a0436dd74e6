//! MIDI input devices
//!
//! Device enumeration and connection live outside the keyboard core: a
//! [`DeviceProvider`] supplies the list of input devices, and
//! [`MidiInputManager`] forwards parsed messages from the selected device
//! over a channel so the UI thread handles them in arrival order.

use crate::error::{Error, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use midir::{MidiInput, MidiInputConnection};

/// MIDI message types parsed from raw MIDI bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note on event (channel 0-15, note 0-127, velocity 1-127)
    NoteOn {
        channel: u8,
        note: u8,
        velocity: u8,
        timestamp: u64,
    },
    /// Note off event (channel 0-15, note 0-127)
    NoteOff {
        channel: u8,
        note: u8,
        timestamp: u64,
    },
    /// Control change (channel, controller number, value)
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
        timestamp: u64,
    },
    /// Pitch bend (channel, 14-bit value centered at 0)
    PitchBend {
        channel: u8,
        value: i16,
        timestamp: u64,
    },
    /// Channel aftertouch (channel pressure)
    ChannelAftertouch {
        channel: u8,
        pressure: u8,
        timestamp: u64,
    },
    /// Polyphonic aftertouch (per-note pressure)
    PolyAftertouch {
        channel: u8,
        note: u8,
        pressure: u8,
        timestamp: u64,
    },
    /// Program change
    ProgramChange {
        channel: u8,
        program: u8,
        timestamp: u64,
    },
    /// MIDI clock tick
    Clock { timestamp: u64 },
    Start { timestamp: u64 },
    Stop { timestamp: u64 },
    Continue { timestamp: u64 },
}

impl MidiMessage {
    /// Parse raw MIDI bytes into a MidiMessage.
    pub fn from_bytes(bytes: &[u8], timestamp: u64) -> Option<Self> {
        let &status = bytes.first()?;

        // System real-time messages (single byte, can appear anywhere)
        match status {
            0xF8 => return Some(MidiMessage::Clock { timestamp }),
            0xFA => return Some(MidiMessage::Start { timestamp }),
            0xFB => return Some(MidiMessage::Continue { timestamp }),
            0xFC => return Some(MidiMessage::Stop { timestamp }),
            _ => {}
        }

        let msg_type = status & 0xF0;
        let channel = status & 0x0F;

        match msg_type {
            0x90 if bytes.len() >= 3 => {
                let note = bytes[1] & 0x7F;
                let velocity = bytes[2] & 0x7F;
                if velocity == 0 {
                    // Note on with velocity 0 is treated as note off
                    Some(MidiMessage::NoteOff {
                        channel,
                        note,
                        timestamp,
                    })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note,
                        velocity,
                        timestamp,
                    })
                }
            }
            0x80 if bytes.len() >= 3 => Some(MidiMessage::NoteOff {
                channel,
                note: bytes[1] & 0x7F,
                timestamp,
            }),
            0xB0 if bytes.len() >= 3 => Some(MidiMessage::ControlChange {
                channel,
                controller: bytes[1],
                value: bytes[2],
                timestamp,
            }),
            0xE0 if bytes.len() >= 3 => {
                let lsb = bytes[1] as i16;
                let msb = bytes[2] as i16;
                Some(MidiMessage::PitchBend {
                    channel,
                    value: ((msb << 7) | lsb) - 8192,
                    timestamp,
                })
            }
            0xD0 if bytes.len() >= 2 => Some(MidiMessage::ChannelAftertouch {
                channel,
                pressure: bytes[1],
                timestamp,
            }),
            0xA0 if bytes.len() >= 3 => Some(MidiMessage::PolyAftertouch {
                channel,
                note: bytes[1],
                pressure: bytes[2],
                timestamp,
            }),
            0xC0 if bytes.len() >= 2 => Some(MidiMessage::ProgramChange {
                channel,
                program: bytes[1],
                timestamp,
            }),
            _ => None,
        }
    }
}

/// An available MIDI input device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    /// Device name (as reported by the system)
    pub name: String,
    /// Port index (for opening)
    pub port_index: usize,
}

impl InputDevice {
    pub fn new(name: impl Into<String>, port_index: usize) -> Self {
        Self {
            name: name.into(),
            port_index,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.name
    }
}

/// Supplies the ordered list of input devices
pub trait DeviceProvider {
    fn devices(&self) -> Result<Vec<InputDevice>>;

    /// First device whose name contains `filter` (case-insensitive)
    fn find(&self, filter: &str) -> Result<Option<InputDevice>> {
        let needle = filter.to_lowercase();
        Ok(self
            .devices()?
            .into_iter()
            .find(|d| d.name.to_lowercase().contains(&needle)))
    }
}

/// System MIDI inputs via midir
pub struct MidirDevices {
    client_name: String,
}

impl MidirDevices {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }
}

impl DeviceProvider for MidirDevices {
    fn devices(&self) -> Result<Vec<InputDevice>> {
        let probe = format!("{}-probe", self.client_name);
        let midi_in = MidiInput::new(&probe)
            .map_err(|e| Error::Midi(format!("Failed to create MIDI input: {}", e)))?;

        let devices = midi_in
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| {
                let name = midi_in
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index));
                InputDevice::new(name, index)
            })
            .collect();
        Ok(devices)
    }
}

/// Fixed device list, for tests and hosts without a MIDI backend
#[derive(Debug, Clone, Default)]
pub struct StaticDevices(pub Vec<InputDevice>);

impl DeviceProvider for StaticDevices {
    fn devices(&self) -> Result<Vec<InputDevice>> {
        Ok(self.0.clone())
    }
}

/// Connection to the selected input device.
///
/// Parsed messages are sent to the receiver returned by [`MidiInputManager::new`].
pub struct MidiInputManager {
    client_name: String,
    port_name: String,
    message_tx: Sender<MidiMessage>,
    connection: Option<(InputDevice, MidiInputConnection<()>)>,
}

impl MidiInputManager {
    pub fn new(client_name: &str, port_name: &str) -> (Self, Receiver<MidiMessage>) {
        let (tx, rx) = unbounded();
        (
            Self {
                client_name: client_name.to_string(),
                port_name: port_name.to_string(),
                message_tx: tx,
                connection: None,
            },
            rx,
        )
    }

    /// Connect to a device, replacing any previous connection
    pub fn open(&mut self, device: &InputDevice) -> Result<()> {
        self.close();

        let midi_in = MidiInput::new(&self.client_name)
            .map_err(|e| Error::Midi(format!("Failed to create MIDI input: {}", e)))?;
        let ports = midi_in.ports();
        let port = ports.get(device.port_index).ok_or_else(|| {
            Error::Midi(format!("Invalid MIDI port index: {}", device.port_index))
        })?;

        let tx = self.message_tx.clone();
        let connection = midi_in
            .connect(
                port,
                &self.port_name,
                move |timestamp, bytes, _| {
                    log::trace!("[MIDI RAW] timestamp={} bytes={:?}", timestamp, bytes);
                    if let Some(msg) = MidiMessage::from_bytes(bytes, timestamp) {
                        let _ = tx.send(msg);
                    }
                },
                (),
            )
            .map_err(|e| Error::Midi(format!("Failed to connect to MIDI device: {}", e)))?;

        log::info!("Connected to MIDI device: {} (port {})", device.name, device.port_index);
        self.connection = Some((device.clone(), connection));
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some((device, connection)) = self.connection.take() {
            let _ = connection.close();
            log::info!("Disconnected from MIDI device: {}", device.name);
        }
    }

    pub fn connected_device(&self) -> Option<&InputDevice> {
        self.connection.as_ref().map(|(device, _)| device)
    }
}

impl Drop for MidiInputManager {
    fn drop(&mut self) {
        self.close();
    }
}
