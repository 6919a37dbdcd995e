//! MIDI output for motif
//!
//! [`OutputSink`] is the seam the player talks to. [`MidiOutputSink`] sends to a
//! real port through midir; [`MemorySink`] records messages instead, for dry
//! runs and tests.

use anyhow::{anyhow, Result};
use midir::{MidiOutput, MidiOutputConnection};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

const CLIENT_NAME: &str = "motif";
const CONNECTION_NAME: &str = "motif-out";

/// Channel notes are sent on (0-indexed)
pub const NOTE_CHANNEL: u8 = 0;
/// Control Change number for All Notes Off
pub const ALL_NOTES_OFF_CC: u8 = 123;

/// A channel voice message on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note Off: channel (0-15), note (0-127)
    NoteOff { channel: u8, note: u8 },
    /// Control Change: channel, controller number, value
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
}

impl MidiMessage {
    pub fn all_notes_off(channel: u8) -> Self {
        MidiMessage::ControlChange {
            channel,
            controller: ALL_NOTES_OFF_CC,
            value: 0,
        }
    }

    /// Standard 3-byte encoding
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            // 0x90 + channel, note, velocity
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            // 0x80 + channel, note, velocity 0
            MidiMessage::NoteOff { channel, note } => [0x80 | (channel & 0x0F), note & 0x7F, 0],
            // 0xB0 + channel, controller, value
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => [0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F],
        }
    }
}

/// How the user picks a port: by its position in `ports`, or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelector {
    Index(usize),
    Name(String),
}

impl PortSelector {
    pub fn parse(arg: &str) -> Self {
        match arg.parse::<usize>() {
            Ok(index) => PortSelector::Index(index),
            Err(_) => PortSelector::Name(arg.to_string()),
        }
    }

    /// Find the matching entry in `ports`: index first, then exact name,
    /// then the first name containing the argument
    pub fn resolve(&self, ports: &[String]) -> Result<usize> {
        match self {
            PortSelector::Index(index) => {
                if ports.is_empty() {
                    return Err(anyhow!("No MIDI output ports found"));
                }
                if *index < ports.len() {
                    Ok(*index)
                } else {
                    Err(anyhow!(
                        "Port index {} out of range (0-{})",
                        index,
                        ports.len() - 1
                    ))
                }
            }
            PortSelector::Name(name) => ports
                .iter()
                .position(|p| p == name)
                .or_else(|| ports.iter().position(|p| p.contains(name.as_str())))
                .ok_or_else(|| anyhow!("MIDI port '{}' not found", name)),
        }
    }
}

/// One label per port, in port order. A port whose name cannot be read keeps
/// its slot so indices still line up with the port list.
fn label_ports<E>(names: impl IntoIterator<Item = std::result::Result<String, E>>) -> Vec<String> {
    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| name.unwrap_or_else(|_| format!("<unnamed port {}>", index)))
        .collect()
}

/// Destination for note messages.
///
/// Implementations use interior locking so one sink can be shared between the
/// command thread and the playback worker.
pub trait OutputSink: Send + Sync {
    /// Deliver one message
    fn send(&self, message: MidiMessage) -> Result<()>;

    /// Whether `send` has somewhere to go
    fn is_connected(&self) -> bool;

    /// Name of the open port, if any
    fn port_name(&self) -> Option<String>;

    /// Names of the ports this sink could switch to
    fn list_ports(&self) -> Result<Vec<String>>;

    /// Close the current port and open the selected one, returning its name
    fn select_port(&self, selector: &PortSelector) -> Result<String>;

    /// Release the port
    fn close(&self);

    fn note_on(&self, pitch: u8, velocity: u8) -> Result<()> {
        self.send(MidiMessage::NoteOn {
            channel: NOTE_CHANNEL,
            note: pitch,
            velocity,
        })
    }

    fn note_off(&self, pitch: u8) -> Result<()> {
        self.send(MidiMessage::NoteOff {
            channel: NOTE_CHANNEL,
            note: pitch,
        })
    }

    /// All Notes Off on all 16 channels. Keeps going past failures and
    /// reports the first one.
    fn all_notes_off(&self) -> Result<()> {
        let mut first_err = None;
        for channel in 0..16u8 {
            if let Err(e) = self.send(MidiMessage::all_notes_off(channel)) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// midir-backed sink. Starts disconnected if no port can be opened.
pub struct MidiOutputSink {
    connection: Mutex<Option<MidiOutputConnection>>,
    port_name: RwLock<Option<String>>,
}

impl MidiOutputSink {
    /// A sink with no port open
    pub fn disconnected() -> Self {
        Self {
            connection: Mutex::new(None),
            port_name: RwLock::new(None),
        }
    }

    /// Open the selected port, or the first available one when `selector` is `None`
    pub fn open(selector: Option<&PortSelector>) -> Result<Self> {
        let sink = Self::disconnected();
        let selector = selector.cloned().unwrap_or(PortSelector::Index(0));
        sink.select_port(&selector)?;
        Ok(sink)
    }

    /// Creating a client can fail transiently on some platforms, so retry a few times
    fn client() -> Result<MidiOutput> {
        let mut last_err = None;
        for attempt in 0..3 {
            if attempt > 0 {
                std::thread::sleep(Duration::from_millis(100));
            }
            match MidiOutput::new(CLIENT_NAME) {
                Ok(midi_out) => return Ok(midi_out),
                Err(e) => last_err = Some(e),
            }
        }
        Err(anyhow!(
            "MIDI initialization failed after 3 attempts: {:?}",
            last_err
        ))
    }

    fn port_names(midi_out: &MidiOutput) -> Vec<String> {
        label_ports(midi_out.ports().iter().map(|p| midi_out.port_name(p)))
    }
}

impl OutputSink for MidiOutputSink {
    fn send(&self, message: MidiMessage) -> Result<()> {
        let mut connection = self
            .connection
            .lock()
            .map_err(|_| anyhow!("MIDI connection lock poisoned"))?;
        let conn = connection
            .as_mut()
            .ok_or_else(|| anyhow!("No MIDI output connected"))?;
        conn.send(&message.to_bytes())
            .map_err(|e| anyhow!("Failed to send {:?}: {}", message, e))
    }

    fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .map(|c| c.is_some())
            .unwrap_or(false)
    }

    fn port_name(&self) -> Option<String> {
        self.port_name.read().ok().and_then(|name| name.clone())
    }

    fn list_ports(&self) -> Result<Vec<String>> {
        Ok(Self::port_names(&Self::client()?))
    }

    fn select_port(&self, selector: &PortSelector) -> Result<String> {
        let midi_out = Self::client()?;
        let ports = midi_out.ports();
        let names = Self::port_names(&midi_out);
        let index = selector.resolve(&names)?;
        let port = ports
            .get(index)
            .ok_or_else(|| anyhow!("MIDI port list changed while connecting"))?;
        let name = names[index].clone();

        // Silence and release the old port before opening the new one
        self.close();

        let connection = midi_out
            .connect(port, CONNECTION_NAME)
            .map_err(|e| anyhow!("Failed to connect to '{}': {}", name, e))?;

        *self
            .connection
            .lock()
            .map_err(|_| anyhow!("MIDI connection lock poisoned"))? = Some(connection);
        if let Ok(mut stored) = self.port_name.write() {
            *stored = Some(name.clone());
        }
        tracing::info!(port = %name, "MIDI output connected");
        Ok(name)
    }

    fn close(&self) {
        if self.is_connected() {
            if let Err(e) = self.all_notes_off() {
                tracing::warn!("All notes off before closing failed: {:#}", e);
            }
        }
        if let Ok(mut connection) = self.connection.lock() {
            if let Some(conn) = connection.take() {
                conn.close();
            }
        }
        if let Ok(mut name) = self.port_name.write() {
            *name = None;
        }
    }
}

impl Drop for MidiOutputSink {
    fn drop(&mut self) {
        self.close();
    }
}

/// In-memory sink that records every message it is given
pub struct MemorySink {
    messages: Mutex<Vec<MidiMessage>>,
    connected: RwLock<bool>,
}

impl MemorySink {
    pub const PORT_NAME: &'static str = "memory";

    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            connected: RwLock::new(true),
        }
    }

    /// A sink that behaves like a missing MIDI device
    pub fn unavailable() -> Self {
        let sink = Self::new();
        sink.close();
        sink
    }

    /// Everything sent so far, oldest first
    pub fn messages(&self) -> Vec<MidiMessage> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn note_ons(&self) -> Vec<u8> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                MidiMessage::NoteOn { note, .. } => Some(note),
                _ => None,
            })
            .collect()
    }

    pub fn note_offs(&self) -> Vec<u8> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                MidiMessage::NoteOff { note, .. } => Some(note),
                _ => None,
            })
            .collect()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for MemorySink {
    fn send(&self, message: MidiMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(anyhow!("No MIDI output connected"));
        }
        tracing::trace!(?message, "memory sink");
        self.messages
            .lock()
            .map_err(|_| anyhow!("Message log lock poisoned"))?
            .push(message);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.read().map(|c| *c).unwrap_or(false)
    }

    fn port_name(&self) -> Option<String> {
        self.is_connected().then(|| Self::PORT_NAME.to_string())
    }

    fn list_ports(&self) -> Result<Vec<String>> {
        Ok(vec![Self::PORT_NAME.to_string()])
    }

    fn select_port(&self, selector: &PortSelector) -> Result<String> {
        let ports = self.list_ports()?;
        let index = selector.resolve(&ports)?;
        if let Ok(mut connected) = self.connected.write() {
            *connected = true;
        }
        Ok(ports[index].clone())
    }

    fn close(&self) {
        if let Ok(mut connected) = self.connected.write() {
            *connected = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_encoding() {
        assert_eq!(
            MidiMessage::NoteOn {
                channel: 0,
                note: 60,
                velocity: 100
            }
            .to_bytes(),
            [0x90, 60, 100]
        );
        assert_eq!(
            MidiMessage::NoteOff {
                channel: 3,
                note: 64
            }
            .to_bytes(),
            [0x83, 64, 0]
        );
        assert_eq!(MidiMessage::all_notes_off(15).to_bytes(), [0xBF, 123, 0]);
        // Out-of-range data bytes are masked rather than corrupting the status byte
        assert_eq!(
            MidiMessage::NoteOn {
                channel: 17,
                note: 200,
                velocity: 255
            }
            .to_bytes(),
            [0x91, 200 & 0x7F, 0x7F]
        );
    }

    #[test]
    fn test_port_selector_parse() {
        assert_eq!(PortSelector::parse("2"), PortSelector::Index(2));
        assert_eq!(
            PortSelector::parse("IAC Driver"),
            PortSelector::Name("IAC Driver".into())
        );
    }

    #[test]
    fn test_port_selector_resolve() {
        let ports = vec![
            "Midi Through Port-0".to_string(),
            "FluidSynth".to_string(),
            "Fluid".to_string(),
        ];
        assert_eq!(PortSelector::Index(1).resolve(&ports).unwrap(), 1);
        assert_eq!(
            PortSelector::Index(3).resolve(&ports).unwrap_err().to_string(),
            "Port index 3 out of range (0-2)"
        );
        // Exact names win over earlier partial matches
        assert_eq!(PortSelector::Name("Fluid".into()).resolve(&ports).unwrap(), 2);
        assert_eq!(PortSelector::Name("Through".into()).resolve(&ports).unwrap(), 0);
        assert!(PortSelector::Name("Nope".into()).resolve(&ports).is_err());
        assert!(PortSelector::Index(0).resolve(&[]).is_err());
    }

    #[test]
    fn test_unreadable_port_names_keep_their_slot() {
        let names = label_ports(vec![
            Ok("IAC Bus 1".to_string()),
            Err("busy"),
            Ok("FluidSynth".to_string()),
        ]);
        assert_eq!(names, vec!["IAC Bus 1", "<unnamed port 1>", "FluidSynth"]);

        // Index 2 still means the third port the backend reported
        assert_eq!(PortSelector::Index(2).resolve(&names).unwrap(), 2);
        assert_eq!(
            PortSelector::Name("Fluid".into()).resolve(&names).unwrap(),
            2
        );
    }

    #[test]
    fn test_all_notes_off_covers_every_channel() {
        let sink = MemorySink::new();
        sink.all_notes_off().unwrap();

        let messages = sink.messages();
        assert_eq!(messages.len(), 16);
        for (channel, message) in messages.iter().enumerate() {
            assert_eq!(*message, MidiMessage::all_notes_off(channel as u8));
        }
    }

    #[test]
    fn test_memory_sink_unavailable() {
        let sink = MemorySink::unavailable();
        assert!(!sink.is_connected());
        assert!(sink.port_name().is_none());
        assert!(sink.note_on(60, 100).is_err());
        assert!(sink.messages().is_empty());

        assert_eq!(sink.select_port(&PortSelector::Index(0)).unwrap(), "memory");
        assert!(sink.note_on(60, 100).is_ok());
        assert_eq!(sink.note_ons(), vec![60]);
    }

    #[test]
    fn test_disconnected_midi_sink() {
        let sink = MidiOutputSink::disconnected();
        assert!(!sink.is_connected());
        assert!(sink.port_name().is_none());
        assert!(sink.note_off(60).is_err());
        // Closing twice is harmless
        sink.close();
        sink.close();
    }
}
