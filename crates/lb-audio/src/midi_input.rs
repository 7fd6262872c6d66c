//! Hardware MIDI input through midir.

use lb_ir::MidiMessage;
use midir::{Ignore, MidiInput, MidiInputConnection};
use ringbuf::traits::Producer;
use ringbuf::HeapProd;
use thiserror::Error;
use tracing::{debug, info, warn};

const CLIENT_NAME: &str = "loopbox input";

/// Error type for MIDI input.
#[derive(Debug, Error)]
pub enum MidiInputError {
    #[error("MIDI init error: {0}")]
    Init(#[from] midir::InitError),
    #[error("MIDI port error: {0}")]
    Port(#[from] midir::PortInfoError),
    #[error("no MIDI input port matching {0:?}")]
    NoPort(String),
    #[error("no MIDI input ports available")]
    NoPorts,
    #[error("MIDI connect error: {0}")]
    Connect(String),
}

/// Names of the available MIDI input ports.
pub fn list_ports() -> Result<Vec<String>, MidiInputError> {
    let input = MidiInput::new("loopbox input listing")?;
    input
        .ports()
        .iter()
        .map(|port| input.port_name(port).map_err(MidiInputError::from))
        .collect()
}

/// An open MIDI input port. Dropping it closes the connection.
pub struct MidiInputHandle {
    port_name: String,
    _connection: MidiInputConnection<()>,
}

impl MidiInputHandle {
    /// Connect to the first port whose name contains `port` (or the first
    /// port at all when `None`) and forward note messages to `producer`.
    ///
    /// Messages that do not fit in the queue are dropped.
    pub fn connect(port: Option<&str>, mut producer: HeapProd<MidiMessage>) -> Result<Self, MidiInputError> {
        let mut input = MidiInput::new(CLIENT_NAME)?;
        input.ignore(Ignore::All);

        let ports = input.ports();
        let mut selected = None;
        for candidate in &ports {
            let name = input.port_name(candidate)?;
            if port.map_or(true, |wanted| name.contains(wanted)) {
                selected = Some((candidate.clone(), name));
                break;
            }
        }

        let (midi_port, port_name) = match (selected, port) {
            (Some(found), _) => found,
            (None, Some(wanted)) => return Err(MidiInputError::NoPort(wanted.to_string())),
            (None, None) => return Err(MidiInputError::NoPorts),
        };

        let connection = input
            .connect(
                &midi_port,
                "loopbox input watcher",
                move |_, bytes, _| {
                    if let Some(message) = MidiMessage::from_bytes(bytes) {
                        if producer.try_push(message).is_err() {
                            warn!("MIDI input queue full, dropping message.");
                        }
                    } else {
                        debug!(bytes = ?bytes, "Ignoring MIDI message.");
                    }
                },
                (),
            )
            .map_err(|e| MidiInputError::Connect(e.to_string()))?;

        info!(port = port_name, "Watching MIDI input.");

        Ok(Self { port_name, _connection: connection })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}
