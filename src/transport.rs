use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

use serde::{Deserialize, Serialize};

use crate::error::{GabesError, Result};
use crate::garbled::GarbledCircuit;
use crate::label::Label;
use crate::scheme::SchemeKind;

/// Upper bound on a single frame, to catch corrupt length prefixes.
const MAX_FRAME_LEN: usize = 256 * 1024 * 1024;

/// The one-byte acknowledgement frame body.
const ACK_BYTE: u8 = 0x06;

/// Every frame the two parties exchange, in protocol order.
///
/// RSA values are minimal big-endian byte strings; the bincode envelope
/// length-prefixes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Garbler's opening announcement of its active scheme.
    Hello {
        /// The scheme the garbler garbled under.
        scheme: SchemeKind,
    },
    /// The cleaned circuit.
    Circuit(GarbledCircuit),
    /// Canonical input-wire ordering plus the garbler's claimed wires.
    InputOrder {
        /// All input identifiers, in circuit traversal order.
        order: Vec<String>,
        /// The subset the garbler feeds.
        garbler_ids: Vec<String>,
    },
    /// The evaluator's claimed wires.
    EvaluatorIds(Vec<String>),
    /// One garbler-input label.
    InputLabel {
        /// Wire identifier the label belongs to.
        id: String,
        /// The label for the garbler's actual input bit.
        label: Label,
    },
    /// OT round 1: public exponent, modulus and the two pads.
    OtPublicKey {
        /// RSA public exponent.
        e: Vec<u8>,
        /// RSA modulus (>= 2048 bits).
        n: Vec<u8>,
        /// Pad for choice 0.
        x0: Vec<u8>,
        /// Pad for choice 1.
        x1: Vec<u8>,
    },
    /// OT round 2: the evaluator's blinded value `(x_b + k^e) mod N`.
    OtBlinded(Vec<u8>),
    /// OT round 3: both labels, each masked by the garbler's unblinding
    /// of the corresponding pad.
    OtMasked {
        /// Masked label for choice 0.
        m0: Vec<u8>,
        /// Masked label for choice 1.
        m1: Vec<u8>,
    },
    /// The evaluator's computed output label.
    OutputLabel(Label),
    /// The plaintext output bit, decoded by the garbler.
    Output(bool),
}

impl Message {
    /// Short name for protocol-error reporting.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Message::Hello { .. } => "Hello",
            Message::Circuit(_) => "Circuit",
            Message::InputOrder { .. } => "InputOrder",
            Message::EvaluatorIds(_) => "EvaluatorIds",
            Message::InputLabel { .. } => "InputLabel",
            Message::OtPublicKey { .. } => "OtPublicKey",
            Message::OtBlinded(_) => "OtBlinded",
            Message::OtMasked { .. } => "OtMasked",
            Message::OutputLabel(_) => "OutputLabel",
            Message::Output(_) => "Output",
        }
    }
}

/// A length-framed, synchronous channel between the two parties.
///
/// Each frame is a 4-byte big-endian length followed by the payload.
/// Sends and receives block until the whole frame has crossed the
/// socket.
#[derive(Debug)]
pub struct Channel {
    stream: TcpStream,
}

impl Channel {
    /// Wrap an already-connected stream (used by tests and `accept`).
    pub fn new(stream: TcpStream) -> Self {
        Channel { stream }
    }

    /// Connect to a listening peer (garbler side).
    pub fn connect(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address)
            .map_err(|e| GabesError::Network(format!("could not connect to {address}: {e}")))?;
        Ok(Channel { stream })
    }

    /// Bind and accept a single peer connection (evaluator side).
    pub fn accept(address: &str) -> Result<Self> {
        let listener = TcpListener::bind(address)
            .map_err(|e| GabesError::Network(format!("could not bind {address}: {e}")))?;
        let (stream, _) = listener.accept()?;
        Ok(Channel { stream })
    }

    /// Send one message frame.
    pub fn send(&mut self, message: &Message) -> Result<()> {
        let payload = bincode::serde::encode_to_vec(message, bincode::config::standard())
            .map_err(|e| GabesError::Protocol(format!("could not encode frame: {e}")))?;
        self.write_frame(&payload)
    }

    /// Receive one message frame.
    pub fn receive(&mut self) -> Result<Message> {
        let payload = self.read_frame()?;
        if payload == [ACK_BYTE] {
            return Err(GabesError::Protocol(
                "received an ack while expecting a message".to_string(),
            ));
        }

        let (message, consumed): (Message, usize) =
            bincode::serde::decode_from_slice(&payload, bincode::config::standard())
                .map_err(|e| GabesError::Protocol(format!("could not decode frame: {e}")))?;
        if consumed != payload.len() {
            return Err(GabesError::Protocol(format!(
                "frame carries {} trailing bytes",
                payload.len() - consumed
            )));
        }
        Ok(message)
    }

    /// Send the one-byte acknowledgement.
    pub fn send_ack(&mut self) -> Result<()> {
        self.write_frame(&[ACK_BYTE])
    }

    /// Block until the peer's acknowledgement arrives.
    pub fn wait_for_ack(&mut self) -> Result<()> {
        let payload = self.read_frame()?;
        if payload != [ACK_BYTE] {
            return Err(GabesError::Protocol(format!(
                "expected an ack, received a {}-byte frame",
                payload.len()
            )));
        }
        Ok(())
    }

    fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        let length = u32::try_from(payload.len())
            .map_err(|_| GabesError::Protocol("frame too large".to_string()))?;
        self.stream.write_all(&length.to_be_bytes())?;
        self.stream.write_all(payload)?;
        self.stream.flush()?;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut length_bytes = [0u8; 4];
        self.stream.read_exact(&mut length_bytes)?;
        let length = u32::from_be_bytes(length_bytes) as usize;
        if length > MAX_FRAME_LEN {
            return Err(GabesError::Protocol(format!(
                "frame length {length} exceeds the {MAX_FRAME_LEN}-byte limit"
            )));
        }

        let mut payload = vec![0u8; length];
        self.stream.read_exact(&mut payload)?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn loopback_pair() -> (Channel, Channel) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        let client = thread::spawn(move || TcpStream::connect(address).unwrap());
        let (server_stream, _) = listener.accept().unwrap();
        (Channel::new(server_stream), Channel::new(client.join().unwrap()))
    }

    #[test]
    fn test_message_round_trip() {
        let (mut server, mut client) = loopback_pair();

        let message = Message::InputOrder {
            order: vec!["A".to_string(), "B".to_string()],
            garbler_ids: vec!["A".to_string()],
        };
        client.send(&message).unwrap();
        assert_eq!(server.receive().unwrap(), message);
    }

    #[test]
    fn test_ack_round_trip() {
        let (mut server, mut client) = loopback_pair();
        client.send_ack().unwrap();
        server.wait_for_ack().unwrap();
    }

    #[test]
    fn test_message_where_ack_expected_is_protocol_error() {
        let (mut server, mut client) = loopback_pair();
        client.send(&Message::Output(true)).unwrap();
        let result = server.wait_for_ack();
        assert!(matches!(result, Err(GabesError::Protocol(_))));
    }

    #[test]
    fn test_ack_where_message_expected_is_protocol_error() {
        let (mut server, mut client) = loopback_pair();
        client.send_ack().unwrap();
        let result = server.receive();
        assert!(matches!(result, Err(GabesError::Protocol(_))));
    }

    #[test]
    fn test_closed_socket_is_network_error() {
        let (mut server, client) = loopback_pair();
        drop(client);
        let result = server.receive();
        assert!(matches!(result, Err(GabesError::Network(_))));
    }
}
