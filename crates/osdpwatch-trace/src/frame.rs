//! Captured frames and the decoder contract.
//!
//! The device I/O layer hands the trace pipeline a [`RawFrame`]: the bytes as
//! they appeared on the bus plus which side sent them. Turning those bytes
//! into a [`DecodedFrame`] is the job of an external [`FrameDecoder`]; this
//! crate never parses OSDP itself.

use bytes::Bytes;
use osdpwatch_core::FrameDirection;
use osdpwatch_core::constants::{
    OSDP_BROADCAST_ADDRESS, OSDP_CMD_POLL, OSDP_REPLY_ACK, OSDP_REPLY_ADDRESS_MASK, OSDP_REPLY_NAK,
};
use serde::Serialize;

/// Which side of the bus emitted a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureSource {
    /// The control panel (ACU).
    ControlPanel,
    /// A peripheral reader (PD).
    Reader,
}

impl CaptureSource {
    /// Direction of the frame relative to the panel.
    #[must_use]
    pub fn direction(self) -> FrameDirection {
        match self {
            CaptureSource::ControlPanel => FrameDirection::Outbound,
            CaptureSource::Reader => FrameDirection::Inbound,
        }
    }
}

/// Bytes captured from the bus, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub bytes: Bytes,
    pub source: CaptureSource,
}

impl RawFrame {
    pub fn new(bytes: impl Into<Bytes>, source: CaptureSource) -> Self {
        Self {
            bytes: bytes.into(),
            source,
        }
    }

    /// Frame sent by the control panel.
    pub fn outbound(bytes: impl Into<Bytes>) -> Self {
        Self::new(bytes, CaptureSource::ControlPanel)
    }

    /// Frame sent by a reader.
    pub fn inbound(bytes: impl Into<Bytes>) -> Self {
        Self::new(bytes, CaptureSource::Reader)
    }

    #[must_use]
    pub fn direction(&self) -> FrameDirection {
        self.source.direction()
    }
}

/// Structured frame produced by a [`FrameDecoder`].
///
/// Treated as an opaque value by the pipeline apart from the header fields
/// needed for filtering and security classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedFrame {
    /// Address byte as seen on the wire (reply bit included).
    pub address: u8,

    /// Sequence number (0-3).
    pub sequence: u8,

    /// Command or reply code.
    pub code: u8,

    /// Human-readable code name, e.g. `osdp_POLL`.
    pub name: String,

    /// Decoded data block.
    #[serde(serialize_with = "serialize_hex")]
    pub payload: Bytes,

    /// Frame carried a secure channel block.
    pub is_secure: bool,

    /// Secure channel was established with the default base key.
    pub uses_default_key: bool,

    /// Raw bytes as captured, when raw capture is enabled.
    #[serde(serialize_with = "serialize_hex_opt")]
    pub raw: Option<Bytes>,
}

impl DecodedFrame {
    pub fn new(address: u8, sequence: u8, code: u8, name: impl Into<String>) -> Self {
        Self {
            address,
            sequence,
            code,
            name: name.into(),
            payload: Bytes::new(),
            is_secure: false,
            uses_default_key: false,
            raw: None,
        }
    }

    /// Set the data block.
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Mark the frame as secure channel traffic.
    pub fn with_secure_channel(mut self, uses_default_key: bool) -> Self {
        self.is_secure = true;
        self.uses_default_key = uses_default_key;
        self
    }

    /// Attach the raw captured bytes.
    pub fn with_raw(mut self, raw: impl Into<Bytes>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// Reader address with the reply bit stripped.
    #[must_use]
    pub fn reader_address(&self) -> u8 {
        self.address & !OSDP_REPLY_ADDRESS_MASK
    }

    /// Sent by the panel to every reader on the bus.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.reader_address() == OSDP_BROADCAST_ADDRESS
    }

    #[must_use]
    pub fn is_poll(&self) -> bool {
        self.code == OSDP_CMD_POLL
    }

    #[must_use]
    pub fn is_ack(&self) -> bool {
        self.code == OSDP_REPLY_ACK
    }

    #[must_use]
    pub fn is_nak(&self) -> bool {
        self.code == OSDP_REPLY_NAK
    }
}

/// Decoder for raw OSDP frames.
///
/// Implementations must return `None` for anything they cannot decode and
/// must never panic on malformed input: the capture path relies on it.
pub trait FrameDecoder: Send + Sync {
    fn try_decode(&self, raw: &[u8]) -> Option<DecodedFrame>;
}

impl<F> FrameDecoder for F
where
    F: Fn(&[u8]) -> Option<DecodedFrame> + Send + Sync,
{
    fn try_decode(&self, raw: &[u8]) -> Option<DecodedFrame> {
        self(raw)
    }
}

/// Format bytes as space separated upper-case hex.
pub(crate) fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn serialize_hex<S: serde::Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex_string(bytes))
}

fn serialize_hex_opt<S: serde::Serializer>(
    bytes: &Option<Bytes>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(b) => serializer.serialize_some(&hex_string(b)),
        None => serializer.serialize_none(),
    }
}
