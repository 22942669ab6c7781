use crate::{Result, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reader identifier.
///
/// Readers are keyed by a UUID assigned when they are registered with the
/// panel. The identifier is stable across restarts and reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReaderId(Uuid);

impl ReaderId {
    /// Generate a fresh random reader ID.
    #[must_use]
    pub fn new() -> Self {
        ReaderId(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        ReaderId(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReaderId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ReaderId {
    fn from(id: Uuid) -> Self {
        ReaderId(id)
    }
}

impl fmt::Display for ReaderId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ReaderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(ReaderId)
            .map_err(|_| Error::InvalidReaderId(s.to_string()))
    }
}

/// Direction of a captured frame relative to the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameDirection {
    /// Command sent by the panel to a reader.
    Outbound,
    /// Reply sent by a reader to the panel.
    Inbound,
}

impl FrameDirection {
    /// Returns `true` for panel-to-reader frames.
    #[inline]
    #[must_use]
    pub fn is_outbound(self) -> bool {
        matches!(self, FrameDirection::Outbound)
    }

    /// Returns `true` for reader-to-panel frames.
    #[inline]
    #[must_use]
    pub fn is_inbound(self) -> bool {
        matches!(self, FrameDirection::Inbound)
    }

    /// Short label used in text reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FrameDirection::Outbound => "TX",
            FrameDirection::Inbound => "RX",
        }
    }
}

impl fmt::Display for FrameDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FrameDirection::Outbound => write!(f, "Outbound"),
            FrameDirection::Inbound => write!(f, "Inbound"),
        }
    }
}

/// Security classification of a captured frame.
///
/// Readers that are still on the well-known default secure channel base key
/// are flagged separately, since that key offers no real protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityClassification {
    ClearText,
    SecureDefaultKey,
    SecureCustomKey,
}

impl SecurityClassification {
    /// Derive the classification from a frame's secure channel flags.
    ///
    /// `uses_default_key` is ignored for clear-text frames.
    #[must_use]
    pub fn from_flags(is_secure: bool, uses_default_key: bool) -> Self {
        match (is_secure, uses_default_key) {
            (false, _) => SecurityClassification::ClearText,
            (true, true) => SecurityClassification::SecureDefaultKey,
            (true, false) => SecurityClassification::SecureCustomKey,
        }
    }

    /// Returns `true` if the frame travelled over a secure channel.
    #[inline]
    #[must_use]
    pub fn is_secure(self) -> bool {
        !matches!(self, SecurityClassification::ClearText)
    }
}

impl fmt::Display for SecurityClassification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SecurityClassification::ClearText => write!(f, "clear-text"),
            SecurityClassification::SecureDefaultKey => write!(f, "secure (default key)"),
            SecurityClassification::SecureCustomKey => write!(f, "secure (custom key)"),
        }
    }
}

/// Reader LED colors as defined by the OSDP `osdp_LED` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedColor {
    /// LED off.
    #[default]
    Off,
    Red,
    Green,
    Amber,
    Blue,
    Magenta,
    Cyan,
    White,
}
