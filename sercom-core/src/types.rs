//! Shared types for serial configuration and buffer policies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(format!("invalid data bits {} (expected 5-8)", other)),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

/// Parity checking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(format!("invalid stop bits {} (expected 1 or 2)", other)),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

/// Encoding that outbound data must satisfy before it is queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// Only bytes in the 7-bit ASCII range are accepted
    #[default]
    Ascii,
    /// Any byte sequence is accepted
    Binary,
}

impl TextEncoding {
    /// Find the first byte that falls outside this encoding.
    ///
    /// Returns `(offset, byte)` of the offending byte, or `None` when the
    /// whole payload is acceptable.
    pub fn first_invalid(&self, data: &[u8]) -> Option<(usize, u8)> {
        match self {
            TextEncoding::Ascii => data
                .iter()
                .enumerate()
                .find(|(_, b)| !b.is_ascii())
                .map(|(i, &b)| (i, b)),
            TextEncoding::Binary => None,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Ascii => write!(f, "ascii"),
            TextEncoding::Binary => write!(f, "binary"),
        }
    }
}

/// What a receive pass does with bytes that nobody has claimed yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum InboundPolicy {
    /// Each read replaces any unclaimed chunk; earlier unread data is lost
    #[default]
    Overwrite,
    /// Reads accumulate; the oldest bytes are dropped once `max_len` is exceeded
    Append { max_len: usize },
}
