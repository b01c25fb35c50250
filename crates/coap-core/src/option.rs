//! CoAP options: ordered (number, value) pairs attached to a message.
//!
//! Order is part of the message: repeated numbers are legal, and every
//! lookup scans front to back so the first match wins. Builders copy
//! options in; nothing here holds a reference into another message.

use std::fmt;

use bytes::Bytes;

use crate::block::BlockInfo;

// ── Option numbers ───────────────────────────────────────────────────────────

/// Registered option numbers, plus the two vendor options used by the
/// device protocol (`START_OFFSET`, `EXTENDED_ERROR`).
pub mod number {
    pub const IF_MATCH: u16 = 1;
    pub const URI_HOST: u16 = 3;
    pub const ETAG: u16 = 4;
    pub const IF_NONE_MATCH: u16 = 5;
    pub const URI_PORT: u16 = 7;
    pub const LOCATION_PATH: u16 = 8;
    pub const URI_PATH: u16 = 11;
    pub const CONTENT_FORMAT: u16 = 12;
    pub const MAX_AGE: u16 = 14;
    pub const URI_QUERY: u16 = 15;
    pub const ACCEPT: u16 = 17;
    pub const LOCATION_QUERY: u16 = 20;
    pub const BLOCK2: u16 = 23;
    pub const BLOCK1: u16 = 27;
    pub const SIZE2: u16 = 28;
    pub const PROXY_URI: u16 = 35;
    pub const PROXY_SCHEME: u16 = 39;
    pub const SIZE1: u16 = 60;
    pub const START_OFFSET: u16 = 2048;
    pub const EXTENDED_ERROR: u16 = 2049;
}

// ── Values ───────────────────────────────────────────────────────────────────

/// The value carried by one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Empty,
    Uint(u32),
    String(String),
    Opaque(Bytes),
}

impl OptionValue {
    pub fn as_uint(&self) -> Option<u32> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&[u8]> {
        match self {
            Self::Opaque(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("<empty>"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Opaque(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

/// A single option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoapOption {
    pub number: u16,
    pub value: OptionValue,
}

impl CoapOption {
    pub fn new(number: u16, value: OptionValue) -> Self {
        Self { number, value }
    }

    pub fn empty(number: u16) -> Self {
        Self::new(number, OptionValue::Empty)
    }

    pub fn uint(number: u16, value: u32) -> Self {
        Self::new(number, OptionValue::Uint(value))
    }

    pub fn string(number: u16, value: impl Into<String>) -> Self {
        Self::new(number, OptionValue::String(value.into()))
    }

    pub fn opaque(number: u16, value: impl Into<Bytes>) -> Self {
        Self::new(number, OptionValue::Opaque(value.into()))
    }

    /// BLOCK1 option carrying the encoded form of `info`.
    pub fn block1(info: BlockInfo) -> Self {
        Self::uint(number::BLOCK1, info.encode())
    }

    /// BLOCK2 option carrying the encoded form of `info`.
    pub fn block2(info: BlockInfo) -> Self {
        Self::uint(number::BLOCK2, info.encode())
    }
}

// ── Option list ──────────────────────────────────────────────────────────────

/// Insertion-ordered option list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options(Vec<CoapOption>);

impl Options {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, option: CoapOption) {
        self.0.push(option);
    }

    /// First value with the given option number.
    pub fn find(&self, number: u16) -> Option<&OptionValue> {
        self.0
            .iter()
            .find(|option| option.number == number)
            .map(|option| &option.value)
    }

    /// Every value with the given option number, in order.
    pub fn find_all(&self, number: u16) -> impl Iterator<Item = &OptionValue> {
        self.0
            .iter()
            .filter(move |option| option.number == number)
            .map(|option| &option.value)
    }

    pub fn contains(&self, number: u16) -> bool {
        self.find(number).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CoapOption> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// URI_PATH segments joined with `/`, without a leading slash.
    pub fn uri_path(&self) -> String {
        self.find_all(number::URI_PATH)
            .filter_map(OptionValue::as_str)
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl FromIterator<CoapOption> for Options {
    fn from_iter<I: IntoIterator<Item = CoapOption>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<CoapOption> for Options {
    fn extend<I: IntoIterator<Item = CoapOption>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Options {
    type Item = &'a CoapOption;
    type IntoIter = std::slice::Iter<'a, CoapOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
