//! Byte/text encodings for process input and captured output.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize, Serializer};

use super::error::ConfigError;

/// Encodings accepted for input text and requested for captured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Raw bytes, no decoding.
    Buffer,
    /// 7-bit ASCII; the high bit of every byte is dropped.
    Ascii,
    /// UTF-8; invalid sequences are replaced.
    #[default]
    Utf8,
    /// Little-endian UTF-16.
    Utf16le,
    /// Alias of little-endian UTF-16.
    Ucs2,
    /// Standard base64 with padding.
    Base64,
    /// Latin-1: one byte per character.
    #[serde(alias = "latin1")]
    Binary,
    /// Lowercase hexadecimal.
    Hex,
}

impl Encoding {
    /// Every supported encoding.
    pub const ALL: [Self; 8] = [
        Self::Buffer,
        Self::Ascii,
        Self::Utf8,
        Self::Utf16le,
        Self::Ucs2,
        Self::Base64,
        Self::Binary,
        Self::Hex,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buffer => "buffer",
            Self::Ascii => "ascii",
            Self::Utf8 => "utf8",
            Self::Utf16le => "utf16le",
            Self::Ucs2 => "ucs2",
            Self::Base64 => "base64",
            Self::Binary => "binary",
            Self::Hex => "hex",
        }
    }

    /// Decode captured bytes into the representation requested by the caller.
    #[must_use]
    pub fn decode(self, bytes: Vec<u8>) -> CapturedOutput {
        let text = match self {
            Self::Buffer => return CapturedOutput::Bytes(bytes.into()),
            Self::Utf8 => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            },
            Self::Ascii => bytes.iter().map(|b| char::from(b & 0x7f)).collect(),
            Self::Binary => bytes.iter().map(|&b| char::from(b)).collect(),
            Self::Utf16le | Self::Ucs2 => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            Self::Base64 => base64::engine::general_purpose::STANDARD.encode(&bytes),
            Self::Hex => hex::encode(&bytes),
        };
        CapturedOutput::Text(text.into())
    }

    /// Encode caller-supplied text into the bytes written to standard input.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidInput`] for `buffer` (bytes must be passed
    /// directly) and for malformed base64/hex text.
    pub fn encode(self, text: &str) -> Result<Vec<u8>, ConfigError> {
        match self {
            Self::Buffer => Err(ConfigError::InvalidInput(
                "input must be passed as bytes when its encoding is 'buffer'".into(),
            )),
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            // Latin-1 style: keep the low byte of every code point.
            #[allow(clippy::cast_possible_truncation)]
            Self::Ascii | Self::Binary => Ok(text.chars().map(|c| (u32::from(c) & 0xff) as u8).collect()),
            Self::Utf16le | Self::Ucs2 => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            Self::Base64 => base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|e| ConfigError::InvalidInput(format!("bad base64 input: {e}"))),
            Self::Hex => hex::decode(text.trim())
                .map_err(|e| ConfigError::InvalidInput(format!("bad hex input: {e}"))),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if name == "latin1" {
            return Ok(Self::Binary);
        }
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownEncoding(s.to_string()))
    }
}

/// Captured stream contents after decoding.
///
/// Clones share the same allocation, so every caller attached to one execution
/// sees the very same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedOutput {
    /// Undecoded bytes (`buffer` encoding).
    Bytes(Arc<[u8]>),
    /// Decoded text (every other encoding).
    Text(Arc<str>),
}

impl CapturedOutput {
    /// Text contents, or `None` for raw bytes.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }

    /// Underlying bytes of either representation.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Text(text) => text.as_bytes(),
        }
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// True when nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl Serialize for CapturedOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Bytes(bytes) => serializer.serialize_bytes(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_encodings() {
        let bytes = b"hi\xff".to_vec();
        assert_eq!(Encoding::Hex.decode(bytes.clone()).as_text(), Some("6869ff"));
        assert_eq!(Encoding::Base64.decode(b"hello".to_vec()).as_text(), Some("aGVsbG8="));
        assert_eq!(Encoding::Binary.decode(bytes.clone()).as_text(), Some("hi\u{ff}"));
        assert_eq!(Encoding::Ascii.decode(bytes.clone()).as_text(), Some("hi\u{7f}"));
        assert_eq!(Encoding::Utf8.decode(bytes).as_text(), Some("hi\u{fffd}"));
        assert_eq!(Encoding::Utf16le.decode(vec![0x68, 0x00, 0x69, 0x00]).as_text(), Some("hi"));
    }

    #[test]
    fn test_buffer_keeps_raw_bytes() {
        let out = Encoding::Buffer.decode(vec![0, 1, 2]);
        assert_eq!(out.as_text(), None);
        assert_eq!(out.as_bytes(), &[0, 1, 2]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_encode_input_text() {
        assert_eq!(Encoding::Utf8.encode("aé").unwrap(), "aé".as_bytes());
        assert_eq!(Encoding::Binary.encode("aé").unwrap(), vec![0x61, 0xe9]);
        assert_eq!(Encoding::Hex.encode("6869").unwrap(), b"hi");
        assert_eq!(Encoding::Base64.encode("aGk=").unwrap(), b"hi");
        assert_eq!(Encoding::Ucs2.encode("hi").unwrap(), vec![0x68, 0x00, 0x69, 0x00]);
        assert!(matches!(Encoding::Hex.encode("zz"), Err(ConfigError::InvalidInput(_))));
        assert!(matches!(Encoding::Buffer.encode("x"), Err(ConfigError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_encoding_names() {
        assert_eq!("UTF8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("latin1".parse::<Encoding>().unwrap(), Encoding::Binary);
        assert!(matches!(
            "ebcdic".parse::<Encoding>(),
            Err(ConfigError::UnknownEncoding(name)) if name == "ebcdic"
        ));
    }
}
