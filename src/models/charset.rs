use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::MultipartError;

/// Character encodings a string part can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Charset {
    /// UTF-8
    #[serde(rename = "UTF-8")]
    Utf8,
    /// 7-bit ASCII
    #[serde(rename = "US-ASCII")]
    UsAscii,
    /// Latin-1
    #[serde(rename = "ISO-8859-1")]
    Iso8859_1,
    /// UTF-16, big endian, no byte order mark
    #[serde(rename = "UTF-16BE")]
    Utf16Be,
    /// UTF-16, little endian, no byte order mark
    #[serde(rename = "UTF-16LE")]
    Utf16Le,
}

impl Charset {
    /// The label emitted in a `charset=` parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::UsAscii => "US-ASCII",
            Self::Iso8859_1 => "ISO-8859-1",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf16Le => "UTF-16LE",
        }
    }

    /// Encodes `value` into bytes.
    ///
    /// Characters outside a single-byte charset are replaced with `?`.
    pub fn encode(&self, value: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => value.as_bytes().to_vec(),
            Self::UsAscii => value
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            Self::Iso8859_1 => value
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
            Self::Utf16Be => value.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Self::Utf16Le => value.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = MultipartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "us-ascii" | "ascii" => Ok(Self::UsAscii),
            "iso-8859-1" | "latin1" | "iso_8859_1" => Ok(Self::Iso8859_1),
            "utf-16be" => Ok(Self::Utf16Be),
            "utf-16le" => Ok(Self::Utf16Le),
            _ => Err(MultipartError::UnsupportedCharset(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_per_charset() {
        assert_eq!(Charset::Utf8.encode("héllo"), "héllo".as_bytes());
        assert_eq!(Charset::UsAscii.encode("héllo"), b"h?llo");
        assert_eq!(Charset::Iso8859_1.encode("héllo€"), b"h\xe9llo?");
        assert_eq!(Charset::Utf16Be.encode("A"), [0x00u8, 0x41]);
        assert_eq!(Charset::Utf16Le.encode("A"), [0x41u8, 0x00]);
    }

    #[test]
    fn parses_labels_and_aliases() {
        assert_eq!("UTF-8".parse::<Charset>().unwrap(), Charset::Utf8);
        assert_eq!("utf8".parse::<Charset>().unwrap(), Charset::Utf8);
        assert_eq!("Latin1".parse::<Charset>().unwrap(), Charset::Iso8859_1);
        assert!(matches!(
            "koi8-r".parse::<Charset>(),
            Err(MultipartError::UnsupportedCharset(_))
        ));
    }
}
