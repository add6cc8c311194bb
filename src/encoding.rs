//! Text encoding applied to outgoing payloads and incoming responses.
//!
//! Labels follow the WHATWG Encoding Standard (the same set browsers accept),
//! with a couple of spellings people commonly type on the command line.

use crate::error::ClientError;
use encoding_rs::{Encoding, REPLACEMENT, UTF_16BE, UTF_16LE, UTF_8};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Spellings that are not WHATWG labels but should still resolve.
const ALIASES: &[(&str, &str)] = &[
    ("latin-1", "latin1"),
    ("utf-16", "utf-16le"),
    ("cp949", "euc-kr"),
    ("uhc", "euc-kr"),
    ("ms949", "euc-kr"),
    ("cp932", "shift_jis"),
    ("ms932", "shift_jis"),
    ("cp936", "gbk"),
];

/// A resolved character encoding.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl TextEncoding {
    /// Look up an encoding by label, case-insensitively.
    ///
    /// WHATWG treats `ascii`, `latin1` and `iso-8859-1` as windows-1252, so
    /// those labels accept any windows-1252 text and decode 0x80..=0x9F as
    /// its printable characters rather than C1 controls. The Windows code
    /// page names `cp949`, `cp932` and `cp936` resolve to their WHATWG
    /// supersets (EUC-KR, Shift_JIS, GBK).
    pub fn from_label(label: &str) -> Result<Self, ClientError> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        let normalized = ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map(|(_, target)| target.to_string())
            .unwrap_or(normalized);

        match Encoding::for_label(normalized.as_bytes()) {
            // The replacement encoding only exists to neuter dangerous labels.
            Some(encoding) if encoding != REPLACEMENT => Ok(Self(encoding)),
            _ => Err(ClientError::UnknownEncoding(label.to_string())),
        }
    }

    /// Canonical name, e.g. `UTF-8` or `Shift_JIS`.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Encode text for the wire.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        if self.0 == UTF_16LE {
            return text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        }
        if self.0 == UTF_16BE {
            return text.encode_utf16().flat_map(u16::to_be_bytes).collect();
        }

        let (bytes, _, unmappable) = self.0.encode(text);
        if unmappable {
            warn!(
                "Payload contains characters not representable in {}; they were substituted",
                self.name()
            );
        }
        bytes.into_owned()
    }

    /// Decode bytes off the wire. Malformed sequences become U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, malformed) = self.0.decode_without_bom_handling(bytes);
        if malformed {
            debug!("Response is not valid {}; replaced malformed bytes", self.name());
        }
        text.into_owned()
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self(UTF_8)
    }
}

impl FromStr for TextEncoding {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextEncoding({})", self.name())
    }
}
