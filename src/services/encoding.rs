//! Text encoding used for everything crossing the process boundary.
//!
//! A bridge uses exactly one encoding, chosen by label from configuration
//! (`utf8`, `cp866`, `windows-1251`, ...). Decoding never fails: malformed
//! input is replaced with U+FFFD so a flush can always complete.

use std::borrow::Cow;
use std::fmt;

use encoding_rs::Encoding;

/// A configured charset, resolved from its WHATWG label.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding {
    encoding: &'static Encoding,
}

impl fmt::Debug for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextEncoding")
            .field(&self.encoding.name())
            .finish()
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

impl TextEncoding {
    pub fn utf8() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
        }
    }

    /// Resolve an encoding label such as `"utf8"` or `"cp866"`.
    ///
    /// Labels are matched case-insensitively with surrounding whitespace
    /// ignored. Returns `None` for unknown labels.
    pub fn for_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes()).map(|encoding| Self { encoding })
    }

    /// Canonical name (e.g. `UTF-8`, `IBM866`)
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Decode bytes, substituting U+FFFD for malformed sequences.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let (text, had_errors) = self.encoding.decode_without_bom_handling(bytes);
        if had_errors {
            tracing::trace!(
                "Replaced malformed {} input while decoding {} bytes",
                self.name(),
                bytes.len()
            );
        }
        text
    }

    /// Encode text for the process input stream.
    ///
    /// Characters the encoding cannot represent become numeric character
    /// references.
    pub fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        let (bytes, _, had_unmappable) = self.encoding.encode(text);
        if had_unmappable {
            tracing::debug!("Input contains characters not representable in {}", self.name());
        }
        bytes
    }
}
