//! CBOR plumbing over `ciborium-ll`.
//!
//! `ciborium-ll` handles item heads, shortest-form lengths, indefinite
//! items and chunked byte strings. This module adds the error type the
//! rest of the codec speaks and a reader that tracks offsets, rejects
//! trailing input and refuses the item kinds Plutus data never uses
//! (text, floats, simple values).

use ciborium_ll::{Decoder, Encoder, Header};
use std::io;
use thiserror::Error;

/// Writer used by every encoder in the crate.
pub type CborWriter<'w> = Encoder<&'w mut Vec<u8>>;

/// Errors produced while reading or writing CBOR.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("invalid CBOR at offset {offset}")]
    Syntax { offset: usize },

    #[error("unsupported CBOR item ({item}) at offset {offset}")]
    UnsupportedItem { item: &'static str, offset: usize },

    #[error("expected {expected} at offset {offset}")]
    UnexpectedItem {
        expected: &'static str,
        offset: usize,
    },

    #[error("unsupported CBOR tag {0}")]
    UnsupportedTag(u64),

    #[error("integer does not fit the supported range")]
    IntegerOutOfRange,

    #[error("nesting deeper than {0} levels")]
    DepthExceeded(usize),

    #[error("{remaining} trailing bytes after the top-level item")]
    TrailingBytes { remaining: usize },

    #[error("CBOR i/o: {0}")]
    Io(String),
}

impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => CodecError::UnexpectedEof,
            _ => CodecError::Io(err.to_string()),
        }
    }
}

impl From<ciborium_ll::Error<io::Error>> for CodecError {
    fn from(err: ciborium_ll::Error<io::Error>) -> Self {
        match err {
            ciborium_ll::Error::Io(e) => e.into(),
            ciborium_ll::Error::Syntax(offset) => CodecError::Syntax { offset },
        }
    }
}

/// Runs `write` against a fresh buffer and returns the bytes it produced.
pub fn encode_with<F>(write: F) -> Result<Vec<u8>, CodecError>
where
    F: FnOnce(&mut CborWriter<'_>) -> Result<(), io::Error>,
{
    let mut buf = Vec::new();
    {
        let mut encoder = Encoder::from(&mut buf);
        write(&mut encoder)?;
    }
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Pull-style reader over one complete CBOR item.
pub struct CborReader<'a> {
    decoder: Decoder<&'a [u8]>,
    len: usize,
}

impl<'a> CborReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            decoder: Decoder::from(data),
            len: data.len(),
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&mut self) -> usize {
        self.decoder.offset()
    }

    /// Next item head. Text, floats and simple values are refused here so
    /// callers only ever match on the kinds Plutus data can contain.
    pub fn pull(&mut self) -> Result<Header, CodecError> {
        let offset = self.offset();
        let header = self.decoder.pull()?;
        let unsupported = match header {
            Header::Text(_) => "text string",
            Header::Float(_) => "float",
            Header::Simple(_) => "simple value",
            _ => return Ok(header),
        };
        Err(CodecError::UnsupportedItem {
            item: unsupported,
            offset,
        })
    }

    /// Payload of a byte string whose head was just pulled. Indefinite
    /// strings are reassembled from their chunks.
    pub fn bytes_body(&mut self, len: Option<usize>) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        let mut buffer = [0u8; 256];
        let mut segments = self.decoder.bytes(len);
        while let Some(mut segment) = segments.pull()? {
            while let Some(chunk) = segment.pull(&mut buffer)? {
                out.extend_from_slice(chunk);
            }
        }
        Ok(out)
    }

    /// Reads an unsigned integer.
    pub fn unsigned(&mut self) -> Result<u64, CodecError> {
        let offset = self.offset();
        match self.pull()? {
            Header::Positive(value) => Ok(value),
            _ => Err(CodecError::UnexpectedItem {
                expected: "unsigned integer",
                offset,
            }),
        }
    }

    /// Reads a byte string, definite or chunked.
    pub fn bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let offset = self.offset();
        match self.pull()? {
            Header::Bytes(len) => self.bytes_body(len),
            _ => Err(CodecError::UnexpectedItem {
                expected: "byte string",
                offset,
            }),
        }
    }

    /// Fails unless every input byte has been consumed.
    pub fn finish(mut self) -> Result<(), CodecError> {
        let remaining = self.len.saturating_sub(self.offset());
        if remaining == 0 {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes { remaining })
        }
    }
}
