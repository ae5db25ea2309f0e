//! # Structured Data Codec
//!
//! The ledger stores inline state as Plutus structured data serialized to
//! CBOR. Item heads, lengths and byte-string chunking come from
//! `ciborium-ll`; this module layers the [`PlutusData`] tree and its
//! ledger rules on top.
//!
//! ```text
//! cbor.rs    CodecError, CborReader and the encode_with helper
//! plutus.rs  PlutusData: Constr / Map / List / Int / Bytes and their CBOR rules
//! ```
//!
//! Decoding is strict about structure and lenient about length encoding:
//! definite and indefinite arrays, maps and byte strings are all accepted,
//! because different wallet libraries emit different forms of the same
//! value. Encoding always produces one canonical form.

pub mod cbor;
pub mod plutus;

pub use cbor::{encode_with, CborReader, CborWriter, CodecError};
pub use plutus::PlutusData;
