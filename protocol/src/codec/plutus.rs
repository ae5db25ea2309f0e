//! # Plutus Structured Data
//!
//! The ledger's native representation of inline datums and redeemers. A
//! [`PlutusData`] value is one of five shapes; its CBOR form follows the
//! ledger rules:
//!
//! | Shape | CBOR |
//! |-------|------|
//! | `Constr` 0–6 | tag 121–127 wrapping the field list |
//! | `Constr` 7–127 | tag 1280–1400 wrapping the field list |
//! | `Constr` other | tag 102 wrapping `[alternative, fields]` |
//! | `Map` | definite map |
//! | `List` | `[]` when empty, indefinite array otherwise |
//! | `Int` | major 0/1, or bignum tags 2/3 beyond 64 bits |
//! | `Bytes` | definite up to 64 bytes, 64-byte chunks beyond |
//!
//! Non-empty lists are written indefinite-length because that is what the
//! common wallet libraries emit; datums produced here hash the same as
//! datums produced there.

use ciborium_ll::Header;
use serde::{Deserialize, Serialize};
use std::io;

use super::cbor::{encode_with, CborReader, CborWriter, CodecError};
use crate::config::{MAX_DATA_DEPTH, PLUTUS_BYTES_CHUNK};

const TAG_BIGNUM_POSITIVE: u64 = 2;
const TAG_BIGNUM_NEGATIVE: u64 = 3;
const TAG_CONSTR_GENERAL: u64 = 102;
const TAG_CONSTR_SMALL_BASE: u64 = 121;
const TAG_CONSTR_MEDIUM_BASE: u64 = 1280;

/// A Plutus structured data value.
///
/// Integers are held as `i128`: wide enough for any ledger quantity and for
/// its negation. Bignums beyond that range are rejected on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlutusData {
    Constr {
        alternative: u64,
        fields: Vec<PlutusData>,
    },
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Int(i128),
    Bytes(Vec<u8>),
}

impl PlutusData {
    /// Shorthand for a constructor value.
    pub fn constr(alternative: u64, fields: Vec<PlutusData>) -> Self {
        PlutusData::Constr {
            alternative,
            fields,
        }
    }

    /// Unsigned integer value.
    pub fn uint(value: u64) -> Self {
        PlutusData::Int(value as i128)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PlutusData::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            PlutusData::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PlutusData::Constr { .. } => "constr",
            PlutusData::Map(_) => "map",
            PlutusData::List(_) => "list",
            PlutusData::Int(_) => "int",
            PlutusData::Bytes(_) => "bytes",
        }
    }

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    /// Serialize to CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>, CodecError> {
        encode_with(|enc| self.encode_into(enc))
    }

    /// Hex of [`to_cbor`](Self::to_cbor), the form wallets and explorers show.
    pub fn to_cbor_hex(&self) -> Result<String, CodecError> {
        Ok(hex::encode(self.to_cbor()?))
    }

    fn encode_into(&self, enc: &mut CborWriter<'_>) -> io::Result<()> {
        match self {
            PlutusData::Constr {
                alternative,
                fields,
            } => {
                match *alternative {
                    0..=6 => enc.push(Header::Tag(TAG_CONSTR_SMALL_BASE + alternative))?,
                    7..=127 => enc.push(Header::Tag(TAG_CONSTR_MEDIUM_BASE + alternative - 7))?,
                    _ => {
                        enc.push(Header::Tag(TAG_CONSTR_GENERAL))?;
                        enc.push(Header::Array(Some(2)))?;
                        enc.push(Header::Positive(*alternative))?;
                    }
                }
                encode_list(enc, fields)
            }
            PlutusData::Map(entries) => {
                enc.push(Header::Map(Some(entries.len())))?;
                for (key, value) in entries {
                    key.encode_into(enc)?;
                    value.encode_into(enc)?;
                }
                Ok(())
            }
            PlutusData::List(items) => encode_list(enc, items),
            PlutusData::Int(value) => encode_int(enc, *value),
            PlutusData::Bytes(bytes) => enc.bytes(bytes, Some(PLUTUS_BYTES_CHUNK)),
        }
    }

    // -----------------------------------------------------------------------
    // Decoding
    // -----------------------------------------------------------------------

    /// Parse a complete CBOR item. Trailing bytes are an error.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = CborReader::new(bytes);
        let header = reader.pull()?;
        let value = Self::decode_item(&mut reader, header, 0)?;
        reader.finish()?;
        Ok(value)
    }

    /// Parse hex-encoded CBOR.
    pub fn from_cbor_hex(hex_str: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| CodecError::UnexpectedItem {
            expected: "hex-encoded CBOR",
            offset: 0,
        })?;
        Self::from_cbor(&bytes)
    }

    fn decode_item(
        reader: &mut CborReader<'_>,
        header: Header,
        depth: usize,
    ) -> Result<Self, CodecError> {
        if depth > MAX_DATA_DEPTH {
            return Err(CodecError::DepthExceeded(MAX_DATA_DEPTH));
        }

        match header {
            Header::Positive(value) => Ok(PlutusData::Int(value as i128)),
            Header::Negative(value) => Ok(PlutusData::Int(-1 - value as i128)),
            Header::Bytes(len) => Ok(PlutusData::Bytes(reader.bytes_body(len)?)),
            Header::Array(len) => Ok(PlutusData::List(decode_list_body(reader, len, depth)?)),
            Header::Map(len) => {
                let mut entries = Vec::new();
                let mut read = 0usize;
                loop {
                    if len == Some(read) {
                        break;
                    }
                    let key_header = reader.pull()?;
                    if key_header == Header::Break && len.is_none() {
                        break;
                    }
                    let key = Self::decode_item(reader, key_header, depth + 1)?;
                    let value_header = reader.pull()?;
                    let value = Self::decode_item(reader, value_header, depth + 1)?;
                    entries.push((key, value));
                    read += 1;
                }
                Ok(PlutusData::Map(entries))
            }
            Header::Tag(tag) => decode_tagged(reader, tag, depth),
            _ => {
                let offset = reader.offset();
                Err(CodecError::UnexpectedItem {
                    expected: "plutus data item",
                    offset,
                })
            }
        }
    }
}

fn encode_list(enc: &mut CborWriter<'_>, items: &[PlutusData]) -> io::Result<()> {
    if items.is_empty() {
        return enc.push(Header::Array(Some(0)));
    }
    enc.push(Header::Array(None))?;
    for item in items {
        item.encode_into(enc)?;
    }
    enc.push(Header::Break)
}

fn encode_int(enc: &mut CborWriter<'_>, value: i128) -> io::Result<()> {
    if value >= 0 {
        match u64::try_from(value) {
            Ok(small) => enc.push(Header::Positive(small)),
            Err(_) => {
                enc.push(Header::Tag(TAG_BIGNUM_POSITIVE))?;
                enc.bytes(&minimal_be_bytes(value as u128), Some(PLUTUS_BYTES_CHUNK))
            }
        }
    } else {
        // CBOR negatives carry `-1 - value`, which is non-negative here.
        let magnitude = (-1 - value) as u128;
        match u64::try_from(magnitude) {
            Ok(small) => enc.push(Header::Negative(small)),
            Err(_) => {
                enc.push(Header::Tag(TAG_BIGNUM_NEGATIVE))?;
                enc.bytes(&minimal_be_bytes(magnitude), Some(PLUTUS_BYTES_CHUNK))
            }
        }
    }
}

fn minimal_be_bytes(value: u128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

fn decode_list_body(
    reader: &mut CborReader<'_>,
    len: Option<usize>,
    depth: usize,
) -> Result<Vec<PlutusData>, CodecError> {
    let mut items = Vec::new();
    loop {
        if len == Some(items.len()) {
            break;
        }
        let header = reader.pull()?;
        if header == Header::Break && len.is_none() {
            break;
        }
        items.push(PlutusData::decode_item(reader, header, depth + 1)?);
    }
    Ok(items)
}

fn decode_fields(reader: &mut CborReader<'_>, depth: usize) -> Result<Vec<PlutusData>, CodecError> {
    let offset = reader.offset();
    match reader.pull()? {
        Header::Array(len) => decode_list_body(reader, len, depth),
        _ => Err(CodecError::UnexpectedItem {
            expected: "constructor field list",
            offset,
        }),
    }
}

fn decode_tagged(
    reader: &mut CborReader<'_>,
    tag: u64,
    depth: usize,
) -> Result<PlutusData, CodecError> {
    match tag {
        121..=127 => Ok(PlutusData::Constr {
            alternative: tag - TAG_CONSTR_SMALL_BASE,
            fields: decode_fields(reader, depth + 1)?,
        }),
        1280..=1400 => Ok(PlutusData::Constr {
            alternative: tag - TAG_CONSTR_MEDIUM_BASE + 7,
            fields: decode_fields(reader, depth + 1)?,
        }),
        TAG_CONSTR_GENERAL => {
            let offset = reader.offset();
            if reader.pull()? != Header::Array(Some(2)) {
                return Err(CodecError::UnexpectedItem {
                    expected: "[alternative, fields] pair",
                    offset,
                });
            }
            let alternative = reader.unsigned()?;
            let fields = decode_fields(reader, depth + 1)?;
            Ok(PlutusData::Constr {
                alternative,
                fields,
            })
        }
        TAG_BIGNUM_POSITIVE | TAG_BIGNUM_NEGATIVE => {
            let magnitude = reader.bytes()?;
            let significant: Vec<u8> = magnitude.into_iter().skip_while(|b| *b == 0).collect();
            if significant.len() > 16 {
                return Err(CodecError::IntegerOutOfRange);
            }
            let mut buf = [0u8; 16];
            buf[16 - significant.len()..].copy_from_slice(&significant);
            let unsigned = u128::from_be_bytes(buf);
            let value = i128::try_from(unsigned).map_err(|_| CodecError::IntegerOutOfRange)?;
            if tag == TAG_BIGNUM_POSITIVE {
                Ok(PlutusData::Int(value))
            } else {
                Ok(PlutusData::Int(-1 - value))
            }
        }
        other => Err(CodecError::UnsupportedTag(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_constr_zero_encodes_as_tag_121_empty_array() {
        let data = PlutusData::constr(0, vec![]);
        assert_eq!(data.to_cbor_hex().unwrap(), "d87980");
    }

    #[test]
    fn constr_with_fields_uses_indefinite_list() {
        let data = PlutusData::constr(1, vec![PlutusData::uint(1), PlutusData::Bytes(vec![0xab])]);
        assert_eq!(data.to_cbor_hex().unwrap(), "d87a9f0141abff");
    }

    #[test]
    fn medium_and_general_constructor_tags() {
        assert_eq!(PlutusData::constr(7, vec![]).to_cbor_hex().unwrap(), "d9050080");
        assert_eq!(PlutusData::constr(127, vec![]).to_cbor_hex().unwrap(), "d9057880");
        assert_eq!(
            PlutusData::constr(128, vec![]).to_cbor_hex().unwrap(),
            "d86682188080"
        );
        for alt in [0u64, 6, 7, 127, 128, 1000] {
            let data = PlutusData::constr(alt, vec![PlutusData::uint(alt)]);
            assert_eq!(PlutusData::from_cbor(&data.to_cbor().unwrap()).unwrap(), data);
        }
    }

    #[test]
    fn negative_and_big_integers() {
        assert_eq!(PlutusData::Int(-1).to_cbor_hex().unwrap(), "20");
        let big = PlutusData::Int(u64::MAX as i128 + 1);
        assert_eq!(big.to_cbor_hex().unwrap(), "c249010000000000000000");
        assert_eq!(PlutusData::from_cbor(&big.to_cbor().unwrap()).unwrap(), big);

        let very_negative = PlutusData::Int(-(u64::MAX as i128) - 2);
        assert_eq!(
            PlutusData::from_cbor(&very_negative.to_cbor().unwrap()).unwrap(),
            very_negative
        );
    }

    #[test]
    fn long_bytes_are_chunked() {
        let data = PlutusData::Bytes(vec![0x11; 100]);
        let cbor = data.to_cbor().unwrap();
        assert_eq!(cbor[0], 0x5f);
        assert_eq!(*cbor.last().unwrap(), 0xff);
        assert_eq!(PlutusData::from_cbor(&cbor).unwrap(), data);
    }

    #[test]
    fn definite_lists_decode_like_indefinite_ones() {
        // d8799f0102ff and d879820102 both mean Constr 0 [1, 2].
        let indefinite = PlutusData::from_cbor_hex("d8799f0102ff").unwrap();
        let definite = PlutusData::from_cbor_hex("d879820102").unwrap();
        assert_eq!(indefinite, definite);
    }

    #[test]
    fn maps_roundtrip() {
        let data = PlutusData::Map(vec![(
            PlutusData::Bytes(b"k".to_vec()),
            PlutusData::List(vec![PlutusData::Int(5)]),
        )]);
        assert_eq!(PlutusData::from_cbor(&data.to_cbor().unwrap()).unwrap(), data);
    }

    #[test]
    fn oversized_bignum_is_rejected() {
        // Tag 2 with 17 significant bytes.
        let mut cbor = vec![0xc2, 0x51];
        cbor.extend_from_slice(&[0xff; 17]);
        assert_eq!(
            PlutusData::from_cbor(&cbor),
            Err(CodecError::IntegerOutOfRange)
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(
            PlutusData::from_cbor_hex("d81e00"),
            Err(CodecError::UnsupportedTag(30))
        );
    }

    #[test]
    fn constructor_without_list_is_rejected() {
        assert!(matches!(
            PlutusData::from_cbor_hex("d87901"),
            Err(CodecError::UnexpectedItem { .. })
        ));
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let mut cbor = vec![0x81; MAX_DATA_DEPTH + 2];
        cbor.push(0x00);
        assert_eq!(
            PlutusData::from_cbor(&cbor),
            Err(CodecError::DepthExceeded(MAX_DATA_DEPTH))
        );
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(matches!(
            PlutusData::from_cbor_hex("d8798000"),
            Err(CodecError::TrailingBytes { remaining: 1 })
        ));
    }

    #[test]
    fn encoding_reads_back_as_generic_cbor() {
        use ciborium::value::Value;

        let data = PlutusData::constr(
            0,
            vec![
                PlutusData::Bytes(vec![0x1a; 28]),
                PlutusData::uint(1000),
                PlutusData::Int(-5),
            ],
        );
        let bytes = data.to_cbor().unwrap();
        let value: Value = ciborium::from_reader(bytes.as_slice()).unwrap();
        let Value::Tag(121, inner) = value else {
            panic!("expected tag 121, got {:?}", value);
        };
        let Value::Array(items) = *inner else {
            panic!("expected an array under the tag");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Value::Bytes(vec![0x1a; 28]));
        assert_eq!(items[1], Value::Integer(1000.into()));
        assert_eq!(items[2], Value::Integer((-5).into()));
    }

    #[test]
    fn definite_arrays_from_other_encoders_decode() {
        use ciborium::value::Value;

        let value = Value::Tag(
            122,
            Box::new(Value::Array(vec![
                Value::Integer(7.into()),
                Value::Bytes(b"nft1".to_vec()),
            ])),
        );
        let mut bytes = Vec::new();
        ciborium::into_writer(&value, &mut bytes).unwrap();
        assert_eq!(
            PlutusData::from_cbor(&bytes).unwrap(),
            PlutusData::constr(1, vec![PlutusData::uint(7), PlutusData::Bytes(b"nft1".to_vec())])
        );
    }
}
