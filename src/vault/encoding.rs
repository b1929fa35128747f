//! Value encodings multiplexed by a one-byte tag.
//!
//! Every decrypted entry is `tag || payload`:
//!
//! | tag   | encoding | payload                  | decodes to      |
//! |-------|----------|--------------------------|-----------------|
//! | `'0'` | raw      | bytes, unchanged         | [`Value::Bytes`] |
//! | `'1'` | string   | UTF-8 text               | [`Value::Text`]  |
//! | `'2'` | json     | serialized JSON document | [`Value::Json`]  |
//!
//! An unknown tag is corruption, never a default.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// The closed set of supported encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Raw,
    String,
    #[default]
    Json,
}

impl Encoding {
    pub const ALL: [Encoding; 3] = [Encoding::Raw, Encoding::String, Encoding::Json];

    pub fn tag(self) -> u8 {
        match self {
            Encoding::Raw => b'0',
            Encoding::String => b'1',
            Encoding::Json => b'2',
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.tag() == tag)
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::Raw => "raw",
            Encoding::String => "string",
            Encoding::Json => "json",
        }
    }

    /// Serialize `value` into this encoding's payload (without the tag).
    pub fn encode(self, value: &Value) -> Result<Vec<u8>> {
        let reject = |reason: &str| VaultError::ValueEncoding {
            encoding: self.name(),
            reason: reason.to_string(),
        };

        match (self, value) {
            (Encoding::Raw, Value::Bytes(b)) => Ok(b.clone()),
            (Encoding::Raw, Value::Text(s)) => Ok(s.as_bytes().to_vec()),
            (Encoding::Raw, Value::Json(_)) => Err(reject("JSON values have no raw form")),

            (Encoding::String, Value::Text(s)) => Ok(s.as_bytes().to_vec()),
            (Encoding::String, Value::Bytes(b)) => std::str::from_utf8(b)
                .map(|s| s.as_bytes().to_vec())
                .map_err(|_| reject("bytes are not valid UTF-8")),
            (Encoding::String, Value::Json(json)) => match json {
                serde_json::Value::String(s) => Ok(s.as_bytes().to_vec()),
                serde_json::Value::Number(n) => Ok(n.to_string().into_bytes()),
                serde_json::Value::Bool(b) => Ok(b.to_string().into_bytes()),
                _ => Err(reject("only JSON strings, numbers and booleans have a text form")),
            },

            (Encoding::Json, Value::Json(json)) => serde_json::to_vec(json)
                .map_err(|e| reject(&e.to_string())),
            (Encoding::Json, Value::Text(s)) => serde_json::to_vec(s)
                .map_err(|e| reject(&e.to_string())),
            (Encoding::Json, Value::Bytes(_)) => Err(reject("raw bytes have no JSON form")),
        }
    }

    /// Parse a payload written by [`Encoding::encode`].
    pub fn decode(self, payload: &[u8]) -> Result<Value> {
        match self {
            Encoding::Raw => Ok(Value::Bytes(payload.to_vec())),
            Encoding::String => String::from_utf8(payload.to_vec())
                .map(Value::Text)
                .map_err(|_| VaultError::CorruptEntry("string entry is not valid UTF-8".into())),
            Encoding::Json => serde_json::from_slice(payload)
                .map(Value::Json)
                .map_err(|e| VaultError::CorruptEntry(format!("json entry does not parse: {e}"))),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| VaultError::UnknownEncoding(s.to_string()))
    }
}

/// A value as stored in and returned from the vault.
///
/// Absence is modelled as `Option::None` by every API, never as a variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bytes(Vec<u8>),
    Text(String),
    Json(serde_json::Value),
}

impl Value {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

/// Build the plaintext of an entry: `tag || payload`.
pub fn encode_entry(value: &Value, encoding: Encoding) -> Result<Vec<u8>> {
    let payload = encoding.encode(value)?;
    let mut entry = Vec::with_capacity(1 + payload.len());
    entry.push(encoding.tag());
    entry.extend_from_slice(&payload);
    Ok(entry)
}

/// Read the tag of a decrypted entry without decoding its payload.
pub fn entry_encoding(entry: &[u8]) -> Result<Encoding> {
    let (&tag, _) = entry
        .split_first()
        .ok_or_else(|| VaultError::CorruptEntry("entry is empty".into()))?;
    Encoding::from_tag(tag).ok_or_else(|| {
        VaultError::CorruptEntry(format!("unknown encoding prefix {:?}", char::from(tag)))
    })
}

/// Split a decrypted entry into its encoding and decoded value.
pub fn decode_entry(entry: &[u8]) -> Result<(Encoding, Value)> {
    let encoding = entry_encoding(entry)?;
    let value = encoding.decode(&entry[1..])?;
    Ok((encoding, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_are_ascii_digits() {
        assert_eq!(Encoding::Raw.tag(), b'0');
        assert_eq!(Encoding::String.tag(), b'1');
        assert_eq!(Encoding::Json.tag(), b'2');
        assert_eq!(Encoding::from_tag(b'3'), None);
    }

    #[test]
    fn names_parse() {
        assert_eq!("raw".parse::<Encoding>().unwrap(), Encoding::Raw);
        assert_eq!("json".parse::<Encoding>().unwrap(), Encoding::Json);
        assert!(matches!(
            "yaml".parse::<Encoding>(),
            Err(VaultError::UnknownEncoding(name)) if name == "yaml"
        ));
    }

    #[test]
    fn json_entry_keeps_structure_and_null() {
        let config = json!({
            "version": "1.2.1",
            "hosts": ["https://example1.com", "https://example2.com"],
            "hostCount": 2,
            "nested": { "empty": null }
        });
        for value in [config, json!(null)] {
            let entry = encode_entry(&Value::Json(value.clone()), Encoding::Json).unwrap();
            assert_eq!(entry[0], b'2');
            assert_eq!(decode_entry(&entry).unwrap(), (Encoding::Json, Value::Json(value)));
        }
    }

    #[test]
    fn raw_entry_is_bit_identical() {
        let bytes: Vec<u8> = (0..=255).collect();
        let entry = encode_entry(&Value::Bytes(bytes.clone()), Encoding::Raw).unwrap();
        assert_eq!(&entry[1..], &bytes[..]);
        assert_eq!(decode_entry(&entry).unwrap().1, Value::Bytes(bytes));
    }

    #[test]
    fn string_coercions() {
        let enc = Encoding::String;
        assert_eq!(enc.encode(&Value::from("Jared")).unwrap(), b"Jared");
        assert_eq!(enc.encode(&Value::Json(json!(14))).unwrap(), b"14");
        assert_eq!(enc.encode(&Value::Json(json!("x"))).unwrap(), b"x");
        assert!(enc.encode(&Value::Json(json!({ "a": 1 }))).is_err());
        assert!(enc.encode(&Value::Bytes(vec![0xff, 0xfe])).is_err());
    }

    #[test]
    fn mismatched_values_are_configuration_errors() {
        let err = Encoding::Raw.encode(&Value::Json(json!([1]))).unwrap_err();
        assert!(err.is_configuration());
        let err = Encoding::Json.encode(&Value::Bytes(vec![1, 2])).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn text_under_json_becomes_a_json_string() {
        let entry = encode_entry(&Value::from("hi"), Encoding::Json).unwrap();
        assert_eq!(&entry[1..], b"\"hi\"");
        assert_eq!(decode_entry(&entry).unwrap().1, Value::Json(json!("hi")));
    }

    #[test]
    fn corrupt_entries_are_rejected() {
        assert!(decode_entry(b"").unwrap_err().is_integrity());
        assert!(decode_entry(b"9abc").unwrap_err().is_integrity());
        assert!(decode_entry(b"2{not json").unwrap_err().is_integrity());
        assert!(decode_entry(&[b'1', 0xff]).unwrap_err().is_integrity());
    }
}
