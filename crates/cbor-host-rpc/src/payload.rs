//! CBOR payload codec.

use ciborium::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PayloadError;

/// Serialize `value` to CBOR bytes.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, PayloadError> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out)
        .map_err(|err| PayloadError::Encode(err.to_string()))?;
    Ok(out)
}

/// Decode exactly one CBOR item from `bytes`.
///
/// Empty input, truncated items and bytes left over after the first item
/// are all rejected.
pub fn decode_value(bytes: &[u8]) -> Result<Value, PayloadError> {
    if bytes.is_empty() {
        return Err(PayloadError::Decode("empty payload".to_string()));
    }

    let mut rest = bytes;
    let value: Value = ciborium::de::from_reader(&mut rest)
        .map_err(|err| PayloadError::Decode(err.to_string()))?;
    if !rest.is_empty() {
        return Err(PayloadError::TrailingBytes {
            trailing: rest.len(),
        });
    }
    Ok(value)
}

/// Decode `bytes` and deserialize the item into `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PayloadError> {
    decode_value(bytes)?
        .deserialized()
        .map_err(|err| PayloadError::Shape(err.to_string()))
}

/// Look up a text key in a CBOR map. Returns `None` for non-maps.
pub fn map_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Map(entries) => entries
            .iter()
            .find(|(k, _)| matches!(k, Value::Text(text) if text == key))
            .map(|(_, v)| v),
        _ => None,
    }
}

/// Look up a text key and return its value if it is a text string.
pub fn map_get_text<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    match map_get(value, key) {
        Some(Value::Text(text)) => Some(text.as_str()),
        _ => None,
    }
}
