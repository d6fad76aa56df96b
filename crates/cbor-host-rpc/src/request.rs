use std::collections::BTreeMap;
use std::fmt;

use ciborium::value::Value;

use crate::error::PayloadError;
use crate::payload;

/// RPC method understood by the device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Test,
    DisplayImage,
    ClearDisplay,
    DisplayDefault,
    /// Any other method name, sent verbatim.
    Other(String),
}

impl Method {
    /// Name used on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Method::Test => "test",
            Method::DisplayImage => "display_image",
            Method::ClearDisplay => "clear_display",
            Method::DisplayDefault => "display_default",
            Method::Other(name) => name,
        }
    }
}

impl From<&str> for Method {
    fn from(name: &str) -> Self {
        match name {
            "test" => Method::Test,
            "display_image" => Method::DisplayImage,
            "clear_display" => Method::ClearDisplay,
            "display_default" => Method::DisplayDefault,
            other => Method::Other(other.to_string()),
        }
    }
}

impl From<String> for Method {
    fn from(name: String) -> Self {
        Method::from(name.as_str())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An RPC request: `{"method": <name>, "params": {...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub params: BTreeMap<String, Value>,
}

impl Request {
    /// Request with no parameters.
    pub fn new(method: impl Into<Method>) -> Self {
        Self {
            method: method.into(),
            params: BTreeMap::new(),
        }
    }

    /// Echo request; the device answers with `received_message`.
    pub fn test(message: impl Into<String>) -> Self {
        Self::new(Method::Test).with_param("test_message", Value::Text(message.into()))
    }

    /// Raw RGB565 framebuffer contents, sent as a CBOR byte string.
    pub fn display_image(image_data: impl Into<Vec<u8>>) -> Self {
        Self::new(Method::DisplayImage).with_param("image_data", Value::Bytes(image_data.into()))
    }

    pub fn clear_display() -> Self {
        Self::new(Method::ClearDisplay)
    }

    pub fn display_default() -> Self {
        Self::new(Method::DisplayDefault)
    }

    /// Add or replace a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// The structured value sent on the wire.
    pub fn to_value(&self) -> Value {
        let params = self
            .params
            .iter()
            .map(|(key, value)| (Value::Text(key.clone()), value.clone()))
            .collect();
        Value::Map(vec![
            (
                Value::Text("method".to_string()),
                Value::Text(self.method.as_str().to_string()),
            ),
            (Value::Text("params".to_string()), Value::Map(params)),
        ])
    }

    /// CBOR encoding of [`Request::to_value`].
    pub fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        payload::encode(&self.to_value())
    }
}
