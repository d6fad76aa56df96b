use ciborium::value::Value;
use serde::Deserialize;

use crate::payload::{map_get, map_get_text};
use crate::request::Method;

/// Reply to the `test` method.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestReply {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub received_message: Option<String>,
}

/// Reply to the display methods.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusReply {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Decoded response, tagged by the method it answers.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Test(TestReply),
    Status(StatusReply),
    /// Unknown method, or a value that does not match the expected shape.
    Generic(Value),
}

/// Application-level status reported by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppStatus {
    /// `status == "success"`
    Success,
    /// Any other status string.
    Failure(String),
    /// No text `status` field.
    Missing,
}

/// A decoded response.
///
/// A device-reported failure is still a `Response`; inspect
/// [`Response::status`] to tell the two apart.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    method: Method,
    raw: Value,
    body: ResponseBody,
}

impl Response {
    /// Classify `raw` according to the method that produced it.
    pub fn decode(method: Method, raw: Value) -> Self {
        let body = match method {
            Method::Test => raw
                .deserialized::<TestReply>()
                .map(ResponseBody::Test)
                .unwrap_or_else(|_| ResponseBody::Generic(raw.clone())),
            Method::DisplayImage | Method::ClearDisplay | Method::DisplayDefault => raw
                .deserialized::<StatusReply>()
                .map(ResponseBody::Status)
                .unwrap_or_else(|_| ResponseBody::Generic(raw.clone())),
            Method::Other(_) => ResponseBody::Generic(raw.clone()),
        };
        Self { method, raw, body }
    }

    /// Method this response answers.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The value exactly as decoded from the wire.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn status(&self) -> AppStatus {
        match map_get_text(&self.raw, "status") {
            Some("success") => AppStatus::Success,
            Some(other) => AppStatus::Failure(other.to_string()),
            None => AppStatus::Missing,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == AppStatus::Success
    }

    /// Human-readable `message` field, if present.
    pub fn message(&self) -> Option<&str> {
        map_get_text(&self.raw, "message")
    }

    /// Any top-level field of the response map.
    pub fn field(&self, key: &str) -> Option<&Value> {
        map_get(&self.raw, key)
    }
}
