use std::io::{IsTerminal, Write};

use cbor_host_rpc::{payload, AppStatus, ExchangeReport, Response, Value};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    method: &'a str,
    status: Option<&'a str>,
    message: Option<&'a str>,
    response: serde_json::Value,
    bytes_sent: usize,
    bytes_received: usize,
    elapsed_ms: u64,
}

pub fn print_response(response: &Response, report: &ExchangeReport, format: OutputFormat) {
    let status = status_text(response);
    match format {
        OutputFormat::Json => {
            let out = ResponseOutput {
                method: response.method().as_str(),
                status: status.as_deref(),
                message: response.message(),
                response: cbor_to_json(response.raw()),
                bytes_sent: report.bytes_sent,
                bytes_received: report.bytes_received,
                elapsed_ms: report.elapsed.as_millis() as u64,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            match response.raw() {
                Value::Map(entries) => {
                    for (key, value) in entries {
                        table.add_row(vec![display_key(key), display_value(value)]);
                    }
                }
                other => {
                    table.add_row(vec!["(value)".to_string(), display_value(other)]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "method={} status={} message={} sent={}B received={}B elapsed={}ms",
                response.method(),
                status.as_deref().unwrap_or("-"),
                response.message().unwrap_or("-"),
                report.bytes_sent,
                report.bytes_received,
                report.elapsed.as_millis()
            );
            if let Some(Value::Text(echo)) = response.field("received_message") {
                println!("received_message={echo}");
            }
        }
        OutputFormat::Raw => match payload::encode(response.raw()) {
            Ok(bytes) => print_raw(&bytes),
            Err(err) => eprintln!("error: {err}"),
        },
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn status_text(response: &Response) -> Option<String> {
    match response.status() {
        AppStatus::Success => Some("success".to_string()),
        AppStatus::Failure(status) => Some(status),
        AppStatus::Missing => None,
    }
}

/// Lossy conversion of a CBOR value for JSON output.
///
/// Byte strings become lowercase hex, tags are dropped, and non-text map
/// keys are rendered with their display form.
pub fn cbor_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(int) => {
            let wide = i128::from(*int);
            if let Ok(v) = i64::try_from(wide) {
                serde_json::Value::from(v)
            } else if let Ok(v) = u64::try_from(wide) {
                serde_json::Value::from(v)
            } else {
                serde_json::Value::String(wide.to_string())
            }
        }
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(text) => serde_json::Value::String(text.clone()),
        Value::Bytes(bytes) => serde_json::Value::String(hex(bytes)),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(cbor_to_json).collect()),
        Value::Map(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(key, value)| (display_key(key), cbor_to_json(value)))
                .collect(),
        ),
        Value::Tag(_, inner) => cbor_to_json(inner),
        _ => serde_json::Value::Null,
    }
}

/// Conversion of CLI JSON input into CBOR.
pub fn json_to_cbor(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Value::Integer(v.into())
            } else if let Some(v) = n.as_u64() {
                Value::Integer(v.into())
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(json_to_cbor).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (Value::Text(k.clone()), json_to_cbor(v)))
                .collect(),
        ),
    }
}

fn display_key(key: &Value) -> String {
    match key {
        Value::Text(text) => text.clone(),
        other => display_value(other),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        Value::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        other => cbor_to_json(other).to_string(),
    }
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
