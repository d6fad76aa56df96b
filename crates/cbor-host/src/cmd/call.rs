use cbor_host_rpc::{connect, Request};
use tracing::{info, warn};

use crate::cmd::{CallArgs, ConnectionArgs};
use crate::exit::{session_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{json_to_cbor, print_response, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let request = build_request(&args.method, &args.params)?;
    execute(&args.connection, &request, format)
}

/// Connect, run one exchange, print the response.
///
/// Exits with [`FAILURE`] when the device reports a non-success status.
pub fn execute(
    connection: &ConnectionArgs,
    request: &Request,
    format: OutputFormat,
) -> CliResult<i32> {
    let endpoint = connection.endpoint()?;
    let config = connection.session_config()?;
    let mut client =
        connect(&endpoint, config).map_err(|err| session_error("connect failed", err))?;

    let report = client.call_with_report(request);
    if let Some(response) = report.outcome.response() {
        print_response(response, &report, format);
        if response.is_success() {
            return Ok(SUCCESS);
        }
        warn!(
            method = %request.method,
            reason = response.message().unwrap_or(""),
            "device reported failure"
        );
        return Ok(FAILURE);
    }

    info!(
        bytes_sent = report.bytes_sent,
        bytes_received = report.bytes_received,
        phase = %report.phase,
        "exchange incomplete"
    );
    report
        .outcome
        .into_result()
        .map(|_| SUCCESS)
        .map_err(|err| session_error(&format!("{} failed", request.method), err))
}

fn build_request(method: &str, params: &str) -> CliResult<Request> {
    if method.trim().is_empty() {
        return Err(CliError::new(USAGE, "method must not be empty"));
    }

    let json: serde_json::Value = serde_json::from_str(params)
        .map_err(|err| CliError::new(USAGE, format!("--params is not valid JSON: {err}")))?;
    let object = json
        .as_object()
        .ok_or_else(|| CliError::new(USAGE, "--params must be a JSON object"))?;

    let mut request = Request::new(method);
    for (key, value) in object {
        request = request.with_param(key.clone(), json_to_cbor(value));
    }
    Ok(request)
}
