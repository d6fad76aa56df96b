use cbor_host_rpc::Request;

use crate::cmd::{call, ConnectionArgs};
use crate::exit::CliResult;
use crate::output::OutputFormat;

pub fn run(args: ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    call::execute(&args, &Request::display_default(), format)
}
