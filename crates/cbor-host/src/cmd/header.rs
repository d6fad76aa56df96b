use std::fs;
use std::io::Read;

use cbor_host::image::{render_c_array, rgb565_values};

use crate::cmd::HeaderArgs;
use crate::exit::{image_error, io_error, CliResult, SUCCESS};

pub fn run(args: HeaderArgs) -> CliResult<i32> {
    let data = match &args.input {
        Some(path) => fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        None => {
            let mut data = Vec::new();
            std::io::stdin()
                .read_to_end(&mut data)
                .map_err(|err| io_error("failed reading stdin", err))?;
            data
        }
    };

    let values = rgb565_values(&data, args.endian).map_err(|err| image_error("invalid input", err))?;
    let rendered =
        render_c_array(&values, args.columns).map_err(|err| image_error("invalid --columns", err))?;

    fs::write(&args.output, rendered).map_err(|err| {
        io_error(&format!("failed writing {}", args.output.display()), err)
    })?;

    println!(
        "Generated {} with {} uint16_t values",
        args.output.display(),
        values.len()
    );
    Ok(SUCCESS)
}
