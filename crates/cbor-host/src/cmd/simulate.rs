use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cbor_host_rpc::{DeviceServer, SimulatedDevice, IMAGE_DATA_SIZE};
use tracing::warn;

use crate::cmd::SimulateArgs;
use crate::exit::{io_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: SimulateArgs) -> CliResult<i32> {
    let device = match &args.default_image {
        Some(path) => {
            let image = fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
            if image.len() != IMAGE_DATA_SIZE {
                warn!(
                    bytes = image.len(),
                    expected = IMAGE_DATA_SIZE,
                    "default image size mismatch, padding or truncating"
                );
            }
            SimulatedDevice::with_default_image(image)
        }
        None => SimulatedDevice::new(),
    };

    let mut server = DeviceServer::bind(args.listen.as_str(), device)
        .map_err(|err| transport_error(&format!("bind {} failed", args.listen), err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    server
        .run(&running)
        .map_err(|err| transport_error("simulator failed", err))?;
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
