//! I2C port executable.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use hwport::config::I2cArgs;
use hwport::controller::I2cController;
use hwport::event_loop::{Channel, EventLoop};
use hwport::linux::I2cDev;
use hwport::port::I2cPort;
use hwport::tracing::prelude::*;

fn main() -> ExitCode {
    hwport::tracing::init_journald_or_stderr();
    let args = I2cArgs::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &I2cArgs) -> anyhow::Result<()> {
    let bus = I2cDev::open(&args.device, args.address)
        .with_context(|| format!("Failed to open I2C device {}", args.device.display()))?;
    info!(
        device = %args.device.display(),
        addr = %format!("0x{:02x}", args.address),
        "Opened I2C device"
    );

    let channel = Channel::stdio()?;
    EventLoop::new(I2cPort::new(I2cController::new(bus, args.address)), channel).run()?;
    Ok(())
}
