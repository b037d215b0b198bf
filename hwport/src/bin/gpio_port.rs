//! GPIO port executable.

use std::process::ExitCode;

use clap::Parser;

use hwport::config::GpioArgs;
use hwport::controller::GpioController;
use hwport::event_loop::{Channel, EventLoop};
use hwport::linux::SysfsGpio;
use hwport::port::GpioPort;
use hwport::tracing::prelude::*;

fn main() -> ExitCode {
    hwport::tracing::init_journald_or_stderr();
    let args = GpioArgs::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &GpioArgs) -> anyhow::Result<()> {
    debug!(sysfs = %args.sysfs_root.display(), "Starting GPIO port");

    let controller = GpioController::new(SysfsGpio::new(), args.layout());
    let channel = Channel::stdio()?;
    EventLoop::new(GpioPort::new(controller), channel).run()?;
    Ok(())
}
