// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

mod display;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use vedirect::transport::{enumerate_candidates, is_valid_port_path};
use vedirect::{SerialTransport, Supervisor, Transport, VedirectConfig};

#[derive(Parser)]
#[command(name = "vedirect", about = "Decode and monitor a Victron VE.Direct serial device")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List candidate serial ports and whether each looks like a VE.Direct device.
    ListPorts,
    /// Open a port directly and print one decoded block.
    Read {
        #[arg(long)]
        port: String,
        #[arg(long)]
        baud: u32,
        #[arg(long)]
        timeout: Option<f64>,
    },
    /// Open a port directly and print every decoded block until interrupted.
    Monitor {
        #[arg(long)]
        port: String,
        #[arg(long)]
        baud: u32,
        #[arg(long)]
        max_blocks: Option<usize>,
    },
    /// Load a configuration file and demonstrate the identity probe's reconnect search.
    Probe {
        #[arg(long)]
        config: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::ListPorts => {
            let candidates: Vec<(String, bool)> = enumerate_candidates()
                .into_iter()
                .map(|path| {
                    let valid = is_valid_port_path(&path);
                    (path, valid)
                })
                .collect();
            display::print_candidate_ports(&candidates);
        }
        Command::Read { port, baud, timeout } => {
            let read_timeout = timeout.map(Duration::from_secs_f64);
            let transport = SerialTransport::new(port, baud, read_timeout);
            let mut supervisor = Supervisor::new(transport, None, read_timeout);
            supervisor.open().context("failed to open serial port")?;

            let frame_timeout = read_timeout.unwrap_or(Duration::from_secs(5));
            let block = supervisor
                .read_single(frame_timeout)
                .context("failed to read a block")?;
            display::print_block(0, &block);
        }
        Command::Monitor { port, baud, max_blocks } => {
            let transport = SerialTransport::new(port, baud, None);
            let mut supervisor = Supervisor::new(transport, None, None);
            supervisor.open().context("failed to open serial port")?;

            let mut index = 0usize;
            supervisor
                .read_callback(
                    |block| {
                        if let Some(block) = block {
                            display::print_block(index, &block);
                            index += 1;
                        }
                    },
                    Duration::from_secs(10),
                    Duration::from_secs(30),
                    max_blocks,
                )
                .context("monitor loop ended with an error")?;
        }
        Command::Probe { config } => {
            let config = VedirectConfig::from_toml_path(&config)
                .context("failed to load configuration")?;
            let mut supervisor = Supervisor::from_config(&config)
                .context("failed to build supervisor from configuration")?;

            supervisor
                .reconnect(Duration::from_secs(30))
                .context("identity probe did not find a matching port")?;
            display::print_reconnected(supervisor.transport().port_path());
        }
    }

    Ok(())
}
