use anyhow::Context;
use clap::{Parser, Subcommand};
use mcu_bridge::{init_logger, Bridge, Response, SerialConfig};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "mcu-bridge")]
#[command(about = "Send text commands to a microcontroller over a serial link")]
struct Cli {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Serial port, overrides the config file
    #[arg(short, long)]
    port: Option<String>,
    #[arg(short, long)]
    baud_rate: Option<u32>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one command and print the reply
    Send {
        command: String,
        /// Text for the `lcd` command
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Read all sensors
    Sensors,
    /// Read commands from stdin, one per line
    Repl,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("info");

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => SerialConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SerialConfig::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(baud_rate) = cli.baud_rate {
        config.baud_rate = baud_rate;
    }

    let bridge = Bridge::open(&config).await;

    match cli.command {
        Commands::Send { command, message } => {
            let response = bridge.handle(Some(command.as_str()), message.as_deref()).await;
            print_json(&response)?;
            if response.is_error() {
                std::process::exit(2);
            }
        }
        Commands::Sensors => {
            print_json(&bridge.sensors().await)?;
        }
        Commands::Repl => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await.context("reading stdin")? {
                if line.trim().is_empty() {
                    continue;
                }
                let response: Response = bridge.handle_line(&line).await;
                print_json(&response)?;
            }
        }
    }

    Ok(())
}
