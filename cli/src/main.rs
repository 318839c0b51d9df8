// aethermesh: mesh node CLI
//
// Runs one node over the UDP radio emulation and manages its configuration.

mod config;

use aethermesh_core::node::{Console, NodeController};
use aethermesh_core::packet::{MacAddress, Packet};
use aethermesh_core::transport::UdpRadio;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::net::SocketAddr;

#[derive(Parser)]
#[command(name = "aethermesh")]
#[command(about = "AetherMesh: multi-hop mesh node", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the mesh node
    Start {
        /// UDP socket to bind (overrides config)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
        /// Node MAC address (overrides config)
        #[arg(short, long)]
        address: Option<MacAddress>,
        /// Run without the interactive console
        #[arg(long)]
        no_console: bool,
    },
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Decode a hex frame and print its header
    Decode { frame: String },
    /// Print a hex ROUTING frame advertising `dest` at `distance`
    EncodeRoute { dest: MacAddress, distance: u8 },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
    Neighbor {
        #[command(subcommand)]
        action: NeighborAction,
    },
}

#[derive(Subcommand)]
enum NeighborAction {
    Add { address: MacAddress, socket: SocketAddr },
    Remove { address: MacAddress },
    List,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            bind,
            address,
            no_console,
        } => cmd_start(bind, address, no_console).await,
        Commands::Config { action } => cmd_config(action),
        Commands::Decode { frame } => cmd_decode(&frame),
        Commands::EncodeRoute { dest, distance } => cmd_encode_route(dest, distance),
    }
}

async fn cmd_start(
    bind: Option<SocketAddr>,
    address: Option<MacAddress>,
    no_console: bool,
) -> Result<()> {
    let config = config::Config::load()?;
    let address = address.unwrap_or(config.address);
    let bind = bind.unwrap_or(config.bind);

    let mut radio = UdpRadio::bind(address, bind).context("Failed to start UDP radio")?;
    for neighbor in &config.neighbors {
        radio.add_neighbor(neighbor.address, neighbor.socket);
    }
    let local_addr = radio.local_addr().context("Failed to read bound socket")?;

    println!("{}", "AetherMesh starting...".bold());
    println!();
    println!("{} MAC address: {}", "✓".green(), address.to_string().bright_cyan());
    println!("{} Radio bound to {}", "✓".green(), local_addr);
    if config.neighbors.is_empty() {
        println!(
            "  {} no neighbors configured; add one with {}",
            "!".yellow(),
            "aethermesh config neighbor add <mac> <host:port>".bright_green()
        );
    } else {
        println!("{} {} neighbor(s) in range", "✓".green(), config.neighbors.len());
    }

    let console = if config.node.console && !no_console {
        println!();
        println!("{}", "Commands:".bold());
        println!("  {}", "show routing".bright_green());
        println!("  {}", "show mac".bright_green());
        println!("  {}", "show neighbors".bright_green());
        println!("  {}", "show topology".bright_green());
        println!("  {} <mac|broadcast> <text>", "send".bright_green());
        println!();
        Some(Console::stdin())
    } else {
        None
    };

    let node = NodeController::new(address, radio, config.node.clone());
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let node = node.run_until(console, shutdown).await;

    let stats = node.stats();
    println!();
    println!("Shutting down...");
    println!(
        "Frames: {}  Delivered: {}  Forwarded: {}  Flooded: {}  Send failures: {}",
        stats.frames_received, stats.delivered, stats.forwarded, stats.flooded, stats.send_failures
    );

    Ok(())
}

fn cmd_config(action: ConfigAction) -> Result<()> {
    let mut config = config::Config::load()?;

    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("{} Set {} = {}", "✓".green(), key.bright_cyan(), value);
        }
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{} = {}", key.bright_cyan(), value),
            None => anyhow::bail!("Unknown config key: {}", key),
        },
        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            println!();
            for (key, value) in config.list() {
                println!("  {:<24} {}", key.bright_cyan(), value);
            }
            println!();
            print_neighbors(&config);
        }
        ConfigAction::Neighbor { action } => match action {
            NeighborAction::Add { address, socket } => {
                config.add_neighbor(address, socket);
                config.save()?;
                println!("{} Added neighbor {} at {}", "✓".green(), address, socket);
            }
            NeighborAction::Remove { address } => {
                if config.remove_neighbor(&address) {
                    config.save()?;
                    println!("{} Removed neighbor {}", "✓".green(), address);
                } else {
                    println!("{} Neighbor {} not configured", "✗".red(), address);
                }
            }
            NeighborAction::List => print_neighbors(&config),
        },
    }

    Ok(())
}

fn print_neighbors(config: &config::Config) {
    println!("{}", "Neighbors:".bold());
    if config.neighbors.is_empty() {
        println!("  {}", "(none configured)".dimmed());
    } else {
        for (i, neighbor) in config.neighbors.iter().enumerate() {
            println!(
                "  {}. {} at {}",
                i + 1,
                neighbor.address.to_string().bright_cyan(),
                neighbor.socket
            );
        }
    }
}

fn cmd_decode(frame: &str) -> Result<()> {
    let bytes = hex::decode(frame.trim()).context("Frame is not valid hex")?;
    let packet = Packet::from_bytes(&bytes).context("Failed to decode frame")?;

    println!("{}", packet);
    match packet.verify_checksum() {
        Ok(()) => println!("{} Checksum {:#06x} verifies", "✓".green(), packet.checksum),
        Err(e) => println!("{} {}", "✗".red(), e),
    }

    if packet.packet_type == aethermesh_core::PacketType::Routing {
        match (MacAddress::from_slice(&packet.payload), packet.payload.get(6)) {
            (Some(dest), Some(distance)) => {
                println!("  advertises {} at distance {}", dest.to_string().bright_cyan(), distance)
            }
            _ => println!("  {}", "malformed advertisement".yellow()),
        }
    }

    Ok(())
}

fn cmd_encode_route(dest: MacAddress, distance: u8) -> Result<()> {
    let config = config::Config::load()?;
    let mut packet = Packet::routing_advertisement(config.address, dest, distance);
    let frame = packet.to_bytes().context("Failed to encode advertisement")?;
    println!("{}", hex::encode(frame));
    Ok(())
}
