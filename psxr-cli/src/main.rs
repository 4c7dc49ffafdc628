// CLI application
use anyhow::Result;
use clap::Parser;
use psxr_core::{BiosMode, Config, Machine};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "psxr")]
#[command(about = "PSX memory / HLE BIOS core inspector")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Reset a machine and report the BIOS mode decision
    Info {
        /// Path to a BIOS image (512KB)
        #[arg(short, long)]
        bios: Option<PathBuf>,

        /// JSON config file; --bios overrides its image path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Read guest memory words through the access facade
    Peek {
        /// Path to a BIOS image (512KB)
        #[arg(short, long)]
        bios: Option<PathBuf>,

        /// Guest address, hex with optional 0x prefix
        #[arg(short, long, value_parser = parse_address)]
        address: u32,

        /// Number of 32-bit words to dump
        #[arg(short, long, default_value_t = 4)]
        count: u32,
    },
}

fn parse_address(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid address {:?}: {}", s, e))
}

fn build_machine(bios: Option<PathBuf>, config: Option<PathBuf>) -> Result<Machine> {
    let mut cfg = match config {
        Some(path) => Config::load_from_file(&path)?,
        None => Config::default(),
    };
    if let Some(path) = bios {
        cfg = Config::with_bios(path);
    }
    let mut machine = Machine::new(cfg);
    machine.reset();
    Ok(machine)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { bios, config } => {
            let machine = build_machine(bios, config)?;
            println!("bios mode: {:?}", machine.bios_mode);
            match machine.bios_mode {
                BiosMode::UserDefinedImage => {
                    println!("rom[0..4]: {:02x?}", &machine.mem.rom()[..4]);
                }
                BiosMode::Hle => {
                    println!("rom left zeroed; HLE tables service BIOS calls");
                }
            }
        }
        Commands::Peek {
            bios,
            address,
            count,
        } => {
            let mut machine = build_machine(bios, None)?;
            for i in 0..count {
                let addr = address.wrapping_add(i * 4);
                println!("{:08x}: {:08x}", addr, machine.read32(addr));
            }
        }
    }
    Ok(())
}
