//! lockme CLI - Key-file based file encryption
//!
//! Command-line front end for encrypting and decrypting single files with
//! AES-256 under a randomly generated key stored in a key file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use lockme::blockcrypt::CipherMode;
use lockme::config::Config;
use lockme::frontend::{self, Action, TerminalFrontEnd};
use lockme::keyfile::KeyPolicy;

#[derive(Parser)]
#[command(name = "lockme")]
#[command(version)]
#[command(about = "Encrypt and decrypt files with a key file.", long_about = None)]
struct Cli {
    /// Read settings from this TOML file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the key file [default: key.bin]
    #[arg(short, long, global = true, value_name = "FILE")]
    key_file: Option<PathBuf>,

    /// Cipher mode; decryption must use the mode the file was encrypted with
    #[arg(short, long, global = true, value_enum)]
    mode: Option<CipherMode>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file, writing <FILE>.enc
    #[command(alias = "e")]
    Encrypt {
        /// File to encrypt; prompted for when omitted
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        /// Replace the key file with a freshly generated key. Files encrypted
        /// under the old key can no longer be decrypted with it.
        #[arg(long)]
        new_key: bool,
    },

    /// Decrypt a file, writing <FILE>.dec
    #[command(alias = "d")]
    Decrypt {
        /// File to decrypt; prompted for when omitted
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match Config::load_or_default(cli.config.as_deref()) {
        Ok(config) => config.with_overrides(cli.key_file, cli.mode),
        Err(e) => {
            eprintln!("Error: {}", e.report());
            process::exit(1);
        }
    };

    let (action, input, key_policy) = match cli.command {
        Commands::Encrypt { input, new_key } => {
            let policy = if new_key {
                KeyPolicy::Regenerate
            } else {
                KeyPolicy::ReuseOrCreate
            };
            (Action::Encrypt, input, policy)
        }
        Commands::Decrypt { input } => (Action::Decrypt, input, KeyPolicy::ReuseOrCreate),
    };

    let mut front_end = TerminalFrontEnd::stdio().with_path(input);
    let outcome = frontend::run_action(action, &mut front_end, &config, key_policy);

    if outcome.is_failure() {
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("lockme=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
