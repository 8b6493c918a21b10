//! The side-ledger daemon binary (spec.md §6.4): loads a JSON config, opens
//! the store, and runs until SIGINT/SIGTERM. RPC dispatch is explicitly out
//! of scope (spec.md's Non-goals: "No RPC server"), so this binary's job
//! ends at proving the process lifecycle the config describes.
//!
//! Grounded in `zebrad`'s binary shell: `gumdrop` for argument parsing,
//! `tracing-subscriber` for log init, exit codes matching the failure modes
//! the teacher's daemon distinguishes (config failure vs runtime failure).

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use conclave_chain::{Address, BitcoinTx, Hash32};
use conclave_state::{ChainOracle, Config, Ledger, LedgerError};
use gumdrop::Options;

#[derive(Debug, Options)]
struct Args {
    #[options(help = "print this help message")]
    help: bool,

    #[options(help = "path to the daemon's JSON config file", meta = "PATH")]
    config_file: Option<String>,
}

/// Stands in for the real Bitcoin-chain adapter (an Electrum-protocol
/// client, per spec.md §6.2/§6.4's `BitcoinChain.Electrumx` config), which
/// lives outside this core's scope. Every query fails with `Adapter`, which
/// is exactly how spec.md §7 says adapter failures should surface: verbatim,
/// never retried.
struct UnimplementedOracle;

impl ChainOracle for UnimplementedOracle {
    fn get_tx(&self, _tx_id: Hash32) -> Result<Option<BitcoinTx>, LedgerError> {
        Err(LedgerError::Adapter("no Bitcoin-chain adapter is configured".into()))
    }

    fn get_address_balance(&self, _addr: &Address) -> Result<u64, LedgerError> {
        Err(LedgerError::Adapter("no Bitcoin-chain adapter is configured".into()))
    }

    fn submit_tx(&self, _tx: &BitcoinTx) -> Result<Hash32, LedgerError> {
        Err(LedgerError::Adapter("no Bitcoin-chain adapter is configured".into()))
    }

    fn latest_block_hash(&self) -> Result<Hash32, LedgerError> {
        Err(LedgerError::Adapter("no Bitcoin-chain adapter is configured".into()))
    }
}

fn main() -> ExitCode {
    // `parse_args_default_or_exit` prints usage and exits itself on a parse
    // error or `-h`/`--help` (gumdrop's `help` field is special-cased).
    let args = Args::parse_args_default_or_exit();

    tracing_subscriber::fmt::init();

    let config_path = match args.config_file {
        Some(path) => path,
        None => {
            eprintln!("error: -c/--config-file is required");
            print_help();
            return ExitCode::from(1);
        }
    };

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error loading config file {}: {}", config_path, e);
            return ExitCode::from(1);
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "unrecoverable runtime error");
            ExitCode::from(2)
        }
    }
}

fn run(config: &Config) -> Result<(), LedgerError> {
    let store = config.open_store()?;
    let (ledger, _withdrawals) = Ledger::new(store, UnimplementedOracle, config.conclave_chain.max_chain_depth);
    let ledger = Arc::new(ledger);
    let _ = &ledger;

    let running = Arc::new(AtomicBool::new(true));
    let signal_flag = running.clone();
    ctrlc::set_handler(move || signal_flag.store(false, Ordering::SeqCst))
        .map_err(|e| LedgerError::Adapter(e.to_string()))?;

    tracing::info!(node = %config.display_name, testnet = config.testnet, "conclaved started");
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
    tracing::info!("shutting down on signal");
    Ok(())
}

fn print_help() {
    println!("conclaved: the side-ledger daemon\n");
    println!("{}", Args::usage());
}
