//! `rzk` CLI - standalone binary
//!
//! The binary is a thin wrapper around [`rzk_cli::run_cli`], which does
//! all argument parsing and dispatch.

fn main() {
    if let Err(e) = rzk_cli::run_cli() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
