//! Command line interface for the storeforge bundler.
//!
//! Argument parsing, command dispatch, and the exit-code contract: a zero
//! exit guarantees the printed artifact exists.

mod args;
mod commands;

pub use args::{Args, Command};

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    match args.command {
        Command::Build {
            request,
            out_dir,
            signing_key,
            signing_subject,
            last_version_code,
        } => {
            commands::build(
                &request,
                out_dir,
                signing_key,
                &signing_subject,
                last_version_code,
            )
            .await
        }
        Command::Verify { artifact } => commands::verify(&artifact).await,
    }
}
