//! Command line argument parsing and validation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Branded storefront app package assembler
#[derive(Parser, Debug)]
#[command(
    name = "storeforge_bundler",
    version,
    about = "Branded storefront app package assembler",
    long_about = "Builds signed, installable application packages from vendor branding requests.

Usage:
  storeforge_bundler build --request branding.json --out-dir ./dist
  storeforge_bundler verify ./dist/com.acme.shop-1.apk

Exit code 0 = artifact guaranteed to exist at the printed path."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

/// Bundler subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build and sign a package from a branding request document
    Build {
        /// Path to the JSON branding/build request
        #[arg(short, long, value_name = "FILE")]
        request: PathBuf,

        /// Directory the artifact is published into
        #[arg(short, long, value_name = "DIR", default_value = "dist")]
        out_dir: PathBuf,

        /// Base64-encoded Ed25519 signing key seed
        ///
        /// Supplied by deployment configuration; builds fail at the signing
        /// stage when absent.
        #[arg(long, value_name = "BASE64", env = "STOREFORGE_SIGNING_KEY")]
        signing_key: Option<String>,

        /// Certificate subject recorded in the signed-data block
        #[arg(
            long,
            value_name = "SUBJECT",
            env = "STOREFORGE_SIGNING_SUBJECT",
            default_value = "CN=Storeforge Dev"
        )]
        signing_subject: String,

        /// Last published version code for this package, if any
        ///
        /// The build is rejected unless the request's version code is
        /// strictly greater.
        #[arg(long, value_name = "CODE")]
        last_version_code: Option<u32>,
    },

    /// Verify a published package's signature chain and entry digests
    Verify {
        /// Path to the package archive
        #[arg(value_name = "ARTIFACT")]
        artifact: PathBuf,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
