//! Storeforge Bundler - branded storefront app package assembler.
//!
//! This binary turns a vendor's branding request into a signed, installable
//! application package with proper error handling and artifact verification.

use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Run CLI and get exit code
    let exit_code = match storeforge_bundler::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    process::exit(exit_code);
}
