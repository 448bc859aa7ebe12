//! Branded storefront application package assembler.
//!
//! Given a vendor's branding configuration, this library produces a signed,
//! installable application package: binary-encoded manifest and resources,
//! an executable code stub hosting the storefront, a checksummed ZIP-family
//! container, and a verifiable digest/signature chain.
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
