//! Package assembly pipeline.
//!
//! Turns a vendor's branding configuration into an installable, signed
//! application package: validation ([`spec`]), binary resource encoding
//! ([`resources`]), code stub generation ([`stub`]), archive assembly
//! ([`archive`]), digest/signature production ([`signing`]), and the
//! orchestrator that sequences them ([`builder`]).

pub mod archive;
pub mod builder;
pub mod error;
pub mod resources;
pub mod signing;
pub mod spec;
pub mod stub;
pub mod utils;

pub use builder::{ArtifactMetadata, BuildStage, PackageBuilder};
pub use error::{EncodingError, Error, Result, SigningError, ValidationError};
pub use signing::{Certificate, SigningIdentity};
pub use spec::{BuildRequest, InMemoryHistory, PackageSpec, VersionHistory};
