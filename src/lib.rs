//! # gh-release-install
//!
//! Install a versioned binary published as a GitHub release: resolve the
//! version to install, download the matching asset, optionally verify its
//! checksum and extract a member from the archive, then place the
//! executable on the system — skipping everything when the requested
//! version is already installed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gh_release_install::Installer;
//!
//! fn main() -> Result<(), gh_release_install::Error> {
//!     Installer::new("mvdan/sh", "shfmt_{tag}_linux_amd64", "/usr/local/bin/shfmt")
//!         .version("v3.3.1")
//!         .run()?;
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod downloader;
pub mod error;
pub mod install;
pub mod progress;
pub mod template;
pub mod unpack;

pub use checksum::{Algorithm, ChecksumSpec};
pub use downloader::Downloader;
pub use error::Error;
pub use install::{Installer, Outcome, Release, LATEST};
pub use unpack::Unpacker;
