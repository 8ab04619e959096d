//! Anonymizing transport bootstrap
//!
//! Provides the readiness barrier that gates peer networking behind the Tor
//! setup routine, the shutdown signal that routine polls, and the Tor path
//! layout under the node data directory.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bootstrap;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod tor;

// Re-export main types
pub use bootstrap::{BootstrapBarrier, BootstrapState};
pub use error::{Error, Result};
pub use interrupt::InterruptSignal;
pub use tor::{BootstrapOutcome, FnStep, PortProbe, PrepareDirectories, TorBootstrap, TorPaths, TorSetupStep};
