//! Tor setup routine and transport paths
//!
//! The Tor process itself is managed elsewhere. This module drives the
//! node-side setup steps, honours shutdown between them, and opens the
//! [`BootstrapBarrier`] once everything has succeeded.

use crate::bootstrap::BootstrapBarrier;
use crate::interrupt::InterruptSignal;
use crate::{Error, Result};
use once_cell::sync::OnceCell;
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use umbra_params::NodeConfig;

static TOR_PATHS: OnceCell<TorPaths> = OnceCell::new();

/// Tor working directories under the node data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorPaths {
    /// Tor working directory
    pub tor_dir: PathBuf,
    /// Hidden service directory
    pub hidden_service_dir: PathBuf,
}

impl TorPaths {
    /// Derive paths from the node data directory
    pub fn new(data_dir: &Path) -> Self {
        let tor_dir = data_dir.join("tor");
        let hidden_service_dir = tor_dir.join("onion");
        Self {
            tor_dir,
            hidden_service_dir,
        }
    }

    /// Derive paths from the node config
    pub fn from_config(config: &NodeConfig) -> Result<Self> {
        Ok(Self::new(&config.network_data_dir()?))
    }

    /// Process-wide paths, computed by the first caller and cached.
    ///
    /// Later calls with a different data directory get the cached value.
    pub fn global(data_dir: &Path) -> &'static TorPaths {
        let paths = TOR_PATHS.get_or_init(|| Self::new(data_dir));
        if paths.tor_dir.parent() != Some(data_dir) {
            warn!(
                event = "tor_paths_cached",
                cached = %paths.tor_dir.display(),
                requested = %data_dir.display(),
                "Tor paths already resolved for another data directory"
            );
        }
        paths
    }

    /// File Tor writes the onion address to
    pub fn hostname_file(&self) -> PathBuf {
        self.hidden_service_dir.join("hostname")
    }

    /// Published onion address, if Tor has written one yet
    pub fn onion_address(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(self.hostname_file()) {
            Ok(contents) => {
                let address = contents.trim();
                Ok((!address.is_empty()).then(|| address.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// One step of the Tor setup routine
pub trait TorSetupStep: Send {
    /// Step name for logs
    fn name(&self) -> &str;

    /// Run the step. Long steps should poll `interrupt` and return
    /// [`Error::Interrupted`] when it is raised.
    fn run(&mut self, interrupt: &InterruptSignal) -> Result<()>;
}

/// Step backed by a closure
pub struct FnStep<F> {
    name: String,
    f: F,
}

impl<F> FnStep<F>
where
    F: FnMut(&InterruptSignal) -> Result<()> + Send,
{
    /// Wrap a closure as a setup step
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> TorSetupStep for FnStep<F>
where
    F: FnMut(&InterruptSignal) -> Result<()> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, interrupt: &InterruptSignal) -> Result<()> {
        (self.f)(interrupt)
    }
}

/// Creates the Tor working and hidden service directories
pub struct PrepareDirectories {
    paths: TorPaths,
}

impl PrepareDirectories {
    /// Step for `paths`
    pub fn new(paths: TorPaths) -> Self {
        Self { paths }
    }
}

impl TorSetupStep for PrepareDirectories {
    fn name(&self) -> &str {
        "prepare_directories"
    }

    fn run(&mut self, _interrupt: &InterruptSignal) -> Result<()> {
        std::fs::create_dir_all(&self.paths.hidden_service_dir)?;
        debug!(
            event = "tor_dirs_ready",
            tor_dir = %self.paths.tor_dir.display(),
            hidden_service_dir = %self.paths.hidden_service_dir.display(),
            "Tor directories ready"
        );
        Ok(())
    }
}

/// Waits for the Tor control or SOCKS port to accept connections
pub struct PortProbe {
    addr: SocketAddr,
    connect_timeout: Duration,
    retry_delay: Duration,
    max_wait: Option<Duration>,
}

impl PortProbe {
    /// Probe `addr` until it accepts a connection
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(2),
            retry_delay: Duration::from_millis(500),
            max_wait: None,
        }
    }

    /// Delay between attempts
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Give up after `max_wait`
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

impl TorSetupStep for PortProbe {
    fn name(&self) -> &str {
        "port_probe"
    }

    fn run(&mut self, interrupt: &InterruptSignal) -> Result<()> {
        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            if interrupt.is_interrupted() {
                return Err(Error::Interrupted);
            }
            attempts += 1;
            match TcpStream::connect_timeout(&self.addr, self.connect_timeout) {
                Ok(_) => {
                    debug!(event = "tor_port_open", addr = %self.addr, attempts = attempts, "Tor port reachable");
                    return Ok(());
                }
                Err(e) => {
                    if let Some(max_wait) = self.max_wait {
                        if started.elapsed() >= max_wait {
                            return Err(Error::Connection(format!(
                                "{} unreachable after {} attempts: {}",
                                self.addr, attempts, e
                            )));
                        }
                    }
                    debug!(event = "tor_port_retry", addr = %self.addr, error = %e, "Tor port not reachable yet");
                    thread::sleep(self.retry_delay);
                }
            }
        }
    }
}

/// How the setup routine ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// All steps succeeded and the barrier is open
    Ready,
    /// Shutdown was requested; the barrier stays closed
    Abandoned {
        /// Step running or about to run
        step: String,
    },
    /// A step failed; the barrier stays closed
    Failed {
        /// Failing step
        step: String,
        /// Error description
        error: String,
    },
}

/// Marks the barrier abandoned when the setup routine exits, including by
/// panic. No effect if the barrier was opened first.
struct AbandonOnExit(Arc<BootstrapBarrier>);

impl Drop for AbandonOnExit {
    fn drop(&mut self) {
        self.0.abandon();
    }
}

/// Drives the Tor setup steps and opens the barrier on success
pub struct TorBootstrap {
    barrier: Arc<BootstrapBarrier>,
    interrupt: InterruptSignal,
    steps: Vec<Box<dyn TorSetupStep>>,
}

impl TorBootstrap {
    /// Create a routine that will open `barrier`
    pub fn new(barrier: Arc<BootstrapBarrier>, interrupt: InterruptSignal) -> Self {
        Self {
            barrier,
            interrupt,
            steps: Vec::new(),
        }
    }

    /// Append a step
    pub fn step(mut self, step: impl TorSetupStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Run all steps on the current thread.
    ///
    /// Shutdown is checked before every step. The barrier is opened only
    /// after the last step succeeds; on any other exit it is marked
    /// abandoned so interruptible waiters stop waiting.
    pub fn run(mut self) -> BootstrapOutcome {
        info!(event = "tor_bootstrap_start", steps = self.steps.len(), "Starting Tor bootstrap...");
        self.barrier.mark_initializing();
        let _exit = AbandonOnExit(Arc::clone(&self.barrier));

        for step in self.steps.iter_mut() {
            let name = step.name().to_string();
            if self.interrupt.is_interrupted() {
                info!(event = "tor_bootstrap_abandoned", step = %name, "Tor bootstrap abandoned on shutdown");
                return BootstrapOutcome::Abandoned { step: name };
            }

            debug!(event = "tor_bootstrap_step", step = %name, "Running Tor setup step");
            match step.run(&self.interrupt) {
                Ok(()) => {}
                Err(Error::Interrupted) => {
                    info!(event = "tor_bootstrap_abandoned", step = %name, "Tor bootstrap abandoned on shutdown");
                    return BootstrapOutcome::Abandoned { step: name };
                }
                Err(e) => {
                    error!(
                        event = "tor_bootstrap_failed",
                        step = %name,
                        error = %e,
                        "Tor bootstrap failed; peer networking stays blocked"
                    );
                    return BootstrapOutcome::Failed {
                        step: name,
                        error: e.to_string(),
                    };
                }
            }
        }

        self.barrier.signal_ready();
        info!(event = "tor_bootstrap_complete", "Tor bootstrap complete!");
        BootstrapOutcome::Ready
    }

    /// Run on a dedicated thread
    pub fn spawn(self) -> Result<JoinHandle<BootstrapOutcome>> {
        thread::Builder::new()
            .name("torcontrol".to_string())
            .spawn(move || self.run())
            .map_err(|e| Error::Tor(format!("Failed to spawn bootstrap thread: {}", e)))
    }
}
