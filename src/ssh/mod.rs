// SSH模块入口
pub mod client;
pub mod session;

pub use client::{SshClient, SshDialer};
pub use session::RemoteSession;

use crate::plan::Endpoint;
use anyhow::Result;
use std::path::Path;

/// What the transfer driver needs from a connected remote host.
pub trait RemoteHost {
    /// Runs one command and returns its stdout. A non-zero exit is an error.
    fn exec(&self, command: &str) -> Result<String>;

    /// Copies `remote_path` into `local_path`, returning the bytes moved.
    fn copy_from(&self, remote_path: &str, local_path: &Path) -> Result<u64>;

    /// Copies `local_path` into `remote_path`, returning the bytes moved.
    fn copy_to(&self, local_path: &Path, remote_path: &str) -> Result<u64>;
}

pub trait Dialer {
    type Host: RemoteHost;

    fn dial(&self, endpoint: &Endpoint) -> Result<Self::Host>;
}
