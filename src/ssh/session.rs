// SSH会话管理：会话与远程临时文件一起创建、一起释放
use crate::plan::Endpoint;
use crate::ssh::{Dialer, RemoteHost};
use crate::utils::file::shell_quote;
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};

pub struct RemoteSession<H: RemoteHost> {
    host: H,
    remote_file: String,
}

impl<H: RemoteHost> RemoteSession<H> {
    /// Dials `endpoint` and provisions a remote temporary file with `mktemp`.
    ///
    /// The session closes when this value is dropped.
    pub fn open<D: Dialer<Host = H>>(dialer: &D, endpoint: &Endpoint) -> Result<Self> {
        let host = dialer.dial(endpoint)?;
        let remote_file = Self::make_remote_file(&host)
            .with_context(|| format!("Failed to create a temporary file on {}", endpoint.destination()))?;
        debug!("Remote temporary file: {}", remote_file);
        Ok(RemoteSession { host, remote_file })
    }

    fn make_remote_file(host: &H) -> Result<String> {
        let output = host.exec("mktemp")?;
        let remote_file = output.trim_end_matches('\n').to_string();
        if remote_file.is_empty() {
            return Err(anyhow!("mktemp returned no file name"));
        }
        Ok(remote_file)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn remote_file(&self) -> &str {
        &self.remote_file
    }

    /// Best-effort removal of the remote file; failures are only logged.
    pub fn remove_remote_file(&self) {
        if let Err(e) = self.host.exec(&format!("rm {}", shell_quote(&self.remote_file))) {
            warn!("Failed to remove remote file {}: {:#}", self.remote_file, e);
        }
    }
}
