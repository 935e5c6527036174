// SSH客户端封装
use crate::plan::Endpoint;
use crate::ssh::{Dialer, RemoteHost};
use crate::transfer::progress::ProgressTracker;
use crate::utils::error::TransferError;
use crate::utils::file::{copy_counted, drain_streams};
use anyhow::{Context, Result};
use dialoguer::Password;
use log::debug;
use ssh2::Session;
use std::fs::File;
use std::io::prelude::*;
use std::net::TcpStream;
use std::path::{Path, PathBuf};

const DEFAULT_KEYS: [&str; 3] = ["id_ed25519", "id_ecdsa", "id_rsa"];

pub struct SshClient {
    pub session: Session,
    quiet: bool,
}

impl SshClient {
    pub fn connect(endpoint: &Endpoint, quiet: bool) -> Result<Self> {
        let destination = endpoint.destination();
        let failure = |message: String| TransferError::ConnectionFailure {
            destination: destination.clone(),
            message,
        };

        debug!("Connecting to {}...", destination);
        let tcp = TcpStream::connect((endpoint.host(), endpoint.port())).map_err(|e| failure(e.to_string()))?;

        let mut session = Session::new().context("Failed to create SSH session")?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| failure(format!("SSH handshake failed: {}", e)))?;

        Self::authenticate(&session, endpoint).map_err(|e| failure(format!("{:#}", e)))?;

        debug!("Authenticated to {}", destination);
        Ok(SshClient { session, quiet })
    }

    // 认证顺序：身份文件、URI 中的密码、SSH agent、默认密钥、交互式密码
    fn authenticate(session: &Session, endpoint: &Endpoint) -> Result<()> {
        let user = endpoint.username();

        if let Some(identity) = &endpoint.identity {
            session
                .userauth_pubkey_file(user, None, identity, None)
                .with_context(|| format!("Public key authentication with {} failed", identity.display()))?;
            return Self::ensure_authenticated(session);
        }

        if let Some(password) = endpoint.uri.password() {
            session
                .userauth_password(user, password)
                .context("Password authentication failed")?;
            return Self::ensure_authenticated(session);
        }

        match session.userauth_agent(user) {
            Ok(()) if session.authenticated() => return Ok(()),
            Ok(()) => {}
            Err(e) => debug!("SSH agent authentication failed: {}", e),
        }

        for key_path in Self::default_keys() {
            match session.userauth_pubkey_file(user, None, &key_path, None) {
                Ok(()) if session.authenticated() => {
                    debug!("Authenticated with {}", key_path.display());
                    return Ok(());
                }
                Ok(()) => {}
                Err(e) => debug!("Key {} rejected: {}", key_path.display(), e),
            }
        }

        let password = Password::new()
            .with_prompt(format!("Enter password for {}", endpoint.destination()))
            .interact()
            .context("No usable SSH credentials")?;
        session
            .userauth_password(user, &password)
            .context("Password authentication failed")?;
        Self::ensure_authenticated(session)
    }

    fn ensure_authenticated(session: &Session) -> Result<()> {
        if session.authenticated() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("Authentication failed"))
        }
    }

    fn default_keys() -> Vec<PathBuf> {
        let Some(home) = home::home_dir() else {
            return Vec::new();
        };
        let ssh_dir = home.join(".ssh");
        DEFAULT_KEYS
            .iter()
            .map(|name| ssh_dir.join(name))
            .filter(|path| path.exists())
            .collect()
    }
}

impl RemoteHost for SshClient {
    fn exec(&self, command: &str) -> Result<String> {
        debug!("Running remote command: {}", command);
        let mut channel = self.session.channel_session()
            .context("Failed to create SSH channel")?;

        channel.exec(command)
            .context("Failed to execute command")?;

        // stdout 与 stderr 同时读取，任何一路都不会占满通道窗口
        self.session.set_blocking(false);
        let mut stdout_stream = channel.stream(0);
        let mut stderr_stream = channel.stderr();
        let drained = drain_streams(&mut stdout_stream, &mut stderr_stream, || channel.eof());
        self.session.set_blocking(true);
        let (stdout, stderr) = drained.context("Failed to read command output")?;
        let output = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr);

        channel.wait_close()
            .context("Failed to close channel")?;

        let status = channel.exit_status().context("Failed to read exit status")?;
        if status != 0 {
            return Err(TransferError::RemoteCommandFailure {
                command: command.to_string(),
                status,
                stderr: stderr.trim().to_string(),
            }
            .into());
        }
        Ok(output)
    }

    fn copy_from(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        let (mut channel, stat) = self.session
            .scp_recv(Path::new(remote_path))
            .with_context(|| format!("Failed to open remote file {}", remote_path))?;
        let size = stat.size();

        let mut local_file = File::create(local_path)
            .with_context(|| format!("Failed to create {}", local_path.display()))?;
        let progress = ProgressTracker::for_copy(size, &format!("Copying {}", remote_path), self.quiet);

        // scp 通道在文件末尾还有一个结束字节，只读取 size 字节
        let copied = copy_counted(&mut Read::take(&mut channel, size), &mut local_file, &progress)?;
        if copied < size {
            return Err(TransferError::PartialCopy {
                bytes: copied,
                source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "remote file ended early"),
            }
            .into());
        }

        channel.send_eof()?;
        channel.wait_eof()?;
        channel.close()?;
        channel.wait_close()?;
        Ok(copied)
    }

    fn copy_to(&self, local_path: &Path, remote_path: &str) -> Result<u64> {
        let mut local_file = File::open(local_path)
            .with_context(|| format!("Failed to open local file: {}", local_path.display()))?;
        let size = local_file.metadata()?.len();

        let mut channel = self.session
            .scp_send(Path::new(remote_path), 0o600, size, None)
            .with_context(|| format!("Failed to open remote file {}", remote_path))?;
        let progress = ProgressTracker::for_copy(size, &format!("Copying {}", local_path.display()), self.quiet);

        let copied = copy_counted(&mut local_file, &mut channel, &progress)?;

        channel.send_eof()?;
        channel.wait_eof()?;
        channel.close()?;
        channel.wait_close()?;
        Ok(copied)
    }
}

impl Drop for SshClient {
    fn drop(&mut self) {
        if let Err(e) = self.session.disconnect(None, "transfer finished", None) {
            debug!("SSH disconnect failed: {}", e);
        }
    }
}

/// Opens real SSH sessions.
pub struct SshDialer {
    pub quiet: bool,
}

impl Dialer for SshDialer {
    type Host = SshClient;

    fn dial(&self, endpoint: &Endpoint) -> Result<SshClient> {
        SshClient::connect(endpoint, self.quiet)
    }
}
