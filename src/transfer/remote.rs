// 远程传输：在远程主机上 save / load，并通过 scp 复制归档
use crate::plan::Endpoint;
use crate::ssh::{Dialer, RemoteHost, RemoteSession};
use crate::utils::error::TransferError;
use crate::utils::file::shell_quote;
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;

pub struct RemoteDriver<'a, D: Dialer> {
    dialer: &'a D,
    remote_engine: &'a str,
}

impl<'a, D: Dialer> RemoteDriver<'a, D> {
    pub fn new(dialer: &'a D, remote_engine: &'a str) -> Self {
        RemoteDriver { dialer, remote_engine }
    }

    /// Saves `image` on the remote host and copies the archive to `local_file`.
    pub fn pull_from_remote(&self, image: &str, local_file: &Path, tag: Option<&str>, endpoint: &Endpoint) -> Result<()> {
        reject_rename(tag)?;
        let session = RemoteSession::open(self.dialer, endpoint)?;
        let remote_file = session.remote_file();

        let run = format!(
            "{} image save {} --format=oci-archive --output={}",
            shell_quote(self.remote_engine),
            shell_quote(image),
            shell_quote(remote_file)
        );
        if let Err(e) = session.host().exec(&run) {
            session.remove_remote_file();
            return Err(e).with_context(|| format!("Failed to save {} on {}", image, endpoint.destination()));
        }

        info!("Copying {} from {}", image, endpoint.destination());
        let copied = session.host().copy_from(remote_file, local_file);
        // 无论复制是否成功都清理远程文件
        session.remove_remote_file();

        let bytes = copied.with_context(|| format!("Failed to copy {} from {}", remote_file, endpoint.destination()))?;
        debug!("Copied {} bytes into {}", bytes, local_file.display());
        Ok(())
    }

    /// Copies `local_file` to the remote host and loads it there, returning the load output.
    pub fn push_to_remote(&self, local_file: &Path, tag: Option<&str>, endpoint: &Endpoint) -> Result<String> {
        reject_rename(tag)?;
        let session = RemoteSession::open(self.dialer, endpoint)?;
        let remote_file = session.remote_file();

        info!("Copying {} to {}", local_file.display(), endpoint.destination());
        match session.host().copy_to(local_file, remote_file) {
            Ok(bytes) => debug!("Copied {} bytes into {}", bytes, remote_file),
            Err(e) => {
                session.remove_remote_file();
                return Err(e).with_context(|| format!("Failed to copy to {}", endpoint.destination()));
            }
        }

        // load 和 rm 在同一条远程命令里，保留 load 的退出码
        let file = shell_quote(remote_file);
        let run = format!(
            "{} image load --input={}; rc=$?; rm {}; exit $rc",
            shell_quote(self.remote_engine),
            file,
            file
        );
        let output = session
            .host()
            .exec(&run)
            .with_context(|| format!("Failed to load image on {}", endpoint.destination()))?;
        Ok(output.trim_end_matches('\n').to_string())
    }
}

fn reject_rename(tag: Option<&str>) -> Result<(), TransferError> {
    match tag {
        Some(tag) if !tag.is_empty() => Err(TransferError::rename_unsupported()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::testing::{endpoint, FakeDialer};

    #[test]
    fn pull_saves_copies_and_cleans_up() {
        let dialer = FakeDialer::default();
        let driver = RemoteDriver::new(&dialer, "podman");
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("archive");

        driver.pull_from_remote("busybox", &local, None, &endpoint("hostA")).unwrap();

        assert_eq!(std::fs::read(&local).unwrap(), b"oci-archive:busybox");
        let state = dialer.state();
        assert_eq!(
            state.commands,
            [
                "mktemp",
                "podman image save busybox --format=oci-archive --output=/tmp/tmp.1",
                "rm /tmp/tmp.1",
            ]
        );
        assert!(state.files.is_empty());
        assert_eq!(state.closed, 1);
    }

    #[test]
    fn pull_copy_failure_reports_bytes_and_still_cleans_up() {
        let dialer = FakeDialer::default();
        dialer.fail_copy_after(7);
        let driver = RemoteDriver::new(&dialer, "podman");
        let dir = tempfile::tempdir().unwrap();

        let err = driver
            .pull_from_remote("busybox", &dir.path().join("archive"), None, &endpoint("hostA"))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TransferError>(),
            Some(TransferError::PartialCopy { bytes: 7, .. })
        ));
        assert!(format!("{:#}", err).contains("7 Bytes copied before error"));
        let state = dialer.state();
        assert_eq!(state.commands.last().unwrap(), "rm /tmp/tmp.1");
        assert_eq!(state.closed, 1);
    }

    #[test]
    fn pull_remote_save_failure_is_surfaced() {
        let dialer = FakeDialer::default();
        dialer.fail_command("image save");
        let driver = RemoteDriver::new(&dialer, "podman");
        let dir = tempfile::tempdir().unwrap();

        let err = driver
            .pull_from_remote("busybox", &dir.path().join("archive"), None, &endpoint("hostA"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransferError>(),
            Some(TransferError::RemoteCommandFailure { .. })
        ));
        assert_eq!(dialer.state().commands.last().unwrap(), "rm /tmp/tmp.1");
    }

    #[test]
    fn push_copies_then_loads_and_removes_in_one_command() {
        let dialer = FakeDialer::default();
        let driver = RemoteDriver::new(&dialer, "podman");
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("archive");
        std::fs::write(&local, b"oci-archive:alpine").unwrap();

        let output = driver.push_to_remote(&local, None, &endpoint("hostB")).unwrap();

        assert_eq!(output, "Loaded image: oci-archive:alpine");
        let state = dialer.state();
        assert_eq!(
            state.commands,
            ["mktemp", "podman image load --input=/tmp/tmp.1; rc=$?; rm /tmp/tmp.1; exit $rc"]
        );
        assert_eq!(state.loaded, [b"oci-archive:alpine".to_vec()]);
        assert!(state.files.is_empty());
        assert_eq!(state.closed, 1);
    }

    #[test]
    fn push_copy_failure_removes_remote_file() {
        let dialer = FakeDialer::default();
        dialer.fail_copy_after(3);
        let driver = RemoteDriver::new(&dialer, "podman");
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("archive");
        std::fs::write(&local, b"oci-archive:alpine").unwrap();

        let err = driver.push_to_remote(&local, None, &endpoint("hostB")).unwrap_err();

        assert!(format!("{:#}", err).contains("3 Bytes copied before error"));
        let state = dialer.state();
        assert_eq!(state.commands, ["mktemp", "rm /tmp/tmp.1"]);
        assert!(state.loaded.is_empty());
    }

    #[test]
    fn dial_failure_is_a_connection_failure() {
        let dialer = FakeDialer::default();
        dialer.fail_dial();
        let driver = RemoteDriver::new(&dialer, "podman");
        let dir = tempfile::tempdir().unwrap();

        let err = driver
            .pull_from_remote("busybox", &dir.path().join("archive"), None, &endpoint("hostA"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransferError>(),
            Some(TransferError::ConnectionFailure { .. })
        ));
        assert!(dialer.state().commands.is_empty());
    }

    #[test]
    fn rename_is_rejected_before_dialing() {
        let dialer = FakeDialer::default();
        let driver = RemoteDriver::new(&dialer, "podman");
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("archive");

        let err = driver.push_to_remote(&local, Some("newname"), &endpoint("hostB")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransferError>(),
            Some(TransferError::InvalidArgument(_))
        ));
        let err = driver
            .pull_from_remote("busybox", &local, Some("newname"), &endpoint("hostA"))
            .unwrap_err();
        assert!(err.to_string().contains("renaming"));
        assert!(dialer.state().dials.is_empty());
    }

    #[test]
    fn remote_values_are_quoted() {
        let dialer = FakeDialer::default();
        let driver = RemoteDriver::new(&dialer, "/opt/my engine/podman");
        let dir = tempfile::tempdir().unwrap();

        driver
            .pull_from_remote("busybox", &dir.path().join("archive"), None, &endpoint("hostA"))
            .unwrap();
        assert_eq!(
            dialer.state().commands[1],
            "'/opt/my engine/podman' image save busybox --format=oci-archive --output=/tmp/tmp.1"
        );
    }
}
