// 测试用的远程主机和本地引擎
use crate::plan::Endpoint;
use crate::ssh::{Dialer, RemoteHost};
use crate::transfer::local::LocalEngine;
use crate::transfer::progress::ProgressTracker;
use crate::utils::error::TransferError;
use crate::utils::file::copy_counted;
use crate::utils::identity::Account;
use anyhow::Result;
use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::io::{Cursor, ErrorKind, Read};
use std::path::Path;
use std::rc::Rc;
use url::Url;

pub fn endpoint(host: &str) -> Endpoint {
    Endpoint {
        uri: Url::parse(&format!("ssh://tester@{}", host)).unwrap(),
        identity: None,
    }
}

#[derive(Debug, Default)]
pub struct RemoteState {
    pub dials: Vec<String>,
    pub commands: Vec<String>,
    pub files: HashMap<String, Vec<u8>>,
    pub loaded: Vec<Vec<u8>>,
    pub closed: usize,
    mktemp_count: usize,
    fail_copy_after: Option<u64>,
    fail_command: Option<String>,
    fail_dial: bool,
}

#[derive(Default, Clone)]
pub struct FakeDialer {
    state: Rc<RefCell<RemoteState>>,
}

impl FakeDialer {
    pub fn state(&self) -> Ref<'_, RemoteState> {
        self.state.borrow()
    }

    pub fn fail_copy_after(&self, bytes: u64) {
        self.state.borrow_mut().fail_copy_after = Some(bytes);
    }

    pub fn fail_command(&self, needle: &str) {
        self.state.borrow_mut().fail_command = Some(needle.to_string());
    }

    pub fn fail_dial(&self) {
        self.state.borrow_mut().fail_dial = true;
    }
}

impl Dialer for FakeDialer {
    type Host = FakeHost;

    fn dial(&self, endpoint: &Endpoint) -> Result<FakeHost> {
        let mut state = self.state.borrow_mut();
        if state.fail_dial {
            return Err(TransferError::ConnectionFailure {
                destination: endpoint.destination(),
                message: "connection refused".to_string(),
            }
            .into());
        }
        state.dials.push(endpoint.host().to_string());
        Ok(FakeHost { state: Rc::clone(&self.state) })
    }
}

pub struct FakeHost {
    state: Rc<RefCell<RemoteState>>,
}

fn flag_value<'a>(command: &'a str, flag: &str) -> Option<&'a str> {
    command
        .split_whitespace()
        .find_map(|word| word.strip_prefix(flag))
        .map(|value| value.trim_end_matches(';'))
}

struct FailAfter<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> Read for FailAfter<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 {
            return Err(std::io::Error::new(ErrorKind::BrokenPipe, "connection lost"));
        }
        let len = buf.len().min(self.remaining as usize);
        let n = self.inner.read(&mut buf[..len])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

impl FakeHost {
    fn copy(&self, data: Vec<u8>, sink: &mut Vec<u8>) -> Result<u64> {
        let fail_after = self.state.borrow().fail_copy_after;
        let progress = ProgressTracker::hidden();
        let copied = match fail_after {
            Some(limit) => copy_counted(&mut FailAfter { inner: Cursor::new(data), remaining: limit }, sink, &progress)?,
            None => copy_counted(&mut Cursor::new(data), sink, &progress)?,
        };
        Ok(copied)
    }
}

impl RemoteHost for FakeHost {
    fn exec(&self, command: &str) -> Result<String> {
        let mut state = self.state.borrow_mut();
        state.commands.push(command.to_string());

        if let Some(needle) = &state.fail_command {
            if command.contains(needle.as_str()) {
                return Err(TransferError::RemoteCommandFailure {
                    command: command.to_string(),
                    status: 125,
                    stderr: "Error: no such image".to_string(),
                }
                .into());
            }
        }

        if command == "mktemp" {
            state.mktemp_count += 1;
            let name = format!("/tmp/tmp.{}", state.mktemp_count);
            state.files.insert(name.clone(), Vec::new());
            return Ok(format!("{}\n", name));
        }
        if command.contains(" image save ") {
            let image = command.split_whitespace().nth(3).unwrap_or_default().to_string();
            let output = flag_value(command, "--output=").unwrap_or_default().to_string();
            state.files.insert(output, format!("oci-archive:{}", image).into_bytes());
            return Ok(String::new());
        }
        if command.contains(" image load ") {
            let input = flag_value(command, "--input=").unwrap_or_default().to_string();
            let data = state.files.remove(&input).unwrap_or_default();
            let output = format!("Loaded image: {}\n", String::from_utf8_lossy(&data));
            state.loaded.push(data);
            return Ok(output);
        }
        if let Some(path) = command.strip_prefix("rm ") {
            state.files.remove(path);
            return Ok(String::new());
        }
        Ok(String::new())
    }

    fn copy_from(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        let data = self.state.borrow().files.get(remote_path).cloned().unwrap_or_default();
        let mut sink = Vec::new();
        let result = self.copy(data, &mut sink);
        std::fs::write(local_path, &sink)?;
        result
    }

    fn copy_to(&self, local_path: &Path, remote_path: &str) -> Result<u64> {
        let data = std::fs::read(local_path)?;
        let mut sink = Vec::new();
        let copied = self.copy(data, &mut sink)?;
        self.state.borrow_mut().files.insert(remote_path.to_string(), sink);
        Ok(copied)
    }
}

impl Drop for FakeHost {
    fn drop(&mut self) {
        self.state.borrow_mut().closed += 1;
    }
}

/// Records every save/load and checks the staging file lifecycle.
#[derive(Default)]
pub struct FakeEngine {
    pub calls: RefCell<Vec<String>>,
    pub loaded: RefCell<Vec<Vec<u8>>>,
    pub fail_load: bool,
}

impl LocalEngine for FakeEngine {
    fn save(&self, image: &str, output: &Path, as_user: &Account) -> Result<()> {
        assert!(!output.exists(), "save target must not exist before save");
        std::fs::write(output, format!("oci-archive:{}", image))?;
        self.calls.borrow_mut().push(format!("save {} as {}", image, as_user.name));
        Ok(())
    }

    fn load(&self, input: &Path, as_user: &Account) -> Result<()> {
        self.calls.borrow_mut().push(format!("load as {}", as_user.name));
        if self.fail_load {
            return Err(TransferError::LocalExecFailure {
                program: "podman".to_string(),
                status: "exit status: 125".to_string(),
            }
            .into());
        }
        self.loaded.borrow_mut().push(std::fs::read(input)?);
        Ok(())
    }
}
