// 本地执行：以正确的系统用户运行 save / load
use crate::utils::error::TransferError;
use crate::utils::identity::Account;
use anyhow::Result;
use log::debug;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

const SESSION_BROKER: &str = "machinectl";
const LOGIN_SHELL_SCRIPT: &str = r#"exec "$0" "$@""#;

/// Save or load against the local engine, run as a chosen account.
pub trait LocalEngine {
    fn save(&self, image: &str, output: &Path, as_user: &Account) -> Result<()>;

    fn load(&self, input: &Path, as_user: &Account) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand<'a> {
    Save { image: &'a str, output: &'a Path },
    Load { input: &'a Path },
}

impl EngineCommand<'_> {
    pub fn args(&self, quiet: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match self {
            EngineCommand::Save { image, output } => {
                args.push("save".into());
                if quiet {
                    args.push("-q".into());
                }
                args.push("--format=oci-archive".into());
                args.push("--output".into());
                args.push(output.as_os_str().to_owned());
                args.push((*image).into());
            }
            EngineCommand::Load { input } => {
                args.push("load".into());
                if quiet {
                    args.push("-q".into());
                }
                args.push("--input".into());
                args.push(input.as_os_str().to_owned());
            }
        }
        args
    }

    fn name(&self) -> &'static str {
        match self {
            EngineCommand::Save { .. } => "save",
            EngineCommand::Load { .. } => "load",
        }
    }
}

/// How the engine is started for a target account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// The process already runs as the target account.
    Direct,
    /// `machinectl shell` into a host login session.
    SessionBroker(PathBuf),
    /// `su -l` login shell.
    LoginShell,
}

impl Strategy {
    pub fn choose(current: &Account, target: &Account) -> Self {
        if current.uid == target.uid {
            return Strategy::Direct;
        }
        match which::which(SESSION_BROKER) {
            Ok(path) => Strategy::SessionBroker(path),
            Err(_) => Strategy::LoginShell,
        }
    }
}

/// A fully built argument vector; nothing here goes through shell interpolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn build(strategy: &Strategy, target: &Account, engine: &Path, parent_flags: &[String], subcommand: Vec<OsString>) -> Self {
        let engine_line = std::iter::once(engine.as_os_str().to_owned())
            .chain(parent_flags.iter().map(OsString::from))
            .chain(subcommand);

        match strategy {
            Strategy::Direct => {
                let mut line = engine_line;
                let program = line.next().unwrap_or_default();
                Invocation { program, args: line.collect() }
            }
            Strategy::SessionBroker(broker) => {
                let mut args: Vec<OsString> =
                    vec!["shell".into(), "-q".into(), format!("{}@.host", target.name).into()];
                args.extend(engine_line);
                Invocation { program: broker.as_os_str().to_owned(), args }
            }
            Strategy::LoginShell => {
                // 命令行作为 $0 "$@" 传给 shell，不拼接字符串；
                // su 会重排参数，"--" 之后的引擎参数不再被 su 解析
                let mut args: Vec<OsString> = vec![
                    "-l".into(),
                    target.name.clone().into(),
                    "--command".into(),
                    LOGIN_SHELL_SCRIPT.into(),
                    "--".into(),
                ];
                args.extend(engine_line);
                Invocation { program: "su".into(), args }
            }
        }
    }
}

/// Runs the local engine as a child process.
pub struct ProcessEngine {
    engine: PathBuf,
    parent_flags: Vec<String>,
    quiet: bool,
    current: Account,
}

impl ProcessEngine {
    pub fn new(engine: PathBuf, parent_flags: Vec<String>, quiet: bool, current: Account) -> Self {
        ProcessEngine { engine, parent_flags, quiet, current }
    }

    pub fn invocation(&self, command: EngineCommand<'_>, as_user: &Account) -> (Strategy, Invocation) {
        let strategy = Strategy::choose(&self.current, as_user);
        let invocation = Invocation::build(&strategy, as_user, &self.engine, &self.parent_flags, command.args(self.quiet));
        (strategy, invocation)
    }

    fn run(&self, command: EngineCommand<'_>, as_user: &Account) -> Result<()> {
        let (strategy, invocation) = self.invocation(command, as_user);
        match strategy {
            Strategy::Direct => debug!("Executing {} command", command.name()),
            Strategy::SessionBroker(_) => debug!("Executing {} command machinectl", command.name()),
            Strategy::LoginShell => debug!("Executing {} command su", command.name()),
        }

        let program = invocation.program.to_string_lossy().into_owned();
        // 继承环境变量和标准输入输出
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .status()
            .map_err(|e| TransferError::LocalExecFailure { program: program.clone(), status: e.to_string() })?;

        if !status.success() {
            return Err(TransferError::LocalExecFailure { program, status: status.to_string() }.into());
        }
        Ok(())
    }
}

impl LocalEngine for ProcessEngine {
    fn save(&self, image: &str, output: &Path, as_user: &Account) -> Result<()> {
        self.run(EngineCommand::Save { image, output }, as_user)
    }

    fn load(&self, input: &Path, as_user: &Account) -> Result<()> {
        self.run(EngineCommand::Load { input }, as_user)
    }
}
