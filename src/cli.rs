// 命令行参数解析
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "image-scp")]
#[command(about = "Securely copy container images between hosts and users")]
#[command(version = "0.1.0")]
#[command(after_help = "Examples:\n  image-scp myimage:latest otherhost::\n  image-scp otherhost::myimage\n  image-scp root@localhost::myimage")]
pub struct Cli {
    /// IMAGE, HOST::, HOST::IMAGE or USER@localhost::IMAGE
    #[arg(required = true, num_args = 1..=2, value_name = "ARGS")]
    pub args: Vec<String>,

    /// Suppress the output
    #[arg(short, long)]
    pub quiet: bool,

    /// Local container engine used for save and load
    #[arg(long, default_value = "podman")]
    pub engine: PathBuf,

    /// Container engine invoked on remote hosts
    #[arg(long, default_value = "podman")]
    pub remote_engine: String,

    /// Global engine flag replayed before every local save/load (repeatable)
    #[arg(long = "engine-flag", value_name = "FLAG", allow_hyphen_values = true)]
    pub engine_flags: Vec<String>,

    /// Connection configuration file (containers.conf format)
    #[arg(long, value_name = "FILE")]
    pub connections: Option<PathBuf>,

    /// Directory for the temporary image archive
    #[arg(long, value_name = "DIR")]
    pub tmpdir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positionals_and_flags() {
        let cli = Cli::try_parse_from([
            "image-scp",
            "-q",
            "--engine-flag",
            "--root=/var/lib/containers",
            "--engine-flag=--log-level=debug",
            "busybox",
            "myhost::",
        ])
        .unwrap();
        assert_eq!(cli.args, vec!["busybox", "myhost::"]);
        assert!(cli.quiet);
        assert_eq!(cli.engine_flags, vec!["--root=/var/lib/containers", "--log-level=debug"]);
        assert_eq!(cli.engine, PathBuf::from("podman"));
    }

    #[test]
    fn rejects_three_positionals() {
        assert!(Cli::try_parse_from(["image-scp", "a", "b", "c"]).is_err());
    }

    #[test]
    fn requires_a_positional() {
        assert!(Cli::try_parse_from(["image-scp"]).is_err());
    }
}
