use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no image provided")]
    NoImage,

    #[error("temporary file {path} already exists. If this issue persists please clear out the temporary directory")]
    StaleArtifact { path: String },

    #[error("failed to connect to {destination}: {message}")]
    ConnectionFailure { destination: String, message: String },

    #[error("{bytes} Bytes copied before error: {source}")]
    PartialCopy {
        bytes: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("remote command `{command}` exited with status {status}: {stderr}")]
    RemoteCommandFailure {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("{program} failed: {status}")]
    LocalExecFailure { program: String, status: String },

    #[error("the given user {user} must be the default rootless user or root")]
    PrivilegeMismatch { user: String },

    #[error("unknown user: {user}")]
    UnknownUser { user: String },
}

impl TransferError {
    pub fn rename_unsupported() -> Self {
        TransferError::InvalidArgument("renaming of an image is currently not supported".to_string())
    }
}
