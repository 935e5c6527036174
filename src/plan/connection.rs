// 连接别名解析
use crate::config::ServiceDestinations;
use crate::utils::error::TransferError;
use anyhow::{Context, Result};
use log::warn;
use std::path::PathBuf;
use url::Url;

/// A remote endpoint ready to be dialed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub uri: Url,
    pub identity: Option<PathBuf>,
}

impl Endpoint {
    pub fn port(&self) -> u16 {
        self.uri.port().unwrap_or(22)
    }

    pub fn host(&self) -> &str {
        self.uri.host_str().unwrap_or_default()
    }

    pub fn username(&self) -> &str {
        self.uri.username()
    }

    /// `user@host:port`, for messages.
    pub fn destination(&self) -> String {
        format!("{}@{}:{}", self.username(), self.host(), self.port())
    }
}

/// Looks up `alias` in the store, or synthesizes an unmanaged `ssh://alias` destination.
pub fn resolve_connection(alias: &str, destinations: &ServiceDestinations) -> (String, Option<PathBuf>) {
    match destinations.get(alias) {
        Some(dest) => (dest.uri.clone(), dest.identity_path()),
        None => {
            warn!(
                "Unknown connection name {:?} given. Please use system connection add to specify the default remote socket location",
                alias
            );
            (format!("ssh://{}", alias), None)
        }
    }
}

/// Resolves `alias` to an endpoint, filling in `default_user` when the URI names no user.
pub fn resolve_endpoint(alias: &str, destinations: &ServiceDestinations, default_user: &str) -> Result<Endpoint> {
    if alias.is_empty() {
        return Err(TransferError::InvalidArgument("no host provided before \"::\"".to_string()).into());
    }

    let (uri, identity) = resolve_connection(alias, destinations);
    let mut uri = Url::parse(&uri).with_context(|| format!("Invalid connection URI {:?}", uri))?;
    if uri.host_str().map_or(true, str::is_empty) {
        return Err(TransferError::InvalidArgument(format!("connection {:?} has no host", alias)).into());
    }
    if uri.username().is_empty() {
        uri.set_username(default_user)
            .map_err(|_| TransferError::InvalidArgument(format!("cannot set user on {}", uri)))?;
    }

    Ok(Endpoint { uri, identity })
}
