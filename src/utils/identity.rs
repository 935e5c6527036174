// 本地用户身份查询
use crate::utils::error::TransferError;
use anyhow::{Context, Result};
use nix::unistd::{geteuid, Uid, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub uid: u32,
}

impl Account {
    pub fn root() -> Self {
        Account { name: "root".to_string(), uid: 0 }
    }

    pub fn is_root(&self) -> bool {
        self.uid == 0
    }
}

impl From<User> for Account {
    fn from(user: User) -> Self {
        Account { name: user.name, uid: user.uid.as_raw() }
    }
}

pub fn is_rootless() -> bool {
    !geteuid().is_root()
}

/// Account of the effective user running this process.
pub fn current_account() -> Result<Account> {
    let uid = geteuid();
    let user = User::from_uid(uid)
        .context("Failed to look up current user")?
        .ok_or_else(|| TransferError::UnknownUser { user: uid.to_string() })?;
    Ok(user.into())
}

/// The user that started the transfer: `$USER` when rootless, `$SUDO_USER` under sudo.
pub fn invoking_user() -> Option<String> {
    let var = if is_rootless() { "USER" } else { "SUDO_USER" };
    std::env::var(var).ok().filter(|name| !name.is_empty())
}

/// Resolves a user given by name or as `uid[:gid]`.
pub fn lookup_account(name_or_id: &str) -> Result<Account> {
    // uid:gid 形式只取前半部分
    let half = name_or_id.split(':').next().unwrap_or(name_or_id);
    let user = match half.parse::<u32>() {
        Ok(uid) => User::from_uid(Uid::from_raw(uid)),
        Err(_) => User::from_name(half),
    }
    .with_context(|| format!("Failed to look up user {}", name_or_id))?;

    user.map(Account::from)
        .ok_or_else(|| TransferError::UnknownUser { user: name_or_id.to_string() }.into())
}

/// A cross-user transfer may only target root or the invoking rootless user.
pub fn check_transfer_target(target: &Account, invoking: Option<&str>) -> Result<(), TransferError> {
    match invoking {
        Some(name) if name != target.name && !target.is_root() => {
            Err(TransferError::PrivilegeMismatch { user: target.name.clone() })
        }
        _ => Ok(()),
    }
}

/// Login name used when a connection URI carries no user info.
pub fn default_username() -> Result<String> {
    match current_account() {
        Ok(account) => Ok(account.name),
        Err(e) => std::env::var("USER")
            .ok()
            .filter(|name| !name.is_empty())
            .ok_or(e),
    }
}
