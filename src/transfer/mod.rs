// 传输模块入口：按计划方向组合 save、复制和 load
pub mod local;
pub mod progress;
pub mod remote;
pub mod staging;

#[cfg(test)]
pub(crate) mod testing;

pub use local::{LocalEngine, ProcessEngine};
pub use remote::RemoteDriver;
pub use staging::StagingFile;

use crate::plan::{Direction, Endpoint, TransferPlan};
use crate::ssh::Dialer;
use crate::utils::error::TransferError;
use crate::utils::identity::{self, Account};
use anyhow::{anyhow, Result};
use log::{info, warn};
use std::path::PathBuf;

pub struct Transfer<'a, E: LocalEngine, D: Dialer> {
    engine: &'a E,
    driver: RemoteDriver<'a, D>,
    tmpdir: PathBuf,
    current: Account,
    invoking_user: Option<String>,
}

impl<'a, E: LocalEngine, D: Dialer> Transfer<'a, E, D> {
    pub fn new(
        engine: &'a E,
        driver: RemoteDriver<'a, D>,
        tmpdir: PathBuf,
        current: Account,
        invoking_user: Option<String>,
    ) -> Self {
        Transfer { engine, driver, tmpdir, current, invoking_user }
    }

    /// Executes `plan`, returning the remote load output for pushes.
    pub fn run(&self, plan: &TransferPlan) -> Result<Option<String>> {
        let target = self.load_account(plan)?;
        let staging = StagingFile::allocate(&self.tmpdir)?;
        self.run_staged(plan, &target, staging)
    }

    /// Like [`Transfer::run`], staging the archive at `path`, which must not exist.
    pub fn run_at(&self, plan: &TransferPlan, path: PathBuf) -> Result<Option<String>> {
        let target = self.load_account(plan)?;
        let staging = StagingFile::at(path)?;
        self.run_staged(plan, &target, staging)
    }

    fn run_staged(&self, plan: &TransferPlan, target: &Account, staging: StagingFile) -> Result<Option<String>> {
        if plan.source_image.is_empty() {
            return Err(TransferError::NoImage.into());
        }
        let image = plan.source_image.as_str();
        let file = staging.path();

        let report = match plan.direction {
            Direction::Local | Direction::UserTransfer => {
                self.engine.save(image, file, &self.current)?;
                self.engine.load(file, target)?;
                None
            }
            Direction::PushToRemote => {
                self.engine.save(image, file, &self.current)?;
                Some(self.driver.push_to_remote(file, None, endpoint(plan.push_destination())?)?)
            }
            Direction::PullFromRemote => {
                self.driver
                    .pull_from_remote(image, file, None, endpoint(plan.pull_source())?)?;
                self.engine.load(file, target)?;
                None
            }
            Direction::RemoteToRemote => {
                let source = endpoint(plan.pull_source())?;
                let destination = endpoint(plan.push_destination())?;
                self.driver.pull_from_remote(image, file, None, source)?;
                Some(self.driver.push_to_remote(file, None, destination)?)
            }
        };

        staging.remove()?;
        Ok(report)
    }

    // 确定 load 以哪个用户运行，用户传输时校验目标用户
    fn load_account(&self, plan: &TransferPlan) -> Result<Account> {
        if plan.direction != Direction::UserTransfer {
            return Ok(self.current.clone());
        }

        let target = match plan.target_user.as_deref() {
            Some(user) => {
                let account = identity::lookup_account(user)?;
                identity::check_transfer_target(&account, self.invoking_user.as_deref())?;
                account
            }
            None => {
                let name = self.invoking_user.as_deref().ok_or_else(|| {
                    anyhow!("could not obtain user, make sure the environmental variable $USER is set")
                })?;
                identity::lookup_account(name)?
            }
        };

        if target.uid == self.current.uid {
            warn!("Source and destination user are both {}", target.name);
        }
        info!("Transferring {} from {} to {}", plan.source_image, self.current.name, target.name);
        Ok(target)
    }
}

fn endpoint(endpoint: Option<&Endpoint>) -> Result<&Endpoint> {
    endpoint.ok_or_else(|| anyhow!("transfer plan is missing a connection"))
}
