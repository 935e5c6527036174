// 库文件，导出模块
pub mod cli;
pub mod config;
pub mod plan;
pub mod ssh;
pub mod transfer;
pub mod utils;

use anyhow::Result;
use config::Config;
use log::info;
use ssh::SshDialer;
use transfer::{ProcessEngine, RemoteDriver, Transfer};
use utils::identity;

pub fn run_scp(config: &Config) -> Result<()> {
    let default_user = identity::default_username()?;
    let plan = plan::resolve_args(&config.args, &config.destinations, &default_user)?;
    info!("Resolved {:?} transfer of {}", plan.direction, plan.source_image);

    let current = identity::current_account()?;
    let engine = ProcessEngine::new(
        config.engine.clone(),
        config.parent_flags.clone(),
        config.quiet,
        current.clone(),
    );
    let dialer = SshDialer { quiet: config.quiet };
    let transfer = Transfer::new(
        &engine,
        RemoteDriver::new(&dialer, &config.remote_engine),
        config.tmpdir.clone(),
        current,
        identity::invoking_user(),
    );

    if let Some(report) = transfer.run(&plan)? {
        println!("{}", report);
    }
    Ok(())
}
