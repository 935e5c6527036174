use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use image_scp::{cli::Cli, config::Config, run_scp};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let config = Config::from_cli(&cli)?;

    match run_scp(&config) {
        Ok(()) => {
            if !config.quiet {
                println!("\n✅ Transfer completed successfully!\n");
            }
        }
        Err(e) => {
            eprintln!("\n❌ Transfer failed: {:#}\n", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
