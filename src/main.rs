use clap::Parser;
use log::debug;

mod cli;
mod interface;

use cli::{Command, CommandLineArgs};
use taskforge_client::config::Config;
use taskforge_client::{AppContext, AppError};

async fn run(args: CommandLineArgs) -> Result<(), AppError> {
    let CommandLineArgs {
        action,
        api_url,
        storage_dir,
    } = args;

    let mut config = Config::from_env()?;
    if let Some(api_url) = api_url {
        config.api_base_url = api_url;
    }
    if let Some(storage_dir) = storage_dir {
        config.storage_dir = storage_dir;
    }
    debug!("Using API at {}", config.api_base_url);

    let context = AppContext::from_config(config)?;
    match action {
        Command::Shell => interface::shell(&context).await,
        action => interface::run(&context, action).await,
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = CommandLineArgs::parse();
    if let Err(e) = run(args).await {
        interface::report(&e);
        std::process::exit(1);
    }
}
