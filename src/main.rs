#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;
#[macro_use]
extern crate rocket;

use clap::Parser;

mod cli;
mod metrics;
mod mqtt;
mod server;
mod settings;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();
    if let Err(e) = cli.run().await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
