use anyhow::Context;
use clap::{error::ErrorKind, CommandFactory, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pman_openshift::{
    cli::{self, Cli},
    config::Config,
    ClusterHandle, Error,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for the --state dump
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let verb = match cli.verb() {
        Ok(verb) => verb,
        Err(Error::InvalidArgument(msg)) => {
            Cli::command().error(ErrorKind::ValueValidation, msg).exit()
        }
        Err(e) => return Err(e.into()),
    };

    let mut config = Config::load()?;
    cli.apply(&mut config);
    debug!("Loaded configuration: {:?}", config);

    let cluster = ClusterHandle::connect(&config.cluster)
        .await
        .context("failed to connect to the cluster")?;

    if let Some(out) = cli::dispatch(&cluster, &verb, config.delete_propagation, cli.output).await? {
        print!("{}", out);
    }

    Ok(())
}
