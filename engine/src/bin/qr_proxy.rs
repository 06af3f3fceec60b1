use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::{Result, eyre::WrapErr as _};
use engine::{
    JobProxy, config::Config, prediction_service::ReplicateService, server,
};

/// Forwards QR generation requests to Replicate and waits for the result.
#[derive(clap::Parser)]
struct Cli {
    /// RON config file. Defaults to `qr_proxy.ron` in the local config dir.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;
    let cli = Cli::parse();

    let mut cfg = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        cfg.listen.host = host;
    }
    if let Some(port) = cli.port {
        cfg.listen.port = port;
    }

    let service = ReplicateService::from_config(&cfg)?;
    let proxy = JobProxy::new(Arc::new(service), cfg.poll_policy());

    let listener = server::bind(&cfg.listen.host, cfg.listen.port)
        .await
        .wrap_err_with(|| format!("Cannot listen on {}:{}", cfg.listen.host, cfg.listen.port))?;
    server::serve(listener, proxy).await?;
    Ok(())
}
