use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use engine::{
    GenerationRequest, JobProxy, config::Config, prediction_service::ReplicateService,
};

/// Runs one generation against the prediction service, bypassing the HTTP server.
#[derive(clap::Parser)]
struct Arg {
    prompt: String,
    qr_data: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;
    let Arg { prompt, qr_data } = Arg::parse();

    let cfg = Config::load(None)?;
    let proxy = JobProxy::new(
        Arc::new(ReplicateService::from_config(&cfg)?),
        cfg.poll_policy(),
    );

    let request = GenerationRequest::new(prompt, qr_data)?;
    let prediction = proxy.generate(&request).await?;
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}
