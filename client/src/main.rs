use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use qr_studio::{
    Config, Submitter, View,
    cli::{Cli, Command},
    load_config, save_config,
};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;
    let cli = Cli::parse();

    let mut cfg = load_config()?.unwrap_or_default();
    if let Some(url) = cli.proxy_url {
        cfg.proxy_url = url;
    }
    let submitter = Submitter::new(&cfg)?;

    match cli.command {
        Command::Generate(args) => {
            let progress = tokio::spawn(report_progress(submitter.subscribe()));
            let result = submitter.submit(&args.prompt, &args.data).await;
            progress.abort();
            let url = result?;
            println!("{url}");

            if args.download {
                let dir = out_dir(args.out_dir, &cfg)?;
                let path = submitter.download(&url, &dir).await?;
                println!("Saved {}", path.display());
            }
        }
        Command::Download(args) => {
            let dir = out_dir(args.out_dir, &cfg)?;
            let path = submitter.download(&args.url, &dir).await?;
            println!("Saved {}", path.display());
        }
        Command::Init => {
            save_config(&cfg)?;
            println!("Wrote {}", qr_studio::config_path()?.display());
        }
    }

    Ok(())
}

async fn report_progress(mut rx: watch::Receiver<View>) {
    let mut was_in_flight = false;
    while rx.changed().await.is_ok() {
        let in_flight = rx.borrow_and_update().in_flight;
        if in_flight && !was_in_flight {
            eprintln!("Creating your AI QR code...");
        }
        was_in_flight = in_flight;
    }
}

fn out_dir(arg: Option<PathBuf>, cfg: &Config) -> Result<PathBuf> {
    match arg.or_else(|| cfg.download_dir.clone()) {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?),
    }
}
