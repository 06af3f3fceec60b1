use std::path::PathBuf;

#[derive(Debug, clap::Parser)]
pub struct Cli {
    /// Base URL of the QR proxy, overrides the config file
    #[arg(long)]
    pub proxy_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Generate a stylized QR code and print its URL
    Generate(Generate),
    /// Download a generated image
    Download(Download),
    /// Write the current settings to the config file
    Init,
}

#[derive(Debug, clap::Args)]
pub struct Generate {
    /// Style description, e.g. "watercolor flowers"
    pub prompt: String,
    /// URL, text, or data to encode
    pub data: String,
    /// Also save the image
    #[arg(short, long)]
    pub download: bool,
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct Download {
    pub url: String,
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,
}
