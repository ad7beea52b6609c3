use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use scenemend::config::RepairConfig;
use scenemend::repair;
use scenemend::request::RenderRequest;
use scenemend::workflow;

#[derive(Parser, Debug)]
#[command(
    name = "scenemend",
    about = "Repair and render generated animation scripts",
    version
)]
struct Args {
    /// JSON request file (reads stdin when omitted)
    #[arg(short, long)]
    request: Option<PathBuf>,

    /// TOML config file overriding the built-in repair defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Working directory for scripts and renderer media output
    #[arg(short, long, default_value = ".")]
    workdir: PathBuf,

    /// Print the repaired script and exit without rendering
    #[arg(long)]
    repair_only: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let raw = match &args.request {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading request file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading request from stdin")?;
            buf
        }
    };

    let req: RenderRequest = serde_json::from_str(&raw).context("parsing request JSON")?;
    let cfg = RepairConfig::load(args.config.as_deref());

    if args.repair_only {
        let code = req.code.as_deref().unwrap_or_default();
        let outcome = repair::prepare(code, &cfg);
        println!("{}", outcome.text.to_text());
        return Ok(());
    }

    let outcome = workflow::run(&req, &cfg, &args.workdir);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
