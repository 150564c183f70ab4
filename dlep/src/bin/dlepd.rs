//! `dlepd`: runs one or more DLEP interfaces (radio or router role) from a
//! TOML config file. Grounded on `examples/asayers-pcarp`'s and
//! `examples/hermit-os-kernel`'s use of `clap` for their own binaries —
//! the one CLI crate both reach for in the retrieval pack.

use std::path::PathBuf;

use clap::Parser;
use dlep::Config;

/// Dynamic Link Exchange Protocol session daemon.
#[derive(Parser, Debug)]
#[command(name = "dlepd", version, about)]
struct Args {
    /// Path to a TOML config file with one or more `[[interface]]` tables.
    #[arg(short, long)]
    config: PathBuf,

    /// Log level, e.g. "info", "dlep_session=debug". Overrides `RUST_LOG`.
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = args
        .log_level
        .clone()
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let toml = std::fs::read_to_string(&args.config)
        .map_err(|err| anyhow::anyhow!("reading {}: {err}", args.config.display()))?;
    let cfg = Config::from_toml_str(&toml)
        .map_err(|err| anyhow::anyhow!("parsing {}: {err}", args.config.display()))?;

    if cfg.interfaces.is_empty() {
        anyhow::bail!("config at {} has no [[interface]] entries", args.config.display());
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let local = tokio::task::LocalSet::new();
    local.block_on(&rt, async move {
        let shutdown = tokio::signal::ctrl_c();
        tokio::select! {
            res = dlep::run_daemon(cfg) => res,
            _ = shutdown => {
                log::info!("received interrupt, shutting down");
                Ok(())
            }
        }
    })
}
