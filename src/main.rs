use anyhow::Result;
use clap::Parser;
use diskinfo::config::Config;
use diskinfo::util::report::{self, ReportOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "diskinfo", about = "Physical disks and their SMART / NVMe health", version)]
struct Cli {
    /// Print a one-shot JSON snapshot of all disks and exit
    #[arg(long)]
    json: bool,

    /// List partitions under each disk
    #[arg(long)]
    partitions: bool,

    /// Print the full ATA attribute table
    #[arg(long)]
    attributes: bool,

    /// Skip SMART sessions; identity only
    #[arg(long)]
    no_smart: bool,

    /// Print config file path and current values, then exit
    #[arg(long)]
    config: bool,

    /// Verbose logging to stderr (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = Config::load();
    if cli.config {
        return run_print_config(&cfg);
    }

    let mut options = cfg.enumerate_options();
    if cli.no_smart {
        options.smart = false;
    }
    let disks = diskinfo::enumerate_disks_with(&options);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report::json_snapshot(&disks, &cfg))?);
        return Ok(());
    }

    let opts = ReportOptions { attributes: cli.attributes, partitions: cli.partitions };
    print!("{}", report::generate(&disks, &cfg, opts));
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "diskinfo=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_print_config(cfg: &Config) -> Result<()> {
    let path = Config::config_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    println!("Config: {}", path);
    println!();
    println!("[devices]");
    println!("  exclude = {:?}", cfg.devices.exclude);
    if cfg.devices.aliases.is_empty() {
        println!("  aliases = (none)");
    } else {
        let mut aliases: Vec<_> = cfg.devices.aliases.iter().collect();
        aliases.sort();
        for (k, v) in aliases {
            println!("  alias: {} → {}", k, v);
        }
    }
    println!();
    println!("[smart]");
    println!("  enabled              = {}", cfg.smart.enabled);
    println!("  command_timeout_secs = {}", cfg.smart.command_timeout_secs);
    Ok(())
}
