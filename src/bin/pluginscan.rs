use clap::Parser;
use pluginscan_core::{emit, registry::LocationsRegistry, scan_tree, PluginCategory, Resolver};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pluginscan")]
#[command(about = "Locate plugin declarations and resolve their build dependencies")]
#[command(version)]
struct Cli {
    /// More verbose output
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Exclude plugin1, plugin2, etc. (matched as name_version prefixes)
    #[arg(
        short = 'x',
        long = "exclude-scanners",
        value_name = "plugin1,plugin2,...",
        value_delimiter = ','
    )]
    exclude_scanners: Vec<String>,

    /// Root of the source tree to scan
    #[arg(value_name = "ROOT", default_value = ".")]
    root: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let outcome = scan_tree(&cli.root)?;
    log::debug!("discovered {} plugin record(s)", outcome.records.len());

    let mut registries = BTreeMap::new();
    for category in PluginCategory::all() {
        let path = cli.root.join("config").join(category.locations_file());
        registries.insert(category, LocationsRegistry::load(&path)?);
    }

    let resolver = Resolver::new(cli.exclude_scanners);
    let resolution = resolver.resolve(&outcome, &registries)?;

    for record in &resolution.records {
        log::debug!(
            "{} plugin {} v{}: {}",
            record.identity.category,
            record.identity.name,
            record.identity.version.canonical(),
            record.status
        );
    }

    emit::write_outputs(&cli.root, &outcome, &resolution)?;
    Ok(())
}
