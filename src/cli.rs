use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use signal_hook::consts::SIGINT;
use std::{
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
};
use voirie_core::{
    cache::GeocodeCache,
    client::GeocodeClient,
    gateways::geocode::GeoCodingGateway,
    normalize::Normalizer,
    street_table::StreetTable,
    synthesize::Synthesizer,
    usecases::{resolve_addresses, Resolution, ResolutionStrategy, ResolveContext},
};

use crate::{
    adapters::csv::AddressTable,
    config::{Config, GeocodingGateway},
    gateways,
};

#[derive(Debug, Parser)]
#[command(version, about = "Assign approximate coordinates to postal addresses")]
pub struct Cli {
    /// Configuration file
    #[arg(long, short, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve all addresses of a CSV file
    Resolve(ResolveArgs),
    /// Print house number and street of addresses
    Normalize {
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Inspect the lookup cache
    Cache {
        /// Directory of the cache
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Number of found and missing entries
    Stats,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// CSV file with one address per row
    #[arg(long, short)]
    pub input: PathBuf,

    /// Written instead of the input file
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// sampling, street-table or synthetic
    #[arg(long)]
    pub strategy: Option<ResolutionStrategy>,

    #[arg(long, value_enum)]
    pub gateway: Option<GeocodingGateway>,

    /// Directory of the lookup cache
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Neither load nor store cached lookups
    #[arg(long, conflicts_with = "cache_dir")]
    pub no_cache: bool,

    /// Leave addresses unresolved instead of synthesizing them
    #[arg(long)]
    pub no_synthesis: bool,
}

impl ResolveArgs {
    fn apply(&self, cfg: &mut Config) {
        if let Some(strategy) = self.strategy {
            cfg.geocoding.strategy = strategy;
        }
        if let Some(gateway) = self.gateway {
            cfg.geocoding.gateway = gateway;
        }
        if let Some(dir) = &self.cache_dir {
            cfg.cache.dir = Some(dir.clone());
        }
        if self.no_cache {
            cfg.cache.dir = None;
        }
        if self.no_synthesis {
            cfg.synthesis.enabled = false;
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::try_load_from_file_or_default(cli.config.as_ref())?;
    match cli.command {
        Command::Resolve(args) => resolve(cfg, &args, &*register_abort()?),
        Command::Normalize { addresses } => normalize(&cfg, &addresses),
        Command::Cache {
            cache_dir,
            command: CacheCommand::Stats,
        } => cache_stats(cfg, cache_dir),
    }
}

fn normalizer(cfg: &Config) -> Result<Normalizer> {
    Ok(Normalizer::new(
        cfg.normalizer.localities.as_slice(),
        cfg.normalizer.max_street_name_len,
    )?)
}

fn resolve(mut cfg: Config, args: &ResolveArgs, abort: &AtomicBool) -> Result<()> {
    args.apply(&mut cfg);
    let Config {
        geocoding,
        cache: cache_cfg,
        synthesis,
        street_table,
        input,
        ..
    } = &cfg;

    let table = AddressTable::read_from_path(&args.input, input.delimiter, &input.address_column)?;
    let rows = table.rows();

    let normalizer = normalizer(&cfg)?;
    let street_table = StreetTable::new(street_table.iter().cloned());
    let synthesizer = if synthesis.enabled {
        Some(Synthesizer::try_new(
            synthesis.zones.clone(),
            &synthesis.default_zone,
            synthesis.street_zones.iter().cloned(),
        )?)
    } else {
        log::warn!("Synthesis is disabled");
        None
    };

    let store = gateways::cache_store(cache_cfg)?;
    let cache = match &store {
        Some(store) => GeocodeCache::load_from(store)?,
        None => GeocodeCache::new(),
    };
    log::info!("{} cached lookups", cache.len());

    let client: Option<GeocodeClient<Box<dyn GeoCodingGateway>>> = match geocoding.strategy {
        ResolutionStrategy::Sampling => Some(GeocodeClient::new(
            gateways::geocoding_gateway(geocoding)?,
            geocoding.client,
        )),
        ResolutionStrategy::StreetTable | ResolutionStrategy::Synthetic => None,
    };
    log::info!("Resolve addresses using the {} strategy", geocoding.strategy);

    let ctx = ResolveContext {
        normalizer: &normalizer,
        strategy: geocoding.strategy,
        sampling: geocoding.sampling,
        client: client.as_ref(),
        street_table: &street_table,
        synthesizer: synthesizer.as_ref(),
    };
    let outcome = resolve_addresses(&ctx, &cache, &rows, abort);

    // Lookups done so far are kept even if the run was aborted.
    if let Some(store) = &store {
        let saved = cache.save_to(store)?;
        log::info!("Stored {saved} new lookups");
    }

    let Resolution { results, summary } = outcome?;
    let output = args.output.as_ref().unwrap_or(&args.input);
    table.write_to_path(output, input.delimiter, &results)?;
    log::info!("{summary}");
    Ok(())
}

fn normalize(cfg: &Config, addresses: &[String]) -> Result<()> {
    let normalizer = normalizer(cfg)?;
    for raw in addresses {
        match normalizer.normalize(raw) {
            Some(addr) => println!("{}\t{}\t{}", addr.house_number, addr.street_key, addr.cleaned),
            None => println!("-\t-\t-"),
        }
    }
    Ok(())
}

/// The first SIGINT sets the returned flag, a second one exits at once.
fn register_abort() -> Result<Arc<AtomicBool>> {
    let abort = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register_conditional_shutdown(SIGINT, 1, Arc::clone(&abort))?;
    signal_hook::flag::register(SIGINT, Arc::clone(&abort))?;
    Ok(abort)
}

fn cache_stats(mut cfg: Config, cache_dir: Option<PathBuf>) -> Result<()> {
    if let Some(dir) = cache_dir {
        cfg.cache.dir = Some(dir);
    }
    let Some(store) = gateways::cache_store(&cfg.cache)? else {
        return Ok(());
    };
    let stats = GeocodeCache::load_from(&store)?.stats();
    println!("found:  {}", stats.found);
    println!("misses: {}", stats.misses);
    println!("total:  {}", stats.found + stats.misses);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::{ffi::OsString, sync::atomic::Ordering};

    #[test]
    fn first_interrupt_sets_abort_flag() {
        let abort = register_abort().unwrap();
        assert!(!abort.load(Ordering::Relaxed));
        signal_hook::low_level::raise(SIGINT).unwrap();
        assert!(abort.load(Ordering::Relaxed));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_resolve_command() {
        let cli = Cli::parse_from([
            "voirie",
            "resolve",
            "--input",
            "electeurs.csv",
            "--strategy",
            "street-table",
            "--gateway",
            "photon",
            "--no-synthesis",
        ]);
        let Command::Resolve(args) = cli.command else {
            panic!("resolve command expected");
        };
        assert_eq!(Some(ResolutionStrategy::StreetTable), args.strategy);
        assert_eq!(Some(GeocodingGateway::Photon), args.gateway);
        assert!(args.output.is_none());

        let mut cfg = Config::try_load_from_file_or_default(None::<PathBuf>).unwrap();
        args.apply(&mut cfg);
        assert_eq!(ResolutionStrategy::StreetTable, cfg.geocoding.strategy);
        assert_eq!(GeocodingGateway::Photon, cfg.geocoding.gateway);
        assert!(!cfg.synthesis.enabled);
    }

    #[test]
    fn no_cache_disables_persistence() {
        let cli = Cli::parse_from(["voirie", "resolve", "-i", "in.csv", "--no-cache"]);
        let Command::Resolve(args) = cli.command else {
            panic!("resolve command expected");
        };
        let mut cfg = Config::try_load_from_file_or_default(None::<PathBuf>).unwrap();
        args.apply(&mut cfg);
        assert!(cfg.cache.dir.is_none());
    }

    #[test]
    fn resolve_csv_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("electeurs.csv");
        std::fs::write(
            &input,
            "Nom;Adresse Complète\nA;12 RUE DES PENSEES 85340 OLONNE SUR MER\nB;\nC;LE BOURG\n",
        )
        .unwrap();
        let output = dir.path().join("out.csv");
        let cli = Cli::parse_from::<_, OsString>([
            "voirie".into(),
            "resolve".into(),
            "--input".into(),
            input.into_os_string(),
            "--output".into(),
            output.clone().into_os_string(),
            "--strategy".into(),
            "street-table".into(),
            "--no-cache".into(),
        ]);
        let Command::Resolve(args) = cli.command else {
            panic!("resolve command expected");
        };
        let cfg = Config::try_load_from_file_or_default(None::<PathBuf>).unwrap();
        resolve(cfg, &args, &AtomicBool::new(false)).unwrap();
        let written = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(4, lines.len());
        assert!(lines[1].ends_with(";interpolated"));
        assert!(lines[2].ends_with(";;;"));
        assert!(lines[3].ends_with(";synthetic"));
    }
}
