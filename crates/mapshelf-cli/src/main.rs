//! mapshelf command line
//!
//! Lists the installed maps and games, finds the XML of a game, and checks
//! the installed maps against a published listing.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use mapshelf_catalog::{MapIndex, MapLocator, ZipArchiveReader};
use mapshelf_config::{ClientSettings, ShelfConfig};
use mapshelf_update::{
    DownloadList, FileListing, ListingSource, MapDownload, MapUpdateCheck, UpdateCheckOutcome,
    UpdateScheduler,
};

#[derive(Parser, Debug)]
#[command(name = "mapshelf", about = "Catalog installed maps and check them for updates", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file to use instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maps directory, overrides the configuration
    #[arg(long, global = true)]
    maps_dir: Option<PathBuf>,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every installed game
    Games,

    /// Show where the XML of a game lives
    Find {
        /// Game name, as listed by `games`
        game: String,
    },

    /// List the installed maps with their versions
    Maps,

    /// Check the installed maps for newer published versions
    Check {
        /// Listing file, overrides the configuration
        #[arg(long)]
        listing: Option<PathBuf>,

        /// Check even if the last check was recent
        #[arg(long)]
        force: bool,
    },

    /// Split a listing into not installed, installed and out of date maps
    Downloads {
        /// Listing file, overrides the configuration
        #[arg(long)]
        listing: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => ShelfConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ShelfConfig::load_default().context("Failed to load configuration")?,
    };
    if let Some(dir) = &cli.maps_dir {
        config.maps.dir = dir.clone();
    }
    debug!("Using maps directory {}", config.maps.dir.display());

    let locator = MapLocator::new(ZipArchiveReader::new());

    match &cli.command {
        Command::Games => list_games(&cli, &config, &locator),
        Command::Find { game } => find_game(&cli, &config, &locator, game),
        Command::Maps => list_maps(&cli, &config, &locator),
        Command::Check { listing, force } => {
            check(&cli, &config, &locator, listing.as_deref(), *force)
        }
        Command::Downloads { listing } => {
            downloads(&cli, &config, &locator, listing.as_deref())
        }
    }
}

/// Setup logging with tracing
fn setup_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

type Locator = MapLocator<ZipArchiveReader>;

fn list_games(cli: &Cli, config: &ShelfConfig, locator: &Locator) -> Result<()> {
    let games = MapIndex::build(&config.maps.dir, locator).sorted_game_names();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&games)?);
    } else {
        for game in games {
            println!("{}", game);
        }
    }
    Ok(())
}

fn find_game(cli: &Cli, config: &ShelfConfig, locator: &Locator, game: &str) -> Result<()> {
    let index = MapIndex::build(&config.maps.dir, locator);
    let Some(location) = index.find_game_location(game) else {
        bail!("No installed map contains a game named {:?}", game);
    };

    if cli.json {
        let value = serde_json::json!({
            "game": game,
            "package": location.package,
            "xml_path": location.xml_path,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", location);
    }
    Ok(())
}

fn list_maps(cli: &Cli, config: &ShelfConfig, locator: &Locator) -> Result<()> {
    let index = MapIndex::build(&config.maps.dir, locator);

    if cli.json {
        let maps: Vec<_> = index
            .entries()
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "location": entry.location,
                    "descriptor": entry.descriptor,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&maps)?);
    } else {
        for entry in index.entries() {
            println!(
                "{} (version {}, {} games) {}",
                entry.descriptor.map_name(),
                entry.descriptor.version(),
                entry.descriptor.games().len(),
                entry.location.display()
            );
        }
    }
    Ok(())
}

fn listing_path(config: &ShelfConfig, listing: Option<&Path>) -> Result<PathBuf> {
    listing
        .map(Path::to_path_buf)
        .or_else(|| config.updates.listing.clone())
        .context("No map listing given, pass --listing or set updates.listing")
}

fn check(
    cli: &Cli,
    config: &ShelfConfig,
    locator: &Locator,
    listing: Option<&Path>,
    force: bool,
) -> Result<()> {
    let listing = FileListing::new(listing_path(config, listing)?);
    let settings = ClientSettings::open(&config.updates.settings_file).with_context(|| {
        format!(
            "Failed to open client settings {}",
            config.updates.settings_file.display()
        )
    })?;
    let scheduler = UpdateScheduler::with_threshold_days(settings, config.updates.threshold_days);

    let outcome = MapUpdateCheck::new(scheduler, listing)
        .force(force)
        .run(&config.maps.dir, locator);

    if cli.json {
        let value = match &outcome {
            UpdateCheckOutcome::NotDue => serde_json::json!({ "status": "not_due" }),
            UpdateCheckOutcome::ListingUnavailable => {
                serde_json::json!({ "status": "listing_unavailable" })
            }
            UpdateCheckOutcome::UpToDate => serde_json::json!({ "status": "up_to_date" }),
            UpdateCheckOutcome::OutOfDate(maps) => {
                serde_json::json!({ "status": "out_of_date", "maps": maps })
            }
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match outcome {
        UpdateCheckOutcome::NotDue => {
            println!("Maps were checked recently, use --force to check again")
        }
        UpdateCheckOutcome::ListingUnavailable => println!("Map listing unavailable"),
        UpdateCheckOutcome::UpToDate => println!("All maps are up to date"),
        UpdateCheckOutcome::OutOfDate(maps) => {
            println!("Updates available:");
            for map in maps {
                println!("  {}", map);
            }
        }
    }
    Ok(())
}

fn downloads(
    cli: &Cli,
    config: &ShelfConfig,
    locator: &Locator,
    listing: Option<&Path>,
) -> Result<()> {
    let path = listing_path(config, listing)?;
    let available = FileListing::new(&path)
        .fetch()
        .with_context(|| format!("Failed to read listing {}", path.display()))?;
    info!("Read {} listed maps from {}", available.len(), path.display());

    let index = MapIndex::build(&config.maps.dir, locator);
    let list = DownloadList::new(available, &index);

    if cli.json {
        let value = serde_json::json!({
            "available": list.available(),
            "installed": list.installed(),
            "out_of_date": list.out_of_date(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_section("Not installed", list.available());
    print_section("Installed", list.installed());
    print_section("Out of date", list.out_of_date());
    Ok(())
}

fn print_section(title: &str, downloads: &[MapDownload]) {
    println!("{} ({}):", title, downloads.len());
    for download in downloads {
        match download.version {
            Some(version) => println!("  {} (version {})", download.map_name, version),
            None => println!("  {}", download.map_name),
        }
    }
}
