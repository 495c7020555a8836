use anyhow::Result;
use clap::{Parser, Subcommand};
use orrery_core::unpack_argb;
use orrery_data::{
    generate_synthetic_stars, CatalogSummary, DataPipeline, HorizonsClient, PipelineConfig, SaveEpoch, SbdbClient,
    StarCatalog, Starfield, Tier,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orrery")]
#[command(about = "Offline data pipeline for the orrery engine")]
struct Cli {
    /// JSON configuration file (missing fields keep their defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a star catalog CSV (or .csv.gz) into a binary starfield
    CompileStars {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value = "starfield.bin")]
        output: PathBuf,
        /// Drop stars dimmer than this apparent magnitude
        #[arg(long)]
        max_mag: Option<f64>,
        /// Keep at most this many of the brightest stars
        #[arg(long)]
        max_stars: Option<usize>,
    },

    /// Decode a starfield and print its header and brightest entries
    InspectStars {
        #[arg(short, long, default_value = "starfield.bin")]
        input: PathBuf,
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Generate synthetic test stars in HYG column layout
    GenerateSynthetic {
        #[arg(short, long, default_value = "100000")]
        count: usize,
        #[arg(short, long, default_value = "data/synthetic.csv")]
        output: PathBuf,
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Query the small-body database and merge with curated bodies
    BuildCatalog {
        #[arg(long, default_value = "manual_bodies.csv")]
        manual: PathBuf,
        #[arg(short, long, default_value = "body_catalog.csv")]
        output: PathBuf,
    },

    /// Apply the inclusion policy to a catalog and list the tiers
    PreviewSelection {
        #[arg(long, default_value = "body_catalog.csv")]
        catalog: PathBuf,
    },

    /// Resolve orbits for the selected bodies and write a save file
    GenerateSave {
        #[arg(long, default_value = "body_catalog.csv")]
        catalog: PathBuf,
        #[arg(short, long, default_value = "solar_system_elliptical.save")]
        output: PathBuf,
        /// Epoch (e.g. "2025-01-01T00:00:00 UTC"); defaults to now
        #[arg(short, long)]
        epoch: Option<String>,
        /// Kilometres per engine distance unit
        #[arg(long)]
        km_per_unit: Option<f64>,
        /// Ephemeris requests in flight at once
        #[arg(long)]
        workers: Option<usize>,
    },
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            tracing::info!("Loading config {:?}", path);
            PipelineConfig::load(path)
        }
        None => Ok(PipelineConfig::default()),
    }
}

async fn build_catalog(config: PipelineConfig, manual: &Path, output: &Path) -> Result<CatalogSummary> {
    let client = SbdbClient::new(&config.service)?;
    DataPipeline::new(config).build_catalog(&client, manual, output).await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::CompileStars { input, output, max_mag, max_stars } => {
            if let Some(m) = max_mag {
                config.stars.max_mag = m;
            }
            if let Some(n) = max_stars {
                config.stars.max_stars = n;
            }
            config.validate()?;

            let pipeline = DataPipeline::new(config);
            let summary = pipeline.compile_stars(&input, &output)?;
            println!("Compiled {} stars into {}", summary.written, output.display());
            println!("  Parsed:  {}", summary.parsed);
            println!("  Skipped: {}", summary.skipped);
            println!("  Bright:  {}", summary.bright);
        }

        Commands::InspectStars { input, top } => {
            let starfield = Starfield::load(&input)?;
            println!("Starfield {}", input.display());
            println!("  Version: {}", starfield.version);
            println!("  Stars:   {}", starfield.len());
            println!("  Bytes:   {}", starfield.encoded_len());

            for (i, star) in starfield.stars.iter().take(top).enumerate() {
                let (_, [r, g, b]) = unpack_argb(star.color);
                let [x, y, z] = star.direction;
                println!(
                    "  {:4}: mag {:6.2}  dir ({:+.5}, {:+.5}, {:+.5})  color #{:08X} ({}, {}, {})",
                    i, star.magnitude, x, y, z, star.color, r, g, b
                );
            }
        }

        Commands::GenerateSynthetic { count, output, seed } => {
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let catalog = StarCatalog::from_records(generate_synthetic_stars(count, seed));
            catalog.save_csv(&output)?;
            println!("Generated {} synthetic stars -> {}", catalog.len(), output.display());
        }

        Commands::BuildCatalog { manual, output } => {
            match build_catalog(config, &manual, &output).await {
                Ok(summary) => {
                    println!("Wrote {} rows to {}", summary.written, output.display());
                    println!("  Manual:     {}", summary.manual);
                    println!("  Fetched:    {}", summary.fetched);
                    println!("  Duplicates: {}", summary.duplicates());
                }
                Err(e) => {
                    eprintln!("ERROR while building catalog: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::PreviewSelection { catalog } => {
            let pipeline = DataPipeline::new(config);
            let (selection, tally) = pipeline.preview_selection(&catalog)?;

            println!("Inclusion rules:");
            for (rule, count) in &tally {
                println!("  {:<22} {}", rule, count);
            }

            for (label, tier) in [
                ("Planets/dwarfs", Tier::SunOrbiting),
                ("Moons", Tier::Satellite),
                ("Small bodies", Tier::SmallBody),
            ] {
                let bodies = selection.tier(tier);
                println!("\n{} ({}):", label, bodies.len());
                for body in bodies {
                    let diameter = body.radius_km.map(|r| format!("{:.1} km", 2.0 * r)).unwrap_or_else(|| "?".into());
                    match &body.parent_name {
                        Some(parent) => println!("  {:<28} {:<14} {} (of {})", body.name, body.kind, diameter, parent),
                        None => println!("  {:<28} {:<14} {}", body.name, body.kind, diameter),
                    }
                }
            }
        }

        Commands::GenerateSave { catalog, output, epoch, km_per_unit, workers } => {
            if let Some(km) = km_per_unit {
                config.save.km_per_unit = km;
            }
            if let Some(n) = workers {
                config.save.fetch_workers = n;
            }
            config.validate()?;

            let epoch = match epoch.as_deref() {
                Some("now") | None => SaveEpoch::now()?,
                Some(s) => SaveEpoch::parse(s)?,
            };

            let client = HorizonsClient::new(&config.service)?;
            let pipeline = DataPipeline::new(config);
            let summary = pipeline.generate_save(&client, &catalog, &output, epoch).await?;

            println!("Selected {} planets/dwarfs, {} moons, {} small bodies (of {} in catalog)",
                summary.sun_orbiting, summary.satellites, summary.small_bodies, summary.catalog);
            println!("Wrote {}", output.display());
            println!("Epoch used: {} (UTC), JD={:.8}", summary.epoch.utc_label, summary.epoch.jd_tdb);
        }
    }

    Ok(())
}
