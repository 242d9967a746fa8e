use clap::{Parser, Subcommand, builder::styling};
use ecommerce_etl::cli::{self, Source, Target};
use ecommerce_etl::config::Settings;
use eyre::{Context, Result};
use owo_colors::OwoColorize;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// ecom-etl: build the Olist e-commerce star schema from raw parquet into DuckDB or Snowflake
#[derive(Parser)]
#[command(name = "ecom-etl", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source settings from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute (defaults to `run`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract raw tables, build the star schema and load it
    Run {
        /// Where to read the raw parquet tables from
        #[arg(short, long, value_enum, default_value_t = Source::Local)]
        source: Source,

        /// Where to load the star schema
        #[arg(short, long, value_enum, default_value_t = Target::Duckdb)]
        target: Target,
    },

    /// Convert the raw CSV files in RAW_DATA_DIR to parquet files in DATA_DIR
    Convert,

    /// Load the raw CSV files into DuckDB staging tables
    Seed,

    /// Upload the DuckDB staging tables to S3 as parquet
    Stage {
        /// Only stage tables whose name matches this regex
        #[arg(short, long)]
        include: Option<String>,

        /// Skip tables whose name matches this regex
        #[arg(short = 'x', long)]
        exclude: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match dotenvy::from_filename(&cli.env) {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e).with_context(|| format!("Failed to load {}", cli.env)),
    }

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    let settings = Settings::from_env().context("Invalid configuration")?;

    let command = cli.command.unwrap_or(Commands::Run {
        source: Source::default(),
        target: Target::default(),
    });

    match command {
        Commands::Run { source, target } => {
            log::info!(
                "Running star schema ETL from {} into {}",
                format!("{:?}", source).to_lowercase().cyan(),
                format!("{:?}", target).to_lowercase().cyan()
            );
            cli::run_pipeline(&settings, source, target).await?;
        }
        Commands::Convert => {
            log::info!(
                "Converting CSV files in {}",
                settings.raw_data_dir.display().bright_black()
            );
            cli::convert_csv_to_parquet(&settings.raw_data_dir, &settings.data_dir)?;
        }
        Commands::Seed => {
            log::info!(
                "Seeding {} from {}",
                settings.duckdb_path.display().bright_black(),
                settings.raw_data_dir.display().bright_black()
            );
            cli::seed_database(&settings)?;
        }
        Commands::Stage { include, exclude } => {
            log::info!(
                "Staging tables from {}",
                settings.duckdb_path.display().bright_black()
            );
            cli::stage_tables(&settings, include.as_deref(), exclude.as_deref()).await?;
        }
    }

    Ok(())
}
