use clap::{Args, Parser, Subcommand};
use hm_serve::config::{
    DEFAULT_DB_PATH, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT, DEFAULT_SWEEP_INTERVAL_SECS,
    ServeConfig,
};
use hm_core::HazardError;
use hm_serve::{AppState, build_hazardmap};
use owo_colors::OwoColorize;
use std::net::IpAddr;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "hm", version, about = "Geo-tagged hazard reports that expire after a day")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and the expiry sweeper.
    Serve(ServeArgs),
    /// Remove expired events once and exit.
    Purge(DbArgs),
    /// Print the OpenAPI document.
    Openapi,
}

#[derive(Args)]
struct DbArgs {
    #[arg(long, env = "HAZARDMAP_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db_path: String,
}

#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    db: DbArgs,
    #[arg(long, env = "HAZARDMAP_HOST", default_value = "127.0.0.1")]
    host: IpAddr,
    #[arg(long, env = "HAZARDMAP_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Seconds between expiry sweeps; 0 disables the sweeper.
    #[arg(long, env = "HAZARDMAP_SWEEP_INTERVAL_SECS", default_value_t = DEFAULT_SWEEP_INTERVAL_SECS)]
    sweep_interval_secs: u64,
    #[arg(long, env = "HAZARDMAP_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,
}

impl From<ServeArgs> for ServeConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            db_path: args.db.db_path,
            host: args.host,
            port: args.port,
            sweep_interval_secs: args.sweep_interval_secs,
            max_upload_bytes: args.max_upload_bytes,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            if let Err(err) = hm_serve::serve(args.into()).await {
                eprintln!("{} {err}", "serve error:".red());
                return ExitCode::FAILURE;
            }
        }
        Command::Purge(args) => {
            let config = ServeConfig {
                db_path: args.db_path,
                ..ServeConfig::default()
            };
            if let Err(err) = config.ensure_db_dir() {
                eprintln!("{} {err}", "purge error:".red());
                return ExitCode::FAILURE;
            }
            match purge(&AppState::from_config(&config)) {
                Ok(count) => println!("{} {count} expired event(s)", "purged".green()),
                Err(err) => {
                    eprintln!("{} {err}", "purge error:".red());
                    return ExitCode::FAILURE;
                }
            }
        }
        Command::Openapi => {
            println!("{}", hm_serve::openapi::generate_spec());
        }
    }
    ExitCode::SUCCESS
}

fn purge(state: &AppState) -> Result<u64, HazardError> {
    let core = build_hazardmap(state)?;
    core.events().purge_expired()
}
