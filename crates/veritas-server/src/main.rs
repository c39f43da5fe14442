//! Veritas demo service.
//!
//! Serves a handful of routes, some with schemas, and the OpenAPI document
//! generated from them.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use veritas_config::ConfigLoader;
use veritas_server::demo::build_app;
use veritas_server::Server;
use veritas_telemetry::{init_telemetry, TelemetryConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_CONFIG_FILE: &str = "veritas.toml";

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("veritas-demo {VERSION}");
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config }
    }
}

fn print_help() {
    println!(
        r#"Veritas demo - schema-validated routes with a generated OpenAPI document

USAGE:
    veritas-demo [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
                           [default: ./veritas.toml if present]
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    PORT                   Listen port (default: 8080)
    DB_HOST                Database host    (all four DB_* or none)
    DB_USER                Database user
    DB_PASSWORD            Database password
    DB_DATABASE            Database name
    VERITAS__<SECTION>__<KEY>
                           Override any configuration key,
                           e.g. VERITAS__LOGGING__LEVEL=debug
    RUST_LOG               Log filter, overrides logging.level

A .env file in the working directory is loaded first if present.

ROUTES:
    GET  /                   plain text
    GET  /without-schema     plain text, undocumented
    GET  /with-schema        requires ?test=<string>
    GET  /access-db          injected database handle
    POST /post-with-schema   requires {{"test": <string>}}
    GET  /openapi.json       generated document (docs.path)
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let loader = ConfigLoader::new().with_dotenv()?;
    let loader = match &args.config {
        Some(path) => loader
            .with_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => loader.with_optional_file(DEFAULT_CONFIG_FILE)?,
    };
    let config = loader
        .with_process_env()?
        .with_env_prefix("VERITAS")
        .load()
        .context("invalid configuration")?;

    init_telemetry(&TelemetryConfig::from(&config)).context("failed to initialize telemetry")?;

    info!(version = VERSION, "starting veritas-demo");
    if config.database.is_none() {
        info!("no database configured, /access-db will fail");
    }

    let app = build_app(&config).context("failed to register routes")?;
    let server = Server::new(app, &config.server)?;
    info!(addr = %server.addr(), docs = %config.docs.path, "routes registered");

    server.run().await?;
    Ok(())
}
