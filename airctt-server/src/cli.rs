use clap::Parser;
use std::path::PathBuf;

const HELP_EPILOG: &str = r#"Server options can also be provided via environment variables:
  CONFIG_PATH (default: ./config.yaml)
  DB_PATH     (default: data/app.db)
  PORT        (default: 8080 or config.listen_port)

Command-line flags take precedence over environment variables.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "airctt-server",
    version,
    about = "AIRCTT coupon/wallet/reward ledger server",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database file
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Listen port
    #[arg(long)]
    pub port: Option<u16>,
}
