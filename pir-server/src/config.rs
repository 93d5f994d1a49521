use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Plinko PIR query server")]
pub struct Config {
    /// Database snapshot served by this instance
    #[arg(
        long,
        env = "PLINKO_PIR_DATABASE_PATH",
        default_value = "/data/database.bin"
    )]
    pub database_path: PathBuf,

    /// Listen port for the HTTP API
    #[arg(long, env = "PLINKO_PIR_HTTP_PORT", default_value = "3001")]
    pub http_port: u16,

    /// Optional directory of delta files folded into the snapshot at
    /// startup, in filename order
    #[arg(long, env = "PLINKO_PIR_DELTA_DIR")]
    pub delta_dir: Option<PathBuf>,

    /// Expose the plaintext (non-private) query endpoint
    #[arg(long, env = "PLINKO_PIR_ENABLE_PLAINTEXT", default_value = "true")]
    pub enable_plaintext: bool,
}
