//! Utilities: logging setup, with the level derived from -v / -q.
//!
//! Key items:
//!   init_logging / derive_level

/// Logging helpers.
pub mod logging {
    use tracing::Level;
    use tracing_subscriber::EnvFilter;

    /// Map CLI verbosity flags onto a tracing level.
    ///
    /// `-q` wins over any `-v`.
    pub fn derive_level(verbose: u8, quiet: bool) -> Level {
        if quiet {
            return Level::ERROR;
        }
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Install the global fmt subscriber on stderr (stdout carries
    /// command output). `RUST_LOG`, when set, overrides `level`.
    pub fn init_logging(level: Level) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
        // A second init (tests, embedding) keeps the first subscriber.
        let _ = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }

}

pub use logging::{derive_level, init_logging};
