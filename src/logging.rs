use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{LevelFilter, SetLoggerError};
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{runtime::ConfigErrors, Appender, Config as LogConfig, Root},
    encode::pattern::PatternEncoder,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A unique identifier for a particular voting session, used to tie log lines together.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct SessionId(pub usize);

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SessionId {
    /// Atomically get the next ID. This wraps around back to zero if you somehow exceed a usize.
    pub fn next() -> SessionId {
        static SESSION_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        SessionId(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

const FALLBACK_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}";

/// Reasons logging could not be set up.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The file exists but log4rs refused it.
    #[error("Could not load logging config from {}: {reason}", .path.display())]
    File { path: PathBuf, reason: String },
    #[error("Invalid fallback logging config: {0}")]
    Config(#[from] ConfigErrors),
    #[error("A logger is already installed: {0}")]
    AlreadyInstalled(#[from] SetLoggerError),
}

/// Initialise logging from the given log4rs file. If the file is absent,
/// fall back to warnings and above on stderr.
pub fn init_logging(path: impl AsRef<Path>) -> Result<(), LoggingError> {
    let path = path.as_ref();
    if path.exists() {
        log4rs::init_file(path, Default::default()).map_err(|e| LoggingError::File {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!("Initialised logging from {}", path.display());
        return Ok(());
    }

    log4rs::init_config(fallback_config()?)?;
    Ok(())
}

fn fallback_config() -> Result<LogConfig, ConfigErrors> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(FALLBACK_PATTERN)))
        .build();
    LogConfig::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Warn))
}
