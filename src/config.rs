use std::env;
use std::path::PathBuf;

use log::LevelFilter;

pub const SHELL_NAME: &str = "seashell";

/// Longest line the editor accepts, terminator slot included.
pub const MAX_LINE: usize = 4096;

/// Environment variable read for the log level.
pub const LOG_ENV: &str = "SEASHELL_LOG";

/// Settings gathered once from the environment at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub shell_name: String,
    pub user: String,
    pub search_path: Vec<PathBuf>,
    pub max_line: usize,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn from_env() -> Self {
        let user = env::var("USER").unwrap_or_else(|_| whoami::username());
        let search_path = env::var_os("PATH")
            .map(|p| env::split_paths(&p).collect())
            .unwrap_or_default();
        let log_level = env::var(LOG_ENV)
            .ok()
            .and_then(|v| parse_level(&v))
            .unwrap_or(LevelFilter::Warn);

        Self {
            shell_name: SHELL_NAME.to_string(),
            user,
            search_path,
            max_line: MAX_LINE,
            log_level,
        }
    }
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}
