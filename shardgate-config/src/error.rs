//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Toml(#[from] toml::de::Error),

    #[error("config error on line {line}: {message}\n{snippet}")]
    Config {
        line: usize,
        message: String,
        snippet: String,
    },

    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Error {
    /// Build an error pointing at the offending line of the config source.
    pub fn config(source: &str, err: toml::de::Error) -> Self {
        let Some(span) = err.span() else {
            return Self::Toml(err);
        };

        let line = source[..span.start.min(source.len())]
            .chars()
            .filter(|c| *c == '\n')
            .count();
        let snippet = source
            .lines()
            .nth(line)
            .map(|l| l.to_string())
            .unwrap_or_default();

        Self::Config {
            line: line + 1,
            message: err.message().to_string(),
            snippet,
        }
    }
}
