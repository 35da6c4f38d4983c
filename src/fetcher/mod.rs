//! Concrete fetch workers
//!
//! - [`BrowserWorker`]: one Chrome session per worker, driven over CDP
//! - [`ReaderWorker`]: delegates rendering to an HTTP reader service

pub mod browser;
pub mod reader;

pub use browser::{BrowserWorker, BrowserWorkerFactory};
pub use reader::{ReaderWorker, ReaderWorkerFactory};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::content::ContentPipeline;
use crate::worker_pool::WorkerFactory;

/// Which worker implementation backs the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchBackendKind {
    Browser,
    Reader,
}

impl FetchBackendKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Reader => "reader",
        }
    }
}

impl fmt::Display for FetchBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "browser" | "chrome" | "chromium" => Ok(Self::Browser),
            "reader" | "jina" => Ok(Self::Reader),
            other => Err(format!("unknown fetch backend '{other}' (expected browser or reader)")),
        }
    }
}

/// Build the worker factory selected by `FETCH_BACKEND`.
///
/// The browser backend resolves (and if needed downloads) Chrome here, once,
/// so that every worker launch reuses the same executable.
pub async fn build_factory(config: &ServiceConfig) -> anyhow::Result<Arc<dyn WorkerFactory>> {
    let pipeline = ContentPipeline::from_config(config);
    let factory: Arc<dyn WorkerFactory> = match config.fetch_backend() {
        FetchBackendKind::Browser => {
            Arc::new(BrowserWorkerFactory::new(config.headless(), pipeline).await?)
        }
        FetchBackendKind::Reader => Arc::new(ReaderWorkerFactory::new(
            config.reader_url(),
            config.reader_api_key().map(str::to_string),
            pipeline,
        )?),
    };
    Ok(factory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("Browser".parse::<FetchBackendKind>(), Ok(FetchBackendKind::Browser));
        assert_eq!(" reader ".parse::<FetchBackendKind>(), Ok(FetchBackendKind::Reader));
        assert!("curl".parse::<FetchBackendKind>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&FetchBackendKind::Reader).unwrap(),
            "\"reader\""
        );
        assert_eq!(FetchBackendKind::Browser.to_string(), "browser");
    }
}
