//! Domain catalog — the immutable, ordered list of domains to present.
//!
//! Loaded once from newline-delimited text, either a local file or an
//! `http(s)://` URL. Lines are trimmed and blanks dropped; duplicates are
//! kept as-is.

use labeler_core::error::CatalogError;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on fetching a catalog URL.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// The fixed list of domains available for classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    domains: Vec<String>,
}

impl Catalog {
    pub fn new(domains: Vec<String>) -> Self {
        Self { domains }
    }

    /// Parse newline-delimited text.
    pub fn parse(text: &str) -> Self {
        let domains = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        Self { domains }
    }

    /// Load from a file path or an `http(s)://` URL.
    pub async fn load(source: &str) -> Result<Self, CatalogError> {
        Self::load_with_timeout(source, FETCH_TIMEOUT).await
    }

    /// Like [`Catalog::load`], giving up on a URL after `timeout`.
    pub async fn load_with_timeout(source: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let unavailable = |reason: String| CatalogError::Unavailable {
            location: source.to_string(),
            reason,
        };

        let text = if is_url(source) {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| unavailable(e.to_string()))?;
            let response = client
                .get(source)
                .send()
                .await
                .map_err(|e| unavailable(e.to_string()))?;
            if !response.status().is_success() {
                return Err(unavailable(format!("HTTP status {}", response.status().as_u16())));
            }
            response.text().await.map_err(|e| unavailable(e.to_string()))?
        } else {
            tokio::fs::read_to_string(source)
                .await
                .map_err(|e| unavailable(e.to_string()))?
        };

        let catalog = Self::parse(&text);
        debug!(source, domains = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Load, degrading to an empty catalog when the source is unavailable.
    pub async fn load_or_empty(source: &str) -> Self {
        match Self::load(source).await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %e, "Catalog unavailable, continuing with no domains");
                Self::default()
            }
        }
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.iter().any(|d| d == domain)
    }
}

fn is_url(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// The address a front end should open for `domain`.
///
/// Bare hosts get an `https://` prefix; values that already carry an
/// `http(s)://` scheme are returned unchanged.
pub fn browse_url(domain: &str) -> String {
    if is_url(domain) {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}
