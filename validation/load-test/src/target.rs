//! Target environments for the load test.

use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("Unknown environment: {0} (expected staging or production)")]
    UnknownEnvironment(String),

    #[error("Invalid {field} '{url}': {message}")]
    InvalidUrl {
        field: &'static str,
        url: String,
        message: String,
    },
}

/// Deployed environment to send traffic to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// UI and API base URLs for this environment.
    pub fn target(&self) -> Target {
        let (base_url, api_url) = match self {
            Environment::Staging => (
                "https://ccc.staging.climatepolicyradar.org",
                "https://cpr.staging.climatepolicyradar.org",
            ),
            Environment::Production => (
                "https://ccc.climatepolicyradar.org",
                "https://cpr.climatepolicyradar.org",
            ),
        };
        Target {
            base_url: base_url.to_string(),
            api_url: api_url.to_string(),
        }
    }
}

impl FromStr for Environment {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(TargetError::UnknownEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pair of absolute URLs a walk sends traffic to.
///
/// `base_url` serves the UI pages, `api_url` serves the JSON API. Both are
/// stored without a trailing slash so routes can be appended directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub base_url: String,
    pub api_url: String,
}

impl Target {
    /// Build a target from explicit URLs, validating that both are absolute.
    pub fn new(base_url: &str, api_url: &str) -> Result<Self, TargetError> {
        Ok(Self {
            base_url: normalize("base_url", base_url)?,
            api_url: normalize("api_url", api_url)?,
        })
    }

    pub fn landing_url(&self) -> String {
        self.base_url.clone()
    }

    pub fn config_url(&self) -> String {
        format!("{}/api/v1/config", self.api_url)
    }

    pub fn search_page_url(&self, encoded_query: &str) -> String {
        format!("{}/search?q={}", self.base_url, encoded_query)
    }

    pub fn search_api_url(&self) -> String {
        format!("{}/api/v1/searches", self.api_url)
    }

    /// Document detail page (plural route).
    pub fn document_url(&self, slug: &str) -> String {
        format!("{}/documents/{}", self.base_url, slug)
    }

    /// Family detail page (singular route).
    pub fn family_url(&self, slug: &str) -> String {
        format!("{}/document/{}", self.base_url, slug)
    }
}

fn normalize(field: &'static str, url: &str) -> Result<String, TargetError> {
    let trimmed = url.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|e| TargetError::InvalidUrl {
        field,
        url: url.to_string(),
        message: e.to_string(),
    })?;
    if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
        return Err(TargetError::InvalidUrl {
            field,
            url: url.to_string(),
            message: "expected an absolute http(s) URL".to_string(),
        });
    }
    Ok(trimmed.to_string())
}
