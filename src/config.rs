// Service Configuration
use crate::errors::{PipelineError, PipelineResult};
use reqwest::Url;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "https://api.bitbucket.org/2.0";
pub const DEFAULT_PORT: u16 = 3444;

/// Which front ends the process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    Stdio,
    Both,
}

impl Transport {
    pub fn serves_http(&self) -> bool {
        matches!(self, Transport::Http | Transport::Both)
    }

    pub fn serves_stdio(&self) -> bool {
        matches!(self, Transport::Stdio | Transport::Both)
    }
}

impl FromStr for Transport {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Transport::Http),
            "stdio" => Ok(Transport::Stdio),
            "both" => Ok(Transport::Both),
            other => Err(PipelineError::Configuration(format!(
                "MCP_TRANSPORT must be one of http, stdio, both (got '{}')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(PipelineError::Configuration(format!(
                "LOG_FORMAT must be text or json (got '{}')",
                other
            ))),
        }
    }
}

/// Access token wrapper that never prints its contents.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub access_token: AccessToken,
    pub api_url: Url,
    pub workspace: String,
    pub repo_slug: String,
    pub host: String,
    pub port: u16,
    pub transport: Transport,
    pub log_format: LogFormat,
}

impl ServiceConfig {
    pub fn from_env() -> PipelineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> PipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> PipelineResult<String> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(PipelineError::Configuration(format!(
                    "{} is required and must not be empty",
                    key
                ))),
            }
        };
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let access_token = AccessToken::new(required("BITBUCKET_ACCESS_TOKEN")?);
        let workspace = required("BITBUCKET_WORKSPACE")?;
        let repo_slug = required("BITBUCKET_REPO_SLUG")?;

        let raw_url = optional("BITBUCKET_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(raw_url.trim()).map_err(|e| {
            PipelineError::Configuration(format!("BITBUCKET_API_URL is not a valid URL: {}", e))
        })?;
        if !matches!(api_url.scheme(), "http" | "https") || api_url.cannot_be_a_base() {
            return Err(PipelineError::Configuration(format!(
                "BITBUCKET_API_URL must be an http(s) URL (got '{}')",
                raw_url
            )));
        }

        let port = match optional("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                PipelineError::Configuration(format!("PORT must be a port number (got '{}')", raw))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            access_token,
            api_url,
            workspace,
            repo_slug,
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            transport: optional("MCP_TRANSPORT")
                .map(|raw| raw.parse::<Transport>())
                .transpose()?
                .unwrap_or(Transport::Http),
            log_format: optional("LOG_FORMAT")
                .map(|raw| raw.parse::<LogFormat>())
                .transpose()?
                .unwrap_or(LogFormat::Text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("BITBUCKET_ACCESS_TOKEN", "test-token"),
        ("BITBUCKET_WORKSPACE", "test-workspace"),
        ("BITBUCKET_REPO_SLUG", "test-repo"),
    ];

    #[test]
    fn applies_defaults() {
        let config = ServiceConfig::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(config.api_url.as_str(), "https://api.bitbucket.org/2.0");
        assert_eq!(config.port, 3444);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.access_token.expose(), "test-token");
    }

    #[test]
    fn missing_token_is_fatal() {
        let err = ServiceConfig::from_lookup(lookup(&BASE[1..])).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(err.to_string().contains("BITBUCKET_ACCESS_TOKEN"));
    }

    #[test]
    fn empty_workspace_is_rejected() {
        let mut pairs = BASE.to_vec();
        pairs[1] = ("BITBUCKET_WORKSPACE", "  ");
        let err = ServiceConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("BITBUCKET_WORKSPACE"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("BITBUCKET_API_URL", "http://localhost:9000/2.0"),
            ("PORT", "8080"),
            ("MCP_TRANSPORT", "Both"),
            ("LOG_FORMAT", "json"),
        ]);
        let config = ServiceConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:9000/2.0");
        assert_eq!(config.port, 8080);
        assert!(config.transport.serves_http() && config.transport.serves_stdio());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn bad_port_and_url_are_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PORT", "not-a-port"));
        assert!(ServiceConfig::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = BASE.to_vec();
        pairs.push(("BITBUCKET_API_URL", "ftp://example.com"));
        assert!(ServiceConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn debug_output_hides_token() {
        let config = ServiceConfig::from_lookup(lookup(BASE)).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("test-token"));
        assert!(printed.contains("[REDACTED]"));
    }
}
