// Stream aggregator client
// The endpoint and credentials both come out of a user-supplied manifest
// URL of the shape `scheme://host/stremio/<uuid>/<blob>/manifest.json`;
// the uuid/blob pair doubles as the Basic-auth credential.

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Connection settings derived from a manifest URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    pub base_url: String,
    pub user: String,
    pub secret: String,
}

impl AggregatorConfig {
    pub fn from_manifest_url(url: &str) -> Option<Self> {
        let pattern = Regex::new(r"(https?://[^/]+)/stremio/([^/]+)/([^/]+)/manifest\.json")
            .expect("valid manifest pattern");
        let captures = pattern.captures(url)?;
        Some(Self {
            base_url: captures[1].to_string(),
            user: captures[2].to_string(),
            secret: captures[3].to_string(),
        })
    }
}

// === API Response Types ===

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub data: Option<SearchData>,
}

#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub results: Option<Vec<StreamResult>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamResult {
    #[serde(rename = "infoHash")]
    pub info_hash: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

pub struct AggregatorClient {
    client: Client,
}

impl AggregatorClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Look up streams for one composite ID.
    pub async fn search(
        &self,
        config: &AggregatorConfig,
        media_type: &str,
        id: &str,
    ) -> Result<SearchResponse> {
        let url = format!(
            "{}/api/v1/search?type={}&id={}&format=true&requiredFields=infoHash",
            config.base_url,
            urlencoding::encode(media_type),
            urlencoding::encode(id)
        );

        tracing::debug!("Aggregator search: type={} id={}", media_type, id);

        let response = self
            .client
            .get(&url)
            .basic_auth(&config.user, Some(&config.secret))
            .send()
            .await
            .context("Failed to query stream aggregator")?;

        if !response.status().is_success() {
            anyhow::bail!("Stream aggregator error: HTTP {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse stream aggregator response")
    }
}

impl Default for AggregatorClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_url_parses() {
        let config = AggregatorConfig::from_manifest_url(
            "https://streams.example.org/stremio/3f1a/ENCBLOB99/manifest.json",
        )
        .unwrap();
        assert_eq!(config.base_url, "https://streams.example.org");
        assert_eq!(config.user, "3f1a");
        assert_eq!(config.secret, "ENCBLOB99");
    }

    #[test]
    fn test_manifest_url_rejects_other_shapes() {
        assert!(AggregatorConfig::from_manifest_url("https://example.org/manifest.json").is_none());
        assert!(AggregatorConfig::from_manifest_url("not a url").is_none());
        assert!(
            AggregatorConfig::from_manifest_url("ftp://host/stremio/a/b/manifest.json").is_none()
        );
    }

    #[test]
    fn test_parse_search_response() {
        let body = r#"{
            "data": {
                "results": [
                    {"infoHash": "ABC123", "name": "Release", "description": "1080p", "url": "magnet:?xt=urn:btih:abc123"},
                    {"name": "no hash"}
                ]
            }
        }"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        let results = parsed.data.unwrap().results.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].info_hash.as_deref(), Some("ABC123"));
        assert!(results[1].info_hash.is_none());
    }
}
