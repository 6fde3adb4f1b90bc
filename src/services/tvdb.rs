// TVDB API v4 client for rich episode metadata
// Requires an API key; the key is exchanged for a bearer token via a login
// call. Tokens are valid for a month upstream but refreshed weekly.
// All lookups degrade to None/empty on failure - TVDB is an enrichment
// source, never a hard dependency.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const TVDB_API_BASE: &str = "https://api4.thetvdb.com/v4";
const TOKEN_REFRESH: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub struct TvdbClient {
    client: Client,
    api_key: String,
    token: Mutex<Option<(String, Instant)>>,
}

// === API Response Types ===

#[derive(Debug, Deserialize)]
struct LoginResponse {
    data: Option<TokenData>,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EpisodesResponse {
    data: Option<Vec<EpisodeRecord>>,
    links: Option<LinksData>,
}

#[derive(Debug, Deserialize)]
struct LinksData {
    next: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeRecord {
    pub id: Option<i64>,
    #[serde(rename = "seasonNumber")]
    pub season_number: Option<i32>,
    #[serde(rename = "number")]
    pub number: Option<i32>,
    #[serde(rename = "absoluteNumber")]
    pub absolute_number: Option<i32>,
    pub name: Option<String>,
    pub overview: Option<String>,
    #[serde(rename = "aired")]
    pub air_date: Option<String>,
    #[serde(rename = "image")]
    pub image_url: Option<String>,
    #[serde(rename = "runtime")]
    pub runtime: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<Vec<SearchHit>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub name: Option<String>,
    // The search endpoint returns IDs as strings, remoteid as numbers.
    #[serde(rename = "tvdb_id", default, deserialize_with = "de_lenient_id")]
    pub tvdb_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SeriesExtendedResponse {
    data: Option<SeriesExtendedData>,
}

#[derive(Debug, Deserialize)]
struct SeriesExtendedData {
    episodes: Option<Vec<EpisodeRecord>>,
}

/// Accepts a numeric or string-encoded ID.
fn de_lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }))
}

impl TvdbClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_key,
            token: Mutex::new(None),
        }
    }

    /// Returns a valid bearer token, logging in when absent or past the
    /// refresh window.
    async fn bearer_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some((value, refreshed_at)) = token.as_ref() {
            if refreshed_at.elapsed() < TOKEN_REFRESH {
                return Ok(value.clone());
            }
        }

        tracing::debug!("Logging in to TVDB");
        let response = self
            .client
            .post(format!("{}/login", TVDB_API_BASE))
            .json(&serde_json::json!({ "apikey": self.api_key }))
            .send()
            .await
            .context("Failed to log in to TVDB")?;

        if !response.status().is_success() {
            anyhow::bail!("TVDB login failed: HTTP {}", response.status());
        }

        let login: LoginResponse = response
            .json()
            .await
            .context("Failed to parse TVDB login response")?;
        let value = login
            .data
            .and_then(|d| d.token)
            .context("TVDB login response missing token")?;

        *token = Some((value.clone(), Instant::now()));
        Ok(value)
    }

    /// Search for series by name
    pub async fn search_series(&self, query: &str) -> Vec<SearchHit> {
        match self.try_search_series(query).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("TVDB search failed for '{}': {:#}", query, e);
                Vec::new()
            }
        }
    }

    async fn try_search_series(&self, query: &str) -> Result<Vec<SearchHit>> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{}/search?query={}&type=series",
            TVDB_API_BASE,
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to search TVDB")?;

        if !response.status().is_success() {
            anyhow::bail!("TVDB search failed: HTTP {}", response.status());
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("Failed to parse TVDB search response")?;
        Ok(parsed.data.unwrap_or_default())
    }

    /// Resolve a TVDB series ID from an external ID (e.g. an IMDB ID)
    pub async fn find_by_remote_id(&self, remote_id: &str) -> Option<i64> {
        match self.try_find_by_remote_id(remote_id).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("TVDB remote-id lookup failed for {}: {:#}", remote_id, e);
                None
            }
        }
    }

    async fn try_find_by_remote_id(&self, remote_id: &str) -> Result<Option<i64>> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{}/search/remoteid?id={}",
            TVDB_API_BASE,
            urlencoding::encode(remote_id)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to query TVDB remote IDs")?;

        if !response.status().is_success() {
            anyhow::bail!("TVDB remote-id lookup failed: HTTP {}", response.status());
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("Failed to parse TVDB remote-id response")?;
        Ok(parsed
            .data
            .unwrap_or_default()
            .into_iter()
            .find_map(|hit| hit.tvdb_id))
    }

    /// Get every episode of a series. Tries the extended endpoint first,
    /// then falls back to the paginated default order.
    pub async fn all_episodes(&self, series_id: i64) -> Vec<EpisodeRecord> {
        match self.try_all_episodes(series_id).await {
            Ok(episodes) => episodes,
            Err(e) => {
                tracing::warn!("TVDB episode fetch failed for {}: {:#}", series_id, e);
                Vec::new()
            }
        }
    }

    async fn try_all_episodes(&self, series_id: i64) -> Result<Vec<EpisodeRecord>> {
        let token = self.bearer_token().await?;

        let url = format!(
            "{}/series/{}/extended?meta=episodes",
            TVDB_API_BASE, series_id
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to fetch TVDB series")?;

        if response.status().is_success() {
            let parsed: SeriesExtendedResponse = response
                .json()
                .await
                .context("Failed to parse TVDB series response")?;
            if let Some(episodes) = parsed.data.and_then(|d| d.episodes) {
                if !episodes.is_empty() {
                    return Ok(episodes);
                }
            }
        }

        let mut all_episodes = Vec::new();
        let mut page = 1;
        loop {
            let url = format!(
                "{}/series/{}/episodes/default?page={}",
                TVDB_API_BASE, series_id, page
            );
            let response = self
                .client
                .get(&url)
                .bearer_auth(&token)
                .header("Accept", "application/json")
                .send()
                .await
                .context("Failed to fetch TVDB episodes")?;

            if !response.status().is_success() {
                break;
            }

            let parsed: EpisodesResponse = response
                .json()
                .await
                .context("Failed to parse TVDB episodes response")?;
            let Some(episodes) = parsed.data else { break };
            all_episodes.extend(episodes);

            match parsed.links.and_then(|l| l.next) {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(all_episodes)
    }

    /// Key episodes by absolute number where available, falling back to the
    /// plain episode number for season 1 and `S{n}E{m}` otherwise.
    pub fn episodes_to_map(episodes: &[EpisodeRecord]) -> HashMap<String, EpisodeRecord> {
        let mut map = HashMap::new();
        for episode in episodes {
            if let Some(absolute) = episode.absolute_number {
                map.insert(absolute.to_string(), episode.clone());
            } else if let (Some(number), Some(season)) = (episode.number, episode.season_number) {
                let key = if season == 1 {
                    number.to_string()
                } else {
                    format!("S{}E{}", season, number)
                };
                map.insert(key, episode.clone());
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        absolute: Option<i32>,
        season: Option<i32>,
        number: Option<i32>,
        name: &str,
    ) -> EpisodeRecord {
        EpisodeRecord {
            id: Some(1),
            season_number: season,
            number,
            absolute_number: absolute,
            name: Some(name.to_string()),
            overview: None,
            air_date: None,
            image_url: None,
            runtime: None,
        }
    }

    #[test]
    fn test_episodes_to_map_prefers_absolute_numbers() {
        let episodes = vec![
            record(Some(26), Some(2), Some(1), "S2 opener"),
            record(None, Some(1), Some(3), "plain"),
            record(None, Some(2), Some(4), "later season"),
        ];
        let map = TvdbClient::episodes_to_map(&episodes);
        assert_eq!(map.get("26").unwrap().name.as_deref(), Some("S2 opener"));
        assert_eq!(map.get("3").unwrap().name.as_deref(), Some("plain"));
        assert_eq!(
            map.get("S2E4").unwrap().name.as_deref(),
            Some("later season")
        );
    }

    #[test]
    fn test_episodes_to_map_skips_unkeyable_records() {
        let episodes = vec![record(None, None, Some(2), "no season")];
        assert!(TvdbClient::episodes_to_map(&episodes).is_empty());
    }

    #[test]
    fn test_search_hit_accepts_string_and_numeric_ids() {
        let hit: SearchHit =
            serde_json::from_str(r#"{"name": "Show", "tvdb_id": "431162"}"#).unwrap();
        assert_eq!(hit.tvdb_id, Some(431162));

        let hit: SearchHit = serde_json::from_str(r#"{"name": "Show", "tvdb_id": 99}"#).unwrap();
        assert_eq!(hit.tvdb_id, Some(99));

        let hit: SearchHit = serde_json::from_str(r#"{"name": "Show"}"#).unwrap();
        assert_eq!(hit.tvdb_id, None);
    }

    #[test]
    fn test_parse_episodes_page() {
        let body = r#"{
            "data": [
                {"id": 1, "seasonNumber": 1, "number": 1, "absoluteNumber": 1,
                 "name": "Pilot", "aired": "2020-01-05", "image": "/img/1.jpg", "runtime": 24}
            ],
            "links": {"next": 2, "total_items": 40}
        }"#;
        let parsed: EpisodesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.links.unwrap().next, Some(2));
        let episodes = parsed.data.unwrap();
        assert_eq!(episodes[0].air_date.as_deref(), Some("2020-01-05"));
    }
}
