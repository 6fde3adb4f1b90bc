// Episode-mapping service client (api.ani.zip)
// One GET keyed by AniList ID returns per-episode metadata plus the
// cross-referenced catalog IDs for the whole show.

use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Result, SourceError};

const ANIZIP_API_BASE: &str = "https://api.ani.zip";

pub struct AniZipClient {
    client: Client,
}

// === API Response Types ===

#[derive(Debug, Clone, Deserialize)]
pub struct MappingsResponse {
    pub titles: Option<HashMap<String, Option<String>>>,
    pub episodes: Option<HashMap<String, Option<MappedEpisode>>>,
    #[serde(rename = "episodeCount")]
    pub episode_count: Option<i32>,
    #[serde(rename = "specialCount")]
    pub special_count: Option<i32>,
    pub mappings: Option<MappingIds>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappedEpisode {
    pub episode: Option<String>,
    #[serde(rename = "episodeNumber")]
    pub episode_number: Option<i32>,
    #[serde(rename = "absoluteEpisodeNumber")]
    pub absolute_episode_number: Option<i32>,
    #[serde(rename = "seasonNumber")]
    pub season_number: Option<i32>,
    /// Titles keyed by language tag ("en", "romaji", "native", "x-jat").
    pub title: Option<HashMap<String, Option<String>>>,
    pub length: Option<i32>,
    pub runtime: Option<i32>,
    #[serde(rename = "airdate")]
    pub air_date: Option<String>,
    #[serde(rename = "anidbEid")]
    pub anidb_episode_id: Option<i64>,
    pub overview: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingIds {
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    #[serde(rename = "anilist_id")]
    pub anilist_id: Option<i64>,
    #[serde(rename = "mal_id")]
    pub mal_id: Option<i64>,
    #[serde(rename = "kitsu_id")]
    pub kitsu_id: Option<i64>,
    #[serde(rename = "anidb_id")]
    pub anidb_id: Option<i64>,
    #[serde(rename = "thetvdb_id")]
    pub tvdb_id: Option<i64>,
    #[serde(rename = "imdb_id")]
    pub imdb_id: Option<String>,
    #[serde(rename = "themoviedb_id")]
    pub tmdb_id: Option<String>,
}

impl AniZipClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Fetch the mapping record for a show. Unlike the enrichment
    /// providers this is a hard failure: without it no episode list exists.
    pub async fn mappings(&self, anilist_id: i64) -> Result<MappingsResponse> {
        let url = format!("{}/mappings?anilist_id={}", ANIZIP_API_BASE, anilist_id);

        tracing::debug!("Fetching episode mappings for AniList ID {}", anilist_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch episode mappings")?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "Failed to fetch episodes: HTTP {}",
                response.status().as_u16()
            )));
        }

        Ok(response
            .json()
            .await
            .context("Failed to parse episode mappings")?)
    }
}

impl Default for AniZipClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mappings_response() {
        let body = r#"{
            "titles": {"en": "Frieren", "x-jat": "Sousou no Frieren", "ja": "葬送のフリーレン"},
            "episodeCount": 28,
            "specialCount": 0,
            "episodes": {
                "1": {
                    "episodeNumber": 1,
                    "seasonNumber": 1,
                    "absoluteEpisodeNumber": 1,
                    "title": {"en": "The Journey's End", "x-jat": "Tabi no Owari"},
                    "airdate": "2023-09-29",
                    "overview": "The hero's party returns.",
                    "image": "https://img/ep1.jpg",
                    "anidbEid": 270601
                },
                "S1": {"episodeNumber": 1, "seasonNumber": 0}
            },
            "mappings": {
                "type": "TV",
                "anilist_id": 154587,
                "mal_id": 52991,
                "kitsu_id": 46474,
                "anidb_id": 17617,
                "thetvdb_id": 424536,
                "imdb_id": "tt22248376",
                "themoviedb_id": "209867"
            }
        }"#;
        let parsed: MappingsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.episode_count, Some(28));

        let ids = parsed.mappings.unwrap();
        assert_eq!(ids.media_type.as_deref(), Some("TV"));
        assert_eq!(ids.anilist_id, Some(154587));
        assert_eq!(ids.imdb_id.as_deref(), Some("tt22248376"));
        assert_eq!(ids.tmdb_id.as_deref(), Some("209867"));
        assert_eq!(ids.tvdb_id, Some(424536));

        let episodes = parsed.episodes.unwrap();
        let first = episodes.get("1").unwrap().as_ref().unwrap();
        assert_eq!(first.air_date.as_deref(), Some("2023-09-29"));
        assert_eq!(
            first.title.as_ref().unwrap().get("en").unwrap().as_deref(),
            Some("The Journey's End")
        );
        assert!(episodes.contains_key("S1"));
    }

    #[test]
    fn test_parse_tolerates_null_fields() {
        let body = r#"{"titles": null, "episodes": {"2": null}, "mappings": {"type": "MOVIE"}}"#;
        let parsed: MappingsResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.titles.is_none());
        assert!(parsed.episodes.unwrap().get("2").unwrap().is_none());
        assert_eq!(
            parsed.mappings.unwrap().media_type.as_deref(),
            Some("MOVIE")
        );
    }
}
