use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SourceError;

const ANILIST_API_URL: &str = "https://graphql.anilist.co";
const PAGE_SIZE: i32 = 20;

/// AniList API client (no API key needed)
pub struct AniListClient {
    client: Client,
}

/// GraphQL request wrapper
#[derive(Debug, Serialize)]
struct GraphQLRequest {
    query: String,
    variables: serde_json::Value,
}

// === API Response Types ===

#[derive(Debug, Deserialize)]
struct GraphQLErrors {
    errors: Option<Vec<GraphQLErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorEntry {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    data: Option<PageData>,
}

#[derive(Debug, Deserialize)]
struct PageData {
    #[serde(rename = "Page")]
    page: Option<PageEnvelope>,
}

#[derive(Debug, Deserialize)]
struct PageEnvelope {
    media: Option<Vec<Option<Media>>>,
    #[serde(rename = "pageInfo")]
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    data: Option<MediaData>,
}

#[derive(Debug, Deserialize)]
struct MediaData {
    #[serde(rename = "Media")]
    media: Option<Media>,
}

/// AniList media (anime) data
#[derive(Debug, Clone, Deserialize)]
pub struct Media {
    pub id: i64,
    pub title: Option<Title>,
    #[serde(rename = "coverImage")]
    pub cover_image: Option<CoverImage>,
    pub description: Option<String>,
    pub episodes: Option<i32>,
    pub status: Option<String>,
    pub season: Option<String>,
    #[serde(rename = "seasonYear")]
    pub season_year: Option<i32>,
    pub format: Option<String>,
    pub genres: Option<Vec<Option<String>>>,
    #[serde(rename = "averageScore")]
    pub average_score: Option<i32>,
    pub studios: Option<StudioConnection>,
    pub relations: Option<RelationConnection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Title {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoverImage {
    #[serde(rename = "extraLarge")]
    pub extra_large: Option<String>,
    pub large: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudioConnection {
    pub nodes: Option<Vec<Studio>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Studio {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationConnection {
    pub edges: Option<Vec<Option<RelationEdge>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationEdge {
    #[serde(rename = "relationType")]
    pub relation_type: Option<String>,
    pub node: Option<Media>,
}

impl AniListClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// List shows sorted by popularity
    pub async fn popular(&self, page: i32) -> Result<(Vec<Media>, bool)> {
        let query = r#"
            query ($page: Int, $perPage: Int) {
                Page(page: $page, perPage: $perPage) {
                    pageInfo { hasNextPage }
                    media(type: ANIME, sort: POPULARITY_DESC) {
                        id
                        title { romaji english native }
                        coverImage { extraLarge large }
                        description
                        episodes
                        status
                        seasonYear
                        format
                        genres
                        relations {
                            edges {
                                relationType
                            }
                        }
                    }
                }
            }
        "#;

        let variables = serde_json::json!({ "page": page, "perPage": PAGE_SIZE });
        self.fetch_page(query, variables).await
    }

    /// Search for shows by title
    pub async fn search(&self, search: &str, page: i32) -> Result<(Vec<Media>, bool)> {
        let query = r#"
            query ($page: Int, $perPage: Int, $search: String) {
                Page(page: $page, perPage: $perPage) {
                    pageInfo { hasNextPage }
                    media(type: ANIME, search: $search) {
                        id
                        title { romaji english native }
                        coverImage { extraLarge large }
                        description
                        episodes
                        status
                        genres
                        relations {
                            edges {
                                relationType
                            }
                        }
                    }
                }
            }
        "#;

        let variables =
            serde_json::json!({ "page": page, "perPage": PAGE_SIZE, "search": search });
        self.fetch_page(query, variables).await
    }

    async fn fetch_page(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<(Vec<Media>, bool)> {
        let request = GraphQLRequest {
            query: query.to_string(),
            variables,
        };

        let response: PageResponse = self
            .client
            .post(ANILIST_API_URL)
            .json(&request)
            .send()
            .await
            .context("Failed to query AniList")?
            .json()
            .await
            .context("Failed to parse AniList page response")?;

        let page = response.data.and_then(|d| d.page);
        let has_next_page = page
            .as_ref()
            .and_then(|p| p.page_info.as_ref())
            .and_then(|i| i.has_next_page)
            .unwrap_or(false);
        let media = page
            .and_then(|p| p.media)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .collect();

        Ok((media, has_next_page))
    }

    /// Get full show details by AniList ID, including the relation graph.
    /// An explicit error payload is surfaced with the provider's message.
    pub async fn details(&self, anilist_id: i64) -> crate::error::Result<Media> {
        let query = r#"
            query ($id: Int) {
                Media(id: $id, type: ANIME) {
                    id
                    title { romaji english native }
                    coverImage { extraLarge large }
                    description
                    episodes
                    status
                    seasonYear
                    season
                    format
                    genres
                    averageScore
                    studios { nodes { name } }
                    relations {
                        edges {
                            relationType
                            node {
                                id
                                title { romaji english native }
                                coverImage { extraLarge large }
                                episodes
                                status
                                format
                            }
                        }
                    }
                }
            }
        "#;

        let request = GraphQLRequest {
            query: query.to_string(),
            variables: serde_json::json!({ "id": anilist_id }),
        };

        let body = self
            .client
            .post(ANILIST_API_URL)
            .json(&request)
            .send()
            .await
            .context("Failed to query AniList")?
            .text()
            .await
            .context("Failed to read AniList response")?;

        if let Some(message) = extract_error_message(&body) {
            return Err(SourceError::Api(format!("AniList API error: {message}")));
        }

        let parsed: MediaResponse =
            serde_json::from_str(&body).context("Failed to parse AniList details response")?;
        Ok(parsed
            .data
            .and_then(|d| d.media)
            .context("Failed to parse anime details")?)
    }
}

impl Default for AniListClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulls the first error message out of a GraphQL error payload, if any.
pub fn extract_error_message(body: &str) -> Option<String> {
    if !body.contains("\"errors\"") {
        return None;
    }
    let parsed: GraphQLErrors = serde_json::from_str(body).ok()?;
    let errors = parsed.errors?;
    Some(
        errors
            .into_iter()
            .next()
            .and_then(|e| e.message)
            .unwrap_or_else(|| "Unknown AniList error".to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"errors":[{"message":"Not Found.","status":404}],"data":null}"#;
        assert_eq!(extract_error_message(body), Some("Not Found.".to_string()));

        let ok = r#"{"data":{"Media":{"id":1}}}"#;
        assert_eq!(extract_error_message(ok), None);
    }

    #[test]
    fn test_extract_error_message_without_text() {
        let body = r#"{"errors":[{"status":500}],"data":null}"#;
        assert_eq!(
            extract_error_message(body),
            Some("Unknown AniList error".to_string())
        );
    }

    #[test]
    fn test_parse_details_response() {
        let body = r#"{
            "data": {
                "Media": {
                    "id": 101,
                    "title": {"romaji": "Shingeki", "english": "Attack", "native": "進撃"},
                    "coverImage": {"extraLarge": "https://img/xl.jpg", "large": "https://img/l.jpg"},
                    "description": "<p>Walls.</p>",
                    "episodes": 25,
                    "status": "FINISHED",
                    "seasonYear": 2013,
                    "season": "SPRING",
                    "format": "TV",
                    "genres": ["Action", null],
                    "averageScore": 84,
                    "studios": {"nodes": [{"name": "WIT"}]},
                    "relations": {"edges": [
                        {"relationType": "SEQUEL", "node": {"id": 102, "title": {"romaji": "S2"}}}
                    ]}
                }
            }
        }"#;
        let parsed: MediaResponse = serde_json::from_str(body).unwrap();
        let media = parsed.data.unwrap().media.unwrap();
        assert_eq!(media.id, 101);
        assert_eq!(media.episodes, Some(25));
        let edges = media.relations.unwrap().edges.unwrap();
        assert_eq!(edges.len(), 1);
        let edge = edges[0].as_ref().unwrap();
        assert_eq!(edge.relation_type.as_deref(), Some("SEQUEL"));
        assert_eq!(edge.node.as_ref().unwrap().id, 102);
    }

    #[test]
    fn test_parse_page_response() {
        let body = r#"{
            "data": {
                "Page": {
                    "pageInfo": {"hasNextPage": true},
                    "media": [{"id": 5, "title": {"romaji": "Foo"}}, null]
                }
            }
        }"#;
        let parsed: PageResponse = serde_json::from_str(body).unwrap();
        let page = parsed.data.unwrap().page.unwrap();
        let media: Vec<Media> = page.media.unwrap().into_iter().flatten().collect();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].id, 5);
        assert_eq!(page.page_info.unwrap().has_next_page, Some(true));
    }
}
