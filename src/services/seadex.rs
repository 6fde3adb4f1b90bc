// Curated best-release lookup from SeaDex (releases.moe)
// One collection query per show, keyed by AniList ID. Failures degrade to
// an empty set - curation is a nice-to-have on top of the stream list.

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

const SEADEX_API_BASE: &str = "https://releases.moe/api/collections/entries/records";

pub struct SeaDexClient {
    client: Client,
}

// === API Response Types ===

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    items: Option<Vec<EntryRecord>>,
}

#[derive(Debug, Deserialize)]
struct EntryRecord {
    expand: Option<EntryExpand>,
}

#[derive(Debug, Deserialize)]
struct EntryExpand {
    trs: Option<Vec<TorrentRecord>>,
}

#[derive(Debug, Deserialize)]
struct TorrentRecord {
    #[serde(rename = "infoHash")]
    info_hash: Option<String>,
    #[serde(rename = "isBest")]
    is_best: Option<bool>,
}

impl SeaDexClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Info hashes of the curated releases for a show. Prefers hashes
    /// flagged best; falls back to the remaining curated hashes only when
    /// no best flag exists at all.
    pub async fn best_hashes(&self, anilist_id: i64) -> HashSet<String> {
        match self.try_best_hashes(anilist_id).await {
            Ok(hashes) => hashes,
            Err(e) => {
                tracing::debug!("SeaDex lookup failed for {}: {:#}", anilist_id, e);
                HashSet::new()
            }
        }
    }

    async fn try_best_hashes(&self, anilist_id: i64) -> anyhow::Result<HashSet<String>> {
        use anyhow::Context;

        let url = format!(
            "{}?expand=trs&filter=alID={}&sort=-trs.isBest",
            SEADEX_API_BASE, anilist_id
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to query SeaDex")?;

        if !response.status().is_success() {
            anyhow::bail!("SeaDex request failed: HTTP {}", response.status());
        }

        let parsed: RecordsResponse = response
            .json()
            .await
            .context("Failed to parse SeaDex response")?;

        Ok(collect_hashes(parsed))
    }
}

impl Default for SeaDexClient {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_hashes(response: RecordsResponse) -> HashSet<String> {
    let mut best = HashSet::new();
    let mut fallback = HashSet::new();

    for item in response.items.unwrap_or_default() {
        let Some(torrents) = item.expand.and_then(|e| e.trs) else {
            continue;
        };
        for torrent in torrents {
            let hash = torrent
                .info_hash
                .map(|h| h.to_lowercase())
                .unwrap_or_default();
            if hash.is_empty() || hash == "<redacted>" {
                continue;
            }
            if torrent.is_best.unwrap_or(false) {
                best.insert(hash);
            } else {
                fallback.insert(hash);
            }
        }
    }

    if best.is_empty() {
        fallback
    } else {
        best
    }
}
