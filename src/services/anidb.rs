// AniDB episode-title provider
// API Documentation: https://wiki.anidb.net/HTTP_API_Definition
// AniDB enforces a strict rate limit (1 request per ~2 seconds), so every
// request waits out a minimum spacing first, and results live in a bounded
// in-memory cache so repeat lookups never hit the network.

use reqwest::Client;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const ANIDB_API_BASE: &str = "http://api.anidb.net:9001/httpapi";
// AniDB requires a registered client identifier
const ANIDB_CLIENT: &str = "anisource";
const ANIDB_CLIENT_VER: i32 = 1;
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(2500);
const CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);
const CACHE_MAX_ENTRIES: usize = 64;

struct CacheEntry {
    fetched_at: Instant,
    titles: HashMap<String, String>,
}

/// AniDB API client with rate limiting and a bounded title cache
pub struct AniDbClient {
    client: Client,
    last_request: Mutex<Option<Instant>>,
    cache: Mutex<HashMap<i64, CacheEntry>>,
}

impl AniDbClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            last_request: Mutex::new(None),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Enforce the minimum spacing between requests. Callers awaiting here
    /// serialize on the provider without blocking a thread.
    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                let wait = MIN_REQUEST_INTERVAL - elapsed;
                tracing::debug!("AniDB rate limit: waiting {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Episode titles keyed by episode number string. Failures degrade to
    /// an empty map; episode titles are never worth failing a listing for.
    pub async fn episode_titles(&self, anidb_id: i64) -> HashMap<String, String> {
        {
            let cache = self.cache.lock().await;
            if let Some(entry) = cache.get(&anidb_id) {
                if entry.fetched_at.elapsed() < CACHE_TTL {
                    return entry.titles.clone();
                }
            }
        }

        let titles = match self.fetch_titles(anidb_id).await {
            Ok(titles) => titles,
            Err(e) => {
                tracing::warn!("AniDB episode titles failed for {}: {:#}", anidb_id, e);
                return HashMap::new();
            }
        };

        let mut cache = self.cache.lock().await;
        if cache.len() >= CACHE_MAX_ENTRIES && !cache.contains_key(&anidb_id) {
            // Evict the stalest entry to keep the cache bounded.
            if let Some(oldest) = cache
                .iter()
                .min_by_key(|(_, entry)| entry.fetched_at)
                .map(|(id, _)| *id)
            {
                cache.remove(&oldest);
            }
        }
        cache.insert(
            anidb_id,
            CacheEntry {
                fetched_at: Instant::now(),
                titles: titles.clone(),
            },
        );

        titles
    }

    async fn fetch_titles(&self, anidb_id: i64) -> anyhow::Result<HashMap<String, String>> {
        use anyhow::Context;

        self.rate_limit().await;

        let url = format!(
            "{}?request=anime&client={}&clientver={}&protover=1&aid={}",
            ANIDB_API_BASE, ANIDB_CLIENT, ANIDB_CLIENT_VER, anidb_id
        );

        tracing::debug!("Fetching AniDB anime: {}", anidb_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch from AniDB")?;

        if !response.status().is_success() {
            anyhow::bail!("AniDB request failed: HTTP {}", response.status());
        }

        let xml = response.text().await.context("Failed to read AniDB body")?;
        if xml.contains("<error") {
            anyhow::bail!("AniDB returned an error document");
        }

        Ok(parse_episode_titles(&xml))
    }

    /// Drop every cached title map.
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }
}

impl Default for AniDbClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the `<episodes>` section of an AniDB anime document into a map of
/// episode number -> best title. AniDB XML is flat enough that string
/// scanning beats pulling in an XML dependency.
fn parse_episode_titles(xml: &str) -> HashMap<String, String> {
    let mut titles = HashMap::new();

    let Some(start) = xml.find("<episodes>") else {
        return titles;
    };
    let Some(len) = xml[start..].find("</episodes>") else {
        return titles;
    };
    let episodes_xml = &xml[start..start + len];

    let mut pos = 0;
    while let Some(offset) = episodes_xml[pos..].find("<episode ") {
        let episode_start = pos + offset;
        let Some(end_offset) = episodes_xml[episode_start..].find("</episode>") else {
            break;
        };
        let episode_xml = &episodes_xml[episode_start..episode_start + end_offset];
        pos = episode_start + end_offset + "</episode>".len();

        let Some(epno) = extract_xml_content(episode_xml, "epno") else {
            continue;
        };
        let title = best_episode_title(episode_xml);
        if !title.is_empty() {
            titles.insert(epno, title);
        }
    }

    titles
}

/// Language priority: x-jat (romaji) > en > ja > first non-blank.
fn best_episode_title(episode_xml: &str) -> String {
    let variants = episode_title_variants(episode_xml);
    for lang in ["x-jat", "en", "ja"] {
        if let Some((_, title)) = variants
            .iter()
            .find(|(l, title)| l == lang && !title.is_empty())
        {
            return title.clone();
        }
    }
    variants
        .into_iter()
        .map(|(_, title)| title)
        .find(|title| !title.is_empty())
        .unwrap_or_default()
}

/// Collect every `<title xml:lang="…">…</title>` inside one episode block.
fn episode_title_variants(episode_xml: &str) -> Vec<(String, String)> {
    let mut variants = Vec::new();
    let mut pos = 0;
    while let Some(offset) = episode_xml[pos..].find("<title") {
        let start = pos + offset;
        let Some(tag_end) = episode_xml[start..].find('>') else {
            break;
        };
        let tag = &episode_xml[start..start + tag_end];
        let content_start = start + tag_end + 1;
        let Some(end) = episode_xml[content_start..].find("</title>") else {
            break;
        };
        let text = html_decode(episode_xml[content_start..content_start + end].trim());
        let lang = extract_attr(tag, "xml:lang").unwrap_or_else(|| "en".to_string());
        variants.push((lang, text));
        pos = content_start + end + "</title>".len();
    }
    variants
}

fn extract_attr(tag: &str, attr: &str) -> Option<String> {
    let pattern = format!("{}=\"", attr);
    let start = tag.find(&pattern)? + pattern.len();
    let rest = &tag[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

/// Content of the first `<tag>…</tag>` occurrence.
fn extract_xml_content(xml: &str, tag: &str) -> Option<String> {
    let start_tag = format!("<{}", tag);
    let end_tag = format!("</{}>", tag);

    let start = xml.find(&start_tag)?;
    let tag_end = xml[start..].find('>')?;
    let content_start = start + tag_end + 1;
    let end = xml[content_start..].find(&end_tag)?;
    Some(html_decode(xml[content_start..content_start + end].trim()))
}

/// Basic HTML entity decoding
fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <anime id="17617">
            <type>TV Series</type>
            <episodecount>28</episodecount>
            <episodes>
                <episode id="270601">
                    <epno type="1">1</epno>
                    <title xml:lang="x-jat">Tabi no Owari</title>
                    <title xml:lang="en">The Journey's End</title>
                    <title xml:lang="ja">旅の終わり</title>
                </episode>
                <episode id="270602">
                    <epno type="1">2</epno>
                    <title xml:lang="en">It Didn&apos;t Have to Be Magic</title>
                </episode>
                <episode id="270699">
                    <epno type="2">S1</epno>
                    <title xml:lang="en">Special</title>
                </episode>
            </episodes>
        </anime>
    "#;

    #[test]
    fn test_parse_episode_titles_prefers_xjat() {
        let titles = parse_episode_titles(SAMPLE);
        assert_eq!(titles.get("1").map(String::as_str), Some("Tabi no Owari"));
    }

    #[test]
    fn test_parse_episode_titles_falls_back_to_english() {
        let titles = parse_episode_titles(SAMPLE);
        assert_eq!(
            titles.get("2").map(String::as_str),
            Some("It Didn't Have to Be Magic")
        );
    }

    #[test]
    fn test_parse_keeps_special_episode_keys() {
        let titles = parse_episode_titles(SAMPLE);
        assert_eq!(titles.get("S1").map(String::as_str), Some("Special"));
    }

    #[test]
    fn test_parse_without_episodes_section() {
        assert!(parse_episode_titles("<anime id=\"1\"></anime>").is_empty());
    }

    #[test]
    fn test_html_decode() {
        assert_eq!(html_decode("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(html_decode("a &lt; b"), "a < b");
    }

    #[test]
    fn test_extract_xml_content() {
        let xml = "<anime><epno type=\"1\">12</epno></anime>";
        assert_eq!(extract_xml_content(xml, "epno"), Some("12".to_string()));
        assert_eq!(extract_xml_content(xml, "missing"), None);
    }
}
