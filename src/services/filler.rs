// Filler episode lists scraped from animefillerlist.com
// The page is keyed by a slug derived from the show title; the relevant
// sections are labeled spans whose next sibling holds the episode ranges.
// Every failure degrades to "no filler data".

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;

const FILLER_BASE_URL: &str = "https://www.animefillerlist.com/shows";

/// Episode sets parsed from a show's filler page.
#[derive(Debug, Clone, Default)]
pub struct FillerData {
    pub filler: HashSet<i32>,
    pub mixed: HashSet<i32>,
}

pub struct FillerClient {
    client: Client,
}

impl FillerClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Fetch filler and mixed canon/filler sets for a show slug.
    pub async fn filler_data(&self, slug: &str) -> FillerData {
        let url = format!("{}/{}", FILLER_BASE_URL, slug);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Filler list fetch failed for {}: {}", slug, e);
                return FillerData::default();
            }
        };

        if !response.status().is_success() {
            tracing::debug!(
                "No filler list for {} (HTTP {})",
                slug,
                response.status()
            );
            return FillerData::default();
        }

        match response.text().await {
            Ok(html) => parse_filler_page(&html),
            Err(e) => {
                tracing::debug!("Filler list read failed for {}: {}", slug, e);
                FillerData::default()
            }
        }
    }
}

impl Default for FillerClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Scrape the labeled sections out of a filler page.
pub fn parse_filler_page(html: &str) -> FillerData {
    let document = Html::parse_document(html);
    let label_selector = Selector::parse("span.Label").expect("valid CSS selector");

    let mut data = FillerData::default();
    for label in document.select(&label_selector) {
        let text = label.text().collect::<String>();
        let section = match text.trim() {
            "Filler Episodes:" => &mut data.filler,
            "Mixed Canon/Filler Episodes:" => &mut data.mixed,
            _ => continue,
        };
        let Some(sibling) = label.next_siblings().find_map(ElementRef::wrap) else {
            continue;
        };
        let ranges = sibling.text().collect::<String>();
        section.extend(parse_episode_ranges(ranges.trim()));
    }
    data
}

/// Parses episode ranges like `"1-5, 7, 10-12"` into individual numbers.
/// Malformed parts are skipped.
pub fn parse_episode_ranges(text: &str) -> HashSet<i32> {
    let mut episodes = HashSet::new();
    if text.trim().is_empty() {
        return episodes;
    }

    for part in text.split(',') {
        let part = part.trim();
        if let Some((start, end)) = part.split_once('-') {
            if let (Ok(start), Ok(end)) =
                (start.trim().parse::<i32>(), end.trim().parse::<i32>())
            {
                episodes.extend(start..=end);
            }
        } else if let Ok(number) = part.parse::<i32>() {
            episodes.insert(number);
        }
    }

    episodes
}

/// Converts a show title to the slug animefillerlist.com uses,
/// e.g. "Naruto: Shippuden" -> "naruto-shippuden".
pub fn title_to_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .split('-')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
