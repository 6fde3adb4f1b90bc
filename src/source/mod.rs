// The source operation surface: popular/search/details/seasons/episodes/
// streams, each wiring the provider clients together and converting their
// DTOs into the entity shapes. Hard failures carry a SourceError; the
// enrichment providers degrade to empty data inside their clients.

pub mod episodes;
pub mod seasons;
pub mod streams;

use chrono::Utc;
use std::collections::{HashMap, HashSet};

use crate::config::AppConfig;
use crate::error::{Result, SourceError};
use crate::models::identifier::{select_stream_query, EpisodeIdentifier, IdKind};
use crate::models::{AiringStatus, Episode, MediaFormat, SeasonEntry, Show, ShowPage, StreamCandidate};
use crate::services::aggregator::{AggregatorClient, AggregatorConfig};
use crate::services::anidb::AniDbClient;
use crate::services::anilist::{AniListClient, CoverImage, Media, Title};
use crate::services::anizip::{AniZipClient, MappingIds};
use crate::services::filler::{self, FillerClient, FillerData};
use crate::services::seadex::SeaDexClient;
use crate::services::tvdb::TvdbClient;

pub struct AnimeSource {
    config: AppConfig,
    anilist: AniListClient,
    anizip: AniZipClient,
    tvdb: Option<TvdbClient>,
    anidb: AniDbClient,
    filler: FillerClient,
    seadex: SeaDexClient,
    aggregator: AggregatorClient,
}

impl AnimeSource {
    pub fn new(config: AppConfig) -> Self {
        let tvdb = config.tvdb_api_key.clone().map(TvdbClient::new);
        Self {
            config,
            anilist: AniListClient::new(),
            anizip: AniZipClient::new(),
            tvdb,
            anidb: AniDbClient::new(),
            filler: FillerClient::new(),
            seadex: SeaDexClient::new(),
            aggregator: AggregatorClient::new(),
        }
    }

    /// Shows sorted by popularity.
    pub async fn popular(&self, page: i32) -> Result<ShowPage> {
        let (media, has_next_page) = self.anilist.popular(page).await?;
        Ok(self.to_show_page(media, has_next_page))
    }

    /// Title search.
    pub async fn search(&self, query: &str, page: i32) -> Result<ShowPage> {
        let (media, has_next_page) = self.anilist.search(query, page).await?;
        Ok(self.to_show_page(media, has_next_page))
    }

    /// Full details for one show. Upstream error payloads surface here
    /// with the provider's message text.
    pub async fn details(&self, anilist_id: i64) -> Result<Show> {
        let media = self.anilist.details(anilist_id).await?;
        let mut show = self.media_to_show(&media, seasons::has_related_seasons(&media));
        show.description = details_description(&media);
        Ok(show)
    }

    /// Ordered season list. Season 1 is always the show itself; fetch
    /// failures collapse to an empty list rather than erroring.
    pub async fn seasons(&self, anilist_id: i64) -> Result<Vec<SeasonEntry>> {
        let media = match self.anilist.details(anilist_id).await {
            Ok(media) => media,
            Err(e) => {
                tracing::debug!("Season lookup failed for {}: {:#}", anilist_id, e);
                return Ok(Vec::new());
            }
        };
        Ok(seasons::resolve_seasons(&media))
    }

    /// Synthesized episode list, newest first.
    pub async fn episodes(&self, anilist_id: i64) -> Result<Vec<Episode>> {
        let mappings = self.anizip.mappings(anilist_id).await?;
        let ids = mappings.mappings.clone().unwrap_or_default();
        let format = MediaFormat::from_api(ids.media_type.as_deref().unwrap_or(""));
        let show_title = episodes::best_show_title(mappings.titles.as_ref());
        let mapped = mappings.episodes.clone().unwrap_or_default();

        if format == MediaFormat::Movie {
            let filler = FillerData::default();
            let secondary_titles = HashMap::new();
            let ctx = episodes::SynthesisContext {
                anilist_id,
                ids: &ids,
                show_title: show_title.as_deref(),
                filler: &filler,
                secondary_titles: &secondary_titles,
                now_millis: Utc::now().timestamp_millis(),
            };
            return Ok(vec![episodes::movie_episode(&ctx, &mapped)]);
        }

        if !format.is_episodic() {
            tracing::debug!(
                "No episode synthesis for {} (type {:?})",
                anilist_id,
                ids.media_type
            );
            return Ok(Vec::new());
        }

        let filler = if self.config.mark_fillers {
            match show_title.as_deref() {
                Some(title) => {
                    self.filler
                        .filler_data(&filler::title_to_slug(title))
                        .await
                }
                None => FillerData::default(),
            }
        } else {
            FillerData::default()
        };

        let secondary_titles = if self.config.use_anidb_titles {
            match ids.anidb_id {
                Some(anidb_id) => self.anidb.episode_titles(anidb_id).await,
                None => HashMap::new(),
            }
        } else {
            HashMap::new()
        };

        let ctx = episodes::SynthesisContext {
            anilist_id,
            ids: &ids,
            show_title: show_title.as_deref(),
            filler: &filler,
            secondary_titles: &secondary_titles,
            now_millis: Utc::now().timestamp_millis(),
        };

        if let Some(tvdb) = &self.tvdb {
            if let Some(series_id) = self
                .resolve_tvdb_series(tvdb, &ids, show_title.as_deref())
                .await
            {
                let records = tvdb.all_episodes(series_id).await;
                if !records.is_empty() {
                    let by_absolute = TvdbClient::episodes_to_map(&records);
                    return Ok(episodes::from_database_records(
                        &ctx,
                        mappings.episode_count,
                        &mapped,
                        &by_absolute,
                    ));
                }
                tracing::debug!(
                    "TVDB series {} has no episodes, using mapping records",
                    series_id
                );
            }
        }

        Ok(episodes::from_mapping_records(&ctx, &mapped))
    }

    /// Resolve the TVDB series for a mapping: direct ID, then the IMDB
    /// remote-ID lookup, then a title search.
    async fn resolve_tvdb_series(
        &self,
        tvdb: &TvdbClient,
        ids: &MappingIds,
        title: Option<&str>,
    ) -> Option<i64> {
        if let Some(tvdb_id) = ids.tvdb_id {
            return Some(tvdb_id);
        }
        if let Some(imdb_id) = ids.imdb_id.as_deref() {
            if let Some(found) = tvdb.find_by_remote_id(imdb_id).await {
                return Some(found);
            }
        }
        let hits = tvdb.search_series(title?).await;
        hits.into_iter().find_map(|hit| hit.tvdb_id)
    }

    /// Ranked stream candidates for an encoded episode identifier.
    pub async fn streams(&self, raw_identifier: &str) -> Result<Vec<StreamCandidate>> {
        let manifest_url = self
            .config
            .manifest_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                SourceError::Config(
                    "Please configure the stream aggregator manifest URL".to_string(),
                )
            })?;
        let aggregator_config = AggregatorConfig::from_manifest_url(manifest_url)
            .ok_or_else(|| SourceError::Config("Invalid manifest URL format".to_string()))?;

        let identifier = EpisodeIdentifier::parse(raw_identifier);
        let query = select_stream_query(&identifier, self.config.id_priority.kinds())
            .or_else(|| select_stream_query(&identifier, &[IdKind::Imdb]))
            .ok_or(SourceError::NoUsableId)?;

        let response = self
            .aggregator
            .search(&aggregator_config, query.media_type, &query.id)
            .await?;
        let results = response
            .data
            .ok_or(SourceError::NoData)?
            .results
            .unwrap_or_default();
        if results.is_empty() {
            return Err(SourceError::NoStreams);
        }

        let anilist_id = identifier
            .anilist
            .as_deref()
            .and_then(|id| id.parse::<i64>().ok())
            .unwrap_or(0);
        let best_hashes = if self.config.best_highlight && anilist_id > 0 {
            self.seadex.best_hashes(anilist_id).await
        } else {
            HashSet::new()
        };

        Ok(streams::rank_streams(
            results,
            &best_hashes,
            self.config.show_p2p,
            self.config.best_sort,
        ))
    }

    fn to_show_page(&self, media: Vec<Media>, has_next_page: bool) -> ShowPage {
        let shows = media
            .iter()
            .map(|m| self.media_to_show(m, seasons::has_related_seasons_simple(m)))
            .collect();
        ShowPage {
            shows,
            has_next_page,
        }
    }

    fn media_to_show(&self, media: &Media, qualifies_for_seasons: bool) -> Show {
        Show {
            id: media.id,
            title: resolve_title(media.title.as_ref()),
            cover_url: resolve_cover(media.cover_image.as_ref()),
            description: strip_html(media.description.as_deref()),
            genres: media
                .genres
                .clone()
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .collect(),
            status: AiringStatus::from_api(media.status.as_deref()),
            episode_count: media.episodes,
            format: media.format.as_deref().map(MediaFormat::from_api),
            season_year: media.season_year,
            has_seasons: self.config.seasons_mode && qualifies_for_seasons,
        }
    }
}

/// English title when non-blank, else romaji.
pub(crate) fn resolve_title(title: Option<&Title>) -> String {
    title
        .and_then(|t| t.english.as_deref().filter(|s| !s.trim().is_empty()))
        .or_else(|| title.and_then(|t| t.romaji.as_deref()))
        .unwrap_or_default()
        .to_string()
}

/// Extra-large cover when non-blank, else large.
pub(crate) fn resolve_cover(cover: Option<&CoverImage>) -> String {
    cover
        .and_then(|c| c.extra_large.as_deref().filter(|s| !s.trim().is_empty()))
        .or_else(|| cover.and_then(|c| c.large.as_deref()))
        .unwrap_or_default()
        .to_string()
}

/// Strip HTML tags out of a provider description.
pub(crate) fn strip_html(description: Option<&str>) -> String {
    let Some(description) = description else {
        return String::new();
    };
    let tags = regex::Regex::new(r"<[^>]*>").expect("valid tag pattern");
    tags.replace_all(description, "").trim().to_string()
}

/// Details get an enriched description block under the synopsis.
fn details_description(media: &Media) -> String {
    let mut description = String::new();

    let synopsis = strip_html(media.description.as_deref());
    if !synopsis.is_empty() {
        description.push_str(&synopsis);
        description.push_str("\n\n");
    }

    if let Some(score) = media.average_score {
        if score > 0 {
            description.push_str(&format!("★ Score: {score}/100\n"));
        }
    }

    if let Some(studio) = media
        .studios
        .as_ref()
        .and_then(|s| s.nodes.as_ref())
        .and_then(|nodes| nodes.first())
        .and_then(|studio| studio.name.as_deref())
    {
        description.push_str(&format!("Studio: {studio}\n"));
    }

    if let Some(format) = media.format.as_deref() {
        description.push_str(&format!("Format: {format}\n"));
    }
    if let Some(episodes) = media.episodes {
        description.push_str(&format!("Episodes: {episodes}\n"));
    }

    let release = format!(
        "{} {}",
        media.season.as_deref().unwrap_or_default(),
        media
            .season_year
            .map(|y| y.to_string())
            .unwrap_or_default()
    );
    let release = release.trim();
    if !release.is_empty() {
        description.push_str(&format!("Release: {release}\n"));
    }

    description.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(english: Option<&str>, romaji: Option<&str>) -> Title {
        Title {
            english: english.map(String::from),
            romaji: romaji.map(String::from),
            native: None,
        }
    }

    #[test]
    fn test_title_prefers_nonblank_english() {
        assert_eq!(resolve_title(Some(&title(Some(""), Some("Foo")))), "Foo");
        assert_eq!(resolve_title(Some(&title(Some("Bar"), Some("Foo")))), "Bar");
        assert_eq!(resolve_title(Some(&title(None, Some("Foo")))), "Foo");
        assert_eq!(resolve_title(None), "");
    }

    #[test]
    fn test_cover_prefers_extra_large() {
        let cover = CoverImage {
            extra_large: Some("https://img/xl.jpg".to_string()),
            large: Some("https://img/l.jpg".to_string()),
        };
        assert_eq!(resolve_cover(Some(&cover)), "https://img/xl.jpg");

        let blank_xl = CoverImage {
            extra_large: Some(" ".to_string()),
            large: Some("https://img/l.jpg".to_string()),
        };
        assert_eq!(resolve_cover(Some(&blank_xl)), "https://img/l.jpg");
        assert_eq!(resolve_cover(None), "");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html(Some("<p>Walls <b>fall</b>.</p><br />")),
            "Walls fall."
        );
        assert_eq!(strip_html(None), "");
    }

    #[test]
    fn test_details_description_block() {
        let media = Media {
            id: 1,
            title: Some(title(Some("Show"), None)),
            cover_image: None,
            description: Some("<i>Synopsis.</i>".to_string()),
            episodes: Some(12),
            status: Some("FINISHED".to_string()),
            season: Some("SPRING".to_string()),
            season_year: Some(2013),
            format: Some("TV".to_string()),
            genres: None,
            average_score: Some(84),
            studios: Some(crate::services::anilist::StudioConnection {
                nodes: Some(vec![crate::services::anilist::Studio {
                    name: Some("WIT".to_string()),
                }]),
            }),
            relations: None,
        };
        let description = details_description(&media);
        assert!(description.starts_with("Synopsis."));
        assert!(description.contains("★ Score: 84/100"));
        assert!(description.contains("Studio: WIT"));
        assert!(description.contains("Format: TV"));
        assert!(description.contains("Episodes: 12"));
        assert!(description.contains("Release: SPRING 2013"));
    }
}
