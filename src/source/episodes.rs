// Episode synthesis: merges the mapping service's per-episode records
// (strategy A) or a TVDB overlay keyed by absolute number (strategy B)
// into the displayed episode list. Both strategies suppress unaired
// episodes, resolve titles by a fixed provider priority, optionally mark
// filler, and embed the full cross-reference identity in every episode.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::models::identifier::EpisodeIdentifier;
use crate::models::Episode;
use crate::services::anizip::{MappedEpisode, MappingIds};
use crate::services::filler::FillerData;
use crate::services::tvdb::EpisodeRecord;

/// Outer bound for generated episode numbers when the declared count is
/// unknown.
pub const FALLBACK_EPISODE_CEILING: i32 = 1000;

/// Everything the synthesis passes need besides the per-episode records.
pub struct SynthesisContext<'a> {
    pub anilist_id: i64,
    pub ids: &'a MappingIds,
    pub show_title: Option<&'a str>,
    pub filler: &'a FillerData,
    /// Secondary titles keyed by episode number string (AniDB).
    pub secondary_titles: &'a HashMap<String, String>,
    pub now_millis: i64,
}

/// Strategy A: one episode per numeric key of the mapping service's
/// episode map. Non-numeric keys (specials like "S1") are skipped.
pub fn from_mapping_records(
    ctx: &SynthesisContext<'_>,
    mapped: &HashMap<String, Option<MappedEpisode>>,
) -> Vec<Episode> {
    let mut episodes = Vec::new();

    for (key, record) in mapped {
        let Ok(number) = key.parse::<f32>() else {
            continue;
        };
        let record = record.as_ref();

        let air_date_millis = record
            .and_then(|r| r.air_date.as_deref())
            .map(parse_air_date_millis)
            .unwrap_or(0);
        if air_date_millis > 0 && air_date_millis > ctx.now_millis {
            continue;
        }

        let season = record.and_then(|r| r.season_number).unwrap_or(1);
        let ep_in_season = record
            .and_then(|r| r.episode_number)
            .or_else(|| key.parse::<i32>().ok())
            .unwrap_or(1);

        let title = best_episode_title(
            record.and_then(|r| r.title.as_ref()),
            ctx.secondary_titles.get(key.as_str()).map(String::as_str),
        );
        let (filler, name) = display_name(ctx, key, number, &title);

        episodes.push(Episode {
            number,
            name,
            air_date_millis,
            summary: record
                .and_then(|r| r.overview.clone())
                .filter(|s| !s.trim().is_empty()),
            preview_url: record
                .and_then(|r| r.image.clone())
                .filter(|s| !s.trim().is_empty()),
            filler,
            identifier: build_identifier(ctx, key, Some(season), Some(ep_in_season)),
        });
    }

    sort_newest_first(&mut episodes);
    episodes
}

/// Strategy B: iterate absolute numbers 1..=N and overlay TVDB records.
/// With an unknown declared count the loop ends at the first number the
/// record source cannot supply; with a known count records stay optional.
pub fn from_database_records(
    ctx: &SynthesisContext<'_>,
    declared_count: Option<i32>,
    mapped: &HashMap<String, Option<MappedEpisode>>,
    records: &HashMap<String, EpisodeRecord>,
) -> Vec<Episode> {
    let ceiling = declared_count.unwrap_or(FALLBACK_EPISODE_CEILING);
    let mut episodes = Vec::new();

    for number in 1..=ceiling {
        let key = number.to_string();
        let record = records.get(&key);
        if record.is_none() && declared_count.is_none() {
            break;
        }
        let mapping = mapped.get(&key).and_then(|r| r.as_ref());

        let air_date_millis = record
            .and_then(|r| r.air_date.as_deref())
            .or_else(|| mapping.and_then(|m| m.air_date.as_deref()))
            .map(parse_air_date_millis)
            .unwrap_or(0);
        if air_date_millis > 0 && air_date_millis > ctx.now_millis {
            continue;
        }

        let secondary = record
            .and_then(|r| r.name.as_deref())
            .or_else(|| ctx.secondary_titles.get(&key).map(String::as_str));
        let title = best_episode_title(mapping.and_then(|m| m.title.as_ref()), secondary);

        let season = record
            .and_then(|r| r.season_number)
            .or_else(|| mapping.and_then(|m| m.season_number))
            .unwrap_or(1);
        let ep_in_season = record
            .and_then(|r| r.number)
            .or_else(|| mapping.and_then(|m| m.episode_number))
            .unwrap_or(number);

        let (filler, name) = display_name(ctx, &key, number as f32, &title);

        episodes.push(Episode {
            number: number as f32,
            name,
            air_date_millis,
            summary: record
                .and_then(|r| r.overview.clone())
                .or_else(|| mapping.and_then(|m| m.overview.clone()))
                .filter(|s| !s.trim().is_empty()),
            preview_url: record
                .and_then(|r| r.image_url.clone())
                .or_else(|| mapping.and_then(|m| m.image.clone()))
                .filter(|s| !s.trim().is_empty()),
            filler,
            identifier: build_identifier(ctx, &key, Some(season), Some(ep_in_season)),
        });
    }

    sort_newest_first(&mut episodes);
    episodes
}

/// Movies collapse to a single synthetic episode numbered 1.
pub fn movie_episode(
    ctx: &SynthesisContext<'_>,
    mapped: &HashMap<String, Option<MappedEpisode>>,
) -> Episode {
    let air_date_millis = mapped
        .get("1")
        .and_then(|r| r.as_ref())
        .and_then(|r| r.air_date.as_deref())
        .map(parse_air_date_millis)
        .unwrap_or(0);

    Episode {
        number: 1.0,
        name: "Movie".to_string(),
        air_date_millis,
        summary: None,
        preview_url: None,
        filler: false,
        identifier: build_identifier(ctx, "movie", None, None),
    }
}

/// Best title across providers: mapping-service `en` > `romaji` > `native`
/// > `x-jat`, then the secondary provider, then nothing. The mapping
/// service sometimes emits the literal string "null"; that counts as
/// absent.
pub fn best_episode_title(
    titles: Option<&HashMap<String, Option<String>>>,
    secondary: Option<&str>,
) -> String {
    if let Some(titles) = titles {
        for lang in ["en", "romaji", "native", "x-jat"] {
            if let Some(Some(title)) = titles.get(lang) {
                let title = title.trim();
                if !title.is_empty() && title != "null" {
                    return title.to_string();
                }
            }
        }
    }
    secondary
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Picks a display title out of the mapping service's show-title map.
pub fn best_show_title(titles: Option<&HashMap<String, Option<String>>>) -> Option<String> {
    let titles = titles?;
    for key in ["en", "x-jat", "ja"] {
        if let Some(Some(title)) = titles.get(key) {
            let title = title.trim();
            if !title.is_empty() {
                return Some(title.to_string());
            }
        }
    }
    None
}

/// `"yyyy-mm-dd"` to epoch millis; anything unparseable is 0 (unknown).
pub fn parse_air_date_millis(date: &str) -> i64 {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

fn display_name(
    ctx: &SynthesisContext<'_>,
    key: &str,
    number: f32,
    title: &str,
) -> (bool, String) {
    let whole = number.fract() == 0.0;
    let filler = whole && ctx.filler.filler.contains(&(number as i32));
    let mixed = whole && ctx.filler.mixed.contains(&(number as i32));

    let base = if title.is_empty() {
        format!("Episode {key}")
    } else {
        format!("Episode {key}: {title}")
    };
    let name = if filler {
        format!("[Filler] {base}")
    } else if mixed {
        format!("[Mixed] {base}")
    } else {
        base
    };
    (filler, name)
}

fn build_identifier(
    ctx: &SynthesisContext<'_>,
    ep_key: &str,
    season: Option<i32>,
    ep_in_season: Option<i32>,
) -> EpisodeIdentifier {
    let ids = ctx.ids;
    let mut identifier = EpisodeIdentifier {
        imdb: ids.imdb_id.clone(),
        tmdb: ids.tmdb_id.clone(),
        mal: ids.mal_id.map(|v| v.to_string()),
        kitsu: ids.kitsu_id.map(|v| v.to_string()),
        anilist: Some(ctx.anilist_id.to_string()),
        ep: Some(ep_key.to_string()),
        season: season.map(|v| v.to_string()),
        ep_in_season: ep_in_season.map(|v| v.to_string()),
        title: None,
    };
    if let Some(title) = ctx.show_title {
        identifier.set_title(title);
    }
    identifier
}

fn sort_newest_first(episodes: &mut [Episode]) {
    episodes.sort_by(|a, b| {
        b.number
            .partial_cmp(&a.number)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
