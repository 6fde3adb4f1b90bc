// Entity shapes shared across the source operations.

pub mod identifier;

use serde::{Deserialize, Serialize};

use self::identifier::EpisodeIdentifier;

/// Airing lifecycle of a show, from the AniList `status` vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiringStatus {
    Completed,
    Ongoing,
    NotYetReleased,
    Unknown,
}

impl AiringStatus {
    pub fn from_api(status: Option<&str>) -> Self {
        match status {
            Some("FINISHED") => AiringStatus::Completed,
            Some("RELEASING") => AiringStatus::Ongoing,
            Some("NOT_YET_RELEASED") => AiringStatus::NotYetReleased,
            _ => AiringStatus::Unknown,
        }
    }
}

/// Media format vocabulary shared by AniList and the episode-mapping service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaFormat {
    Tv,
    Movie,
    Ova,
    Ona,
    Short,
    Other,
}

impl MediaFormat {
    pub fn from_api(format: &str) -> Self {
        match format {
            "TV" => MediaFormat::Tv,
            "MOVIE" => MediaFormat::Movie,
            "OVA" => MediaFormat::Ova,
            "ONA" => MediaFormat::Ona,
            "TV_SHORT" | "SHORT" => MediaFormat::Short,
            _ => MediaFormat::Other,
        }
    }

    /// Formats that carry a per-episode list (everything else gets either a
    /// single synthetic entry or nothing).
    pub fn is_episodic(self) -> bool {
        matches!(self, MediaFormat::Tv | MediaFormat::Ova | MediaFormat::Ona)
    }
}

/// Relation edge vocabulary from the AniList relation graph.
///
/// Only the first five variants qualify a related show as a "season";
/// anything else the API may emit maps to `Unknown` and is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationType {
    Prequel,
    Parent,
    Sequel,
    SideStory,
    Alternative,
    Unknown,
}

impl RelationType {
    pub fn from_api(relation: Option<&str>) -> Self {
        match relation {
            Some("PREQUEL") => RelationType::Prequel,
            Some("PARENT") => RelationType::Parent,
            Some("SEQUEL") => RelationType::Sequel,
            Some("SIDE_STORY") => RelationType::SideStory,
            Some("ALTERNATIVE") => RelationType::Alternative,
            _ => RelationType::Unknown,
        }
    }

    pub fn qualifies_as_season(self) -> bool {
        !matches!(self, RelationType::Unknown)
    }

    /// Ordering rank: prequels and parents come first, unrecognized last.
    pub fn group_rank(self) -> u8 {
        match self {
            RelationType::Prequel | RelationType::Parent => 0,
            RelationType::Sequel => 1,
            RelationType::SideStory => 2,
            RelationType::Alternative => 3,
            RelationType::Unknown => 4,
        }
    }

    pub fn as_api_str(self) -> &'static str {
        match self {
            RelationType::Prequel => "PREQUEL",
            RelationType::Parent => "PARENT",
            RelationType::Sequel => "SEQUEL",
            RelationType::SideStory => "SIDE_STORY",
            RelationType::Alternative => "ALTERNATIVE",
            RelationType::Unknown => "UNKNOWN",
        }
    }
}

/// A catalog entry as returned by browse, search and details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub id: i64,
    pub title: String,
    pub cover_url: String,
    pub description: String,
    pub genres: Vec<String>,
    pub status: AiringStatus,
    pub episode_count: Option<i32>,
    pub format: Option<MediaFormat>,
    pub season_year: Option<i32>,
    /// True when seasons mode is enabled and the show has at least one
    /// qualifying relation edge.
    pub has_seasons: bool,
}

/// One page of browse/search results.
#[derive(Debug, Clone)]
pub struct ShowPage {
    pub shows: Vec<Show>,
    pub has_next_page: bool,
}

/// A season derived from a show and its relation graph. The source show is
/// always season 1; related shows take 2..N in relation-rank order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonEntry {
    pub anilist_id: i64,
    pub season_number: u32,
    pub title: String,
    pub cover_url: String,
    pub description: String,
    pub status: AiringStatus,
    /// The relation that linked this entry; `None` for season 1.
    pub relation: Option<RelationType>,
}

/// A synthesized episode with its cross-provider identity embedded.
#[derive(Debug, Clone)]
pub struct Episode {
    /// Fractional numbers are allowed for specials (e.g. 7.5).
    pub number: f32,
    pub name: String,
    /// Epoch millis; 0 means unknown.
    pub air_date_millis: i64,
    pub summary: Option<String>,
    pub preview_url: Option<String>,
    pub filler: bool,
    pub identifier: EpisodeIdentifier,
}

/// A playable link behind a stream candidate.
#[derive(Debug, Clone)]
pub struct VideoLink {
    pub url: String,
    pub title: String,
    pub requires_auth: bool,
}

/// One stream returned by the aggregator, after filtering and ranking.
#[derive(Debug, Clone)]
pub struct StreamCandidate {
    /// Lowercase 40-char hex BitTorrent info hash.
    pub info_hash: String,
    pub name: String,
    pub description: String,
    /// Magnet URI or direct HTTP URL.
    pub url: String,
    /// Flagged as a curated best release.
    pub is_best: bool,
    /// Direct URLs need the aggregator's Basic-auth headers for playback.
    pub requires_auth: bool,
}

impl StreamCandidate {
    pub fn video(&self) -> VideoLink {
        let title = if self.description.is_empty() {
            self.name.clone()
        } else {
            format!("{}\n{}", self.name, self.description)
        };
        VideoLink {
            url: self.url.clone(),
            title,
            requires_auth: self.requires_auth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_vocabulary() {
        assert_eq!(
            AiringStatus::from_api(Some("FINISHED")),
            AiringStatus::Completed
        );
        assert_eq!(
            AiringStatus::from_api(Some("RELEASING")),
            AiringStatus::Ongoing
        );
        assert_eq!(
            AiringStatus::from_api(Some("NOT_YET_RELEASED")),
            AiringStatus::NotYetReleased
        );
        assert_eq!(AiringStatus::from_api(Some("HIATUS")), AiringStatus::Unknown);
        assert_eq!(AiringStatus::from_api(None), AiringStatus::Unknown);
    }

    #[test]
    fn test_format_vocabulary() {
        assert_eq!(MediaFormat::from_api("TV"), MediaFormat::Tv);
        assert_eq!(MediaFormat::from_api("MOVIE"), MediaFormat::Movie);
        assert_eq!(MediaFormat::from_api("TV_SHORT"), MediaFormat::Short);
        assert_eq!(MediaFormat::from_api("MUSIC"), MediaFormat::Other);
        assert!(MediaFormat::Ova.is_episodic());
        assert!(MediaFormat::Ona.is_episodic());
        assert!(!MediaFormat::Movie.is_episodic());
        assert!(!MediaFormat::Other.is_episodic());
    }

    #[test]
    fn test_relation_ranks() {
        assert_eq!(
            RelationType::from_api(Some("PREQUEL")).group_rank(),
            RelationType::from_api(Some("PARENT")).group_rank()
        );
        assert!(RelationType::Sequel.group_rank() < RelationType::SideStory.group_rank());
        assert!(RelationType::SideStory.group_rank() < RelationType::Alternative.group_rank());
        assert!(RelationType::Alternative.group_rank() < RelationType::Unknown.group_rank());
        assert!(!RelationType::from_api(Some("CHARACTER")).qualifies_as_season());
        assert!(RelationType::from_api(Some("SIDE_STORY")).qualifies_as_season());
    }

    #[test]
    fn test_video_link_title() {
        let candidate = StreamCandidate {
            info_hash: "a".repeat(40),
            name: "Release".into(),
            description: "1080p".into(),
            url: "https://example.com/play".into(),
            is_best: false,
            requires_auth: true,
        };
        assert_eq!(candidate.video().title, "Release\n1080p");
        assert!(candidate.video().requires_auth);
    }
}
