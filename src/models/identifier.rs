//! Episode identity encoding.
//!
//! An episode's identity across the operation boundary is a single opaque
//! string: `|`-delimited `key:value` pairs with keys drawn from the fixed
//! set `imdb`, `tmdb`, `mal`, `kitsu`, `anilist`, `ep`, `season`,
//! `epInSeason`, `title`. The string is built once during episode synthesis
//! and re-parsed later to drive stream resolution, so the encoding is a
//! stable contract: values never contain `|` (titles have it stripped at
//! construction) and each pair splits on the first `:` only, so values may
//! contain colons. `ep` holds the absolute episode key, or `movie` for
//! movies.

/// The parsed form of an episode identifier. Absent keys stay `None` and
/// are omitted from the encoded string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeIdentifier {
    pub imdb: Option<String>,
    pub tmdb: Option<String>,
    pub mal: Option<String>,
    pub kitsu: Option<String>,
    pub anilist: Option<String>,
    pub ep: Option<String>,
    pub season: Option<String>,
    pub ep_in_season: Option<String>,
    pub title: Option<String>,
}

impl EpisodeIdentifier {
    pub fn parse(raw: &str) -> Self {
        let mut id = Self::default();
        for part in raw.split('|') {
            let mut split = part.splitn(2, ':');
            let key = split.next().unwrap_or_default();
            let value = split.next().unwrap_or_default();
            if value.is_empty() {
                continue;
            }
            let value = value.to_string();
            match key {
                "imdb" => id.imdb = Some(value),
                "tmdb" => id.tmdb = Some(value),
                "mal" => id.mal = Some(value),
                "kitsu" => id.kitsu = Some(value),
                "anilist" => id.anilist = Some(value),
                "ep" => id.ep = Some(value),
                "season" => id.season = Some(value),
                "epInSeason" => id.ep_in_season = Some(value),
                "title" => id.title = Some(value),
                _ => {}
            }
        }
        id
    }

    pub fn encode(&self) -> String {
        let pairs = [
            ("imdb", &self.imdb),
            ("tmdb", &self.tmdb),
            ("mal", &self.mal),
            ("kitsu", &self.kitsu),
            ("anilist", &self.anilist),
            ("ep", &self.ep),
            ("season", &self.season),
            ("epInSeason", &self.ep_in_season),
            ("title", &self.title),
        ];
        pairs
            .iter()
            .filter_map(|(key, value)| {
                value.as_deref().map(|v| format!("{key}:{v}"))
            })
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Titles may contain the pair delimiter; strip it before embedding.
    pub fn set_title(&mut self, title: &str) {
        let cleaned = title.replace('|', "").trim().to_string();
        if !cleaned.is_empty() {
            self.title = Some(cleaned);
        }
    }

    pub fn is_movie(&self) -> bool {
        matches!(self.ep.as_deref(), Some("movie") | Some("0"))
    }
}

/// One of the catalog ID vocabularies the stream aggregator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Imdb,
    Tmdb,
    Mal,
    Kitsu,
    Anilist,
}

impl IdKind {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "imdb" => Some(IdKind::Imdb),
            "tmdb" => Some(IdKind::Tmdb),
            "mal" => Some(IdKind::Mal),
            "kitsu" => Some(IdKind::Kitsu),
            "anilist" => Some(IdKind::Anilist),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IdKind::Imdb => "imdb",
            IdKind::Tmdb => "tmdb",
            IdKind::Mal => "mal",
            IdKind::Kitsu => "kitsu",
            IdKind::Anilist => "anilist",
        }
    }
}

/// User-configured ID preference order for stream lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPriority(pub Vec<IdKind>);

impl IdPriority {
    /// Parses a comma-separated list, dropping unrecognized tokens.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .filter_map(|token| IdKind::parse(token.trim()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kinds(&self) -> &[IdKind] {
        &self.0
    }
}

impl Default for IdPriority {
    fn default() -> Self {
        Self(vec![IdKind::Kitsu, IdKind::Imdb, IdKind::Mal, IdKind::Anilist])
    }
}

/// Composite lookup key plus content type for the aggregator search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamQuery {
    pub id: String,
    pub media_type: &'static str,
}

/// Walks the priority list and builds the composite key for the first ID
/// type present in the identifier.
///
/// Movies use the bare (prefixed) ID. Series append position components:
/// `id:season:epInSeason` for IMDB/TMDB/AniList, `id:epInSeason` for Kitsu
/// (no season), and `id:<absolute ep>` for MAL. IMDB IDs carry no prefix;
/// every other kind is prefixed with its vocabulary name.
pub fn select_stream_query(
    identifier: &EpisodeIdentifier,
    priority: &[IdKind],
) -> Option<StreamQuery> {
    let is_movie = identifier.is_movie();
    let media_type = if is_movie { "movie" } else { "series" };
    let season = identifier.season.as_deref().unwrap_or("1");
    let ep_in_season = identifier.ep_in_season.as_deref().unwrap_or("1");
    let absolute = identifier.ep.as_deref().unwrap_or("1");

    for kind in priority {
        let value = match kind {
            IdKind::Imdb => identifier.imdb.as_deref(),
            IdKind::Tmdb => identifier.tmdb.as_deref(),
            IdKind::Mal => identifier.mal.as_deref(),
            IdKind::Kitsu => identifier.kitsu.as_deref(),
            IdKind::Anilist => identifier.anilist.as_deref(),
        };
        let Some(value) = value else { continue };
        // IMDB IDs go over the wire unprefixed; every other kind is prefixed.
        let base = match kind {
            IdKind::Imdb => value.to_string(),
            _ => format!("{}:{value}", kind.as_str()),
        };
        let id = if is_movie {
            base
        } else {
            match kind {
                IdKind::Kitsu => format!("{base}:{ep_in_season}"),
                IdKind::Mal => format!("{base}:{absolute}"),
                _ => format!("{base}:{season}:{ep_in_season}"),
            }
        };
        return Some(StreamQuery { id, media_type });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_identifier() -> EpisodeIdentifier {
        EpisodeIdentifier {
            imdb: Some("tt1".into()),
            tmdb: Some("99".into()),
            mal: Some("20".into()),
            kitsu: Some("7".into()),
            anilist: Some("101".into()),
            ep: Some("14".into()),
            season: Some("2".into()),
            ep_in_season: Some("5".into()),
            title: Some("Some Show".into()),
        }
    }

    #[test]
    fn test_round_trip_preserves_values() {
        let id = series_identifier();
        assert_eq!(EpisodeIdentifier::parse(&id.encode()), id);
    }

    #[test]
    fn test_round_trip_keeps_absent_keys_absent() {
        let id = EpisodeIdentifier {
            anilist: Some("101".into()),
            ep: Some("movie".into()),
            ..Default::default()
        };
        let parsed = EpisodeIdentifier::parse(&id.encode());
        assert_eq!(parsed, id);
        assert!(parsed.imdb.is_none());
        assert!(parsed.season.is_none());
    }

    #[test]
    fn test_values_may_contain_colons() {
        let mut id = EpisodeIdentifier::default();
        id.ep = Some("1".into());
        id.set_title("Re:Zero");
        let parsed = EpisodeIdentifier::parse(&id.encode());
        assert_eq!(parsed.title.as_deref(), Some("Re:Zero"));
    }

    #[test]
    fn test_title_pipe_stripped() {
        let mut id = EpisodeIdentifier::default();
        id.set_title("A|B|C");
        assert_eq!(id.title.as_deref(), Some("ABC"));
    }

    #[test]
    fn test_imdb_series_composite_key() {
        let query = select_stream_query(
            &series_identifier(),
            &IdPriority::parse("imdb,tmdb,mal,kitsu,anilist").0,
        )
        .unwrap();
        assert_eq!(query.id, "tt1:2:5");
        assert_eq!(query.media_type, "series");
    }

    #[test]
    fn test_kitsu_key_omits_season() {
        let query =
            select_stream_query(&series_identifier(), &[IdKind::Kitsu]).unwrap();
        assert_eq!(query.id, "kitsu:7:5");
    }

    #[test]
    fn test_mal_key_uses_absolute_number() {
        let query = select_stream_query(&series_identifier(), &[IdKind::Mal]).unwrap();
        assert_eq!(query.id, "mal:20:14");
    }

    #[test]
    fn test_movie_uses_bare_id() {
        let mut id = series_identifier();
        id.ep = Some("movie".into());
        let query = select_stream_query(&id, &[IdKind::Tmdb]).unwrap();
        assert_eq!(query.id, "tmdb:99");
        assert_eq!(query.media_type, "movie");

        id.ep = Some("0".into());
        assert!(id.is_movie());
    }

    #[test]
    fn test_priority_order_respected() {
        let query = select_stream_query(
            &series_identifier(),
            &[IdKind::Anilist, IdKind::Imdb],
        )
        .unwrap();
        assert_eq!(query.id, "anilist:101:2:5");
    }

    #[test]
    fn test_no_matching_kind_yields_none() {
        let id = EpisodeIdentifier {
            ep: Some("3".into()),
            ..Default::default()
        };
        assert!(select_stream_query(&id, &IdPriority::default().0).is_none());
    }

    #[test]
    fn test_priority_parse_drops_unknown_tokens() {
        let priority = IdPriority::parse("kitsu, bogus ,imdb");
        assert_eq!(priority.0, vec![IdKind::Kitsu, IdKind::Imdb]);
        assert!(IdPriority::parse("nothing,valid").is_empty());
    }
}
