// Configuration: a TOML file in the XDG config directory with environment
// overrides on top. Every preference the source reads lives here.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::identifier::IdPriority;

const APP_NAME: &str = "anisource";
const CONFIG_FILENAME: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Stream aggregator connection
    pub aggregator: AggregatorSection,

    /// Catalog browsing behavior
    pub catalog: CatalogSection,

    /// Stream list behavior
    pub streams: StreamsSection,

    /// Optional metadata enrichment
    pub metadata: MetadataSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AggregatorSection {
    /// Manifest URL of the shape
    /// `https://host/stremio/<uuid>/<blob>/manifest.json`
    pub manifest_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    /// Group related shows (sequels, prequels, side stories) as seasons
    pub seasons_mode: bool,

    /// Comma-separated ID preference order for stream lookups. The usual
    /// choices are permutations of kitsu/imdb/mal/anilist:
    ///   kitsu,imdb,mal,anilist    mal,kitsu,imdb,anilist
    ///   kitsu,mal,imdb,anilist    mal,imdb,kitsu,anilist
    ///   imdb,mal,kitsu,anilist    imdb,kitsu,mal,anilist
    ///   imdb,anilist,mal,kitsu    anilist,kitsu,mal,imdb
    ///   anilist,mal,kitsu,imdb
    /// `tmdb` is also accepted as a token.
    pub id_priority: String,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            seasons_mode: true,
            id_priority: "kitsu,imdb,mal,anilist".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamsSection {
    /// Show P2P/torrent results. Leave off for debrid-only setups.
    pub show_p2p: bool,

    /// Highlight curated best releases
    pub best_highlight: bool,

    /// Move curated best releases to the top of the list
    pub best_sort: bool,
}

impl Default for StreamsSection {
    fn default() -> Self {
        Self {
            show_p2p: false,
            best_highlight: true,
            best_sort: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataSection {
    /// TVDB API key; enables the episode-database overlay
    pub tvdb_api_key: Option<String>,

    /// Mark filler episodes in episode names
    pub mark_fillers: bool,

    /// Fetch episode titles from AniDB (rate limited, slows listings)
    pub use_anidb_titles: bool,
}

/// Resolved configuration - TOML file with environment overrides.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub manifest_url: Option<String>,
    pub seasons_mode: bool,
    pub id_priority: IdPriority,
    pub show_p2p: bool,
    pub best_highlight: bool,
    pub best_sort: bool,
    pub tvdb_api_key: Option<String>,
    pub mark_fillers: bool,
    pub use_anidb_titles: bool,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. TOML config file
    /// 3. Default values
    pub fn load() -> Self {
        let config_dir = Self::find_config_dir();
        let config_file = Self::load_config_file(&config_dir);
        Self::build(config_file)
    }

    fn find_config_dir() -> PathBuf {
        if let Ok(path) = std::env::var("ANISOURCE_CONFIG_DIR") {
            return PathBuf::from(path);
        }
        if let Some(dir) = dirs::config_dir() {
            return dir.join(APP_NAME);
        }
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    fn load_config_file(config_dir: &Path) -> ConfigFile {
        let config_path = config_dir.join(CONFIG_FILENAME);

        if !config_path.exists() {
            tracing::debug!(
                "No config file found at {}, using defaults",
                config_path.display()
            );
            return ConfigFile::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse config file {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    );
                    ConfigFile::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}. Using defaults.",
                    config_path.display(),
                    e
                );
                ConfigFile::default()
            }
        }
    }

    fn build(config_file: ConfigFile) -> Self {
        let manifest_url = std::env::var("ANISOURCE_MANIFEST_URL")
            .ok()
            .or(config_file.aggregator.manifest_url)
            .filter(|url| !url.trim().is_empty());

        let priority_raw = std::env::var("ANISOURCE_ID_PRIORITY")
            .ok()
            .unwrap_or(config_file.catalog.id_priority);
        let id_priority = IdPriority::parse(&priority_raw);
        let id_priority = if id_priority.is_empty() {
            tracing::warn!(
                "No recognized ID types in id_priority '{}', using default order",
                priority_raw
            );
            IdPriority::default()
        } else {
            id_priority
        };

        let tvdb_api_key = std::env::var("TVDB_API_KEY")
            .ok()
            .or(config_file.metadata.tvdb_api_key)
            .filter(|key| !key.trim().is_empty());

        Self {
            manifest_url,
            seasons_mode: env_bool("ANISOURCE_SEASONS_MODE")
                .unwrap_or(config_file.catalog.seasons_mode),
            id_priority,
            show_p2p: env_bool("ANISOURCE_SHOW_P2P").unwrap_or(config_file.streams.show_p2p),
            best_highlight: env_bool("ANISOURCE_BEST_HIGHLIGHT")
                .unwrap_or(config_file.streams.best_highlight),
            best_sort: env_bool("ANISOURCE_BEST_SORT").unwrap_or(config_file.streams.best_sort),
            tvdb_api_key,
            mark_fillers: env_bool("ANISOURCE_MARK_FILLERS")
                .unwrap_or(config_file.metadata.mark_fillers),
            use_anidb_titles: env_bool("ANISOURCE_USE_ANIDB_TITLES")
                .unwrap_or(config_file.metadata.use_anidb_titles),
        }
    }

    /// Log configuration status
    pub fn log_config(&self) {
        if self.manifest_url.is_some() {
            tracing::info!("Stream aggregator: configured");
        } else {
            tracing::info!("Stream aggregator: not configured (streams unavailable)");
            tracing::info!(
                "Hint: add manifest_url to config.toml or set ANISOURCE_MANIFEST_URL"
            );
        }

        if self.tvdb_api_key.is_some() {
            tracing::info!("Episode metadata: mapping service + TVDB overlay");
        } else {
            tracing::debug!("Episode metadata: mapping service only");
        }

        if self.seasons_mode {
            tracing::debug!("Seasons mode: enabled");
        }
        if self.mark_fillers {
            tracing::debug!("Filler marking: enabled");
        }
        if self.use_anidb_titles {
            tracing::debug!("AniDB episode titles: enabled (rate limited)");
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::build(ConfigFile::default())
    }
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}
