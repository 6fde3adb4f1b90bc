// Stream ranking and filtering: turns raw aggregator results into the
// ordered candidate list. Placeholder hashes are dropped, P2P results are
// gated behind a toggle, curated-best releases get a marker and optionally
// sort first (stable, so the provider's order is the tiebreak).

use std::collections::HashSet;

use crate::models::StreamCandidate;
use crate::services::aggregator::StreamResult;

/// Upstream sometimes redacts hashes instead of omitting them.
const PLACEHOLDER_HASH: &str = "<redacted>";

/// Public trackers appended when a magnet has to be synthesized from a
/// bare info hash.
const DEFAULT_TRACKERS: [&str; 4] = [
    "udp://tracker.opentrackr.org:1337/announce",
    "http://nyaa.tracker.wf:7777/announce",
    "udp://open.demonii.com:1337/announce",
    "udp://tracker.torrent.eu.org:451/announce",
];

pub fn rank_streams(
    results: Vec<StreamResult>,
    best_hashes: &HashSet<String>,
    show_p2p: bool,
    sort_best_first: bool,
) -> Vec<StreamCandidate> {
    let mut candidates = Vec::new();

    for result in results {
        let info_hash = result
            .info_hash
            .map(|h| h.to_lowercase())
            .unwrap_or_default();
        if info_hash.is_empty() || info_hash == PLACEHOLDER_HASH {
            continue;
        }

        let name = result.name.unwrap_or_else(|| "Stream".to_string());
        let description = result.description.unwrap_or_default();
        let stream_url = result.url.unwrap_or_default();

        let is_magnet = stream_url.starts_with("magnet:");
        if is_magnet && !show_p2p {
            continue;
        }

        let is_best = best_hashes.contains(&info_hash);
        let display_name = if is_best { format!("⭐ {name}") } else { name };

        let url = if !is_magnet && !stream_url.is_empty() {
            stream_url
        } else if is_magnet && stream_url.contains("tr=") {
            stream_url
        } else {
            magnet_link(&info_hash)
        };

        candidates.push(StreamCandidate {
            info_hash,
            name: display_name,
            description,
            requires_auth: !is_magnet,
            url,
            is_best,
        });
    }

    if sort_best_first {
        candidates.sort_by_key(|candidate| !candidate.is_best);
    }
    candidates
}

/// Magnet URI from a bare info hash plus the default tracker list.
fn magnet_link(info_hash: &str) -> String {
    format!(
        "magnet:?xt=urn:btih:{info_hash}&dn={info_hash}&tr={}",
        DEFAULT_TRACKERS.join("&tr=")
    )
}
