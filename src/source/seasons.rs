// Season resolution: maps a show's relation graph into an ordered list of
// "seasons". The source show is always season 1; qualifying related shows
// take 2..N grouped by relation rank and, within a group, by ascending
// AniList ID (a lower ID is assumed to be the older entry).

use std::collections::HashSet;

use crate::models::{AiringStatus, RelationType, SeasonEntry};
use crate::services::anilist::Media;

use super::{resolve_cover, resolve_title, strip_html};

pub fn resolve_seasons(media: &Media) -> Vec<SeasonEntry> {
    let mut seasons = vec![SeasonEntry {
        anilist_id: media.id,
        season_number: 1,
        title: resolve_title(media.title.as_ref()),
        cover_url: resolve_cover(media.cover_image.as_ref()),
        description: strip_html(media.description.as_deref()),
        status: AiringStatus::from_api(media.status.as_deref()),
        relation: None,
    }];

    let mut edges: Vec<(&Media, RelationType)> = media
        .relations
        .as_ref()
        .and_then(|r| r.edges.as_ref())
        .map(|edges| {
            edges
                .iter()
                .flatten()
                .filter_map(|edge| {
                    let relation = RelationType::from_api(edge.relation_type.as_deref());
                    let node = edge.node.as_ref()?;
                    relation.qualifies_as_season().then_some((node, relation))
                })
                .collect()
        })
        .unwrap_or_default();

    edges.sort_by_key(|(node, relation)| (relation.group_rank(), node.id));

    let mut seen: HashSet<i64> = HashSet::from([media.id]);
    let mut season_number = 2;
    for (node, relation) in edges {
        if !seen.insert(node.id) {
            continue;
        }
        let title = resolve_title(node.title.as_ref());
        if title.is_empty() {
            continue;
        }
        seasons.push(SeasonEntry {
            anilist_id: node.id,
            season_number,
            title,
            cover_url: resolve_cover(node.cover_image.as_ref()),
            description: format!("Related as: {}", relation.as_api_str()),
            status: AiringStatus::from_api(node.status.as_deref()),
            relation: Some(relation),
        });
        season_number += 1;
    }

    seasons
}

/// Does this show qualify for seasons mode? Requires at least one
/// recognized relation edge with a populated target.
pub fn has_related_seasons(media: &Media) -> bool {
    media
        .relations
        .as_ref()
        .and_then(|r| r.edges.as_ref())
        .map(|edges| {
            edges.iter().flatten().any(|edge| {
                RelationType::from_api(edge.relation_type.as_deref()).qualifies_as_season()
                    && edge.node.is_some()
            })
        })
        .unwrap_or(false)
}

/// Relation-type-only check for browse/search results, where the query
/// does not fetch relation targets.
pub fn has_related_seasons_simple(media: &Media) -> bool {
    media
        .relations
        .as_ref()
        .and_then(|r| r.edges.as_ref())
        .map(|edges| {
            edges.iter().flatten().any(|edge| {
                RelationType::from_api(edge.relation_type.as_deref()).qualifies_as_season()
            })
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::anilist::{RelationConnection, RelationEdge, Title};

    fn media(id: i64, title: &str) -> Media {
        Media {
            id,
            title: Some(Title {
                romaji: Some(title.to_string()),
                english: None,
                native: None,
            }),
            cover_image: None,
            description: None,
            episodes: None,
            status: Some("FINISHED".to_string()),
            season: None,
            season_year: None,
            format: None,
            genres: None,
            average_score: None,
            studios: None,
            relations: None,
        }
    }

    fn edge(relation: &str, node: Option<Media>) -> Option<RelationEdge> {
        Some(RelationEdge {
            relation_type: Some(relation.to_string()),
            node,
        })
    }

    fn with_relations(mut base: Media, edges: Vec<Option<RelationEdge>>) -> Media {
        base.relations = Some(RelationConnection { edges: Some(edges) });
        base
    }

    #[test]
    fn test_show_without_relations_is_single_season() {
        let seasons = resolve_seasons(&media(10, "Base"));
        assert_eq!(seasons.len(), 1);
        assert_eq!(seasons[0].season_number, 1);
        assert_eq!(seasons[0].anilist_id, 10);
        assert!(seasons[0].relation.is_none());
    }

    #[test]
    fn test_relation_groups_order_deterministically() {
        let base = with_relations(
            media(10, "Base"),
            vec![
                edge("ALTERNATIVE", Some(media(40, "Alt"))),
                edge("SEQUEL", Some(media(30, "Sequel"))),
                edge("SIDE_STORY", Some(media(35, "Side"))),
                edge("PREQUEL", Some(media(5, "Prequel"))),
                edge("CHARACTER", Some(media(99, "Spinoff"))),
            ],
        );
        let seasons = resolve_seasons(&base);
        let ids: Vec<i64> = seasons.iter().map(|s| s.anilist_id).collect();
        assert_eq!(ids, vec![10, 5, 30, 35, 40]);
        let numbers: Vec<u32> = seasons.iter().map(|s| s.season_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let base = with_relations(
            media(10, "Base"),
            vec![
                edge("SEQUEL", Some(media(22, "Second"))),
                edge("SEQUEL", Some(media(21, "First"))),
                edge("PARENT", Some(media(3, "Parent"))),
            ],
        );
        let seasons = resolve_seasons(&base);
        let ids: Vec<i64> = seasons.iter().map(|s| s.anilist_id).collect();
        assert_eq!(ids, vec![10, 3, 21, 22]);
    }

    #[test]
    fn test_duplicates_and_blanks_do_not_consume_numbers() {
        let base = with_relations(
            media(10, "Base"),
            vec![
                edge("SEQUEL", Some(media(20, "Sequel"))),
                edge("SIDE_STORY", Some(media(20, "Sequel again"))),
                edge("SEQUEL", Some(media(25, ""))),
                edge("SEQUEL", None),
                edge("ALTERNATIVE", Some(media(10, "Self"))),
                edge("SEQUEL", Some(media(28, "Last"))),
            ],
        );
        let seasons = resolve_seasons(&base);
        let ids: Vec<i64> = seasons.iter().map(|s| s.anilist_id).collect();
        assert_eq!(ids, vec![10, 20, 28]);
        let numbers: Vec<u32> = seasons.iter().map(|s| s.season_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_qualifying_checks() {
        let qualified = with_relations(
            media(10, "Base"),
            vec![edge("SEQUEL", Some(media(20, "Sequel")))],
        );
        assert!(has_related_seasons(&qualified));
        assert!(has_related_seasons_simple(&qualified));

        let nodeless = with_relations(media(10, "Base"), vec![edge("SEQUEL", None)]);
        assert!(!has_related_seasons(&nodeless));
        assert!(has_related_seasons_simple(&nodeless));

        let unrelated = with_relations(
            media(10, "Base"),
            vec![edge("CHARACTER", Some(media(20, "Other")))],
        );
        assert!(!has_related_seasons(&unrelated));
        assert!(!has_related_seasons_simple(&unrelated));

        assert!(!has_related_seasons(&media(10, "Base")));
    }
}
