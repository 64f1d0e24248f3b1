//! Station name resolution.
//!
//! User queries name a *station*; timetable rows reference *platforms*.
//! Resolution therefore matches names against every stop, collapses matched
//! platforms onto their parent station, and expands each resulting station
//! back into the full set of stop ids usable for boarding or alighting.

use unicode_normalization::UnicodeNormalization;

use crate::domain::StopIdx;

use super::FeedStore;
use super::error::ResolveError;

/// A station resolved from a user query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStation {
    /// The station stop (or the standalone stop itself).
    pub station: StopIdx,
    /// Display name of the station.
    pub name: String,
    /// The station plus every platform belonging to it. This is the set
    /// journeys may board at or alight from.
    pub stops: Vec<StopIdx>,
}

/// Canonical form used for name comparison: NFKC-normalised, casefolded,
/// surrounding whitespace removed.
///
/// NFKC matters for real feeds: "Zürich" may arrive precomposed or as
/// "u" + combining diaeresis, and both must compare equal.
pub(crate) fn normalize_name(raw: &str) -> String {
    raw.trim().nfkc().collect::<String>().to_lowercase()
}

impl FeedStore {
    /// Resolves a station name to all matching stations.
    ///
    /// Exact (normalised) name equality wins; only if nothing matches
    /// exactly does substring containment apply. Matched platforms collapse
    /// onto their parent station, and every candidate is expanded to its
    /// full boarding set. Candidates are returned sorted by name for
    /// deterministic display; the caller decides how to disambiguate when
    /// there is more than one.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] for an empty query or when no
    /// stop name matches.
    pub fn resolve_station(&self, query: &str) -> Result<Vec<ResolvedStation>, ResolveError> {
        let needle = normalize_name(query);
        if needle.is_empty() {
            return Err(ResolveError::NotFound(query.to_string()));
        }

        let mut exact = Vec::new();
        let mut containing = Vec::new();
        for (i, name) in self.normalized_names.iter().enumerate() {
            if name == &needle {
                exact.push(StopIdx::from(i));
            } else if name.contains(&needle) {
                containing.push(StopIdx::from(i));
            }
        }

        let matches = if exact.is_empty() { containing } else { exact };
        if matches.is_empty() {
            return Err(ResolveError::NotFound(query.to_string()));
        }

        // Collapse platforms onto their stations, keeping each station once.
        let mut stations: Vec<StopIdx> = Vec::new();
        for stop in matches {
            let root = self.station_root(stop);
            if !stations.contains(&root) {
                stations.push(root);
            }
        }
        stations.sort_by(|a, b| {
            let (a, b) = (self.stop(*a), self.stop(*b));
            a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))
        });

        Ok(stations
            .into_iter()
            .map(|station| ResolvedStation {
                station,
                name: self.stop(station).name.clone(),
                stops: self.expand_station(station),
            })
            .collect())
    }

    /// The station a stop belongs to: its parent if it has one, else itself.
    pub fn station_root(&self, stop: StopIdx) -> StopIdx {
        self.stop(stop).parent.unwrap_or(stop)
    }

    /// The full boarding set of a station: the station stop itself plus
    /// every platform whose parent it is.
    pub fn expand_station(&self, station: StopIdx) -> Vec<StopIdx> {
        let mut stops = vec![station];
        if let Some(children) = self.children.get(&station) {
            stops.extend(children.iter().copied());
        }
        stops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedTables, StopRow};

    fn stop(id: &str, name: &str, parent: Option<&str>, location: Option<&str>) -> StopRow {
        StopRow {
            stop_id: id.to_string(),
            stop_name: name.to_string(),
            parent_station: parent.map(str::to_string),
            location_type: location.map(str::to_string),
        }
    }

    fn store_with_stops(stops: Vec<StopRow>) -> FeedStore {
        FeedStore::build(FeedTables {
            stops,
            ..FeedTables::default()
        })
    }

    fn swiss_store() -> FeedStore {
        store_with_stops(vec![
            stop("8500010", "Basel SBB", None, Some("1")),
            stop("8500010:1", "Basel SBB", Some("8500010"), Some("0")),
            stop("8500010:2", "Basel SBB", Some("8500010"), Some("0")),
            stop("8503000", "Zürich HB", None, Some("1")),
            stop("8503000:41", "Zürich HB", Some("8503000"), Some("0")),
            stop("8507000", "Bern", None, None),
        ])
    }

    #[test]
    fn exact_match_collapses_and_expands() {
        let store = swiss_store();
        let resolved = store.resolve_station("Basel SBB").unwrap();

        assert_eq!(resolved.len(), 1);
        let station = &resolved[0];
        assert_eq!(station.name, "Basel SBB");
        assert_eq!(store.stop(station.station).id, "8500010");
        let ids: Vec<&str> = station.stops.iter().map(|&s| store.stop(s).id.as_str()).collect();
        assert_eq!(ids, vec!["8500010", "8500010:1", "8500010:2"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let store = swiss_store();
        let resolved = store.resolve_station("basel sbb").unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "Basel SBB");
    }

    #[test]
    fn nfkc_decomposed_query_matches() {
        let store = swiss_store();
        // "zu" + combining diaeresis + "rich hb"
        let decomposed = "zu\u{0308}rich hb";
        let resolved = store.resolve_station(decomposed).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "Zürich HB");
    }

    #[test]
    fn resolution_is_symmetric_under_normalisation() {
        let store = swiss_store();
        let a = store.resolve_station("Zürich HB").unwrap();
        let b = store.resolve_station("zu\u{0308}rich hb").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn exact_match_wins_over_substring() {
        let store = store_with_stops(vec![
            stop("1", "Olten", None, None),
            stop("2", "Olten Hammer", None, None),
        ]);

        let resolved = store.resolve_station("Olten").unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "Olten");
    }

    #[test]
    fn substring_fallback_surfaces_all_candidates() {
        let store = store_with_stops(vec![
            stop("1", "Olten", None, None),
            stop("2", "Olten Hammer", None, None),
            stop("3", "Bern", None, None),
        ]);

        let resolved = store.resolve_station("olt").unwrap();
        let names: Vec<&str> = resolved.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Olten", "Olten Hammer"]);
    }

    #[test]
    fn platform_match_resolves_to_station() {
        let store = swiss_store();
        // Platforms share the station's name, so a match through a platform
        // must not produce a second candidate.
        let resolved = store.resolve_station("zürich").unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(store.stop(resolved[0].station).id, "8503000");
    }

    #[test]
    fn standalone_stop_expands_to_itself() {
        let store = swiss_store();
        let resolved = store.resolve_station("Bern").unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].stops.len(), 1);
    }

    #[test]
    fn unknown_name_not_found() {
        let store = swiss_store();
        assert_eq!(
            store.resolve_station("Atlantis"),
            Err(ResolveError::NotFound("Atlantis".to_string()))
        );
    }

    #[test]
    fn empty_query_not_found() {
        let store = swiss_store();
        assert!(matches!(
            store.resolve_station("   "),
            Err(ResolveError::NotFound(_))
        ));
    }

    #[test]
    fn normalize_folds_width_and_case() {
        assert_eq!(normalize_name("  Basel SBB  "), "basel sbb");
        assert_eq!(normalize_name("Zu\u{0308}rich"), "zürich");
        // NFKC folds the fullwidth form to ASCII.
        assert_eq!(normalize_name("ＨＢ"), "hb");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Normalisation is idempotent.
        #[test]
        fn normalize_idempotent(s in "[a-zA-Z0-9 äöüÄÖÜéèàâçß\u{0308}\u{030a}]{0,40}") {
            let once = normalize_name(&s);
            prop_assert_eq!(normalize_name(&once), once);
        }

        /// Case variants of ASCII names normalise identically.
        #[test]
        fn ascii_case_insensitive(s in "[a-zA-Z ]{1,30}") {
            prop_assert_eq!(
                normalize_name(&s.to_uppercase()),
                normalize_name(&s.to_lowercase())
            );
        }
    }
}
