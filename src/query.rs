//! Keyword search and map marker assembly.
//!
//! Filters the record set by case-insensitive substring match across the
//! classification levels, both titles, and every element of the location
//! list, then resolves each distinct location once and emits one marker per
//! (record, location) pair that resolved.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::geocode::LocationResolver;
use crate::models::{Coordinates, FieldValue, Marker, RecordSet};
use crate::progress::{ProgressEvent, ProgressReporter};

/// Fixed major-classification → marker color table.
const CATEGORY_COLORS: &[(&str, &str)] = &[
    ("국내(사회)", "red"),
    ("국내(경제)", "green"),
    ("국내(범죄)", "black"),
    ("국제(국제관계)", "purple"),
    ("정치", "blue"),
];

/// Default color for categories outside the fixed table.
const DEFAULT_COLOR: &str = "gray";

pub fn category_color(major: &FieldValue) -> &'static str {
    let Some(major) = major.as_text() else {
        return DEFAULT_COLOR;
    };
    CATEGORY_COLORS
        .iter()
        .find(|(category, _)| *category == major)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_COLOR)
}

/// Result of one search: markers plus summary counts for display.
#[derive(Debug)]
pub struct QueryOutcome {
    pub markers: Vec<Marker>,
    /// Records that matched the keyword (before resolution).
    pub matched_records: usize,
    /// Distinct location strings across the matched records.
    pub distinct_locations: usize,
    /// How many of those resolved to coordinates.
    pub resolved_locations: usize,
    /// Centroid of all marker coordinates, for initial map framing.
    pub center: Option<Coordinates>,
}

/// Run one keyword search over the record set.
///
/// Distinct locations are resolved sequentially in sorted order — the
/// resolver's rate gate makes resolution the slow path, so every repeated
/// location costs one chain run at most.
pub async fn run_query(
    records: &RecordSet,
    keyword: &str,
    resolver: &LocationResolver,
    reporter: &dyn ProgressReporter,
) -> QueryOutcome {
    let keyword_lower = keyword.trim().to_lowercase();
    if keyword_lower.is_empty() {
        return QueryOutcome {
            markers: Vec::new(),
            matched_records: 0,
            distinct_locations: 0,
            resolved_locations: 0,
            center: None,
        };
    }

    // Searchable records need a classification, both titles, and at least
    // one location; anything else cannot be displayed as a marker.
    let matched: Vec<(usize, &crate::models::Record)> = records
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            !r.major.is_missing()
                && !r.title.is_missing()
                && !r.original_title.is_missing()
                && !r.locations.is_empty()
        })
        .filter(|(_, r)| {
            r.major.contains_keyword(&keyword_lower)
                || r.middle.contains_keyword(&keyword_lower)
                || r.minor.contains_keyword(&keyword_lower)
                || r.title.contains_keyword(&keyword_lower)
                || r.original_title.contains_keyword(&keyword_lower)
                || r.locations
                    .iter()
                    .any(|loc| loc.to_lowercase().contains(&keyword_lower))
        })
        .collect();

    // Resolve each distinct location once, in deterministic order.
    let distinct: BTreeSet<&str> = matched
        .iter()
        .flat_map(|(_, r)| r.locations.iter().map(String::as_str))
        .collect();
    let total = distinct.len() as u64;

    let mut resolved: HashMap<&str, Option<Coordinates>> = HashMap::new();
    for (i, place) in distinct.iter().enumerate() {
        reporter.report(ProgressEvent::Resolving {
            place: place.to_string(),
            n: i as u64 + 1,
            total,
        });
        resolved.insert(*place, resolver.resolve(place).await);
    }
    let resolved_locations = resolved.values().filter(|c| c.is_some()).count();

    // One marker per (record, location) pair that resolved; the key guards
    // against the same location string repeating inside one record.
    let mut seen: HashSet<(usize, &str)> = HashSet::new();
    let mut markers = Vec::new();
    for (idx, record) in &matched {
        for location in &record.locations {
            let Some(coords) = resolved.get(location.as_str()).copied().flatten() else {
                continue;
            };
            if !seen.insert((*idx, location.as_str())) {
                continue;
            }
            markers.push(Marker {
                latitude: coords.latitude,
                longitude: coords.longitude,
                location: location.clone(),
                title: record.title.to_string(),
                original_title: record.original_title.to_string(),
                event_date: record.event_date.to_string(),
                category: format!("{} > {} > {}", record.major, record.middle, record.minor),
                source_url: record.source_url.to_string(),
                summary: record.summary.to_string(),
                filename: record.filename.clone(),
                color: category_color(&record.major),
            });
        }
    }

    let center = centroid(&markers);

    QueryOutcome {
        matched_records: matched.len(),
        distinct_locations: distinct.len(),
        resolved_locations,
        markers,
        center,
    }
}

fn centroid(markers: &[Marker]) -> Option<Coordinates> {
    if markers.is_empty() {
        return None;
    }
    let n = markers.len() as f64;
    let lat = markers.iter().map(|m| m.latitude).sum::<f64>() / n;
    let lon = markers.iter().map(|m| m.longitude).sum::<f64>() / n;
    Some(Coordinates::new(lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::{Geocoder, LocationResolver, ResolverDeps};
    use crate::models::Record;
    use crate::progress::NoProgress;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NullGeocoder;

    #[async_trait]
    impl Geocoder for NullGeocoder {
        async fn lookup(&self, _query: &str) -> Result<Option<Coordinates>> {
            Ok(None)
        }
    }

    fn resolver(overrides: &[(&str, f64, f64)]) -> LocationResolver {
        LocationResolver::new(ResolverDeps {
            overrides: overrides
                .iter()
                .map(|(p, lat, lon)| (p.to_string(), Coordinates::new(*lat, *lon)))
                .collect(),
            geocoder: Arc::new(NullGeocoder),
            inference: None,
        })
    }

    fn record(major: &str, title: &str, original: &str, locations: &[&str]) -> Record {
        Record {
            major: FieldValue::Text(major.into()),
            middle: FieldValue::Text("중분류".into()),
            minor: FieldValue::Text("소분류".into()),
            locations: locations.iter().map(|s| s.to_string()).collect(),
            title: FieldValue::Text(title.into()),
            original_title: FieldValue::Text(original.into()),
            event_date: FieldValue::Text("2024-01-01".into()),
            source_url: FieldValue::Text("https://example.com".into()),
            summary: FieldValue::Text("요약이다.".into()),
            filename: "doc.pdf".into(),
        }
    }

    #[tokio::test]
    async fn keyword_matches_inside_one_location_element() {
        let records = RecordSet::new(vec![record(
            "정치",
            "정상회담",
            "Cumbre",
            &["페루, 리마", "볼리비아"],
        )]);
        let resolver = resolver(&[("페루, 리마", -12.0, -77.0), ("볼리비아", -16.3, -63.6)]);

        let outcome = run_query(&records, "볼리비아", &resolver, &NoProgress).await;
        assert_eq!(outcome.matched_records, 1);
        assert_eq!(outcome.markers.len(), 2);
    }

    #[tokio::test]
    async fn records_without_required_fields_are_not_searchable() {
        let mut incomplete = record("정치", "제목", "Título", &["페루"]);
        incomplete.major = FieldValue::Missing;
        let records = RecordSet::new(vec![incomplete]);
        let resolver = resolver(&[("페루", -9.2, -75.0)]);

        let outcome = run_query(&records, "페루", &resolver, &NoProgress).await;
        assert_eq!(outcome.matched_records, 0);
        assert!(outcome.markers.is_empty());
    }

    #[tokio::test]
    async fn repeated_location_in_one_record_emits_one_marker() {
        let records = RecordSet::new(vec![record("정치", "제목", "Título", &["페루", "페루"])]);
        let resolver = resolver(&[("페루", -9.2, -75.0)]);

        let outcome = run_query(&records, "페루", &resolver, &NoProgress).await;
        assert_eq!(outcome.markers.len(), 1);
    }

    #[tokio::test]
    async fn unresolved_locations_emit_no_marker_but_count() {
        let records = RecordSet::new(vec![record(
            "정치",
            "제목",
            "Título",
            &["페루", "미지의 장소"],
        )]);
        let resolver = resolver(&[("페루", -9.2, -75.0)]);

        let outcome = run_query(&records, "제목", &resolver, &NoProgress).await;
        assert_eq!(outcome.distinct_locations, 2);
        assert_eq!(outcome.resolved_locations, 1);
        assert_eq!(outcome.markers.len(), 1);
    }

    #[tokio::test]
    async fn centroid_averages_marker_coordinates() {
        let records = RecordSet::new(vec![
            record("정치", "하나", "Uno", &["페루"]),
            record("정치", "둘", "Dos", &["칠레"]),
        ]);
        let resolver = resolver(&[("페루", -10.0, -70.0), ("칠레", -30.0, -72.0)]);

        let outcome = run_query(&records, "정치", &resolver, &NoProgress).await;
        let center = outcome.center.unwrap();
        assert!((center.latitude - -20.0).abs() < 1e-9);
        assert!((center.longitude - -71.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_keyword_returns_nothing() {
        let records = RecordSet::new(vec![record("정치", "제목", "Título", &["페루"])]);
        let resolver = resolver(&[("페루", -9.2, -75.0)]);
        let outcome = run_query(&records, "   ", &resolver, &NoProgress).await;
        assert_eq!(outcome.matched_records, 0);
    }

    #[test]
    fn category_colors_follow_fixed_table() {
        assert_eq!(category_color(&FieldValue::Text("국내(사회)".into())), "red");
        assert_eq!(category_color(&FieldValue::Text("정치".into())), "blue");
        assert_eq!(category_color(&FieldValue::Text("스포츠".into())), "gray");
        assert_eq!(category_color(&FieldValue::Missing), "gray");
    }
}
