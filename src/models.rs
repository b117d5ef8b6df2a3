//! Core data models used throughout News Atlas.
//!
//! These types represent the records parsed from report PDFs, the resolved
//! coordinates, and the map markers that flow from the corpus to the query
//! layer.

use std::fmt;

/// Sentinel rendered for a field the extractor could not locate. Kept in the
/// source template's language so popups and diagnostics match the legacy
/// report output.
pub const MISSING_LABEL: &str = "정보 없음";

/// A scalar record field: either extracted text or explicitly absent.
///
/// The source format used a magic sentinel string for "no value"; modelling
/// it as a sum type keeps sentinel comparisons out of downstream code. An
/// empty or whitespace-only extraction normalizes to [`FieldValue::Missing`],
/// so `Text` always holds a non-empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Missing,
}

impl FieldValue {
    /// Normalize a raw extraction result: `None` or blank becomes `Missing`.
    pub fn from_extracted(raw: Option<String>) -> Self {
        match raw {
            Some(s) if !s.trim().is_empty() => FieldValue::Text(s),
            _ => FieldValue::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Missing => None,
        }
    }

    /// Case-insensitive substring match; a missing field matches nothing.
    pub fn contains_keyword(&self, keyword_lower: &str) -> bool {
        match self {
            FieldValue::Text(s) => s.to_lowercase().contains(keyword_lower),
            FieldValue::Missing => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Missing => write!(f, "{}", MISSING_LABEL),
        }
    }
}

/// One parsed article. Immutable once built; the builder never fails, so the
/// worst case is every field `Missing` and an empty location list.
#[derive(Debug, Clone)]
pub struct Record {
    /// Three-level conflict classification.
    pub major: FieldValue,
    pub middle: FieldValue,
    pub minor: FieldValue,
    /// Free-text place descriptions. Empty list means no location data; the
    /// sentinel never appears as an element.
    pub locations: Vec<String>,
    pub title: FieldValue,
    pub original_title: FieldValue,
    pub event_date: FieldValue,
    pub source_url: FieldValue,
    pub summary: FieldValue,
    /// Source PDF filename; always present.
    pub filename: String,
}

/// Per-field validity across a whole [`RecordSet`]: true when at least one
/// record carries real data for that field.
#[derive(Debug, Clone, Default)]
pub struct FieldValidity {
    pub major: bool,
    pub middle: bool,
    pub minor: bool,
    pub locations: bool,
    pub title: bool,
    pub original_title: bool,
    pub event_date: bool,
    pub summary: bool,
}

impl FieldValidity {
    pub fn all_valid(&self) -> bool {
        self.invalid_fields().is_empty()
    }

    /// Names of fields with no valid data in any record, for diagnostics.
    pub fn invalid_fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        for (ok, name) in [
            (self.major, "대분류"),
            (self.middle, "중분류"),
            (self.minor, "소분류"),
            (self.locations, "지역정보"),
            (self.title, "기사제목"),
            (self.original_title, "original_title"),
            (self.event_date, "이벤트"),
            (self.summary, "요약"),
        ] {
            if !ok {
                out.push(name);
            }
        }
        out
    }
}

/// The full parsed corpus plus validity flags computed once at load time.
#[derive(Debug, Clone)]
pub struct RecordSet {
    pub records: Vec<Record>,
    pub validity: FieldValidity,
}

impl RecordSet {
    pub fn new(records: Vec<Record>) -> Self {
        let validity = FieldValidity {
            major: records.iter().any(|r| !r.major.is_missing()),
            middle: records.iter().any(|r| !r.middle.is_missing()),
            minor: records.iter().any(|r| !r.minor.is_missing()),
            locations: records.iter().any(|r| !r.locations.is_empty()),
            title: records.iter().any(|r| !r.title.is_missing()),
            original_title: records.iter().any(|r| !r.original_title.is_missing()),
            event_date: records.iter().any(|r| !r.event_date.is_missing()),
            summary: records.iter().any(|r| !r.summary.is_missing()),
        };
        Self { records, validity }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// A resolved geographic position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One map-plottable unit: a resolved coordinate plus the originating
/// record's display fields. Keyed by (record index, location string) so the
/// same location repeated inside one record emits a single marker.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    /// The location string this marker was resolved from.
    pub location: String,
    pub title: String,
    pub original_title: String,
    pub event_date: String,
    /// `major > middle > minor` classification path.
    pub category: String,
    pub source_url: String,
    pub summary: String,
    pub filename: String,
    /// Marker color derived from the major classification.
    pub color: &'static str,
}
