//! Record builder: orchestrates the field extractor across the report
//! template's schema and normalizes the result into a [`Record`].

use crate::fields::{extract_field, extract_summary, extract_url};
use crate::models::{FieldValue, Record};

/// Known name variants per schema field. The wrapped spellings cover labels
/// broken across a line boundary in the extracted text.
const MAJOR: &[&str] = &["갈등 대분류"];
const MIDDLE: &[&str] = &["갈등 중분류"];
const MINOR: &[&str] = &["갈등 소분류"];
const LOCATION: &[&str] = &["위치"];
const TITLE: &[&str] = &["제목"];
const EVENT_DATE: &[&str] = &["보도 일자"];
const ORIGINAL_TITLE: &[&str] = &["원문 기사 제목", "원문 기사 제 목", "원문 기사 제\n목"];

/// Build a record from one document's extracted text. Never fails: every
/// unextractable field degrades to `Missing`, and no location data degrades
/// to an empty list.
pub fn build_record(text: &str, filename: &str) -> Record {
    Record {
        major: FieldValue::from_extracted(extract_field(MAJOR, text)),
        middle: FieldValue::from_extracted(extract_field(MIDDLE, text)),
        minor: FieldValue::from_extracted(extract_field(MINOR, text)),
        locations: split_locations(extract_field(LOCATION, text)),
        title: FieldValue::from_extracted(extract_field(TITLE, text)),
        original_title: FieldValue::from_extracted(extract_field(ORIGINAL_TITLE, text)),
        event_date: FieldValue::from_extracted(extract_field(EVENT_DATE, text)),
        source_url: FieldValue::from_extracted(extract_url(text)),
        summary: FieldValue::from_extracted(extract_summary(text)),
        filename: filename.to_string(),
    }
}

/// Split a raw location value on `/` into trimmed, non-empty parts. A single
/// value wraps to a one-element list; a miss yields the empty list — the one
/// field where absence is a sequence, not a sentinel.
fn split_locations(raw: Option<String>) -> Vec<String> {
    match raw {
        Some(value) if !value.trim().is_empty() => {
            if value.contains('/') {
                value
                    .split('/')
                    .map(|part| part.trim())
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect()
            } else {
                vec![value.trim().to_string()]
            }
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_splits_on_slash() {
        assert_eq!(
            split_locations(Some("A / B / C".to_string())),
            vec!["A", "B", "C"]
        );
    }

    #[test]
    fn single_location_wraps_to_one_element() {
        assert_eq!(split_locations(Some("A".to_string())), vec!["A"]);
    }

    #[test]
    fn missing_location_yields_empty_list() {
        assert!(split_locations(None).is_empty());
        assert!(split_locations(Some("  ".to_string())).is_empty());
    }

    #[test]
    fn empty_parts_are_discarded() {
        assert_eq!(
            split_locations(Some("페루, 리마 / / 볼리비아".to_string())),
            vec!["페루, 리마", "볼리비아"]
        );
    }

    #[test]
    fn build_on_unparseable_text_yields_all_missing() {
        let record = build_record("nothing the template recognizes", "x.pdf");
        assert!(record.major.is_missing());
        assert!(record.title.is_missing());
        assert!(record.source_url.is_missing());
        assert!(record.summary.is_missing());
        assert!(record.locations.is_empty());
        assert_eq!(record.filename, "x.pdf");
    }

    #[test]
    fn build_from_labeled_block_document() {
        let text = "\n1\n갈등 대분류\n국내(사회)\n2\n갈등 중분류\n노동\n3\n갈등 소분류\n파업\n\
                    4\n위치\n페루, 리마 / 볼리비아, 라파스\n5\n제목\n시위 확산\n6\n보도 일자\n2024-03-02\n\
                    7\n원문 기사 제\n목\nProtestas se extienden\n\
                    12\n출처(URL)\ncaption\n(https://example.com/n/9)\n13\n";
        let record = build_record(text, "doc1.pdf");
        assert_eq!(record.major, FieldValue::Text("국내(사회)".into()));
        assert_eq!(record.middle, FieldValue::Text("노동".into()));
        assert_eq!(record.minor, FieldValue::Text("파업".into()));
        assert_eq!(record.locations, vec!["페루, 리마", "볼리비아, 라파스"]);
        assert_eq!(record.title, FieldValue::Text("시위 확산".into()));
        assert_eq!(
            record.original_title,
            FieldValue::Text("Protestas se extienden".into())
        );
        assert_eq!(record.event_date, FieldValue::Text("2024-03-02".into()));
        assert_eq!(
            record.source_url,
            FieldValue::Text("https://example.com/n/9".into())
        );
    }

    #[test]
    fn build_from_delimited_document() {
        let text = "\"1\",\"갈등 대분류\",\"국제(국제관계)\"\n\
                    \"2\",\"갈등 중분류\",\"외교\"\n\
                    \"4\",\"위치\",\"멕시코\"\n\
                    \"5\",\"제목\",\"정상회담 개최\"\n\
                    \"12\",\"출처(URL)\",\"(https://example.com/a)\"";
        let record = build_record(text, "doc2.pdf");
        assert_eq!(record.major, FieldValue::Text("국제(국제관계)".into()));
        assert_eq!(record.locations, vec!["멕시코"]);
        assert_eq!(
            record.source_url,
            FieldValue::Text("https://example.com/a".into())
        );
    }
}
