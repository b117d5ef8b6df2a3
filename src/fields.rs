//! Field extraction grammar for the report template.
//!
//! The source PDFs flatten one fixed semi-structured template into plain
//! text, in two observed layouts: a quoted/comma-delimited row shape and a
//! numbered label-block shape. Each field is located by trying an ordered
//! list of [`FieldMatcher`]s per field-name variant; a miss is a normal
//! outcome, never an error. Structurally different templates are unsupported
//! input: on them every matcher simply misses.
//!
//! The URL and summary fields carry their own anchored extractors because
//! their values are wrapped in punctuation and sentence structure the two
//! generic patterns do not anticipate.

use regex::Regex;

/// Prefix of the page boundary line between extracted pages. The grammar
/// anchors on the prefix only, so numbered variants (`--- PAGE 2 ---`) from
/// other exporters terminate values just the same.
pub const PAGE_BREAK: &str = "--- PAGE";

/// A single textual pattern family that can attempt to extract one field.
///
/// Matchers are tried in a fixed order; the first hit wins. Adding support
/// for a new document layout means adding a matcher, not editing the
/// existing ones.
pub trait FieldMatcher {
    fn attempt(&self, field_name: &str, text: &str) -> Option<String>;
}

/// Layout (a): the field name as a quoted token between two other quoted
/// tokens, comma separated — a delimited table row flattened into text. The
/// value is the quoted token immediately after the name.
pub struct DelimitedTriple;

impl FieldMatcher for DelimitedTriple {
    fn attempt(&self, field_name: &str, text: &str) -> Option<String> {
        let pattern = format!(
            r#""[^"]*"\s*,\s*"{}"\s*,\s*"([^"]*)""#,
            regex::escape(field_name)
        );
        let re = Regex::new(&pattern).ok()?;
        let caps = re.captures(text)?;
        Some(caps[1].trim().trim_matches('"').to_string())
    }
}

/// Layout (b): the field name alone on a line, preceded by a one- or
/// two-digit index line. The value is everything up to the next index line,
/// a page boundary, or end of text, with internal line breaks collapsed.
///
/// A field-name variant may itself contain a literal `\n` where the label
/// wrapped in the source; the pattern tolerates whitespace around that break.
pub struct LabeledBlock;

impl FieldMatcher for LabeledBlock {
    fn attempt(&self, field_name: &str, text: &str) -> Option<String> {
        let name_pattern = newline_safe(field_name);
        let pattern = format!(
            r"(?s)\n\d{{1,2}}\n{}\n(.*?)(?:\n\d{{1,2}}\n|\n--- PAGE|\z)",
            name_pattern
        );
        let re = Regex::new(&pattern).ok()?;
        let caps = re.captures(text)?;
        let value = collapse_line_breaks(&caps[1]);
        Some(value)
    }
}

/// Escape a field name for use in a regex, allowing surrounding whitespace
/// wherever the name itself contains a line break.
fn newline_safe(field_name: &str) -> String {
    field_name
        .split('\n')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s*\n\s*")
}

/// Replace line breaks (and surrounding whitespace) with single spaces.
fn collapse_line_breaks(s: &str) -> String {
    let re = Regex::new(r"\s*\n\s*").expect("static pattern");
    re.replace_all(s, " ").trim().to_string()
}

/// Try each field-name variant against each matcher, in order. Returns the
/// first extracted value, or `None` when nothing matched anywhere.
pub fn extract_field(variants: &[&str], text: &str) -> Option<String> {
    let matchers: [&dyn FieldMatcher; 2] = [&DelimitedTriple, &LabeledBlock];
    for name in variants {
        for matcher in matchers {
            if let Some(value) = matcher.attempt(name, text) {
                return Some(value);
            }
        }
    }
    None
}

/// Extract the source URL.
///
/// The value may be wrapped in parentheses or quotes the generic value
/// pattern does not anticipate, so after anchoring on the quoted key this
/// takes the first URL-shaped run and trims trailing punctuation. Falls back
/// to the label-block form anchored at the template's fixed index `12`.
pub fn extract_url(text: &str) -> Option<String> {
    const FIELD: &str = "출처(URL)";

    let key_re = Regex::new(&format!(r#""{}""#, regex::escape(FIELD))).ok()?;
    if let Some(key) = key_re.find(text) {
        let after = &text[key.end()..];
        let url_re = Regex::new(r"https?://[^\s)]+").expect("static pattern");
        if let Some(m) = url_re.find(after) {
            let url = m.as_str().trim_matches(|c| c == ')' || c == '"');
            if !url.is_empty() {
                return Some(url.to_string());
            }
        }
    }

    let pattern = format!(
        r"(?s)\n12\n{}\n[^\n]*\n\((https?://[^\)]+)\)",
        newline_safe(FIELD)
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(text)?;
    Some(caps[1].trim().to_string())
}

/// Extract the article summary.
///
/// The label appears in two wrapped spellings of the 600-character abstract
/// heading, or the summary rides inside the quoted `"관련 이벤트"` block in
/// the delimited layout. Once the label is found, the value runs to the
/// first sentence that ends in a Hangul-final full stop (`…다.`) followed by
/// a line starting an unrelated block or a page boundary.
pub fn extract_summary(text: &str) -> Option<String> {
    const KEY_EVENT_BLOCK: &str = r#""관련 이벤트""#;
    let key_variations = [
        r"기사 텍스트\s*\(\s*600자\s*이내\s*축약\s*\)",
        r"기사\s*텍스트\s*\(600자\s*이내\s*\n\s*축약\)",
        KEY_EVENT_BLOCK,
    ];
    let key_pattern = format!(r"(?si)({})", key_variations.join("|"));
    let key_re = Regex::new(&key_pattern).ok()?;
    let key = key_re.find(text)?;
    let matched_key = key.as_str();
    let after = &text[key.end()..];

    let content_re = Regex::new(
        r"(?sm)^\s*(.*?[\x{AC00}-\x{D7A3}]\s*다\.)\s*(?:\n[A-ZÀ-ÿa-z]|\n--- PAGE|\z)",
    )
    .expect("static pattern");
    if let Some(caps) = content_re.captures(after) {
        let raw = caps[1].trim();
        let stripped = Regex::new(r"(?m)^,,")
            .expect("static pattern")
            .replace_all(raw, "");
        let value = collapse_line_breaks(&stripped);
        let value = value.trim().trim_matches('"').to_string();
        if !value.is_empty() {
            return Some(value);
        }
    }

    // The delimited layout stores the summary as a ,,-prefixed continuation
    // block between the event key and the next quoted index row.
    if matched_key.contains("관련 이벤트") {
        let block_re = Regex::new(r#"(?s)^\s*,\s*,(.*?)(?:\n"\d{1,2}"\s*,|\n,,"기사 텍스트")"#)
            .expect("static pattern");
        if let Some(caps) = block_re.captures(after) {
            let stripped = Regex::new(r"(?m)^\s*,,")
                .expect("static pattern")
                .replace_all(&caps[1], "");
            let candidate = collapse_line_breaks(stripped.trim().trim_matches('"'));
            let candidate = candidate.trim().trim_matches('"').to_string();
            if candidate.ends_with("다.") {
                return Some(candidate);
            }
        }
    }

    None
}
