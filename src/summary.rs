use log::{debug, warn};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static DETAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s*regs?\s*/\s*(-?[\d,]*\.?\d+)\s*$").expect("valid detail regex")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummaryEntry {
    pub count: u64,
    pub value: f64,
}

impl SummaryEntry {
    pub fn new(count: u64, value: f64) -> Self {
        Self { count, value }
    }

    pub fn absorb(&mut self, other: SummaryEntry) {
        self.count += other.count;
        self.value += other.value;
    }
}

pub type SummaryMap = BTreeMap<String, SummaryEntry>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSummary {
    pub entries: SummaryMap,
    /// Non-blank segments that did not match the expected grammar.
    pub skipped: usize,
}

impl ParsedSummary {
    /// True when there was something to parse but nothing survived.
    pub fn is_suspicious(&self) -> bool {
        self.entries.is_empty() && self.skipped > 0
    }
}

/// Parses a breakdown string such as `"Acme: 3 regs/1,250.50, Beta: 0 regs/0"`.
pub fn parse_summary(input: Option<&str>) -> ParsedSummary {
    let mut parsed = ParsedSummary::default();
    let Some(input) = input else {
        return parsed;
    };

    for segment in split_segments(input) {
        if segment.trim().is_empty() {
            continue;
        }
        match parse_segment(segment) {
            Some((name, entry)) => parsed.entries.entry(name).or_default().absorb(entry),
            None => {
                debug!("Skipping malformed summary segment '{}'", segment.trim());
                parsed.skipped += 1;
            }
        }
    }

    if parsed.is_suspicious() {
        warn!(
            "Summary string produced no entries ({} malformed segments): '{}'",
            parsed.skipped, input
        );
    }

    parsed
}

/// Splits on commas, except thousands separators inside a value: a comma
/// between two digits whose following text has no `:` before the next comma.
/// A following colon means the comma starts a new entry whose name begins
/// with a digit.
fn split_segments(input: &str) -> Vec<&str> {
    let bytes = input.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;

    for (idx, &byte) in bytes.iter().enumerate() {
        if byte != b',' {
            continue;
        }
        let in_number = idx > 0
            && bytes[idx - 1].is_ascii_digit()
            && bytes.get(idx + 1).is_some_and(u8::is_ascii_digit)
            && !bytes[idx + 1..]
                .iter()
                .take_while(|&&b| b != b',')
                .any(|&b| b == b':');
        if !in_number {
            segments.push(&input[start..idx]);
            start = idx + 1;
        }
    }
    segments.push(&input[start..]);

    segments
}

fn parse_segment(segment: &str) -> Option<(String, SummaryEntry)> {
    // Names may contain colons; counts and values never do.
    let split = segment.rfind(':')?;
    let name = segment[..split].trim();
    if name.is_empty() {
        return None;
    }

    let caps = DETAIL_RE.captures(&segment[split + 1..])?;
    let count: u64 = caps.get(1)?.as_str().parse().ok()?;
    let value: f64 = caps.get(2)?.as_str().replace(',', "").parse().ok()?;

    Some((name.to_string(), SummaryEntry::new(count, value)))
}

/// Serializes entries back into the backend's summary format.
pub fn render_summary(entries: &SummaryMap) -> String {
    entries
        .iter()
        .map(|(name, entry)| format!("{}: {} regs/{:.2}", name, entry.count, entry.value))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_thousands_separator() {
        let parsed = parse_summary(Some("Acme: 3 regs/1,250.50, Beta: 0 regs/0"));

        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries["Acme"], SummaryEntry::new(3, 1250.5));
        assert_eq!(parsed.entries["Beta"], SummaryEntry::new(0, 0.0));
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn test_name_starting_with_digit_after_comma() {
        let parsed = parse_summary(Some("A: 1 regs/100,3M India: 1 regs/5"));
        assert_eq!(parsed.skipped, 0);
        assert_eq!(parsed.entries["A"], SummaryEntry::new(1, 100.0));
        assert_eq!(parsed.entries["3M India"], SummaryEntry::new(1, 5.0));

        let parsed = parse_summary(Some("A: 2 regs/1,250,000.50,3M: 1 regs/1,000"));
        assert_eq!(parsed.entries["A"], SummaryEntry::new(2, 1_250_000.5));
        assert_eq!(parsed.entries["3M"], SummaryEntry::new(1, 1_000.0));
    }

    #[test]
    fn test_name_with_colon_uses_last_colon() {
        let parsed = parse_summary(Some("Dept: Pharma: 2 regs/500"));
        assert_eq!(parsed.entries["Dept: Pharma"], SummaryEntry::new(2, 500.0));
    }

    #[test]
    fn test_empty_and_none() {
        assert!(parse_summary(None).entries.is_empty());
        assert!(parse_summary(Some("")).entries.is_empty());
        assert!(!parse_summary(Some("   ")).is_suspicious());
    }

    #[test]
    fn test_malformed_segments_are_skipped() {
        let parsed = parse_summary(Some("Acme: 3 regs/100, garbage, Beta: lots, Gamma: 1 reg/7"));
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries["Gamma"], SummaryEntry::new(1, 7.0));
        assert_eq!(parsed.skipped, 2);
        assert!(!parsed.is_suspicious());
    }

    #[test]
    fn test_all_garbage_is_suspicious() {
        let parsed = parse_summary(Some("nothing to see, here either"));
        assert!(parsed.entries.is_empty());
        assert!(parsed.is_suspicious());
    }

    #[test]
    fn test_duplicate_names_accumulate() {
        let parsed = parse_summary(Some("Acme: 1 regs/100, Acme: 2 regs/1,000"));
        assert_eq!(parsed.entries["Acme"], SummaryEntry::new(3, 1100.0));
    }

    #[test]
    fn test_render_parses_back() {
        let mut entries = SummaryMap::new();
        entries.insert("Clinical".to_string(), SummaryEntry::new(4, 12_500.25));
        entries.insert("Food".to_string(), SummaryEntry::new(1, 300.0));

        let rendered = render_summary(&entries);
        assert_eq!(rendered, "Clinical: 4 regs/12500.25, Food: 1 regs/300.00");
        assert_eq!(parse_summary(Some(&rendered)).entries, entries);
    }
}
