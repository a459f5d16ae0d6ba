//! Corruption detection and deterministic repair
//!
//! Two corruption patterns show up in the wild and both have regular,
//! mechanical fixes:
//! - An embedded hex-dash identifier (canonically 36 characters) picks up
//!   or loses a character, usually a doubled hex digit in the first group.
//! - A file extension gets duplicated (`photo.jpg.jpg`).

use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical embedded identifier length (8-4-4-4-12 plus four dashes)
pub const CANONICAL_IDENT_LEN: usize = 36;

/// Matches identifier-shaped tokens, including ones with a drifted first
/// or last group length. Tight groups in the middle keep false positives
/// out of ordinary hex-ish file names.
static IDENT_CANDIDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[0-9a-fA-F]{6,12}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{10,14}",
    )
    .expect("identifier candidate pattern is valid")
});

/// Matches a trailing duplicated extension, e.g. `.jpg.jpg`
static DUP_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.([a-z0-9]{2,5})\.([a-z0-9]{2,5})$")
        .expect("duplicate extension pattern is valid")
});

/// What kind of corruption was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionKind {
    /// Embedded identifier length deviates from the canonical 36
    IdentifierLength,
    /// File extension appears twice at the end of the locator
    DuplicatedExtension,
}

/// Outcome of comparing an original locator against an observed error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptionReport {
    /// Whether a corruption signature was found
    pub is_corrupted: bool,
    /// The pattern that matched, when corrupted
    pub kind: Option<CorruptionKind>,
    /// Human-readable repair suggestion, when a deterministic fix exists
    pub suggestion: Option<String>,
}

impl CorruptionReport {
    /// A clean report: nothing suspicious found
    #[inline]
    #[must_use]
    pub fn clean() -> Self {
        Self {
            is_corrupted: false,
            kind: None,
            suggestion: None,
        }
    }

    fn found(kind: CorruptionKind, suggestion: Option<String>) -> Self {
        Self {
            is_corrupted: true,
            kind: Some(kind),
            suggestion,
        }
    }
}

/// First identifier-shaped token in `text`, if any
pub(crate) fn find_identifier(text: &str) -> Option<&str> {
    IDENT_CANDIDATE.find(text).map(|m| m.as_str())
}

/// Compare an original locator with an observed error message
///
/// Flags (a) an identifier appearing in the error text with a different
/// length than in the original, (b) an original identifier that already
/// deviates from the canonical length, and (c) a duplicated extension.
pub(crate) fn detect(original: &str, error_text: &str) -> CorruptionReport {
    let original_ident = find_identifier(original);
    let error_ident = find_identifier(error_text);

    if let (Some(orig), Some(err)) = (original_ident, error_ident) {
        if orig.len() != err.len() {
            let suggestion = fix_identifier(original)
                .or_else(|| fix_identifier(error_text))
                .map(|fixed| format!("identifier length drifted; retry with {fixed}"));
            return CorruptionReport::found(CorruptionKind::IdentifierLength, suggestion);
        }
    }

    if let Some(ident) = original_ident {
        if ident.len() != CANONICAL_IDENT_LEN {
            let suggestion = fix_identifier(original)
                .map(|fixed| format!("identifier is {} chars, expected 36; retry with {fixed}", ident.len()));
            return CorruptionReport::found(CorruptionKind::IdentifierLength, suggestion);
        }
    }

    if has_dup_extension(original) || has_dup_extension(error_text) {
        let target = if has_dup_extension(original) {
            original
        } else {
            error_text
        };
        let suggestion =
            collapse_extension(target).map(|fixed| format!("duplicated extension; retry with {fixed}"));
        return CorruptionReport::found(CorruptionKind::DuplicatedExtension, suggestion);
    }

    CorruptionReport::clean()
}

/// Apply the deterministic fix rules, returning the repaired locator
///
/// Rules, in order: trim the extra hex character from an oversized first
/// identifier group, then collapse a duplicated extension. Returns `None`
/// when no rule matched.
pub(crate) fn attempt_fix(locator: &str) -> Option<String> {
    if let Some(fixed) = fix_identifier(locator) {
        // An identifier fix may coexist with a duplicated extension.
        return Some(collapse_extension(&fixed).unwrap_or(fixed));
    }
    collapse_extension(locator)
}

/// Trim one surplus hex character from the first identifier group
///
/// Prefers dropping one half of an adjacent duplicated pair (the common
/// corruption), falling back to the group's last character. Returns the
/// whole locator with the identifier repaired, or `None` when the first
/// group is not exactly one character over.
fn fix_identifier(locator: &str) -> Option<String> {
    let ident = find_identifier(locator)?;
    let first_group = ident.split('-').next()?;
    if first_group.len() != 9 {
        return None;
    }

    let bytes = first_group.as_bytes();
    let drop_at = (0..bytes.len() - 1)
        .find(|&i| bytes[i] == bytes[i + 1])
        .map_or(bytes.len() - 1, |i| i);

    let mut fixed_group = String::with_capacity(8);
    for (i, c) in first_group.chars().enumerate() {
        if i != drop_at {
            fixed_group.push(c);
        }
    }

    let fixed_ident = {
        let rest = &ident[first_group.len()..];
        format!("{fixed_group}{rest}")
    };
    Some(locator.replacen(ident, &fixed_ident, 1))
}

/// Whether the locator ends in a genuinely duplicated extension
fn has_dup_extension(locator: &str) -> bool {
    DUP_EXTENSION
        .captures(locator)
        .and_then(|caps| {
            let first = caps.get(1)?.as_str();
            let second = caps.get(2)?.as_str();
            Some(first.eq_ignore_ascii_case(second))
        })
        .unwrap_or(false)
}

/// Collapse a trailing duplicated extension, `photo.jpg.jpg` -> `photo.jpg`
fn collapse_extension(locator: &str) -> Option<String> {
    let caps = DUP_EXTENSION.captures(locator)?;
    let (first, second) = (caps.get(1)?.as_str(), caps.get(2)?.as_str());
    if !first.eq_ignore_ascii_case(second) {
        return None;
    }
    let start = caps.get(0)?.start();
    Some(format!("{}.{}", &locator[..start], first))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "/photos/5b6f138b-65ba-4765-af3c-868da25d8a25.jpg";
    const BAD: &str = "/photos/5b6ff138b-65ba-4765-af3c-868da25d8a25.jpg";

    #[test]
    fn finds_canonical_identifier() {
        let ident = find_identifier(GOOD).unwrap();
        assert_eq!(ident.len(), CANONICAL_IDENT_LEN);
    }

    #[test]
    fn detects_length_drift_between_original_and_error() {
        let report = detect(GOOD, &format!("FileNotFoundException: {BAD}"));
        assert!(report.is_corrupted);
        assert_eq!(report.kind, Some(CorruptionKind::IdentifierLength));
        assert!(report.suggestion.is_some());
    }

    #[test]
    fn detects_oversized_identifier_in_original() {
        let report = detect(BAD, "open failed");
        assert!(report.is_corrupted);
        assert_eq!(report.kind, Some(CorruptionKind::IdentifierLength));
        let suggestion = report.suggestion.unwrap();
        assert!(suggestion.contains(GOOD), "suggestion was: {suggestion}");
    }

    #[test]
    fn fix_trims_duplicated_hex_char() {
        assert_eq!(attempt_fix(BAD).as_deref(), Some(GOOD));
    }

    #[test]
    fn fix_collapses_duplicated_extension() {
        assert_eq!(
            attempt_fix("/photos/sunset.jpg.jpg").as_deref(),
            Some("/photos/sunset.jpg")
        );
    }

    #[test]
    fn fix_is_idempotent() {
        let fixed = attempt_fix(BAD).unwrap();
        assert_eq!(attempt_fix(&fixed), None);
    }

    #[test]
    fn fix_returns_none_without_a_matching_rule() {
        assert_eq!(attempt_fix(GOOD), None);
        assert_eq!(attempt_fix("/photos/plain.png"), None);
    }

    #[test]
    fn mismatched_double_suffix_is_not_collapsed() {
        assert_eq!(attempt_fix("/photos/archive.tar.gz"), None);
    }

    #[test]
    fn detects_duplicated_extension() {
        let report = detect("/photos/sunset.jpg.jpg", "open failed");
        assert!(report.is_corrupted);
        assert_eq!(report.kind, Some(CorruptionKind::DuplicatedExtension));
        assert!(report.suggestion.unwrap().contains("/photos/sunset.jpg"));
    }

    #[test]
    fn tar_gz_is_not_a_duplicated_extension() {
        let report = detect("/backups/archive.tar.gz", "open failed");
        assert!(!report.is_corrupted);
    }

    #[test]
    fn clean_inputs_report_clean() {
        let report = detect(GOOD, "decoder produced garbage");
        assert!(!report.is_corrupted);
        assert_eq!(report.kind, None);
    }
}
