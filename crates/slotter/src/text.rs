//! Text normalization shared by the sheet tools.
//!
//! Run-of-show cells are typed by hand, so everything that compares them
//! goes through these helpers first: Unicode folding, flag emoji stripping,
//! and tolerant number extraction.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static FLAG_EMOJI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([\x{1F1E6}-\x{1F1FF}]{2})").expect("valid regex"));

static LEADING_NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:first\s+global|fgc)\s+)?(?:team|delegation)\b[\s:-]*")
        .expect("valid regex")
});

static LEADING_OF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^of\b[\s:-]*").expect("valid regex"));

static TRAILING_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[\s:-]*(?:team|delegation)\b$").expect("valid regex"));

static RANKING_MATCH_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)RANKING MATCH\s*#?\s*(\d+)").expect("valid regex"));

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Z0-9]+").expect("valid regex"));

/// Longest status message shown to the operator.
pub const MAX_MESSAGE_LEN: usize = 500;

const NOISE_TRIM: &[char] = &[' ', '-', '–', '—', ',', ':'];

/// Check whether `text` begins with a flag emoji (two regional indicators),
/// ignoring leading whitespace.
#[must_use]
pub fn starts_with_flag(text: &str) -> bool {
    FLAG_EMOJI_RE.is_match(text)
}

/// Remove a leading flag emoji and trim the result.
#[must_use]
pub fn strip_leading_flag(text: &str) -> String {
    match FLAG_EMOJI_RE.captures(text).and_then(|caps| caps.get(1)) {
        Some(flag) => format!("{}{}", &text[..flag.start()], &text[flag.end()..])
            .trim()
            .to_string(),
        None => text.trim().to_string(),
    }
}

/// Strip "Team", "Delegation", "FIRST Global Team of", and similar decoration
/// from a country name.
#[must_use]
pub fn strip_country_noise(name: &str) -> String {
    let mut value = name.trim().to_string();
    if value.is_empty() {
        return value;
    }

    loop {
        let cleaned = LEADING_NOISE_RE.replace(&value, "").into_owned();
        if cleaned == value {
            break;
        }
        value = cleaned.trim_matches(NOISE_TRIM).to_string();
    }

    let without_of = LEADING_OF_RE.replace(&value, "").into_owned();
    let without_of = without_of.trim_matches(NOISE_TRIM);
    TRAILING_NOISE_RE
        .replace(without_of, "")
        .trim_matches(NOISE_TRIM)
        .to_string()
}

/// Fold a header cell for alias comparison: NFKC, collapsed whitespace, and
/// a uniform case.
#[must_use]
pub fn normalize_header(text: &str, uppercase: bool) -> String {
    let folded: String = text.nfkc().collect();
    let collapsed = WHITESPACE_RE.replace_all(&folded, " ");
    let trimmed = collapsed.trim();
    if uppercase {
        trimmed.to_uppercase()
    } else {
        trimmed.to_lowercase()
    }
}

/// The last run of digits in `text`, without leading zeros.
///
/// A run made only of zeros becomes `0`, so `000` and `0` compare equal.
#[must_use]
pub fn normalize_video_number(text: &str) -> Option<String> {
    let last = DIGITS_RE.find_iter(text).last()?.as_str();
    let stripped = last.trim_start_matches('0');
    Some(if stripped.is_empty() { "0" } else { stripped }.to_string())
}

/// The number in `RANKING MATCH #12`, `Ranking Match 12`, and similar.
#[must_use]
pub fn extract_match_number(text: &str) -> Option<u32> {
    RANKING_MATCH_NUMBER_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// The first run of digits in `text`, without leading zeros.
#[must_use]
pub fn extract_host_number(text: &str) -> Option<String> {
    let first = DIGITS_RE.find(text)?.as_str();
    let stripped = first.trim_start_matches('0');
    Some(if stripped.is_empty() { first } else { stripped }.to_string())
}

/// Key used to pair booth interview labels across the sheet and the
/// Videos tab.
#[must_use]
pub fn normalize_booth_key(text: &str) -> String {
    let upper = text.nfkc().collect::<String>().to_uppercase();
    let spaced = NON_ALNUM_RE.replace_all(&upper, " ");
    WHITESPACE_RE.replace_all(&spaced, " ").trim().to_string()
}

/// Cut `text` to at most `max` characters.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Ratcliff/Obershelp similarity: `2 * matches / total length`.
///
/// Two empty strings are identical.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_characters(&a, &b);
    2.0 * matches as f64 / total as f64
}

/// Sum of the longest common blocks, found recursively on either side of
/// each block.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let Some((start_a, start_b, len)) = longest_common_block(a, b) else {
        return 0;
    };
    len + matching_characters(&a[..start_a], &b[..start_b])
        + matching_characters(&a[start_a + len..], &b[start_b + len..])
}

/// The longest common substring, preferring the earliest start in `a`, then
/// in `b`.
fn longest_common_block(a: &[char], b: &[char]) -> Option<(usize, usize, usize)> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let mut best = (0, 0, 0);
    let mut previous = vec![0_usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![0_usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let len = previous[j] + 1;
                current[j + 1] = len;
                let start_a = i + 1 - len;
                let start_b = j + 1 - len;
                if len > best.2
                    || (len == best.2 && (start_a, start_b) < (best.0, best.1))
                {
                    best = (start_a, start_b, len);
                }
            }
        }
        previous = current;
    }
    (best.2 > 0).then_some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_detection() {
        assert!(starts_with_flag("🇺🇸 United States"));
        assert!(starts_with_flag("  🇯🇵Japan"));
        assert!(!starts_with_flag("United States 🇺🇸"));
        assert!(!starts_with_flag("🇺 lone indicator"));
    }

    #[test]
    fn test_strip_leading_flag() {
        assert_eq!(strip_leading_flag(" 🇧🇷 Brazil "), "Brazil");
        assert_eq!(strip_leading_flag("  Brazil"), "Brazil");
    }

    #[test]
    fn test_strip_country_noise() {
        assert_eq!(strip_country_noise("Team Canada"), "Canada");
        assert_eq!(strip_country_noise("FIRST Global Team of Ghana"), "Ghana");
        assert_eq!(strip_country_noise("FGC Delegation: Kenya"), "Kenya");
        assert_eq!(strip_country_noise("Mexico Team"), "Mexico");
        assert_eq!(strip_country_noise("Teamland"), "Teamland");
        assert_eq!(strip_country_noise("   "), "");
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Video   Nº ", true), "VIDEO NO");
        assert_eq!(normalize_header("Start\tTime", false), "start time");
    }

    #[test]
    fn test_normalize_video_number() {
        assert_eq!(normalize_video_number("V-007").as_deref(), Some("7"));
        assert_eq!(normalize_video_number("12 of 034").as_deref(), Some("34"));
        assert_eq!(normalize_video_number("000").as_deref(), Some("0"));
        assert_eq!(normalize_video_number("Video 00").as_deref(), Some("0"));
        assert_eq!(normalize_video_number("none"), None);
    }

    #[test]
    fn test_extract_match_number() {
        assert_eq!(extract_match_number("RANKING MATCH #12"), Some(12));
        assert_eq!(extract_match_number("ranking match 7"), Some(7));
        assert_eq!(extract_match_number("RANKING MATCH"), None);
    }

    #[test]
    fn test_extract_host_number() {
        assert_eq!(extract_host_number("Host 02").as_deref(), Some("2"));
        assert_eq!(extract_host_number("H0 / 3").as_deref(), Some("0"));
        assert_eq!(extract_host_number("Anyone"), None);
    }

    #[test]
    fn test_normalize_booth_key() {
        assert_eq!(normalize_booth_key("Mentor: Dr. Lee!"), "MENTOR DR LEE");
        assert_eq!(normalize_booth_key("  "), "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("Überlänge", 4), "Über");
        assert_eq!(truncate_chars("ok", 10), "ok");
    }

    #[test]
    fn test_similarity() {
        assert!((similarity("abcd", "abcd") - 1.0).abs() < f64::EPSILON);
        assert!(similarity("abcd", "wxyz").abs() < f64::EPSILON);
        // "abcd" vs "bcde": block "bcd" -> 2*3/8
        assert!((similarity("abcd", "bcde") - 0.75).abs() < 1e-9);
        assert!((similarity("", "") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_similarity_recurses_around_block() {
        // "MENTOR LEE" vs "MENTOR DR LEE": "MENTOR " then "LEE" -> 10 of 23
        let score = similarity("MENTOR LEE", "MENTOR DR LEE");
        assert!((score - 20.0 / 23.0).abs() < 1e-9);
    }
}
