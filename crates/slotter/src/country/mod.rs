//! Country identification.
//!
//! Team names in the run-of-show and the match schedule come in many shapes:
//! flag emoji prefixes, "Team ..." decoration, ISO codes, common aliases. All
//! of them resolve to an ISO 3166 alpha-3 code through this module.

mod table;

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::canonical_combining_class;
use unicode_normalization::UnicodeNormalization;

use crate::text::{strip_country_noise, strip_leading_flag};

use table::{ALIASES, COUNTRIES, KEYWORDS};

static PARENTHESISED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*?\)").expect("valid regex"));

/// Lookup tables derived once from the built-in country data.
struct CountryIndex {
    /// alpha-3 → (display name, alpha-2)
    by_code: HashMap<&'static str, (&'static str, &'static str)>,
    alpha2: HashMap<&'static str, &'static str>,
    by_name: HashMap<String, &'static str>,
}

static INDEX: LazyLock<CountryIndex> = LazyLock::new(CountryIndex::build);

impl CountryIndex {
    fn build() -> Self {
        let mut by_code = HashMap::with_capacity(COUNTRIES.len());
        let mut alpha2 = HashMap::with_capacity(COUNTRIES.len());
        let mut by_name = HashMap::new();

        for &(iso3, iso2, name) in COUNTRIES {
            by_code.insert(iso3, (name, iso2));
            if iso2.len() == 2 && iso2.chars().all(|c| c.is_ascii_alphabetic()) {
                alpha2.entry(iso2).or_insert(iso3);
            }

            let mut variants = name_variants(name);
            if let Some((_, aliases)) = ALIASES.iter().find(|(code, _)| *code == iso3) {
                variants.extend(aliases.iter().map(|alias| (*alias).to_string()));
            }
            variants.push(iso3.to_string());
            variants.push(iso2.to_string());

            for variant in variants {
                let normalized = normalize_name(&variant);
                if !normalized.is_empty() {
                    by_name.entry(normalized).or_insert(iso3);
                }
            }
        }

        Self {
            by_code,
            alpha2,
            by_name,
        }
    }
}

/// Spellings of a country name worth registering for lookup.
fn name_variants(name: &str) -> Vec<String> {
    let stripped = name.trim();
    if stripped.is_empty() {
        return Vec::new();
    }
    let mut variants = vec![stripped.to_string(), stripped.replace('’', "'")];

    if stripped.contains('(') && stripped.contains(')') {
        let without = PARENTHESISED_RE.replace_all(stripped, "");
        let without = without.trim();
        if !without.is_empty() {
            variants.push(without.to_string());
        }
    }

    if stripped.contains(',') {
        let parts: Vec<&str> = stripped
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if let [first, second] = parts.as_slice() {
            variants.push(format!("{second} {first}"));
        }
        variants.extend(parts.iter().map(|part| (*part).to_string()));
    }

    if stripped.to_lowercase().contains(" and ") {
        variants.push(stripped.replace(" and ", " & "));
    }

    variants.push(stripped.to_uppercase());
    variants
}

/// Fold a country name to a comparison key: accents removed, lowercase,
/// ASCII letters and digits only.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.nfkd()
        .filter(|c| canonical_combining_class(*c) == 0)
        .map(|c| if c == '’' { '\'' } else { c })
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Resolve an ISO alpha-3 or alpha-2 code to a known alpha-3 code.
#[must_use]
pub fn normalize_code(code: &str) -> Option<&'static str> {
    let candidate = code.trim().to_uppercase();
    if !candidate.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    match candidate.len() {
        3 => INDEX
            .by_code
            .get_key_value(candidate.as_str())
            .map(|(code, _)| *code),
        2 => INDEX.alpha2.get(candidate.as_str()).copied(),
        _ => None,
    }
}

/// The comparison key used for free-text team names.
#[must_use]
pub fn lookup_key(name: &str) -> String {
    normalize_name(&strip_country_noise(&strip_leading_flag(name)))
}

/// Resolve a free-text team name (`"🇨🇦 Team Canada"`, `"Côte d'Ivoire"`,
/// `"UAE"`) to an alpha-3 code.
#[must_use]
pub fn lookup_code(name: &str) -> Option<&'static str> {
    let key = lookup_key(name);
    if key.is_empty() {
        return None;
    }
    if let Some(code) = INDEX.by_name.get(&key) {
        return Some(code);
    }
    KEYWORDS
        .iter()
        .find(|(keyword, _)| key.contains(keyword))
        .map(|(_, code)| *code)
}

/// Look up an already normalized name key without the keyword fallback.
#[must_use]
pub fn code_for_key(key: &str) -> Option<&'static str> {
    INDEX.by_name.get(key).copied()
}

/// Whether `code` is an alpha-3 code in the table.
#[must_use]
pub fn is_known_code(code: &str) -> bool {
    INDEX.by_code.contains_key(code.to_uppercase().as_str())
}

/// The display name for an alpha-3 code.
#[must_use]
pub fn display_name(code: &str) -> Option<&'static str> {
    INDEX
        .by_code
        .get(code.to_uppercase().as_str())
        .map(|(name, _)| *name)
}

/// Extra aliases registered for an alpha-3 code.
#[must_use]
pub fn aliases(code: &str) -> &'static [&'static str] {
    let code = code.to_uppercase();
    ALIASES
        .iter()
        .find(|(iso3, _)| *iso3 == code)
        .map_or(&[], |(_, aliases)| *aliases)
}

/// The flag emoji for an alpha-3 code, or an empty string.
#[must_use]
pub fn flag(code: &str) -> String {
    let Some((_, iso2)) = INDEX.by_code.get(code.to_uppercase().as_str()) else {
        return String::new();
    };
    if iso2.len() != 2 || !iso2.chars().all(|c| c.is_ascii_alphabetic()) {
        return String::new();
    }
    iso2.chars()
        .filter_map(|c| {
            char::from_u32(0x1F1E6 + u32::from(c.to_ascii_uppercase()) - u32::from('A'))
        })
        .collect()
}

/// Render codes for log lines: `"USA (United States of America), XYZ"`.
#[must_use]
pub fn format_codes<S: AsRef<str>>(codes: &[S]) -> String {
    let formatted: Vec<String> = codes
        .iter()
        .filter_map(|code| {
            let code = code.as_ref();
            let normalized =
                normalize_code(code).map_or_else(|| code.trim().to_uppercase(), str::to_string);
            match display_name(&normalized) {
                Some(name) => Some(format!("{normalized} ({name})")),
                None if !normalized.is_empty() => Some(normalized),
                None => None,
            }
        })
        .collect();
    if formatted.is_empty() {
        "(none)".to_string()
    } else {
        formatted.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Côte d’Ivoire"), "cotedivoire");
        assert_eq!(normalize_name("  São Tomé & Príncipe "), "saotomeprincipe");
        assert_eq!(normalize_name("🇺🇸"), "");
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" usa "), Some("USA"));
        assert_eq!(normalize_code("us"), Some("USA"));
        assert_eq!(normalize_code("GB"), Some("GBR"));
        assert_eq!(normalize_code("ZZZ"), None);
        assert_eq!(normalize_code("Canada"), None);
        assert_eq!(normalize_code(""), None);
    }

    #[test]
    fn test_lookup_code_variants() {
        assert_eq!(lookup_code("🇨🇦 Team Canada"), Some("CAN"));
        assert_eq!(lookup_code("FIRST Global Team of Ghana"), Some("GHA"));
        assert_eq!(lookup_code("UAE"), Some("ARE"));
        assert_eq!(lookup_code("Ivory Coast"), Some("CIV"));
        assert_eq!(lookup_code("deu"), Some("DEU"));
        assert_eq!(lookup_code("Atlantis"), None);
        assert_eq!(lookup_code("  "), None);
    }

    #[test]
    fn test_lookup_code_keyword_fallback() {
        assert_eq!(lookup_code("Republic of Moldova Delegation"), Some("MDA"));
        assert_eq!(lookup_code("Hong Kong SAR, China"), Some("HKG"));
    }

    #[test]
    fn test_display_name_and_flag() {
        assert_eq!(display_name("jpn"), Some("Japan"));
        assert_eq!(display_name("XYZ"), None);
        assert_eq!(flag("JPN"), "🇯🇵");
        assert_eq!(flag("XYZ"), "");
        assert!(is_known_code("bra"));
    }

    #[test]
    fn test_format_codes() {
        assert_eq!(format_codes::<&str>(&[]), "(none)");
        assert_eq!(format_codes(&["jpn", "xyz"]), "JPN (Japan), XYZ");
    }

    #[test]
    fn test_name_variants_comma_and_parentheses() {
        let variants = name_variants("Korea, Republic of");
        assert!(variants.contains(&"Republic of Korea".to_string()));
        assert!(variants.contains(&"Korea".to_string()));

        let variants = name_variants("Bolivia (Plurinational State of)");
        assert!(variants.contains(&"Bolivia".to_string()));
    }
}
