use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{FPID_PREFIX, SLUG_MAX_LEN, YEAR_SENTINEL};
use crate::types::Fpid;

static NON_SLUG_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug separator pattern is valid"));

/// Fold a display name into an ASCII, URL-safe token. Any script is
/// transliterated first, so "Лев Толстой" gives `lev-tolstoi`.
///
/// Returns an empty string when nothing sluggable remains.
pub fn slugify(name: &str) -> String {
    let lowered = deunicode(name.trim()).to_lowercase();
    let collapsed = NON_SLUG_RUN.replace_all(&lowered, "-");
    let slug = collapsed.trim_matches('-');

    // Only ASCII survives the collapse, so byte slicing is char slicing
    let truncated = if slug.len() > SLUG_MAX_LEN {
        &slug[..SLUG_MAX_LEN]
    } else {
        slug
    };
    truncated.trim_end_matches('-').to_string()
}

/// Year component of an identifier: the truncated integer value, or `0000`.
pub fn derive_year(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return YEAR_SENTINEL.to_string();
    };

    if let Ok(year) = raw.parse::<i64>() {
        return year.to_string();
    }

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value.abs() < i64::MAX as f64 => {
            (value.trunc() as i64).to_string()
        }
        _ => YEAR_SENTINEL.to_string(),
    }
}

/// Derive `FP-<year>-<slug>` from a name and birth year.
///
/// `None` means the record has no usable name and must be skipped.
pub fn derive_fpid(name: Option<&str>, birth_year: Option<&str>) -> Option<Fpid> {
    let name = name.map(str::trim).filter(|n| !n.is_empty())?;

    let slug = slugify(name);
    if slug.is_empty() {
        return None;
    }

    let year = derive_year(birth_year);
    Some(Fpid {
        id: format!("{}-{}-{}", FPID_PREFIX, year, slug),
        year,
        slug,
    })
}

/// The slug portion of an identifier (`FP-1815-ada-lovelace` gives `ada-lovelace`,
/// `FP--750-homer` gives `homer`).
pub fn slug_from_fpid(fpid: &str) -> String {
    let parsed = fpid
        .strip_prefix(FPID_PREFIX)
        .and_then(|rest| rest.strip_prefix('-'))
        .map(|rest| rest.strip_prefix('-').unwrap_or(rest))
        .and_then(|rest| {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                return None;
            }
            rest[digits..].strip_prefix('-')
        })
        .filter(|slug| !slug.is_empty());

    match parsed {
        Some(slug) => slug.to_string(),
        None => fpid.rsplit('-').next().unwrap_or(fpid).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic_names() {
        assert_eq!(slugify("Ada Lovelace"), "ada-lovelace");
        assert_eq!(slugify("  Sinéad O'Connor "), "sinead-o-connor");
        assert_eq!(slugify("Beyoncé Knowles-Carter"), "beyonce-knowles-carter");
        assert_eq!(slugify("Martin Luther King, Jr."), "martin-luther-king-jr");
    }

    #[test]
    fn test_slugify_folds_undecomposable_letters() {
        assert_eq!(slugify("Lech Wałęsa"), "lech-walesa");
        assert_eq!(slugify("Søren Kierkegaard"), "soren-kierkegaard");
        assert_eq!(slugify("Carl Friedrich Gauß"), "carl-friedrich-gauss");
    }

    #[test]
    fn test_slugify_transliterates_other_scripts() {
        assert!(slugify("Лев Толстой").starts_with("lev-tolsto"));
        assert!(slugify("Αριστοτέλης").starts_with("aristot"));
        assert_eq!(slugify("毛泽东"), "mao-ze-dong");
        assert!(!slugify("محمد").is_empty());
    }

    #[test]
    fn test_slugify_punctuation_only_is_empty() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(" -- "), "");
    }

    #[test]
    fn test_derive_fpid_for_non_latin_names() {
        let fpid = derive_fpid(Some("Лев Толстой"), Some("1828")).unwrap();
        assert!(fpid.id.starts_with("FP-1828-lev-tolsto"));
        assert!(derive_fpid(Some("毛泽东"), Some("1893")).is_some());
    }

    #[test]
    fn test_slugify_truncates_to_max_length() {
        let long_name = "a ".repeat(80);
        let slug = slugify(&long_name);
        assert!(slug.len() <= SLUG_MAX_LEN);
        assert!(!slug.ends_with('-'));
        assert!(slug.starts_with("a-a-a"));
    }

    #[test]
    fn test_derive_year_variants() {
        assert_eq!(derive_year(Some("1815")), "1815");
        assert_eq!(derive_year(Some("1815.0")), "1815");
        assert_eq!(derive_year(Some("1815.9")), "1815");
        assert_eq!(derive_year(Some("-44")), "-44");
        assert_eq!(derive_year(Some(" ")), "0000");
        assert_eq!(derive_year(Some("unknown")), "0000");
        assert_eq!(derive_year(Some("nan")), "0000");
        assert_eq!(derive_year(None), "0000");
    }

    #[test]
    fn test_derive_fpid() {
        let fpid = derive_fpid(Some("Ada Lovelace"), Some("1815")).unwrap();
        assert_eq!(fpid.id, "FP-1815-ada-lovelace");
        assert_eq!(fpid.year, "1815");
        assert_eq!(fpid.slug, "ada-lovelace");

        let no_year = derive_fpid(Some("Homer"), None).unwrap();
        assert_eq!(no_year.id, "FP-0000-homer");
    }

    #[test]
    fn test_derive_fpid_skips_unusable_names() {
        assert_eq!(derive_fpid(None, Some("1900")), None);
        assert_eq!(derive_fpid(Some("   "), Some("1900")), None);
        assert_eq!(derive_fpid(Some("???"), Some("1900")), None);
    }

    #[test]
    fn test_slug_from_fpid() {
        assert_eq!(slug_from_fpid("FP-1815-ada-lovelace"), "ada-lovelace");
        assert_eq!(slug_from_fpid("FP-0000-homer"), "homer");
        assert_eq!(slug_from_fpid("FP--750-homer"), "homer");
        assert_eq!(slug_from_fpid("FP--44-julius-caesar"), "julius-caesar");
        assert_eq!(slug_from_fpid("custom-id"), "id");
    }
}
