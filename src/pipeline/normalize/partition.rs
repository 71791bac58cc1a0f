use crate::constants::UNKNOWN_BUCKET;

/// Decade directory for a derived year string, e.g. `1987` -> `1980-1989`.
///
/// Floor division, so the `0000` sentinel lands in `0-9` and negative years
/// round toward the earlier decade.
pub fn decade_bucket(year: &str) -> String {
    match year.trim().parse::<i64>() {
        Ok(year) => {
            let start = year.div_euclid(10) * 10;
            format!("{}-{}", start, start + 9)
        }
        Err(_) => UNKNOWN_BUCKET.to_string(),
    }
}
