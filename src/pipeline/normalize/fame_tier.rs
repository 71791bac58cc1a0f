use crate::types::FameTier;

/// Classify a sitelink count. Boundaries are inclusive on the lower tier:
/// 100 is A, 50 is A, 20 is B, 19 is C, 0 has no tier.
pub fn fame_tier(sitelinks: u64) -> Option<FameTier> {
    match sitelinks {
        0 => None,
        1..=19 => Some(FameTier::C),
        20..=49 => Some(FameTier::B),
        50..=100 => Some(FameTier::A),
        _ => Some(FameTier::S),
    }
}
