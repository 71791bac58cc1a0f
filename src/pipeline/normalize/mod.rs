//! Record normalization shared by the importer and the exporter.
//!
//! Everything in here is a pure function of its input: identifiers, dates,
//! lists, numbers and tiers come out the same no matter which stage or
//! serialization they were read from.

pub mod fame_tier;
pub mod fields;
pub mod fpid;
pub mod partition;
pub mod relationships;
pub mod yaml;

pub use fame_tier::fame_tier;
pub use fields::{
    coerce_positive, coerce_sitelinks, format_date, normalize_gender, parse_list, RawDate, RawList,
    RawNumber,
};
pub use fpid::{derive_fpid, derive_year, slug_from_fpid, slugify};
pub use partition::decade_bucket;
pub use relationships::{normalize_relationships, strip_link_markup};
