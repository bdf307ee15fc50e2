mod classifier;
mod geo;

pub use classifier::{classify_batch, classify_record, zone_hit};
pub use geo::distance_km;
