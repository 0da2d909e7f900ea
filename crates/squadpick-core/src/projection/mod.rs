// Player projection: stat normalization, fixture ease and scoring.

pub mod fixtures;
pub mod normalize;
pub mod scoring;
