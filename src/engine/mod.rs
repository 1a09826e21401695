pub mod pairwise;
pub mod plan;
pub mod split;
