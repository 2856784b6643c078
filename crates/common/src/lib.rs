pub mod address;
pub mod error;
pub mod tiers;

pub use address::DeveloperAddress;
pub use error::{Error, Result};
pub use tiers::{ceiling_for_score, FUNDING_FLOOR_SCORE, FUNDING_TIERS, MAX_CREDIT_SCORE};
