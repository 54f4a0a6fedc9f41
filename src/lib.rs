// DPS (Payment Express) connector library
// Covers both DPS integration styles: PXFusion (hosted, SOAP) and PXPost (direct POST)

pub mod config;
pub mod connectors;
pub mod currency;
pub mod errors;
pub mod services;
pub mod status;
pub mod types;

pub(crate) mod utils;

// Re-export the connectors
pub use connectors::{PxFusion, PxPost};
