pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod observations;
pub mod prepare;
pub mod report;
pub mod run;
pub mod scaler;
pub mod split;
pub mod table;
pub mod target;
pub mod unscale;

pub use error::{PrepError, Result};
