//! Common utilities shared by the candle services

pub mod config;
pub mod constants;
pub mod errors;

pub use config::*;
pub use constants::*;
pub use errors::*;
