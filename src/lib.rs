pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
