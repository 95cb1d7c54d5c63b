//! GeoSage Core — error type, configuration, geocoding data model.

pub mod config;
pub mod error;
pub mod types;

pub use config::{DataPaths, GeoSageConfig};
pub use error::{Error, Result};
pub use types::*;
