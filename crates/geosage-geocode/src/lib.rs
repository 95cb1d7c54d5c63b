//! GeoSage Geocode — provider clients and the geocoding resolver.
//!
//! The `Geocoder` trait abstracts over the forward-geocoding provider.
//! `OpenCageClient` talks to the OpenCage API; `NoopGeocoder` stands in when
//! no API key is configured. `GeocodingResolver` turns provider answers into
//! cacheable `GeoResult`s and absorbs rate limiting.

pub mod error;
pub mod opencage;
pub mod provider;
pub mod resolver;

pub use error::GeocodeError;
pub use opencage::OpenCageClient;
pub use provider::{Geocoder, NoopGeocoder, ProviderMatch};
pub use resolver::GeocodingResolver;
