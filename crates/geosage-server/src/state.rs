//! Shared application state.

use std::sync::Arc;

use geosage_core::GeoSageConfig;
use geosage_geocode::{Geocoder, GeocodingResolver};
use geosage_infer::NerProfiles;
use geosage_runtime::LocationPipeline;
use geosage_store::SqliteStore;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: GeoSageConfig,
    pub store: SqliteStore,
    pub profiles: NerProfiles,
    pub geocoder: Arc<dyn Geocoder>,
    pub pipeline: LocationPipeline,
}

impl AppState {
    pub fn new(
        config: GeoSageConfig,
        store: SqliteStore,
        profiles: NerProfiles,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let resolver =
            GeocodingResolver::new(geocoder.clone()).with_retry_delay(config.retry_delay);
        let pipeline =
            LocationPipeline::new(resolver).with_default_max_requests(config.default_max_requests);

        Self {
            config,
            store,
            profiles,
            geocoder,
            pipeline,
        }
    }
}
