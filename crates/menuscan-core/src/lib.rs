pub mod app_config;
pub mod clock;
pub mod config;
pub mod error;
pub mod geo;
pub mod place;
pub mod sources;

pub use app_config::{AppConfig, Environment};
pub use clock::{Clock, SystemClock};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use geo::{haversine_m, Coordinate};
pub use place::PlaceRecord;
pub use sources::{
    FetchError, GeoError, GeoSource, KeyValueStore, NearbyFetcher, PermissionState,
    StorageError, TextSearchFetcher,
};
