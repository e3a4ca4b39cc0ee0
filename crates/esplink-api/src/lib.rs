// esplink-api: Async Rust client for the ESPHome device-panel backend (REST + push feed)

pub mod client;
pub mod devices;
pub mod error;
pub mod models;
pub mod objects;
pub mod push;
pub mod transport;

pub use client::PanelClient;
pub use error::Error;
pub use models::{DeviceRecord, ObjectRecord, SensorRecord};
pub use push::{PushFeed, PushMessage, ReconnectConfig};
pub use transport::TransportConfig;
