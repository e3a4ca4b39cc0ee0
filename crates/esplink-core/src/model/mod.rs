// ── Domain model ──
//
// Canonical types the store, reconciler and edit sessions work on.
// Wire types from `esplink_api` are converted into these in `convert`.

pub mod catalog;
pub mod device;
pub mod sensor;

pub use catalog::CatalogEntry;
pub use device::Device;
pub use sensor::{EntityKind, Sensor};
