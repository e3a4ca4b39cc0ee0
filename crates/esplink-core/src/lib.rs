//! Reactive data layer between `esplink-api` and the CLI.
//!
//! This crate owns the domain model and the session logic for one panel
//! backend:
//!
//! - **[`Controller`]**: Central facade. [`connect()`](Controller::connect)
//!   loads the device list and object catalog, then spawns the command
//!   processor and (when configured) the push feed with its reconciler.
//!   [`Controller::oneshot()`](Controller::oneshot) runs a single CLI action.
//!
//! - **[`DataStore`]**: Copy-on-write device/sensor store built on
//!   `tokio::sync::watch`. Replaced wholesale by full refreshes and patched
//!   per channel by the reconciler.
//!
//! - **[`CatalogCache`]**: Linkable external objects, swapped atomically.
//!
//! - **[`link`]**: Codec between a sensor's `links` map and editable rows.
//!
//! - **[`DeviceDraft`] / [`LinkEditor`]**: Edit sessions. Changes stay on the
//!   draft until it is saved through the controller.

pub mod catalog;
pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod link;
pub mod model;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use catalog::CatalogCache;
pub use command::{Command, CommandResult};
pub use config::{ControllerConfig, PushConfig};
pub use controller::{ConnectionState, Controller};
pub use error::CoreError;
pub use link::{LinkRow, LinkValue};
pub use model::{CatalogEntry, Device, EntityKind, Sensor};
pub use reconcile::{Reconciled, SensorUpdate};
pub use session::{DeviceDraft, LinkEditor};
pub use store::{DataStore, StateUpdate};
pub use stream::EntityStream;
