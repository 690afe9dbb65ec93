//! GeoTask - remote geoprocessing task execution
//!
//! This library runs geodata extraction orders against a remote FME-style
//! geoprocessing service: it converts the order perimeter from WKT to a
//! GeoJSON payload, submits it over HTTP, optionally polls an asynchronous
//! job, and streams the produced artifact into the order's output folder.
//!
//! The single entry point is [`executor::TaskExecutor::execute`], which
//! returns an [`request::ExecutionResult`] for every outcome; errors never
//! escape as panics or `Err` values.

pub mod client;
pub mod executor;
pub mod geometry;
pub mod guard;
pub mod messages;
pub mod payload;
pub mod registry;
pub mod request;
pub mod settings;

pub use executor::TaskExecutor;
pub use request::{ExecutionResult, NotificationSettings, Status, TaskRequest};
