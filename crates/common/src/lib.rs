//! Common utilities for usb-cmdb
//!
//! This crate holds the device-independent half of the tool: the audited
//! [`DeviceRecord`], the field tables that drive reports and comparison,
//! snapshot persistence and auditing, error types, and logging setup.

pub mod audit;
pub mod error;
pub mod logging;
pub mod record;
pub mod report;
pub mod schema;
pub mod test_utils;

pub use audit::{SnapshotSource, compare, compare_flat, restore_snapshot, save_snapshot};
pub use error::{Error, Result, SchemaMismatch};
pub use logging::setup_logging;
pub use record::{ChangeEntry, DeviceRecord, OBJECT_TYPE_GENERIC, OBJECT_TYPE_MAGTEK};
pub use report::{
    ReportFormat, render, to_csv, to_json, to_legacy, to_nvp, to_pretty_json, to_pretty_xml,
    to_xml,
};
pub use schema::{Field, FlatField, Policy, Schema, View, flatten};
