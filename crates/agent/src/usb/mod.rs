//! USB subsystem
//!
//! Enumerates attached card readers with rusb and exposes each opened
//! device as a [`device::Transport`].

pub mod manager;
pub mod transport;

pub use manager::{DeviceManager, DeviceSummary};
pub use transport::RusbTransport;
