//! usb-cmdb agent
//!
//! Host-side pieces of the `usb-cmdb` binary: configuration, host
//! identification and the rusb transport.

pub mod config;
pub mod host;
pub mod usb;
