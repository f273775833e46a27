//! USB device enumeration
//!
//! Finds the attached devices selected by the `[usb]` configuration and
//! opens sessions on them.

use crate::config::UsbSettings;
use crate::usb::transport::RusbTransport;
use anyhow::{Context as _, Result};
use device::{FieldErrors, Session};
use rusb::{Context, Device, UsbContext};
use tracing::{debug, warn};

/// One managed device as seen during enumeration
#[derive(Debug, Clone)]
pub struct DeviceSummary {
    pub bus: u8,
    pub address: u8,
    pub port: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub product: Option<String>,
}

impl std::fmt::Display for DeviceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Bus {:03} Device {:03} Port {:03}: ID {:04x}:{:04x} {}",
            self.bus,
            self.address,
            self.port,
            self.vendor_id,
            self.product_id,
            self.product.as_deref().unwrap_or("")
        )
    }
}

/// Enumerates and opens managed devices
pub struct DeviceManager {
    context: Context,
    settings: UsbSettings,
}

impl DeviceManager {
    pub fn new(settings: UsbSettings) -> Result<Self> {
        let context = Context::new().context("Failed to initialize libusb")?;
        Ok(Self { context, settings })
    }

    /// Devices matching the configured vendor and product IDs
    pub fn devices(&self) -> Result<Vec<Device<Context>>> {
        let devices = self
            .context
            .devices()
            .context("Failed to enumerate USB devices")?;

        let matching: Vec<_> = devices
            .iter()
            .filter(|device| match device.device_descriptor() {
                Ok(desc) => self.settings.matches(desc.vendor_id(), desc.product_id()),
                Err(e) => {
                    debug!(
                        "Skipping {:03}:{:03}, no device descriptor: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    false
                }
            })
            .collect();

        debug!("Enumerated {} matching devices", matching.len());
        Ok(matching)
    }

    /// Describe matching devices without claiming them
    pub fn list(&self) -> Result<Vec<DeviceSummary>> {
        let mut summaries = Vec::new();
        for device in self.devices()? {
            let desc = device
                .device_descriptor()
                .context("Failed to read device descriptor")?;

            // Try to open device temporarily to read the product string
            let product = device.open().ok().and_then(|handle| {
                desc.product_string_index()
                    .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok())
            });

            summaries.push(DeviceSummary {
                bus: device.bus_number(),
                address: device.address(),
                port: device.port_number(),
                vendor_id: desc.vendor_id(),
                product_id: desc.product_id(),
                product,
            });
        }
        Ok(summaries)
    }

    /// Open a session on every matching device
    ///
    /// Devices that cannot be opened are logged and skipped.
    pub fn open_all(&self, host_name: &str) -> Result<Vec<Session<RusbTransport>>> {
        let mut sessions = Vec::new();

        for device in self.devices()? {
            let (bus, address) = (device.bus_number(), device.address());
            let transport = match RusbTransport::open(
                device,
                self.settings.interface,
                self.settings.timeout(),
            ) {
                Ok(transport) => transport,
                Err(e) => {
                    warn!("Failed to open {:03}:{:03}: {}", bus, address, e);
                    continue;
                }
            };

            match Session::open(transport, host_name) {
                Ok((session, errors)) => {
                    report_field_errors(bus, address, &errors);
                    sessions.push(session);
                }
                Err(e) => warn!("Failed to initialize {:03}:{:03}: {}", bus, address, e),
            }
        }

        Ok(sessions)
    }
}

fn report_field_errors(bus: u8, address: u8, errors: &FieldErrors) {
    for (field, cause) in errors.iter() {
        warn!("{:03}:{:03}: could not read {}: {}", bus, address, field, cause);
    }
}
