//! Device record and change log
//!
//! [`DeviceRecord`] is the audited snapshot of one device: identity fields,
//! topology, vendor-only serial numbers and the change log. Its field table
//! (see [`Schema`]) fixes the order every report and comparison uses.

use crate::schema::{Field, Policy, Schema};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Schema tag of records produced from a plain USB device
pub const OBJECT_TYPE_GENERIC: &str = "usbci::Generic";
/// Schema tag of records produced from a MagTek card reader
pub const OBJECT_TYPE_MAGTEK: &str = "usbci::Magtek";

/// One field-level difference between two snapshots
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub field_name: String,
    pub old_value: String,
    pub new_value: String,
}

impl ChangeEntry {
    pub fn new(
        field_name: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }
}

impl std::fmt::Display for ChangeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {:?} -> {:?}",
            self.field_name, self.old_value, self.new_value
        )
    }
}

/// Snapshot of a device's observable state
///
/// Persisted as a JSON object keyed by the snake_case field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub host_name: String,
    pub vendor_id: String,
    pub product_id: String,
    pub vendor_name: String,
    pub product_name: String,
    /// Configurable serial number
    pub serial_num: String,
    pub software_id: String,
    pub product_ver: String,

    pub bus_number: u8,
    pub bus_address: u8,
    pub port_number: u8,
    /// Discovered vendor command buffer size (0 for generic devices)
    pub buffer_size: usize,
    pub max_pkt_size: u8,
    pub usb_spec: String,
    pub usb_class: String,
    pub usb_subclass: String,
    pub usb_protocol: String,
    pub device_speed: String,
    pub device_ver: String,
    pub object_type: String,

    /// Serial number as stored in device NVRAM
    pub device_sn: String,
    pub factory_sn: String,
    /// Serial number reported by the USB string descriptor. Lags
    /// `device_sn` until the device is reset or power-cycled.
    pub descriptor_sn: String,

    #[serde(default)]
    pub changes: Vec<ChangeEntry>,
}

fn field(name: &'static str, value: fn(&DeviceRecord) -> String) -> Field<DeviceRecord> {
    Field::new(name, value).legacy(Policy::Omit)
}

static DEVICE_RECORD_FIELDS: LazyLock<Vec<Field<DeviceRecord>>> = LazyLock::new(|| {
    vec![
        field("HostName", |r| r.host_name.clone())
            .csv(Policy::Rename("host_name"))
            .legacy(Policy::Keep),
        field("VendorID", |r| r.vendor_id.clone()).csv(Policy::Rename("vendor_id")),
        field("ProductID", |r| r.product_id.clone()).csv(Policy::Rename("product_id")),
        field("VendorName", |r| r.vendor_name.clone()).csv(Policy::Rename("vendor_name")),
        field("ProductName", |r| r.product_name.clone()).csv(Policy::Rename("product_name")),
        field("SerialNum", |r| r.serial_num.clone())
            .csv(Policy::Rename("serial_num"))
            .nvp(Policy::OmitEmpty)
            .legacy(Policy::Keep),
        field("SoftwareID", |r| r.software_id.clone())
            .csv(Policy::Rename("software_id"))
            .nvp(Policy::OmitEmpty),
        field("ProductVer", |r| r.product_ver.clone())
            .csv(Policy::Rename("product_ver"))
            .nvp(Policy::OmitEmpty),
        // bus location changes with the port a device is plugged into
        field("BusNumber", |r| r.bus_number.to_string())
            .report_omit()
            .compare(Policy::Omit),
        field("BusAddress", |r| r.bus_address.to_string())
            .report_omit()
            .compare(Policy::Omit),
        field("PortNumber", |r| r.port_number.to_string())
            .report_omit()
            .compare(Policy::Omit),
        field("BufferSize", |r| r.buffer_size.to_string()).report_omit(),
        field("MaxPktSize", |r| r.max_pkt_size.to_string()).report_omit(),
        field("USBSpec", |r| r.usb_spec.clone()).report_omit(),
        field("USBClass", |r| r.usb_class.clone()).report_omit(),
        field("USBSubclass", |r| r.usb_subclass.clone()).report_omit(),
        field("USBProtocol", |r| r.usb_protocol.clone()).report_omit(),
        field("DeviceSpeed", |r| r.device_speed.clone()).report_omit(),
        field("DeviceVer", |r| r.device_ver.clone()).report_omit(),
        field("ObjectType", |r| r.object_type.clone()).report_omit(),
        // vendor-only serials are tracked through SerialNum
        field("DeviceSN", |r| r.device_sn.clone())
            .report_omit()
            .compare(Policy::Omit),
        field("FactorySN", |r| r.factory_sn.clone())
            .report_omit()
            .compare(Policy::Omit),
        field("DescriptorSN", |r| r.descriptor_sn.clone())
            .report_omit()
            .compare(Policy::Omit),
    ]
});

impl Schema for DeviceRecord {
    fn fields() -> &'static [Field<Self>] {
        DEVICE_RECORD_FIELDS.as_slice()
    }

    fn schema_tag(&self) -> &str {
        &self.object_type
    }
}

impl DeviceRecord {
    /// Unique identifier (the configurable serial number)
    pub fn id(&self) -> &str {
        &self.serial_num
    }

    pub fn vid(&self) -> &str {
        &self.vendor_id
    }

    pub fn pid(&self) -> &str {
        &self.product_id
    }

    pub fn host(&self) -> &str {
        &self.host_name
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// File name stem unique per device on one host
    ///
    /// `BBB-AAA-PPP-vvvv-pppp`: bus, address and port zero-padded to three
    /// digits, then vendor and product IDs.
    pub fn filename(&self) -> String {
        format!(
            "{:03}-{:03}-{:03}-{}-{}",
            self.bus_number, self.bus_address, self.port_number, self.vendor_id, self.product_id
        )
    }

    /// Accumulated change log
    pub fn changes(&self) -> &[ChangeEntry] {
        &self.changes
    }

    /// Replace the change log
    pub fn set_changes(&mut self, changes: Vec<ChangeEntry>) {
        self.changes = changes;
    }

    /// Append one externally observed change without running a comparison
    pub fn add_change(
        &mut self,
        field_name: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) {
        self.changes
            .push(ChangeEntry::new(field_name, old_value, new_value));
    }
}
