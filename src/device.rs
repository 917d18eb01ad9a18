//! Device identity and the three messages this beacon emits

use uuid::Uuid;

use crate::message::{Message, MessageKind};

/// Presence timeout advertised in `alive`; receivers expire the device after it
pub const DEFAULT_ALIVE_TIMEOUT_SECS: u32 = 600;

/// Placeholder `info` when no local address is known
pub const UNKNOWN_INFO: &str = "unknown";

/// Who this device is on the bus
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceIdentity {
    pub address: Uuid,
    pub device_type: String,
    pub vendor_id: String,
    pub product_id: String,
    pub alive_timeout_secs: u32,
}

impl DeviceIdentity {
    fn message(&self, kind: MessageKind, action: &str) -> Message {
        Message::new(self.address, self.device_type.clone(), kind, action)
    }

    /// `alive` notification
    pub fn alive(&self) -> Message {
        self.message(MessageKind::Notify, "alive").with("timeout", self.alive_timeout_secs)
    }

    /// `get_description` reply, `info` carries the local address
    pub fn description(&self, info: Option<&str>) -> Message {
        self.message(MessageKind::Reply, "get_description")
            .with("vendor_id", self.vendor_id.as_str())
            .with("product_id", self.product_id.as_str())
            .with("info", info.unwrap_or(UNKNOWN_INFO))
    }

    /// `attributes_change` notification with the current weight
    pub fn attributes_change(&self, weight: f64) -> Message {
        self.message(MessageKind::Notify, "attributes_change").with("Weight", weight)
    }
}
