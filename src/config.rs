//! Bus-device configuration access.
//!
//! A [`BusDevice`] is the opaque per-socket configuration handle produced by
//! the bus enumeration layer. The eject controller reads exactly one field
//! from it: the platform-assigned socket number. The handle carries a kind
//! tag that is validated once at provisioning time, so later use sites can
//! never be handed a device of the wrong underlying kind.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// Property key carrying the platform-assigned socket number.
pub const SOCKET_NUMBER_PROPERTY: &str = "pmu-socket-number";

/// Kind tag for a bus device handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusDeviceKind {
    /// A card bridge hosting removable-card sockets.
    CardBridge,
    /// Any other device on the bus.
    Other,
}

/// Opaque per-socket configuration data from the bus enumeration layer.
pub struct BusDevice {
    kind: BusDeviceKind,
    properties: BTreeMap<String, Vec<u8>>,
}

impl BusDevice {
    /// Creates a bus device handle with no properties.
    pub fn new(kind: BusDeviceKind) -> Self {
        Self {
            kind,
            properties: BTreeMap::new(),
        }
    }

    /// Attaches a raw property blob (builder style).
    pub fn with_property(mut self, key: &str, value: &[u8]) -> Self {
        self.properties.insert(String::from(key), value.to_vec());
        self
    }

    /// Gets the kind tag assigned at construction.
    #[inline]
    pub fn kind(&self) -> BusDeviceKind {
        self.kind
    }

    /// Looks up a raw property blob by key.
    pub fn property(&self, key: &str) -> Option<&[u8]> {
        self.properties.get(key).map(Vec::as_slice)
    }

    /// Reads the platform-assigned socket number.
    ///
    /// The number is stored little-endian in the first four bytes of the
    /// [`SOCKET_NUMBER_PROPERTY`] blob. Returns `None` if the property is
    /// absent or too short to hold a `u32`.
    pub fn socket_number(&self) -> Option<u32> {
        let bytes = self.property(SOCKET_NUMBER_PROPERTY)?;
        let bytes: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }
}

impl core::fmt::Debug for BusDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BusDevice")
            .field("kind", &self.kind)
            .field("properties", &self.properties.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_number_present() {
        let bus = BusDevice::new(BusDeviceKind::CardBridge)
            .with_property(SOCKET_NUMBER_PROPERTY, &3u32.to_le_bytes());
        assert_eq!(bus.socket_number(), Some(3));
    }

    #[test]
    fn test_socket_number_absent() {
        let bus = BusDevice::new(BusDeviceKind::CardBridge);
        assert_eq!(bus.socket_number(), None);
    }

    #[test]
    fn test_socket_number_short_blob() {
        let bus = BusDevice::new(BusDeviceKind::CardBridge)
            .with_property(SOCKET_NUMBER_PROPERTY, &[3, 0]);
        assert_eq!(bus.socket_number(), None);
    }

    #[test]
    fn test_unrelated_property() {
        let bus = BusDevice::new(BusDeviceKind::Other).with_property("vendor-id", &[0xAA, 0xBB]);
        assert_eq!(bus.kind(), BusDeviceKind::Other);
        assert_eq!(bus.property("vendor-id"), Some(&[0xAA, 0xBB][..]));
        assert_eq!(bus.socket_number(), None);
    }
}
