//! Inventory class names consumed by the sync daemons.
//!
//! The platform schema is open-ended; these are the classes the discovery
//! classifier targets plus the predicates the reconcilers bucket by.

/// Chassis slot.
pub const SLOT: &str = "Slot";
/// Generic line card.
pub const IP_BOARD: &str = "IPBoard";
/// Combined switching/routing card.
pub const HYBRID_BOARD: &str = "HybridBoard";
/// Pluggable transceiver (SFP/XFP/CPAK).
pub const TRANSCEIVER: &str = "Transceiver";
/// Power supply connector.
pub const POWER_PORT: &str = "PowerPort";
/// Copper port.
pub const ELECTRICAL_PORT: &str = "ElectricalPort";
/// Fiber port.
pub const OPTICAL_PORT: &str = "OpticalPort";
/// USB console/storage port.
pub const USB_PORT: &str = "USBPort";
/// Serial (POS) port.
pub const SERIAL_PORT: &str = "SerialPort";
/// Supervisor/switch processor module.
pub const SWITCH_PROCESSOR: &str = "SwitchProcessor";
/// Link-aggregation interface.
pub const PORT_CHANNEL: &str = "PortChannel";
/// VLAN sub-interface, loopback or other virtual endpoint.
pub const VIRTUAL_PORT: &str = "VirtualPort";
/// MPLS tunnel endpoint.
pub const MPLS_TUNNEL: &str = "MPLSTunnel";
/// EVC service instance hanging off a physical interface.
pub const SERVICE_INSTANCE: &str = "ServiceInstance";

/// Catalog (list-type) classes.
pub const EQUIPMENT_VENDOR: &str = "EquipmentVendor";
pub const EQUIPMENT_MODEL: &str = "EquipmentModel";

/// Relationship name linking a service to the interfaces it rides on.
pub const REL_USES: &str = "uses";

/// Attribute names shared between discovery and the store.
pub mod attrs {
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const SERIAL_NUMBER: &str = "serialNumber";
    pub const VENDOR: &str = "vendor";
    pub const MODEL: &str = "model";
    pub const FIRMWARE_VERSION: &str = "firmwareVersion";
    pub const HIGH_SPEED: &str = "highSpeed";
    pub const IF_ALIAS: &str = "ifAlias";
}

/// True for concrete physical ports (copper, fiber, USB, serial).
///
/// Power connectors and the logical port classes are excluded: they are never
/// matched by interface-table rows.
pub fn is_physical_port(class: &str) -> bool {
    class.contains("Port")
        && !class.contains("Power")
        && !class.contains("Virtual")
        && !class.contains("Channel")
}

/// True for virtual endpoints: virtual ports and link aggregates.
pub fn is_virtual_interface(class: &str) -> bool {
    class == VIRTUAL_PORT || class.contains("Channel")
}

/// True for any non-physical interface class.
pub fn is_logical_interface(class: &str) -> bool {
    is_virtual_interface(class) || class == MPLS_TUNNEL || class == SERVICE_INSTANCE
}

/// True for nodes the snapshot reader diverts out of physical branches.
pub fn is_interface(class: &str) -> bool {
    is_physical_port(class) || is_logical_interface(class)
}
