//! BLE advertisement field helpers
//!
//! Platform APIs report addresses and service UUIDs as raw integers; the rest
//! of the application works with their canonical text forms.

/// Advertisement flag bits (Core Specification Supplement, Part A, 1.3)
pub mod flags {
    pub const LE_LIMITED_DISCOVERABLE: u8 = 0x01;
    pub const LE_GENERAL_DISCOVERABLE: u8 = 0x02;
    pub const BR_EDR_NOT_SUPPORTED: u8 = 0x04;
    pub const SIMULTANEOUS_CONTROLLER: u8 = 0x08;
    pub const SIMULTANEOUS_HOST: u8 = 0x10;
}

const FLAG_NAMES: &[(u8, &str)] = &[
    (flags::LE_LIMITED_DISCOVERABLE, "Limited Discoverable"),
    (flags::LE_GENERAL_DISCOVERABLE, "General Discoverable"),
    (flags::BR_EDR_NOT_SUPPORTED, "BR/EDR Not Supported"),
    (flags::SIMULTANEOUS_CONTROLLER, "LE+BR/EDR Controller"),
    (flags::SIMULTANEOUS_HOST, "LE+BR/EDR Host"),
];

/// Format a 48-bit Bluetooth address as `AA:BB:CC:DD:EE:FF`
pub fn format_address(address: u64) -> String {
    let bytes = address.to_be_bytes();
    bytes[2..]
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Format GUID parts as a lowercase hyphenated UUID
pub fn format_uuid(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> String {
    format!(
        "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        data1,
        data2,
        data3,
        data4[0],
        data4[1],
        data4[2],
        data4[3],
        data4[4],
        data4[5],
        data4[6],
        data4[7]
    )
}

/// Names of the flag bits set in an advertisement's flags field
pub fn flag_names(value: u8) -> Vec<&'static str> {
    FLAG_NAMES
        .iter()
        .filter(|(bit, _)| value & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}
