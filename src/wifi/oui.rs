// src/wifi/oui.rs
//! Best-effort vendor lookup from the first three octets of a BSSID

pub const UNKNOWN_VENDOR: &str = "Unknown";

/// Small built-in table of common access point and radio vendors
const OUI_TABLE: &[(&str, &str)] = &[
    ("00:03:93", "Apple"),
    ("00:0D:93", "Apple"),
    ("00:1B:63", "Apple"),
    ("F0:18:98", "Apple"),
    ("00:0B:86", "Aruba"),
    ("00:24:6C", "Aruba"),
    ("08:86:3B", "Belkin"),
    ("14:91:82", "Belkin"),
    ("00:90:4C", "Broadcom"),
    ("00:18:0A", "Cisco Meraki"),
    ("00:14:BF", "Linksys"),
    ("00:1D:7E", "Linksys"),
    ("00:21:29", "Linksys"),
    ("00:23:69", "Linksys"),
    ("00:1E:58", "D-Link"),
    ("1C:7E:E5", "D-Link"),
    ("74:DA:38", "Edimax"),
    ("24:0A:C4", "Espressif"),
    ("30:AE:A4", "Espressif"),
    ("84:F3:EB", "Espressif"),
    ("00:1A:11", "Google"),
    ("3C:5A:B4", "Google"),
    ("F4:F5:D8", "Google"),
    ("00:09:5B", "Netgear"),
    ("00:0F:B5", "Netgear"),
    ("00:1F:33", "Netgear"),
    ("00:26:F2", "Netgear"),
    ("A0:40:A0", "Netgear"),
    ("00:17:88", "Philips"),
    ("B8:27:EB", "Raspberry Pi"),
    ("DC:A6:32", "Raspberry Pi"),
    ("E4:5F:01", "Raspberry Pi"),
    ("00:E0:4C", "Realtek"),
    ("14:CC:20", "TP-Link"),
    ("50:C7:BF", "TP-Link"),
    ("C0:4A:00", "TP-Link"),
    ("E8:94:F6", "TP-Link"),
    ("F8:1A:67", "TP-Link"),
    ("00:27:22", "Ubiquiti"),
    ("24:A4:3C", "Ubiquiti"),
    ("80:2A:A8", "Ubiquiti"),
];

/// Resolve a vendor name for a normalized (`AA:BB:CC:...`) BSSID
pub fn lookup_vendor(bssid: &str) -> &'static str {
    let Some(prefix) = bssid.get(..8) else {
        return UNKNOWN_VENDOR;
    };
    OUI_TABLE
        .iter()
        .find(|(oui, _)| oui.eq_ignore_ascii_case(prefix))
        .map(|(_, vendor)| *vendor)
        .unwrap_or(UNKNOWN_VENDOR)
}
