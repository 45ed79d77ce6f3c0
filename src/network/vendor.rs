//! Hardware vendor names from the IEEE OUI registry

use mac_oui::Oui;
use pnet::util::MacAddr;
use std::sync::OnceLock;

/// Maps a link-layer address to the manufacturer that owns its prefix
pub trait VendorLookup: Send + Sync {
    fn vendor_for(&self, mac: MacAddr) -> Option<String>;
}

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

fn oui_db() -> Option<&'static Oui> {
    OUI_DB
        .get_or_init(|| match Oui::default() {
            Ok(db) => Some(db),
            Err(e) => {
                log::warn!("Failed to load OUI database: {:?}", e);
                None
            }
        })
        .as_ref()
}

/// Lookup backed by the `mac_oui` embedded database, loaded on first use
#[derive(Debug, Clone, Copy, Default)]
pub struct OuiVendorLookup;

impl OuiVendorLookup {
    pub fn new() -> Self {
        Self
    }
}

impl VendorLookup for OuiVendorLookup {
    fn vendor_for(&self, mac: MacAddr) -> Option<String> {
        let db = oui_db()?;
        match db.lookup_by_mac(&mac.to_string()) {
            Ok(Some(entry)) => Some(entry.company_name.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locally_administered_has_no_vendor() {
        let lookup = OuiVendorLookup::new();
        assert_eq!(lookup.vendor_for(MacAddr::new(0x02, 0x00, 0x00, 0x00, 0x00, 0x01)), None);
    }

    #[test]
    fn test_known_prefix() {
        // 00:00:0c is Cisco's original block
        let lookup = OuiVendorLookup::new();

        let cisco = lookup
            .vendor_for(MacAddr::new(0x00, 0x00, 0x0c, 0x12, 0x34, 0x56))
            .expect("Cisco OUI in embedded database");
        assert!(cisco.to_lowercase().contains("cisco"), "{}", cisco);

        let vmware = lookup
            .vendor_for(MacAddr::new(0x00, 0x0c, 0x29, 0xab, 0xcd, 0xef))
            .expect("VMware OUI in embedded database");
        assert!(vmware.to_lowercase().contains("vmware"), "{}", vmware);
    }
}
