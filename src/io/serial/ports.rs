// src/io/serial/ports.rs
//
// Serial port enumeration.
// Combines the OS serial registry with an existence probe of well-known
// USB-serial names, filters Bluetooth ports, and sorts the result.

use std::collections::BTreeSet;
use std::path::Path;

use crate::io::types::PortIdentifier;
use crate::settings::ManagerSettings;

/// Result of a port scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortScan {
    /// Sorted, de-duplicated identifiers
    pub ports: Vec<PortIdentifier>,
    /// True when nothing was found and `ports` is the demo placeholder list
    pub placeholder: bool,
}

/// One entry reported by the OS registry.
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    /// Full device path, e.g. `/dev/cu.usbserial-0001`
    pub path: String,
    /// The registry itself typed this entry as a Bluetooth port
    pub bluetooth: bool,
}

/// Source of candidate devices. Split out so the filtering rules can be tested without hardware.
pub trait PortRegistry {
    fn registry_entries(&self) -> Result<Vec<RegistryEntry>, String>;
    fn device_exists(&self, path: &Path) -> bool;
}

/// The live system: `serialport` registry plus the filesystem.
pub struct SystemRegistry;

impl PortRegistry for SystemRegistry {
    fn registry_entries(&self) -> Result<Vec<RegistryEntry>, String> {
        let ports = serialport::available_ports()
            .map_err(|e| format!("Failed to enumerate ports: {}", e))?;

        Ok(ports
            .into_iter()
            .map(|p| RegistryEntry {
                bluetooth: matches!(p.port_type, serialport::SerialPortType::BluetoothPort),
                path: p.port_name,
            })
            .collect())
    }

    fn device_exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Case-insensitive "bluetooth" match on the port name.
pub fn is_bluetooth_port(name: &str) -> bool {
    name.to_lowercase().contains("bluetooth")
}

/// Trailing path component of a registry path.
fn leaf_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Enumerate ports with the given registry. Never fails.
pub fn scan_ports_with(registry: &dyn PortRegistry, settings: &ManagerSettings) -> PortScan {
    let mut found: BTreeSet<String> = BTreeSet::new();

    match registry.registry_entries() {
        Ok(entries) => {
            for entry in entries {
                let name = leaf_name(&entry.path);
                if name.is_empty() || entry.bluetooth || is_bluetooth_port(name) {
                    continue;
                }
                found.insert(name.to_string());
            }
        }
        Err(e) => {
            tlog!("[ports] Registry unavailable, probing known names only: {}", e);
        }
    }

    let device_dir = Path::new(&settings.device_dir);
    for name in &settings.probe_ports {
        if is_bluetooth_port(name) || found.contains(name) {
            continue;
        }
        if registry.device_exists(&device_dir.join(name)) {
            found.insert(name.clone());
        }
    }

    if found.is_empty() && settings.use_placeholder_ports {
        let ports: BTreeSet<String> = settings.placeholder_ports.iter().cloned().collect();
        tlog!(
            "[ports] No serial ports found, offering {} placeholder port(s)",
            ports.len()
        );
        return PortScan {
            ports: ports.into_iter().map(PortIdentifier::from).collect(),
            placeholder: true,
        };
    }

    PortScan {
        ports: found.into_iter().map(PortIdentifier::from).collect(),
        placeholder: false,
    }
}

/// Enumerate ports on this system.
pub fn scan_ports(settings: &ManagerSettings) -> PortScan {
    scan_ports_with(&SystemRegistry, settings)
}

/// Enumerate ports on this system, identifiers only.
pub fn list_ports(settings: &ManagerSettings) -> Vec<PortIdentifier> {
    scan_ports(settings).ports
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    struct FakeRegistry {
        entries: Result<Vec<RegistryEntry>, String>,
        on_disk: HashSet<PathBuf>,
    }

    impl FakeRegistry {
        fn new(paths: &[&str], on_disk: &[&str]) -> Self {
            Self {
                entries: Ok(paths
                    .iter()
                    .map(|p| RegistryEntry {
                        path: p.to_string(),
                        bluetooth: false,
                    })
                    .collect()),
                on_disk: on_disk.iter().map(PathBuf::from).collect(),
            }
        }
    }

    impl PortRegistry for FakeRegistry {
        fn registry_entries(&self) -> Result<Vec<RegistryEntry>, String> {
            self.entries.clone()
        }

        fn device_exists(&self, path: &Path) -> bool {
            self.on_disk.contains(path)
        }
    }

    fn names(scan: &PortScan) -> Vec<&str> {
        scan.ports.iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn test_bluetooth_filtered_any_case() {
        let registry = FakeRegistry::new(
            &[
                "/dev/cu.Bluetooth-Incoming-Port",
                "/dev/cu.usbserial-0001",
                "/dev/cu.BLUETOOTH-modem",
                "/dev/tty.bluetooth",
            ],
            &[],
        );
        let scan = scan_ports_with(&registry, &ManagerSettings::default());
        assert_eq!(names(&scan), vec!["cu.usbserial-0001"]);
        assert!(!scan.placeholder);
    }

    #[test]
    fn test_registry_bluetooth_type_filtered() {
        let registry = FakeRegistry {
            entries: Ok(vec![
                RegistryEntry {
                    path: "/dev/rfcomm0".to_string(),
                    bluetooth: true,
                },
                RegistryEntry {
                    path: "/dev/ttyUSB0".to_string(),
                    bluetooth: false,
                },
            ]),
            on_disk: HashSet::new(),
        };
        let scan = scan_ports_with(&registry, &ManagerSettings::default());
        assert_eq!(names(&scan), vec!["ttyUSB0"]);
    }

    #[test]
    fn test_known_names_added_without_duplicates() {
        let registry = FakeRegistry::new(
            &["/dev/cu.usbserial-0001"],
            &["/dev/cu.usbserial-0001", "/dev/cu.SLAB_USBtoUART"],
        );
        let scan = scan_ports_with(&registry, &ManagerSettings::default());
        assert_eq!(names(&scan), vec!["cu.SLAB_USBtoUART", "cu.usbserial-0001"]);
    }

    #[test]
    fn test_results_sorted_and_stable() {
        let registry = FakeRegistry::new(&["/dev/ttyUSB1", "/dev/ttyACM0", "/dev/ttyUSB0"], &[]);
        let settings = ManagerSettings::default();
        let first = scan_ports_with(&registry, &settings);
        let second = scan_ports_with(&registry, &settings);
        assert_eq!(names(&first), vec!["ttyACM0", "ttyUSB0", "ttyUSB1"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_registry_failure_falls_back_to_known_names() {
        let registry = FakeRegistry {
            entries: Err("registry offline".to_string()),
            on_disk: [PathBuf::from("/dev/cu.usbmodem14201")].into_iter().collect(),
        };
        let scan = scan_ports_with(&registry, &ManagerSettings::default());
        assert_eq!(names(&scan), vec!["cu.usbmodem14201"]);
        assert!(!scan.placeholder);
    }

    #[test]
    fn test_empty_scan_returns_placeholders() {
        let registry = FakeRegistry::new(&[], &[]);
        let scan = scan_ports_with(&registry, &ManagerSettings::default());
        assert!(scan.placeholder);
        assert_eq!(names(&scan), vec!["cu.usbmodem14101", "cu.usbserial-0001"]);
    }

    #[test]
    fn test_empty_scan_stays_empty_when_placeholders_disabled() {
        let registry = FakeRegistry::new(&["/dev/cu.Bluetooth-Incoming-Port"], &[]);
        let settings = ManagerSettings {
            use_placeholder_ports: false,
            ..ManagerSettings::default()
        };
        let scan = scan_ports_with(&registry, &settings);
        assert!(scan.ports.is_empty());
        assert!(!scan.placeholder);
    }

    #[test]
    fn test_known_names_use_device_dir() {
        let registry = FakeRegistry::new(&[], &["/tmp/devs/cu.usbserial-14410"]);
        let settings = ManagerSettings {
            device_dir: "/tmp/devs".to_string(),
            ..ManagerSettings::default()
        };
        let scan = scan_ports_with(&registry, &settings);
        assert_eq!(names(&scan), vec!["cu.usbserial-14410"]);
    }

    #[test]
    fn test_is_bluetooth_port() {
        assert!(is_bluetooth_port("cu.Bluetooth-Incoming-Port"));
        assert!(is_bluetooth_port("BLUETOOTH"));
        assert!(!is_bluetooth_port("cu.usbserial-0001"));
    }
}
