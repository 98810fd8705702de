//! Locating the dongle among attached serial devices.
//!
//! Candidates are matched on their hardware id, which carries the USB
//! vendor:product pair in the form `USB VID:PID=1A86:7523 ...`.

use serialport::{SerialPortInfo, SerialPortType};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::serial::SerialStream;

/// USB vendor:product identity of the dongle's CH340 bridge.
pub const DEFAULT_IDENTITY: &str = "1A86:7523";

/// One attached serial-capable device.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Candidate {
    /// Endpoint name passed to `open` (e.g. `/dev/ttyUSB0`, `COM3`).
    pub endpoint: String,
    /// Human-readable product description.
    pub description: String,
    /// Hardware id string the identity is matched against.
    pub hardware_id: String,
}

impl Candidate {
    /// Returns true if this candidate's hardware id contains `identity`.
    ///
    /// Matching ignores ASCII case, since drivers differ in how they render
    /// hex digits.
    pub fn matches(&self, identity: &str) -> bool {
        self.hardware_id
            .to_ascii_uppercase()
            .contains(&identity.to_ascii_uppercase())
    }

    fn from_port_info(info: SerialPortInfo) -> Self {
        let (description, hardware_id) = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                let mut hardware_id = format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid);
                if let Some(serial) = &usb.serial_number {
                    hardware_id.push_str(&format!(" SER={serial}"));
                }
                let description = usb
                    .product
                    .or(usb.manufacturer)
                    .unwrap_or_else(|| "USB serial device".to_string());
                (description, hardware_id)
            }
            SerialPortType::PciPort => ("PCI serial device".to_string(), "PCI".to_string()),
            SerialPortType::BluetoothPort => {
                ("Bluetooth serial device".to_string(), "BLUETOOTH".to_string())
            }
            SerialPortType::Unknown => ("n/a".to_string(), "n/a".to_string()),
        };

        Self {
            endpoint: info.port_name,
            description,
            hardware_id,
        }
    }
}

/// Configuration for endpoint discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// vendor:product identity to match. Default: [`DEFAULT_IDENTITY`].
    pub identity: String,
    /// Baud rate used for the open/close probe.
    pub probe_baud: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            identity: DEFAULT_IDENTITY.to_string(),
            probe_baud: SerialStream::DEFAULT_BAUD,
        }
    }
}

/// Enumerate the serial-capable devices currently attached.
pub fn available_candidates() -> Result<Vec<Candidate>> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(Candidate::from_port_info).collect())
}

/// Pick the endpoint to open from `candidates`.
///
/// Candidates are sorted by endpoint name; the first one whose hardware id
/// matches `identity` and whose `probe` succeeds wins. Several matches are not
/// an error.
pub fn select_endpoint<P>(
    mut candidates: Vec<Candidate>,
    identity: &str,
    mut probe: P,
) -> Result<String>
where
    P: FnMut(&str) -> Result<()>,
{
    candidates.sort();

    let mut matched = 0usize;
    for candidate in candidates.iter().filter(|c| c.matches(identity)) {
        matched += 1;
        match probe(&candidate.endpoint) {
            Ok(()) => {
                info!(endpoint = %candidate.endpoint, identity, "found dongle endpoint");
                return Ok(candidate.endpoint.clone());
            }
            Err(err) => {
                debug!(endpoint = %candidate.endpoint, error = %err, "probe failed, skipping");
            }
        }
    }

    Err(TransportError::DiscoveryFailed {
        identity: identity.to_string(),
        matched,
    })
}

/// Enumerate attached devices and return the dongle's endpoint.
pub fn discover(config: &DiscoveryConfig) -> Result<String> {
    let candidates = available_candidates()?;
    debug!(count = candidates.len(), "enumerated serial candidates");
    select_endpoint(candidates, &config.identity, |endpoint| {
        SerialStream::probe(endpoint, config.probe_baud)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(endpoint: &str, hardware_id: &str) -> Candidate {
        Candidate {
            endpoint: endpoint.to_string(),
            description: "test".to_string(),
            hardware_id: hardware_id.to_string(),
        }
    }

    fn refused(endpoint: &str) -> TransportError {
        TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("{endpoint} busy"),
        ))
    }

    #[test]
    fn selects_first_match_in_sorted_order() {
        let candidates = vec![
            candidate("/dev/ttyUSB1", "USB VID:PID=1A86:7523 SER=B"),
            candidate("/dev/ttyS0", "n/a"),
            candidate("/dev/ttyUSB0", "USB VID:PID=1A86:7523 SER=A"),
        ];

        let endpoint = select_endpoint(candidates, DEFAULT_IDENTITY, |_| Ok(())).unwrap();
        assert_eq!(endpoint, "/dev/ttyUSB0");
    }

    #[test]
    fn skips_matches_that_fail_probe() {
        let candidates = vec![
            candidate("/dev/ttyUSB0", "USB VID:PID=1A86:7523"),
            candidate("/dev/ttyUSB1", "USB VID:PID=1A86:7523"),
        ];

        let mut probed = Vec::new();
        let endpoint = select_endpoint(candidates, DEFAULT_IDENTITY, |endpoint| {
            probed.push(endpoint.to_string());
            if endpoint == "/dev/ttyUSB0" {
                Err(refused(endpoint))
            } else {
                Ok(())
            }
        })
        .unwrap();

        assert_eq!(endpoint, "/dev/ttyUSB1");
        assert_eq!(probed, vec!["/dev/ttyUSB0", "/dev/ttyUSB1"]);
    }

    #[test]
    fn no_match_is_discovery_failure() {
        let candidates = vec![candidate("/dev/ttyACM0", "USB VID:PID=2341:0043")];

        let err = select_endpoint(candidates, DEFAULT_IDENTITY, |_| Ok(())).unwrap_err();
        assert!(matches!(
            err,
            TransportError::DiscoveryFailed { matched: 0, .. }
        ));
    }

    #[test]
    fn unopenable_match_is_discovery_failure() {
        let candidates = vec![candidate("/dev/ttyUSB0", "USB VID:PID=1A86:7523")];

        let err = select_endpoint(candidates, DEFAULT_IDENTITY, |e| Err(refused(e))).unwrap_err();
        assert!(matches!(
            err,
            TransportError::DiscoveryFailed { matched: 1, .. }
        ));
    }

    #[test]
    fn identity_match_ignores_case() {
        let c = candidate("COM3", "USB VID:PID=1a86:7523");
        assert!(c.matches("1A86:7523"));
        assert!(!c.matches("0403:6001"));
    }

    #[test]
    fn probe_is_not_called_for_non_matching_candidates() {
        let candidates = vec![candidate("/dev/ttyS0", "PCI"), candidate("/dev/ttyS1", "n/a")];
        let mut calls = 0;
        let _ = select_endpoint(candidates, DEFAULT_IDENTITY, |_| {
            calls += 1;
            Ok(())
        });
        assert_eq!(calls, 0);
    }

    #[test]
    fn default_config_targets_ch340_at_9600() {
        let cfg = DiscoveryConfig::default();
        assert_eq!(cfg.identity, "1A86:7523");
        assert_eq!(cfg.probe_baud, 9600);
    }
}
