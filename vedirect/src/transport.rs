// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The opaque byte-oriented serial endpoint the decoder and supervisor read
//! from, plus the validation predicates and port enumeration used during
//! device discovery.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::VedirectError;

/// Baud rates this crate knows how to validate a configuration against.
pub const VALID_BAUDS: [u32; 14] = [
    110, 300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 38400, 57600, 115200, 128000, 256000,
];

pub fn is_valid_baud(baud: u32) -> bool {
    VALID_BAUDS.contains(&baud)
}

/// `read_timeout` is either a non-negative duration or unset (non-blocking).
pub fn is_valid_timeout_secs(secs: f64) -> bool {
    secs.is_finite() && secs >= 0.0
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn virtual_port_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from("/tmp")];
    if let Some(home) = home_dir() {
        dirs.push(home);
    }
    dirs
}

fn is_ascii_digits_1_to_3(s: &str) -> bool {
    !s.is_empty() && s.len() <= 3 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Accepts `/dev/ttyUSB<n>`, `/dev/ttyACM<n>`, `/dev/COM<n>`, `COM<n>` (`n` a
/// 1-3 digit integer), or a file under a recognized virtual-port directory
/// (`/tmp`, the current user's home) whose basename begins with `vmodem`.
pub fn is_valid_port_path(path: &str) -> bool {
    for prefix in ["/dev/ttyUSB", "/dev/ttyACM", "/dev/COM", "COM"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            return is_ascii_digits_1_to_3(rest);
        }
    }

    let candidate = Path::new(path);
    let Some(file_name) = candidate.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(parent) = candidate.parent() else {
        return false;
    };

    file_name.starts_with("vmodem") && virtual_port_dirs().iter().any(|dir| dir == parent)
}

/// Lists OS-native serial ports plus known virtual-port files, in that
/// order, as a per-sweep snapshot (see `Supervisor::reconnect`).
pub fn enumerate_candidates() -> Vec<String> {
    let mut candidates: Vec<String> = serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .unwrap_or_default();

    for dir in virtual_port_dirs() {
        let pattern = format!("{}/vmodem*", dir.display());
        if let Ok(paths) = glob::glob(&pattern) {
            for entry in paths.flatten() {
                if let Some(s) = entry.to_str() {
                    candidates.push(s.to_string());
                }
            }
        }
    }

    candidates
}

/// Capability set required of the serial I/O collaborator; see the
/// VE.Direct spec's transport section for the contract each method must
/// honor.
pub trait Transport {
    fn open(&mut self) -> Result<(), VedirectError>;
    fn close(&mut self);
    fn is_open(&self) -> bool;

    /// Returns one byte, or `None` on a read timeout.
    fn read_one(&mut self) -> Result<Option<u8>, VedirectError>;

    /// Mutates the live read timeout without reopening the port. `None`
    /// means non-blocking: return immediately with whatever is available.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), VedirectError>;

    /// The port path this transport is currently targeting.
    fn port_path(&self) -> &str;

    /// Re-targets this transport at a different path, closing the
    /// currently open port (if any) first.
    fn retarget(&mut self, port_path: &str);

    /// Ordered list of candidate port paths. The default implementation
    /// delegates to the free function of the same name, which covers
    /// OS-native ports plus known virtual-port directories.
    fn enumerate_candidates(&self) -> Vec<String> {
        enumerate_candidates()
    }
}

/// `Transport` backed by a real OS serial device via the `serialport` crate.
pub struct SerialTransport {
    port_path: String,
    baud: u32,
    timeout: Option<Duration>,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialTransport {
    pub fn new(port_path: impl Into<String>, baud: u32, timeout: Option<Duration>) -> Self {
        SerialTransport {
            port_path: port_path.into(),
            baud,
            timeout,
            port: None,
        }
    }

    fn open_timeout(&self) -> Duration {
        // serialport has no non-blocking mode; a zero timeout polls once.
        self.timeout.unwrap_or(Duration::from_millis(0))
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<(), VedirectError> {
        if self.is_open() {
            return Ok(());
        }
        let port = serialport::new(self.port_path.clone(), self.baud)
            .timeout(self.open_timeout())
            .open()
            .map_err(|e| {
                VedirectError::Vedirect(format!("failed to open {}: {e}", self.port_path))
            })?;
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        self.port = None;
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn read_one(&mut self) -> Result<Option<u8>, VedirectError> {
        let Some(port) = self.port.as_mut() else {
            return Err(VedirectError::Vedirect(
                "read_one called on a closed transport".to_string(),
            ));
        };

        let mut buf = [0u8; 1];
        match port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(VedirectError::Vedirect(format!("serial read failed: {e}"))),
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), VedirectError> {
        self.timeout = timeout;
        let open_timeout = self.open_timeout();
        if let Some(port) = self.port.as_mut() {
            port.set_timeout(open_timeout)
                .map_err(|e| VedirectError::Vedirect(e.to_string()))?;
        }
        Ok(())
    }

    fn port_path(&self) -> &str {
        &self.port_path
    }

    fn retarget(&mut self, port_path: &str) {
        self.close();
        self.port_path = port_path.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_documented_port_paths() {
        for path in ["/dev/ttyUSB1", "/dev/ttyACM1", "/dev/COM1", "COM1"] {
            assert!(is_valid_port_path(path), "expected {path} to be valid");
        }
    }

    #[test]
    fn rejects_malformed_port_paths() {
        for path in ["COM1999", "/dev/USB1", "/dev/ACM1", "/dev/1"] {
            assert!(!is_valid_port_path(path), "expected {path} to be rejected");
        }
    }

    #[test]
    fn accepts_virtual_modem_under_tmp() {
        assert!(is_valid_port_path("/tmp/vmodem0"));
        assert!(!is_valid_port_path("/tmp/notaport"));
    }

    #[test]
    fn baud_table_accepts_exactly_the_fourteen_listed_values() {
        for &baud in &VALID_BAUDS {
            assert!(is_valid_baud(baud));
        }
        for baud in [0, 1, 9601, 4_000_000] {
            assert!(!is_valid_baud(baud));
        }
    }

    #[test]
    fn timeout_validation_rejects_negative_and_non_finite() {
        assert!(is_valid_timeout_secs(0.0));
        assert!(is_valid_timeout_secs(2.5));
        assert!(!is_valid_timeout_secs(-0.1));
        assert!(!is_valid_timeout_secs(f64::NAN));
        assert!(!is_valid_timeout_secs(f64::INFINITY));
    }
}
