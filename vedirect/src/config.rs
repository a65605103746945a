// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed configuration surface: the serial settings plus the identity-probe
//! test table a caller assembles before constructing a `Supervisor`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::VedirectError;
use crate::identity::{IdentityProbe, SerialTestDescriptor};
use crate::transport::{is_valid_baud, is_valid_timeout_secs};

/// Wire format for one entry of the `serial_test` table, as loaded from
/// TOML. Validated against `SerialTestDescriptor`'s rules at load time.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerialTestConfig {
    #[serde(rename = "typeTest")]
    pub type_test: String,
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Raw, deserializable shape of a `vedirect` configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VedirectConfigFile {
    pub serial_port: Option<String>,
    pub baud: u32,
    pub timeout: Option<f64>,
    #[serde(default = "default_source_name")]
    pub source_name: String,
    #[serde(default)]
    pub serial_test: BTreeMap<String, SerialTestConfig>,
}

fn default_source_name() -> String {
    "Vedirect".to_string()
}

/// Validated connection configuration: `{port_path, baud, read_timeout,
/// source_name, serial_test}`. Unknown fields are rejected by `serde` at
/// deserialization time; everything else is validated in `from_file`.
#[derive(Debug, Clone)]
pub struct VedirectConfig {
    pub serial_port: Option<String>,
    pub baud: u32,
    pub read_timeout: Option<Duration>,
    pub source_name: String,
    pub serial_test: BTreeMap<String, SerialTestDescriptor>,
}

impl VedirectConfig {
    /// Builds a configuration programmatically, validating baud and
    /// timeout immediately.
    pub fn new(
        serial_port: Option<String>,
        baud: u32,
        read_timeout: Option<Duration>,
        source_name: impl Into<String>,
    ) -> Result<Self, VedirectError> {
        if !is_valid_baud(baud) {
            return Err(VedirectError::SettingInvalid(format!(
                "unsupported baud rate: {baud}"
            )));
        }
        Ok(VedirectConfig {
            serial_port,
            baud,
            read_timeout,
            source_name: source_name.into(),
            serial_test: BTreeMap::new(),
        })
    }

    pub fn with_test(
        mut self,
        name: impl Into<String>,
        descriptor: SerialTestDescriptor,
    ) -> Self {
        self.serial_test.insert(name.into(), descriptor);
        self
    }

    /// Builds and validates a configuration from a TOML document, the way
    /// tab metadata is loaded elsewhere in this crate family.
    pub fn from_toml_str(contents: &str) -> Result<Self, VedirectError> {
        let raw: VedirectConfigFile = toml::from_str(contents)?;
        Self::from_file(raw)
    }

    pub fn from_toml_path(path: impl AsRef<std::path::Path>) -> Result<Self, VedirectError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    fn from_file(raw: VedirectConfigFile) -> Result<Self, VedirectError> {
        if !is_valid_baud(raw.baud) {
            return Err(VedirectError::SettingInvalid(format!(
                "unsupported baud rate: {}",
                raw.baud
            )));
        }

        let read_timeout = match raw.timeout {
            None => None,
            Some(secs) if !is_valid_timeout_secs(secs) => {
                return Err(VedirectError::SettingInvalid(format!(
                    "invalid read timeout: {secs}"
                )))
            }
            Some(secs) => Some(Duration::from_secs_f64(secs)),
        };

        let mut serial_test = BTreeMap::new();
        for (name, descriptor) in raw.serial_test {
            let validated = SerialTestDescriptor::new(
                descriptor.type_test,
                descriptor.key,
                descriptor.value,
            )?;
            serial_test.insert(name, validated);
        }

        Ok(VedirectConfig {
            serial_port: raw.serial_port,
            baud: raw.baud,
            read_timeout,
            source_name: raw.source_name,
            serial_test,
        })
    }

    /// Builds the `IdentityProbe` this configuration describes. Fails if
    /// `serial_test` is empty or any descriptor is malformed.
    pub fn identity_probe(&self) -> Result<IdentityProbe, VedirectError> {
        IdentityProbe::new(self.serial_test.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_well_formed_configuration() {
        let toml = r#"
            serial_port = "/dev/ttyUSB0"
            baud = 19200
            timeout = 1.5
            source_name = "my-device"

            [serial_test.PID_test]
            typeTest = "value"
            key = "PID"
            value = "0x203"
        "#;

        let config = VedirectConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.serial_port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.baud, 19200);
        assert_eq!(config.read_timeout, Some(Duration::from_secs_f64(1.5)));
        assert!(config.identity_probe().is_ok());
    }

    #[test]
    fn rejects_unsupported_baud() {
        let toml = r#"
            baud = 1234
        "#;
        let err = VedirectConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, VedirectError::SettingInvalid(_)));
    }

    #[test]
    fn rejects_test_descriptor_missing_value() {
        let toml = r#"
            baud = 19200

            [serial_test.PID_test]
            typeTest = "value"
            key = "PID"
        "#;
        let err = VedirectConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, VedirectError::SettingInvalid(_)));
    }

    #[test]
    fn missing_serial_test_table_loads_but_has_no_identity_probe() {
        let toml = r#"
            baud = 19200
        "#;
        let config = VedirectConfig::from_toml_str(toml).unwrap();
        assert!(config.identity_probe().is_err());
    }
}
