// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Predicate used to recognize the right device while searching candidate
//! serial ports.

use std::collections::BTreeMap;

use crate::decoder::Block;
use crate::errors::VedirectError;

/// The only supported kind of test descriptor: assert that a decoded block
/// has `key` mapping exactly to `value`.
const TYPE_TEST_VALUE: &str = "value";

/// One entry of the serial test table: `{type_test, key, value}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialTestDescriptor {
    pub type_test: String,
    pub key: String,
    pub value: String,
}

impl SerialTestDescriptor {
    pub fn new(
        type_test: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, VedirectError> {
        let descriptor = SerialTestDescriptor {
            type_test: type_test.into(),
            key: key.into(),
            value: value.into(),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    fn validate(&self) -> Result<(), VedirectError> {
        if self.type_test.is_empty() {
            return Err(VedirectError::SettingInvalid(
                "serial test descriptor is missing typeTest".to_string(),
            ));
        }
        if self.key.is_empty() {
            return Err(VedirectError::SettingInvalid(
                "serial test descriptor is missing key".to_string(),
            ));
        }
        match self.type_test.as_str() {
            TYPE_TEST_VALUE if self.value.is_empty() => Err(VedirectError::SettingInvalid(
                "serial test descriptor of type 'value' is missing value".to_string(),
            )),
            TYPE_TEST_VALUE => Ok(()),
            other => Err(VedirectError::SettingInvalid(format!(
                "unknown serial test type '{other}'"
            ))),
        }
    }
}

/// A named table of test descriptors, validated as a whole at construction.
#[derive(Debug, Clone, Default)]
pub struct IdentityProbe {
    tests: BTreeMap<String, SerialTestDescriptor>,
}

impl IdentityProbe {
    pub fn new(
        tests: BTreeMap<String, SerialTestDescriptor>,
    ) -> Result<Self, VedirectError> {
        if tests.is_empty() {
            return Err(VedirectError::SettingInvalid(
                "serial test table must contain at least one test".to_string(),
            ));
        }
        for descriptor in tests.values() {
            descriptor.validate()?;
        }
        Ok(IdentityProbe { tests })
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// True iff every `"value"` descriptor matches the given block.
    pub fn matches(&self, block: &Block) -> bool {
        self.tests.values().all(|descriptor| match descriptor.type_test.as_str() {
            TYPE_TEST_VALUE => block.get(&descriptor.key) == Some(&descriptor.value),
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_with(pairs: &[(&str, &str)]) -> Block {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn matches_true_when_every_descriptor_holds() {
        let mut tests = BTreeMap::new();
        tests.insert(
            "PID_test".to_string(),
            SerialTestDescriptor::new("value", "PID", "0x203").unwrap(),
        );
        let probe = IdentityProbe::new(tests).unwrap();

        assert!(probe.matches(&block_with(&[("PID", "0x203"), ("V", "12800")])));
        assert!(!probe.matches(&block_with(&[("PID", "0x204")])));
    }

    #[test]
    fn construction_rejects_unknown_type_test() {
        let err = SerialTestDescriptor::new("regex", "PID", "0x203").unwrap_err();
        assert!(matches!(err, VedirectError::SettingInvalid(_)));
    }

    #[test]
    fn construction_rejects_missing_value_for_value_type() {
        let err = SerialTestDescriptor::new("value", "PID", "").unwrap_err();
        assert!(matches!(err, VedirectError::SettingInvalid(_)));
    }

    #[test]
    fn construction_rejects_empty_test_table() {
        let err = IdentityProbe::new(BTreeMap::new()).unwrap_err();
        assert!(matches!(err, VedirectError::SettingInvalid(_)));
    }
}
