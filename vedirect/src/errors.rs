// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Duration;

use thiserror::Error;

/// Error taxonomy surfaced by this crate.
///
/// There are exactly four kinds, matching the protocol's own recovery model:
/// bad configuration is caught at construction, a corrupt frame is dropped
/// silently by the decoder (it never becomes an error), and everything else
/// a caller can retry lands in `Timeout` or `Vedirect`.
#[derive(Debug, Error)]
pub enum VedirectError {
    #[error("invalid setting: {0}")]
    SettingInvalid(String),

    #[error("decoder fault while processing a byte: {0}")]
    InputRead(String),

    #[error("no block delivered within {limit:?} (waited {elapsed:?})")]
    Timeout { elapsed: Duration, limit: Duration },

    #[error("vedirect connection failure: {0}")]
    Vedirect(String),
}

impl From<std::io::Error> for VedirectError {
    fn from(value: std::io::Error) -> Self {
        VedirectError::Vedirect(value.to_string())
    }
}

impl From<serialport::Error> for VedirectError {
    fn from(value: serialport::Error) -> Self {
        VedirectError::Vedirect(value.to_string())
    }
}

impl From<toml::de::Error> for VedirectError {
    fn from(value: toml::de::Error) -> Self {
        VedirectError::SettingInvalid(value.to_string())
    }
}
