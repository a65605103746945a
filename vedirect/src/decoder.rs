// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Byte-driven state machine that reconstructs VE.Direct blocks from an
//! unsynchronized serial stream.

use std::collections::BTreeMap;

use crate::errors::VedirectError;

/// One fully decoded, checksum-validated VE.Direct frame.
pub type Block = BTreeMap<String, String>;

const CR: u8 = 0x0D;
const LF: u8 = 0x0A;
const TAB: u8 = 0x09;
const COLON: u8 = 0x3A;

/// Victron keys and values are a handful of ASCII characters; a field that
/// grows past this is a desynchronized stream, not a legitimate frame.
const MAX_FIELD_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WaitHeader,
    InKey,
    InValue,
    InChecksum,
    Hex,
}

/// Decodes a raw VE.Direct byte stream one byte at a time.
///
/// The decoder never blocks and never grows its buffers past the size of a
/// single key or value: every byte either advances the state machine or
/// terminates a block.
#[derive(Debug)]
pub struct Decoder {
    state: State,
    key_buf: String,
    value_buf: String,
    bytes_sum: u8,
    pending: Block,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Decoder {
            state: State::WaitHeader,
            key_buf: String::new(),
            value_buf: String::new(),
            bytes_sum: 0,
            pending: Block::new(),
        }
    }

    /// Restores the decoder to its freshly-constructed state.
    pub fn reset(&mut self) {
        self.state = State::WaitHeader;
        self.key_buf.clear();
        self.value_buf.clear();
        self.bytes_sum = 0;
        self.pending.clear();
    }

    fn fault(&mut self, reason: &str) -> VedirectError {
        log::error!("vedirect: decoder fault: {reason}");
        self.reset();
        VedirectError::InputRead(reason.to_string())
    }

    /// Feeds one byte into the state machine.
    ///
    /// Returns `Some(block)` only when the byte completed a frame whose
    /// 8-bit checksum validated. A checksum mismatch silently drops the
    /// frame and resumes at `WAIT_HEADER`; this is never reported as an
    /// error (see module docs on `VedirectError::InputRead`).
    pub fn feed(&mut self, byte: u8) -> Result<Option<Block>, VedirectError> {
        if byte == COLON && self.state != State::InChecksum {
            self.state = State::Hex;
            self.bytes_sum = 0;
            return Ok(None);
        }

        match self.state {
            State::Hex => {
                if byte == LF {
                    self.state = State::WaitHeader;
                }
                Ok(None)
            }
            State::WaitHeader => {
                self.bytes_sum = self.bytes_sum.wrapping_add(byte);
                if byte == LF {
                    self.state = State::InKey;
                }
                Ok(None)
            }
            State::InKey => {
                self.bytes_sum = self.bytes_sum.wrapping_add(byte);
                if byte == TAB {
                    self.state = if self.key_buf == "Checksum" {
                        State::InChecksum
                    } else {
                        State::InValue
                    };
                } else if self.key_buf.len() >= MAX_FIELD_LEN {
                    return Err(self.fault("key buffer overflow"));
                } else {
                    self.key_buf.push(byte as char);
                }
                Ok(None)
            }
            State::InValue => {
                self.bytes_sum = self.bytes_sum.wrapping_add(byte);
                if byte == CR {
                    self.pending
                        .insert(std::mem::take(&mut self.key_buf), std::mem::take(&mut self.value_buf));
                    self.state = State::WaitHeader;
                } else if self.value_buf.len() >= MAX_FIELD_LEN {
                    return Err(self.fault("value buffer overflow"));
                } else {
                    self.value_buf.push(byte as char);
                }
                Ok(None)
            }
            State::InChecksum => {
                self.bytes_sum = self.bytes_sum.wrapping_add(byte);
                self.key_buf.clear();
                self.value_buf.clear();
                self.state = State::WaitHeader;

                let valid = self.bytes_sum == 0;
                self.bytes_sum = 0;

                if valid {
                    let block = std::mem::take(&mut self.pending);
                    log::debug!("vedirect: decoded block with {} fields", block.len());
                    Ok(Some(block))
                } else {
                    log::debug!("vedirect: dropping block with invalid checksum");
                    self.pending.clear();
                    Ok(None)
                }
            }
        }
    }
}
