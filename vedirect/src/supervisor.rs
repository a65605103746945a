// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owns a `Transport` and a `Decoder`, enforces read timeouts, and recovers
//! from transport failure by sweeping candidate ports against an
//! `IdentityProbe`.

use std::time::{Duration, Instant};

use crate::config::VedirectConfig;
use crate::decoder::{Block, Decoder};
use crate::errors::VedirectError;
use crate::identity::IdentityProbe;
use crate::transport::{is_valid_port_path, SerialTransport, Transport};

const EMPTY_READ_BACKOFF: Duration = Duration::from_millis(100);
const RECONNECT_SWEEP_BACKOFF: Duration = Duration::from_millis(2500);
const CANDIDATE_SETTLE_DELAY: Duration = Duration::from_millis(500);
const CANDIDATE_FRAME_TIMEOUT: Duration = Duration::from_secs(1);

/// Supervisor lifecycle, mirroring the state table in the protocol spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Disconnected,
    Connected,
    Reconnecting,
    Failed,
}

/// Composes a `Transport` and a `Decoder` behind the three read operations
/// callers actually need, plus the `reconnect` recovery primitive.
pub struct Supervisor<T: Transport> {
    transport: T,
    decoder: Decoder,
    probe: Option<IdentityProbe>,
    configured_read_timeout: Option<Duration>,
    state: SupervisorState,
}

impl<T: Transport> Supervisor<T> {
    pub fn new(transport: T, probe: Option<IdentityProbe>, configured_read_timeout: Option<Duration>) -> Self {
        Supervisor {
            transport,
            decoder: Decoder::new(),
            probe,
            configured_read_timeout,
            state: SupervisorState::Disconnected,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn open(&mut self) -> Result<(), VedirectError> {
        self.transport.open()?;
        self.state = SupervisorState::Connected;
        Ok(())
    }

    pub fn close(&mut self) {
        self.transport.close();
        self.state = SupervisorState::Disconnected;
    }

    fn is_timeout(elapsed: Duration, limit: Duration) -> bool {
        elapsed >= limit
    }

    /// Reads one byte, applying the documented zero-byte quirk: an idle
    /// VE.Direct line occasionally emits a spurious NUL, so a `0x00` is
    /// discarded and one further byte is read in its place.
    fn read_byte(&mut self) -> Result<Option<u8>, VedirectError> {
        match self.transport.read_one()? {
            Some(0x00) => self.transport.read_one(),
            other => Ok(other),
        }
    }

    /// Reads and decodes bytes until one block validates, or `frame_timeout`
    /// elapses. Never invokes port recovery.
    pub fn read_single(&mut self, frame_timeout: Duration) -> Result<Block, VedirectError> {
        let start = Instant::now();
        loop {
            match self.read_byte()? {
                Some(byte) => {
                    if let Some(block) = self.decoder.feed(byte)? {
                        return Ok(block);
                    }
                }
                None => {
                    let elapsed = start.elapsed();
                    if Self::is_timeout(elapsed, frame_timeout) {
                        return Err(VedirectError::Timeout {
                            elapsed,
                            limit: frame_timeout,
                        });
                    }
                    std::thread::sleep(EMPTY_READ_BACKOFF);
                }
            }
        }
    }

    /// Runs `read_single` in a loop, delivering every emitted block to
    /// `on_block`. Recovers from transport failure and decoder faults via
    /// `reconnect`; a per-frame `Timeout` always propagates. Calls
    /// `on_block(None)` exactly once, on a clean `max_blocks` exit.
    pub fn read_callback<F>(
        &mut self,
        mut on_block: F,
        frame_timeout: Duration,
        connection_timeout: Duration,
        max_blocks: Option<usize>,
    ) -> Result<(), VedirectError>
    where
        F: FnMut(Option<Block>),
    {
        if !self.transport.is_open() {
            self.reconnect(connection_timeout)?;
        }

        let mut delivered = 0usize;
        let mut anchor = Instant::now();

        loop {
            let step = match self.read_byte() {
                Ok(Some(byte)) => self.decoder.feed(byte),
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            };

            match step {
                Ok(Some(block)) => {
                    on_block(Some(block));
                    anchor = Instant::now();
                    delivered += 1;
                    if matches!(max_blocks, Some(max) if delivered >= max) {
                        on_block(None);
                        return Ok(());
                    }
                    continue;
                }
                Ok(None) => {
                    let elapsed = anchor.elapsed();
                    if Self::is_timeout(elapsed, frame_timeout) {
                        return Err(VedirectError::Timeout {
                            elapsed,
                            limit: frame_timeout,
                        });
                    }
                    std::thread::sleep(EMPTY_READ_BACKOFF);
                }
                Err(VedirectError::Timeout { elapsed, limit }) => {
                    return Err(VedirectError::Timeout { elapsed, limit });
                }
                Err(_recoverable) => {
                    self.reconnect(connection_timeout)?;
                    anchor = Instant::now();
                }
            }
        }
    }

    /// Sweeps candidate ports until one emits a block matching the
    /// configured identity probe, or `overall_timeout` elapses. Each sweep
    /// re-reads the candidate list once and keeps that snapshot for the
    /// whole sweep (see the spec's open question on this).
    pub fn reconnect(&mut self, overall_timeout: Duration) -> Result<(), VedirectError> {
        let Some(probe) = self.probe.clone() else {
            return Err(VedirectError::Vedirect(
                "reconnect requested without identity-probe tests configured".to_string(),
            ));
        };

        self.state = SupervisorState::Reconnecting;
        let start = Instant::now();

        loop {
            let candidates = self.transport.enumerate_candidates();
            for candidate in &candidates {
                if !is_valid_port_path(candidate) {
                    continue;
                }

                self.transport.retarget(candidate);
                if self.transport.set_read_timeout(Some(Duration::ZERO)).is_err() {
                    continue;
                }
                if self.transport.open().is_err() {
                    continue;
                }
                std::thread::sleep(CANDIDATE_SETTLE_DELAY);

                let probed = self.read_single(CANDIDATE_FRAME_TIMEOUT);
                match probed {
                    Ok(block) if probe.matches(&block) => {
                        self.transport.set_read_timeout(self.configured_read_timeout)?;
                        self.decoder.reset();
                        self.state = SupervisorState::Connected;
                        log::info!("vedirect: reconnected on {candidate}");
                        return Ok(());
                    }
                    _ => {
                        log::warn!("vedirect: candidate {candidate} did not match identity probe");
                        self.transport.close();
                    }
                }
            }

            let elapsed = start.elapsed();
            if Self::is_timeout(elapsed, overall_timeout) {
                self.transport.close();
                self.state = SupervisorState::Failed;
                log::error!("vedirect: reconnect exhausted deadline after {elapsed:?}");
                return Err(VedirectError::Timeout {
                    elapsed,
                    limit: overall_timeout,
                });
            }
            std::thread::sleep(RECONNECT_SWEEP_BACKOFF);
        }
    }
}

impl Supervisor<SerialTransport> {
    /// Builds a supervisor targeting a real serial device from a validated
    /// configuration. The identity probe is omitted when `serial_test` is
    /// empty, matching the rule that `reconnect` without tests is a hard
    /// `Vedirect` failure rather than a silently-always-matching probe.
    pub fn from_config(config: &VedirectConfig) -> Result<Self, VedirectError> {
        let port_path = config.serial_port.clone().unwrap_or_default();
        let transport = SerialTransport::new(port_path, config.baud, config.read_timeout);
        let probe = if config.serial_test.is_empty() {
            None
        } else {
            Some(config.identity_probe()?)
        };
        Ok(Supervisor::new(transport, probe, config.read_timeout))
    }
}
