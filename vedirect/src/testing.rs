// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory `Transport` used to drive the supervisor's timeout,
//! disconnect and reconnect paths deterministically in tests.

use std::collections::VecDeque;
use std::time::Duration;

use crate::errors::VedirectError;
use crate::transport::Transport;

/// What a queued `read_one()` call should do.
#[derive(Debug, Clone)]
pub enum ScriptedRead {
    Byte(u8),
    /// A non-blocking timeout: no byte available yet.
    Empty,
    /// The device vanished.
    IoError,
}

/// A `Transport` whose byte stream and failures are scripted ahead of time.
///
/// `open()`/`close()` track `is_open` faithfully so the supervisor's
/// reconnect sweep behaves the same as it would against real hardware.
#[derive(Debug, Default)]
pub struct MockTransport {
    open: bool,
    queue: VecDeque<ScriptedRead>,
    pub opened_paths: Vec<String>,
    fail_open: bool,
    path: String,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            path: "mock".to_string(),
            ..MockTransport::default()
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.queue.extend(bytes.iter().map(|b| ScriptedRead::Byte(*b)));
    }

    pub fn push(&mut self, read: ScriptedRead) {
        self.queue.push_back(read);
    }

    pub fn set_fail_open(&mut self, fail: bool) {
        self.fail_open = fail;
    }
}

impl Transport for MockTransport {
    fn open(&mut self) -> Result<(), VedirectError> {
        if self.fail_open {
            return Err(VedirectError::Vedirect("mock open failure".to_string()));
        }
        self.opened_paths.push(self.path.clone());
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read_one(&mut self) -> Result<Option<u8>, VedirectError> {
        if !self.open {
            return Err(VedirectError::Vedirect("transport not open".to_string()));
        }
        match self.queue.pop_front() {
            None | Some(ScriptedRead::Empty) => Ok(None),
            Some(ScriptedRead::Byte(b)) => Ok(Some(b)),
            Some(ScriptedRead::IoError) => {
                self.open = false;
                Err(VedirectError::Vedirect("mock device vanished".to_string()))
            }
        }
    }

    fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> Result<(), VedirectError> {
        Ok(())
    }

    fn port_path(&self) -> &str {
        &self.path
    }

    fn retarget(&mut self, port_path: &str) {
        self.close();
        self.path = port_path.to_string();
    }
}

/// A named, reusable candidate-port transport for reconnect tests: each
/// path in `ports` gets its own scripted byte queue, selected by
/// `retarget`-style path switching through `PortSwitchingMockTransport`.
#[derive(Debug, Default)]
pub struct PortSwitchingMockTransport {
    pub current_path: Option<String>,
    pub scripts: std::collections::BTreeMap<String, VecDeque<ScriptedRead>>,
    open: bool,
}

impl PortSwitchingMockTransport {
    pub fn new() -> Self {
        PortSwitchingMockTransport::default()
    }

    pub fn with_script(mut self, path: impl Into<String>, bytes: &[u8]) -> Self {
        self.scripts.insert(
            path.into(),
            bytes.iter().map(|b| ScriptedRead::Byte(*b)).collect(),
        );
        self
    }

    /// Candidate ports are returned in the order the scripts were inserted.
    pub fn candidate_list(&self) -> Vec<String> {
        self.scripts.keys().cloned().collect()
    }
}

impl Transport for PortSwitchingMockTransport {
    fn open(&mut self) -> Result<(), VedirectError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read_one(&mut self) -> Result<Option<u8>, VedirectError> {
        if !self.open {
            return Err(VedirectError::Vedirect("transport not open".to_string()));
        }
        let Some(path) = self.current_path.as_ref() else {
            return Ok(None);
        };
        match self.scripts.get_mut(path).and_then(|q| q.pop_front()) {
            None | Some(ScriptedRead::Empty) => Ok(None),
            Some(ScriptedRead::Byte(b)) => Ok(Some(b)),
            Some(ScriptedRead::IoError) => {
                self.open = false;
                Err(VedirectError::Vedirect("mock device vanished".to_string()))
            }
        }
    }

    fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> Result<(), VedirectError> {
        Ok(())
    }

    fn port_path(&self) -> &str {
        self.current_path.as_deref().unwrap_or("")
    }

    fn retarget(&mut self, port_path: &str) {
        self.close();
        self.current_path = Some(port_path.to_string());
    }

    fn enumerate_candidates(&self) -> Vec<String> {
        self.candidate_list()
    }
}
