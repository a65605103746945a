// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decoder and connection manager for the Victron VE.Direct text protocol.
//!
//! The pieces compose as: a [`transport::Transport`] supplies raw bytes, a
//! [`decoder::Decoder`] reassembles them into [`decoder::Block`]s, an
//! [`identity::IdentityProbe`] recognizes the right device among several
//! candidate ports, and [`supervisor::Supervisor`] wires the three together
//! behind the handful of operations a caller needs: `read_single`,
//! `read_callback`, and `reconnect`.

pub mod config;
pub mod decoder;
pub mod errors;
pub mod identity;
pub mod supervisor;
pub mod testing;
pub mod transport;

pub use config::VedirectConfig;
pub use decoder::{Block, Decoder};
pub use errors::VedirectError;
pub use identity::{IdentityProbe, SerialTestDescriptor};
pub use supervisor::{Supervisor, SupervisorState};
pub use transport::{SerialTransport, Transport};
