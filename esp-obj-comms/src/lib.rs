// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Async client for the ESP management objects' control port.
//!
//! [`EnvClient`] issues single typed RPCs; the modules on top of it hold
//! the multi-step flows (resume PROM reads/writes and topology
//! traversal, firmware upgrade fan-out, cache status aggregation, and
//! the powerdown sequence).

mod client;
mod control_port;

pub mod cache_status;
pub mod error;
pub mod fup;
pub mod powerdown;
pub mod resume_prom;

pub use client::EnvClient;
pub use control_port::default_object_addr;
pub use control_port::ControlPort;
pub use control_port::PortRetryConfig;
pub use control_port::UdpControlPort;
pub use control_port::OBJ_CONTROL_PORT;
