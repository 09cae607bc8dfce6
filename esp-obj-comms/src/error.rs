// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use esp_messages::device::DeviceType;
use esp_messages::ObjectError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommunicationError {
    #[error("failed to send control packet: {0}")]
    Send(io::Error),
    #[error("failed to recv control packet: {0}")]
    Recv(io::Error),
    #[error("failed to deserialize response: {0}")]
    Deserialize(esp_messages::HubpackError),
    #[error("RPC call failed (gave up after {0} attempts)")]
    ExhaustedNumAttempts(usize),
    #[error("bogus response type: expected {expected:?} but got {got:?}")]
    BadResponseType { expected: &'static str, got: &'static str },
    #[error("error response from management object: {0}")]
    ObjectError(#[from] ObjectError),
    #[error("protocol version mismatch: object {object}, cli {cli}")]
    VersionMismatch { object: u32, cli: u32 },
    #[error("packet included unexpected trailing data: {0:x?}")]
    UnexpectedTrailingData(Vec<u8>),
    #[error("device type {0} has no owning management class")]
    UnsupportedDeviceType(DeviceType),
    #[error("resume prom write requires a data buffer for this field")]
    MissingWriteBuffer,
    #[error("resume prom write buffer exceeds packet capacity: {0} bytes")]
    WriteBufferTooLarge(usize),
}

impl CommunicationError {
    /// An absent device or sub-component is an expected outcome for
    /// probe-style callers walking the topology; they skip it and keep
    /// going. Anything else aborts the operation in progress.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CommunicationError::ObjectError(
                ObjectError::DeviceNotPresent | ObjectError::ComponentNotFound
            )
        )
    }
}
