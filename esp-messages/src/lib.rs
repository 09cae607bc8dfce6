// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire types shared between the ESP CLI process and the kernel-resident
//! environmental management objects (board, power-supply, cooling,
//! SPS/battery, enclosure, module and drive managers).
//!
//! Everything here is a plain-old-data description of a control operation
//! or its reply; the actual hardware state lives behind the objects on the
//! other side of the control-packet transport.

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]

mod cli_to_obj;
mod obj_to_cli;

pub mod device;
pub mod fault_led;
pub mod fault_string;
pub mod fup;
pub mod resume_prom;
pub mod status;

use serde::Deserialize;
use serde::Serialize;
use static_assertions::const_assert;

pub use hubpack::error::Error as HubpackError;
pub use hubpack::{deserialize, serialize, SerializedSize};

// Re-export all public types in our submodules for messages in either
// direction.
pub use cli_to_obj::*;
pub use obj_to_cli::*;

/// Maximum size in bytes for a serialized message.
pub const MAX_SERIALIZED_SIZE: usize = 4096;

pub mod version {
    pub const V1: u32 = 1;
}

#[derive(
    Debug, Clone, Copy, SerializedSize, Serialize, Deserialize, PartialEq, Eq,
)]
pub struct Header {
    /// Protocol version.
    pub version: u32,
    /// Arbitrary message id; responses set this to match their
    /// corresponding request.
    pub message_id: u32,
}

#[derive(
    Debug, Clone, Copy, SerializedSize, Serialize, Deserialize, PartialEq, Eq,
)]
pub struct Message {
    pub header: Header,
    pub kind: MessageKind,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub enum MessageKind {
    ObjRequest(ObjRequest),
    ObjResponse(ObjResponse),
}

/// Failure reported by a management object in place of a response payload.
///
/// `DeviceNotPresent` and `ComponentNotFound` are expected/recoverable
/// outcomes for probe-style callers (a slot may legitimately be empty);
/// everything else is fatal to the operation that triggered it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    SerializedSize,
    strum_macros::IntoStaticStr,
)]
pub enum ObjectError {
    /// The object exists but cannot service requests right now.
    Busy,
    /// The addressed device does not exist on this platform.
    DeviceNotPresent,
    /// The device exists but the addressed sub-component does not.
    ComponentNotFound,
    /// The request was malformed or referenced an unknown operation.
    InvalidRequest,
    /// Catch-all hardware/firmware failure.
    GenericFailure,
}

impl core::fmt::Display for ObjectError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s: &'static str = self.into();
        write!(f, "{s}")
    }
}

#[cfg(any(test, feature = "std"))]
impl std::error::Error for ObjectError {}

/// Minimum guaranteed space for trailing data in a single packet.
///
/// Depending on the [`Message`] payload, there may be more space for
/// trailing data than indicated by this constant; this specifies the
/// minimum amount available regardless of the request type.
pub const MIN_TRAILING_DATA_LEN: usize =
    MAX_SERIALIZED_SIZE - Message::MAX_SIZE;

// A serialized `Message` can be followed by binary data (the staged buffer
// of a resume-PROM write); we want the majority of the packet available for
// that data. Statically check that our serialized message headers haven't
// gotten too large.
const_assert!(MIN_TRAILING_DATA_LEN > 2048);

/// Returns `(serialized_size, data_bytes_written)` where `serialized_size`
/// is the message size written to `out` and `data_bytes_written` is the
/// number of bytes included in `out` from `data_slices`.
///
/// `data_slices` is provided as multiple slices so a staged write buffer
/// and its framing can be appended without an intermediate copy. Bytes are
/// appended from the slices in order.
pub fn serialize_with_trailing_data(
    out: &mut [u8; MAX_SERIALIZED_SIZE],
    message: &Message,
    data_slices: &[&[u8]],
) -> (usize, usize) {
    // We know statically (confirmed by the `const_assert` above) that a
    // serialized `Message` is significantly smaller than
    // `MAX_SERIALIZED_SIZE`. This call cannot fail for any reason other
    // than an undersized buffer, so we can unwrap here.
    let n = hubpack::serialize(out, message).unwrap();
    let mut out = &mut out[n..];

    let mut nwritten = 0;
    for &data in data_slices {
        let to_write = usize::min(out.len(), data.len());
        out[..to_write].copy_from_slice(&data[..to_write]);
        nwritten += to_write;
        out = &mut out[to_write..];
        if out.is_empty() {
            break;
        }
    }

    (n + nwritten, nwritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_data_is_appended_after_message() {
        let mut out = [0; MAX_SERIALIZED_SIZE];
        let message = Message {
            header: Header { version: version::V1, message_id: 7 },
            kind: MessageKind::ObjRequest(ObjRequest::GetBoardInfo),
        };
        let data = vec![0xa5; 100];

        let (out_len, nwritten) =
            serialize_with_trailing_data(&mut out, &message, &[&data]);

        assert_eq!(nwritten, data.len());

        let (deserialized, remainder) =
            deserialize::<Message>(&out[..out_len]).unwrap();
        assert_eq!(message, deserialized);
        assert_eq!(remainder, &data[..]);
    }
}
