// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resume PROM wire types: the per-FRU identity record, the operation
//! status space, and the write-request header.

use crate::device::DeviceLocation;
use crate::device::DeviceType;
use hubpack::SerializedSize;
use serde::Deserialize;
use serde::Serialize;
use serde_big_array::BigArray;
use serde_repr::Deserialize_repr;
use serde_repr::Serialize_repr;

/// Maximum programmable-component sub-records carried in one resume PROM.
pub const RESUME_PROM_MAX_PROG_COUNT: usize = 8;

/// Outcome of a resume PROM read or write as reported by the owning
/// management object.
///
/// The discriminants are ordered: `ReadSuccess` is the success marker and
/// every value numerically above it is a failure code. [`Self::is_fault`]
/// compares ordinals, so new variants must keep that threshold intact.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize_repr,
    Deserialize_repr,
    SerializedSize,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ResumePromOpStatus {
    Queued = 0,
    ReadInProgress = 1,
    ReadSuccess = 2,
    DeviceDead = 3,
    ChecksumError = 4,
    DeviceError = 5,
    BufferSmall = 6,
    InvalidField = 7,
    FieldNotWritable = 8,
    UnknownDeviceId = 9,
    SmbusError = 10,
    InsufficientResources = 11,
    DeviceNotPresent = 12,
    DeviceTimeout = 13,
    DeviceNotValidForPlatform = 14,
    ArbError = 15,
    DevicePoweredOff = 16,
}

impl ResumePromOpStatus {
    /// Anything past the success marker is a failure code; `Queued` and
    /// `ReadInProgress` are still-pending, not faults.
    pub fn is_fault(&self) -> bool {
        (*self as u8) > (Self::ReadSuccess as u8)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::ReadInProgress)
    }

    pub fn as_static_str(&self) -> &'static str {
        self.into()
    }
}

/// Addressable fields of the resume PROM. A write targets exactly one
/// field; `Checksum` is the only field written without a payload.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize_repr,
    Deserialize_repr,
    SerializedSize,
)]
#[repr(u8)]
pub enum ResumePromField {
    EmcPartNumber = 0,
    EmcArtworkRevision = 1,
    EmcAssemblyRevision = 2,
    EmcSerialNumber = 3,
    VendorPartNumber = 4,
    VendorArtworkRevision = 5,
    VendorAssemblyRevision = 6,
    VendorSerialNumber = 7,
    VendorName = 8,
    Location = 9,
    ProductPartNumber = 10,
    ProductSerialNumber = 11,
    ProductRevision = 12,
    WwnSeed = 13,
    SasAddress = 14,
    SystemType = 15,
    EmcSubAssemblyPartNumber = 16,
    EmcSubAssemblyArtworkRevision = 17,
    EmcSubAssemblyRevision = 18,
    EmcSubAssemblySerialNumber = 19,
    ProgrammableName = 20,
    ProgrammableRevision = 21,
    Checksum = 22,
}

impl ResumePromField {
    /// Checksum writes recompute on-device and carry no data buffer.
    pub fn requires_payload(&self) -> bool {
        !matches!(self, Self::Checksum)
    }
}

/// One programmable component (CPLD, expander firmware, ...) listed in
/// the resume PROM.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct ResumePromProgrammable {
    pub name: [u8; 8],
    pub revision: [u8; 4],
}

impl Default for ResumePromProgrammable {
    fn default() -> Self {
        Self { name: [0; 8], revision: [0; 4] }
    }
}

/// The fixed-layout identity record held in a FRU's resume PROM. Field
/// widths match the on-EEPROM format exactly; text fields are fixed-width
/// byte arrays, not NUL-terminated strings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct ResumePromData {
    pub emc_part_number: [u8; 16],
    pub emc_artwork_revision: [u8; 3],
    pub emc_assembly_revision: [u8; 3],
    pub emc_serial_number: [u8; 16],
    pub vendor_part_number: [u8; 16],
    pub vendor_artwork_revision: [u8; 3],
    pub vendor_assembly_revision: [u8; 3],
    pub vendor_serial_number: [u8; 16],
    #[serde(with = "BigArray")]
    pub vendor_name: [u8; 32],
    #[serde(with = "BigArray")]
    pub location_of_manufacture: [u8; 32],
    pub year_of_manufacture: [u8; 4],
    pub month_of_manufacture: [u8; 2],
    pub day_of_manufacture: [u8; 2],
    #[serde(with = "BigArray")]
    pub assembly_name: [u8; 32],
    pub num_programmables: u8,
    pub programmables: [ResumePromProgrammable; RESUME_PROM_MAX_PROG_COUNT],
    pub wwn_seed: u32,
    pub sas_address: [u8; 4],
    pub product_part_number: [u8; 16],
    pub product_serial_number: [u8; 16],
    pub product_revision: [u8; 3],
    pub system_type: u8,
    pub checksum: u32,
}

impl Default for ResumePromData {
    fn default() -> Self {
        Self {
            emc_part_number: [0; 16],
            emc_artwork_revision: [0; 3],
            emc_assembly_revision: [0; 3],
            emc_serial_number: [0; 16],
            vendor_part_number: [0; 16],
            vendor_artwork_revision: [0; 3],
            vendor_assembly_revision: [0; 3],
            vendor_serial_number: [0; 16],
            vendor_name: [0; 32],
            location_of_manufacture: [0; 32],
            year_of_manufacture: [0; 4],
            month_of_manufacture: [0; 2],
            day_of_manufacture: [0; 2],
            assembly_name: [0; 32],
            num_programmables: 0,
            programmables: [ResumePromProgrammable::default();
                RESUME_PROM_MAX_PROG_COUNT],
            wwn_seed: 0,
            sas_address: [0; 4],
            product_part_number: [0; 16],
            product_serial_number: [0; 16],
            product_revision: [0; 3],
            system_type: 0,
            checksum: 0,
        }
    }
}

/// Header for a resume PROM write. The data buffer travels as trailing
/// bytes after the serialized message; `buffer_size` is its length and
/// must be zero when `field` carries no payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct ResumePromWriteHeader {
    pub device_type: DeviceType,
    pub location: DeviceLocation,
    pub field: ResumePromField,
    pub offset: u32,
    pub buffer_size: u32,
}
