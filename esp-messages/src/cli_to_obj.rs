// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Messages sent from the CLI to the management objects.

use crate::device::ClassId;
use crate::device::DeviceLocation;
use crate::device::DeviceType;
use crate::device::SpId;
use crate::fup::FupForceFlags;
use crate::resume_prom::ResumePromField;
use crate::resume_prom::ResumePromWriteHeader;
use hubpack::SerializedSize;
use serde::Deserialize;
use serde::Serialize;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub enum ObjRequest {
    // board_mgmt
    GetBoardInfo,
    GetPeerBootInfo,
    GetSuitcaseInfo { sp: SpId, slot: u32 },
    GetBmcInfo { sp: SpId, slot: u32 },
    GetSsdInfo { slot: u32 },
    GetSpId,

    // module_mgmt
    GetLimitsInfo,
    GetModuleInfo { device_type: DeviceType, sp: SpId, slot: u32 },
    GetModuleStatus { device_type: DeviceType, sp: SpId, slot: u32 },
    GetIoPortInfo { device_type: DeviceType, sp: SpId, slot: u32, port: u32 },
    GetMgmtCompInfo { sp: SpId, slot: u32 },

    // sps_mgmt
    GetBobCount,
    GetBobStatus { bob_index: u32 },
    GetBbuManufInfo { bob_index: u32 },
    GetSpsCount { location: DeviceLocation },
    GetSpsStatus { location: DeviceLocation },
    GetSpsManufInfo { location: DeviceLocation },
    SpsPowerdown,

    // encl_mgmt
    GetEnclInfo { location: DeviceLocation },
    GetEnclCountOnBus { bus: u32 },
    GetLccInfo { location: DeviceLocation },
    GetConnectorCount { location: DeviceLocation },
    GetConnectorInfo { location: DeviceLocation },

    // cooling_mgmt
    GetFanInfo { location: DeviceLocation },

    // ps_mgmt
    GetPsCount { location: DeviceLocation },
    GetPsInfo { location: DeviceLocation },

    // drive_mgmt
    GetDriveInfo { location: DeviceLocation },
    GetDriveSlotCount { location: DeviceLocation },

    GetCacheStatus { class_responder: CacheStatusResponder },

    // resume prom, addressed to the class owning `device_type`
    GetResumePromInfo {
        device_type: DeviceType,
        location: DeviceLocation,
    },
    /// Trailing data after the message carries the write payload
    /// (empty for checksum writes).
    WriteResumeProm { header: ResumePromWriteHeader },
    InitiateResumePromRead {
        device_type: DeviceType,
        location: DeviceLocation,
    },
    GetAnyResumePromReadInProgress,

    // firmware upgrade
    InitiateUpgrade {
        device_type: DeviceType,
        location: DeviceLocation,
        force_flags: FupForceFlags,
        delay_seconds: u32,
    },
    AbortUpgrade { class_id: ClassId },
    ResumeUpgrade { class_id: ClassId },
    TerminateUpgrade { class_id: ClassId },
    GetAnyUpgradeInProgress,
    GetFupInfo { device_type: DeviceType, location: DeviceLocation },
    GetFupWorkState { device_type: DeviceType, location: DeviceLocation },
    GetFupManifestInfo { device_type: DeviceType, entry_index: u32 },

    // powerdown orchestration
    FlushSystem,
    RebootSp { sp: SpId },
}

/// Which cache-status provider a `GetCacheStatus` request is addressed
/// to. Enumerated separately from [`crate::device::ClassId`] because the
/// board provider doubles as the SSD health source.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub enum CacheStatusResponder {
    Sps,
    Ps,
    Encl,
    Board,
    Cooling,
}

impl ObjRequest {
    /// Resume PROM write requests carry their payload as trailing data.
    pub fn expects_trailing_data(&self) -> bool {
        matches!(
            self,
            ObjRequest::WriteResumeProm {
                header: ResumePromWriteHeader { buffer_size: 1.., .. }
            }
        )
    }
}

/// Fields writable through the CLI's short names.
pub fn resume_prom_field_from_arg(arg: &str) -> Option<ResumePromField> {
    match arg {
        "emc_pn" => Some(ResumePromField::EmcPartNumber),
        "emc_sn" => Some(ResumePromField::EmcSerialNumber),
        "vendor_pn" => Some(ResumePromField::VendorPartNumber),
        "vendor_sn" => Some(ResumePromField::VendorSerialNumber),
        "product_pn" => Some(ResumePromField::ProductPartNumber),
        "product_sn" => Some(ResumePromField::ProductSerialNumber),
        "product_rev" => Some(ResumePromField::ProductRevision),
        "wwn_seed" => Some(ResumePromField::WwnSeed),
        "sas_address" => Some(ResumePromField::SasAddress),
        "system_type" => Some(ResumePromField::SystemType),
        "checksum" => Some(ResumePromField::Checksum),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_payload_writes_expect_trailing_data() {
        let header = ResumePromWriteHeader {
            device_type: DeviceType::Ps,
            location: DeviceLocation::default(),
            field: ResumePromField::EmcSerialNumber,
            offset: 0,
            buffer_size: 16,
        };
        assert!(ObjRequest::WriteResumeProm { header }.expects_trailing_data());

        let checksum = ResumePromWriteHeader {
            field: ResumePromField::Checksum,
            buffer_size: 0,
            ..header
        };
        assert!(!ObjRequest::WriteResumeProm { header: checksum }
            .expects_trailing_data());

        assert!(!ObjRequest::GetBoardInfo.expects_trailing_data());
    }

    #[test]
    fn field_arg_names() {
        assert_eq!(
            resume_prom_field_from_arg("wwn_seed"),
            Some(ResumePromField::WwnSeed)
        );
        assert_eq!(resume_prom_field_from_arg("bogus"), None);
    }
}
