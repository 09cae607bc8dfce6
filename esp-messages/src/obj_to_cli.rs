// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Messages sent back from the management objects to the CLI.

use crate::device::SpId;
use crate::fault_led::EnclFaultLedReason;
use crate::fup::FupInfoSet;
use crate::fup::FupWorkState;
use crate::fup::ManifestEntry;
use crate::resume_prom::ResumePromData;
use crate::resume_prom::ResumePromOpStatus;
use crate::status::BatteryFault;
use crate::status::CableStatus;
use crate::status::CacheStatus;
use crate::status::DriveLifecycleState;
use crate::status::EnclFaultSymptom;
use crate::status::EnclState;
use crate::status::EnvInterfaceStatus;
use crate::status::LedStatus;
use crate::status::MgmtStatus;
use crate::status::ModuleState;
use crate::status::ModuleSubstate;
use crate::status::PeerBootState;
use crate::status::PortState;
use crate::status::PortSubstate;
use crate::status::SpsCablingStatus;
use crate::status::SpsFaultInfo;
use crate::status::SpsState;
use crate::status::SuitcaseState;
use crate::status::SuitcaseSubstate;
use crate::ObjectError;
use hubpack::SerializedSize;
use serde::Deserialize;
use serde::Serialize;

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
pub enum ObjResponse {
    Error(ObjectError),
    /// Command accepted; no payload to return.
    Ack,

    BoardInfo(BoardInfo),
    PeerBootInfo(PeerBootInfo),
    SuitcaseInfo(SuitcaseInfo),
    BmcInfo(BmcInfo),
    SsdInfo(SsdInfo),
    SpId(SpIdentity),

    LimitsInfo(ModuleLimits),
    ModuleInfo(ModuleInfo),
    ModuleStatus(ModuleStatus),
    IoPortInfo(IoPortInfo),
    MgmtCompInfo(MgmtCompInfo),

    BobCount(u32),
    BobStatus(BatteryStatus),
    BbuManufInfo(BbuManufInfo),
    SpsCount(u32),
    SpsStatus(SpsStatus),
    SpsManufInfo(SpsManufInfo),

    EnclInfo(EnclosureInfo),
    EnclCountOnBus(u32),
    LccInfo(LccInfo),
    ConnectorCount(u32),
    ConnectorInfo(ConnectorInfo),

    FanInfo(FanInfo),

    PsCount(u32),
    PsInfo(PsInfo),

    DriveInfo(DriveInfo),
    DriveSlotCount(u32),

    CacheStatus(CacheStatus),

    ResumePromInfo(ResumePromReadResult),
    WriteResumePromAck(ResumePromOpStatus),
    ResumePromReadInProgress(bool),

    UpgradeInProgress(bool),
    FupInfo(FupInfoSet),
    FupWorkState(FupWorkState),
    FupManifestInfo(ManifestEntry),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct SpIdentity {
    pub sp: SpId,
    pub peer_inserted: bool,
}

/// Board-level status plus the per-platform device counts the traversals
/// need to size their loops.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct BoardInfo {
    pub low_battery: bool,
    pub engine_id_fault: bool,
    pub peer_present: bool,
    pub internal_cable_status: CableStatus,
    /// Chassis-integrated processor enclosure; board devices live at the
    /// xPE pseudo-location when set.
    pub is_xpe: bool,
    pub suitcase_count_per_blade: u32,
    pub bmc_count_per_blade: u32,
    pub cache_card_count: u32,
    pub ssd_count: u32,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct PeerBootInfo {
    pub peer_boot_state: PeerBootState,
    pub is_fault_reg_fail: bool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct SuitcaseInfo {
    pub state: SuitcaseState,
    pub substate: SuitcaseSubstate,
    pub shutdown_warning: bool,
    pub ambient_overtemp_fault: bool,
    pub ambient_overtemp_warning: bool,
    pub env_interface_status: EnvInterfaceStatus,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct BmcInfo {
    pub shutdown_warning: bool,
    pub bist_failure: bool,
    pub env_interface_status: EnvInterfaceStatus,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct SsdInfo {
    pub is_faulted: bool,
    pub remaining_life_percent: u8,
}

/// Discovered hardware limits, used to size module traversal loops.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    SerializedSize,
)]
pub struct ModuleLimits {
    pub num_slic_slots: u32,
    pub num_mezzanine_slots: u32,
    pub num_bem: u32,
    pub num_mgmt_modules: u32,
    pub num_ports: u32,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct ModuleInfo {
    pub inserted: MgmtStatus,
    pub slot_num_on_blade: u32,
    pub env_interface_status: EnvInterfaceStatus,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct ModuleStatus {
    pub state: ModuleState,
    pub substate: ModuleSubstate,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct IoPortInfo {
    pub port_state: PortState,
    pub port_substate: PortSubstate,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct MgmtCompInfo {
    pub inserted: MgmtStatus,
    pub general_fault: MgmtStatus,
    pub env_interface_status: EnvInterfaceStatus,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct BatteryStatus {
    pub inserted: bool,
    pub on_battery: bool,
    pub battery_fault: BatteryFault,
    pub associated_sp: SpId,
    pub slot_num_on_sp_blade: u32,
    pub env_interface_status: EnvInterfaceStatus,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct SpsStatus {
    pub sps_module_inserted: bool,
    pub dual_component_sps: bool,
    pub sps_battery_inserted: bool,
    pub status: SpsState,
    pub cabling_status: SpsCablingStatus,
    pub fault_info: SpsFaultInfo,
    pub env_interface_status: EnvInterfaceStatus,
}

/// Manufacturing identity for one half of an SPS (the module or its
/// battery pack). Fixed-width fields are NUL- or space-padded on the
/// wire; only the module half populates the secondary firmware revision.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct SpsUnitManufInfo {
    pub serial_number: [u8; 16],
    pub part_number: [u8; 16],
    pub part_number_revision: [u8; 3],
    pub vendor: [u8; 16],
    pub model_string: [u8; 16],
    pub firmware_revision: [u8; 8],
    pub secondary_firmware_revision: [u8; 8],
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct SpsManufInfo {
    pub module: SpsUnitManufInfo,
    pub battery: SpsUnitManufInfo,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct BbuManufInfo {
    pub serial_number: [u8; 16],
    pub part_number: [u8; 16],
    pub firmware_rev_major: u8,
    pub firmware_rev_minor: u8,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct EnclosureInfo {
    pub encl_present: bool,
    pub encl_state: EnclState,
    pub encl_fault_symptom: EnclFaultSymptom,
    pub encl_fault_led_reason: EnclFaultLedReason,
    pub encl_fault_led_status: LedStatus,
    pub shutdown_reason: u32,
    pub lcc_count: u32,
    pub fan_count: u32,
    pub ps_count: u32,
    pub drive_slot_count: u32,
    pub drive_midplane_count: u32,
    pub connector_count: u32,
    pub sps_count: u32,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct LccInfo {
    pub inserted: bool,
    pub faulted: bool,
    pub current_firmware_rev: [u8; 16],
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct ConnectorInfo {
    pub inserted: bool,
    pub is_local_fru: bool,
    pub cable_status: CableStatus,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct FanInfo {
    pub inserted: MgmtStatus,
    pub fan_faulted: MgmtStatus,
    pub fan_degraded: MgmtStatus,
    pub is_fault_reg_fail: bool,
    pub multi_fan_module_faulted: MgmtStatus,
    pub resume_prom_supported: bool,
    pub env_interface_status: EnvInterfaceStatus,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct PsInfo {
    pub inserted: bool,
    pub general_fault: MgmtStatus,
    pub ac_fail: MgmtStatus,
    pub internal_fan_fault: MgmtStatus,
    pub is_fault_reg_fail: bool,
    pub env_interface_status: EnvInterfaceStatus,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct DriveInfo {
    pub inserted: bool,
    pub state: DriveLifecycleState,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct ResumePromReadResult {
    pub op_status: ResumePromOpStatus,
    pub data: ResumePromData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;
    use crate::MessageKind;
    use crate::ObjRequest;

    // The largest payloads ride in ObjResponse; keep the overall message
    // bound honest against the serialization buffer.
    #[test]
    fn message_fits_serialization_buffer() {
        assert!(Message::MAX_SIZE <= crate::MAX_SERIALIZED_SIZE);
        let _ = ObjRequest::GetBoardInfo;
    }

    #[test]
    fn error_responses_round_trip() {
        let mut buf = [0; Message::MAX_SIZE];
        let message = Message {
            header: crate::Header {
                version: crate::version::V1,
                message_id: 7,
            },
            kind: MessageKind::ObjResponse(ObjResponse::Error(
                ObjectError::DeviceNotPresent,
            )),
        };
        let n = hubpack::serialize(&mut buf, &message).unwrap();
        let (deserialized, _) =
            hubpack::deserialize::<Message>(&buf[..n]).unwrap();
        assert_eq!(deserialized, message);
    }
}
