// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status and state enums shared between the management objects and the
//! CLI, plus the printed phrases the fault report uses for each.

use core::fmt;
use hubpack::SerializedSize;
use serde_repr::Deserialize_repr;
use serde_repr::Serialize_repr;

/// Tri-state hardware status bit. `Unknown` is distinct from `False`;
/// the power supply fault check treats it as its own fault reason.
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
pub enum MgmtStatus {
    False = 0,
    True = 1,
    Unknown = 2,
    NotApplicable = 3,
}

impl MgmtStatus {
    pub fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }
}

/// Health of the low-level transport a management object uses to talk to
/// its hardware (SMBus, expander, IPMI).
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
pub enum EnvInterfaceStatus {
    Good = 0,
    XactionFail = 1,
    DataStale = 2,
    NaComponent = 3,
}

impl EnvInterfaceStatus {
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::XactionFail | Self::DataStale)
    }

    /// Fault phrase for the fault report; `None` when the interface is
    /// healthy or the component has no environmental interface.
    pub fn phrase(&self) -> Option<&'static str> {
        match self {
            Self::Good | Self::NaComponent => None,
            Self::XactionFail => Some("Env Interface Xaction Fail"),
            Self::DataStale => Some("Env Interface Data Stale"),
        }
    }
}

/// Backend cable seating as seen by an enclosure or base module.
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
pub enum CableStatus {
    Valid = 0,
    Missing = 1,
    Crossed = 2,
    Degraded = 3,
    Unknown = 4,
    NaStatus = 5,
}

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
pub enum LedStatus {
    Off = 0,
    On = 1,
    Marked = 2,
    Unknown = 3,
}

/// Write-cache health ladder. The discriminants encode severity order;
/// [`CacheStatus::severity`] and the aggregation logic depend on it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize_repr,
    Deserialize_repr,
    SerializedSize,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum CacheStatus {
    Ok = 0,
    Degraded = 1,
    ApproachingOverTemp = 2,
    Failed = 3,
    FailedEnvFlt = 4,
    FailedShutdown = 5,
    FailedShutdownEnvFlt = 6,
}

impl CacheStatus {
    pub fn severity(&self) -> u8 {
        *self as u8
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::FailedShutdown | Self::FailedShutdownEnvFlt)
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = self.into();
        write!(f, "{s}")
    }
}

/// Boot progress of the peer storage processor.
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
pub enum PeerBootState {
    Unknown = 0,
    Booting = 1,
    Success = 2,
    Failed = 3,
    Hung = 4,
    PoweredOff = 5,
}

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
pub enum SpsState {
    Unknown = 0,
    Available = 1,
    Charging = 2,
    OnBattery = 3,
    Testing = 4,
    Faulted = 5,
    NotPresent = 6,
}

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
pub enum SpsCablingStatus {
    Unknown = 0,
    Valid = 1,
    PowerCableInvalid = 2,
    SerialCableInvalid = 3,
    MultipleCablesInvalid = 4,
}

impl SpsCablingStatus {
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            Self::PowerCableInvalid
                | Self::SerialCableInvalid
                | Self::MultipleCablesInvalid
        )
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Valid => "VALID",
            Self::PowerCableInvalid => "INVALID_POWER",
            Self::SerialCableInvalid => "INVALID_SERIAL",
            Self::MultipleCablesInvalid => "INVALID_MULTI",
        }
    }
}

/// Per-part fault bits reported by an SPS.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    SerializedSize,
)]
pub struct SpsFaultInfo {
    pub sps_module_fault: bool,
    pub sps_battery_fault: bool,
    pub sps_charger_failure: bool,
    pub sps_internal_fault: bool,
    pub sps_battery_not_engaged: bool,
    pub sps_battery_eol: bool,
}

impl SpsFaultInfo {
    pub fn any(&self) -> bool {
        self.sps_module_fault || self.sps_battery_fault
    }

    /// Most specific fault phrase; subordinate bits only matter under
    /// the module/battery fault they qualify.
    pub fn phrase(&self) -> &'static str {
        if self.sps_module_fault {
            if self.sps_charger_failure {
                "ChargerFailure"
            } else if self.sps_internal_fault {
                "InternalFault"
            } else {
                "None"
            }
        } else if self.sps_battery_fault {
            if self.sps_battery_not_engaged {
                "BatteryNotEngaged"
            } else if self.sps_battery_eol {
                "BatteryEOL"
            } else {
                "None"
            }
        } else {
            "None"
        }
    }
}

/// Battery backup unit fault reasons, in the order the fault report
/// checks them.
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
pub enum BatteryFault {
    None = 0,
    TestFailed = 1,
    CannotCharge = 2,
    NotReady = 3,
}

impl BatteryFault {
    pub fn phrase(&self) -> Option<&'static str> {
        match self {
            BatteryFault::None => None,
            BatteryFault::TestFailed => Some("TestFailed"),
            BatteryFault::CannotCharge => Some("CannotCharge"),
            BatteryFault::NotReady => Some("NotReady"),
        }
    }
}

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
pub enum SuitcaseState {
    Ok = 0,
    Degraded = 1,
    Fault = 2,
}

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
pub enum SuitcaseSubstate {
    NoFault = 0,
    HwErrMonFault = 1,
    BistFailure = 2,
}

impl SuitcaseSubstate {
    pub fn phrase(&self) -> Option<&'static str> {
        match self {
            SuitcaseSubstate::NoFault => None,
            SuitcaseSubstate::HwErrMonFault => Some("Tap12VMissing"),
            SuitcaseSubstate::BistFailure => Some("BistFailure"),
        }
    }
}

/// Lifecycle state of a pluggable module (IO module, base module,
/// mezzanine, management module).
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
pub enum ModuleState {
    Empty = 0,
    Missing = 1,
    Enabled = 2,
    Degraded = 3,
    Faulted = 4,
    Unsupported = 5,
    PoweredOff = 6,
}

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
pub enum ModuleSubstate {
    NoFault = 0,
    UnsupportedNotCommitted = 1,
    UnsupportedModule = 2,
    IncorrectModule = 3,
    PoweredOff = 4,
    PowerUpFailed = 5,
    InternalFanFaulted = 6,
    FaultRegisterFailed = 7,
    UnknownFault = 8,
}

impl ModuleSubstate {
    pub fn phrase(&self) -> Option<&'static str> {
        match self {
            ModuleSubstate::NoFault => None,
            ModuleSubstate::UnsupportedNotCommitted => {
                Some("Unsupported Not Committed")
            }
            ModuleSubstate::UnsupportedModule => Some("Unsupported"),
            ModuleSubstate::IncorrectModule => Some("Incorrect Module"),
            ModuleSubstate::PoweredOff => Some("Powered Off"),
            ModuleSubstate::PowerUpFailed => Some("Power Up Failed"),
            ModuleSubstate::InternalFanFaulted => Some("Internal Fan Faulted"),
            ModuleSubstate::FaultRegisterFailed => {
                Some("Fault Register Failed")
            }
            ModuleSubstate::UnknownFault => Some("Unknown Fault"),
        }
    }
}

/// Lifecycle state of a front or backend IO port.
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
pub enum PortState {
    Unknown = 0,
    Empty = 1,
    Missing = 2,
    Enabled = 3,
    Disabled = 4,
    Faulted = 5,
    Unavailable = 6,
}

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
pub enum PortSubstate {
    NoFault = 0,
    IncorrectModule = 1,
    UnsupportedSfp = 2,
    SfpReadError = 3,
    SfpFaulted = 4,
    ExceededMaxLimits = 5,
    ModulePoweredOff = 6,
    ModuleReadError = 7,
    UnsupportedModule = 8,
}

impl PortSubstate {
    pub fn phrase(&self) -> Option<&'static str> {
        match self {
            PortSubstate::NoFault => None,
            PortSubstate::IncorrectModule => Some("Incorrect Module"),
            PortSubstate::UnsupportedSfp => Some("Unsupported SFP"),
            PortSubstate::SfpReadError => Some("SFP Read Error"),
            PortSubstate::SfpFaulted => Some("SFP Faulted"),
            PortSubstate::ExceededMaxLimits => Some("Exceeded Max Limits"),
            PortSubstate::ModulePoweredOff => Some("Powered Off"),
            PortSubstate::ModuleReadError => Some("Module Read Error"),
            PortSubstate::UnsupportedModule => Some("Module Unsupported"),
        }
    }
}

/// Enclosure lifecycle state as tracked by enclosure management.
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
pub enum EnclState {
    Missing = 0,
    Ok = 1,
    Failed = 2,
    Unsupported = 3,
}

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
pub enum EnclFaultSymptom {
    None = 0,
    LifecycleStateFail = 1,
    CrossCabled = 2,
    BeLoopMiscabled = 3,
    LccInvalidUid = 4,
    ExceededMax = 5,
    UnsupportedEnclType = 6,
    PsTypeMix = 7,
    ResumePromFault = 8,
}

impl EnclFaultSymptom {
    pub fn phrase(&self) -> Option<&'static str> {
        match self {
            EnclFaultSymptom::None => None,
            EnclFaultSymptom::LifecycleStateFail => {
                Some("Lifecycle State Fail")
            }
            EnclFaultSymptom::CrossCabled => Some("Cross Cabled"),
            EnclFaultSymptom::BeLoopMiscabled => {
                Some("Backend Loop Miscabled")
            }
            EnclFaultSymptom::LccInvalidUid => Some("LCC Invalid UID"),
            EnclFaultSymptom::ExceededMax => Some("Exceeded Max"),
            EnclFaultSymptom::UnsupportedEnclType => {
                Some("Unsupported Enclosure Type")
            }
            EnclFaultSymptom::PsTypeMix => Some("PS Type Mix"),
            EnclFaultSymptom::ResumePromFault => Some("Resume PROM Fault"),
        }
    }
}

/// Lifecycle state of a drive slot as seen by drive management.
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
pub enum DriveLifecycleState {
    Ready = 0,
    Activate = 1,
    Fail = 2,
    Offline = 3,
    Destroy = 4,
    Invalid = 5,
    PendingFail = 6,
}

impl DriveLifecycleState {
    pub fn fault_phrase(&self) -> Option<&'static str> {
        match self {
            Self::Fail => Some("Lifecycle State Fail"),
            Self::PendingFail => Some("Lifecycle State Pending Fail"),
            Self::Destroy => Some("Lifecycle State Destroy"),
            _ => None,
        }
    }
}
