// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Enclosure fault LED reason bitmask. Each management object contributes
//! its own bit; the decoder walks the bits in ascending order.

use hubpack::SerializedSize;
use serde::Deserialize;
use serde::Serialize;

/// Reason(s) the enclosure fault LED is lit, one bit per cause.
///
/// Bit values above `BITMASK_MAX` are out of range and never inspected;
/// the decoder relies on that numeric threshold when walking bits.
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
pub struct EnclFaultLedReason(pub u64);

impl EnclFaultLedReason {
    pub const NO_FLT: u64 = 0x0;
    pub const PS_FLT: u64 = 0x1;
    pub const FAN_FLT: u64 = 0x2;
    pub const DRIVE_FLT: u64 = 0x4;
    pub const SPS_FLT: u64 = 0x8;
    pub const OVERTEMP_FLT: u64 = 0x10;
    pub const LCC_FLT: u64 = 0x20;
    pub const CONNECTOR_FLT: u64 = 0x40;
    pub const LCC_RESUME_PROM_FLT: u64 = 0x80;
    pub const PS_RESUME_PROM_FLT: u64 = 0x100;
    pub const FAN_RESUME_PROM_FLT: u64 = 0x200;
    pub const ENCL_LIFECYCLE_FAIL: u64 = 0x400;
    pub const SUBENCL_LIFECYCLE_FAIL: u64 = 0x800;
    pub const BATTERY_FLT: u64 = 0x1000;
    pub const BATTERY_RESUME_PROM_FLT: u64 = 0x2000;
    pub const LCC_CABLING_FLT: u64 = 0x4000;
    pub const EXCEEDED_MAX: u64 = 0x8000;
    pub const SP_FLT: u64 = 0x10000;
    pub const SP_FAULT_REG_FLT: u64 = 0x20000;
    pub const SP_RESUME_PROM_FLT: u64 = 0x40000;
    pub const SYSTEM_SERIAL_NUMBER_FLT: u64 = 0x80000;
    pub const PEER_SP_FLT: u64 = 0x100000;
    pub const MGMT_MODULE_FLT: u64 = 0x200000;
    pub const MGMT_MODULE_RESUME_PROM_FLT: u64 = 0x400000;
    pub const IO_MODULE_RESUME_PROM_FLT: u64 = 0x800000;
    pub const BEM_RESUME_PROM_FLT: u64 = 0x1000000;
    pub const MEZZANINE_RESUME_PROM_FLT: u64 = 0x2000000;
    pub const MIDPLANE_RESUME_PROM_FLT: u64 = 0x4000000;
    pub const DRIVE_MIDPLANE_RESUME_PROM_FLT: u64 = 0x8000000;
    pub const IO_PORT_FLT: u64 = 0x10000000;
    pub const IO_MODULE_FLT: u64 = 0x20000000;
    pub const CACHE_CARD_FLT: u64 = 0x40000000;
    pub const DIMM_FLT: u64 = 0x80000000;
    pub const NOT_SUPPORTED_FLT: u64 = 0x100000000;
    pub const SSC_FLT: u64 = 0x200000000;
    pub const SSC_RESUME_PROM_FLT: u64 = 0x400000000;
    pub const INTERNAL_CABLE_FLT: u64 = 0x800000000;

    /// First bit value past the defined range.
    pub const BITMASK_MAX: u64 = 0x1000000000;

    pub fn contains(&self, bit: u64) -> bool {
        self.0 & bit != 0
    }

    pub fn any(&self) -> bool {
        self.0 != 0
    }
}

#[cfg(any(test, feature = "std"))]
fn phrase_for_bit(bit: u64) -> Option<&'static str> {
    let phrase = match bit {
        EnclFaultLedReason::PS_FLT => "PS Fault",
        EnclFaultLedReason::FAN_FLT => "Fan Fault",
        EnclFaultLedReason::DRIVE_FLT => "Drive Fault",
        EnclFaultLedReason::SPS_FLT => "SPS Fault",
        EnclFaultLedReason::OVERTEMP_FLT => "Overtemp Fault",
        EnclFaultLedReason::LCC_FLT => "LCC Fault",
        EnclFaultLedReason::CONNECTOR_FLT => "Connector Fault",
        EnclFaultLedReason::LCC_RESUME_PROM_FLT => "LCC Resume Prom Fault",
        EnclFaultLedReason::PS_RESUME_PROM_FLT => "PS Resume Prom Fault",
        EnclFaultLedReason::FAN_RESUME_PROM_FLT => "Fan Resume Prom Fault",
        EnclFaultLedReason::ENCL_LIFECYCLE_FAIL => "Encl Lifecycle Fail",
        EnclFaultLedReason::SUBENCL_LIFECYCLE_FAIL => {
            "Sub Enclosure Lifecycle Fail"
        }
        EnclFaultLedReason::BATTERY_FLT => "Battery Fault",
        EnclFaultLedReason::BATTERY_RESUME_PROM_FLT => {
            "Battery Resume Prom Fault"
        }
        EnclFaultLedReason::LCC_CABLING_FLT => "LCC Cabling Fault",
        EnclFaultLedReason::EXCEEDED_MAX => "Exceeded Max Encl Limit",
        EnclFaultLedReason::SP_FLT => "SP Fault",
        EnclFaultLedReason::SP_FAULT_REG_FLT => "SP Fault Register Fault",
        EnclFaultLedReason::SP_RESUME_PROM_FLT => "SP Resume Prom Fault",
        EnclFaultLedReason::SYSTEM_SERIAL_NUMBER_FLT => "System SN Invalid",
        EnclFaultLedReason::PEER_SP_FLT => "Peer SP Fault",
        EnclFaultLedReason::MGMT_MODULE_FLT => "Mgmt Module Fault",
        EnclFaultLedReason::MGMT_MODULE_RESUME_PROM_FLT => {
            "Mgmt Module Resume Prom Fault"
        }
        EnclFaultLedReason::IO_MODULE_RESUME_PROM_FLT => {
            "IO Module Resume Prom Fault"
        }
        EnclFaultLedReason::BEM_RESUME_PROM_FLT => {
            "Base Module Resume Prom Fault"
        }
        EnclFaultLedReason::MEZZANINE_RESUME_PROM_FLT => {
            "Mezzanine Resume Prom Fault"
        }
        EnclFaultLedReason::MIDPLANE_RESUME_PROM_FLT => {
            "Midplane Resume Prom Fault"
        }
        EnclFaultLedReason::DRIVE_MIDPLANE_RESUME_PROM_FLT => {
            "Drive Midplane Resume Prom Fault"
        }
        EnclFaultLedReason::IO_PORT_FLT => "IO Port Fault",
        EnclFaultLedReason::IO_MODULE_FLT => "IO Module Fault",
        EnclFaultLedReason::CACHE_CARD_FLT => "Cache Card Fault",
        EnclFaultLedReason::DIMM_FLT => "DIMM Fault",
        EnclFaultLedReason::NOT_SUPPORTED_FLT => "Not Supported Fault",
        EnclFaultLedReason::SSC_FLT => "SSC Fault",
        EnclFaultLedReason::SSC_RESUME_PROM_FLT => "SSC Resume Prom Fault",
        EnclFaultLedReason::INTERNAL_CABLE_FLT => "Internal Cable Fault",
        _ => return None,
    };
    Some(phrase)
}

#[cfg(any(test, feature = "std"))]
impl EnclFaultLedReason {
    /// Decode the bitmask into a comma-separated phrase list, walking
    /// bits in ascending order and stopping at `BITMASK_MAX`. A set bit
    /// with no known phrase decodes as "Unknown Fault" rather than being
    /// dropped. Returns "No Fault" for an empty mask.
    pub fn decode(&self) -> String {
        if self.0 == 0 {
            return "No Fault".to_string();
        }

        let mut phrases = Vec::new();
        for shift in 0..64 {
            let bit = 1u64 << shift;
            if bit >= Self::BITMASK_MAX {
                break;
            }
            if self.0 & bit == 0 {
                continue;
            }
            phrases.push(phrase_for_bit(bit).unwrap_or("Unknown Fault"));
        }
        phrases.join(", ")
    }
}
