// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identity: the closed set of environmental device types, the
//! management-object classes that own them, and physical slot addressing.

use core::fmt;
use core::str::FromStr;
use hubpack::SerializedSize;
use serde::Deserialize;
use serde::Serialize;
use serde_repr::Deserialize_repr;
use serde_repr::Serialize_repr;

/// Number of backend buses a platform can expose.
pub const PHYSICAL_BUS_COUNT: u32 = 16;

/// Pseudo bus number addressing the chassis-integrated processor
/// enclosure (xPE) instead of a real backend bus.
pub const XPE_PSEUDO_BUS_NUM: u32 = 254;

/// Pseudo enclosure number paired with [`XPE_PSEUDO_BUS_NUM`].
pub const XPE_PSEUDO_ENCL_NUM: u32 = 254;

/// Storage processor identity. Most slot addressing is SP-relative.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize_repr,
    Deserialize_repr,
    SerializedSize,
)]
#[repr(u8)]
pub enum SpId {
    A = 0,
    B = 1,
}

impl SpId {
    pub const BOTH: [SpId; 2] = [SpId::A, SpId::B];
}

impl fmt::Display for SpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpId::A => write!(f, "SPA"),
            SpId::B => write!(f, "SPB"),
        }
    }
}

/// The closed set of environmental device types.
///
/// The declaration order is load-bearing: [`DeviceType::bit`] derives the
/// historical single-bit tag for each type from its ordinal, so variants
/// must never be reordered.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    SerializedSize,
)]
pub enum DeviceType {
    Sp,
    Enclosure,
    Ps,
    Lcc,
    Fan,
    Sps,
    IoModule,
    BackEndModule,
    Drive,
    Mezzanine,
    MgmtModule,
    SlavePort,
    Platform,
    Suitcase,
    Misc,
    Bmc,
    Sfp,
    Connector,
    DriveMidplane,
    Battery,
    CacheCard,
    Dimm,
    Ssd,
    Ssc,
}

impl DeviceType {
    /// Single-bit device tag as used in device bitmask fields.
    pub fn bit(&self) -> u64 {
        1 << (*self as u64)
    }

    /// Human-readable device name as used in printed status lines.
    pub fn name(&self) -> &'static str {
        match self {
            DeviceType::Sp => "SP",
            DeviceType::Enclosure => "Enclosure",
            DeviceType::Ps => "Power Supply",
            DeviceType::Lcc => "LCC",
            DeviceType::Fan => "Fan",
            DeviceType::Sps => "SPS",
            DeviceType::IoModule => "IO Module",
            DeviceType::BackEndModule => "Base Module",
            DeviceType::Drive => "Drive",
            DeviceType::Mezzanine => "Mezzanine",
            DeviceType::MgmtModule => "Mgmt Module",
            DeviceType::SlavePort => "Slave Port",
            DeviceType::Platform => "Platform",
            DeviceType::Suitcase => "Suitcase",
            DeviceType::Misc => "Misc",
            DeviceType::Bmc => "BMC",
            DeviceType::Sfp => "SFP",
            DeviceType::Connector => "Connector",
            DeviceType::DriveMidplane => "Drive Midplane",
            DeviceType::Battery => "BBU",
            DeviceType::CacheCard => "Cache Card",
            DeviceType::Dimm => "DIMM",
            DeviceType::Ssd => "SSD",
            DeviceType::Ssc => "SSC",
        }
    }

    /// The single management-object class owning this device type, or
    /// `None` for types no class services (SFP, connector, DIMM, SSC are
    /// reported through their parent devices and cannot be addressed
    /// directly).
    pub fn class_id(&self) -> Option<ClassId> {
        match self {
            DeviceType::Ps => Some(ClassId::PsMgmt),
            DeviceType::Enclosure
            | DeviceType::Lcc
            | DeviceType::DriveMidplane
            | DeviceType::Ssc => Some(ClassId::EnclMgmt),
            DeviceType::Fan => Some(ClassId::CoolingMgmt),
            DeviceType::Sps | DeviceType::Battery => Some(ClassId::SpsMgmt),
            DeviceType::IoModule
            | DeviceType::BackEndModule
            | DeviceType::Mezzanine
            | DeviceType::MgmtModule => Some(ClassId::ModuleMgmt),
            DeviceType::Drive => Some(ClassId::DriveMgmt),
            DeviceType::Sp
            | DeviceType::SlavePort
            | DeviceType::Platform
            | DeviceType::Suitcase
            | DeviceType::Misc
            | DeviceType::Bmc
            | DeviceType::CacheCard
            | DeviceType::Ssd => Some(ClassId::BoardMgmt),
            DeviceType::Sfp | DeviceType::Connector | DeviceType::Dimm => None,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error type returned from `FromStr for DeviceType` when the argument
/// names no known device type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownDeviceType;

impl fmt::Display for UnknownDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown device type")
    }
}

#[cfg(any(test, feature = "std"))]
impl std::error::Error for UnknownDeviceType {}

impl FromStr for DeviceType {
    type Err = UnknownDeviceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accepts the short names used on the command line.
        match s {
            "sp" => Ok(DeviceType::Sp),
            "encl" | "enclosure" => Ok(DeviceType::Enclosure),
            "ps" => Ok(DeviceType::Ps),
            "lcc" => Ok(DeviceType::Lcc),
            "fan" => Ok(DeviceType::Fan),
            "sps" => Ok(DeviceType::Sps),
            "iom" | "iomodule" => Ok(DeviceType::IoModule),
            "bem" => Ok(DeviceType::BackEndModule),
            "drive" => Ok(DeviceType::Drive),
            "mezz" | "mezzanine" => Ok(DeviceType::Mezzanine),
            "mgmt" => Ok(DeviceType::MgmtModule),
            "suitcase" => Ok(DeviceType::Suitcase),
            "bmc" => Ok(DeviceType::Bmc),
            "sfp" => Ok(DeviceType::Sfp),
            "connector" => Ok(DeviceType::Connector),
            "midplane" => Ok(DeviceType::DriveMidplane),
            "bbu" | "battery" => Ok(DeviceType::Battery),
            "cachecard" => Ok(DeviceType::CacheCard),
            "dimm" => Ok(DeviceType::Dimm),
            "ssd" => Ok(DeviceType::Ssd),
            "ssc" => Ok(DeviceType::Ssc),
            _ => Err(UnknownDeviceType),
        }
    }
}

/// Identifier for the management-object classes hosted by the ESP package.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize_repr,
    Deserialize_repr,
    SerializedSize,
    strum_macros::IntoStaticStr,
)]
#[repr(u8)]
pub enum ClassId {
    BoardMgmt = 0,
    PsMgmt = 1,
    CoolingMgmt = 2,
    SpsMgmt = 3,
    EnclMgmt = 4,
    ModuleMgmt = 5,
    DriveMgmt = 6,
}

impl ClassId {
    /// Every class participating in firmware upgrade fan-out operations
    /// (drive upgrades are handled elsewhere and excluded).
    pub const FUP_CLASSES: [ClassId; 6] = [
        ClassId::CoolingMgmt,
        ClassId::PsMgmt,
        ClassId::EnclMgmt,
        ClassId::SpsMgmt,
        ClassId::ModuleMgmt,
        ClassId::BoardMgmt,
    ];
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = self.into();
        write!(f, "{s}")
    }
}

/// Physical (or pseudo) location of a device.
///
/// Invariant: `bus` and `enclosure` either both carry the xPE pseudo
/// values or neither does; [`DeviceLocation::is_xpe`] relies on this.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    SerializedSize,
)]
pub struct DeviceLocation {
    pub bus: u32,
    pub enclosure: u32,
    pub slot: u32,
    pub component_id: u32,
    pub sp: u8,
    pub bank: u8,
    pub bank_slot: u32,
}

impl DeviceLocation {
    pub fn xpe() -> Self {
        Self {
            bus: XPE_PSEUDO_BUS_NUM,
            enclosure: XPE_PSEUDO_ENCL_NUM,
            ..Self::default()
        }
    }

    pub fn is_xpe(&self) -> bool {
        self.bus == XPE_PSEUDO_BUS_NUM && self.enclosure == XPE_PSEUDO_ENCL_NUM
    }

    pub fn sp_id(&self) -> SpId {
        if self.sp == 0 {
            SpId::A
        } else {
            SpId::B
        }
    }
}

/// Error type returned from [`create_device_string`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStringError {
    /// The formatted string would not fit the caller-supplied capacity.
    /// This is checked after formatting, not prevented up front.
    BufferTooSmall { needed: usize, capacity: usize },
    /// An SPS location carried a component id outside the known set.
    InvalidComponentId { component_id: u32 },
}

impl fmt::Display for DeviceStringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStringError::BufferTooSmall { needed, capacity } => write!(
                f,
                "device string needs {needed} bytes but only {capacity} \
                 are available"
            ),
            DeviceStringError::InvalidComponentId { component_id } => {
                write!(f, "invalid SPS component id {component_id}")
            }
        }
    }
}

#[cfg(any(test, feature = "std"))]
impl std::error::Error for DeviceStringError {}

/// Default capacity accepted by device-string callers that don't have a
/// narrower display constraint.
pub const DEVICE_STRING_LENGTH: usize = 64;

/// Compose the location-qualified label for a device, e.g.
/// `"Bus 1 Enclosure 2 Power Supply 0"` or `"xPE Fan 3"`.
///
/// The result is checked against `capacity` *after* formatting; callers
/// relying on a fixed display width get `BufferTooSmall` rather than a
/// truncated label.
#[cfg(any(test, feature = "std"))]
pub fn create_device_string(
    device_type: DeviceType,
    location: &DeviceLocation,
    capacity: usize,
) -> Result<String, DeviceStringError> {
    let label = match device_type {
        // A dual-component SPS is addressed by component id: the primary
        // module, the secondary module, or the battery pack.
        DeviceType::Sps => match location.component_id {
            0 => "SPS".to_string(),
            1 => "Secondary SPS".to_string(),
            2 => "SPS Battery".to_string(),
            other => {
                return Err(DeviceStringError::InvalidComponentId {
                    component_id: other,
                })
            }
        },
        other => other.name().to_string(),
    };

    let s = if location.is_xpe() {
        format!("xPE {} {}", label, location.slot)
    } else {
        format!(
            "Bus {} Enclosure {} {} {}",
            location.bus, location.enclosure, label, location.slot
        )
    };

    if s.len() > capacity {
        return Err(DeviceStringError::BufferTooSmall {
            needed: s.len(),
            capacity,
        });
    }

    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_string_forms() {
        let loc = DeviceLocation { bus: 1, enclosure: 2, ..Default::default() };
        assert_eq!(
            create_device_string(DeviceType::Ps, &loc, DEVICE_STRING_LENGTH)
                .unwrap(),
            "Bus 1 Enclosure 2 Power Supply 0"
        );

        let xpe = DeviceLocation { slot: 3, ..DeviceLocation::xpe() };
        assert_eq!(
            create_device_string(DeviceType::Fan, &xpe, DEVICE_STRING_LENGTH)
                .unwrap(),
            "xPE Fan 3"
        );
    }

    #[test]
    fn device_string_checks_length_after_formatting() {
        let loc = DeviceLocation { bus: 1, enclosure: 2, ..Default::default() };
        let err = create_device_string(DeviceType::Ps, &loc, 10).unwrap_err();
        assert_eq!(
            err,
            DeviceStringError::BufferTooSmall { needed: 32, capacity: 10 }
        );
    }

    #[test]
    fn sps_component_ids() {
        let mut loc = DeviceLocation::xpe();
        loc.component_id = 2;
        assert_eq!(
            create_device_string(DeviceType::Sps, &loc, DEVICE_STRING_LENGTH)
                .unwrap(),
            "xPE SPS Battery 0"
        );

        loc.component_id = 9;
        assert_eq!(
            create_device_string(DeviceType::Sps, &loc, DEVICE_STRING_LENGTH)
                .unwrap_err(),
            DeviceStringError::InvalidComponentId { component_id: 9 }
        );
    }

    #[test]
    fn device_type_parsing() {
        assert_eq!("bbu".parse::<DeviceType>(), Ok(DeviceType::Battery));
        assert_eq!("ps".parse::<DeviceType>(), Ok(DeviceType::Ps));
        assert_eq!("xyz".parse::<DeviceType>(), Err(UnknownDeviceType));
    }

    #[test]
    fn unaddressable_types_have_no_class() {
        assert_eq!(DeviceType::Sfp.class_id(), None);
        assert_eq!(DeviceType::Connector.class_id(), None);
        assert_eq!(DeviceType::Dimm.class_id(), None);
        assert_eq!(DeviceType::Battery.class_id(), Some(ClassId::SpsMgmt));
    }
}
