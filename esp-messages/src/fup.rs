// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Firmware upgrade (FUP) wire types. The upgrade engine itself lives in
//! the management objects; these types carry commands in and progress
//! back out.

use bitflags::bitflags;
use core::str::FromStr;
use hubpack::SerializedSize;
use serde::Deserialize;
use serde::Serialize;
use serde_repr::Deserialize_repr;
use serde_repr::Serialize_repr;

/// Maximum programmable components a single device location can report.
pub const MAX_PROGRAMMABLE_COUNT: usize = 8;

/// Maximum image tuples listed per sub-enclosure manifest entry.
pub const MAX_IMAGE_COUNT_PER_SUBENCL: usize = 10;

/// Progress of an upgrade through the engine's state machine. Displayed
/// only; the CLI never drives transitions.
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
pub enum FupWorkState {
    None = 0,
    WaitBeforeUpgrade = 1,
    Queued = 2,
    WaitForInterDeviceDelayDone = 3,
    ReadImageHeaderDone = 4,
    CheckRevDone = 5,
    ReadEntireImageDone = 6,
    PeerPermissionRequested = 7,
    PeerPermissionReceived = 8,
    CheckEnvStatusDone = 9,
    DownloadImageSent = 10,
    DownloadImageDone = 11,
    ActivateImageSent = 12,
    ActivateImageDone = 13,
    CheckResultDone = 14,
    RefreshDeviceStatusDone = 15,
    EndUpgradeDone = 16,
    AbortCmdSent = 17,
}

impl FupWorkState {
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn as_static_str(&self) -> &'static str {
        self.into()
    }
}

/// Terminal (or latest) outcome of an upgrade attempt.
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
pub enum FupCompletionStatus {
    None = 0,
    Queued = 1,
    InProgress = 2,
    SuccessRevChanged = 3,
    SuccessNoRevChange = 4,
    NoRevChange = 5,
    Aborted = 6,
    Terminated = 7,
    FailNullImage = 8,
    FailBadImage = 9,
    FailImageTypeMismatch = 10,
    FailReadImageHeader = 11,
    FailReadEntireImage = 12,
    FailCheckEnvStatus = 13,
    FailNoPeerPermission = 14,
    FailDownloadImage = 15,
    FailActivateImage = 16,
    FailCheckResult = 17,
    FailDeviceRemoved = 18,
    FailContainingDeviceRemoved = 19,
    FailRevMismatchAcrossSides = 20,
    FailMissingRegistryImagePath = 21,
    FailFileRead = 22,
    ExitDegradedMode = 23,
}

impl FupCompletionStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::FailNullImage
                | Self::FailBadImage
                | Self::FailImageTypeMismatch
                | Self::FailReadImageHeader
                | Self::FailReadEntireImage
                | Self::FailCheckEnvStatus
                | Self::FailNoPeerPermission
                | Self::FailDownloadImage
                | Self::FailActivateImage
                | Self::FailCheckResult
                | Self::FailDeviceRemoved
                | Self::FailContainingDeviceRemoved
                | Self::FailRevMismatchAcrossSides
                | Self::FailMissingRegistryImagePath
                | Self::FailFileRead
        )
    }

    pub fn as_static_str(&self) -> &'static str {
        self.into()
    }
}

/// Which programmable part an image is destined for.
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
pub enum FirmwareTarget {
    Main = 0,
    Expander = 1,
    InitString = 2,
    FpgaImage = 3,
    PsMicrocode = 4,
    SpsPrimary = 5,
    SpsSecondary = 6,
    SpsBattery = 7,
    LccMain = 8,
    LccExpander = 9,
    Bootloader = 10,
    Undefined = 11,
}

impl FirmwareTarget {
    pub fn as_static_str(&self) -> &'static str {
        self.into()
    }
}

/// Checks an upgrade command may skip. `ACTIVATION_DEFERRED` changes
/// how the upgrade completes rather than skipping a check, so it is
/// deliberately left out of [`FupForceFlags::ALL`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    SerializedSize,
    Serialize,
    Deserialize,
)]
#[repr(transparent)]
pub struct FupForceFlags(u32);

bitflags! {
    impl FupForceFlags: u32 {
        const NO_REV_CHECK = 1 << 0;
        const SINGLE_SP_MODE = 1 << 1;
        const NO_ENV_CHECK = 1 << 2;
        const READ_IMAGE = 1 << 3;
        const READ_MANIFEST_FILE = 1 << 4;
        const NO_PRIORITY_CHECK = 1 << 5;
        const NO_BAD_IMAGE_CHECK = 1 << 6;
        const ACTIVATION_DEFERRED = 1 << 7;
    }
}

impl FupForceFlags {
    pub const ALL: Self = Self::NO_REV_CHECK
        .union(Self::SINGLE_SP_MODE)
        .union(Self::NO_ENV_CHECK)
        .union(Self::READ_IMAGE)
        .union(Self::READ_MANIFEST_FILE)
        .union(Self::NO_PRIORITY_CHECK)
        .union(Self::NO_BAD_IMAGE_CHECK);
}

impl FromStr for FupForceFlags {
    type Err = UnknownForceFlag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "norevcheck" => Ok(Self::NO_REV_CHECK),
            "singlesp" => Ok(Self::SINGLE_SP_MODE),
            "noenvcheck" => Ok(Self::NO_ENV_CHECK),
            "readimage" => Ok(Self::READ_IMAGE),
            "readmanifest" => Ok(Self::READ_MANIFEST_FILE),
            "noprioritycheck" => Ok(Self::NO_PRIORITY_CHECK),
            "nobadimagecheck" => Ok(Self::NO_BAD_IMAGE_CHECK),
            "deferactivation" => Ok(Self::ACTIVATION_DEFERRED),
            "all" => Ok(Self::ALL),
            _ => Err(UnknownForceFlag),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownForceFlag;

impl core::fmt::Display for UnknownForceFlag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown force flag")
    }
}

#[cfg(any(test, feature = "std"))]
impl std::error::Error for UnknownForceFlag {}

/// Per-programmable-component upgrade record. Re-fetched on every status
/// call; the CLI caches nothing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct FupInfo {
    pub component_id: u32,
    pub work_state: FupWorkState,
    pub completion_status: FupCompletionStatus,
    pub image_rev: [u8; 16],
    pub pre_firmware_rev: [u8; 16],
    pub current_firmware_rev: [u8; 16],
    pub wait_time_before_upgrade: u32,
}

impl Default for FupInfo {
    fn default() -> Self {
        Self {
            component_id: 0,
            work_state: FupWorkState::None,
            completion_status: FupCompletionStatus::None,
            image_rev: [0; 16],
            pre_firmware_rev: [0; 16],
            current_firmware_rev: [0; 16],
            wait_time_before_upgrade: 0,
        }
    }
}

/// Upgrade records for every programmable component at one location.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct FupInfoSet {
    pub programmable_count: u8,
    pub info: [FupInfo; MAX_PROGRAMMABLE_COUNT],
}

impl FupInfoSet {
    pub fn entries(&self) -> &[FupInfo] {
        let n = usize::from(self.programmable_count).min(self.info.len());
        &self.info[..n]
    }
}

/// One (image file, revision, component type, target) tuple from the
/// manifest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct ManifestImage {
    #[serde(with = "serde_big_array::BigArray")]
    pub image_file_name: [u8; 64],
    pub image_rev: [u8; 16],
    pub firmware_comp_type: u8,
    pub firmware_target: FirmwareTarget,
}

/// Manifest images for one sub-enclosure product. A leading space in
/// `subencl_product_id` marks the entry (and everything after it) unused;
/// the manifest has no explicit count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SerializedSize,
)]
pub struct ManifestEntry {
    pub subencl_product_id: [u8; 16],
    pub image_count: u8,
    pub images: [ManifestImage; MAX_IMAGE_COUNT_PER_SUBENCL],
}

impl ManifestEntry {
    /// Sentinel check used to terminate manifest traversal.
    pub fn is_unused(&self) -> bool {
        self.subencl_product_id[0] == b' '
    }

    pub fn images(&self) -> &[ManifestImage] {
        let n = usize::from(self.image_count).min(self.images.len());
        &self.images[..n]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_flag_all_excludes_deferred_activation() {
        assert!(!FupForceFlags::ALL.contains(FupForceFlags::ACTIVATION_DEFERRED));
        assert!(FupForceFlags::ALL.contains(FupForceFlags::NO_REV_CHECK));
        assert!(FupForceFlags::ALL.contains(FupForceFlags::NO_BAD_IMAGE_CHECK));
        assert_eq!(FupForceFlags::ALL.bits(), 0x7f);
    }

    #[test]
    fn force_flag_parsing() {
        assert_eq!(
            "norevcheck".parse::<FupForceFlags>(),
            Ok(FupForceFlags::NO_REV_CHECK)
        );
        assert_eq!("all".parse::<FupForceFlags>(), Ok(FupForceFlags::ALL));
        assert_eq!("bogus".parse::<FupForceFlags>(), Err(UnknownForceFlag));
    }

    #[test]
    fn manifest_sentinel() {
        let mut entry = ManifestEntry {
            subencl_product_id: *b"ANCHO LEM       ",
            image_count: 0,
            images: [ManifestImage {
                image_file_name: [0; 64],
                image_rev: [0; 16],
                firmware_comp_type: 0,
                firmware_target: FirmwareTarget::Main,
            }; MAX_IMAGE_COUNT_PER_SUBENCL],
        };
        assert!(!entry.is_unused());
        entry.subencl_product_id[0] = b' ';
        assert!(entry.is_unused());
    }

    #[test]
    fn work_state_decode_names() {
        assert_eq!(
            FupWorkState::PeerPermissionRequested.as_static_str(),
            "PEER_PERMISSION_REQUESTED"
        );
        assert_eq!(
            FupCompletionStatus::FailBadImage.as_static_str(),
            "FAIL_BAD_IMAGE"
        );
    }
}
