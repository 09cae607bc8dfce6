// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Firmware upgrade (FUP) flows: target enumeration, initiate and the
//! class-wide control operations, status collection, manifest queries.

use crate::client::EnvClient;
use crate::error::CommunicationError;
use esp_messages::device::ClassId;
use esp_messages::device::DeviceLocation;
use esp_messages::device::DeviceType;
use esp_messages::device::SpId;
use esp_messages::device::PHYSICAL_BUS_COUNT;
use esp_messages::fup::FupForceFlags;
use esp_messages::fup::FupInfoSet;
use esp_messages::fup::ManifestEntry;
use slog::error;
use slog::info;

type Result<T> = std::result::Result<T, CommunicationError>;

/// Upper bound on manifest entries scanned before giving up on the
/// leading-space sentinel.
const MANIFEST_SCAN_LIMIT: u32 = 16;

/// Expand a device type plus an optional explicit location into the
/// list of upgrade targets, in issue order.
///
/// SPS and fan devices hang off the chassis pseudo-enclosure. SP and
/// base module targets only exist at bus 0 / enclosure 0. LCC targets
/// are ordered non-zero component id first, then component id 0, so
/// edge expanders upgrade before the ICM expander they sit behind.
pub async fn enumerate_targets(
    client: &EnvClient,
    device_type: DeviceType,
    explicit: Option<DeviceLocation>,
) -> Result<Vec<DeviceLocation>> {
    if device_type.class_id().is_none() {
        return Err(CommunicationError::UnsupportedDeviceType(device_type));
    }
    if let Some(location) = explicit {
        return Ok(vec![location]);
    }

    let mut targets = Vec::new();
    match device_type {
        DeviceType::Sps => {
            let xpe = DeviceLocation::xpe();
            let count = client.get_sps_count(xpe).await?;
            for slot in 0..count {
                targets.push(DeviceLocation { slot, ..xpe });
            }
        }
        DeviceType::Fan => {
            let xpe = DeviceLocation::xpe();
            let count = client.get_encl_info(xpe).await?.fan_count;
            for slot in 0..count {
                targets.push(DeviceLocation { slot, ..xpe });
            }
        }
        DeviceType::Sp => {
            for sp in SpId::BOTH {
                targets.push(DeviceLocation {
                    sp: sp as u8,
                    ..DeviceLocation::default()
                });
            }
        }
        DeviceType::BackEndModule => {
            let limits = client.get_limits_info().await?;
            for sp in SpId::BOTH {
                for slot in 0..limits.num_bem {
                    targets.push(DeviceLocation {
                        sp: sp as u8,
                        slot,
                        ..DeviceLocation::default()
                    });
                }
            }
        }
        DeviceType::IoModule
        | DeviceType::Mezzanine
        | DeviceType::MgmtModule => {
            let limits = client.get_limits_info().await?;
            let per_sp = match device_type {
                DeviceType::IoModule => limits.num_slic_slots,
                DeviceType::Mezzanine => limits.num_mezzanine_slots,
                _ => limits.num_mgmt_modules,
            };
            for sp in SpId::BOTH {
                for slot in 0..per_sp {
                    targets.push(DeviceLocation {
                        sp: sp as u8,
                        slot,
                        ..DeviceLocation::default()
                    });
                }
            }
        }
        DeviceType::Enclosure | DeviceType::Ps | DeviceType::Lcc => {
            for bus in 0..PHYSICAL_BUS_COUNT {
                let encl_count = client.get_encl_count_on_bus(bus).await?;
                for enclosure in 0..encl_count {
                    let loc = DeviceLocation {
                        bus,
                        enclosure,
                        ..DeviceLocation::default()
                    };
                    match device_type {
                        DeviceType::Enclosure => targets.push(loc),
                        DeviceType::Ps => {
                            let count = client.get_ps_count(loc).await?;
                            for slot in 0..count {
                                targets
                                    .push(DeviceLocation { slot, ..loc });
                            }
                        }
                        _ => {
                            lcc_targets(client, loc, &mut targets).await?;
                        }
                    }
                }
            }
        }
        _ => {
            return Err(CommunicationError::UnsupportedDeviceType(
                device_type,
            ))
        }
    }

    Ok(targets)
}

async fn lcc_targets(
    client: &EnvClient,
    encl: DeviceLocation,
    targets: &mut Vec<DeviceLocation>,
) -> Result<()> {
    let lcc_count = client.get_encl_info(encl).await?.lcc_count;
    for slot in 0..lcc_count {
        let loc = DeviceLocation { slot, ..encl };
        let info = client.get_fup_info(DeviceType::Lcc, loc).await?;
        let mut component_ids: Vec<u32> =
            info.entries().iter().map(|e| e.component_id).collect();
        if component_ids.is_empty() {
            component_ids.push(0);
        }
        // non-zero component ids (edge expanders) before the ICM at 0
        component_ids.sort_by_key(|&id| id == 0);
        for component_id in component_ids {
            targets.push(DeviceLocation { component_id, ..loc });
        }
    }
    Ok(())
}

/// Kick off an upgrade on every enumerated target. Stops on the first
/// target that refuses.
pub async fn initiate_upgrade(
    client: &EnvClient,
    device_type: DeviceType,
    explicit: Option<DeviceLocation>,
    force_flags: FupForceFlags,
    delay_seconds: u32,
) -> Result<Vec<DeviceLocation>> {
    let targets = enumerate_targets(client, device_type, explicit).await?;
    for &location in &targets {
        info!(
            client.log(), "initiating firmware upgrade";
            "device_type" => device_type.name(),
            "bus" => location.bus,
            "enclosure" => location.enclosure,
            "slot" => location.slot,
        );
        client
            .initiate_upgrade(device_type, location, force_flags, delay_seconds)
            .await?;
    }
    Ok(targets)
}

/// One row of the status/revision table: the upgrade records for every
/// programmable component at one target location.
#[derive(Debug)]
pub struct FupStatusRow {
    pub location: DeviceLocation,
    pub info: FupInfoSet,
}

/// Fetch the upgrade records for every enumerated target.
///
/// Unlike the resume PROM traversal, this stops and returns the error
/// on the first target that fails; a partial firmware table is worse
/// than none when an operator is deciding whether to activate.
pub async fn collect_status(
    client: &EnvClient,
    device_type: DeviceType,
    explicit: Option<DeviceLocation>,
) -> Result<Vec<FupStatusRow>> {
    let targets = enumerate_targets(client, device_type, explicit).await?;
    let mut rows = Vec::with_capacity(targets.len());
    for &location in &targets {
        let info = client.get_fup_info(device_type, location).await?;
        rows.push(FupStatusRow { location, info });
    }
    Ok(rows)
}

async fn fan_out_classes<'a, F, Fut>(
    client: &'a EnvClient,
    operation: &'static str,
    call: F,
) -> Result<()>
where
    F: Fn(&'a EnvClient, ClassId) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let mut first_failure = None;
    for class_id in ClassId::FUP_CLASSES {
        if let Err(err) = call(client, class_id).await {
            error!(
                client.log(), "class-wide upgrade operation failed";
                "operation" => operation,
                "class" => %class_id,
                "err" => %err,
            );
            first_failure.get_or_insert(err);
        }
    }
    match first_failure {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

/// Abort in-progress upgrades in every management class. All classes
/// are attempted even if some fail; the first failure is returned.
pub async fn abort_all_upgrades(client: &EnvClient) -> Result<()> {
    fan_out_classes(client, "abort", |c, id| c.abort_upgrade(id)).await
}

/// Resume previously aborted upgrades in every management class.
pub async fn resume_all_upgrades(client: &EnvClient) -> Result<()> {
    fan_out_classes(client, "resume", |c, id| c.resume_upgrade(id)).await
}

/// Terminate upgrades in every management class.
pub async fn terminate_all_upgrades(client: &EnvClient) -> Result<()> {
    fan_out_classes(client, "terminate", |c, id| c.terminate_upgrade(id))
        .await
}

/// Read the firmware manifest for one device type. The manifest has no
/// length field; it ends at the first entry whose product ID starts
/// with a space.
pub async fn read_manifest(
    client: &EnvClient,
    device_type: DeviceType,
) -> Result<Vec<ManifestEntry>> {
    let mut entries = Vec::new();
    for entry_index in 0..MANIFEST_SCAN_LIMIT {
        let entry =
            client.get_fup_manifest_entry(device_type, entry_index).await?;
        if entry.is_unused() {
            break;
        }
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_port::test_client;
    use esp_messages::fup::FupInfo;
    use esp_messages::fup::MAX_PROGRAMMABLE_COUNT;
    use esp_messages::ObjRequest;
    use esp_messages::ObjResponse;
    use esp_messages::ObjectError;
    use std::sync::Arc;
    use std::sync::Mutex;

    fn fup_info_set(component_ids: &[u32]) -> FupInfoSet {
        let mut info = [FupInfo::default(); MAX_PROGRAMMABLE_COUNT];
        for (slot, &component_id) in component_ids.iter().enumerate() {
            info[slot].component_id = component_id;
        }
        FupInfoSet {
            programmable_count: component_ids.len() as u8,
            info,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_location_bypasses_enumeration() {
        let client = test_client(|_request, _data| {
            panic!("no RPC expected");
        });
        let loc = DeviceLocation { bus: 2, enclosure: 1, slot: 0, ..Default::default() };
        let targets =
            enumerate_targets(&client, DeviceType::Ps, Some(loc)).await.unwrap();
        assert_eq!(targets, vec![loc]);
    }

    #[tokio::test(start_paused = true)]
    async fn sps_targets_use_the_chassis_pseudo_location() {
        let client = test_client(|request, _data| match request {
            ObjRequest::GetSpsCount { location } => {
                assert!(location.is_xpe());
                ObjResponse::SpsCount(2)
            }
            other => panic!("unexpected request {other:?}"),
        });

        let targets =
            enumerate_targets(&client, DeviceType::Sps, None).await.unwrap();
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|t| t.is_xpe()));
        assert_eq!(targets[0].slot, 0);
        assert_eq!(targets[1].slot, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lcc_component_ids_are_ordered_nonzero_first() {
        use esp_messages::status::EnclFaultSymptom;
        use esp_messages::status::EnclState;
        use esp_messages::status::LedStatus;
        use esp_messages::EnclosureInfo;

        let client = test_client(|request, _data| match request {
            ObjRequest::GetEnclCountOnBus { bus: 0 } => {
                ObjResponse::EnclCountOnBus(1)
            }
            ObjRequest::GetEnclCountOnBus { .. } => {
                ObjResponse::EnclCountOnBus(0)
            }
            ObjRequest::GetEnclInfo { .. } => {
                ObjResponse::EnclInfo(EnclosureInfo {
                    encl_present: true,
                    encl_state: EnclState::Ok,
                    encl_fault_symptom: EnclFaultSymptom::None,
                    encl_fault_led_reason: Default::default(),
                    encl_fault_led_status: LedStatus::Off,
                    shutdown_reason: 0,
                    lcc_count: 1,
                    fan_count: 0,
                    ps_count: 0,
                    drive_slot_count: 0,
                    drive_midplane_count: 0,
                    connector_count: 0,
                    sps_count: 0,
                })
            }
            ObjRequest::GetFupInfo {
                device_type: DeviceType::Lcc, ..
            } => ObjResponse::FupInfo(fup_info_set(&[0, 2, 1])),
            other => panic!("unexpected request {other:?}"),
        });

        let targets =
            enumerate_targets(&client, DeviceType::Lcc, None).await.unwrap();
        let ids: Vec<u32> = targets.iter().map(|t| t.component_id).collect();
        assert_eq!(ids, vec![2, 1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn status_collection_bails_on_first_failure() {
        let queried = Mutex::new(0u32);
        let client = test_client(move |request, _data| match request {
            ObjRequest::GetSpsCount { .. } => ObjResponse::SpsCount(3),
            ObjRequest::GetFupInfo { .. } => {
                let mut queried = queried.lock().unwrap();
                *queried += 1;
                if *queried == 2 {
                    ObjResponse::Error(ObjectError::GenericFailure)
                } else {
                    ObjResponse::FupInfo(fup_info_set(&[0]))
                }
            }
            other => panic!("unexpected request {other:?}"),
        });

        let err = collect_status(&client, DeviceType::Sps, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommunicationError::ObjectError(ObjectError::GenericFailure)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn class_fan_out_attempts_every_class() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_handler = Arc::clone(&seen);
        let client = test_client(move |request, _data| match request {
            ObjRequest::AbortUpgrade { class_id } => {
                seen_by_handler.lock().unwrap().push(class_id);
                if class_id == ClassId::PsMgmt {
                    ObjResponse::Error(ObjectError::GenericFailure)
                } else {
                    ObjResponse::Ack
                }
            }
            other => panic!("unexpected request {other:?}"),
        });

        abort_all_upgrades(&client).await.unwrap_err();
        assert_eq!(*seen.lock().unwrap(), ClassId::FUP_CLASSES);
    }

    #[tokio::test(start_paused = true)]
    async fn manifest_scan_stops_at_the_sentinel() {
        use esp_messages::fup::FirmwareTarget;
        use esp_messages::fup::ManifestImage;
        use esp_messages::fup::MAX_IMAGE_COUNT_PER_SUBENCL;

        let client = test_client(|request, _data| match request {
            ObjRequest::GetFupManifestInfo { entry_index, .. } => {
                let mut entry = ManifestEntry {
                    subencl_product_id: *b"VOYAGER         ",
                    image_count: 0,
                    images: [ManifestImage {
                        image_file_name: [0; 64],
                        image_rev: [0; 16],
                        firmware_comp_type: 0,
                        firmware_target: FirmwareTarget::Main,
                    };
                        MAX_IMAGE_COUNT_PER_SUBENCL],
                };
                if entry_index >= 2 {
                    entry.subencl_product_id[0] = b' ';
                }
                ObjResponse::FupManifestInfo(entry)
            }
            other => panic!("unexpected request {other:?}"),
        });

        let entries =
            read_manifest(&client, DeviceType::Enclosure).await.unwrap();
        assert_eq!(entries.len(), 2);
    }
}
