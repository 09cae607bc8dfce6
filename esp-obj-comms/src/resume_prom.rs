// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resume PROM read/write flows and the whole-array read traversal.

use crate::client::EnvClient;
use crate::error::CommunicationError;
use esp_messages::device::DeviceLocation;
use esp_messages::device::DeviceType;
use esp_messages::device::SpId;
use esp_messages::device::PHYSICAL_BUS_COUNT;
use esp_messages::resume_prom::ResumePromField;
use esp_messages::resume_prom::ResumePromOpStatus;
use esp_messages::resume_prom::ResumePromWriteHeader;
use esp_messages::ResumePromReadResult;
use esp_messages::MIN_TRAILING_DATA_LEN;
use slog::info;
use slog::warn;
use std::time::Duration;
use tokio::time;

type Result<T> = std::result::Result<T, CommunicationError>;

/// Resume PROM commits are asynchronous at the hardware level; rather
/// than polling, the write path blocks for this long before declaring
/// success.
pub const WRITE_SETTLE_TIME: Duration = Duration::from_secs(15);

/// Read the identity record of one FRU.
pub async fn get_resume_prom_info(
    client: &EnvClient,
    device_type: DeviceType,
    location: DeviceLocation,
) -> Result<ResumePromReadResult> {
    if device_type.class_id().is_none() {
        return Err(CommunicationError::UnsupportedDeviceType(device_type));
    }
    client.get_resume_prom_info_raw(device_type, location).await
}

/// Write one field of a FRU's resume PROM and wait out the settle time.
///
/// `data` must be present for every field except the checksum, which the
/// device recomputes itself. The payload travels as trailing bytes after
/// the message, framed as a two-element scatter-gather list (data plus a
/// NUL terminator).
pub async fn write_resume_prom(
    client: &EnvClient,
    device_type: DeviceType,
    location: DeviceLocation,
    field: ResumePromField,
    offset: u32,
    data: Option<&[u8]>,
) -> Result<ResumePromOpStatus> {
    if device_type.class_id().is_none() {
        return Err(CommunicationError::UnsupportedDeviceType(device_type));
    }

    let data = match (field.requires_payload(), data) {
        (true, None) | (true, Some([])) => {
            return Err(CommunicationError::MissingWriteBuffer)
        }
        (true, Some(data)) => data,
        (false, _) => &[],
    };

    const TERMINATOR: [u8; 1] = [0];
    if data.len() + TERMINATOR.len() > MIN_TRAILING_DATA_LEN {
        return Err(CommunicationError::WriteBufferTooLarge(data.len()));
    }

    let header = ResumePromWriteHeader {
        device_type,
        location,
        field,
        offset,
        buffer_size: data.len() as u32,
    };

    let data_slices: &[&[u8]] =
        if data.is_empty() { &[] } else { &[data, &TERMINATOR] };

    let op_status =
        client.write_resume_prom_raw(header, data_slices).await?;

    info!(
        client.log(), "resume prom write issued, waiting for device commit";
        "field" => ?field,
        "op_status" => op_status.as_static_str(),
    );
    time::sleep(WRITE_SETTLE_TIME).await;

    Ok(op_status)
}

/// One device visited by [`read_all`].
#[derive(Debug)]
pub struct ResumePromReportEntry {
    pub device_type: DeviceType,
    pub location: DeviceLocation,
    pub outcome: Result<ResumePromReadResult>,
}

/// Read every resume PROM in the array.
///
/// Visit order is a contract: per-SP chassis devices first (xPE devices
/// at the pseudo-location when the platform has one), then every bus in
/// order, every enclosure on that bus, and that enclosure's FRUs.
/// Individual read failures are recorded and the traversal continues;
/// only a failure to learn the topology itself aborts.
pub async fn read_all(
    client: &EnvClient,
) -> Result<Vec<ResumePromReportEntry>> {
    let board = client.get_board_info().await?;
    let limits = client.get_limits_info().await?;
    let mut entries = Vec::new();

    let chassis = if board.is_xpe {
        DeviceLocation::xpe()
    } else {
        DeviceLocation::default()
    };

    for sp in SpId::BOTH {
        let mut loc = DeviceLocation { sp: sp as u8, ..chassis };

        loc.slot = 0;
        push_read(client, &mut entries, DeviceType::Sp, loc).await;

        for slot in 0..limits.num_bem {
            loc.slot = slot;
            push_read(client, &mut entries, DeviceType::BackEndModule, loc)
                .await;
        }
        for slot in 0..limits.num_mezzanine_slots {
            loc.slot = slot;
            push_read(client, &mut entries, DeviceType::Mezzanine, loc).await;
        }
        for slot in 0..limits.num_slic_slots {
            loc.slot = slot;
            push_read(client, &mut entries, DeviceType::IoModule, loc).await;
        }
        for slot in 0..limits.num_mgmt_modules {
            // an empty mgmt module slot has nothing to read
            match client.get_mgmt_comp_info(sp, slot).await {
                Ok(info) if !info.inserted.is_true() => continue,
                Ok(_) => {}
                Err(err) if err.is_recoverable() => continue,
                Err(err) => {
                    warn!(
                        client.log(), "failed to query mgmt module";
                        "slot" => slot,
                        "err" => %err,
                    );
                    continue;
                }
            }
            loc.slot = slot;
            push_read(client, &mut entries, DeviceType::MgmtModule, loc)
                .await;
        }

        if let Ok(bob_count) = client.get_bob_count().await {
            for slot in 0..bob_count {
                loc.slot = slot;
                push_read(client, &mut entries, DeviceType::Battery, loc)
                    .await;
            }
        }
        for slot in 0..board.cache_card_count {
            loc.slot = slot;
            push_read(client, &mut entries, DeviceType::CacheCard, loc).await;
        }
    }

    for bus in 0..PHYSICAL_BUS_COUNT {
        let encl_count = client.get_encl_count_on_bus(bus).await?;
        for enclosure in 0..encl_count {
            let loc =
                DeviceLocation { bus, enclosure, ..DeviceLocation::default() };
            let encl_info = match client.get_encl_info(loc).await {
                Ok(info) => info,
                Err(err) if err.is_recoverable() => continue,
                Err(err) => return Err(err),
            };
            if !encl_info.encl_present {
                continue;
            }

            push_read(client, &mut entries, DeviceType::Enclosure, loc).await;

            let mut slot_loc = loc;
            for slot in 0..encl_info.fan_count {
                slot_loc.slot = slot;
                push_read(client, &mut entries, DeviceType::Fan, slot_loc)
                    .await;
            }
            for slot in 0..encl_info.ps_count {
                slot_loc.slot = slot;
                push_read(client, &mut entries, DeviceType::Ps, slot_loc)
                    .await;
            }
            for slot in 0..encl_info.lcc_count {
                slot_loc.slot = slot;
                push_read(client, &mut entries, DeviceType::Lcc, slot_loc)
                    .await;
            }
            if encl_info.drive_midplane_count > 0 {
                slot_loc.slot = 0;
                push_read(
                    client,
                    &mut entries,
                    DeviceType::DriveMidplane,
                    slot_loc,
                )
                .await;
            }
        }
    }

    Ok(entries)
}

async fn push_read(
    client: &EnvClient,
    entries: &mut Vec<ResumePromReportEntry>,
    device_type: DeviceType,
    location: DeviceLocation,
) {
    let outcome =
        get_resume_prom_info(client, device_type, location).await;
    entries.push(ResumePromReportEntry { device_type, location, outcome });
}
