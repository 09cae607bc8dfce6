// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resume PROM subcommands.

use crate::fixed_str;
use crate::Output;
use crate::TargetArgs;
use anyhow::bail;
use anyhow::Result;
use clap::Subcommand;
use esp_messages::device::create_device_string;
use esp_messages::device::DeviceType;
use esp_messages::device::DEVICE_STRING_LENGTH;
use esp_messages::resume_prom_field_from_arg;
use esp_messages::ResumePromReadResult;
use esp_obj_comms::resume_prom;
use esp_obj_comms::EnvClient;
use serde_json::json;

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum ResumePromCommand {
    /// Read and decode one device's resume PROM.
    Read {
        device: DeviceType,
        #[clap(flatten)]
        target: TargetArgs,
    },

    /// Write one field of a device's resume PROM.
    Write {
        device: DeviceType,
        /// Field to write: emc_pn, emc_sn, vendor_pn, vendor_sn,
        /// product_pn, product_sn, product_rev, wwn_seed, sas_address,
        /// system_type, or checksum.
        field: String,
        /// Bytes to write. Required for every field except checksum,
        /// which the device recomputes itself.
        data: Option<String>,
        #[clap(flatten)]
        target: TargetArgs,
        /// Byte offset within the field.
        #[clap(long, default_value = "0")]
        offset: u32,
    },

    /// Read every resume PROM in the array.
    All,

    /// Report whether any background resume PROM read is in progress.
    InProgress,
}

pub(crate) async fn run(
    client: &EnvClient,
    command: ResumePromCommand,
    json: bool,
) -> Result<Output> {
    match command {
        ResumePromCommand::Read { device, target } => {
            let result = resume_prom::get_resume_prom_info(
                client,
                device,
                target.location(),
            )
            .await?;
            if json {
                Ok(Output::Json(info_json(&result)))
            } else {
                Ok(Output::Lines(info_lines(&result)))
            }
        }

        ResumePromCommand::Write { device, field, data, target, offset } => {
            let Some(field) = resume_prom_field_from_arg(&field) else {
                bail!("unknown resume PROM field: {field}");
            };
            if field.requires_payload() && data.is_none() {
                bail!("field {field:?} requires a data argument");
            }
            let op_status = resume_prom::write_resume_prom(
                client,
                device,
                target.location(),
                field,
                offset,
                data.as_deref().map(str::as_bytes),
            )
            .await?;
            if json {
                Ok(Output::Json(json!({
                    "op_status": op_status.as_static_str()
                })))
            } else {
                Ok(Output::Lines(vec![format!(
                    "write status: {}",
                    op_status.as_static_str()
                )]))
            }
        }

        ResumePromCommand::All => {
            let entries = resume_prom::read_all(client).await?;
            if json {
                let entries: Vec<_> = entries
                    .iter()
                    .map(|entry| {
                        let label = entry_label(entry);
                        match &entry.outcome {
                            Ok(result) => json!({
                                "device": label,
                                "op_status": result
                                    .op_status
                                    .as_static_str(),
                            }),
                            Err(err) => json!({
                                "device": label,
                                "error": format!("{err}"),
                            }),
                        }
                    })
                    .collect();
                return Ok(Output::Json(json!(entries)));
            }
            let lines = entries
                .iter()
                .map(|entry| {
                    let label = entry_label(entry);
                    match &entry.outcome {
                        Ok(result) => format!(
                            "{label}: {}",
                            result.op_status.as_static_str()
                        ),
                        Err(err) => format!("{label}: {err}"),
                    }
                })
                .collect();
            Ok(Output::Lines(lines))
        }

        ResumePromCommand::InProgress => {
            let in_progress =
                client.any_resume_prom_read_in_progress().await?;
            if json {
                Ok(Output::Json(json!({ "in_progress": in_progress })))
            } else {
                Ok(Output::Lines(vec![format!(
                    "resume PROM read in progress: {in_progress}"
                )]))
            }
        }
    }
}

fn entry_label(entry: &resume_prom::ResumePromReportEntry) -> String {
    create_device_string(
        entry.device_type,
        &entry.location,
        DEVICE_STRING_LENGTH,
    )
    .unwrap_or_else(|_| entry.device_type.name().to_string())
}

fn info_lines(result: &ResumePromReadResult) -> Vec<String> {
    let data = &result.data;
    let programmables = &data.programmables[..usize::from(
        data.num_programmables,
    )
    .min(data.programmables.len())];

    let mut lines = vec![
        format!("op status: {}", result.op_status.as_static_str()),
        format!("EMC part number: {}", fixed_str(&data.emc_part_number)),
        format!(
            "EMC artwork revision: {}",
            fixed_str(&data.emc_artwork_revision)
        ),
        format!(
            "EMC assembly revision: {}",
            fixed_str(&data.emc_assembly_revision)
        ),
        format!("EMC serial number: {}", fixed_str(&data.emc_serial_number)),
        format!(
            "vendor part number: {}",
            fixed_str(&data.vendor_part_number)
        ),
        format!(
            "vendor artwork revision: {}",
            fixed_str(&data.vendor_artwork_revision)
        ),
        format!(
            "vendor assembly revision: {}",
            fixed_str(&data.vendor_assembly_revision)
        ),
        format!(
            "vendor serial number: {}",
            fixed_str(&data.vendor_serial_number)
        ),
        format!("vendor name: {}", fixed_str(&data.vendor_name)),
        format!(
            "location of manufacture: {}",
            fixed_str(&data.location_of_manufacture)
        ),
        format!(
            "date of manufacture: {}-{}-{}",
            fixed_str(&data.year_of_manufacture),
            fixed_str(&data.month_of_manufacture),
            fixed_str(&data.day_of_manufacture),
        ),
        format!("assembly name: {}", fixed_str(&data.assembly_name)),
    ];
    for programmable in programmables {
        lines.push(format!(
            "programmable {}: rev {}",
            fixed_str(&programmable.name),
            fixed_str(&programmable.revision),
        ));
    }
    lines.push(format!("wwn seed: 0x{:x}", data.wwn_seed));
    lines.push(format!(
        "sas address: {:02x}{:02x}{:02x}{:02x}",
        data.sas_address[0],
        data.sas_address[1],
        data.sas_address[2],
        data.sas_address[3],
    ));
    lines.push(format!(
        "product part number: {}",
        fixed_str(&data.product_part_number)
    ));
    lines.push(format!(
        "product serial number: {}",
        fixed_str(&data.product_serial_number)
    ));
    lines.push(format!(
        "product revision: {}",
        fixed_str(&data.product_revision)
    ));
    lines.push(format!("system type: {}", data.system_type));
    lines.push(format!("checksum: 0x{:08x}", data.checksum));
    lines
}

fn info_json(result: &ResumePromReadResult) -> serde_json::Value {
    let data = &result.data;
    let programmables: Vec<_> = data.programmables[..usize::from(
        data.num_programmables,
    )
    .min(data.programmables.len())]
        .iter()
        .map(|programmable| {
            json!({
                "name": fixed_str(&programmable.name),
                "revision": fixed_str(&programmable.revision),
            })
        })
        .collect();
    json!({
        "op_status": result.op_status.as_static_str(),
        "emc_part_number": fixed_str(&data.emc_part_number),
        "emc_artwork_revision": fixed_str(&data.emc_artwork_revision),
        "emc_assembly_revision": fixed_str(&data.emc_assembly_revision),
        "emc_serial_number": fixed_str(&data.emc_serial_number),
        "vendor_part_number": fixed_str(&data.vendor_part_number),
        "vendor_artwork_revision": fixed_str(&data.vendor_artwork_revision),
        "vendor_assembly_revision": fixed_str(&data.vendor_assembly_revision),
        "vendor_serial_number": fixed_str(&data.vendor_serial_number),
        "vendor_name": fixed_str(&data.vendor_name),
        "location_of_manufacture": fixed_str(&data.location_of_manufacture),
        "year_of_manufacture": fixed_str(&data.year_of_manufacture),
        "month_of_manufacture": fixed_str(&data.month_of_manufacture),
        "day_of_manufacture": fixed_str(&data.day_of_manufacture),
        "assembly_name": fixed_str(&data.assembly_name),
        "programmables": programmables,
        "wwn_seed": data.wwn_seed,
        "sas_address": format!(
            "{:02x}{:02x}{:02x}{:02x}",
            data.sas_address[0],
            data.sas_address[1],
            data.sas_address[2],
            data.sas_address[3],
        ),
        "product_part_number": fixed_str(&data.product_part_number),
        "product_serial_number": fixed_str(&data.product_serial_number),
        "product_revision": fixed_str(&data.product_revision),
        "system_type": data.system_type,
        "checksum": data.checksum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use esp_messages::resume_prom::ResumePromData;
    use esp_messages::resume_prom::ResumePromOpStatus;

    fn copy_into<const N: usize>(text: &str) -> [u8; N] {
        let mut out = [0; N];
        out[..text.len()].copy_from_slice(text.as_bytes());
        out
    }

    #[test]
    fn info_lines_decode_fixed_width_fields() {
        let result = ResumePromReadResult {
            op_status: ResumePromOpStatus::ReadSuccess,
            data: ResumePromData {
                emc_part_number: copy_into("100-520-123"),
                emc_serial_number: copy_into("CF2AB120900001"),
                vendor_name: copy_into("ACME STORAGE"),
                year_of_manufacture: copy_into("2015"),
                month_of_manufacture: copy_into("07"),
                day_of_manufacture: copy_into("24"),
                num_programmables: 1,
                wwn_seed: 0xcafe,
                checksum: 0x1234abcd,
                ..ResumePromData::default()
            },
        };

        let lines = info_lines(&result);
        assert!(lines.contains(&"op status: READ_SUCCESS".to_string()));
        assert!(
            lines.contains(&"EMC part number: 100-520-123".to_string())
        );
        assert!(lines
            .contains(&"EMC serial number: CF2AB120900001".to_string()));
        assert!(lines.contains(&"vendor name: ACME STORAGE".to_string()));
        assert!(
            lines.contains(&"date of manufacture: 2015-07-24".to_string())
        );
        assert!(lines.contains(&"wwn seed: 0xcafe".to_string()));
        assert!(lines.contains(&"checksum: 0x1234abcd".to_string()));
        // one empty programmable entry
        assert!(lines.contains(&"programmable : rev ".to_string()));
    }
}
