// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Firmware upgrade subcommands.

use crate::fixed_str;
use crate::Output;
use crate::TargetArgs;
use anyhow::Result;
use clap::Subcommand;
use esp_messages::device::create_device_string;
use esp_messages::device::DeviceLocation;
use esp_messages::device::DeviceType;
use esp_messages::device::DEVICE_STRING_LENGTH;
use esp_messages::fup::FupForceFlags;
use esp_obj_comms::fup;
use esp_obj_comms::EnvClient;
use serde_json::json;

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum FupCommand {
    /// Start a firmware upgrade on one device, or on every device of a
    /// type when no location flag is given.
    Initiate {
        device: DeviceType,
        #[clap(flatten)]
        target: TargetArgs,
        /// Force flag (repeatable): norevcheck, singlesp, noenvcheck,
        /// readimage, readmanifest, noprioritycheck, nobadimagecheck,
        /// deferactivation, all.
        #[clap(long = "force")]
        force: Vec<FupForceFlags>,
        /// Seconds each device waits before starting its upgrade.
        #[clap(long, default_value = "0")]
        delay: u32,
    },

    /// Upgrade work state and completion status per programmable
    /// component.
    Status {
        device: DeviceType,
        #[clap(flatten)]
        target: TargetArgs,
    },

    /// Current and prior firmware revisions per programmable component.
    Revision {
        device: DeviceType,
        #[clap(flatten)]
        target: TargetArgs,
    },

    /// State of the upgrade state machine for one device.
    WorkState {
        device: DeviceType,
        #[clap(flatten)]
        target: TargetArgs,
    },

    /// Firmware manifest entries for a device type.
    Manifest { device: DeviceType },

    /// Abort in-progress upgrades in every management class.
    Abort,

    /// Resume previously aborted upgrades in every management class.
    Resume,

    /// Terminate upgrades in every management class.
    Terminate,

    /// Report whether any upgrade is currently in progress.
    InProgress,
}

fn target_label(device_type: DeviceType, location: &DeviceLocation) -> String {
    create_device_string(device_type, location, DEVICE_STRING_LENGTH)
        .unwrap_or_else(|_| device_type.name().to_string())
}

pub(crate) async fn run(
    client: &EnvClient,
    command: FupCommand,
    json: bool,
) -> Result<Output> {
    match command {
        FupCommand::Initiate { device, target, force, delay } => {
            let force_flags = force
                .iter()
                .fold(FupForceFlags::empty(), |acc, &flag| acc | flag);
            let targets = fup::initiate_upgrade(
                client,
                device,
                target.explicit_location(),
                force_flags,
                delay,
            )
            .await?;
            let labels: Vec<String> = targets
                .iter()
                .map(|location| target_label(device, location))
                .collect();
            if json {
                Ok(Output::Json(json!({ "initiated": labels })))
            } else {
                Ok(Output::Lines(
                    labels
                        .into_iter()
                        .map(|label| format!("initiated upgrade: {label}"))
                        .collect(),
                ))
            }
        }

        FupCommand::Status { device, target } => {
            let rows = fup::collect_status(
                client,
                device,
                target.explicit_location(),
            )
            .await?;
            if json {
                let rows: Vec<_> = rows
                    .iter()
                    .map(|row| {
                        json!({
                            "target": target_label(device, &row.location),
                            "components": row
                                .info
                                .entries()
                                .iter()
                                .map(|entry| {
                                    json!({
                                        "component_id": entry.component_id,
                                        "work_state": entry
                                            .work_state
                                            .as_static_str(),
                                        "completion_status": entry
                                            .completion_status
                                            .as_static_str(),
                                    })
                                })
                                .collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                return Ok(Output::Json(json!(rows)));
            }
            let mut lines = Vec::new();
            for row in rows {
                lines.push(format!(
                    "{}:",
                    target_label(device, &row.location)
                ));
                for entry in row.info.entries() {
                    lines.push(format!(
                        "  component {}: {} ({})",
                        entry.component_id,
                        entry.work_state.as_static_str(),
                        entry.completion_status.as_static_str(),
                    ));
                }
            }
            Ok(Output::Lines(lines))
        }

        FupCommand::Revision { device, target } => {
            let rows = fup::collect_status(
                client,
                device,
                target.explicit_location(),
            )
            .await?;
            if json {
                let rows: Vec<_> = rows
                    .iter()
                    .map(|row| {
                        json!({
                            "target": target_label(device, &row.location),
                            "components": row
                                .info
                                .entries()
                                .iter()
                                .map(|entry| {
                                    json!({
                                        "component_id": entry.component_id,
                                        "current_rev": fixed_str(
                                            &entry.current_firmware_rev
                                        ),
                                        "prior_rev": fixed_str(
                                            &entry.pre_firmware_rev
                                        ),
                                    })
                                })
                                .collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                return Ok(Output::Json(json!(rows)));
            }
            let mut lines = Vec::new();
            for row in rows {
                lines.push(format!(
                    "{}:",
                    target_label(device, &row.location)
                ));
                for entry in row.info.entries() {
                    lines.push(format!(
                        "  component {}: rev {} (prior {})",
                        entry.component_id,
                        fixed_str(&entry.current_firmware_rev),
                        fixed_str(&entry.pre_firmware_rev),
                    ));
                }
            }
            Ok(Output::Lines(lines))
        }

        FupCommand::WorkState { device, target } => {
            let state = client
                .get_fup_work_state(device, target.location())
                .await?;
            if json {
                Ok(Output::Json(json!({
                    "work_state": state.as_static_str()
                })))
            } else {
                Ok(Output::Lines(vec![format!(
                    "work state: {}",
                    state.as_static_str()
                )]))
            }
        }

        FupCommand::Manifest { device } => {
            let entries = fup::read_manifest(client, device).await?;
            if json {
                let entries: Vec<_> = entries
                    .iter()
                    .map(|entry| {
                        json!({
                            "product_id": fixed_str(
                                &entry.subencl_product_id
                            ),
                            "images": entry
                                .images()
                                .iter()
                                .map(|image| {
                                    json!({
                                        "file": fixed_str(
                                            &image.image_file_name
                                        ),
                                        "rev": fixed_str(&image.image_rev),
                                        "target": image
                                            .firmware_target
                                            .as_static_str(),
                                    })
                                })
                                .collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                return Ok(Output::Json(json!(entries)));
            }
            if entries.is_empty() {
                return Ok(Output::Lines(vec![
                    "no manifest entries".to_string()
                ]));
            }
            let mut lines = Vec::new();
            for entry in entries {
                lines.push(format!(
                    "{}:",
                    fixed_str(&entry.subencl_product_id)
                ));
                for image in entry.images() {
                    lines.push(format!(
                        "  {} rev {} target {}",
                        fixed_str(&image.image_file_name),
                        fixed_str(&image.image_rev),
                        image.firmware_target.as_static_str(),
                    ));
                }
            }
            Ok(Output::Lines(lines))
        }

        FupCommand::Abort => {
            fup::abort_all_upgrades(client).await?;
            class_op_output(json, "aborted")
        }
        FupCommand::Resume => {
            fup::resume_all_upgrades(client).await?;
            class_op_output(json, "resumed")
        }
        FupCommand::Terminate => {
            fup::terminate_all_upgrades(client).await?;
            class_op_output(json, "terminated")
        }

        FupCommand::InProgress => {
            let in_progress = client.any_upgrade_in_progress().await?;
            if json {
                Ok(Output::Json(json!({ "in_progress": in_progress })))
            } else {
                Ok(Output::Lines(vec![format!(
                    "upgrade in progress: {in_progress}"
                )]))
            }
        }
    }
}

fn class_op_output(json: bool, verb: &str) -> Result<Output> {
    if json {
        Ok(Output::Json(json!({ "result": verb })))
    } else {
        Ok(Output::Lines(vec![format!(
            "{verb} upgrades in all management classes"
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::FakeControlPort;
    use esp_messages::fup::FupWorkState;
    use esp_messages::ObjRequest;
    use esp_messages::ObjResponse;
    use esp_obj_comms::PortRetryConfig;
    use slog::o;
    use slog::Logger;
    use std::time::Duration;

    #[test]
    fn force_flags_fold_together() {
        let flags = [FupForceFlags::NO_REV_CHECK, FupForceFlags::SINGLE_SP_MODE]
            .iter()
            .fold(FupForceFlags::empty(), |acc, &flag| acc | flag);
        assert!(flags.contains(FupForceFlags::NO_REV_CHECK));
        assert!(flags.contains(FupForceFlags::SINGLE_SP_MODE));
        assert!(!flags.contains(FupForceFlags::NO_ENV_CHECK));
    }

    #[tokio::test]
    async fn work_state_command_formats_state() {
        let client = EnvClient::new(
            Box::new(FakeControlPort::new(|request, _| match request {
                ObjRequest::GetFupWorkState { .. } => {
                    ObjResponse::FupWorkState(FupWorkState::DownloadImageSent)
                }
                other => panic!("unexpected request: {other:?}"),
            })),
            PortRetryConfig {
                per_attempt_timeout: Duration::from_secs(1),
                max_attempts: 3,
            },
            &Logger::root(slog::Discard, o!()),
        );

        let target = TargetArgs {
            bus: Some(0),
            enclosure: Some(0),
            slot: Some(0),
            component_id: None,
            sp: None,
            xpe: false,
        };
        let output = run(
            &client,
            FupCommand::WorkState { device: DeviceType::Lcc, target },
            false,
        )
        .await
        .unwrap();
        let Output::Lines(lines) = output else {
            panic!("expected line output");
        };
        assert_eq!(lines, vec!["work state: DOWNLOAD_IMAGE_SENT"]);
    }
}
