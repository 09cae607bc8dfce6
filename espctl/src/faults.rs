// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The fault report: walk every device the management objects know
//! about and print one line per faulted device.
//!
//! A device that cannot be queried is logged and skipped rather than
//! reported as faulted; only a failure to learn the array topology
//! itself aborts the scan.

use crate::Output;
use anyhow::Result;
use clap::ValueEnum;
use esp_messages::device::DeviceLocation;
use esp_messages::device::DeviceType;
use esp_messages::device::SpId;
use esp_messages::device::PHYSICAL_BUS_COUNT;
use esp_messages::fault_led::EnclFaultLedReason;
use esp_messages::fault_string::FaultString;
use esp_messages::status::CableStatus;
use esp_messages::status::CacheStatus;
use esp_messages::status::EnclState;
use esp_messages::status::MgmtStatus;
use esp_messages::status::ModuleState;
use esp_messages::status::ModuleSubstate;
use esp_messages::status::PeerBootState;
use esp_messages::status::PortState;
use esp_messages::status::PortSubstate;
use esp_messages::status::SpsCablingStatus;
use esp_messages::status::SpsState;
use esp_messages::status::SuitcaseState;
use esp_messages::BoardInfo;
use esp_messages::CacheStatusResponder;
use esp_messages::EnclosureInfo;
use esp_messages::ModuleInfo;
use esp_messages::ModuleLimits;
use esp_obj_comms::resume_prom;
use esp_obj_comms::EnvClient;
use serde_json::json;
use slog::warn;

/// Which management package to scan for faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Package {
    /// Environmental services.
    Esp,
    /// Physical package (not implemented).
    Pp,
    /// Storage enclosure processor (not implemented).
    Sep,
}

pub(crate) async fn run(
    client: &EnvClient,
    package: Package,
    json: bool,
) -> Result<Output> {
    match package {
        Package::Pp | Package::Sep => {
            if json {
                Ok(Output::Json(json!("Not implemented.")))
            } else {
                Ok(Output::Lines(vec!["Not implemented.".to_string()]))
            }
        }
        Package::Esp => {
            let faults = scan_esp(client).await?;
            if json {
                Ok(Output::Json(json!({
                    "any_fault": !faults.is_empty(),
                    "faults": faults,
                })))
            } else if faults.is_empty() {
                Ok(Output::Lines(vec![
                    "No ESP faults detected.".to_string()
                ]))
            } else {
                Ok(Output::Lines(faults))
            }
        }
    }
}

/// Full array scan. Devices are visited in a fixed order: the local
/// board, the peer's fault register, suitcases, BMCs, each module
/// class, management modules, standby power supplies, BBUs, and then
/// every enclosure and its FRUs.
async fn scan_esp(client: &EnvClient) -> Result<Vec<String>> {
    let board = client.get_board_info().await?;
    let limits = client.get_limits_info().await?;

    // Board devices live at the xPE pseudo-enclosure on chassis-based
    // platforms and at bus 0 / enclosure 0 everywhere else.
    let chassis = if board.is_xpe {
        DeviceLocation::xpe()
    } else {
        DeviceLocation::default()
    };

    let mut out = Vec::new();
    scan_sp(client, &mut out, &board, chassis).await;
    scan_fault_register(client, &mut out).await;
    scan_suitcases(client, &mut out, &board).await;
    scan_bmcs(client, &mut out, &board).await;
    scan_modules(
        client,
        &mut out,
        DeviceType::IoModule,
        "IO Module",
        limits.num_slic_slots,
        &limits,
    )
    .await;
    scan_modules(
        client,
        &mut out,
        DeviceType::Mezzanine,
        "Mezzanine",
        limits.num_mezzanine_slots,
        &limits,
    )
    .await;
    scan_modules(
        client,
        &mut out,
        DeviceType::BackEndModule,
        "Base Module",
        limits.num_bem,
        &limits,
    )
    .await;
    scan_mgmt_modules(client, &mut out, &limits).await;
    scan_sps(client, &mut out, &board).await;
    scan_bbus(client, &mut out).await;
    scan_enclosures(client, &mut out, &board).await;
    Ok(out)
}

/// `ENCL b_e` label (`SPE` for the chassis pseudo-enclosure), used by
/// the enclosure, LCC, and connector lines.
fn encl_label(base: &DeviceLocation) -> String {
    if base.is_xpe() {
        "SPE".to_string()
    } else {
        format!("ENCL {}_{}", base.bus, base.enclosure)
    }
}

/// `Encl b_e` label (`xPE` for the chassis pseudo-enclosure), used by
/// the fan, power supply, and drive lines.
fn cooling_label(base: &DeviceLocation) -> String {
    if base.is_xpe() {
        "xPE".to_string()
    } else {
        format!("Encl {}_{}", base.bus, base.enclosure)
    }
}

/// Read one resume PROM and yield its operation status if the last
/// read ended in a fault. Query failures are logged and read as
/// no-fault.
async fn resume_prom_fault(
    client: &EnvClient,
    device_type: DeviceType,
    location: DeviceLocation,
) -> Option<&'static str> {
    match resume_prom::get_resume_prom_info(client, device_type, location)
        .await
    {
        Ok(result) if result.op_status.is_fault() => {
            Some(result.op_status.as_static_str())
        }
        Ok(_) => None,
        Err(err) => {
            warn!(
                client.log(), "resume prom query failed during fault scan";
                "device_type" => device_type.name(),
                "err" => %err,
            );
            None
        }
    }
}

async fn scan_sp(
    client: &EnvClient,
    out: &mut Vec<String>,
    board: &BoardInfo,
    chassis: DeviceLocation,
) {
    let mut fs = FaultString::new();
    if board.low_battery {
        fs.append("Low Battery");
    }
    if board.engine_id_fault {
        fs.append("engineIdFault");
    }
    if !board.peer_present {
        fs.append("Peer Removed");
    }
    match board.internal_cable_status {
        CableStatus::Missing => fs.append("Missing Internal SPC Cable"),
        CableStatus::Crossed => fs.append("Internal SPC Cross Cabled"),
        _ => {}
    }

    // An invalid system serial number surfaces through the chassis
    // enclosure's fault LED reason.
    match client.get_encl_info(chassis).await {
        Ok(info) => {
            if info
                .encl_fault_led_reason
                .contains(EnclFaultLedReason::SYSTEM_SERIAL_NUMBER_FLT)
            {
                fs.append("System SN Invalid");
            }
        }
        Err(err) => {
            warn!(
                client.log(), "chassis enclosure query failed";
                "err" => %err,
            );
        }
    }

    let (_, faults) = fs.finish();
    if !faults.is_empty() {
        out.push(format!("SP: {faults}"));
    }

    for sp in SpId::BOTH {
        let location = DeviceLocation { sp: sp as u8, slot: 0, ..chassis };
        if let Some(phrase) =
            resume_prom_fault(client, DeviceType::Sp, location).await
        {
            out.push(format!("{sp} Resume Prom: {phrase}"));
        }
    }
}

async fn scan_fault_register(client: &EnvClient, out: &mut Vec<String>) {
    let info = match client.get_peer_boot_info().await {
        Ok(info) => info,
        Err(err) => {
            warn!(client.log(), "peer boot query failed"; "err" => %err);
            return;
        }
    };

    let mut fs = FaultString::new();
    if info.peer_boot_state == PeerBootState::Hung {
        fs.append("Peer Hung");
    }
    if info.is_fault_reg_fail {
        fs.append("Peer FltReg Fault");
    }
    let (_, faults) = fs.finish();
    if !faults.is_empty() {
        out.push(format!("SP FltReg: {faults}"));
    }
}

async fn scan_suitcases(
    client: &EnvClient,
    out: &mut Vec<String>,
    board: &BoardInfo,
) {
    for sp in SpId::BOTH {
        for slot in 0..board.suitcase_count_per_blade {
            let info = match client.get_suitcase_info(sp, slot).await {
                Ok(info) => info,
                Err(err) => {
                    warn!(
                        client.log(), "suitcase query failed";
                        "sp" => %sp, "slot" => slot, "err" => %err,
                    );
                    continue;
                }
            };

            let mut fs = FaultString::new();
            if let Some(phrase) = info.env_interface_status.phrase() {
                fs.append(phrase);
            }
            if info.shutdown_warning {
                fs.append("shutdownWarning");
            }
            if info.ambient_overtemp_fault {
                fs.append("ambientOvertempFault");
            }
            if info.ambient_overtemp_warning {
                fs.append("ambientOvertempWarning");
            }
            if info.state == SuitcaseState::Fault {
                if let Some(phrase) = info.substate.phrase() {
                    fs.append(phrase);
                }
            }
            let (_, faults) = fs.finish();
            if !faults.is_empty() {
                out.push(format!("{sp} Suitcase {slot}: {faults}"));
            }
        }
    }
}

async fn scan_bmcs(
    client: &EnvClient,
    out: &mut Vec<String>,
    board: &BoardInfo,
) {
    for sp in SpId::BOTH {
        for slot in 0..board.bmc_count_per_blade {
            let info = match client.get_bmc_info(sp, slot).await {
                Ok(info) => info,
                Err(err) => {
                    warn!(
                        client.log(), "bmc query failed";
                        "sp" => %sp, "slot" => slot, "err" => %err,
                    );
                    continue;
                }
            };

            if info.shutdown_warning {
                out.push(format!("{sp} BMC {slot}: shutdownWarning"));
            }
        }
    }
}

/// Module substates the report spells out when a module is faulted; any
/// other substate under a faulted module reads as an unknown fault.
fn faulted_module_phrase(substate: ModuleSubstate) -> &'static str {
    match substate {
        ModuleSubstate::IncorrectModule
        | ModuleSubstate::PoweredOff
        | ModuleSubstate::PowerUpFailed
        | ModuleSubstate::InternalFanFaulted
        | ModuleSubstate::FaultRegisterFailed => {
            substate.phrase().unwrap_or("Unknown Fault")
        }
        _ => "Unknown Fault",
    }
}

async fn scan_modules(
    client: &EnvClient,
    out: &mut Vec<String>,
    device_type: DeviceType,
    label: &str,
    slot_count: u32,
    limits: &ModuleLimits,
) {
    for sp in SpId::BOTH {
        for slot in 0..slot_count {
            let info =
                match client.get_module_info(device_type, sp, slot).await {
                    Ok(info) => info,
                    Err(err) => {
                        warn!(
                            client.log(), "module query failed";
                            "device_type" => device_type.name(),
                            "sp" => %sp, "slot" => slot, "err" => %err,
                        );
                        continue;
                    }
                };
            let status =
                match client.get_module_status(device_type, sp, slot).await {
                    Ok(status) => status,
                    Err(err) => {
                        warn!(
                            client.log(), "module status query failed";
                            "device_type" => device_type.name(),
                            "sp" => %sp, "slot" => slot, "err" => %err,
                        );
                        continue;
                    }
                };
            if !info.inserted.is_true() {
                continue;
            }

            let mut fs = FaultString::new();
            match status.state {
                ModuleState::Unsupported => {
                    if status.substate
                        == ModuleSubstate::UnsupportedNotCommitted
                    {
                        if let Some(phrase) = status.substate.phrase() {
                            fs.append(phrase);
                        }
                    } else {
                        fs.append("Unsupported");
                    }
                }
                ModuleState::Faulted => {
                    fs.append(faulted_module_phrase(status.substate));
                }
                _ => {}
            }
            let (_, faults) = fs.finish();
            if !faults.is_empty() {
                out.push(format!("{sp} {label} {slot}: {faults}"));
            }

            let rp_location = DeviceLocation {
                sp: sp as u8,
                slot,
                ..DeviceLocation::default()
            };
            if let Some(phrase) =
                resume_prom_fault(client, device_type, rp_location).await
            {
                out.push(format!(
                    "{sp} {label} {slot} Resume Prom: {phrase}"
                ));
            }

            scan_module_ports(client, out, device_type, label, sp, slot, &info, limits)
                .await;
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn scan_module_ports(
    client: &EnvClient,
    out: &mut Vec<String>,
    device_type: DeviceType,
    label: &str,
    sp: SpId,
    slot: u32,
    info: &ModuleInfo,
    limits: &ModuleLimits,
) {
    for port in 0..limits.num_ports {
        // Port queries are addressed by the module's slot number on the
        // blade, not by its slot within its own class.
        let port_info = match client
            .get_io_port_info(device_type, sp, info.slot_num_on_blade, port)
            .await
        {
            Ok(port_info) => port_info,
            Err(err) => {
                warn!(
                    client.log(), "port query failed";
                    "device_type" => device_type.name(),
                    "sp" => %sp, "slot" => slot, "port" => port,
                    "err" => %err,
                );
                continue;
            }
        };

        let phrase = match port_info.port_state {
            PortState::Faulted => Some(match port_info.port_substate {
                PortSubstate::IncorrectModule
                | PortSubstate::UnsupportedSfp
                | PortSubstate::SfpReadError
                | PortSubstate::SfpFaulted
                | PortSubstate::ExceededMaxLimits => {
                    port_info.port_substate.phrase().unwrap_or("Unknown Fault")
                }
                _ => "Unknown Fault",
            }),
            PortState::Unknown => match port_info.port_substate {
                PortSubstate::ModulePoweredOff
                | PortSubstate::ModuleReadError
                | PortSubstate::UnsupportedModule => {
                    port_info.port_substate.phrase()
                }
                _ => None,
            },
            _ => None,
        };
        if let Some(phrase) = phrase {
            out.push(format!("{sp} {label} {slot} port {port}: {phrase}"));
        }
    }
}

async fn scan_mgmt_modules(
    client: &EnvClient,
    out: &mut Vec<String>,
    limits: &ModuleLimits,
) {
    for sp in SpId::BOTH {
        for slot in 0..limits.num_mgmt_modules {
            let info = match client.get_mgmt_comp_info(sp, slot).await {
                Ok(info) => info,
                Err(err) => {
                    warn!(
                        client.log(), "mgmt module query failed";
                        "sp" => %sp, "slot" => slot, "err" => %err,
                    );
                    continue;
                }
            };

            let mut fs = FaultString::new();
            if !info.inserted.is_true() {
                fs.append("Removed");
            } else {
                if info.general_fault.is_true() {
                    fs.append("General Fault");
                }
                if let Some(phrase) = info.env_interface_status.phrase() {
                    fs.append(phrase);
                }
            }
            let (_, faults) = fs.finish();
            if !faults.is_empty() {
                out.push(format!("{sp} Mgmt Module {slot}: {faults}"));
            }

            let rp_location = DeviceLocation {
                sp: sp as u8,
                slot,
                ..DeviceLocation::default()
            };
            if let Some(phrase) =
                resume_prom_fault(client, DeviceType::MgmtModule, rp_location)
                    .await
            {
                out.push(format!(
                    "{sp} MGMT Module {slot} Resume Prom: {phrase}"
                ));
            }
        }
    }
}

async fn scan_sps(
    client: &EnvClient,
    out: &mut Vec<String>,
    board: &BoardInfo,
) {
    let mut bases = Vec::new();
    if board.is_xpe {
        bases.push(DeviceLocation::xpe());
    }
    for bus in 0..PHYSICAL_BUS_COUNT {
        let encl_count = match client.get_encl_count_on_bus(bus).await {
            Ok(count) => count,
            Err(err) => {
                warn!(
                    client.log(), "enclosure count query failed";
                    "bus" => bus, "err" => %err,
                );
                continue;
            }
        };
        for enclosure in 0..encl_count {
            bases.push(DeviceLocation {
                bus,
                enclosure,
                ..DeviceLocation::default()
            });
        }
    }

    let mut populated = Vec::new();
    let mut total = 0;
    for base in bases {
        match client.get_sps_count(base).await {
            Ok(0) => {}
            Ok(count) => {
                total += count;
                populated.push((base, count));
            }
            Err(err) => {
                warn!(
                    client.log(), "sps count query failed";
                    "bus" => base.bus, "enclosure" => base.enclosure,
                    "err" => %err,
                );
            }
        }
    }
    if total == 0 {
        return;
    }

    match client.get_cache_status(CacheStatusResponder::Sps).await {
        Ok(status) => {
            if status == CacheStatus::Failed || status.is_shutdown() {
                out.push(format!("SPS: Cache {status}"));
            }
        }
        Err(err) => {
            warn!(client.log(), "sps cache query failed"; "err" => %err);
        }
    }

    for (base, count) in populated {
        for slot in 0..count {
            let location = DeviceLocation { slot, ..base };
            let status = match client.get_sps_status(location).await {
                Ok(status) => status,
                Err(err) => {
                    warn!(
                        client.log(), "sps status query failed";
                        "bus" => base.bus, "enclosure" => base.enclosure,
                        "slot" => slot, "err" => %err,
                    );
                    continue;
                }
            };

            let mut fs = FaultString::new();
            if !status.sps_module_inserted {
                fs.append("Module Removed");
            } else {
                if status.dual_component_sps && !status.sps_battery_inserted
                {
                    fs.append("Battery Removed");
                }
                if status.status == SpsState::Faulted {
                    let phrase = status.fault_info.phrase();
                    if phrase != "None" {
                        fs.append(phrase);
                    }
                }
                if status.cabling_status != SpsCablingStatus::Valid {
                    fs.append(status.cabling_status.phrase());
                }
            }
            let (_, faults) = fs.finish();
            if !faults.is_empty() {
                let label = if base.is_xpe() {
                    format!("SPE SPS {slot}")
                } else {
                    format!(
                        "ENCL {}_{} SPS {slot}",
                        base.bus, base.enclosure
                    )
                };
                out.push(format!("{label}: {faults}"));
            }
        }
    }
}

async fn scan_bbus(client: &EnvClient, out: &mut Vec<String>) {
    let count = match client.get_bob_count().await {
        Ok(count) => count,
        Err(err) => {
            warn!(client.log(), "bbu count query failed"; "err" => %err);
            return;
        }
    };

    for index in 0..count {
        let status = match client.get_bob_status(index).await {
            Ok(status) => status,
            Err(err) => {
                warn!(
                    client.log(), "bbu status query failed";
                    "index" => index, "err" => %err,
                );
                continue;
            }
        };

        let mut fs = FaultString::new();
        if !status.inserted {
            fs.append("Removed");
        } else if let Some(phrase) = status.battery_fault.phrase() {
            fs.append(phrase);
        }
        let (_, faults) = fs.finish();
        if !faults.is_empty() {
            out.push(format!("BBU {index}: {faults}"));
        }

        // BBUs hang off the SP blade; board management owns their
        // resume proms, addressed through the SP device type with the
        // BBU index in the slot field.
        let rp_location =
            DeviceLocation { slot: index, ..DeviceLocation::default() };
        if let Some(phrase) =
            resume_prom_fault(client, DeviceType::Sp, rp_location).await
        {
            out.push(format!("BBU {index} Resume Prom: {phrase}"));
        }
    }
}

async fn scan_enclosures(
    client: &EnvClient,
    out: &mut Vec<String>,
    board: &BoardInfo,
) {
    let mut bases = Vec::new();
    if board.is_xpe {
        bases.push(DeviceLocation::xpe());
    }
    for bus in 0..PHYSICAL_BUS_COUNT {
        let encl_count = match client.get_encl_count_on_bus(bus).await {
            Ok(count) => count,
            Err(err) => {
                warn!(
                    client.log(), "enclosure count query failed";
                    "bus" => bus, "err" => %err,
                );
                continue;
            }
        };
        for enclosure in 0..encl_count {
            bases.push(DeviceLocation {
                bus,
                enclosure,
                ..DeviceLocation::default()
            });
        }
    }

    for base in bases {
        let info = match client.get_encl_info(base).await {
            Ok(info) => info,
            Err(err) => {
                warn!(
                    client.log(), "enclosure query failed";
                    "bus" => base.bus, "enclosure" => base.enclosure,
                    "err" => %err,
                );
                continue;
            }
        };
        if !info.encl_present {
            continue;
        }

        scan_specific_encl(client, out, base, &info).await;
        scan_fans(client, out, base, info.fan_count).await;
        scan_ps(client, out, base).await;
        scan_drives(client, out, base).await;
    }
}

async fn scan_specific_encl(
    client: &EnvClient,
    out: &mut Vec<String>,
    base: DeviceLocation,
    info: &EnclosureInfo,
) {
    let label = encl_label(&base);

    let mut fs = FaultString::new();
    if info.encl_state == EnclState::Failed {
        if let Some(phrase) = info.encl_fault_symptom.phrase() {
            fs.append(phrase);
        }
    }
    if info.encl_fault_led_reason.contains(EnclFaultLedReason::OVERTEMP_FLT) {
        fs.append("overTempFailure");
    }
    if info
        .encl_fault_led_reason
        .contains(EnclFaultLedReason::SUBENCL_LIFECYCLE_FAIL)
    {
        fs.append("Sub Enclosure Lifecycle State Fail");
    }
    let (_, faults) = fs.finish();
    if !faults.is_empty() {
        out.push(format!("{label}: {faults}"));
    }

    if let Some(phrase) =
        resume_prom_fault(client, DeviceType::Enclosure, base).await
    {
        out.push(format!("{label} Resume Prom: {phrase}"));
    }
    if info.drive_midplane_count > 0 {
        if let Some(phrase) =
            resume_prom_fault(client, DeviceType::DriveMidplane, base).await
        {
            out.push(format!(
                "{label} Drive Midplane Resume Prom: {phrase}"
            ));
        }
    }

    for slot in 0..info.lcc_count {
        let location = DeviceLocation { slot, ..base };
        let lcc = match client.get_lcc_info(location).await {
            Ok(lcc) => lcc,
            Err(err) => {
                warn!(
                    client.log(), "lcc query failed";
                    "bus" => base.bus, "enclosure" => base.enclosure,
                    "slot" => slot, "err" => %err,
                );
                continue;
            }
        };

        let mut fs = FaultString::new();
        if !lcc.inserted {
            fs.append("Removed");
        } else if lcc.faulted {
            fs.append("General Fault");
        }
        let (_, faults) = fs.finish();
        if !faults.is_empty() {
            out.push(format!("{label} LCC {slot}: {faults}"));
        }

        if let Some(phrase) =
            resume_prom_fault(client, DeviceType::Lcc, location).await
        {
            out.push(format!("{label} LCC {slot} Resume Prom: {phrase}"));
        }
    }

    let connector_count = match client.get_connector_count(base).await {
        Ok(count) => count,
        Err(err) => {
            warn!(
                client.log(), "connector count query failed";
                "bus" => base.bus, "enclosure" => base.enclosure,
                "err" => %err,
            );
            return;
        }
    };
    for slot in 0..connector_count {
        let location = DeviceLocation { slot, ..base };
        let connector = match client.get_connector_info(location).await {
            Ok(connector) => connector,
            Err(err) => {
                warn!(
                    client.log(), "connector query failed";
                    "bus" => base.bus, "enclosure" => base.enclosure,
                    "slot" => slot, "err" => %err,
                );
                continue;
            }
        };
        if connector.is_local_fru
            && connector.cable_status == CableStatus::Degraded
        {
            out.push(format!(
                "{label} Connector {slot}: Cable Status Degraded"
            ));
        }
    }
}

async fn scan_fans(
    client: &EnvClient,
    out: &mut Vec<String>,
    base: DeviceLocation,
    fan_count: u32,
) {
    let label = cooling_label(&base);

    for slot in 0..fan_count {
        let location = DeviceLocation { slot, ..base };
        let fan = match client.get_fan_info(location).await {
            Ok(fan) => fan,
            Err(err) => {
                warn!(
                    client.log(), "fan query failed";
                    "bus" => base.bus, "enclosure" => base.enclosure,
                    "slot" => slot, "err" => %err,
                );
                continue;
            }
        };

        let mut fs = FaultString::new();
        if !fan.inserted.is_true() {
            fs.append("Removed");
        } else {
            if fan.fan_faulted.is_true() {
                fs.append("General Fault");
            }
            if fan.fan_degraded.is_true() {
                fs.append("Fan Degraded");
            }
            if fan.is_fault_reg_fail {
                fs.append("FaultReg Fault");
            }
            if fan.multi_fan_module_faulted.is_true() {
                fs.append("Multiple Fan Fault");
            }
            if let Some(phrase) = fan.env_interface_status.phrase() {
                fs.append(phrase);
            }
        }
        let (_, faults) = fs.finish();
        if !faults.is_empty() {
            out.push(format!("{label} Fan {slot}: {faults}"));
        }

        if fan.resume_prom_supported {
            if let Some(phrase) =
                resume_prom_fault(client, DeviceType::Fan, location).await
            {
                out.push(format!(
                    "{label} Fan Resume Prom {slot}: {phrase}"
                ));
            }
        }
    }
}

async fn scan_ps(
    client: &EnvClient,
    out: &mut Vec<String>,
    base: DeviceLocation,
) {
    let label = cooling_label(&base);

    let count = match client.get_ps_count(base).await {
        Ok(count) => count,
        Err(err) => {
            warn!(
                client.log(), "ps count query failed";
                "bus" => base.bus, "enclosure" => base.enclosure,
                "err" => %err,
            );
            return;
        }
    };

    for slot in 0..count {
        let location = DeviceLocation { slot, ..base };
        let ps = match client.get_ps_info(location).await {
            Ok(ps) => ps,
            Err(err) => {
                warn!(
                    client.log(), "ps query failed";
                    "bus" => base.bus, "enclosure" => base.enclosure,
                    "slot" => slot, "err" => %err,
                );
                continue;
            }
        };

        let mut fs = FaultString::new();
        if !ps.inserted {
            fs.append("Removed");
        } else {
            if ps.general_fault.is_true() {
                if ps.ac_fail.is_true() {
                    fs.append("General Fault/ACFail");
                } else {
                    fs.append("General Fault");
                }
            }
            if ps.internal_fan_fault.is_true() {
                fs.append("InternalFanFlt");
            }
            if ps.is_fault_reg_fail {
                fs.append("FaultReg Fault");
            }
            if ps.general_fault == MgmtStatus::Unknown {
                fs.append("Unknown Fault");
            }
            if let Some(phrase) = ps.env_interface_status.phrase() {
                fs.append(phrase);
            }
        }
        let (_, faults) = fs.finish();
        if !faults.is_empty() {
            out.push(format!("{label} PS {slot}: {faults}"));
        }

        if let Some(phrase) =
            resume_prom_fault(client, DeviceType::Ps, location).await
        {
            out.push(format!("{label} PS Resume Prom {slot}: {phrase}"));
        }
    }
}

async fn scan_drives(
    client: &EnvClient,
    out: &mut Vec<String>,
    base: DeviceLocation,
) {
    let label = cooling_label(&base);

    let count = match client.get_drive_slot_count(base).await {
        Ok(count) => count,
        Err(err) => {
            warn!(
                client.log(), "drive slot count query failed";
                "bus" => base.bus, "enclosure" => base.enclosure,
                "err" => %err,
            );
            return;
        }
    };

    for slot in 0..count {
        let location = DeviceLocation { slot, ..base };
        let drive = match client.get_drive_info(location).await {
            Ok(drive) => drive,
            Err(err) => {
                warn!(
                    client.log(), "drive query failed";
                    "bus" => base.bus, "enclosure" => base.enclosure,
                    "slot" => slot, "err" => %err,
                );
                continue;
            }
        };
        if !drive.inserted {
            continue;
        }
        if let Some(phrase) = drive.state.fault_phrase() {
            out.push(format!("{label} Drive {slot}: {phrase}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::FakeControlPort;
    use esp_messages::status::BatteryFault;
    use esp_messages::status::DriveLifecycleState;
    use esp_messages::status::EnclFaultSymptom;
    use esp_messages::status::EnvInterfaceStatus;
    use esp_messages::status::LedStatus;
    use esp_messages::status::SpsFaultInfo;
    use esp_messages::BatteryStatus;
    use esp_messages::BoardInfo;
    use esp_messages::FanInfo;
    use esp_messages::ObjRequest;
    use esp_messages::ObjResponse;
    use esp_messages::PeerBootInfo;
    use esp_messages::ResumePromReadResult;
    use esp_messages::resume_prom::ResumePromData;
    use esp_messages::resume_prom::ResumePromOpStatus;
    use esp_obj_comms::PortRetryConfig;
    use slog::o;
    use slog::Logger;
    use std::time::Duration;

    fn test_client<F>(handler: F) -> EnvClient
    where
        F: Fn(ObjRequest, &[u8]) -> ObjResponse + Send + Sync + 'static,
    {
        EnvClient::new(
            Box::new(FakeControlPort::new(handler)),
            PortRetryConfig {
                per_attempt_timeout: Duration::from_secs(1),
                max_attempts: 3,
            },
            &Logger::root(slog::Discard, o!()),
        )
    }

    fn quiet_board() -> BoardInfo {
        BoardInfo {
            low_battery: false,
            engine_id_fault: false,
            peer_present: true,
            internal_cable_status: CableStatus::Valid,
            is_xpe: false,
            suitcase_count_per_blade: 0,
            bmc_count_per_blade: 0,
            cache_card_count: 0,
            ssd_count: 0,
        }
    }

    fn healthy_enclosure() -> EnclosureInfo {
        EnclosureInfo {
            encl_present: true,
            encl_state: EnclState::Ok,
            encl_fault_symptom: EnclFaultSymptom::None,
            encl_fault_led_reason: EnclFaultLedReason::default(),
            encl_fault_led_status: LedStatus::Off,
            shutdown_reason: 0,
            lcc_count: 0,
            fan_count: 0,
            ps_count: 0,
            drive_slot_count: 0,
            drive_midplane_count: 0,
            connector_count: 0,
            sps_count: 0,
        }
    }

    fn healthy_fan() -> FanInfo {
        FanInfo {
            inserted: MgmtStatus::True,
            fan_faulted: MgmtStatus::False,
            fan_degraded: MgmtStatus::False,
            is_fault_reg_fail: false,
            multi_fan_module_faulted: MgmtStatus::False,
            resume_prom_supported: false,
            env_interface_status: EnvInterfaceStatus::Good,
        }
    }

    /// Shared healthy topology: an empty single-bus array with one
    /// enclosure. Tests layer fault injections on top of this.
    fn base_response(request: &ObjRequest) -> ObjResponse {
        match request {
            ObjRequest::GetBoardInfo => {
                ObjResponse::BoardInfo(quiet_board())
            }
            ObjRequest::GetPeerBootInfo => {
                ObjResponse::PeerBootInfo(PeerBootInfo {
                    peer_boot_state: PeerBootState::Success,
                    is_fault_reg_fail: false,
                })
            }
            ObjRequest::GetLimitsInfo => {
                ObjResponse::LimitsInfo(esp_messages::ModuleLimits::default())
            }
            ObjRequest::GetEnclCountOnBus { bus } => {
                ObjResponse::EnclCountOnBus(u32::from(*bus == 0))
            }
            ObjRequest::GetEnclInfo { .. } => {
                ObjResponse::EnclInfo(healthy_enclosure())
            }
            ObjRequest::GetSpsCount { .. } => ObjResponse::SpsCount(0),
            ObjRequest::GetBobCount => ObjResponse::BobCount(0),
            ObjRequest::GetConnectorCount { .. } => {
                ObjResponse::ConnectorCount(0)
            }
            ObjRequest::GetPsCount { .. } => ObjResponse::PsCount(0),
            ObjRequest::GetDriveSlotCount { .. } => {
                ObjResponse::DriveSlotCount(0)
            }
            ObjRequest::GetCacheStatus { .. } => {
                ObjResponse::CacheStatus(CacheStatus::Ok)
            }
            ObjRequest::GetResumePromInfo { .. } => {
                ObjResponse::ResumePromInfo(ResumePromReadResult {
                    op_status: ResumePromOpStatus::ReadSuccess,
                    data: ResumePromData::default(),
                })
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reports_single_fan_fault() {
        let client = test_client(|request, _| match request {
            ObjRequest::GetEnclInfo { .. } => {
                ObjResponse::EnclInfo(EnclosureInfo {
                    fan_count: 3,
                    ..healthy_enclosure()
                })
            }
            ObjRequest::GetFanInfo { location } => {
                ObjResponse::FanInfo(if location.slot == 2 {
                    FanInfo {
                        fan_faulted: MgmtStatus::True,
                        ..healthy_fan()
                    }
                } else {
                    healthy_fan()
                })
            }
            other => base_response(&other),
        });

        let faults = scan_esp(&client).await.unwrap();
        assert_eq!(faults, vec!["Encl 0_0 Fan 2: General Fault"]);
    }

    #[tokio::test]
    async fn clean_array_reports_nothing() {
        let client = test_client(|request, _| base_response(&request));
        let faults = scan_esp(&client).await.unwrap();
        assert!(faults.is_empty(), "unexpected faults: {faults:?}");

        let output =
            run(&client, Package::Esp, false).await.unwrap();
        let Output::Lines(lines) = output else {
            panic!("expected line output");
        };
        assert_eq!(lines, vec!["No ESP faults detected."]);
    }

    #[tokio::test]
    async fn removed_bbu_is_reported() {
        let client = test_client(|request, _| match request {
            ObjRequest::GetBobCount => ObjResponse::BobCount(1),
            ObjRequest::GetBobStatus { bob_index: 0 } => {
                ObjResponse::BobStatus(BatteryStatus {
                    inserted: false,
                    on_battery: false,
                    battery_fault: BatteryFault::None,
                    associated_sp: SpId::A,
                    slot_num_on_sp_blade: 0,
                    env_interface_status: EnvInterfaceStatus::Good,
                })
            }
            other => base_response(&other),
        });

        let faults = scan_esp(&client).await.unwrap();
        assert_eq!(faults, vec!["BBU 0: Removed"]);
    }

    #[tokio::test]
    async fn failed_drive_lifecycle_is_reported() {
        let client = test_client(|request, _| match request {
            ObjRequest::GetDriveSlotCount { .. } => {
                ObjResponse::DriveSlotCount(2)
            }
            ObjRequest::GetDriveInfo { location } => {
                ObjResponse::DriveInfo(esp_messages::DriveInfo {
                    inserted: true,
                    state: if location.slot == 1 {
                        DriveLifecycleState::Fail
                    } else {
                        DriveLifecycleState::Ready
                    },
                })
            }
            other => base_response(&other),
        });

        let faults = scan_esp(&client).await.unwrap();
        assert_eq!(faults, vec!["Encl 0_0 Drive 1: Lifecycle State Fail"]);
    }

    #[tokio::test]
    async fn faulted_sps_reports_fault_and_cache() {
        let client = test_client(|request, _| match request {
            ObjRequest::GetSpsCount { .. } => ObjResponse::SpsCount(1),
            ObjRequest::GetSpsStatus { .. } => {
                ObjResponse::SpsStatus(esp_messages::SpsStatus {
                    sps_module_inserted: true,
                    dual_component_sps: false,
                    sps_battery_inserted: false,
                    status: SpsState::Faulted,
                    cabling_status: SpsCablingStatus::Valid,
                    fault_info: SpsFaultInfo {
                        sps_module_fault: true,
                        sps_internal_fault: true,
                        ..SpsFaultInfo::default()
                    },
                    env_interface_status: EnvInterfaceStatus::Good,
                })
            }
            ObjRequest::GetCacheStatus { .. } => {
                ObjResponse::CacheStatus(CacheStatus::Failed)
            }
            other => base_response(&other),
        });

        let faults = scan_esp(&client).await.unwrap();
        assert_eq!(
            faults,
            vec![
                "SPS: Cache FAILED",
                "ENCL 0_0 SPS 0: InternalFault",
            ]
        );
    }

    #[tokio::test]
    async fn pp_and_sep_are_unimplemented() {
        let client = test_client(|request, _| base_response(&request));
        for package in [Package::Pp, Package::Sep] {
            let Output::Lines(lines) =
                run(&client, package, false).await.unwrap()
            else {
                panic!("expected line output");
            };
            assert_eq!(lines, vec!["Not implemented."]);
        }
    }
}
