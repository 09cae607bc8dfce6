// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use esp_messages::device::DeviceLocation;
use esp_messages::device::DeviceType;
use esp_messages::device::SpId;
use esp_messages::device::PHYSICAL_BUS_COUNT;
use esp_messages::SpsUnitManufInfo;
use esp_obj_comms::cache_status;
use esp_obj_comms::powerdown;
use esp_obj_comms::EnvClient;
use esp_obj_comms::PortRetryConfig;
use esp_obj_comms::UdpControlPort;
use serde_json::json;
use slog::info;
use slog::o;
use slog::Drain;
use slog::Level;
use slog::Logger;
use slog_async::AsyncGuard;
use std::fs::File;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

mod faults;
mod fup;
mod resume_prom;

/// Command line program for the ESP management objects: fault reports,
/// firmware upgrades, resume PROMs, cache status, and powerdown.
#[derive(Parser, Debug)]
struct Args {
    #[clap(
        short,
        long,
        default_value = "info",
        value_parser = level_from_str,
        help = "Log level: {off,critical,error,warn,info,debug,trace}",
    )]
    log_level: Level,

    /// Write logs to a file instead of stderr.
    #[clap(long)]
    logfile: Option<PathBuf>,

    /// Emit parseable JSON on stdout instead of human-readable lines.
    #[clap(long, value_names = ["pretty"], value_parser = json_pretty_from_str)]
    json: Option<Option<JsonPretty>>,

    /// Address of the management objects' control port.
    #[clap(long, default_value_t = esp_obj_comms::default_object_addr())]
    object_addr: SocketAddr,

    /// Maximum number of attempts to make for each request.
    #[clap(long, default_value = "5")]
    max_attempts: usize,

    /// Timeout (in milliseconds) for each attempt.
    #[clap(long, default_value = "2000")]
    per_attempt_timeout_millis: u64,

    #[clap(subcommand)]
    command: Command,
}

fn level_from_str(s: &str) -> Result<Level> {
    if let Ok(level) = s.parse() {
        Ok(level)
    } else {
        bail!(format!("Invalid log level: {}", s))
    }
}

#[derive(Debug, Clone, Copy)]
struct JsonPretty;

fn json_pretty_from_str(s: &str) -> Result<JsonPretty> {
    if s == "pretty" {
        Ok(JsonPretty)
    } else {
        bail!("expected \"pretty\"")
    }
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Report every detected environmental fault in the array.
    GetFaults {
        /// Package to scan.
        #[clap(value_enum, default_value_t = faults::Package::Esp)]
        package: faults::Package,
    },

    /// Firmware upgrade operations.
    #[clap(subcommand)]
    Fup(fup::FupCommand),

    /// Resume PROM (FRU identity EEPROM) operations.
    #[clap(subcommand)]
    ResumeProm(resume_prom::ResumePromCommand),

    /// Kick off a fresh resume PROM read for one device.
    ForceRpRead {
        device: DeviceType,
        #[clap(flatten)]
        target: TargetArgs,
    },

    /// Combined write-cache status across all management classes.
    CacheStatus,

    /// SPS status details for every standby power supply.
    SpsInfo {
        /// Also report manufacturing data (serial, part number,
        /// firmware revisions) for each SPS module and battery.
        #[clap(long)]
        manuf: bool,
    },

    /// Battery backup unit status details.
    BbuInfo {
        /// Also report manufacturing data for each BBU.
        #[clap(long)]
        manuf: bool,
    },

    /// Flush the system, quiesce the SPS, and reboot the local SP.
    Powerdown,
}

/// Device location flags shared by the commands that address a single
/// device. When no flag is given, commands that can enumerate targets
/// do so; the rest address bus 0 / enclosure 0 / slot 0 on SPA.
#[derive(clap::Args, Debug, Clone, Copy)]
struct TargetArgs {
    /// Backend bus number.
    #[clap(long)]
    bus: Option<u32>,

    /// Enclosure number on the bus.
    #[clap(long)]
    enclosure: Option<u32>,

    /// Slot within the enclosure or blade.
    #[clap(long)]
    slot: Option<u32>,

    /// Component id within the slot (SPS module/battery, LCC expander).
    #[clap(long)]
    component_id: Option<u32>,

    /// Storage processor the device hangs off (a or b).
    #[clap(long, value_parser = sp_from_str)]
    sp: Option<SpId>,

    /// Address the chassis xPE pseudo-enclosure instead of a backend bus.
    #[clap(long, conflicts_with_all = ["bus", "enclosure"])]
    xpe: bool,
}

impl TargetArgs {
    /// `None` when no location flag was given at all.
    fn explicit_location(&self) -> Option<DeviceLocation> {
        if self.bus.is_none()
            && self.enclosure.is_none()
            && self.slot.is_none()
            && self.component_id.is_none()
            && self.sp.is_none()
            && !self.xpe
        {
            return None;
        }
        Some(self.location())
    }

    fn location(&self) -> DeviceLocation {
        let base = if self.xpe {
            DeviceLocation::xpe()
        } else {
            DeviceLocation::default()
        };
        DeviceLocation {
            bus: self.bus.unwrap_or(base.bus),
            enclosure: self.enclosure.unwrap_or(base.enclosure),
            slot: self.slot.unwrap_or(0),
            component_id: self.component_id.unwrap_or(0),
            sp: self.sp.unwrap_or(SpId::A) as u8,
            ..base
        }
    }
}

fn sp_from_str(s: &str) -> Result<SpId> {
    match s {
        "a" | "spa" => Ok(SpId::A),
        "b" | "spb" => Ok(SpId::B),
        _ => bail!("Invalid SP: {s} (expected \"a\" or \"b\")"),
    }
}

fn build_logger(
    level: Level,
    path: Option<&Path>,
) -> Result<(Logger, AsyncGuard)> {
    fn make_drain<D: slog_term::Decorator + Send + 'static>(
        level: Level,
        decorator: D,
    ) -> (slog::Fuse<slog_async::Async>, AsyncGuard) {
        let drain = slog_term::FullFormat::new(decorator)
            .build()
            .filter_level(level)
            .fuse();
        let (drain, guard) = slog_async::Async::new(drain).build_with_guard();
        (drain.fuse(), guard)
    }

    let (drain, guard) = if let Some(path) = path {
        let file = File::create(path).with_context(|| {
            format!("failed to create logfile {}", path.display())
        })?;
        make_drain(level, slog_term::PlainDecorator::new(file))
    } else {
        make_drain(level, slog_term::TermDecorator::new().build())
    };

    Ok((Logger::root(drain, o!("component" => "espctl")), guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (log, _log_guard) =
        build_logger(args.log_level, args.logfile.as_deref())?;

    let retry_config = PortRetryConfig {
        per_attempt_timeout: Duration::from_millis(
            args.per_attempt_timeout_millis,
        ),
        max_attempts: args.max_attempts,
    };

    let port = UdpControlPort::connect(args.object_addr)
        .await
        .with_context(|| {
            format!("failed to connect to {}", args.object_addr)
        })?;
    let client = EnvClient::new(Box::new(port), retry_config, &log);

    let json = args.json.is_some();
    let mut did_fail = false;
    match run_command(&client, args.command, json, &log).await {
        Ok(Output::Json(value)) => write_json(args.json, &value)?,
        Ok(Output::Lines(lines)) => {
            for line in lines {
                println!("{line}");
            }
        }
        Err(err) => {
            did_fail = true;
            if json {
                write_json(
                    args.json,
                    &json!({ "error": format!("{err:#}") }),
                )?;
            } else {
                println!("Error: {err:#}");
            }
        }
    }

    if did_fail {
        std::process::exit(1);
    }

    Ok(())
}

fn write_json(
    mode: Option<Option<JsonPretty>>,
    value: &serde_json::Value,
) -> Result<()> {
    match mode {
        Some(Some(JsonPretty)) => {
            serde_json::to_writer_pretty(io::stdout().lock(), value)
        }
        _ => serde_json::to_writer(io::stdout().lock(), value),
    }
    .context("failed to write to stdout")
}

pub(crate) enum Output {
    Json(serde_json::Value),
    Lines(Vec<String>),
}

/// Decode a fixed-width byte-array field: stop at the first NUL and trim
/// trailing padding spaces.
pub(crate) fn fixed_str(bytes: &[u8]) -> String {
    let stop = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..stop]).trim_end().to_string()
}

async fn run_command(
    client: &EnvClient,
    command: Command,
    json: bool,
    log: &Logger,
) -> Result<Output> {
    match command {
        Command::GetFaults { package } => {
            faults::run(client, package, json).await
        }
        Command::Fup(command) => fup::run(client, command, json).await,
        Command::ResumeProm(command) => {
            resume_prom::run(client, command, json).await
        }

        Command::ForceRpRead { device, target } => {
            let location = target.location();
            client.initiate_resume_prom_read(device, location).await?;
            info!(
                log, "resume prom read initiated";
                "device_type" => device.name(),
            );
            if json {
                Ok(Output::Json(json!({ "initiated": device.name() })))
            } else {
                Ok(Output::Lines(vec![format!(
                    "initiated resume PROM read for {}",
                    device.name()
                )]))
            }
        }

        Command::CacheStatus => {
            let status = cache_status::get_array_cache_status(client).await;
            if json {
                return Ok(Output::Json(json!({
                    "combined": status.combined.to_string(),
                    "providers": {
                        "sps": status.providers.sps.to_string(),
                        "ps": status.providers.ps.to_string(),
                        "encl": status.providers.encl.to_string(),
                        "board": status.providers.board.to_string(),
                        "cooling": status.providers.cooling.to_string(),
                    },
                    "transport": format!("{:?}", status.transport),
                    "ssd_faulted": status.ssd_faulted,
                    "battery_time": status.battery_time,
                })));
            }
            Ok(Output::Lines(vec![
                format!("combined: {}", status.combined),
                format!("  sps: {}", status.providers.sps),
                format!("  ps: {}", status.providers.ps),
                format!("  encl: {}", status.providers.encl),
                format!("  board: {}", status.providers.board),
                format!("  cooling: {}", status.providers.cooling),
                format!("transport: {:?}", status.transport),
                format!("ssd faulted: {}", status.ssd_faulted),
                format!("battery time: {}", status.battery_time),
            ]))
        }

        Command::SpsInfo { manuf } => sps_info(client, manuf, json).await,
        Command::BbuInfo { manuf } => bbu_info(client, manuf, json).await,

        Command::Powerdown => {
            powerdown::powerdown(client).await?;
            if json {
                Ok(Output::Json(json!({ "powerdown": "issued" })))
            } else {
                Ok(Output::Lines(vec![
                    "powerdown sequence issued".to_string()
                ]))
            }
        }
    }
}

async fn sps_info(
    client: &EnvClient,
    manuf: bool,
    json: bool,
) -> Result<Output> {
    let board = client.get_board_info().await?;

    let mut bases = Vec::new();
    if board.is_xpe {
        bases.push(DeviceLocation::xpe());
    }
    for bus in 0..PHYSICAL_BUS_COUNT {
        let encl_count = client.get_encl_count_on_bus(bus).await?;
        for enclosure in 0..encl_count {
            bases.push(DeviceLocation {
                bus,
                enclosure,
                ..DeviceLocation::default()
            });
        }
    }

    let mut lines = Vec::new();
    let mut values = Vec::new();
    for base in bases {
        let slots = client.get_sps_count(base).await?;
        for slot in 0..slots {
            let location = DeviceLocation { slot, ..base };
            let status = client.get_sps_status(location).await?;
            let label = if base.is_xpe() {
                format!("SPE SPS {slot}")
            } else {
                format!("ENCL {}_{} SPS {slot}", base.bus, base.enclosure)
            };
            let manuf_info = if manuf && status.sps_module_inserted {
                Some(client.get_sps_manuf_info(location).await?)
            } else {
                None
            };
            if json {
                let mut value = json!({
                    "location": label,
                    "state": format!("{:?}", status.status),
                    "cabling": status.cabling_status.phrase(),
                    "module_inserted": status.sps_module_inserted,
                    "dual_component": status.dual_component_sps,
                    "battery_inserted": status.sps_battery_inserted,
                    "faults": status.fault_info.phrase(),
                });
                if let Some(info) = manuf_info {
                    value["module"] = sps_unit_manuf_json(&info.module);
                    if status.dual_component_sps {
                        value["battery"] = sps_unit_manuf_json(&info.battery);
                    }
                }
                values.push(value);
            } else {
                lines.push(format!("{label}:"));
                lines.push(format!("  state: {:?}", status.status));
                lines.push(format!(
                    "  cabling: {}",
                    status.cabling_status.phrase()
                ));
                lines.push(format!(
                    "  module inserted: {}",
                    status.sps_module_inserted
                ));
                if status.dual_component_sps {
                    lines.push(format!(
                        "  battery inserted: {}",
                        status.sps_battery_inserted
                    ));
                }
                lines.push(format!("  faults: {}", status.fault_info.phrase()));
                if let Some(info) = manuf_info {
                    sps_unit_manuf_lines(&mut lines, "module", &info.module);
                    if status.dual_component_sps {
                        sps_unit_manuf_lines(
                            &mut lines,
                            "battery",
                            &info.battery,
                        );
                    }
                }
            }
        }
    }

    if json {
        Ok(Output::Json(json!(values)))
    } else {
        if lines.is_empty() {
            lines.push("no SPS present".to_string());
        }
        Ok(Output::Lines(lines))
    }
}

fn sps_unit_manuf_lines(
    lines: &mut Vec<String>,
    unit: &str,
    info: &SpsUnitManufInfo,
) {
    lines.push(format!(
        "  {unit} serial: {}",
        fixed_str(&info.serial_number)
    ));
    lines.push(format!(
        "  {unit} part number: {} rev {}",
        fixed_str(&info.part_number),
        fixed_str(&info.part_number_revision),
    ));
    lines.push(format!("  {unit} vendor: {}", fixed_str(&info.vendor)));
    lines.push(format!(
        "  {unit} model: {}",
        fixed_str(&info.model_string)
    ));
    lines.push(format!(
        "  {unit} firmware rev: {}",
        fixed_str(&info.firmware_revision)
    ));
    let secondary = fixed_str(&info.secondary_firmware_revision);
    if !secondary.is_empty() {
        lines.push(format!("  {unit} secondary firmware rev: {secondary}"));
    }
}

fn sps_unit_manuf_json(info: &SpsUnitManufInfo) -> serde_json::Value {
    json!({
        "serial_number": fixed_str(&info.serial_number),
        "part_number": fixed_str(&info.part_number),
        "part_number_revision": fixed_str(&info.part_number_revision),
        "vendor": fixed_str(&info.vendor),
        "model": fixed_str(&info.model_string),
        "firmware_revision": fixed_str(&info.firmware_revision),
        "secondary_firmware_revision":
            fixed_str(&info.secondary_firmware_revision),
    })
}

async fn bbu_info(
    client: &EnvClient,
    manuf: bool,
    json: bool,
) -> Result<Output> {
    let count = client.get_bob_count().await?;

    let mut lines = Vec::new();
    let mut values = Vec::new();
    for index in 0..count {
        let status = client.get_bob_status(index).await?;
        let fault = status.battery_fault.phrase().unwrap_or("None");
        let manuf_info = if manuf && status.inserted {
            Some(client.get_bbu_manuf_info(index).await?)
        } else {
            None
        };
        if json {
            let mut value = json!({
                "index": index,
                "inserted": status.inserted,
                "on_battery": status.on_battery,
                "fault": fault,
                "associated_sp": status.associated_sp.to_string(),
                "slot_on_blade": status.slot_num_on_sp_blade,
            });
            if let Some(info) = manuf_info {
                value["serial_number"] =
                    json!(fixed_str(&info.serial_number));
                value["part_number"] = json!(fixed_str(&info.part_number));
                value["firmware_rev"] = json!(format!(
                    "{}.{}",
                    info.firmware_rev_major, info.firmware_rev_minor
                ));
            }
            values.push(value);
        } else {
            lines.push(format!("BBU {index}:"));
            lines.push(format!("  inserted: {}", status.inserted));
            lines.push(format!("  on battery: {}", status.on_battery));
            lines.push(format!("  fault: {fault}"));
            lines.push(format!("  associated SP: {}", status.associated_sp));
            lines.push(format!(
                "  slot on blade: {}",
                status.slot_num_on_sp_blade
            ));
            if let Some(info) = manuf_info {
                lines.push(format!(
                    "  serial: {}",
                    fixed_str(&info.serial_number)
                ));
                lines.push(format!(
                    "  part number: {}",
                    fixed_str(&info.part_number)
                ));
                lines.push(format!(
                    "  firmware rev: {}.{}",
                    info.firmware_rev_major, info.firmware_rev_minor
                ));
            }
        }
    }

    if json {
        Ok(Output::Json(json!(values)))
    } else {
        if lines.is_empty() {
            lines.push("no BBUs present".to_string());
        }
        Ok(Output::Lines(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use esp_messages::Header;
    use esp_messages::Message;
    use esp_messages::MessageKind;
    use esp_messages::ObjRequest;
    use esp_messages::ObjResponse;
    use esp_messages::MAX_SERIALIZED_SIZE;
    use esp_obj_comms::error::CommunicationError;
    use esp_obj_comms::ControlPort;
    use std::sync::Mutex;

    /// In-memory [`ControlPort`] driven by a handler closure. `send`
    /// decodes the request and queues the handler's response for the
    /// next `recv`.
    pub(crate) struct FakeControlPort<F> {
        handler: F,
        pending: Mutex<Vec<Vec<u8>>>,
    }

    impl<F> FakeControlPort<F>
    where
        F: Fn(ObjRequest, &[u8]) -> ObjResponse + Send + Sync,
    {
        pub(crate) fn new(handler: F) -> Self {
            Self { handler, pending: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl<F> ControlPort for FakeControlPort<F>
    where
        F: Fn(ObjRequest, &[u8]) -> ObjResponse + Send + Sync,
    {
        async fn send(&self, data: &[u8]) -> Result<(), CommunicationError> {
            let (message, trailing) =
                esp_messages::deserialize::<Message>(data).unwrap();
            let MessageKind::ObjRequest(request) = message.kind else {
                panic!("fake port received a non-request message");
            };

            let response = (self.handler)(request, trailing);
            let reply = Message {
                header: Header {
                    version: message.header.version,
                    message_id: message.header.message_id,
                },
                kind: MessageKind::ObjResponse(response),
            };
            let mut buf = [0; MAX_SERIALIZED_SIZE];
            let n = esp_messages::serialize(&mut buf[..], &reply).unwrap();
            self.pending.lock().unwrap().push(buf[..n].to_vec());
            Ok(())
        }

        async fn recv(&self) -> Result<Vec<u8>, CommunicationError> {
            loop {
                if let Some(packet) = {
                    let mut pending = self.pending.lock().unwrap();
                    if pending.is_empty() {
                        None
                    } else {
                        Some(pending.remove(0))
                    }
                } {
                    return Ok(packet);
                }
                tokio::task::yield_now().await;
            }
        }
    }

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

    fn copy_into<const N: usize>(text: &str) -> [u8; N] {
        let mut out = [0; N];
        out[..text.len()].copy_from_slice(text.as_bytes());
        out
    }

    #[tokio::test]
    async fn sps_info_manuf_reports_module_identity() {
        use esp_messages::status::EnvInterfaceStatus;
        use esp_messages::status::SpsCablingStatus;
        use esp_messages::status::SpsFaultInfo;
        use esp_messages::status::SpsState;
        use esp_messages::BoardInfo;
        use esp_messages::SpsManufInfo;
        use esp_messages::SpsStatus;

        let client = test_client(|request, _| match request {
            ObjRequest::GetBoardInfo => ObjResponse::BoardInfo(BoardInfo {
                low_battery: false,
                engine_id_fault: false,
                peer_present: true,
                internal_cable_status:
                    esp_messages::status::CableStatus::Valid,
                is_xpe: false,
                suitcase_count_per_blade: 0,
                bmc_count_per_blade: 0,
                cache_card_count: 0,
                ssd_count: 0,
            }),
            ObjRequest::GetEnclCountOnBus { bus } => {
                ObjResponse::EnclCountOnBus(u32::from(bus == 0))
            }
            ObjRequest::GetSpsCount { .. } => ObjResponse::SpsCount(1),
            ObjRequest::GetSpsStatus { .. } => {
                ObjResponse::SpsStatus(SpsStatus {
                    sps_module_inserted: true,
                    dual_component_sps: false,
                    sps_battery_inserted: false,
                    status: SpsState::Available,
                    cabling_status: SpsCablingStatus::Valid,
                    fault_info: SpsFaultInfo::default(),
                    env_interface_status: EnvInterfaceStatus::Good,
                })
            }
            ObjRequest::GetSpsManufInfo { .. } => {
                ObjResponse::SpsManufInfo(SpsManufInfo {
                    module: SpsUnitManufInfo {
                        serial_number: copy_into("SPS123456"),
                        part_number: copy_into("118-000-123"),
                        part_number_revision: copy_into("A01"),
                        vendor: copy_into("ACBEL"),
                        model_string: copy_into("1.2KW"),
                        firmware_revision: copy_into("02.90"),
                        secondary_firmware_revision: copy_into("01.10"),
                    },
                    battery: SpsUnitManufInfo {
                        serial_number: [0; 16],
                        part_number: [0; 16],
                        part_number_revision: [0; 3],
                        vendor: [0; 16],
                        model_string: [0; 16],
                        firmware_revision: [0; 8],
                        secondary_firmware_revision: [0; 8],
                    },
                })
            }
            other => panic!("unexpected request {other:?}"),
        });

        let Output::Lines(lines) =
            sps_info(&client, true, false).await.unwrap()
        else {
            panic!("expected line output");
        };
        assert!(lines.contains(&"  module serial: SPS123456".to_string()));
        assert!(lines
            .contains(&"  module part number: 118-000-123 rev A01".to_string()));
        assert!(lines.contains(&"  module model: 1.2KW".to_string()));
        assert!(lines.contains(&"  module firmware rev: 02.90".to_string()));
        assert!(lines
            .contains(&"  module secondary firmware rev: 01.10".to_string()));
    }

    #[tokio::test]
    async fn bbu_info_manuf_reports_identity() {
        use esp_messages::status::BatteryFault;
        use esp_messages::status::EnvInterfaceStatus;
        use esp_messages::BatteryStatus;
        use esp_messages::BbuManufInfo;

        let client = test_client(|request, _| match request {
            ObjRequest::GetBobCount => ObjResponse::BobCount(1),
            ObjRequest::GetBobStatus { bob_index: 0 } => {
                ObjResponse::BobStatus(BatteryStatus {
                    inserted: true,
                    on_battery: false,
                    battery_fault: BatteryFault::None,
                    associated_sp: SpId::A,
                    slot_num_on_sp_blade: 0,
                    env_interface_status: EnvInterfaceStatus::Good,
                })
            }
            ObjRequest::GetBbuManufInfo { bob_index: 0 } => {
                ObjResponse::BbuManufInfo(BbuManufInfo {
                    serial_number: copy_into("BBU987654"),
                    part_number: copy_into("078-000-064"),
                    firmware_rev_major: 2,
                    firmware_rev_minor: 7,
                })
            }
            other => panic!("unexpected request {other:?}"),
        });

        let Output::Lines(lines) =
            bbu_info(&client, true, false).await.unwrap()
        else {
            panic!("expected line output");
        };
        assert!(lines.contains(&"  serial: BBU987654".to_string()));
        assert!(lines.contains(&"  part number: 078-000-064".to_string()));
        assert!(lines.contains(&"  firmware rev: 2.7".to_string()));
    }

    #[test]
    fn fixed_str_stops_at_nul_and_trims_padding() {
        assert_eq!(fixed_str(b"ABC-123\0\0\0"), "ABC-123");
        assert_eq!(fixed_str(b"VOYAGER         "), "VOYAGER");
        assert_eq!(fixed_str(b""), "");
    }

    #[test]
    fn target_args_default_to_enumeration() {
        let args = TargetArgs {
            bus: None,
            enclosure: None,
            slot: None,
            component_id: None,
            sp: None,
            xpe: false,
        };
        assert_eq!(args.explicit_location(), None);

        let args = TargetArgs { slot: Some(2), ..args };
        let location = args.explicit_location().unwrap();
        assert_eq!(location.slot, 2);
        assert_eq!(location.bus, 0);

        let args = TargetArgs { slot: Some(1), xpe: true, ..args };
        assert!(args.explicit_location().unwrap().is_xpe());
    }
}
