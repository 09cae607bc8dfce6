// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed RPC client for the environmental management objects.

use crate::control_port::ControlPort;
use crate::control_port::PortRetryConfig;
use crate::error::CommunicationError;
use backoff::backoff::Backoff;
use esp_messages::device::ClassId;
use esp_messages::device::DeviceLocation;
use esp_messages::device::DeviceType;
use esp_messages::device::SpId;
use esp_messages::fup::FupForceFlags;
use esp_messages::fup::FupInfoSet;
use esp_messages::fup::FupWorkState;
use esp_messages::fup::ManifestEntry;
use esp_messages::resume_prom::ResumePromWriteHeader;
use esp_messages::status::CacheStatus;
use esp_messages::version;
use esp_messages::BatteryStatus;
use esp_messages::BbuManufInfo;
use esp_messages::BoardInfo;
use esp_messages::CacheStatusResponder;
use esp_messages::ConnectorInfo;
use esp_messages::DriveInfo;
use esp_messages::EnclosureInfo;
use esp_messages::FanInfo;
use esp_messages::Header;
use esp_messages::IoPortInfo;
use esp_messages::LccInfo;
use esp_messages::Message;
use esp_messages::MessageKind;
use esp_messages::MgmtCompInfo;
use esp_messages::ModuleInfo;
use esp_messages::ModuleLimits;
use esp_messages::ModuleStatus;
use esp_messages::ObjRequest;
use esp_messages::ObjResponse;
use esp_messages::ObjectError;
use esp_messages::PeerBootInfo;
use esp_messages::PsInfo;
use esp_messages::ResumePromReadResult;
use esp_messages::SpIdentity;
use esp_messages::SpsManufInfo;
use esp_messages::SpsStatus;
use esp_messages::SsdInfo;
use esp_messages::SuitcaseInfo;
use esp_messages::BmcInfo;
use esp_messages::MAX_SERIALIZED_SIZE;
use slog::debug;
use slog::o;
use slog::trace;
use slog::Logger;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time;

type Result<T> = std::result::Result<T, CommunicationError>;

/// Matches a response against the expected [`ObjResponse`] variant,
/// converting object errors and mismatched variants into
/// [`CommunicationError`]s.
macro_rules! expect_response {
    ($rpc:expr, $variant:ident) => {
        match $rpc {
            (ObjResponse::$variant, _data) => Ok(()),
            (ObjResponse::Error(err), _) => {
                Err(CommunicationError::ObjectError(err))
            }
            (other, _) => Err(CommunicationError::BadResponseType {
                expected: stringify!($variant),
                got: other.into(),
            }),
        }
    };
    ($rpc:expr, $variant:ident(out)) => {
        match $rpc {
            (ObjResponse::$variant(out), _data) => Ok(out),
            (ObjResponse::Error(err), _) => {
                Err(CommunicationError::ObjectError(err))
            }
            (other, _) => Err(CommunicationError::BadResponseType {
                expected: stringify!($variant),
                got: other.into(),
            }),
        }
    };
}

/// Client handle for one SP's management object stack.
pub struct EnvClient {
    port: Box<dyn ControlPort>,
    retry_config: PortRetryConfig,
    message_id: AtomicU32,
    log: Logger,
}

impl EnvClient {
    pub fn new(
        port: Box<dyn ControlPort>,
        retry_config: PortRetryConfig,
        log: &Logger,
    ) -> Self {
        Self {
            port,
            retry_config,
            message_id: AtomicU32::new(1),
            log: log.new(o!("component" => "EnvClient")),
        }
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }

    pub(crate) async fn rpc(
        &self,
        kind: ObjRequest,
    ) -> Result<(ObjResponse, Vec<u8>)> {
        self.rpc_with_trailing_data(kind, &[]).await
    }

    pub(crate) async fn rpc_with_trailing_data(
        &self,
        kind: ObjRequest,
        data_slices: &[&[u8]],
    ) -> Result<(ObjResponse, Vec<u8>)> {
        let message_id = self.message_id.fetch_add(1, Ordering::Relaxed);
        let message = Message {
            header: Header { version: version::V1, message_id },
            kind: MessageKind::ObjRequest(kind),
        };

        let mut outgoing_buf = [0; MAX_SERIALIZED_SIZE];
        let n = if data_slices.is_empty() {
            // We know statically that `outgoing_buf` is large enough to
            // hold any `Message`, which in practice is the only possible
            // serialization error, so we can unwrap.
            esp_messages::serialize(&mut outgoing_buf[..], &message).unwrap()
        } else {
            let (n, _written) = esp_messages::serialize_with_trailing_data(
                &mut outgoing_buf,
                &message,
                data_slices,
            );
            n
        };
        let outgoing_buf = &outgoing_buf[..n];

        for attempt in 1..=self.retry_config.max_attempts {
            trace!(
                self.log, "sending request to object";
                "request" => ?message.kind,
                "attempt" => attempt,
            );

            match self.rpc_call_one_attempt(message_id, outgoing_buf).await? {
                Some(result) => return Ok(result),
                None => continue,
            }
        }

        Err(CommunicationError::ExhaustedNumAttempts(
            self.retry_config.max_attempts,
        ))
    }

    async fn rpc_call_one_attempt(
        &self,
        message_id: u32,
        serialized_request: &[u8],
    ) -> Result<Option<(ObjResponse, Vec<u8>)>> {
        // A busy object is not a failed attempt; loop within this one
        // attempt with backoff until it stops saying so.
        let mut busy_backoff = obj_busy_policy();

        loop {
            self.port.send(serialized_request).await?;

            let packet = match time::timeout(
                self.retry_config.per_attempt_timeout,
                self.port.recv(),
            )
            .await
            {
                Ok(result) => result?,
                Err(_elapsed) => return Ok(None),
            };

            let (message, trailing_data) =
                match esp_messages::deserialize::<Message>(&packet) {
                    Ok((message, rest)) => (message, rest),
                    Err(err) => {
                        return Err(CommunicationError::Deserialize(err))
                    }
                };

            if message.header.version != version::V1 {
                return Err(CommunicationError::VersionMismatch {
                    object: message.header.version,
                    cli: version::V1,
                });
            }

            if message.header.message_id != message_id {
                debug!(
                    self.log, "ignoring unexpected response";
                    "id" => message.header.message_id,
                );
                return Ok(None);
            }

            let MessageKind::ObjResponse(response) = message.kind else {
                debug!(self.log, "ignoring non-response message");
                return Ok(None);
            };

            trace!(
                self.log, "received response from object";
                "response" => ?response,
            );

            match response {
                ObjResponse::Error(ObjectError::Busy) => {
                    // Our busy policy never gives up, so we can unwrap.
                    let backoff_sleep = busy_backoff.next_backoff().unwrap();
                    time::sleep(backoff_sleep).await;
                    continue;
                }
                ObjResponse::Error(err) => return Err(err.into()),
                _ => return Ok(Some((response, trailing_data.to_vec()))),
            }
        }
    }

    // board_mgmt

    pub async fn get_board_info(&self) -> Result<BoardInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetBoardInfo).await?,
            BoardInfo(out)
        )
    }

    pub async fn get_peer_boot_info(&self) -> Result<PeerBootInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetPeerBootInfo).await?,
            PeerBootInfo(out)
        )
    }

    pub async fn get_suitcase_info(
        &self,
        sp: SpId,
        slot: u32,
    ) -> Result<SuitcaseInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetSuitcaseInfo { sp, slot }).await?,
            SuitcaseInfo(out)
        )
    }

    pub async fn get_bmc_info(&self, sp: SpId, slot: u32) -> Result<BmcInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetBmcInfo { sp, slot }).await?,
            BmcInfo(out)
        )
    }

    pub async fn get_ssd_info(&self, slot: u32) -> Result<SsdInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetSsdInfo { slot }).await?,
            SsdInfo(out)
        )
    }

    pub async fn get_sp_id(&self) -> Result<SpIdentity> {
        expect_response!(self.rpc(ObjRequest::GetSpId).await?, SpId(out))
    }

    // module_mgmt

    pub async fn get_limits_info(&self) -> Result<ModuleLimits> {
        expect_response!(
            self.rpc(ObjRequest::GetLimitsInfo).await?,
            LimitsInfo(out)
        )
    }

    pub async fn get_module_info(
        &self,
        device_type: DeviceType,
        sp: SpId,
        slot: u32,
    ) -> Result<ModuleInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetModuleInfo { device_type, sp, slot })
                .await?,
            ModuleInfo(out)
        )
    }

    pub async fn get_module_status(
        &self,
        device_type: DeviceType,
        sp: SpId,
        slot: u32,
    ) -> Result<ModuleStatus> {
        expect_response!(
            self.rpc(ObjRequest::GetModuleStatus { device_type, sp, slot })
                .await?,
            ModuleStatus(out)
        )
    }

    pub async fn get_io_port_info(
        &self,
        device_type: DeviceType,
        sp: SpId,
        slot: u32,
        port: u32,
    ) -> Result<IoPortInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetIoPortInfo { device_type, sp, slot, port })
                .await?,
            IoPortInfo(out)
        )
    }

    pub async fn get_mgmt_comp_info(
        &self,
        sp: SpId,
        slot: u32,
    ) -> Result<MgmtCompInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetMgmtCompInfo { sp, slot }).await?,
            MgmtCompInfo(out)
        )
    }

    // sps_mgmt

    pub async fn get_bob_count(&self) -> Result<u32> {
        expect_response!(
            self.rpc(ObjRequest::GetBobCount).await?,
            BobCount(out)
        )
    }

    pub async fn get_bob_status(
        &self,
        bob_index: u32,
    ) -> Result<BatteryStatus> {
        expect_response!(
            self.rpc(ObjRequest::GetBobStatus { bob_index }).await?,
            BobStatus(out)
        )
    }

    pub async fn get_bbu_manuf_info(
        &self,
        bob_index: u32,
    ) -> Result<BbuManufInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetBbuManufInfo { bob_index }).await?,
            BbuManufInfo(out)
        )
    }

    pub async fn get_sps_count(
        &self,
        location: DeviceLocation,
    ) -> Result<u32> {
        expect_response!(
            self.rpc(ObjRequest::GetSpsCount { location }).await?,
            SpsCount(out)
        )
    }

    pub async fn get_sps_status(
        &self,
        location: DeviceLocation,
    ) -> Result<SpsStatus> {
        expect_response!(
            self.rpc(ObjRequest::GetSpsStatus { location }).await?,
            SpsStatus(out)
        )
    }

    pub async fn get_sps_manuf_info(
        &self,
        location: DeviceLocation,
    ) -> Result<SpsManufInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetSpsManufInfo { location }).await?,
            SpsManufInfo(out)
        )
    }

    pub async fn sps_powerdown(&self) -> Result<()> {
        expect_response!(self.rpc(ObjRequest::SpsPowerdown).await?, Ack)
    }

    // encl_mgmt

    pub async fn get_encl_info(
        &self,
        location: DeviceLocation,
    ) -> Result<EnclosureInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetEnclInfo { location }).await?,
            EnclInfo(out)
        )
    }

    pub async fn get_encl_count_on_bus(&self, bus: u32) -> Result<u32> {
        expect_response!(
            self.rpc(ObjRequest::GetEnclCountOnBus { bus }).await?,
            EnclCountOnBus(out)
        )
    }

    pub async fn get_lcc_info(
        &self,
        location: DeviceLocation,
    ) -> Result<LccInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetLccInfo { location }).await?,
            LccInfo(out)
        )
    }

    pub async fn get_connector_count(
        &self,
        location: DeviceLocation,
    ) -> Result<u32> {
        expect_response!(
            self.rpc(ObjRequest::GetConnectorCount { location }).await?,
            ConnectorCount(out)
        )
    }

    pub async fn get_connector_info(
        &self,
        location: DeviceLocation,
    ) -> Result<ConnectorInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetConnectorInfo { location }).await?,
            ConnectorInfo(out)
        )
    }

    // cooling_mgmt

    pub async fn get_fan_info(
        &self,
        location: DeviceLocation,
    ) -> Result<FanInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetFanInfo { location }).await?,
            FanInfo(out)
        )
    }

    // ps_mgmt

    pub async fn get_ps_count(&self, location: DeviceLocation) -> Result<u32> {
        expect_response!(
            self.rpc(ObjRequest::GetPsCount { location }).await?,
            PsCount(out)
        )
    }

    pub async fn get_ps_info(
        &self,
        location: DeviceLocation,
    ) -> Result<PsInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetPsInfo { location }).await?,
            PsInfo(out)
        )
    }

    // drive_mgmt

    pub async fn get_drive_info(
        &self,
        location: DeviceLocation,
    ) -> Result<DriveInfo> {
        expect_response!(
            self.rpc(ObjRequest::GetDriveInfo { location }).await?,
            DriveInfo(out)
        )
    }

    pub async fn get_drive_slot_count(
        &self,
        location: DeviceLocation,
    ) -> Result<u32> {
        expect_response!(
            self.rpc(ObjRequest::GetDriveSlotCount { location }).await?,
            DriveSlotCount(out)
        )
    }

    // cache status

    pub async fn get_cache_status(
        &self,
        class_responder: CacheStatusResponder,
    ) -> Result<CacheStatus> {
        expect_response!(
            self.rpc(ObjRequest::GetCacheStatus { class_responder }).await?,
            CacheStatus(out)
        )
    }

    // resume prom

    pub(crate) async fn get_resume_prom_info_raw(
        &self,
        device_type: DeviceType,
        location: DeviceLocation,
    ) -> Result<ResumePromReadResult> {
        expect_response!(
            self.rpc(ObjRequest::GetResumePromInfo { device_type, location })
                .await?,
            ResumePromInfo(out)
        )
    }

    pub(crate) async fn write_resume_prom_raw(
        &self,
        header: ResumePromWriteHeader,
        data_slices: &[&[u8]],
    ) -> Result<esp_messages::resume_prom::ResumePromOpStatus> {
        expect_response!(
            self.rpc_with_trailing_data(
                ObjRequest::WriteResumeProm { header },
                data_slices,
            )
            .await?,
            WriteResumePromAck(out)
        )
    }

    pub async fn initiate_resume_prom_read(
        &self,
        device_type: DeviceType,
        location: DeviceLocation,
    ) -> Result<()> {
        expect_response!(
            self.rpc(ObjRequest::InitiateResumePromRead {
                device_type,
                location
            })
            .await?,
            Ack
        )
    }

    pub async fn any_resume_prom_read_in_progress(&self) -> Result<bool> {
        expect_response!(
            self.rpc(ObjRequest::GetAnyResumePromReadInProgress).await?,
            ResumePromReadInProgress(out)
        )
    }

    // firmware upgrade

    pub async fn initiate_upgrade(
        &self,
        device_type: DeviceType,
        location: DeviceLocation,
        force_flags: FupForceFlags,
        delay_seconds: u32,
    ) -> Result<()> {
        expect_response!(
            self.rpc(ObjRequest::InitiateUpgrade {
                device_type,
                location,
                force_flags,
                delay_seconds,
            })
            .await?,
            Ack
        )
    }

    pub async fn abort_upgrade(&self, class_id: ClassId) -> Result<()> {
        expect_response!(
            self.rpc(ObjRequest::AbortUpgrade { class_id }).await?,
            Ack
        )
    }

    pub async fn resume_upgrade(&self, class_id: ClassId) -> Result<()> {
        expect_response!(
            self.rpc(ObjRequest::ResumeUpgrade { class_id }).await?,
            Ack
        )
    }

    pub async fn terminate_upgrade(&self, class_id: ClassId) -> Result<()> {
        expect_response!(
            self.rpc(ObjRequest::TerminateUpgrade { class_id }).await?,
            Ack
        )
    }

    pub async fn any_upgrade_in_progress(&self) -> Result<bool> {
        expect_response!(
            self.rpc(ObjRequest::GetAnyUpgradeInProgress).await?,
            UpgradeInProgress(out)
        )
    }

    pub async fn get_fup_info(
        &self,
        device_type: DeviceType,
        location: DeviceLocation,
    ) -> Result<FupInfoSet> {
        expect_response!(
            self.rpc(ObjRequest::GetFupInfo { device_type, location }).await?,
            FupInfo(out)
        )
    }

    pub async fn get_fup_work_state(
        &self,
        device_type: DeviceType,
        location: DeviceLocation,
    ) -> Result<FupWorkState> {
        expect_response!(
            self.rpc(ObjRequest::GetFupWorkState { device_type, location })
                .await?,
            FupWorkState(out)
        )
    }

    pub async fn get_fup_manifest_entry(
        &self,
        device_type: DeviceType,
        entry_index: u32,
    ) -> Result<ManifestEntry> {
        expect_response!(
            self.rpc(ObjRequest::GetFupManifestInfo {
                device_type,
                entry_index
            })
            .await?,
            FupManifestInfo(out)
        )
    }

    // powerdown orchestration

    pub async fn flush_system(&self) -> Result<()> {
        expect_response!(self.rpc(ObjRequest::FlushSystem).await?, Ack)
    }

    pub async fn reboot_sp(&self, sp: SpId) -> Result<()> {
        expect_response!(self.rpc(ObjRequest::RebootSp { sp }).await?, Ack)
    }
}

fn obj_busy_policy() -> backoff::ExponentialBackoff {
    const INITIAL_INTERVAL: Duration = Duration::from_millis(20);
    const MAX_INTERVAL: Duration = Duration::from_millis(1_000);

    backoff::ExponentialBackoff {
        current_interval: INITIAL_INTERVAL,
        initial_interval: INITIAL_INTERVAL,
        multiplier: 2.0,
        max_interval: MAX_INTERVAL,
        max_elapsed_time: None,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_port::test_logger;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// What the port should do with the next request it sees.
    enum Reply {
        /// Swallow the request; `recv` pends until the caller times out.
        Drop,
        /// Answer with a response whose message id does not match.
        WrongId(ObjResponse),
        /// Answer normally.
        Respond(ObjResponse),
    }

    /// [`ControlPort`] whose behavior follows a fixed script, one entry
    /// per `send`. Unlike the handler-driven fake, `recv` blocks on a
    /// channel so paused-clock tests can let timeouts fire.
    struct ScriptedPort {
        script: Mutex<VecDeque<Reply>>,
        sends: AtomicUsize,
        tx: mpsc::UnboundedSender<Vec<u8>>,
        rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    }

    impl ScriptedPort {
        fn new(script: Vec<Reply>) -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            Self {
                script: Mutex::new(script.into()),
                sends: AtomicUsize::new(0),
                tx,
                rx: tokio::sync::Mutex::new(rx),
            }
        }
    }

    #[async_trait]
    impl ControlPort for ScriptedPort {
        async fn send(&self, data: &[u8]) -> Result<()> {
            self.sends.fetch_add(1, Ordering::Relaxed);
            let (message, _) =
                esp_messages::deserialize::<Message>(data).unwrap();

            let reply = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .expect("port script ran out of entries");
            let (message_id, response) = match reply {
                Reply::Drop => return Ok(()),
                Reply::WrongId(response) => {
                    (message.header.message_id.wrapping_add(1), response)
                }
                Reply::Respond(response) => {
                    (message.header.message_id, response)
                }
            };

            let reply = Message {
                header: Header { version: version::V1, message_id },
                kind: MessageKind::ObjResponse(response),
            };
            let mut buf = [0; MAX_SERIALIZED_SIZE];
            let n = esp_messages::serialize(&mut buf[..], &reply).unwrap();
            self.tx.send(buf[..n].to_vec()).unwrap();
            Ok(())
        }

        async fn recv(&self) -> Result<Vec<u8>> {
            // The sender half lives in `self`, so this pends (it never
            // observes a closed channel) whenever no reply is queued.
            match self.rx.lock().await.recv().await {
                Some(packet) => Ok(packet),
                None => unreachable!(),
            }
        }
    }

    fn scripted_client(
        script: Vec<Reply>,
        config: PortRetryConfig,
    ) -> (EnvClient, std::sync::Arc<ScriptedPort>) {
        let port = std::sync::Arc::new(ScriptedPort::new(script));
        let client =
            EnvClient::new(Box::new(SharedPort(port.clone())), config, &test_logger());
        (client, port)
    }

    /// Thin forwarder so a test can keep a handle on the port it hands
    /// to the client.
    struct SharedPort(std::sync::Arc<ScriptedPort>);

    #[async_trait]
    impl ControlPort for SharedPort {
        async fn send(&self, data: &[u8]) -> Result<()> {
            self.0.send(data).await
        }

        async fn recv(&self) -> Result<Vec<u8>> {
            self.0.recv().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_requests_exhaust_their_attempts() {
        let (client, port) = scripted_client(
            vec![Reply::Drop, Reply::Drop, Reply::Drop],
            PortRetryConfig {
                per_attempt_timeout: Duration::from_secs(1),
                max_attempts: 3,
            },
        );

        let err = client.get_bob_count().await.unwrap_err();
        assert!(matches!(err, CommunicationError::ExhaustedNumAttempts(3)));
        assert_eq!(port.sends.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn mismatched_message_id_is_skipped_and_retried() {
        let (client, port) = scripted_client(
            vec![
                Reply::WrongId(ObjResponse::BobCount(99)),
                Reply::Respond(ObjResponse::BobCount(2)),
            ],
            PortRetryConfig {
                per_attempt_timeout: Duration::from_secs(1),
                max_attempts: 3,
            },
        );

        assert_eq!(client.get_bob_count().await.unwrap(), 2);
        assert_eq!(port.sends.load(Ordering::Relaxed), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_object_is_retried_within_one_attempt() {
        // max_attempts of 1 proves the busy loop stays inside the
        // attempt rather than consuming retries.
        let (client, port) = scripted_client(
            vec![
                Reply::Respond(ObjResponse::Error(ObjectError::Busy)),
                Reply::Respond(ObjResponse::BobCount(7)),
            ],
            PortRetryConfig {
                per_attempt_timeout: Duration::from_secs(1),
                max_attempts: 1,
            },
        );

        assert_eq!(client.get_bob_count().await.unwrap(), 7);
        assert_eq!(port.sends.load(Ordering::Relaxed), 2);
    }
}
