// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Array powerdown sequencing: flush, SPS powerdown, SP reboot.

use crate::client::EnvClient;
use crate::error::CommunicationError;
use slog::error;
use slog::info;
use std::time::Duration;
use tokio::time;

const REBOOT_RETRY_COUNT: usize = 5;
const SPS_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Power the array down.
///
/// The flush and the SPS powerdown are both best-effort: either can
/// fail without stopping the sequence, since an SP that reaches this
/// path is going away one way or another. After a successful SPS
/// powerdown we wait [`SPS_SHUTDOWN_GRACE`] for the power cut; if we
/// are still running, we fall through to rebooting ourselves.
///
/// The reboot loop is bounded at [`REBOOT_RETRY_COUNT`] but returns on
/// the first failed reboot command, so the bound is never exercised
/// past a failure. That matches longstanding behavior that downstream
/// operators script around; do not "fix" it here without coordinating.
pub async fn powerdown(client: &EnvClient) -> Result<(), CommunicationError> {
    info!(client.log(), "initiating flush before shutdown/reboot");
    match client.flush_system().await {
        Ok(()) => info!(client.log(), "flush successful"),
        Err(err) => {
            error!(client.log(), "flush failed"; "err" => %err);
        }
    }

    match client.sps_powerdown().await {
        Ok(()) => {
            time::sleep(SPS_SHUTDOWN_GRACE).await;
            info!(client.log(), "SP still up, rebooting SP");
        }
        Err(err) => {
            info!(
                client.log(), "sps powerdown failed, rebooting SP";
                "err" => %err,
            );
        }
    }

    let local_sp = client.get_sp_id().await?.sp;
    for attempt in 1..=REBOOT_RETRY_COUNT {
        info!(
            client.log(), "attempting to reboot SP";
            "attempt" => attempt,
        );
        client.reboot_sp(local_sp).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_port::test_client;
    use esp_messages::device::SpId;
    use esp_messages::ObjRequest;
    use esp_messages::ObjResponse;
    use esp_messages::ObjectError;
    use esp_messages::SpIdentity;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn flush_failure_does_not_stop_the_sequence() {
        let reboots = Arc::new(AtomicUsize::new(0));
        let reboots_seen = Arc::clone(&reboots);

        let client = test_client(move |request, _data| match request {
            ObjRequest::FlushSystem => {
                ObjResponse::Error(ObjectError::GenericFailure)
            }
            ObjRequest::SpsPowerdown => ObjResponse::Ack,
            ObjRequest::GetSpId => ObjResponse::SpId(SpIdentity {
                sp: SpId::A,
                peer_inserted: true,
            }),
            ObjRequest::RebootSp { sp: SpId::A } => {
                reboots_seen.fetch_add(1, Ordering::Relaxed);
                ObjResponse::Ack
            }
            other => panic!("unexpected request {other:?}"),
        });

        powerdown(&client).await.unwrap();
        assert_eq!(reboots.load(Ordering::Relaxed), REBOOT_RETRY_COUNT);
    }

    #[tokio::test(start_paused = true)]
    async fn first_reboot_failure_is_fatal() {
        let reboots = Arc::new(AtomicUsize::new(0));
        let reboots_seen = Arc::clone(&reboots);

        let client = test_client(move |request, _data| match request {
            ObjRequest::FlushSystem => ObjResponse::Ack,
            ObjRequest::SpsPowerdown => {
                ObjResponse::Error(ObjectError::GenericFailure)
            }
            ObjRequest::GetSpId => ObjResponse::SpId(SpIdentity {
                sp: SpId::B,
                peer_inserted: true,
            }),
            ObjRequest::RebootSp { sp: SpId::B } => {
                reboots_seen.fetch_add(1, Ordering::Relaxed);
                ObjResponse::Error(ObjectError::GenericFailure)
            }
            other => panic!("unexpected request {other:?}"),
        });

        powerdown(&client).await.unwrap_err();
        assert_eq!(reboots.load(Ordering::Relaxed), 1);
    }
}
