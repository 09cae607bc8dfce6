// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Array-wide write-cache health, combined from the five management
//! subsystems that can each demand the cache be disabled.

use crate::client::EnvClient;
use crate::error::CommunicationError;
use esp_messages::status::CacheStatus;
use esp_messages::CacheStatusResponder;
use slog::warn;

/// Transport-level outcome of the aggregate query, distinct from the
/// cache status itself. `Busy` means at least one provider never
/// answered within its retry budget and the caller may retry the whole
/// query; `GenericFailure` means at least one provider answered with a
/// hard error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransportSummary {
    Ok,
    GenericFailure,
    Busy,
}

/// The per-provider statuses feeding the combination ladder. A provider
/// whose query failed outright is recorded as `Failed`; an unreachable
/// subsystem cannot vouch for the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderStatuses {
    pub sps: CacheStatus,
    pub ps: CacheStatus,
    pub encl: CacheStatus,
    pub board: CacheStatus,
    pub cooling: CacheStatus,
}

impl ProviderStatuses {
    fn all(&self) -> [CacheStatus; 5] {
        [self.sps, self.ps, self.encl, self.board, self.cooling]
    }

    /// Combine the five subsystem statuses into one array-wide status.
    ///
    /// The precedence is exact and not a plain max over the severity
    /// ordering: `ApproachingOverTemp` is only honored when the board
    /// subsystem itself reports it, since the board owns the ambient
    /// temperature determination.
    pub fn combine(&self) -> CacheStatus {
        if self.all().iter().any(|s| *s == CacheStatus::FailedShutdown) {
            CacheStatus::FailedShutdown
        } else if self.board == CacheStatus::ApproachingOverTemp {
            CacheStatus::ApproachingOverTemp
        } else if self.all().iter().any(|s| *s == CacheStatus::Failed) {
            CacheStatus::Failed
        } else if self.all().iter().any(|s| *s == CacheStatus::Degraded) {
            CacheStatus::Degraded
        } else {
            CacheStatus::Ok
        }
    }
}

/// Combine the per-provider transport outcomes.
///
/// A shutdown determination is final: when the combined cache status is
/// `FailedShutdown` the caller must not retry, so the summary is forced
/// to `Ok` even if some provider queries failed.
pub fn combine_transport(
    outcomes: &[TransportSummary],
    combined: CacheStatus,
) -> TransportSummary {
    if combined == CacheStatus::FailedShutdown {
        return TransportSummary::Ok;
    }
    outcomes.iter().copied().max().unwrap_or(TransportSummary::Ok)
}

/// Aggregate result of [`get_array_cache_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayCacheStatus {
    pub combined: CacheStatus,
    pub providers: ProviderStatuses,
    pub transport: TransportSummary,
    /// Faulted or degraded local-SP system drive. Independent of the
    /// severity ladder; a failure fetching SSD health reads as healthy.
    pub ssd_faulted: bool,
    /// Estimated battery runtime in seconds. Always zero for now; the
    /// upstream runtime calculation has not been settled on.
    pub battery_time: u32,
}

/// Query the five cache-status providers plus the local SP's SSD health
/// and combine the results.
///
/// This never fails: provider errors degrade the combined status and
/// the transport summary instead of aborting the query.
pub async fn get_array_cache_status(client: &EnvClient) -> ArrayCacheStatus {
    // Queried one at a time; responses carry no correlation beyond the
    // message id, and the port is not demultiplexed across callers.
    let sps = query_provider(client, CacheStatusResponder::Sps).await;
    let ps = query_provider(client, CacheStatusResponder::Ps).await;
    let encl = query_provider(client, CacheStatusResponder::Encl).await;
    let board = query_provider(client, CacheStatusResponder::Board).await;
    let cooling = query_provider(client, CacheStatusResponder::Cooling).await;

    let providers = ProviderStatuses {
        sps: sps.0,
        ps: ps.0,
        encl: encl.0,
        board: board.0,
        cooling: cooling.0,
    };
    let combined = providers.combine();
    let transport = combine_transport(
        &[sps.1, ps.1, encl.1, board.1, cooling.1],
        combined,
    );

    ArrayCacheStatus {
        combined,
        providers,
        transport,
        ssd_faulted: local_ssd_faulted(client).await,
        battery_time: 0,
    }
}

async fn query_provider(
    client: &EnvClient,
    responder: CacheStatusResponder,
) -> (CacheStatus, TransportSummary) {
    match client.get_cache_status(responder).await {
        Ok(status) => (status, TransportSummary::Ok),
        Err(err) => {
            warn!(
                client.log(), "cache status provider query failed";
                "responder" => ?responder,
                "err" => %err,
            );
            (CacheStatus::Failed, classify_transport(&err))
        }
    }
}

fn classify_transport(err: &CommunicationError) -> TransportSummary {
    match err {
        // The retry loop has already absorbed every Busy answer; running
        // out of attempts is the "object is too busy to respond" case.
        CommunicationError::ExhaustedNumAttempts(_) => TransportSummary::Busy,
        _ => TransportSummary::GenericFailure,
    }
}

// Only slot 0 of the local SP is checked; the peer SP monitors its own
// system drive.
async fn local_ssd_faulted(client: &EnvClient) -> bool {
    match client.get_ssd_info(0).await {
        Ok(info) => info.is_faulted,
        Err(err) => {
            warn!(
                client.log(), "local SSD health query failed, assuming healthy";
                "err" => %err,
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_port::test_client;
    use esp_messages::ObjRequest;
    use esp_messages::ObjResponse;
    use esp_messages::ObjectError;
    use esp_messages::SsdInfo;

    fn statuses(
        sps: CacheStatus,
        ps: CacheStatus,
        encl: CacheStatus,
        board: CacheStatus,
        cooling: CacheStatus,
    ) -> ProviderStatuses {
        ProviderStatuses { sps, ps, encl, board, cooling }
    }

    #[test]
    fn failed_beats_degraded() {
        let combined = statuses(
            CacheStatus::Degraded,
            CacheStatus::Ok,
            CacheStatus::Failed,
            CacheStatus::Ok,
            CacheStatus::Ok,
        )
        .combine();
        assert_eq!(combined, CacheStatus::Failed);
    }

    #[test]
    fn board_over_temp_beats_failed_elsewhere() {
        let combined = statuses(
            CacheStatus::Ok,
            CacheStatus::Ok,
            CacheStatus::Failed,
            CacheStatus::ApproachingOverTemp,
            CacheStatus::Ok,
        )
        .combine();
        assert_eq!(combined, CacheStatus::ApproachingOverTemp);
    }

    #[test]
    fn over_temp_outside_the_board_is_not_promoted() {
        let combined = statuses(
            CacheStatus::ApproachingOverTemp,
            CacheStatus::Ok,
            CacheStatus::Ok,
            CacheStatus::Ok,
            CacheStatus::Ok,
        )
        .combine();
        assert_eq!(combined, CacheStatus::Ok);
    }

    #[test]
    fn shutdown_forces_transport_ok() {
        let transport = combine_transport(
            &[
                TransportSummary::GenericFailure,
                TransportSummary::Busy,
                TransportSummary::Ok,
                TransportSummary::Ok,
                TransportSummary::Ok,
            ],
            CacheStatus::FailedShutdown,
        );
        assert_eq!(transport, TransportSummary::Ok);
    }

    #[test]
    fn busy_beats_generic_failure() {
        let transport = combine_transport(
            &[
                TransportSummary::GenericFailure,
                TransportSummary::Busy,
                TransportSummary::Ok,
            ],
            CacheStatus::Degraded,
        );
        assert_eq!(transport, TransportSummary::Busy);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_failure_reads_as_failed_and_ssd_fails_open() {
        let client = test_client(|request, _data| match request {
            ObjRequest::GetCacheStatus {
                class_responder: CacheStatusResponder::Encl,
            } => ObjResponse::Error(ObjectError::GenericFailure),
            ObjRequest::GetCacheStatus { .. } => {
                ObjResponse::CacheStatus(CacheStatus::Ok)
            }
            ObjRequest::GetSsdInfo { .. } => {
                ObjResponse::Error(ObjectError::GenericFailure)
            }
            other => panic!("unexpected request {other:?}"),
        });

        let result = get_array_cache_status(&client).await;
        assert_eq!(result.combined, CacheStatus::Failed);
        assert_eq!(result.transport, TransportSummary::GenericFailure);
        assert!(!result.ssd_faulted);
        assert_eq!(result.battery_time, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn faulted_local_ssd_sets_the_flag() {
        let client = test_client(|request, _data| match request {
            ObjRequest::GetCacheStatus { .. } => {
                ObjResponse::CacheStatus(CacheStatus::Ok)
            }
            ObjRequest::GetSsdInfo { slot: 0 } => {
                ObjResponse::SsdInfo(SsdInfo {
                    is_faulted: true,
                    remaining_life_percent: 12,
                })
            }
            other => panic!("unexpected request {other:?}"),
        });

        let result = get_array_cache_status(&client).await;
        assert_eq!(result.combined, CacheStatus::Ok);
        assert!(result.ssd_faulted);
    }
}
