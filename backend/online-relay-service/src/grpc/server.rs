//! gRPC surface of the relay
//!
//! Translates wire requests into `RelayService` calls and outcomes back into
//! wire responses. Each RPC is timed and counted by method and status code.

use crate::error::{RelayError, ERR_ACCESS_CODE, ERR_ACCESS_MSG};
use crate::metrics::RpcTimer;
use crate::models::{OnlinePlatformStatus, Platform, PlatformOutcome, UserPushResult};
use crate::nova::online_relay::v1::{
    get_users_online_status_resp::{SuccessDetail, SuccessResult},
    online_message_relay_service_server::OnlineMessageRelayService,
    GetUsersOnlineStatusReq, GetUsersOnlineStatusResp, KickUserOfflineReq, KickUserOfflineResp,
    OnlineBatchPushOneMsgReq, OnlineBatchPushOneMsgResp, OnlinePushMsgReq, OnlinePushMsgResp,
    SingleMsgToUserPlatform, SingleMsgToUserResultList,
};
use crate::services::RelayService;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

const CORRELATION_HEADER: &str = "x-correlation-id";
const ONLINE_STATUS: &str = "online";

/// Correlation id carried in from request metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

/// Copies the caller's correlation id into request extensions
pub fn correlation_interceptor(mut req: Request<()>) -> Result<Request<()>, Status> {
    let correlation_id = req
        .metadata()
        .get(CORRELATION_HEADER)
        .or_else(|| req.metadata().get("correlation-id"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    if let Some(id) = correlation_id {
        req.extensions_mut().insert(CorrelationId(id));
    }
    Ok(req)
}

#[derive(Clone)]
pub struct OnlineRelayServer {
    relay: RelayService,
}

impl OnlineRelayServer {
    pub fn new(relay: RelayService) -> Self {
        Self { relay }
    }
}

/// Request operation id, or the correlation id when the caller sent none
fn operation_id_of<T>(req: &Request<T>, operation_id: &str) -> String {
    if !operation_id.is_empty() {
        return operation_id.to_string();
    }
    req.extensions()
        .get::<CorrelationId>()
        .map(|c| c.0.clone())
        .unwrap_or_default()
}

fn finish<T>(timer: RpcTimer, result: Result<T, Status>) -> Result<Response<T>, Status> {
    match result {
        Ok(resp) => {
            timer.complete("OK");
            Ok(Response::new(resp))
        }
        Err(status) => {
            timer.complete(&format!("{:?}", status.code()));
            Err(status)
        }
    }
}

fn platform_outcome_to_proto(outcome: &PlatformOutcome) -> SingleMsgToUserPlatform {
    SingleMsgToUserPlatform {
        result_code: outcome.outcome.result_code(),
        recv_id: outcome.user_id.clone(),
        recv_platform_id: outcome.platform.id(),
    }
}

fn user_result_to_proto(result: &UserPushResult) -> SingleMsgToUserResultList {
    SingleMsgToUserResultList {
        user_id: result.user_id.clone(),
        resp: result.outcomes.iter().map(platform_outcome_to_proto).collect(),
        online_push: result.pushed_via_terminal,
    }
}

fn status_to_proto(status: &OnlinePlatformStatus) -> SuccessResult {
    SuccessResult {
        user_id: status.user_id.clone(),
        status: ONLINE_STATUS.to_string(),
        detail_platform_status: status
            .platforms
            .iter()
            .map(|platform| SuccessDetail {
                platform: platform.name().to_string(),
                status: ONLINE_STATUS.to_string(),
            })
            .collect(),
    }
}

impl OnlineRelayServer {
    async fn handle_online_push(
        &self,
        req: Request<OnlinePushMsgReq>,
    ) -> Result<OnlinePushMsgResp, Status> {
        let operation_id = operation_id_of(&req, &req.get_ref().operation_id);
        let req = req.into_inner();

        if req.push_to_user_id.is_empty() {
            return Err(
                RelayError::InvalidArgument("push_to_user_id is required".into()).into(),
            );
        }
        let msg_data = req
            .msg_data
            .ok_or_else(|| RelayError::InvalidArgument("msg_data is required".into()))?;

        let outcomes = self
            .relay
            .push_to_user(&operation_id, &msg_data, &req.push_to_user_id)
            .await;

        Ok(OnlinePushMsgResp {
            resp: outcomes.iter().map(platform_outcome_to_proto).collect(),
        })
    }

    async fn handle_batch_push(
        &self,
        req: Request<OnlineBatchPushOneMsgReq>,
        filtered: bool,
    ) -> Result<OnlineBatchPushOneMsgResp, Status> {
        let operation_id = operation_id_of(&req, &req.get_ref().operation_id);
        let req = req.into_inner();
        let msg_data = req
            .msg_data
            .ok_or_else(|| RelayError::InvalidArgument("msg_data is required".into()))?;

        let results = if filtered {
            self.relay
                .push_filtered_to_users(&operation_id, msg_data, &req.push_to_user_id_list)
                .await?
        } else {
            self.relay
                .push_same_to_users(&operation_id, &msg_data, &req.push_to_user_id_list)
                .await
        };

        Ok(OnlineBatchPushOneMsgResp {
            single_push_result: results.iter().map(user_result_to_proto).collect(),
        })
    }

    async fn handle_online_status(
        &self,
        req: Request<GetUsersOnlineStatusReq>,
    ) -> Result<GetUsersOnlineStatusResp, Status> {
        let operation_id = operation_id_of(&req, &req.get_ref().operation_id);
        let req = req.into_inner();

        match self
            .relay
            .query_online_status(&req.op_user_id, &req.user_id_list)
            .await
        {
            Ok(statuses) => Ok(GetUsersOnlineStatusResp {
                err_code: 0,
                err_msg: String::new(),
                success_result: statuses.iter().map(status_to_proto).collect(),
            }),
            Err(RelayError::AccessDenied) => {
                warn!(
                    operation_id = %operation_id,
                    op_user_id = %req.op_user_id,
                    "Online status requested by non-manager"
                );
                Ok(GetUsersOnlineStatusResp {
                    err_code: ERR_ACCESS_CODE,
                    err_msg: ERR_ACCESS_MSG.to_string(),
                    success_result: Vec::new(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn handle_kick(
        &self,
        req: Request<KickUserOfflineReq>,
    ) -> Result<KickUserOfflineResp, Status> {
        let operation_id = operation_id_of(&req, &req.get_ref().operation_id);
        let req = req.into_inner();

        let platform = match req.platform_id {
            0 => None,
            id => Some(Platform::from_id(id).ok_or_else(|| {
                RelayError::InvalidArgument(format!("unknown platform_id {}", id))
            })?),
        };

        let kicked = self.relay.kick_users(&req.kick_user_id_list, platform).await;
        info!(
            operation_id = %operation_id,
            users = req.kick_user_id_list.len(),
            kicked,
            "Kicked users offline"
        );

        Ok(KickUserOfflineResp {})
    }
}

#[tonic::async_trait]
impl OnlineMessageRelayService for OnlineRelayServer {
    async fn online_push_msg(
        &self,
        request: Request<OnlinePushMsgReq>,
    ) -> Result<Response<OnlinePushMsgResp>, Status> {
        let timer = RpcTimer::start("OnlinePushMsg");
        finish(timer, self.handle_online_push(request).await)
    }

    async fn get_users_online_status(
        &self,
        request: Request<GetUsersOnlineStatusReq>,
    ) -> Result<Response<GetUsersOnlineStatusResp>, Status> {
        let timer = RpcTimer::start("GetUsersOnlineStatus");
        finish(timer, self.handle_online_status(request).await)
    }

    async fn online_batch_push_one_msg(
        &self,
        request: Request<OnlineBatchPushOneMsgReq>,
    ) -> Result<Response<OnlineBatchPushOneMsgResp>, Status> {
        let timer = RpcTimer::start("OnlineBatchPushOneMsg");
        finish(timer, self.handle_batch_push(request, true).await)
    }

    async fn super_group_online_batch_push_one_msg(
        &self,
        request: Request<OnlineBatchPushOneMsgReq>,
    ) -> Result<Response<OnlineBatchPushOneMsgResp>, Status> {
        let timer = RpcTimer::start("SuperGroupOnlineBatchPushOneMsg");
        finish(timer, self.handle_batch_push(request, false).await)
    }

    async fn kick_user_offline(
        &self,
        request: Request<KickUserOfflineReq>,
    ) -> Result<Response<KickUserOfflineResp>, Status> {
        let timer = RpcTimer::start("KickUserOffline");
        finish(timer, self.handle_kick(request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::metadata::MetadataValue;

    #[test]
    fn test_interceptor_stores_correlation_id() {
        let mut req = Request::new(());
        req.metadata_mut()
            .insert(CORRELATION_HEADER, MetadataValue::from_static("corr-1"));

        let req = correlation_interceptor(req).unwrap();
        assert_eq!(
            req.extensions().get::<CorrelationId>(),
            Some(&CorrelationId("corr-1".into()))
        );
    }

    #[test]
    fn test_operation_id_prefers_request_field() {
        let mut req = Request::new(());
        req.extensions_mut().insert(CorrelationId("corr-1".into()));

        assert_eq!(operation_id_of(&req, "op-1"), "op-1");
        assert_eq!(operation_id_of(&req, ""), "corr-1");
        assert_eq!(operation_id_of(&Request::new(()), ""), "");
    }

    #[test]
    fn test_status_uses_platform_names() {
        let status = status_to_proto(&OnlinePlatformStatus {
            user_id: "alice".into(),
            platforms: vec![Platform::Ios, Platform::Osx],
        });

        assert_eq!(status.status, "online");
        let names: Vec<_> = status
            .detail_platform_status
            .iter()
            .map(|d| d.platform.as_str())
            .collect();
        assert_eq!(names, vec!["IOS", "OSX"]);
    }
}
