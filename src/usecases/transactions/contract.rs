//! Contract call and deployment entry points on top of SendTx

use super::send::SendTxUseCase;
use crate::entities::{TxParams, TxRequest};
use crate::error::{SchedulerError, SchedulerResult};

const SEND_CONTRACT_TX_COMPONENT: &str = "use-cases.send-contract-tx";
const SEND_DEPLOY_TX_COMPONENT: &str = "use-cases.send-deploy-tx";

/// Contract method call
#[derive(Clone)]
pub struct SendContractTxUseCase {
    send_tx: SendTxUseCase,
}

impl SendContractTxUseCase {
    pub fn new(send_tx: SendTxUseCase) -> Self {
        Self { send_tx }
    }

    pub async fn execute(&self, request: TxRequest, tenant_id: &str) -> SchedulerResult<TxRequest> {
        require_kind(&request, "call", SEND_CONTRACT_TX_COMPONENT)?;
        self.send_tx
            .execute(request, tenant_id)
            .await
            .map_err(|e| e.extend_component(SEND_CONTRACT_TX_COMPONENT))
    }
}

/// Contract deployment
#[derive(Clone)]
pub struct SendDeployTxUseCase {
    send_tx: SendTxUseCase,
}

impl SendDeployTxUseCase {
    pub fn new(send_tx: SendTxUseCase) -> Self {
        Self { send_tx }
    }

    pub async fn execute(&self, request: TxRequest, tenant_id: &str) -> SchedulerResult<TxRequest> {
        require_kind(&request, "deploy", SEND_DEPLOY_TX_COMPONENT)?;
        self.send_tx
            .execute(request, tenant_id)
            .await
            .map_err(|e| e.extend_component(SEND_DEPLOY_TX_COMPONENT))
    }
}

fn require_kind(request: &TxRequest, kind: &str, component: &'static str) -> SchedulerResult<()> {
    let matches = match &request.params {
        TxParams::Call(_) => kind == "call",
        TxParams::Deploy(_) => kind == "deploy",
        TxParams::Raw(_) | TxParams::Transfer(_) => false,
    };
    if !matches {
        return Err(SchedulerError::InvalidParameter(format!(
            "expected {} parameters, got {}",
            kind,
            request.params.kind()
        ))
        .extend_component(component));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Topics;
    use crate::entities::{
        CallParams, DeployParams, GasParams, JobStatus, JobType, PrivacyProtocol, PrivateParams,
        RawParams,
    };
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;
    use crate::testutils::{validator, RecordingProducer, RECIPIENT, SENDER, TENANT};
    use crate::usecases::jobs::{CreateJobUseCase, StartJobUseCase};
    use serde_json::json;
    use std::sync::Arc;

    fn send_tx(store: &Arc<MemoryStore>, producer: &Arc<RecordingProducer>) -> SendTxUseCase {
        SendTxUseCase::new(
            store.clone(),
            validator(),
            CreateJobUseCase::new(store.clone(), validator()),
            StartJobUseCase::new(store.clone(), producer.clone(), Topics::default()),
        )
    }

    fn call(private: PrivateParams) -> TxParams {
        TxParams::Call(CallParams {
            from: Some(SENDER.into()),
            to: RECIPIENT.into(),
            method_signature: "transfer(address,uint256)".into(),
            args: vec![json!(RECIPIENT), json!("10")],
            value: None,
            gas: GasParams::default(),
            private,
            one_time_key: false,
        })
    }

    #[tokio::test]
    async fn private_call_schedules_two_linked_jobs() {
        let store = Arc::new(MemoryStore::new());
        let producer = Arc::new(RecordingProducer::default());
        let params = call(PrivateParams {
            protocol: Some(PrivacyProtocol::Tessera),
            private_from: Some("A1aVtMxLCUHmBVHXoZzzBgPbW/wj5axDpW9X8l91SGo=".into()),
            private_for: vec!["Ko2bVqD+nNlNYL5EE7y3IdOnviftjiizpjRt+HTuFBs=".into()],
            privacy_group_id: None,
        });

        let request = SendContractTxUseCase::new(send_tx(&store, &producer))
            .execute(TxRequest::new("k-private", "besu", params), TENANT)
            .await
            .unwrap();

        let jobs = request.schedule.unwrap().jobs;
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_type, JobType::TesseraPrivateTransaction);
        assert_eq!(jobs[0].status(), JobStatus::Started);
        assert_eq!(jobs[0].next_job_uuid, Some(jobs[1].uuid));
        assert_eq!(jobs[1].status(), JobStatus::Created);
        assert_eq!(producer.sent().len(), 1);
    }

    #[tokio::test]
    async fn deploy_uses_the_registered_bytecode() {
        let store = Arc::new(MemoryStore::new());
        let producer = Arc::new(RecordingProducer::default());
        let params = TxParams::Deploy(DeployParams {
            from: Some(SENDER.into()),
            contract_name: "SimpleToken".into(),
            contract_tag: None,
            args: vec![],
            value: None,
            gas: GasParams::default(),
            private: PrivateParams::default(),
            one_time_key: false,
        });

        let request = SendDeployTxUseCase::new(send_tx(&store, &producer))
            .execute(TxRequest::new("k-deploy", "besu", params), TENANT)
            .await
            .unwrap();

        let jobs = request.schedule.unwrap().jobs;
        assert_eq!(jobs[0].transaction.data.as_deref(), Some("0x6080604052"));
        assert!(jobs[0].transaction.to.is_none());
    }

    #[tokio::test]
    async fn wrong_parameter_kind_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let producer = Arc::new(RecordingProducer::default());
        let raw = TxParams::Raw(RawParams { raw: "0xf86c".into() });

        let err = SendDeployTxUseCase::new(send_tx(&store, &producer))
            .execute(TxRequest::new("k-raw", "besu", raw), TENANT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        let err = SendContractTxUseCase::new(send_tx(&store, &producer))
            .execute(TxRequest::new("k-raw", "besu", TxParams::Raw(RawParams { raw: "0xf86c".into() })), TENANT)
            .await
            .unwrap_err();
        assert_eq!(err.components(), vec![SEND_CONTRACT_TX_COMPONENT]);
        assert!(producer.sent().is_empty());
    }
}
