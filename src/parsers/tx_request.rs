//! Request fingerprints and job construction

use crate::entities::{
    Chain, EthTransaction, InternalData, Job, JobType, PrivacyProtocol, Schedule, TxParams,
    TxRequest,
};
use crate::error::SchedulerResult;

use sha3::{Digest, Keccak256};
use uuid::Uuid;

/// Deterministic fingerprint of the request parameters on a chain
pub fn request_hash(params: &TxParams, chain_uuid: Uuid) -> SchedulerResult<String> {
    // serde_json maps are key-ordered, which makes the encoding canonical
    let canonical = serde_json::to_vec(&serde_json::to_value(params)?)?;

    let mut hasher = Keccak256::new();
    hasher.update(&canonical);
    hasher.update(chain_uuid.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Jobs to schedule for a request, linked through `next_job_uuid`
pub fn jobs_from_request(
    request: &TxRequest,
    schedule: &Schedule,
    chain: &Chain,
    transaction: EthTransaction,
) -> Vec<Job> {
    let internal_data = InternalData {
        chain_id: Some(chain.chain_id.clone()),
        one_time_key: request.params.one_time_key(),
        retry_policy: request.retry_policy.clone(),
        ..Default::default()
    };
    let new_job = |job_type: JobType, transaction: EthTransaction| {
        let mut job = Job::new(schedule.uuid, chain.uuid, job_type, transaction);
        job.tenant_id = schedule.tenant_id.clone();
        job.internal_data = internal_data.clone();
        job.labels = request.labels.clone();
        job
    };

    let protocol = request.params.private().and_then(|p| p.protocol);
    match (&request.params, protocol) {
        (_, Some(PrivacyProtocol::Orion)) => {
            let private_job = new_job(JobType::OrionEeaTransaction, transaction);
            let mut marking_job = new_job(JobType::OrionMarkingTransaction, EthTransaction::default());
            marking_job.internal_data.one_time_key = true;
            link(private_job, marking_job)
        }
        (_, Some(PrivacyProtocol::Tessera)) => {
            let marking_tx = EthTransaction {
                from: transaction.from.clone(),
                private_for: transaction.private_for.clone(),
                ..Default::default()
            };
            let private_job = new_job(JobType::TesseraPrivateTransaction, transaction);
            let marking_job = new_job(JobType::TesseraMarkingTransaction, marking_tx);
            link(private_job, marking_job)
        }
        (TxParams::Raw(_), None) => vec![new_job(JobType::EthereumRawTransaction, transaction)],
        _ => vec![new_job(JobType::EthereumTransaction, transaction)],
    }
}

fn link(mut first: Job, second: Job) -> Vec<Job> {
    first.next_job_uuid = Some(second.uuid);
    vec![first, second]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CallParams, GasParams, PrivateParams, RawParams};

    fn chain() -> Chain {
        Chain {
            uuid: Uuid::new_v4(),
            name: "besu".into(),
            chain_id: "2018".into(),
        }
    }

    fn call(private: PrivateParams) -> TxParams {
        TxParams::Call(CallParams {
            from: Some("0x905B88EFf8Bda1543d4d6f4aA05afef143D27E18".into()),
            to: "0x6009608A02a7A15fd6689D6DaD560C44E9ab61Ff".into(),
            method_signature: "transfer(address,uint256)".into(),
            args: vec![],
            value: None,
            gas: GasParams::default(),
            private,
            one_time_key: false,
        })
    }

    #[test]
    fn hash_depends_on_params_and_chain() {
        let chain_uuid = Uuid::new_v4();
        let a = request_hash(&call(PrivateParams::default()), chain_uuid).unwrap();
        let b = request_hash(&call(PrivateParams::default()), chain_uuid).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other_chain = request_hash(&call(PrivateParams::default()), Uuid::new_v4()).unwrap();
        assert_ne!(a, other_chain);

        let raw = TxParams::Raw(RawParams { raw: "0x01".into() });
        assert_ne!(a, request_hash(&raw, chain_uuid).unwrap());
    }

    #[test]
    fn tessera_request_builds_linked_marking_job() {
        let chain = chain();
        let schedule = Schedule::new("tenant-a", chain.uuid);
        let params = call(PrivateParams {
            protocol: Some(PrivacyProtocol::Tessera),
            private_from: Some("A1aVtMxLCUHmBVHXoZzzBgPbW/wj5axDpW9X8l91SGo=".into()),
            private_for: vec!["Ko2bVqD+nNlNYL5EE7y3IdOnviftjiizpjRt+HTuFBs=".into()],
            privacy_group_id: None,
        });
        let request = TxRequest::new("k1", "besu", params);
        let tx = EthTransaction {
            from: Some("0x905B88EFf8Bda1543d4d6f4aA05afef143D27E18".into()),
            private_for: vec!["Ko2bVqD+nNlNYL5EE7y3IdOnviftjiizpjRt+HTuFBs=".into()],
            ..Default::default()
        };

        let jobs = jobs_from_request(&request, &schedule, &chain, tx);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_type, JobType::TesseraPrivateTransaction);
        assert_eq!(jobs[1].job_type, JobType::TesseraMarkingTransaction);
        assert_eq!(jobs[0].next_job_uuid, Some(jobs[1].uuid));
        assert_eq!(jobs[1].transaction.from, jobs[0].transaction.from);
        assert_eq!(jobs[1].transaction.private_for, jobs[0].transaction.private_for);
        assert_eq!(jobs[0].internal_data.chain_id.as_deref(), Some("2018"));
    }

    #[test]
    fn orion_marking_job_uses_one_time_key() {
        let chain = chain();
        let schedule = Schedule::new("tenant-a", chain.uuid);
        let params = call(PrivateParams {
            protocol: Some(PrivacyProtocol::Orion),
            private_from: Some("A1aVtMxLCUHmBVHXoZzzBgPbW/wj5axDpW9X8l91SGo=".into()),
            private_for: vec![],
            privacy_group_id: Some("kAbelwaVW7okoEn1+okO+AbA4Hhz/7DaCOWVQz9nx5M=".into()),
        });
        let request = TxRequest::new("k1", "besu", params);

        let jobs = jobs_from_request(&request, &schedule, &chain, EthTransaction::default());
        assert_eq!(jobs[0].job_type, JobType::OrionEeaTransaction);
        assert!(!jobs[0].internal_data.one_time_key);
        assert_eq!(jobs[1].job_type, JobType::OrionMarkingTransaction);
        assert!(jobs[1].internal_data.one_time_key);
    }

    #[test]
    fn public_requests_build_a_single_job() {
        let chain = chain();
        let schedule = Schedule::new("tenant-a", chain.uuid);

        let request = TxRequest::new("k1", "besu", call(PrivateParams::default()));
        let jobs = jobs_from_request(&request, &schedule, &chain, EthTransaction::default());
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_type, JobType::EthereumTransaction);
        assert!(jobs[0].next_job_uuid.is_none());

        let request = TxRequest::new("k2", "besu", TxParams::Raw(RawParams { raw: "0x01".into() }));
        let jobs = jobs_from_request(&request, &schedule, &chain, EthTransaction::default());
        assert_eq!(jobs[0].job_type, JobType::EthereumRawTransaction);
    }
}
