//! One tick of a job session: decide whether the job needs another attempt

use crate::entities::{all_tenants, Job, JobFilters, JobStatus, RetryPolicy};
use crate::error::{SchedulerError, SchedulerResult};
use crate::usecases::UseCases;

use ethers::types::U256;
use tracing::{debug, info};

pub const RETRY_ORDER_LABEL: &str = "retryOrder";

const BASIS_POINTS: u64 = 10_000;

/// What a session should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep watching the job
    Continue,
    /// The job left PENDING
    Settled,
    /// Every allowed attempt has been made
    Exhausted,
}

pub fn is_retry_policy(policy: &RetryPolicy) -> bool {
    policy.interval_secs > 0
}

pub async fn retry_tick(
    usecases: &UseCases,
    job: &Job,
    max_retries: u32,
) -> SchedulerResult<TickOutcome> {
    let tenants = all_tenants();
    let filters = JobFilters {
        parent_job_uuid: Some(job.uuid),
        ..Default::default()
    };
    let group = usecases.search_jobs.execute(&filters, &tenants).await?;

    let parent = group
        .iter()
        .find(|j| j.uuid == job.uuid)
        .ok_or_else(|| SchedulerError::not_found("job", job.uuid))?;
    if parent.status() != JobStatus::Pending {
        debug!(job = %job.uuid, status = %parent.status(), "Job is no longer pending");
        return Ok(TickOutcome::Settled);
    }

    let policy = &parent.internal_data.retry_policy;
    if !is_retry_policy(policy) {
        return Ok(TickOutcome::Continue);
    }

    let children = group.iter().filter(|j| j.uuid != job.uuid).count();
    // the group is ordered by creation time
    let last_attempt = group.last().unwrap_or(parent);
    let resends = last_attempt
        .logs
        .iter()
        .filter(|l| l.status == JobStatus::Resending)
        .count();
    let attempts = children + resends;
    if attempts >= max_retries as usize {
        info!(job = %job.uuid, attempts, "Retry budget exhausted");
        return Ok(TickOutcome::Exhausted);
    }

    if policy.increment > 0.0 && !parent.job_type.is_raw() {
        if let Some(child) = retry_child(parent, children)? {
            let child = usecases.create_job.execute(child, &tenants).await?;
            usecases.start_job.execute(child.uuid, &tenants).await?;
            info!(
                job = %job.uuid,
                child = %child.uuid,
                gas_price = child.transaction.gas_price.as_deref().unwrap_or_default(),
                "Retried job with a higher gas price"
            );
            return Ok(TickOutcome::Continue);
        }
    }

    usecases
        .resend_job_tx
        .execute(last_attempt.uuid, &tenants)
        .await?;
    info!(job = %job.uuid, attempt = %last_attempt.uuid, "Resent job transaction");
    Ok(TickOutcome::Continue)
}

/// Child job repeating `parent` with an escalated gas price. `None` when the
/// parent has no gas price to escalate yet.
fn retry_child(parent: &Job, children: usize) -> SchedulerResult<Option<Job>> {
    let base = match parent.transaction.gas_price.as_deref().filter(|g| !g.is_empty()) {
        Some(gas_price) => parse_amount(gas_price)?,
        None => return Ok(None),
    };
    let policy = &parent.internal_data.retry_policy;
    let gas_price = escalate_gas_price(base, children + 1, policy.increment, policy.limit);

    let mut transaction = parent.transaction.clone();
    transaction.gas_price = Some(gas_price.to_string());
    transaction.hash = None;
    transaction.raw = None;

    let mut child = Job::new(parent.schedule_uuid, parent.chain_uuid, parent.job_type, transaction);
    child.internal_data = parent.internal_data.clone();
    child.internal_data.parent_job_uuid = Some(parent.uuid);
    child.internal_data.has_been_retried = false;
    child.labels = parent.labels.clone();
    child
        .labels
        .insert(RETRY_ORDER_LABEL.to_string(), (children + 1).to_string());
    Ok(Some(child))
}

/// `base * (1 + min(order * increment, limit))`, rounded down to wei
pub fn escalate_gas_price(base: U256, order: usize, increment: f64, limit: f64) -> U256 {
    let factor = (order as f64 * increment).min(limit).max(0.0);
    let bps = (factor * BASIS_POINTS as f64).round() as u64;
    base * U256::from(BASIS_POINTS + bps) / U256::from(BASIS_POINTS)
}

fn parse_amount(value: &str) -> SchedulerResult<U256> {
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None => U256::from_dec_str(value).ok(),
    };
    parsed.ok_or_else(|| SchedulerError::Data(format!("invalid gas price '{}'", value)))
}
