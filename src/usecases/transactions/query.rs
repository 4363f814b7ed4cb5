//! Transaction request lookups

use crate::entities::{TxRequest, TxRequestFilters};
use crate::error::SchedulerResult;
use crate::store::{self, DataStore};

use std::sync::Arc;
use uuid::Uuid;

const GET_TX_COMPONENT: &str = "use-cases.get-tx";
const SEARCH_TXS_COMPONENT: &str = "use-cases.search-txs";

/// Request with its schedule and the full job graph
#[derive(Clone)]
pub struct GetTxUseCase {
    store: Arc<dyn DataStore>,
}

impl GetTxUseCase {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, uuid: Uuid, tenants: &[String]) -> SchedulerResult<TxRequest> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(GET_TX_COMPONENT))?;
        let result = tx.find_tx_request(uuid, tenants).await;
        store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(GET_TX_COMPONENT))
    }
}

#[derive(Clone)]
pub struct SearchTransactionsUseCase {
    store: Arc<dyn DataStore>,
}

impl SearchTransactionsUseCase {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        filters: &TxRequestFilters,
        tenants: &[String],
    ) -> SchedulerResult<Vec<TxRequest>> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| e.extend_component(SEARCH_TXS_COMPONENT))?;
        let result = tx.search_tx_requests(filters, tenants).await;
        store::finish(tx, result)
            .await
            .map_err(|e| e.extend_component(SEARCH_TXS_COMPONENT))
    }
}
