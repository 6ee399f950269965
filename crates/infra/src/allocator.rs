//! Store-backed FEFO allocation planning.

use tracing::instrument;

use shopledger_core::ProductId;
use shopledger_inventory::{AllocationPlan, plan_allocation};

use crate::error::ServiceError;
use crate::store::LedgerStore;

/// Plans lot debits for one product against the store's current lots.
///
/// Read-only: the plan is a preview, nothing is reserved. The sale committer
/// re-plans inside its own commit.
#[derive(Debug, Clone)]
pub struct InventoryAllocator<S> {
    store: S,
}

impl<S: LedgerStore> InventoryAllocator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn allocate(&self, product_id: ProductId, requested: i64) -> Result<AllocationPlan, ServiceError> {
        if self.store.get_product(product_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("product {product_id}")));
        }
        let lots = self.store.find_lots_by_product(product_id).await?;
        Ok(plan_allocation(product_id, &lots, requested)?)
    }
}
