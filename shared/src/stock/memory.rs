//! In-memory ledger
//!
//! [`MemoryStore::begin`] hands out a [`MemoryLedger`] working on a private
//! copy of the store. `commit` publishes the copy; dropping the ledger throws
//! it away. Locks are not modelled: tests drive one ledger at a time.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{
    LedgerError, LedgerResult, ProductStock, PurchaseRecord, SaleRecord, StockLedger,
    INITIAL_STOCK_REASON,
};
use crate::models::{
    DocumentStatus, InventoryMovement, MovementKind, Purchase, PurchaseItem, Sale, SaleItem,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub products: BTreeMap<Uuid, ProductStock>,
    pub suppliers: BTreeSet<Uuid>,
    pub customers: BTreeSet<Uuid>,
    pub sales: BTreeMap<Uuid, (Sale, Vec<SaleItem>)>,
    pub purchases: BTreeMap<Uuid, (Purchase, Vec<PurchaseItem>)>,
    pub movements: Vec<InventoryMovement>,
    /// Number of returns registered per sale
    pub returns: BTreeMap<Uuid, i64>,
}

impl MemoryState {
    pub fn movements_for(&self, product_id: Uuid) -> Vec<&InventoryMovement> {
        self.movements
            .iter()
            .filter(|m| m.product_id == product_id)
            .collect()
    }

    /// Sum of all signed deltas recorded for a product
    pub fn movement_balance(&self, product_id: Uuid) -> i64 {
        self.movements_for(product_id)
            .iter()
            .map(|m| i64::from(m.quantity_change))
            .sum()
    }
}

/// Shared, committed state
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a unit of work over a copy of the committed state
    pub fn begin(&self) -> MemoryLedger {
        MemoryLedger {
            store: self.clone(),
            working: self.lock().clone(),
        }
    }

    pub fn snapshot(&self) -> MemoryState {
        self.lock().clone()
    }

    /// Add an active product. Initial stock is recorded as an ENTRY movement
    /// so the stock always equals the sum of its movements.
    pub fn add_product(&self, name: &str, stock: i32, cost: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        let mut state = self.lock();
        state.products.insert(
            id,
            ProductStock {
                id,
                name: name.to_string(),
                sku: None,
                stock,
                cost,
                is_active: true,
            },
        );
        if stock > 0 {
            state.movements.push(InventoryMovement::record(
                id,
                Uuid::nil(),
                MovementKind::Entry,
                stock,
                INITIAL_STOCK_REASON,
            ));
        }
        id
    }

    pub fn set_active(&self, product_id: Uuid, is_active: bool) {
        if let Some(product) = self.lock().products.get_mut(&product_id) {
            product.is_active = is_active;
        }
    }

    pub fn add_supplier(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().suppliers.insert(id);
        id
    }

    pub fn add_customer(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().customers.insert(id);
        id
    }

    pub fn add_return(&self, sale_id: Uuid) {
        *self.lock().returns.entry(sale_id).or_insert(0) += 1;
    }

    pub fn product(&self, product_id: Uuid) -> Option<ProductStock> {
        self.lock().products.get(&product_id).cloned()
    }

    pub fn sale(&self, sale_id: Uuid) -> Option<Sale> {
        self.lock().sales.get(&sale_id).map(|(sale, _)| sale.clone())
    }

    pub fn purchase(&self, purchase_id: Uuid) -> Option<Purchase> {
        self.lock()
            .purchases
            .get(&purchase_id)
            .map(|(purchase, _)| purchase.clone())
    }
}

/// Unit of work over a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryLedger {
    store: MemoryStore,
    working: MemoryState,
}

impl MemoryLedger {
    fn linked_movements(&self, matches: impl Fn(&InventoryMovement) -> bool) -> Vec<InventoryMovement> {
        let mut movements: Vec<_> = self
            .working
            .movements
            .iter()
            .filter(|m| matches(m))
            .cloned()
            .collect();
        movements.sort_by_key(|m| m.created_at);
        movements
    }
}

#[async_trait]
impl StockLedger for MemoryLedger {
    async fn lock_products(&mut self, ids: &[Uuid]) -> LedgerResult<Vec<ProductStock>> {
        let mut found: Vec<ProductStock> = ids
            .iter()
            .filter_map(|id| self.working.products.get(id).cloned())
            .collect();
        found.sort_by_key(|p| p.id);
        found.dedup_by_key(|p| p.id);
        Ok(found)
    }

    async fn supplier_exists(&mut self, id: Uuid) -> LedgerResult<bool> {
        Ok(self.working.suppliers.contains(&id))
    }

    async fn customer_exists(&mut self, id: Uuid) -> LedgerResult<bool> {
        Ok(self.working.customers.contains(&id))
    }

    async fn apply_stock_change(
        &mut self,
        product_id: Uuid,
        delta: i32,
        cost: Option<Decimal>,
    ) -> LedgerResult<i32> {
        let product = self
            .working
            .products
            .get_mut(&product_id)
            .ok_or_else(|| LedgerError::MissingReference(format!("product {product_id}")))?;
        let stock = product.stock.checked_add(delta).ok_or_else(|| {
            LedgerError::Storage(format!("stock overflow for product {product_id}").into())
        })?;
        if stock < 0 {
            return Err(LedgerError::NegativeStock { product_id });
        }
        product.stock = stock;
        if let Some(cost) = cost {
            product.cost = cost;
        }
        Ok(stock)
    }

    async fn insert_sale(&mut self, sale: &Sale, items: &[SaleItem]) -> LedgerResult<()> {
        self.working
            .sales
            .insert(sale.id, (sale.clone(), items.to_vec()));
        Ok(())
    }

    async fn insert_purchase(
        &mut self,
        purchase: &Purchase,
        items: &[PurchaseItem],
    ) -> LedgerResult<()> {
        if let Some(invoice) = &purchase.invoice_number {
            let taken = self
                .working
                .purchases
                .values()
                .any(|(p, _)| p.invoice_number.as_ref() == Some(invoice));
            if taken {
                return Err(LedgerError::Duplicate(
                    "purchases_invoice_number_key".to_string(),
                ));
            }
        }
        self.working
            .purchases
            .insert(purchase.id, (purchase.clone(), items.to_vec()));
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> LedgerResult<()> {
        self.working.movements.push(movement.clone());
        Ok(())
    }

    async fn load_sale(&mut self, id: Uuid) -> LedgerResult<Option<SaleRecord>> {
        let Some((sale, items)) = self.working.sales.get(&id).cloned() else {
            return Ok(None);
        };
        Ok(Some(SaleRecord {
            sale,
            items,
            movements: self.linked_movements(|m| m.related_sale_id == Some(id)),
            return_count: self.working.returns.get(&id).copied().unwrap_or(0),
        }))
    }

    async fn load_purchase(&mut self, id: Uuid) -> LedgerResult<Option<PurchaseRecord>> {
        let Some((purchase, items)) = self.working.purchases.get(&id).cloned() else {
            return Ok(None);
        };
        Ok(Some(PurchaseRecord {
            purchase,
            items,
            movements: self.linked_movements(|m| m.related_purchase_id == Some(id)),
        }))
    }

    async fn mark_sale_voided(
        &mut self,
        id: Uuid,
        voided_by: Uuid,
        at: DateTime<Utc>,
    ) -> LedgerResult<()> {
        let (sale, _) = self
            .working
            .sales
            .get_mut(&id)
            .ok_or_else(|| LedgerError::MissingReference(format!("sale {id}")))?;
        sale.status = DocumentStatus::Voided;
        sale.voided_at = Some(at);
        sale.voided_by = Some(voided_by);
        Ok(())
    }

    async fn mark_purchase_voided(
        &mut self,
        id: Uuid,
        voided_by: Uuid,
        at: DateTime<Utc>,
    ) -> LedgerResult<()> {
        let (purchase, _) = self
            .working
            .purchases
            .get_mut(&id)
            .ok_or_else(|| LedgerError::MissingReference(format!("purchase {id}")))?;
        purchase.status = DocumentStatus::Voided;
        purchase.voided_at = Some(at);
        purchase.voided_by = Some(voided_by);
        Ok(())
    }

    async fn commit(self) -> LedgerResult<()> {
        *self.store.lock() = self.working;
        Ok(())
    }

    async fn rollback(self) -> LedgerResult<()> {
        Ok(())
    }
}
