//! The stock engine: sales, receipts, manual adjustments and voids

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ProductStock, StockError, StockLedger, StockResult};
use crate::models::{
    DocumentStatus, InventoryMovement, MovementKind, PaymentType, Purchase, PurchaseItem, Sale,
    SaleItem,
};
use crate::validation::{
    validate_non_negative_amount, validate_positive_amount, validate_quantity, MAX_AMOUNT,
};

/// Reason stored on manual movements when staff give none
pub const DEFAULT_ADJUSTMENT_REASON: &str = "Movimiento manual de inventario";

/// Reason stored on the movement that seeds a new product's stock
pub const INITIAL_STOCK_REASON: &str = "Inventario inicial";

// ============================================================================
// Requests and receipts
// ============================================================================

/// One line of a sale as entered at the register
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleLine {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(alias = "price_at_sale")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct SaleRequest {
    pub actor_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub payment_type: PaymentType,
    pub cash_register_session_id: Option<Uuid>,
    /// Defaults to now; set explicitly only when importing or testing
    pub sale_date: Option<DateTime<Utc>>,
    pub items: Vec<SaleLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub movements: Vec<InventoryMovement>,
}

/// One line of a supplier receipt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub cost_at_purchase: Decimal,
}

#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub actor_id: Uuid,
    pub supplier_id: Uuid,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<PurchaseLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
    pub movements: Vec<InventoryMovement>,
}

#[derive(Debug, Clone)]
pub struct AdjustmentRequest {
    pub actor_id: Uuid,
    pub product_id: Uuid,
    pub kind: MovementKind,
    pub quantity: i32,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Adjustment {
    pub movement: InventoryMovement,
    pub stock_after: i32,
}

/// Result of voiding a sale or purchase
#[derive(Debug, Clone, Serialize)]
pub struct VoidReceipt {
    pub document_id: Uuid,
    pub voided_at: DateTime<Utc>,
    /// Compensating movements, one per document line
    pub movements: Vec<InventoryMovement>,
}

// ============================================================================
// Engine
// ============================================================================

/// Applies stock rules. Holds only the store's UTC offset, which decides
/// what "the same business day" means for voids.
#[derive(Debug, Clone, Copy)]
pub struct StockEngine {
    utc_offset: FixedOffset,
}

impl Default for StockEngine {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl StockEngine {
    pub fn new(utc_offset: FixedOffset) -> Self {
        Self { utc_offset }
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Calendar day of an instant in the store's local time
    pub fn business_day(&self, at: DateTime<Utc>) -> NaiveDate {
        self.utc_offset.from_utc_datetime(&at.naive_utc()).date_naive()
    }

    /// Record a sale: header, items, one VENTA movement per item.
    ///
    /// Quantities of repeated products are summed before the stock check, so
    /// a sale can never oversell by splitting a product across lines.
    pub async fn record_sale<L: StockLedger>(
        &self,
        ledger: &mut L,
        request: SaleRequest,
    ) -> StockResult<SaleReceipt> {
        if request.items.is_empty() {
            return Err(StockError::validation(
                "items",
                "A sale needs at least one item",
            ));
        }
        for line in &request.items {
            validate_quantity(line.quantity)
                .map_err(|msg| StockError::validation("items.quantity", msg))?;
            validate_non_negative_amount(line.unit_price)
                .map_err(|msg| StockError::validation("items.unit_price", msg))?;
        }

        if let Some(customer_id) = request.customer_id {
            if !ledger.customer_exists(customer_id).await? {
                return Err(StockError::CustomerNotFound(customer_id));
            }
        }

        let demand = demand_by_product(request.items.iter().map(|l| (l.product_id, l.quantity)));
        let products = lock_products(ledger, &demand).await?;
        for (product_id, requested) in &demand {
            let product = require_active(&products, *product_id)?;
            ensure_available(product, *requested)?;
        }

        let now = Utc::now();
        let sale_id = Uuid::new_v4();
        let items: Vec<SaleItem> = request
            .items
            .iter()
            .map(|line| SaleItem {
                id: Uuid::new_v4(),
                sale_id,
                product_id: line.product_id,
                quantity: line.quantity,
                price_at_sale: line.unit_price,
            })
            .collect();
        let total_amount = document_total(items.iter().map(SaleItem::line_total))?;
        let sale = Sale {
            id: sale_id,
            user_id: request.actor_id,
            customer_id: request.customer_id,
            cash_register_session_id: request.cash_register_session_id,
            payment_type: request.payment_type,
            total_amount,
            sale_date: request.sale_date.unwrap_or(now),
            status: DocumentStatus::Completed,
            voided_at: None,
            voided_by: None,
            created_at: now,
        };
        ledger.insert_sale(&sale, &items).await?;

        let mut movements = Vec::with_capacity(items.len());
        for item in &items {
            ledger
                .apply_stock_change(item.product_id, -item.quantity, None)
                .await?;
            let mut movement = InventoryMovement::record(
                item.product_id,
                request.actor_id,
                MovementKind::Sale,
                item.quantity,
                format!("Venta #{sale_id}"),
            );
            movement.notes = Some(format!("Venta de {} unidades", item.quantity));
            movement.related_sale_id = Some(sale_id);
            ledger.insert_movement(&movement).await?;
            movements.push(movement);
        }

        Ok(SaleReceipt {
            sale,
            items,
            movements,
        })
    }

    /// Receive goods from a supplier: stock up, cost overwritten with the
    /// purchase cost, one COMPRA_PROVEEDOR movement per item.
    pub async fn record_purchase_receipt<L: StockLedger>(
        &self,
        ledger: &mut L,
        request: PurchaseRequest,
    ) -> StockResult<PurchaseReceipt> {
        if request.items.is_empty() {
            return Err(StockError::validation(
                "items",
                "A purchase needs at least one item",
            ));
        }
        for line in &request.items {
            validate_quantity(line.quantity)
                .map_err(|msg| StockError::validation("items.quantity", msg))?;
            validate_positive_amount(line.cost_at_purchase)
                .map_err(|msg| StockError::validation("items.cost_at_purchase", msg))?;
        }

        if !ledger.supplier_exists(request.supplier_id).await? {
            return Err(StockError::SupplierNotFound(request.supplier_id));
        }

        let demand = demand_by_product(request.items.iter().map(|l| (l.product_id, l.quantity)));
        let products = lock_products(ledger, &demand).await?;
        for (product_id, received) in &demand {
            let product = require_active(&products, *product_id)?;
            ensure_capacity(product, *received, "items.quantity")?;
        }

        let invoice_number = request
            .invoice_number
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let now = Utc::now();
        let purchase_id = Uuid::new_v4();
        let items: Vec<PurchaseItem> = request
            .items
            .iter()
            .map(|line| PurchaseItem {
                id: Uuid::new_v4(),
                purchase_id,
                product_id: line.product_id,
                quantity: line.quantity,
                cost_at_purchase: line.cost_at_purchase,
            })
            .collect();
        let total_amount = document_total(items.iter().map(PurchaseItem::line_total))?;
        let purchase = Purchase {
            id: purchase_id,
            supplier_id: request.supplier_id,
            user_id: request.actor_id,
            invoice_number,
            notes: request.notes,
            total_amount,
            purchase_date: now,
            status: DocumentStatus::Completed,
            voided_at: None,
            voided_by: None,
            created_at: now,
        };
        ledger.insert_purchase(&purchase, &items).await?;

        let reason = format!(
            "Compra a proveedor - Factura: {}",
            purchase.invoice_number.as_deref().unwrap_or("Sin factura")
        );
        let mut movements = Vec::with_capacity(items.len());
        for item in &items {
            ledger
                .apply_stock_change(item.product_id, item.quantity, Some(item.cost_at_purchase))
                .await?;
            let mut movement = InventoryMovement::record(
                item.product_id,
                request.actor_id,
                MovementKind::SupplierPurchase,
                item.quantity,
                reason.clone(),
            );
            movement.notes = Some(format!("Costo unitario: {}", item.cost_at_purchase));
            movement.related_purchase_id = Some(purchase_id);
            ledger.insert_movement(&movement).await?;
            movements.push(movement);
        }

        Ok(PurchaseReceipt {
            purchase,
            items,
            movements,
        })
    }

    /// Record a manual movement (ENTRY, EXIT, ADJUSTMENT or DAMAGE)
    pub async fn record_adjustment<L: StockLedger>(
        &self,
        ledger: &mut L,
        request: AdjustmentRequest,
    ) -> StockResult<Adjustment> {
        if !request.kind.is_manual() {
            return Err(StockError::validation(
                "movement_type",
                format!(
                    "{} movements are created by documents, use ENTRY, EXIT, ADJUSTMENT or DAMAGE",
                    request.kind
                ),
            ));
        }
        validate_quantity(request.quantity)
            .map_err(|msg| StockError::validation("quantity", msg))?;

        let locked = ledger.lock_products(&[request.product_id]).await?;
        let product = locked
            .iter()
            .find(|p| p.id == request.product_id)
            .ok_or(StockError::ProductNotFound(request.product_id))?;

        let delta = request.kind.sign() * request.quantity;
        if delta < 0 {
            ensure_available(product, i64::from(request.quantity))?;
        } else {
            ensure_capacity(product, i64::from(request.quantity), "quantity")?;
        }

        let stock_after = ledger
            .apply_stock_change(request.product_id, delta, None)
            .await?;
        let reason = request
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_ADJUSTMENT_REASON.to_string());
        let mut movement = InventoryMovement::record(
            request.product_id,
            request.actor_id,
            request.kind,
            request.quantity,
            reason,
        );
        movement.notes = request.notes;
        ledger.insert_movement(&movement).await?;

        Ok(Adjustment {
            movement,
            stock_after,
        })
    }

    /// Void a sale made on the current business day.
    ///
    /// Stock is restored with one AJUSTE_POSITIVO movement per item, each
    /// pointing at the VENTA movement it compensates. The sale and its
    /// original movements are kept; the sale is marked VOIDED.
    pub async fn void_sale<L: StockLedger>(
        &self,
        ledger: &mut L,
        sale_id: Uuid,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> StockResult<VoidReceipt> {
        let record = ledger
            .load_sale(sale_id)
            .await?
            .filter(|r| !r.sale.is_voided())
            .ok_or(StockError::SaleNotFound(sale_id))?;

        if record.return_count > 0 {
            return Err(StockError::SaleHasReturns(sale_id));
        }
        let sale_day = self.business_day(record.sale.sale_date);
        if sale_day != self.business_day(now) {
            return Err(StockError::VoidWindowClosed { sale_id, sale_day });
        }

        let demand = demand_by_product(record.items.iter().map(|i| (i.product_id, i.quantity)));
        let products = lock_products(ledger, &demand).await?;
        for (product_id, restored) in &demand {
            let product = products
                .get(product_id)
                .ok_or(StockError::ProductNotFound(*product_id))?;
            ensure_capacity(product, *restored, "items.quantity")?;
        }

        let mut originals = Originals::new(&record.movements, MovementKind::Sale);
        let mut movements = Vec::with_capacity(record.items.len());
        for item in &record.items {
            ledger
                .apply_stock_change(item.product_id, item.quantity, None)
                .await?;
            let mut movement = InventoryMovement::record(
                item.product_id,
                actor_id,
                MovementKind::PositiveCorrection,
                item.quantity,
                format!("Anulación de venta #{sale_id}"),
            );
            movement.notes = Some(format!(
                "Devolución de {} unidades por anulación",
                item.quantity
            ));
            movement.related_sale_id = Some(sale_id);
            movement.reversal_of = originals.take(item.product_id, item.quantity);
            ledger.insert_movement(&movement).await?;
            movements.push(movement);
        }

        ledger.mark_sale_voided(sale_id, actor_id, now).await?;

        Ok(VoidReceipt {
            document_id: sale_id,
            voided_at: now,
            movements,
        })
    }

    /// Void a purchase, removing the received units again.
    ///
    /// Refused with insufficient stock when part of the goods has already
    /// been sold. There is no same-day restriction; product cost keeps the
    /// value set by the receipt.
    pub async fn void_purchase<L: StockLedger>(
        &self,
        ledger: &mut L,
        purchase_id: Uuid,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> StockResult<VoidReceipt> {
        let record = ledger
            .load_purchase(purchase_id)
            .await?
            .filter(|r| !r.purchase.is_voided())
            .ok_or(StockError::PurchaseNotFound(purchase_id))?;

        let demand = demand_by_product(record.items.iter().map(|i| (i.product_id, i.quantity)));
        let products = lock_products(ledger, &demand).await?;
        for (product_id, requested) in &demand {
            let product = products
                .get(product_id)
                .ok_or(StockError::ProductNotFound(*product_id))?;
            ensure_available(product, *requested)?;
        }

        let mut originals = Originals::new(&record.movements, MovementKind::SupplierPurchase);
        let mut movements = Vec::with_capacity(record.items.len());
        for item in &record.items {
            ledger
                .apply_stock_change(item.product_id, -item.quantity, None)
                .await?;
            let mut movement = InventoryMovement::record(
                item.product_id,
                actor_id,
                MovementKind::NegativeCorrection,
                item.quantity,
                format!("Eliminación de compra - ID: {purchase_id}"),
            );
            movement.related_purchase_id = Some(purchase_id);
            movement.reversal_of = originals.take(item.product_id, item.quantity);
            ledger.insert_movement(&movement).await?;
            movements.push(movement);
        }

        ledger.mark_purchase_voided(purchase_id, actor_id, now).await?;

        Ok(VoidReceipt {
            document_id: purchase_id,
            voided_at: now,
            movements,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Total requested units per product, keyed in id order so rows are always
/// locked in the same sequence.
fn demand_by_product(lines: impl Iterator<Item = (Uuid, i32)>) -> BTreeMap<Uuid, i64> {
    let mut demand = BTreeMap::new();
    for (product_id, quantity) in lines {
        *demand.entry(product_id).or_insert(0) += i64::from(quantity);
    }
    demand
}

async fn lock_products<L: StockLedger>(
    ledger: &mut L,
    demand: &BTreeMap<Uuid, i64>,
) -> StockResult<HashMap<Uuid, ProductStock>> {
    let ids: Vec<Uuid> = demand.keys().copied().collect();
    let locked = ledger.lock_products(&ids).await?;
    Ok(locked.into_iter().map(|p| (p.id, p)).collect())
}

fn require_active(
    products: &HashMap<Uuid, ProductStock>,
    product_id: Uuid,
) -> StockResult<&ProductStock> {
    let product = products
        .get(&product_id)
        .ok_or(StockError::ProductNotFound(product_id))?;
    if !product.is_active {
        return Err(StockError::ProductInactive {
            product_id,
            name: product.name.clone(),
        });
    }
    Ok(product)
}

fn ensure_available(product: &ProductStock, requested: i64) -> StockResult<()> {
    if i64::from(product.stock) < requested {
        return Err(StockError::InsufficientStock {
            product_id: product.id,
            name: product.name.clone(),
            available: product.stock,
            requested,
        });
    }
    Ok(())
}

/// Stock is an `INTEGER` column; refuse additions that would overflow it
fn ensure_capacity(product: &ProductStock, added: i64, field: &'static str) -> StockResult<()> {
    if i64::from(product.stock) + added > i64::from(i32::MAX) {
        return Err(StockError::validation(
            field,
            format!(
                "Stock for '{}' would exceed {} units",
                product.name,
                i32::MAX
            ),
        ));
    }
    Ok(())
}

/// Sum of line totals, refused when it leaves the money column's range
fn document_total(mut lines: impl Iterator<Item = Option<Decimal>>) -> StockResult<Decimal> {
    lines
        .try_fold(Decimal::ZERO, |total, line| line.and_then(|l| total.checked_add(l)))
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or_else(|| StockError::validation("items", "Document total is too large"))
}

/// Original document movements not yet paired with a compensation
struct Originals<'a> {
    movements: Vec<&'a InventoryMovement>,
}

impl<'a> Originals<'a> {
    fn new(movements: &'a [InventoryMovement], kind: MovementKind) -> Self {
        Self {
            movements: movements
                .iter()
                .filter(|m| m.movement_type == kind && m.reversal_of.is_none())
                .collect(),
        }
    }

    fn take(&mut self, product_id: Uuid, quantity: i32) -> Option<Uuid> {
        let pos = self
            .movements
            .iter()
            .position(|m| m.product_id == product_id && m.quantity == quantity)?;
        Some(self.movements.remove(pos).id)
    }
}
