//! Stock engine tests
//!
//! Tests for the stock-mutation engine against the in-memory ledger:
//! - Property 1: Stock equals the sum of movement deltas
//! - Property 2: Stock never becomes negative
//! - Property 3: A rejected sale mutates nothing
//! - Property 4: Purchase receipt followed by void restores stock
//! - Amounts and stock additions outside the storable range are refused

use chrono::{Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::stock::memory::MemoryStore;
use shared::stock::*;
use shared::{DocumentStatus, MovementKind, PaymentType};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn sale_request(actor_id: Uuid, items: Vec<SaleLine>) -> SaleRequest {
    SaleRequest {
        actor_id,
        customer_id: None,
        payment_type: PaymentType::default(),
        cash_register_session_id: None,
        sale_date: None,
        items,
    }
}

fn line(product_id: Uuid, quantity: i32, unit_price: &str) -> SaleLine {
    SaleLine {
        product_id,
        quantity,
        unit_price: dec(unit_price),
    }
}

fn purchase_request(actor_id: Uuid, supplier_id: Uuid, items: Vec<PurchaseLine>) -> PurchaseRequest {
    PurchaseRequest {
        actor_id,
        supplier_id,
        invoice_number: None,
        notes: None,
        items,
    }
}

fn adjustment(actor_id: Uuid, product_id: Uuid, kind: MovementKind, quantity: i32) -> AdjustmentRequest {
    AdjustmentRequest {
        actor_id,
        product_id,
        kind,
        quantity,
        reason: None,
        notes: None,
    }
}

async fn sell(engine: &StockEngine, store: &MemoryStore, request: SaleRequest) -> StockResult<SaleReceipt> {
    let mut ledger = store.begin();
    let receipt = engine.record_sale(&mut ledger, request).await?;
    ledger.commit().await?;
    Ok(receipt)
}

// ============================================================================
// Sales
// ============================================================================

#[tokio::test]
async fn test_sale_decrements_stock_and_links_movement() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let actor = Uuid::new_v4();
    let p = store.add_product("Cuaderno Profesional", 5, dec("20.00"));

    let receipt = sell(&engine, &store, sale_request(actor, vec![line(p, 3, "10")]))
        .await
        .unwrap();

    assert_eq!(store.product(p).unwrap().stock, 2);
    assert_eq!(receipt.sale.total_amount, dec("30"));
    assert_eq!(receipt.sale.payment_type, PaymentType::Cash);
    assert_eq!(receipt.movements.len(), 1);

    let movement = &receipt.movements[0];
    assert_eq!(movement.movement_type, MovementKind::Sale);
    assert_eq!(movement.quantity_change, -3);
    assert_eq!(movement.related_sale_id, Some(receipt.sale.id));
    assert_eq!(movement.reason, format!("Venta #{}", receipt.sale.id));

    let state = store.snapshot();
    assert_eq!(state.sales.len(), 1);
    assert_eq!(state.movement_balance(p), 2);
}

#[tokio::test]
async fn test_sale_exceeding_stock_is_rejected() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let p = store.add_product("Pluma Azul", 2, dec("3.00"));
    let before = store.snapshot().movements.len();

    let err = sell(&engine, &store, sale_request(Uuid::new_v4(), vec![line(p, 5, "10")]))
        .await
        .unwrap_err();

    match err {
        StockError::InsufficientStock {
            available,
            requested,
            ..
        } => {
            assert_eq!(available, 2);
            assert_eq!(requested, 5);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.product(p).unwrap().stock, 2);
    assert_eq!(store.snapshot().movements.len(), before);
}

#[tokio::test]
async fn test_failed_multi_item_sale_mutates_nothing() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let ok = store.add_product("Lápiz", 10, dec("1.00"));
    let short = store.add_product("Borrador", 1, dec("2.00"));
    let before = store.snapshot();

    let result = sell(
        &engine,
        &store,
        sale_request(Uuid::new_v4(), vec![line(ok, 2, "5"), line(short, 4, "6")]),
    )
    .await;

    assert!(matches!(result, Err(StockError::InsufficientStock { .. })));
    let after = store.snapshot();
    assert_eq!(after.products, before.products);
    assert_eq!(after.movements.len(), before.movements.len());
    assert!(after.sales.is_empty());
}

#[tokio::test]
async fn test_repeated_lines_are_summed_before_stock_check() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let p = store.add_product("Folder", 4, dec("2.00"));

    let result = sell(
        &engine,
        &store,
        sale_request(Uuid::new_v4(), vec![line(p, 3, "5"), line(p, 3, "5")]),
    )
    .await;

    assert!(matches!(
        result,
        Err(StockError::InsufficientStock { requested: 6, .. })
    ));
    assert_eq!(store.product(p).unwrap().stock, 4);
}

#[tokio::test]
async fn test_sale_rejects_unknown_and_inactive_products() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let inactive = store.add_product("Regla", 10, dec("4.00"));
    store.set_active(inactive, false);
    let missing = Uuid::new_v4();

    let err = sell(&engine, &store, sale_request(Uuid::new_v4(), vec![line(missing, 1, "1")]))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::ProductNotFound(id) if id == missing));

    let err = sell(&engine, &store, sale_request(Uuid::new_v4(), vec![line(inactive, 1, "1")]))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::ProductInactive { .. }));
    assert_eq!(store.product(inactive).unwrap().stock, 10);
}

#[tokio::test]
async fn test_sale_validates_lines_and_customer() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let p = store.add_product("Tijeras", 10, dec("15.00"));

    let err = sell(&engine, &store, sale_request(Uuid::new_v4(), vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::Validation { field: "items", .. }));

    let err = sell(&engine, &store, sale_request(Uuid::new_v4(), vec![line(p, 0, "1")]))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::Validation { field: "items.quantity", .. }));

    let err = sell(&engine, &store, sale_request(Uuid::new_v4(), vec![line(p, 1, "-1")]))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::Validation { field: "items.unit_price", .. }));

    let mut request = sale_request(Uuid::new_v4(), vec![line(p, 1, "20")]);
    request.customer_id = Some(Uuid::new_v4());
    let err = sell(&engine, &store, request).await.unwrap_err();
    assert!(matches!(err, StockError::CustomerNotFound(_)));

    let mut request = sale_request(Uuid::new_v4(), vec![line(p, 1, "20")]);
    request.customer_id = Some(store.add_customer());
    request.payment_type = PaymentType::Card;
    let receipt = sell(&engine, &store, request).await.unwrap();
    assert_eq!(receipt.sale.payment_type, PaymentType::Card);
    assert_eq!(store.product(p).unwrap().stock, 9);
}

#[tokio::test]
async fn test_dropped_ledger_discards_writes() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let p = store.add_product("Marcador", 8, dec("9.00"));

    {
        let mut ledger = store.begin();
        engine
            .record_sale(&mut ledger, sale_request(Uuid::new_v4(), vec![line(p, 8, "12")]))
            .await
            .unwrap();
        // never committed
    }

    assert_eq!(store.product(p).unwrap().stock, 8);
    assert!(store.snapshot().sales.is_empty());
}

// ============================================================================
// Purchases
// ============================================================================

#[tokio::test]
async fn test_purchase_receipt_adds_stock_and_overwrites_cost() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let supplier = store.add_supplier();
    let p = store.add_product("Cuaderno Profesional", 50, dec("20.00"));

    let mut request = purchase_request(
        Uuid::new_v4(),
        supplier,
        vec![PurchaseLine {
            product_id: p,
            quantity: 24,
            cost_at_purchase: dec("18.50"),
        }],
    );
    request.invoice_number = Some("  F-1001 ".to_string());

    let mut ledger = store.begin();
    let receipt = engine
        .record_purchase_receipt(&mut ledger, request)
        .await
        .unwrap();
    ledger.commit().await.unwrap();

    let product = store.product(p).unwrap();
    assert_eq!(product.stock, 74);
    assert_eq!(product.cost, dec("18.50"));
    assert_eq!(receipt.purchase.total_amount, dec("444.00"));
    assert_eq!(receipt.purchase.invoice_number.as_deref(), Some("F-1001"));

    let movement = &receipt.movements[0];
    assert_eq!(movement.movement_type, MovementKind::SupplierPurchase);
    assert_eq!(movement.quantity_change, 24);
    assert_eq!(movement.reason, "Compra a proveedor - Factura: F-1001");
    assert_eq!(movement.related_purchase_id, Some(receipt.purchase.id));
}

#[tokio::test]
async fn test_purchase_without_invoice_uses_placeholder_reason() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let supplier = store.add_supplier();
    let p = store.add_product("Clips", 0, dec("5.00"));

    let mut ledger = store.begin();
    let receipt = engine
        .record_purchase_receipt(
            &mut ledger,
            purchase_request(
                Uuid::new_v4(),
                supplier,
                vec![PurchaseLine {
                    product_id: p,
                    quantity: 10,
                    cost_at_purchase: dec("4.00"),
                }],
            ),
        )
        .await
        .unwrap();

    assert!(receipt.purchase.invoice_number.is_none());
    assert_eq!(receipt.movements[0].reason, "Compra a proveedor - Factura: Sin factura");
}

#[tokio::test]
async fn test_purchase_rejections() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let supplier = store.add_supplier();
    let p = store.add_product("Engrapadora", 3, dec("40.00"));
    let item = |cost: &str| PurchaseLine {
        product_id: p,
        quantity: 1,
        cost_at_purchase: dec(cost),
    };

    let mut ledger = store.begin();
    let err = engine
        .record_purchase_receipt(&mut ledger, purchase_request(Uuid::new_v4(), Uuid::new_v4(), vec![item("10")]))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::SupplierNotFound(_)));

    let err = engine
        .record_purchase_receipt(&mut ledger, purchase_request(Uuid::new_v4(), supplier, vec![item("0")]))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::Validation { field: "items.cost_at_purchase", .. }));

    store.set_active(p, false);
    let mut ledger = store.begin();
    let err = engine
        .record_purchase_receipt(&mut ledger, purchase_request(Uuid::new_v4(), supplier, vec![item("10")]))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::ProductInactive { .. }));
}

#[tokio::test]
async fn test_duplicate_invoice_number_is_a_conflict() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let supplier = store.add_supplier();
    let p = store.add_product("Carpeta", 0, dec("6.00"));

    for attempt in 0..2 {
        let mut request = purchase_request(
            Uuid::new_v4(),
            supplier,
            vec![PurchaseLine {
                product_id: p,
                quantity: 5,
                cost_at_purchase: dec("6.00"),
            }],
        );
        request.invoice_number = Some("A-77".to_string());

        let mut ledger = store.begin();
        let result = engine.record_purchase_receipt(&mut ledger, request).await;
        if attempt == 0 {
            result.unwrap();
            ledger.commit().await.unwrap();
        } else {
            assert!(matches!(
                result,
                Err(StockError::Ledger(LedgerError::Duplicate(_)))
            ));
        }
    }

    assert_eq!(store.product(p).unwrap().stock, 5);
}

#[tokio::test]
async fn test_void_purchase_removes_stock_and_marks_voided() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let actor = Uuid::new_v4();
    let supplier = store.add_supplier();
    let p = store.add_product("Papel Bond", 7, dec("80.00"));

    let mut ledger = store.begin();
    let receipt = engine
        .record_purchase_receipt(
            &mut ledger,
            purchase_request(
                actor,
                supplier,
                vec![PurchaseLine {
                    product_id: p,
                    quantity: 12,
                    cost_at_purchase: dec("75.00"),
                }],
            ),
        )
        .await
        .unwrap();
    ledger.commit().await.unwrap();
    assert_eq!(store.product(p).unwrap().stock, 19);

    let mut ledger = store.begin();
    let void = engine
        .void_purchase(&mut ledger, receipt.purchase.id, actor, Utc::now())
        .await
        .unwrap();
    ledger.commit().await.unwrap();

    let product = store.product(p).unwrap();
    assert_eq!(product.stock, 7);
    // last-cost is not rolled back
    assert_eq!(product.cost, dec("75.00"));

    let movement = &void.movements[0];
    assert_eq!(movement.movement_type, MovementKind::NegativeCorrection);
    assert_eq!(movement.quantity_change, -12);
    assert_eq!(movement.reversal_of, Some(receipt.movements[0].id));
    assert_eq!(
        movement.reason,
        format!("Eliminación de compra - ID: {}", receipt.purchase.id)
    );

    let purchase = store.purchase(receipt.purchase.id).unwrap();
    assert_eq!(purchase.status, DocumentStatus::Voided);
    assert_eq!(purchase.voided_by, Some(actor));

    let mut ledger = store.begin();
    let err = engine
        .void_purchase(&mut ledger, receipt.purchase.id, actor, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::PurchaseNotFound(_)));
}

#[tokio::test]
async fn test_void_purchase_refused_when_goods_already_sold() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let actor = Uuid::new_v4();
    let supplier = store.add_supplier();
    let p = store.add_product("Resistol", 0, dec("10.00"));

    let mut ledger = store.begin();
    let receipt = engine
        .record_purchase_receipt(
            &mut ledger,
            purchase_request(
                actor,
                supplier,
                vec![PurchaseLine {
                    product_id: p,
                    quantity: 5,
                    cost_at_purchase: dec("10.00"),
                }],
            ),
        )
        .await
        .unwrap();
    ledger.commit().await.unwrap();
    sell(&engine, &store, sale_request(actor, vec![line(p, 3, "15")]))
        .await
        .unwrap();

    let mut ledger = store.begin();
    let err = engine
        .void_purchase(&mut ledger, receipt.purchase.id, actor, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StockError::InsufficientStock {
            available: 2,
            requested: 5,
            ..
        }
    ));
    assert_eq!(store.product(p).unwrap().stock, 2);
}

// ============================================================================
// Manual adjustments
// ============================================================================

#[tokio::test]
async fn test_damage_adjustment_decrements_stock() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let p = store.add_product("Calculadora", 2, dec("120.00"));

    let mut request = adjustment(Uuid::new_v4(), p, MovementKind::Damage, 1);
    request.reason = Some("broken".to_string());

    let mut ledger = store.begin();
    let result = engine.record_adjustment(&mut ledger, request).await.unwrap();
    ledger.commit().await.unwrap();

    assert_eq!(result.stock_after, 1);
    assert_eq!(store.product(p).unwrap().stock, 1);
    assert_eq!(result.movement.movement_type, MovementKind::Damage);
    assert_eq!(result.movement.quantity_change, -1);
    assert_eq!(result.movement.reason, "broken");
}

#[tokio::test]
async fn test_adjustment_rules() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let actor = Uuid::new_v4();
    let p = store.add_product("Sacapuntas", 3, dec("5.00"));
    let mut ledger = store.begin();

    let err = engine
        .record_adjustment(&mut ledger, adjustment(actor, p, MovementKind::Exit, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::InsufficientStock { .. }));

    let err = engine
        .record_adjustment(&mut ledger, adjustment(actor, p, MovementKind::Sale, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::Validation { field: "movement_type", .. }));

    let err = engine
        .record_adjustment(&mut ledger, adjustment(actor, Uuid::new_v4(), MovementKind::Entry, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::ProductNotFound(_)));

    let result = engine
        .record_adjustment(&mut ledger, adjustment(actor, p, MovementKind::Adjustment, 2))
        .await
        .unwrap();
    assert_eq!(result.stock_after, 5);
    assert_eq!(result.movement.reason, DEFAULT_ADJUSTMENT_REASON);
}

// ============================================================================
// Voiding sales
// ============================================================================

#[tokio::test]
async fn test_void_sale_same_day_restores_stock_append_only() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let actor = Uuid::new_v4();
    let p = store.add_product("Mochila", 10, dec("150.00"));

    let receipt = sell(&engine, &store, sale_request(actor, vec![line(p, 4, "250")]))
        .await
        .unwrap();
    assert_eq!(store.product(p).unwrap().stock, 6);

    let mut ledger = store.begin();
    let void = engine
        .void_sale(&mut ledger, receipt.sale.id, actor, Utc::now())
        .await
        .unwrap();
    ledger.commit().await.unwrap();

    assert_eq!(store.product(p).unwrap().stock, 10);
    let sale = store.sale(receipt.sale.id).unwrap();
    assert_eq!(sale.status, DocumentStatus::Voided);
    assert!(sale.voided_at.is_some());

    let compensation = &void.movements[0];
    assert_eq!(compensation.movement_type, MovementKind::PositiveCorrection);
    assert_eq!(compensation.quantity_change, 4);
    assert_eq!(compensation.reversal_of, Some(receipt.movements[0].id));
    assert_eq!(
        compensation.reason,
        format!("Anulación de venta #{}", receipt.sale.id)
    );

    // the original VENTA movement is still there
    let state = store.snapshot();
    assert!(state.movements.iter().any(|m| m.id == receipt.movements[0].id));
    assert_eq!(state.movement_balance(p), 10);

    // second void is not double-applied
    let mut ledger = store.begin();
    let err = engine
        .void_sale(&mut ledger, receipt.sale.id, actor, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::SaleNotFound(_)));
    assert_eq!(store.product(p).unwrap().stock, 10);
}

#[tokio::test]
async fn test_void_sale_from_yesterday_is_refused() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let actor = Uuid::new_v4();
    let p = store.add_product("Colores", 10, dec("30.00"));

    let mut request = sale_request(actor, vec![line(p, 2, "45")]);
    request.sale_date = Some(Utc::now() - Duration::days(1));
    let receipt = sell(&engine, &store, request).await.unwrap();
    let before = store.snapshot();

    let mut ledger = store.begin();
    let err = engine
        .void_sale(&mut ledger, receipt.sale.id, actor, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::VoidWindowClosed { .. }));
    drop(ledger);

    let after = store.snapshot();
    assert_eq!(after.products, before.products);
    assert_eq!(after.movements.len(), before.movements.len());
    assert_eq!(store.sale(receipt.sale.id).unwrap().status, DocumentStatus::Completed);
}

#[tokio::test]
async fn test_void_sale_with_returns_is_refused() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let actor = Uuid::new_v4();
    let p = store.add_product("Compás", 5, dec("25.00"));

    let receipt = sell(&engine, &store, sale_request(actor, vec![line(p, 1, "40")]))
        .await
        .unwrap();
    store.add_return(receipt.sale.id);

    let mut ledger = store.begin();
    let err = engine
        .void_sale(&mut ledger, receipt.sale.id, actor, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::SaleHasReturns(_)));
}

#[tokio::test]
async fn test_void_unknown_sale_is_not_found() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let mut ledger = store.begin();

    let err = engine
        .void_sale(&mut ledger, Uuid::new_v4(), Uuid::new_v4(), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::SaleNotFound(_)));
}

// ============================================================================
// Numeric limits
// ============================================================================

#[tokio::test]
async fn test_sale_amounts_beyond_money_range_are_rejected() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let p = store.add_product("Mochila", 10, dec("300.00"));

    let huge = SaleLine {
        product_id: p,
        quantity: 2,
        unit_price: Decimal::MAX,
    };
    let err = sell(&engine, &store, sale_request(Uuid::new_v4(), vec![huge]))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::Validation { field: "items.unit_price", .. }));

    // Each price fits, the total does not
    let err = sell(
        &engine,
        &store,
        sale_request(Uuid::new_v4(), vec![line(p, 2, "9000000000.00")]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StockError::Validation { field: "items", .. }));

    assert_eq!(store.product(p).unwrap().stock, 10);
    assert_eq!(store.snapshot().movements_for(p).len(), 1);
}

#[tokio::test]
async fn test_purchase_costs_beyond_money_range_are_rejected() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let supplier = store.add_supplier();
    let p = store.add_product("Archivero", 1, dec("900.00"));
    let item = |quantity: i32, cost: Decimal| PurchaseLine {
        product_id: p,
        quantity,
        cost_at_purchase: cost,
    };

    let mut ledger = store.begin();
    let err = engine
        .record_purchase_receipt(
            &mut ledger,
            purchase_request(Uuid::new_v4(), supplier, vec![item(2, Decimal::MAX)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::Validation { field: "items.cost_at_purchase", .. }));

    let err = engine
        .record_purchase_receipt(
            &mut ledger,
            purchase_request(Uuid::new_v4(), supplier, vec![item(2, dec("9000000000.00"))]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::Validation { field: "items", .. }));
    drop(ledger);

    assert_eq!(store.product(p).unwrap().stock, 1);
    assert_eq!(store.product(p).unwrap().cost, dec("900.00"));
}

#[tokio::test]
async fn test_additions_that_overflow_stock_are_rejected() {
    let store = MemoryStore::new();
    let engine = StockEngine::default();
    let supplier = store.add_supplier();
    let p = store.add_product("Clips", 10, dec("0.50"));

    let mut ledger = store.begin();
    let err = engine
        .record_purchase_receipt(
            &mut ledger,
            purchase_request(
                Uuid::new_v4(),
                supplier,
                vec![PurchaseLine {
                    product_id: p,
                    quantity: i32::MAX,
                    cost_at_purchase: dec("0.40"),
                }],
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::Validation { field: "items.quantity", .. }));

    let err = engine
        .record_adjustment(&mut ledger, adjustment(Uuid::new_v4(), p, MovementKind::Entry, i32::MAX))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::Validation { field: "quantity", .. }));
    drop(ledger);

    assert_eq!(store.product(p).unwrap().stock, 10);
    assert_eq!(store.snapshot().movements_for(p).len(), 1);
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Sell(i32),
    Receive(i32),
    Adjust(MovementKind, i32),
    VoidLastSale,
    VoidLastPurchase,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let manual = prop::sample::select(vec![
        MovementKind::Entry,
        MovementKind::Exit,
        MovementKind::Adjustment,
        MovementKind::Damage,
    ]);
    prop_oneof![
        (1..20i32).prop_map(Op::Sell),
        (1..20i32).prop_map(Op::Receive),
        (manual, 1..20i32).prop_map(|(k, q)| Op::Adjust(k, q)),
        Just(Op::VoidLastSale),
        Just(Op::VoidLastPurchase),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn apply(
    engine: &StockEngine,
    store: &MemoryStore,
    supplier: Uuid,
    product: Uuid,
    op: &Op,
    sales: &mut Vec<Uuid>,
    purchases: &mut Vec<Uuid>,
) -> StockResult<()> {
    let actor = Uuid::nil();
    let mut ledger = store.begin();
    match op {
        Op::Sell(q) => {
            let receipt = engine
                .record_sale(&mut ledger, sale_request(actor, vec![line(product, *q, "10")]))
                .await?;
            sales.push(receipt.sale.id);
        }
        Op::Receive(q) => {
            let receipt = engine
                .record_purchase_receipt(
                    &mut ledger,
                    purchase_request(
                        actor,
                        supplier,
                        vec![PurchaseLine {
                            product_id: product,
                            quantity: *q,
                            cost_at_purchase: dec("7.25"),
                        }],
                    ),
                )
                .await?;
            purchases.push(receipt.purchase.id);
        }
        Op::Adjust(kind, q) => {
            engine
                .record_adjustment(&mut ledger, adjustment(actor, product, *kind, *q))
                .await?;
        }
        Op::VoidLastSale => {
            if let Some(id) = sales.last().copied() {
                engine.void_sale(&mut ledger, id, actor, Utc::now()).await?;
            }
        }
        Op::VoidLastPurchase => {
            if let Some(id) = purchases.last().copied() {
                engine.void_purchase(&mut ledger, id, actor, Utc::now()).await?;
            }
        }
    }
    ledger.commit().await?;
    Ok(())
}

proptest! {
    /// Property 1 and 2: Stock Ledger Consistency
    /// After any sequence of operations, committed or rejected, the product's
    /// stock equals the sum of its movement deltas and is never negative.
    #[test]
    fn test_stock_matches_movement_balance(
        initial in 0..30i32,
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let store = MemoryStore::new();
            let engine = StockEngine::default();
            let supplier = store.add_supplier();
            let p = store.add_product("Producto", initial, dec("5.00"));
            let mut sales = Vec::new();
            let mut purchases = Vec::new();

            for op in &ops {
                let before = store.snapshot();
                let result = apply(&engine, &store, supplier, p, op, &mut sales, &mut purchases).await;
                let after = store.snapshot();

                prop_assert!(after.products[&p].stock >= 0);
                prop_assert_eq!(i64::from(after.products[&p].stock), after.movement_balance(p));
                if result.is_err() {
                    // rejected operations leave no trace
                    prop_assert_eq!(&after.products, &before.products);
                    prop_assert_eq!(after.movements.len(), before.movements.len());
                }
            }
            Ok(())
        })?;
    }

    /// Property 4: Purchase Void Round-Trip
    /// Receiving goods and voiding the receipt restores every product's stock.
    #[test]
    fn test_purchase_then_void_restores_stock(
        stocks in prop::collection::vec(0..50i32, 1..5),
        quantities in prop::collection::vec(1..30i32, 1..5),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let store = MemoryStore::new();
            let engine = StockEngine::default();
            let supplier = store.add_supplier();
            let products: Vec<Uuid> = stocks
                .iter()
                .map(|s| store.add_product("Producto", *s, dec("3.00")))
                .collect();
            let items: Vec<PurchaseLine> = quantities
                .iter()
                .enumerate()
                .map(|(i, q)| PurchaseLine {
                    product_id: products[i % products.len()],
                    quantity: *q,
                    cost_at_purchase: dec("2.50"),
                })
                .collect();

            let mut ledger = store.begin();
            let receipt = engine
                .record_purchase_receipt(&mut ledger, purchase_request(Uuid::nil(), supplier, items))
                .await
                .unwrap();
            ledger.commit().await.unwrap();

            let mut ledger = store.begin();
            engine
                .void_purchase(&mut ledger, receipt.purchase.id, Uuid::nil(), Utc::now())
                .await
                .unwrap();
            ledger.commit().await.unwrap();

            for (product, stock) in products.iter().zip(&stocks) {
                prop_assert_eq!(store.product(*product).unwrap().stock, *stock);
            }
            Ok(())
        })?;
    }
}
