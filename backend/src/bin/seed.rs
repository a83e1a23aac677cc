//! Seeds a development database with users, catalog and parties.
//!
//! Safe to run more than once: rows that already exist are left alone.

use anyhow::Context;
use pos_backend::services::{auth::hash_password, PgLedger};
use pos_backend::Config;
use rust_decimal::Decimal;
use shared::stock::{AdjustmentRequest, StockEngine, StockLedger, INITIAL_STOCK_REASON};
use shared::{MovementKind, Role};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

struct SeedProduct {
    name: &'static str,
    sku: &'static str,
    price: Decimal,
    cost: Decimal,
    stock: i32,
    category: &'static str,
}

const CATEGORIES: [(&str, &str); 3] = [
    ("Cuadernos", "Cuadernos de diferentes tipos y tamaños"),
    ("Escritura", "Lápices, plumas, marcadores, etc."),
    ("Oficina", "Artículos generales de oficina"),
];

fn products() -> Vec<SeedProduct> {
    vec![
        SeedProduct {
            name: "Cuaderno Profesional Rayado 100 Hojas",
            sku: "CUAD-PRO-100R",
            price: Decimal::new(3550, 2),
            cost: Decimal::new(2000, 2),
            stock: 50,
            category: "Cuadernos",
        },
        SeedProduct {
            name: "Lápiz Mirado No. 2",
            sku: "LAP-MIR-NO2",
            price: Decimal::new(500, 2),
            cost: Decimal::new(250, 2),
            stock: 200,
            category: "Escritura",
        },
        SeedProduct {
            name: "Paquete de 500 Hojas Blancas Bond",
            sku: "PAP-BOND-500",
            price: Decimal::new(9000, 2),
            cost: Decimal::new(6500, 2),
            stock: 30,
            category: "Oficina",
        },
        SeedProduct {
            name: "Pluma BIC Cristal Negra Punto Mediano",
            sku: "PLU-BIC-NEGM",
            price: Decimal::new(700, 2),
            cost: Decimal::new(350, 2),
            stock: 150,
            category: "Escritura",
        },
    ]
}

async fn upsert_user(db: &PgPool, username: &str, password: &str, role: Role) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (username, password_hash, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .fetch_one(db)
    .await
    .with_context(|| format!("creating user {}", username))?;

    tracing::info!(username, role = role.as_str(), "User ready");
    Ok(id)
}

async fn upsert_category(db: &PgPool, name: &str, description: &str) -> anyhow::Result<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO categories (name, description)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(description)
    .fetch_one(db)
    .await?;
    Ok(id)
}

/// Insert a product with zero stock, then bring it to its opening stock
/// through an ENTRY movement so the ledger explains it
async fn seed_product(
    db: &PgPool,
    engine: &StockEngine,
    actor_id: Uuid,
    category_id: Uuid,
    product: &SeedProduct,
) -> anyhow::Result<()> {
    let mut ledger = PgLedger::begin(db).await?;
    let inserted = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO products (name, sku, price, cost, stock, category_id)
        VALUES ($1, $2, $3, $4, 0, $5)
        ON CONFLICT (sku) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(product.name)
    .bind(product.sku)
    .bind(product.price)
    .bind(product.cost)
    .bind(category_id)
    .fetch_optional(ledger.conn())
    .await?;

    let Some(product_id) = inserted else {
        tracing::info!(sku = product.sku, "Product already present");
        return Ok(());
    };

    engine
        .record_adjustment(
            &mut ledger,
            AdjustmentRequest {
                actor_id,
                product_id,
                kind: MovementKind::Entry,
                quantity: product.stock,
                reason: Some(INITIAL_STOCK_REASON.to_string()),
                notes: None,
            },
        )
        .await?;
    ledger.commit().await?;

    tracing::info!(sku = product.sku, stock = product.stock, "Product created");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed=info,sqlx=warn".into()),
        )
        .init();

    let config = Config::load()?;
    let engine = StockEngine::new(config.store.utc_offset()?);
    let db = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database.url)
        .await
        .context("connecting to database")?;

    sqlx::migrate!("./migrations").run(&db).await?;

    let admin_id = upsert_user(&db, "admin", "admin123", Role::Admin).await?;
    upsert_user(&db, "vendedor1", "seller123", Role::Seller).await?;

    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for (name, description) in CATEGORIES {
        category_ids.push((name, upsert_category(&db, name, description).await?));
    }

    for product in products() {
        let category_id = category_ids
            .iter()
            .find(|(name, _)| *name == product.category)
            .map(|(_, id)| *id)
            .with_context(|| format!("unknown category {}", product.category))?;
        seed_product(&db, &engine, admin_id, category_id, &product).await?;
    }

    sqlx::query(
        r#"
        INSERT INTO suppliers (name, contact_name, email, phone)
        VALUES ('Papelera Principal S.A. de C.V.', 'Juan Carlos Proveedor',
                'contacto@papeleraprincipal.com', '5512345678')
        ON CONFLICT (name) DO NOTHING
        "#,
    )
    .execute(&db)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO customers (name, email, phone, rfc)
        VALUES ('Ana Cliente Frecuente', 'ana.cliente@example.com', '3398765432', 'ANAC800101XYZ')
        ON CONFLICT (rfc) DO NOTHING
        "#,
    )
    .execute(&db)
    .await?;

    tracing::info!("Seeding finished");
    Ok(())
}
