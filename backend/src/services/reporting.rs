//! Sales statistics and reports. Voided sales never count.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{DateRange, PaymentType, StatsPeriod};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::sale::{date_bounds, SaleSummary};

const TOP_PRODUCTS: i64 = 5;
const RECENT_SALES: i64 = 10;

#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductSales {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_sold: i64,
    pub total_revenue: Decimal,
    pub sales: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaymentBreakdown {
    pub payment_type: PaymentType,
    pub count: i64,
    pub total_amount: Decimal,
    #[sqlx(skip)]
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomerSales {
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub sales_count: i64,
    pub total_spent: Decimal,
    pub average_ticket: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailySales {
    pub date: NaiveDate,
    pub sales_count: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SalesSummary {
    pub total_sales: i64,
    pub total_revenue: Decimal,
    pub average_ticket: Decimal,
    pub total_products_sold: i64,
}

/// Dashboard statistics for one period
#[derive(Debug, Clone, Serialize)]
pub struct SalesStats {
    pub period: StatsPeriod,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(flatten)]
    pub summary: SalesSummary,
    pub top_products: Vec<ProductSales>,
    pub by_payment_type: Vec<PaymentBreakdown>,
    pub recent_sales: Vec<SaleSummary>,
}

/// Report selector for `/sales/reports`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Summary,
    Products,
    Customers,
    Payment,
    Daily,
}

impl FromStr for ReportKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(ReportKind::Summary),
            "products" => Ok(ReportKind::Products),
            "customers" => Ok(ReportKind::Customers),
            "payment" => Ok(ReportKind::Payment),
            "daily" => Ok(ReportKind::Daily),
            other => Err(AppError::Validation {
                field: "type".to_string(),
                message: format!("Invalid report type: {}", other),
                message_es: "Tipo de reporte no válido".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ReportFilter {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub user_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SalesReport {
    Summary {
        summary: SalesSummary,
        sales: Vec<SaleSummary>,
    },
    Products {
        products: Vec<ProductSales>,
    },
    Customers {
        customers: Vec<CustomerSales>,
    },
    Payment {
        payments: Vec<PaymentBreakdown>,
    },
    Daily {
        days: Vec<DailySales>,
    },
}

/// Bounds and filters shared by every sales aggregate, bound as $1..$4
#[derive(Debug, Clone, Copy, Default)]
struct SaleScope {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    user_id: Option<Uuid>,
    customer_id: Option<Uuid>,
}

impl From<DateRange> for SaleScope {
    fn from(range: DateRange) -> Self {
        Self {
            start: Some(range.start),
            end: Some(range.end),
            ..Self::default()
        }
    }
}

const SCOPE: &str = r#"
    s.status = 'COMPLETED'
    AND ($1::TIMESTAMPTZ IS NULL OR s.sale_date >= $1)
    AND ($2::TIMESTAMPTZ IS NULL OR s.sale_date < $2)
    AND ($3::UUID IS NULL OR s.user_id = $3)
    AND ($4::UUID IS NULL OR s.customer_id = $4)
"#;

/// Share of each payment type in the total, as a percentage
pub fn with_percentages(mut payments: Vec<PaymentBreakdown>) -> Vec<PaymentBreakdown> {
    let total: Decimal = payments.iter().map(|p| p.total_amount).sum();
    for payment in &mut payments {
        payment.percentage = if total > Decimal::ZERO {
            (payment.total_amount * Decimal::ONE_HUNDRED / total).round_dp(2)
        } else {
            Decimal::ZERO
        };
    }
    payments
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn stats(&self, period: StatsPeriod, range: DateRange) -> AppResult<SalesStats> {
        let scope = SaleScope::from(range);

        let summary = self.summary(scope).await?;
        let mut top_products = self.products(scope).await?;
        top_products.truncate(TOP_PRODUCTS as usize);
        let by_payment_type = self.payments(scope).await?;
        let recent_sales = self.sales(scope, Some(RECENT_SALES)).await?;

        Ok(SalesStats {
            period,
            start: range.start,
            end: range.end,
            summary,
            top_products,
            by_payment_type,
            recent_sales,
        })
    }

    pub async fn report(
        &self,
        filter: ReportFilter,
        utc_offset: FixedOffset,
    ) -> AppResult<SalesReport> {
        let kind = filter.kind.as_deref().unwrap_or("summary").parse::<ReportKind>()?;
        let (start, end) = date_bounds(filter.from_date, filter.to_date, utc_offset);
        let scope = SaleScope {
            start,
            end,
            user_id: filter.user_id,
            customer_id: filter.customer_id,
        };

        let report = match kind {
            ReportKind::Summary => SalesReport::Summary {
                summary: self.summary(scope).await?,
                sales: self.sales(scope, None).await?,
            },
            ReportKind::Products => SalesReport::Products {
                products: self.products(scope).await?,
            },
            ReportKind::Customers => SalesReport::Customers {
                customers: self.customers(scope).await?,
            },
            ReportKind::Payment => SalesReport::Payment {
                payments: self.payments(scope).await?,
            },
            ReportKind::Daily => SalesReport::Daily {
                days: self.daily(scope, utc_offset.local_minus_utc() / 60).await?,
            },
        };
        Ok(report)
    }

    async fn summary(&self, scope: SaleScope) -> AppResult<SalesSummary> {
        let summary = sqlx::query_as::<_, SalesSummary>(&format!(
            r#"
            SELECT COUNT(*) AS total_sales,
                   COALESCE(SUM(s.total_amount), 0) AS total_revenue,
                   ROUND(COALESCE(AVG(s.total_amount), 0), 2) AS average_ticket,
                   COALESCE(SUM(units.quantity), 0)::BIGINT AS total_products_sold
            FROM sales s
            LEFT JOIN (
                SELECT sale_id, SUM(quantity) AS quantity FROM sale_items GROUP BY sale_id
            ) units ON units.sale_id = s.id
            WHERE {SCOPE}
            "#
        ))
        .bind(scope.start)
        .bind(scope.end)
        .bind(scope.user_id)
        .bind(scope.customer_id)
        .fetch_one(&self.db)
        .await?;
        Ok(summary)
    }

    async fn sales(&self, scope: SaleScope, limit: Option<i64>) -> AppResult<Vec<SaleSummary>> {
        let sales = sqlx::query_as::<_, SaleSummary>(&format!(
            r#"
            SELECT s.id, s.user_id, u.username, s.customer_id, c.name AS customer_name,
                   s.payment_type, s.total_amount, s.sale_date, s.status,
                   (SELECT COUNT(*) FROM sale_items si WHERE si.sale_id = s.id) AS item_count
            FROM sales s
            JOIN users u ON u.id = s.user_id
            LEFT JOIN customers c ON c.id = s.customer_id
            WHERE {SCOPE}
            ORDER BY s.sale_date DESC
            LIMIT $5
            "#
        ))
        .bind(scope.start)
        .bind(scope.end)
        .bind(scope.user_id)
        .bind(scope.customer_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(sales)
    }

    /// Per-product totals, best sellers by quantity first
    async fn products(&self, scope: SaleScope) -> AppResult<Vec<ProductSales>> {
        let products = sqlx::query_as::<_, ProductSales>(&format!(
            r#"
            SELECT si.product_id, p.name AS product_name,
                   SUM(si.quantity)::BIGINT AS quantity_sold,
                   SUM(si.quantity * si.price_at_sale) AS total_revenue,
                   COUNT(DISTINCT s.id) AS sales
            FROM sales s
            JOIN sale_items si ON si.sale_id = s.id
            JOIN products p ON p.id = si.product_id
            WHERE {SCOPE}
            GROUP BY si.product_id, p.name
            ORDER BY quantity_sold DESC, total_revenue DESC
            "#
        ))
        .bind(scope.start)
        .bind(scope.end)
        .bind(scope.user_id)
        .bind(scope.customer_id)
        .fetch_all(&self.db)
        .await?;
        Ok(products)
    }

    async fn customers(&self, scope: SaleScope) -> AppResult<Vec<CustomerSales>> {
        let customers = sqlx::query_as::<_, CustomerSales>(&format!(
            r#"
            SELECT s.customer_id,
                   COALESCE(c.name, 'Cliente no especificado') AS customer_name,
                   COUNT(*) AS sales_count,
                   SUM(s.total_amount) AS total_spent,
                   ROUND(AVG(s.total_amount), 2) AS average_ticket
            FROM sales s
            LEFT JOIN customers c ON c.id = s.customer_id
            WHERE {SCOPE}
            GROUP BY s.customer_id, c.name
            ORDER BY total_spent DESC
            "#
        ))
        .bind(scope.start)
        .bind(scope.end)
        .bind(scope.user_id)
        .bind(scope.customer_id)
        .fetch_all(&self.db)
        .await?;
        Ok(customers)
    }

    async fn payments(&self, scope: SaleScope) -> AppResult<Vec<PaymentBreakdown>> {
        let payments = sqlx::query_as::<_, PaymentBreakdown>(&format!(
            r#"
            SELECT s.payment_type, COUNT(*) AS count, SUM(s.total_amount) AS total_amount
            FROM sales s
            WHERE {SCOPE}
            GROUP BY s.payment_type
            ORDER BY total_amount DESC
            "#
        ))
        .bind(scope.start)
        .bind(scope.end)
        .bind(scope.user_id)
        .bind(scope.customer_id)
        .fetch_all(&self.db)
        .await?;
        Ok(with_percentages(payments))
    }

    /// Totals per local calendar day
    async fn daily(&self, scope: SaleScope, offset_minutes: i32) -> AppResult<Vec<DailySales>> {
        let days = sqlx::query_as::<_, DailySales>(&format!(
            r#"
            SELECT ((s.sale_date AT TIME ZONE 'UTC') + $5 * INTERVAL '1 minute')::DATE AS date,
                   COUNT(*) AS sales_count,
                   SUM(s.total_amount) AS total_revenue
            FROM sales s
            WHERE {SCOPE}
            GROUP BY 1
            ORDER BY 1 ASC
            "#
        ))
        .bind(scope.start)
        .bind(scope.end)
        .bind(scope.user_id)
        .bind(scope.customer_id)
        .bind(offset_minutes)
        .fetch_all(&self.db)
        .await?;
        Ok(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn breakdown(payment_type: PaymentType, total: Decimal) -> PaymentBreakdown {
        PaymentBreakdown {
            payment_type,
            count: 1,
            total_amount: total,
            percentage: Decimal::ZERO,
        }
    }

    #[test]
    fn percentages_split_the_total() {
        let payments = with_percentages(vec![
            breakdown(PaymentType::Cash, dec(75)),
            breakdown(PaymentType::Card, dec(25)),
        ]);
        assert_eq!(payments[0].percentage, dec(75));
        assert_eq!(payments[1].percentage, dec(25));
    }

    #[test]
    fn percentages_are_zero_without_revenue() {
        let payments = with_percentages(vec![breakdown(PaymentType::Transfer, Decimal::ZERO)]);
        assert_eq!(payments[0].percentage, Decimal::ZERO);
    }

    #[test]
    fn report_kind_rejects_unknown_types() {
        assert_eq!("daily".parse::<ReportKind>().ok(), Some(ReportKind::Daily));
        assert!("weekly".parse::<ReportKind>().is_err());
    }
}
