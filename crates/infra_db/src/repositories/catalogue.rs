//! Catalogue repository
//!
//! Loads the whole rule catalogue into a [`CatalogueSnapshot`] inside one
//! `REPEATABLE READ` transaction, so a rating run never sees half of a
//! concurrent catalogue edit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, InsurerId, MerchandiseTypeId,
    Money, PortError, Rate, RuleId, ValidPeriod,
};
use domain_rating::{CataloguePort, CatalogueSnapshot, Insurer, InsurerBusinessRule, MerchandiseType};

use crate::error::DatabaseError;

/// PostgreSQL-backed rule catalogue
#[derive(Debug, Clone)]
pub struct PgCatalogue {
    pool: PgPool,
}

impl PgCatalogue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reads every catalogue table in one consistent transaction
    #[instrument(skip(self))]
    pub async fn snapshot(&self) -> Result<CatalogueSnapshot, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let taken_at: DateTime<Utc> = sqlx::query_scalar("SELECT now()")
            .fetch_one(&mut *tx)
            .await?;
        let mut snapshot = CatalogueSnapshot::empty(taken_at);

        load_insurers(&mut tx, &mut snapshot).await?;
        load_merchandise_types(&mut tx, &mut snapshot).await?;
        let rules = load_rules(&mut tx, &mut snapshot).await?;

        let cities: Vec<String> =
            sqlx::query_scalar("SELECT name FROM high_risk_cities ORDER BY name")
                .fetch_all(&mut *tx)
                .await?;
        for city in cities {
            snapshot.add_risk_city(city);
        }

        let parameters: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM system_parameters")
                .fetch_all(&mut *tx)
                .await?;
        for (key, value) in parameters {
            snapshot.set_parameter(key, value);
        }

        let conditions: Vec<(String, String)> =
            sqlx::query_as("SELECT code, text FROM special_conditions")
                .fetch_all(&mut *tx)
                .await?;
        for (code, text) in conditions {
            snapshot.add_special_condition(code, text);
        }

        tx.commit().await?;
        debug!(
            insurers = snapshot.insurers().len(),
            rules,
            "catalogue snapshot loaded"
        );
        Ok(snapshot)
    }
}

async fn load_insurers(
    tx: &mut Transaction<'_, Postgres>,
    snapshot: &mut CatalogueSnapshot,
) -> Result<(), DatabaseError> {
    let rows = sqlx::query_as::<_, InsurerRow>(
        r#"
        SELECT id, name, is_active, minimum_premium, max_rctr_c_limit, max_rc_dc_limit
        FROM insurers
        ORDER BY name
        "#,
    )
    .fetch_all(&mut **tx)
    .await?;

    for row in rows {
        snapshot.add_insurer(row.into_domain());
    }
    Ok(())
}

async fn load_merchandise_types(
    tx: &mut Transaction<'_, Postgres>,
    snapshot: &mut CatalogueSnapshot,
) -> Result<(), DatabaseError> {
    let rows = sqlx::query_as::<_, MerchandiseTypeRow>(
        "SELECT id, name, risk_level, description FROM merchandise_types",
    )
    .fetch_all(&mut **tx)
    .await?;

    for row in rows {
        snapshot.add_merchandise_type(row.into_domain()?);
    }
    Ok(())
}

async fn load_rules(
    tx: &mut Transaction<'_, Postgres>,
    snapshot: &mut CatalogueSnapshot,
) -> Result<usize, DatabaseError> {
    let rows = sqlx::query_as::<_, RuleRow>(
        r#"
        SELECT id, insurer_id, merchandise_type_id, rctr_c_base_rate, rc_dc_base_rate,
               high_risk_multiplier, volume_discount_threshold, volume_discount_rate,
               franchise_percentage, franchise_minimum, is_excluded, is_active,
               valid_from, valid_to, observations
        FROM insurer_business_rules
        "#,
    )
    .fetch_all(&mut **tx)
    .await?;

    let count = rows.len();
    for row in rows {
        let id = row.id;
        snapshot
            .add_rule(row.into_domain()?)
            .map_err(|e| DatabaseError::corrupt("insurer_business_rules", format!("{}: {}", id, e)))?;
    }
    Ok(count)
}

impl DomainPort for PgCatalogue {}

#[async_trait]
impl CataloguePort for PgCatalogue {
    async fn load_snapshot(&self) -> Result<CatalogueSnapshot, PortError> {
        Ok(self.snapshot().await?)
    }
}

#[async_trait]
impl HealthCheckable for PgCatalogue {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };
        HealthCheckResult {
            adapter_id: "postgres".to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InsurerRow {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub minimum_premium: Decimal,
    pub max_rctr_c_limit: Decimal,
    pub max_rc_dc_limit: Decimal,
}

impl InsurerRow {
    fn into_domain(self) -> Insurer {
        Insurer {
            id: InsurerId::from_uuid(self.id),
            name: self.name,
            is_active: self.is_active,
            minimum_premium: Money::brl(self.minimum_premium),
            max_rctr_c_limit: Money::brl(self.max_rctr_c_limit),
            max_rc_dc_limit: Money::brl(self.max_rc_dc_limit),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MerchandiseTypeRow {
    pub id: Uuid,
    pub name: String,
    pub risk_level: String,
    pub description: Option<String>,
}

impl MerchandiseTypeRow {
    fn into_domain(self) -> Result<MerchandiseType, DatabaseError> {
        let risk_tier = self
            .risk_level
            .parse()
            .map_err(|e| DatabaseError::corrupt("merchandise_types", e))?;
        Ok(MerchandiseType {
            id: MerchandiseTypeId::from_uuid(self.id),
            name: self.name,
            risk_tier,
            description: self.description,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RuleRow {
    pub id: Uuid,
    pub insurer_id: Uuid,
    pub merchandise_type_id: Uuid,
    pub rctr_c_base_rate: Decimal,
    pub rc_dc_base_rate: Decimal,
    pub high_risk_multiplier: Decimal,
    pub volume_discount_threshold: Decimal,
    pub volume_discount_rate: Decimal,
    pub franchise_percentage: Decimal,
    pub franchise_minimum: Decimal,
    pub is_excluded: bool,
    pub is_active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub observations: String,
}

impl RuleRow {
    fn into_domain(self) -> Result<InsurerBusinessRule, DatabaseError> {
        let start = self.valid_from.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let validity = ValidPeriod::new(start, self.valid_to)
            .map_err(|e| DatabaseError::corrupt("insurer_business_rules", e))?;

        Ok(InsurerBusinessRule {
            id: RuleId::from_uuid(self.id),
            insurer_id: InsurerId::from_uuid(self.insurer_id),
            merchandise_type_id: MerchandiseTypeId::from_uuid(self.merchandise_type_id),
            rctr_c_base_rate: Rate::from_percentage(self.rctr_c_base_rate),
            rc_dc_base_rate: Rate::from_percentage(self.rc_dc_base_rate),
            high_risk_multiplier: self.high_risk_multiplier,
            volume_discount_threshold: Money::brl(self.volume_discount_threshold),
            volume_discount_rate: self.volume_discount_rate,
            franchise_percentage: self.franchise_percentage,
            franchise_minimum: Money::brl(self.franchise_minimum),
            is_excluded: self.is_excluded,
            is_active: self.is_active,
            validity,
            observations: self.observations,
        })
    }
}
