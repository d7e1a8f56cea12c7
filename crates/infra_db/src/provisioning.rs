//! Deployment provisioning
//!
//! Seeds roles and the reference data the rating engine expects. Every
//! insert is `ON CONFLICT DO NOTHING`, so re-running is a no-op and never
//! overwrites values an operator has since changed.

use tracing::{info, instrument};

use domain_rating::reference::{
    default_system_parameters, DEFAULT_RISK_CITIES, DEFAULT_SPECIAL_CONDITIONS,
};

use crate::error::DatabaseError;
use crate::pool::DatabasePool;

/// (name, description) of the access roles
pub const DEFAULT_ROLES: &[(&str, &str)] = &[
    ("Broker", "Requests quotes and creates proposals"),
    ("Manager", "Approves and rejects proposals"),
    ("Admin", "Maintains the catalogue; allowed everything"),
    ("Auditor", "Reads the audit trail"),
];

/// Rows inserted by one provisioning run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisioningReport {
    pub roles: u64,
    pub system_parameters: u64,
    pub risk_cities: u64,
    pub special_conditions: u64,
}

impl ProvisioningReport {
    pub fn total(&self) -> u64 {
        self.roles + self.system_parameters + self.risk_cities + self.special_conditions
    }
}

/// Inserts missing roles and reference data in one transaction
#[instrument(skip(pool))]
pub async fn provision(pool: &DatabasePool) -> Result<ProvisioningReport, DatabaseError> {
    let mut tx = pool.begin().await?;
    let mut report = ProvisioningReport::default();

    for (name, description) in DEFAULT_ROLES {
        report.roles += sqlx::query(
            "INSERT INTO roles (name, description) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(description)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    for (key, value, description) in default_system_parameters() {
        report.system_parameters += sqlx::query(
            r#"
            INSERT INTO system_parameters (key, value, description) VALUES ($1, $2, $3)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(description)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    for city in DEFAULT_RISK_CITIES {
        report.risk_cities += sqlx::query(
            "INSERT INTO high_risk_cities (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
        )
        .bind(city)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    for (code, text) in DEFAULT_SPECIAL_CONDITIONS {
        report.special_conditions += sqlx::query(
            "INSERT INTO special_conditions (code, text) VALUES ($1, $2) ON CONFLICT (code) DO NOTHING",
        )
        .bind(code)
        .bind(text)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;
    info!(
        roles = report.roles,
        system_parameters = report.system_parameters,
        risk_cities = report.risk_cities,
        special_conditions = report.special_conditions,
        "provisioning finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roles() {
        let names: Vec<_> = DEFAULT_ROLES.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["Broker", "Manager", "Admin", "Auditor"]);
    }

    #[test]
    fn test_report_total() {
        let report = ProvisioningReport {
            roles: 4,
            system_parameters: 1,
            risk_cities: 6,
            special_conditions: 2,
        };
        assert_eq!(report.total(), 13);
        assert_eq!(ProvisioningReport::default().total(), 0);
    }
}
