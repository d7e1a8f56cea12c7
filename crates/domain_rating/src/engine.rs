//! Multi-insurer orchestration
//!
//! [`RatingEngine`] is the pure computation: one catalogue snapshot and one
//! request in, one result per insurer that can rate it out. A failure for
//! one insurer only removes that insurer from the comparison.
//!
//! [`RatingService`] wraps the engine with the side effects around it:
//! loading the snapshot, validating input and persisting versions.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use core_kernel::{InsurerId, QuoteRequestId, UserId};

use crate::adjuster::adjust_rates;
use crate::catalogue::{CataloguePort, CatalogueSnapshot, Insurer};
use crate::conditions::ConditionsComposer;
use crate::error::RatingError;
use crate::ports::{LineageLock, QuoteStore};
use crate::premium::{franchise_description, monthly_premium, offered_limits};
use crate::quote::{QuoteDetails, QuoteRequest, QuoteResult};
use crate::risk::RiskClassifier;

/// An insurer left out of a rating run and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedInsurer {
    pub insurer_id: InsurerId,
    pub insurer_name: String,
    pub reason: String,
}

/// Results plus the insurers that produced none
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingReport {
    pub results: Vec<QuoteResult>,
    pub skipped: Vec<SkippedInsurer>,
}

/// Rates requests against a single catalogue snapshot
#[derive(Debug, Clone, Copy)]
pub struct RatingEngine<'a> {
    snapshot: &'a CatalogueSnapshot,
}

impl<'a> RatingEngine<'a> {
    pub fn new(snapshot: &'a CatalogueSnapshot) -> Self {
        Self { snapshot }
    }

    /// One result per active insurer able to rate the request, in catalogue order
    pub fn rate(&self, request: &QuoteRequest) -> Vec<QuoteResult> {
        self.rate_detailed(request).results
    }

    pub fn rate_detailed(&self, request: &QuoteRequest) -> RatingReport {
        let mut results = Vec::new();
        let mut skipped = Vec::new();

        for insurer in self.snapshot.active_insurers() {
            match self.rate_insurer(insurer, request) {
                Ok(result) => results.push(result),
                Err(error) => {
                    if error.is_ineligible() {
                        warn!(
                            insurer = %insurer.name,
                            quote_request_id = %request.id,
                            %error,
                            "insurer skipped"
                        );
                    } else {
                        error!(
                            insurer = %insurer.name,
                            quote_request_id = %request.id,
                            %error,
                            "rating failed for insurer; skipped"
                        );
                    }
                    skipped.push(SkippedInsurer {
                        insurer_id: insurer.id,
                        insurer_name: insurer.name.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        RatingReport { results, skipped }
    }

    /// Rates the request for a single insurer
    pub fn rate_insurer(
        &self,
        insurer: &Insurer,
        request: &QuoteRequest,
    ) -> Result<QuoteResult, RatingError> {
        let details = &request.details;
        let rule = self.snapshot.lookup(insurer, &details.cargo_type)?;

        if !rule.is_in_force(self.snapshot.taken_at()) {
            return Err(RatingError::RuleInactive {
                insurer: insurer.name.clone(),
                merchandise_type: details.cargo_type.clone(),
            });
        }
        if rule.is_excluded {
            return Err(RatingError::RuleExcluded {
                insurer: insurer.name.clone(),
                merchandise_type: details.cargo_type.clone(),
            });
        }

        let classifier = RiskClassifier::new(self.snapshot);
        let tier = classifier.merchandise_risk_tier(&details.cargo_type)?;
        let high_risk_route = classifier.is_high_risk_route(&details.origin, &details.destination);

        let rates = adjust_rates(rule, tier, &details.monthly_revenue)?;
        let limits = offered_limits(&details.limits, insurer)?;
        let breakdown = monthly_premium(&details.monthly_revenue, &rates, &insurer.minimum_premium)?;

        let observations = ConditionsComposer::new(self.snapshot).compose(
            rule,
            high_risk_route,
            &details.monthly_revenue,
        );

        debug!(
            insurer = %insurer.name,
            tier = %tier,
            high_risk_route,
            rctr_c_rate = %rates.rctr_c,
            rc_dc_rate = %rates.rc_dc,
            premium = %breakdown.premium,
            "insurer rated"
        );

        let franchise = franchise_description(rule);
        Ok(QuoteResult {
            id: QuoteResult::id_for(request.id, insurer.id),
            quote_request_id: request.id,
            insurer_id: insurer.id,
            insurer_name: insurer.name.clone(),
            rctr_c_rate: rates.rctr_c,
            rc_dc_rate: rates.rc_dc,
            limits,
            rctr_c_franchise: franchise.clone(),
            rc_dc_franchise: franchise,
            premium: breakdown.premium,
            minimum_applied: breakdown.minimum_applied(),
            risk_tier: tier,
            high_risk_route,
            observations,
        })
    }
}

/// A stored request with its results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedQuote {
    pub request: QuoteRequest,
    pub results: Vec<QuoteResult>,
    pub skipped: Vec<SkippedInsurer>,
}

/// Application service for quoting
pub struct RatingService {
    catalogue: Arc<dyn CataloguePort>,
    quotes: Arc<dyn QuoteStore>,
    locks: Arc<dyn LineageLock>,
}

impl RatingService {
    pub fn new(
        catalogue: Arc<dyn CataloguePort>,
        quotes: Arc<dyn QuoteStore>,
        locks: Arc<dyn LineageLock>,
    ) -> Self {
        Self {
            catalogue,
            quotes,
            locks,
        }
    }

    /// Rates a request against a fresh snapshot without storing anything
    pub async fn rate(&self, request: &QuoteRequest) -> Result<RatingReport, RatingError> {
        let snapshot = self.catalogue.load_snapshot().await?;
        Ok(RatingEngine::new(&snapshot).rate_detailed(request))
    }

    /// Creates a new lineage, rates it and stores both
    #[instrument(skip(self, details), fields(cargo_type = %details.cargo_type))]
    pub async fn quote(
        &self,
        details: QuoteDetails,
        requested_by: UserId,
    ) -> Result<RatedQuote, RatingError> {
        let request = QuoteRequest::create(details, requested_by, Utc::now())?;
        let report = self.rate(&request).await?;
        self.quotes.insert_request(&request, &report.results).await?;

        info!(
            quote_request_id = %request.id,
            offers = report.results.len(),
            skipped = report.skipped.len(),
            "quote created"
        );
        Ok(RatedQuote {
            request,
            results: report.results,
            skipped: report.skipped,
        })
    }

    /// Creates the next version of a lineage and rates it
    #[instrument(skip(self, details))]
    pub async fn new_version(
        &self,
        current_id: QuoteRequestId,
        details: QuoteDetails,
        requested_by: UserId,
    ) -> Result<RatedQuote, RatingError> {
        let mut previous = self.quotes.get_request(current_id).await?;
        let successor = previous.new_version(details, requested_by, Utc::now())?;
        let report = self.rate(&successor).await?;
        self.quotes
            .insert_version(&previous, &successor, &report.results)
            .await?;

        info!(
            quote_request_id = %successor.id,
            lineage_id = %successor.lineage_id,
            version = successor.version,
            "quote version created"
        );
        Ok(RatedQuote {
            request: successor,
            results: report.results,
            skipped: report.skipped,
        })
    }

    /// Edits the current version in place and re-rates it
    ///
    /// Fails with [`RatingError::VersionLocked`] once the lineage has an
    /// approved proposal.
    #[instrument(skip(self, details))]
    pub async fn edit(
        &self,
        id: QuoteRequestId,
        details: QuoteDetails,
    ) -> Result<RatedQuote, RatingError> {
        let mut request = self.quotes.get_request(id).await?;
        let locked = self.locks.is_lineage_locked(request.lineage_id).await?;
        request.edit_in_place(details, locked)?;

        let report = self.rate(&request).await?;
        match self.quotes.replace_request(&request, &report.results).await {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                warn!(quote_request_id = %request.id, error = %e, "in-place edit lost a race");
                return Err(self.edit_conflict(id).await);
            }
            Err(e) => return Err(e.into()),
        }

        info!(quote_request_id = %request.id, "quote edited in place");
        Ok(RatedQuote {
            request,
            results: report.results,
            skipped: report.skipped,
        })
    }

    /// Names why a guarded write refused an edit, from the stored state
    async fn edit_conflict(&self, id: QuoteRequestId) -> RatingError {
        match self.quotes.get_request(id).await {
            Ok(stored) if !stored.is_current => RatingError::NotCurrentVersion(id.to_string()),
            Ok(_) => RatingError::VersionLocked(id.to_string()),
            Err(e) => e.into(),
        }
    }

    pub async fn get(&self, id: QuoteRequestId) -> Result<RatedQuote, RatingError> {
        let request = self.quotes.get_request(id).await?;
        let results = self.quotes.results_for(id).await?;
        Ok(RatedQuote {
            request,
            results,
            skipped: Vec::new(),
        })
    }
}
