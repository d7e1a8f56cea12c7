//! Rating Domain - Multi-insurer cargo premium calculation
//!
//! Given a shipment quote request and a catalogue of insurer business rules,
//! produces one quote result per eligible insurer:
//!
//! - Catalogue snapshots taken once per rating run
//! - Route and merchandise risk classification
//! - Risk loading and volume discounts on base rates
//! - Limit capping, monthly premium and minimum floor
//! - Special conditions text
//! - Quote request versioning
//!
//! Rating is a synchronous computation over a [`CatalogueSnapshot`]; all I/O
//! happens in [`RatingService`] through the port traits.

pub mod error;
pub mod risk;
pub mod catalogue;
pub mod reference;
pub mod adjuster;
pub mod premium;
pub mod conditions;
pub mod quote;
pub mod ports;
pub mod engine;

pub use error::RatingError;
pub use risk::{RiskClassifier, RiskTier};
pub use catalogue::{CataloguePort, CatalogueSnapshot, Insurer, InsurerBusinessRule, MerchandiseType};
pub use adjuster::{adjust_rates, AdjustedRates};
pub use premium::{OfferedLimits, PremiumBreakdown};
pub use conditions::ConditionsComposer;
pub use quote::{ClientDetails, QuoteDetails, QuoteRequest, QuoteResult, RequestedLimits};
pub use ports::{LineageLock, QuoteStore};
pub use engine::{RatedQuote, RatingEngine, RatingReport, RatingService, SkippedInsurer};
