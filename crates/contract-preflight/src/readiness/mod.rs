//! Readiness domains: fixed batteries of independently scored extraction rules.
//!
//! Each builder returns a [`DomainResult`] whose checks appear in a fixed order.
//! Extractors never error; missing signal is reported as a `fail` or `review`
//! check with a reason.

mod addons;
mod check;
mod evidence;
mod financials;
mod opportunity;
mod schedule;

#[cfg(test)]
mod tests;

pub use addons::build_addons_readiness;
pub use check::{
    CheckCode, CheckResult, CheckStatus, CheckSummary, DomainResult, Evidence, RankedCandidate,
};
pub use financials::build_financials_readiness;
pub use opportunity::{build_opportunity_spine, guess_agreement_type};
pub use schedule::build_schedule_structure;
