use super::common::*;
use crate::readiness::{build_addons_readiness, CheckCode, CheckStatus, DomainResult};

fn addons_for(text: &str, contract_type: Option<&str>) -> DomainResult {
    build_addons_readiness(text, &spine_with_type(contract_type))
}

const FULL_ADDONS: &str = "The Label shall have an option to extend the term by option notice within 30 business days.\n\
The Label holds merchandising rights and provides sync pitching services.\n\
The Artist grants a right of first refusal on future masters.\n\
An additional commission of 5% applies to placements.";

#[test]
fn addon_checks_run_in_fixed_order() {
    let addons = addons_for(FULL_ADDONS, Some("distribution"));
    assert_eq!(
        codes(&addons),
        vec![
            "ADDON_OPTIONS",
            "ADDON_MERCH_PITCH",
            "ADDON_NEGOTIATION",
            "ADDON_WINDOWS",
            "ADDON_ECONOMICS",
            "ADDON_EXPECTEDNESS",
        ]
    );
}

#[test]
fn full_addon_coverage_passes() {
    let addons = addons_for(FULL_ADDONS, Some("distribution"));

    let options = check(&addons, CheckCode::AddonOptions);
    assert_eq!(options.status, CheckStatus::Pass);
    assert_eq!(options.value.as_deref(), Some("option to extend, option notice"));

    assert_eq!(check(&addons, CheckCode::AddonMerchPitch).status, CheckStatus::Pass);
    assert_eq!(check(&addons, CheckCode::AddonNegotiation).status, CheckStatus::Pass);

    let windows = check(&addons, CheckCode::AddonWindows);
    assert_eq!(windows.value.as_deref(), Some("30 days"));

    let economics = check(&addons, CheckCode::AddonEconomics);
    assert_eq!(economics.value.as_deref(), Some("additional commission; 5%"));

    let expected = check(&addons, CheckCode::AddonExpectedness);
    assert_eq!(expected.status, CheckStatus::Pass);
    assert_eq!(expected.value.as_deref(), Some("5/5 add-on signals"));
    assert_eq!(addons.status, CheckStatus::Pass);
}

#[test]
fn bare_mentions_need_review() {
    let addons = addons_for(
        "Either party may negotiate in good faith; an option may be discussed later.",
        Some("license"),
    );
    assert_eq!(check(&addons, CheckCode::AddonOptions).status, CheckStatus::Review);
    assert_eq!(check(&addons, CheckCode::AddonNegotiation).status, CheckStatus::Review);
    assert_eq!(check(&addons, CheckCode::AddonMerchPitch).status, CheckStatus::Fail);

    let expected = check(&addons, CheckCode::AddonExpectedness);
    assert_eq!(expected.status, CheckStatus::Review);
    assert_eq!(expected.confidence, 0.35);
    assert_eq!(addons.status, CheckStatus::Review);
}

#[test]
fn termination_contracts_do_not_expect_addons() {
    let addons = addons_for(FULL_ADDONS, Some("termination"));
    let expected = check(&addons, CheckCode::AddonExpectedness);
    assert_eq!(expected.status, CheckStatus::Review);
    assert_eq!(expected.value.as_deref(), Some("termination"));
}

#[test]
fn no_addons_and_unknown_type_fails() {
    let addons = addons_for("Signed by both parties on the date below.", None);
    assert_eq!(check(&addons, CheckCode::AddonExpectedness).status, CheckStatus::Fail);
    assert_eq!(addons.status, CheckStatus::Fail);
}

#[test]
fn windows_normalize_units() {
    let addons = addons_for(
        "Notice must be given not less than 2 week before expiry, and the option is exercisable for 1 month.",
        Some("license"),
    );
    assert_eq!(
        check(&addons, CheckCode::AddonWindows).value.as_deref(),
        Some("2 weeks, 1 month")
    );
}

#[test]
fn partial_coverage_reviews() {
    let addons = addons_for("The Label holds merchandising rights and endorsement approvals.", Some("management"));
    assert_eq!(check(&addons, CheckCode::AddonMerchPitch).status, CheckStatus::Pass);
    let expected = check(&addons, CheckCode::AddonExpectedness);
    assert_eq!(expected.status, CheckStatus::Review);
    assert_eq!(expected.value.as_deref(), Some("1/5 add-on signals"));
}
