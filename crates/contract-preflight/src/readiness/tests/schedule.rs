use super::common::*;
use crate::entity::EntityStory;
use crate::readiness::{build_schedule_structure, CheckCode, CheckStatus};
use crate::rules::ContractRules;

fn schedule_for(text: &str, story: Option<&EntityStory>) -> crate::readiness::DomainResult {
    build_schedule_structure(text, story, &spine(text), &rules())
}

fn candidate_names(domain: &crate::readiness::DomainResult) -> Vec<String> {
    check(domain, CheckCode::SchType)
        .candidates
        .iter()
        .map(|candidate| candidate.value.clone())
        .collect()
}

#[test]
fn schedule_checks_run_in_fixed_order() {
    let schedule = schedule_for("Distribution Agreement\nSchedule A", Some(&resolved_story()));
    assert_eq!(
        codes(&schedule),
        vec!["SCH_PRESENCE", "SCH_TYPE", "SCH_OWNERSHIP", "SCH_LIFECYCLE", "SCH_ROLE_ALIGNMENT"]
    );
}

#[test]
fn specific_type_suppresses_general_schedule() {
    let text = "Distribution Agreement\nSchedule 1\nDistro & Sync of Existing Masters\n";
    let schedule = schedule_for(text, Some(&resolved_story()));

    let names = candidate_names(&schedule);
    assert!(!names.iter().any(|name| name == "general_schedule"));
    assert_eq!(names[0], "distro_sync_existing_masters");
    assert_eq!(
        check(&schedule, CheckCode::SchType).value.as_deref(),
        Some("distro_sync_existing_masters")
    );
    assert_eq!(check(&schedule, CheckCode::SchPresence).status, CheckStatus::Pass);
}

#[test]
fn body_only_specific_type_still_excludes_general_schedule() {
    let mut text = String::from("Exhibit A\n");
    for _ in 0..12 {
        text.push_str("filler line\n");
    }
    text.push_str("The existing masters are licensed hereunder.");
    let schedule = schedule_for(&text, Some(&resolved_story()));

    assert_eq!(candidate_names(&schedule), vec!["distro_sync_existing_masters"]);
    let schedule_type = check(&schedule, CheckCode::SchType);
    assert_eq!(schedule_type.value.as_deref(), Some("distro_sync_existing_masters"));
    assert_eq!(schedule_type.status, CheckStatus::Pass);
}

#[test]
fn general_schedule_stands_alone() {
    let schedule = schedule_for("Distribution Agreement\nExhibit A\n", Some(&resolved_story()));
    let schedule_type = check(&schedule, CheckCode::SchType);
    assert_eq!(schedule_type.status, CheckStatus::Pass);
    assert_eq!(schedule_type.value.as_deref(), Some("general_schedule"));
}

#[test]
fn ties_follow_rules_priority() {
    let schedule = schedule_for("Catalog Acquisition\nTermination Schedule\n", Some(&resolved_story()));
    let schedule_type = check(&schedule, CheckCode::SchType);
    assert_eq!(schedule_type.status, CheckStatus::Review);
    assert_eq!(
        candidate_names(&schedule),
        vec!["catalog_acquisition_masters", "termination_schedule"]
    );
}

#[test]
fn ties_fall_back_to_name_without_priority() {
    let text = "Catalog Acquisition\nTermination Schedule\n";
    let schedule = build_schedule_structure(
        text,
        Some(&resolved_story()),
        &spine(text),
        &ContractRules::default(),
    );
    assert_eq!(
        candidate_names(&schedule),
        vec!["catalog_acquisition_masters", "termination_schedule"]
    );
}

#[test]
fn missing_schedule_markers() {
    let text = "Termination Agreement\nThe parties end their relationship.";
    let termination = build_schedule_structure(
        text,
        Some(&resolved_story()),
        &spine_with_type(Some("termination")),
        &rules(),
    );
    assert_eq!(check(&termination, CheckCode::SchPresence).status, CheckStatus::Review);
    assert_ne!(termination.status, CheckStatus::Fail);

    let distribution = build_schedule_structure(
        text,
        Some(&resolved_story()),
        &spine_with_type(Some("distribution")),
        &rules(),
    );
    assert_eq!(check(&distribution, CheckCode::SchPresence).status, CheckStatus::Fail);
    assert_eq!(distribution.status, CheckStatus::Fail);
}

#[test]
fn ownership_and_lifecycle_markers() {
    let text = "Distribution Agreement\nSchedule A lists master ownership and the ownership split.\nDelivery date and commencement are set out below.";
    let schedule = schedule_for(text, Some(&resolved_story()));

    let ownership = check(&schedule, CheckCode::SchOwnership);
    assert_eq!(ownership.status, CheckStatus::Pass);
    assert_eq!(ownership.value.as_deref(), Some("master ownership, ownership split, split"));

    let lifecycle = check(&schedule, CheckCode::SchLifecycle);
    assert_eq!(lifecycle.status, CheckStatus::Pass);
    assert_eq!(lifecycle.value.as_deref(), Some("delivery date, commencement"));
}

#[test]
fn role_alignment_tiers() {
    let text = "Distribution Agreement\nSchedule A";
    let alignment = |story: Option<&EntityStory>| {
        schedule_for(text, story)
            .check(CheckCode::SchRoleAlignment)
            .map(|check| check.status)
    };

    assert_eq!(alignment(Some(&resolved_story())), Some(CheckStatus::Pass));
    assert_eq!(alignment(Some(&legal_only_story())), Some(CheckStatus::Review));
    assert_eq!(alignment(Some(&EntityStory::default())), Some(CheckStatus::Fail));
    assert_eq!(alignment(None), Some(CheckStatus::Fail));
    assert_eq!(
        alignment(Some(&EntityStory::without_resolver(text))),
        Some(CheckStatus::Review)
    );
}
