use super::matching::search_key;
use super::merge::translate;
use super::*;
use crate::{AddressParts, Context, FieldNode, FieldSection, Level, LookupMode, QualifierTable, Status};

const TABLE: &str = "SHIPPER_MASTER";

struct FailingRegistry;

impl RegistryClient for FailingRegistry {
    fn query(&self, table: &str, _: &[Filter]) -> Result<Vec<Record>, RegistryError> {
        Err(RegistryError::Timeout(table.to_string()))
    }
}

fn ctx() -> Context {
    Context { profile: "P1".into(), known_labels: vec!["notifyPartyName".into()], ..Context::default() }
}

fn shipper(account: &str) -> FieldNode {
    let parts = AddressParts {
        name: "ACME LOGISTICS LTD".into(),
        account_number: account.into(),
        address_line1: "12 Harbour Road".into(),
        city: "LIVERPOOL".into(),
        country_code: "GB".into(),
        ..AddressParts::default()
    };
    FieldNode::address_block("f1", "shipper", "ACME LOGISTICS LTD\n12 Harbour Road\nLIVERPOOL", parts)
}

fn acme_row(account: &str, line1: &str) -> Record {
    Record::new([
        ("SHIPPERNAME", "ACME LOGISTICS LTD"),
        ("SHIPPERACCOUNTNUMBER", account),
        ("SHIPPERADDRESSLINE1", line1),
        ("SHIPPERCITY", "Liverpool"),
        ("SHIPPER_SHORT_CODE", "ACMLIV"),
        ("PROFILE_NAME", "P1"),
        ("PAY", "C"),
        ("NOTIFY_PARTY_NAME", "BETA TRADING"),
        ("UNMAPPED_COLUMN", "x"),
    ])
}

fn foods_row() -> Record {
    Record::new([("SHIPPERNAME", "ACME FOODS INC"), ("SHIPPERACCOUNTNUMBER", "US1"), ("PROFILE_NAME", "P1")])
}

fn registry(rows: Vec<Record>) -> StaticRegistry {
    rows.into_iter().fold(StaticRegistry::new(), |reg, row| reg.with(TABLE, row))
}

fn set_name(node: &mut FieldNode, name: &str) {
    if let Some(child) = node.child_mut("name") {
        child.value = name.to_string();
    }
}

fn children_of(node: &FieldNode) -> Vec<(String, String)> {
    node.children.iter().map(|c| (c.label.clone(), c.value.clone())).collect()
}

// --- decisions ------------------------------------------------------------------

#[test]
fn search_key_takes_one_or_two_words() {
    let mut node = shipper("");
    assert_eq!(search_key(&node).as_deref(), Some("ACME"));

    set_name(&mut node, "DB Schenker AG");
    assert_eq!(search_key(&node).as_deref(), Some("DB SCHENKER"));

    set_name(&mut node, "Beta, Ltd");
    assert_eq!(search_key(&node).as_deref(), Some("BETA"));

    set_name(&mut node, "");
    assert_eq!(search_key(&node).as_deref(), Some("ACME"));

    node.value = "  ".into();
    assert_eq!(search_key(&node), None);
}

#[test]
fn exact_name_with_agreeing_attributes_resolves() {
    let reg = registry(vec![acme_row("GB12345", "12 HARBOUR ROAD"), foods_row()]);
    let decision = resolve(&shipper(""), &reg, &ctx());
    let Decision::Resolved(merged) = &decision else {
        panic!("expected a match, got {decision:?}");
    };
    assert_eq!(merged.score, 100);
    assert_eq!(merged.table, TABLE);
    assert_eq!(merged.full_address, None);
    assert_eq!(
        merged.children,
        vec![
            ("accountNumber".to_string(), "GB12345".to_string()),
            ("addressLine1".to_string(), "12 HARBOUR ROAD".to_string()),
            ("city".to_string(), "Liverpool".to_string()),
            ("shortCode".to_string(), "ACMLIV".to_string()),
        ]
    );
    assert_eq!(
        merged.siblings,
        vec![
            SiblingField { label: "notifyPartyName".into(), value: "BETA TRADING".into(), qualifier: None },
            SiblingField { label: "PAY".into(), value: "C".into(), qualifier: Some("references".into()) },
        ]
    );
}

#[test]
fn low_scores_are_not_found() {
    let reg = registry(vec![foods_row()]);
    let decision = resolve(&shipper(""), &reg, &ctx());
    assert!(matches!(decision, Decision::NotFound(Miss::BelowThreshold { best }) if best < NAME_THRESHOLD));

    let empty = StaticRegistry::new();
    assert_eq!(resolve(&shipper(""), &empty, &ctx()), Decision::NotFound(Miss::NoCandidates));
}

#[test]
fn rows_of_other_profiles_are_ignored() {
    let reg = registry(vec![acme_row("GB12345", "12 HARBOUR ROAD")]);
    let other = Context { profile: "P2".into(), ..ctx() };
    assert_eq!(resolve(&shipper(""), &reg, &other), Decision::NotFound(Miss::NoCandidates));
}

#[test]
fn identical_names_are_ambiguous() {
    let reg = registry(vec![
        Record::new([("SHIPPERNAME", "ACME LOGISTICS LTD"), ("PROFILE_NAME", "P1")]),
        Record::new([("SHIPPERNAME", "ACME LOGISTICS LTD."), ("PROFILE_NAME", "P1")]),
    ]);
    let decision = resolve(&shipper(""), &reg, &ctx());
    assert_eq!(decision, Decision::Ambiguous(Ambiguity::CloseMatches { scores: vec![100, 100] }));
}

fn named(names: &[&str]) -> StaticRegistry {
    registry(names.iter().map(|n| Record::new([("SHIPPERNAME", *n), ("PROFILE_NAME", "P1")])).collect())
}

#[test]
fn runner_up_two_points_behind_is_ambiguous() {
    let mut node = shipper("");
    set_name(&mut node, "ACME OCEAN FREIGHT LIMITED");
    let reg = named(&["ACME OCEAN FREIGHT LIMITED", "ACME OCEAN FREIGHT LIMITEDS"]);
    let decision = resolve(&node, &reg, &ctx());
    assert_eq!(decision, Decision::Ambiguous(Ambiguity::CloseMatches { scores: vec![100, 98] }));
}

#[test]
fn runner_up_three_points_behind_is_outscored() {
    let mut node = shipper("");
    set_name(&mut node, "ACME INTERNATIONAL LOGISTICS LIMITED");
    let reg = registry(vec![
        Record::new([
            ("SHIPPERNAME", "ACME INTERNATIONAL LOGISTICS LIMITED A"),
            ("SHIPPERACCOUNTNUMBER", "GB2"),
            ("PROFILE_NAME", "P1"),
        ]),
        Record::new([
            ("SHIPPERNAME", "ACME INTERNATIONAL LOGISTICS LIMITED"),
            ("SHIPPERACCOUNTNUMBER", "GB1"),
            ("PROFILE_NAME", "P1"),
        ]),
    ]);
    let decision = resolve(&node, &reg, &ctx());
    let Decision::Resolved(merged) = &decision else {
        panic!("expected a match, got {decision:?}");
    };
    assert_eq!(merged.score, 100);
    assert_eq!(merged.children, vec![("accountNumber".to_string(), "GB1".to_string())]);
}

#[test]
fn attribute_checks_depend_on_mode() {
    let reg = registry(vec![acme_row("US999", "12 Harbour Road")]);
    assert_eq!(resolve(&shipper(""), &reg, &ctx()), Decision::Ambiguous(Ambiguity::AttributeMismatch));

    let lenient = Context {
        lookup: crate::LookupSettings { mode: LookupMode::Normal, country_check: false, ..Default::default() },
        ..ctx()
    };
    assert!(resolve(&shipper(""), &reg, &lenient).is_resolved());

    let reg = registry(vec![acme_row("GB12345", "99 Quay Street")]);
    assert_eq!(resolve(&shipper(""), &reg, &ctx()), Decision::Ambiguous(Ambiguity::AttributeMismatch));
    let normal = Context { lookup: crate::LookupSettings { mode: LookupMode::Normal, ..Default::default() }, ..ctx() };
    assert!(resolve(&shipper(""), &reg, &normal).is_resolved());
}

#[test]
fn full_address_match_wins_outright() {
    let full = "ACME LOGISTICS LTD\n12 Harbour Road\nLIVERPOOL";
    let reg = registry(vec![Record::new([
        ("SHIPPERNAME", "ACME LOGISTICS LIMITED"),
        ("SHIPPER_FULL_ADDRESS", full),
        ("PROFILE_NAME", "P1"),
    ])]);
    let decision = resolve(&shipper(""), &reg, &ctx());
    let Decision::Resolved(merged) = &decision else {
        panic!("expected a match, got {decision:?}");
    };
    assert_eq!(merged.full_address.as_deref(), Some(full));
    assert_eq!(merged.children, vec![("name".to_string(), "ACME LOGISTICS LIMITED".to_string())]);
}

#[test]
fn registry_failures_are_reported_not_raised() {
    crate::init_test_tracing();
    let decision = resolve(&shipper(""), &FailingRegistry, &ctx());
    assert_eq!(decision, Decision::ServiceError(RegistryError::Timeout(TABLE.into())));
}

// --- translation ------------------------------------------------------------------

#[test]
fn columns_translate_relative_to_the_mother() {
    let mut ctx = ctx();
    ctx.qualifiers = vec![QualifierTable { name: "PARTIES".into(), options: vec!["Notify".into()] }];
    let t = |column: &str, mother: &str, table: &str| translate(column, mother, table, &ctx);

    assert_eq!(t("TEMPLATE_ID", "shipper", TABLE), Some(("TID".into(), None)));
    assert_eq!(t("shipper_account", "shipper", TABLE), Some(("accountNumber".into(), None)));
    assert_eq!(t("shipper_account", "consignee", TABLE), Some(("shipperAccountNumber".into(), None)));
    assert_eq!(t("PARTIES_NOTIFY", "shipper", TABLE), Some(("Notify".into(), Some("PARTIES".into()))));
    assert_eq!(t("PARTIES_DELIVERYAGENT", "shipper", TABLE), Some(("deliveryAgent".into(), None)));
    assert_eq!(t("CODE", "incoterms", "EBOOKING_INCO_TERMS"), Some(("incoterms".into(), None)));
    assert_eq!(t("SHIPPER_FULL_ADDRESS", "shipper", TABLE), Some(("block".into(), None)));
    assert_eq!(t("SHIPPERPOSTCODE", "shipper", TABLE), Some(("postalCode".into(), None)));
    assert_eq!(t("ABC", "shipper", TABLE), Some(("ABC".into(), Some("references".into()))));
    assert_eq!(t("SHIPPERCITY", "shipper", "SHIPPER_TEMPLATE"), None);
    assert_eq!(t("NOTHING_KNOWN", "shipper", TABLE), None);
}

// --- applying decisions -------------------------------------------------------------

#[test]
fn resolved_rows_fill_children_and_replace_siblings() {
    let ctx = ctx();
    let reg = registry(vec![acme_row("GB12345", "12 HARBOUR ROAD")]);
    let stale = FieldNode::plain("f2", "PAY", "P").with_qualifier("references");
    let untouched = FieldNode::plain("f3", "PAY", "kept");
    let mut section = FieldSection::new(vec![shipper("GB999"), stale, untouched]);
    let Some(id) = section.find("shipper") else {
        panic!("shipper missing");
    };

    let decision = section.get(id).map(|n| resolve(n, &reg, &ctx)).unwrap();
    let messages = apply_decision(&mut section, id, &decision, &ctx);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].level, Level::Info);
    assert_eq!(messages[0].text, "shipper auto query matched at 100 pct");

    let node = section.get(id).unwrap();
    assert!(node.children.iter().all(|c| c.status == Status::Resolved));
    assert_eq!(node.child_value("accountNumber"), "GB999");
    assert_eq!(node.child_value("shortCode"), "ACMLIV");
    assert_eq!(node.child_value("city"), "Liverpool");
    assert_eq!(node.child("city").unwrap().origin, crate::Origin::LookupGenerated);
    assert_eq!(node.child_value("name"), "ACME LOGISTICS LTD");

    let rows: Vec<(&str, &str, Option<&str>)> =
        section.iter().map(|n| (n.label.as_str(), n.value.as_str(), n.qualifier.as_deref())).collect();
    assert_eq!(
        rows,
        vec![
            ("shipper", "ACME LOGISTICS LTD\n12 Harbour Road\nLIVERPOOL", None),
            ("notifyPartyName", "BETA TRADING", None),
            ("PAY", "C", Some("references")),
            ("PAY", "kept", None),
        ]
    );
    let pay = section.iter().find(|n| n.value == "C").unwrap();
    assert_eq!(pay.unique_id, "f1_PAY");
    assert_eq!(pay.origin, crate::Origin::LookupGenerated);
}

#[test]
fn full_address_match_rebuilds_the_block() {
    let ctx = ctx();
    let full = "ACME LOGISTICS LTD, 12 Harbour Road, LIVERPOOL L3 4AB, UNITED KINGDOM";
    let merged = MergedFields {
        table: TABLE.into(),
        score: 97,
        full_address: Some(full.into()),
        children: vec![("name".into(), "ACME LOGISTICS LIMITED".into())],
        siblings: Vec::new(),
    };
    let mut section = FieldSection::new(vec![shipper("")]);
    let id = section.find("shipper").unwrap();
    apply_decision(&mut section, id, &Decision::Resolved(merged), &ctx);

    let node = section.get(id).unwrap();
    assert_eq!(node.value, full);
    assert_eq!(node.child_value("name"), "ACME LOGISTICS LIMITED");
    assert_eq!(node.child_value("countryCode"), "GB");
    assert_eq!(node.status, Status::Resolved);
    assert!(node.validate().is_ok());
}

#[test]
fn unresolved_decisions_leave_children_alone() {
    let ctx = ctx();
    let cases = [
        (Decision::NotFound(Miss::NoCandidates), Status::Unresolved, Level::Warning, "No match found for shipper"),
        (
            Decision::NotFound(Miss::BelowThreshold { best: 60 }),
            Status::Unresolved,
            Level::Warning,
            "shipper company name did not reach minimum required match score of 90%",
        ),
        (
            Decision::Ambiguous(Ambiguity::CloseMatches { scores: vec![95, 94] }),
            Status::Ambiguous,
            Level::Warning,
            "shipper company name has multiple close matches",
        ),
        (
            Decision::Ambiguous(Ambiguity::AttributeMismatch),
            Status::Ambiguous,
            Level::Warning,
            "shipper address line/account number initials mismatch",
        ),
        (
            Decision::ServiceError(RegistryError::Unavailable("down".into())),
            Status::Error,
            Level::Error,
            "shipper lookup failed: registry unavailable: down",
        ),
    ];
    for (decision, status, level, text) in cases {
        let before = shipper("");
        let mut section = FieldSection::new(vec![before.clone().with_status(Status::Resolved)]);
        let id = section.find("shipper").unwrap();
        let messages = apply_decision(&mut section, id, &decision, &ctx);
        assert_eq!(messages.len(), 1);
        assert_eq!((messages[0].level, messages[0].text.as_str()), (level, text));

        let node = section.get(id).unwrap();
        assert_eq!(children_of(node), children_of(&before));
        assert_eq!(node.status, status);
        assert!(node.children.iter().all(|c| c.status == status));
        assert_eq!(section.len(), 1);
    }
}

mod props {
    use super::super::fuzzy::{normalize, ratio};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn ratio_is_symmetric_and_bounded(a in "[a-zA-Z0-9 .,&]{0,24}", b in "[a-zA-Z0-9 .,&]{0,24}") {
            let (a, b) = (normalize(&a), normalize(&b));
            let ab = ratio(&a, &b);
            prop_assert_eq!(ab, ratio(&b, &a));
            prop_assert!(ab <= 100);
            prop_assert_eq!(ratio(&a, &a), 100);
        }
    }
}
