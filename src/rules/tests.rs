use super::*;
use crate::FieldNode;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

fn env(siblings: &[FieldNode]) -> RuleEnv<'_> {
    let reference = NaiveDateTime::new(NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(), NaiveTime::MIN);
    RuleEnv::new(siblings.iter().collect(), reference)
}

fn run(rule: Rule, value: &str) -> Result<String, RuleError> {
    rewrite(&rule, value, &env(&[]))
}

fn text(t: &str) -> Matcher {
    Matcher::Text(t.to_string())
}

#[test]
fn exclude_by_text_shape_and_regex() {
    assert_eq!(run(Rule::Exclude { pattern: text("tel") }, "ACME Tel TEL corp").unwrap(), "ACME   corp");
    assert_eq!(run(Rule::Exclude { pattern: Matcher::Shape("AB-12".into()) }, "Ref XY-99 ok").unwrap(), "Ref  ok");
    assert_eq!(run(Rule::Exclude { pattern: Matcher::Regex(r"\s*\(.*\)".into()) }, "FCA (Graz)").unwrap(), "FCA");
}

#[test]
fn delete_from_and_until() {
    let until = Rule::DeleteUntil { marker: text("ref:") };
    assert_eq!(run(until.clone(), "Our REF: 42-A").unwrap(), "42-A");
    assert_eq!(run(until, "nothing here").unwrap(), "nothing here");

    let from = Rule::DeleteFrom { marker: text("tel") };
    assert_eq!(run(from, "ACME GmbH Tel 555").unwrap(), "ACME GmbH");

    let last = Rule::DeleteUntil { marker: Matcher::Regex("/".into()) };
    assert_eq!(run(last, "a/b/c").unwrap(), "c");
}

#[test]
fn replace_value_prefers_whole_value_match() {
    let rule = Rule::ReplaceValue {
        mapping: vec![Replacement::new("air", "AIR FREIGHT"), Replacement::new("Str\\.", "Strasse")],
    };
    assert_eq!(run(rule.clone(), " Air ").unwrap(), "AIR FREIGHT");
    assert_eq!(run(rule, "Hauptstr. 4 Str. 5").unwrap(), "Hauptstr. 4 Strasse 5");
}

#[test]
fn replace_value_falls_back_to_literal_on_bad_regex() {
    let rule = Rule::ReplaceValue { mapping: vec![Replacement::new("(c", "C")] };
    assert_eq!(run(rule, "x (c y").unwrap(), "x C y");
}

#[test]
fn extraction_rules() {
    assert_eq!(run(Rule::ExtractSubstring { start: Some(1), end: Some(4) }, "ÅBCDE").unwrap(), "BCD");
    assert_eq!(run(Rule::ExtractSubstring { start: Some(3), end: None }, "AB").unwrap(), "");
    let pattern = Rule::ExtractPattern { regex: r"[a-z]{3}\d{4}".into() };
    assert_eq!(run(pattern.clone(), "ref ABC1234 end").unwrap(), "ABC1234");
    assert_eq!(run(pattern, "no match").unwrap(), "no match");
}

#[test]
fn affixes_and_case() {
    assert_eq!(run(Rule::AddPrefix { text: "DE".into() }, "123").unwrap(), "DE123");
    assert_eq!(run(Rule::AddSuffix { text: " KG".into() }, "12").unwrap(), "12 KG");
    assert_eq!(run(Rule::ConvertCase { case: LetterCase::Upper }, "graz").unwrap(), "GRAZ");
    assert_eq!(run(Rule::Trim, "  x  ").unwrap(), "x");
}

#[test]
fn round_decimal_modes() {
    assert_eq!(run(Rule::RoundDecimal { places: 2, mode: RoundMode::Nearest }, "12.346").unwrap(), "12.35");
    assert_eq!(run(Rule::RoundDecimal { places: 0, mode: RoundMode::Up }, "12,1").unwrap(), "13");
    assert_eq!(run(Rule::RoundDecimal { places: 0, mode: RoundMode::Down }, "12.9").unwrap(), "12");
    assert!(matches!(
        run(Rule::RoundDecimal { places: 1, mode: RoundMode::Nearest }, "abc"),
        Err(RuleError::InvalidNumber(_))
    ));
}

#[test]
fn arithmetic_reads_a_lone_separator_as_decimal_point() {
    assert_eq!(run(Rule::RoundDecimal { places: 1, mode: RoundMode::Nearest }, "0.125").unwrap(), "0.1");
    assert_eq!(run(Rule::RoundDecimal { places: 2, mode: RoundMode::Nearest }, "0.125").unwrap(), "0.13");
    assert_eq!(run(Rule::Calculate { expr: "* 2".into() }, "1.250").unwrap(), "2.5");
    assert_eq!(run(Rule::Calculate { expr: "+ 1".into() }, "1.000,5").unwrap(), "1001.5");
    // currency keeps reading three trailing digits as grouping
    assert_eq!(run(Rule::FormatCurrency, "1.250").unwrap(), "1250.00");
}

#[test]
fn correct_data_type_fixes_ocr_confusions() {
    let rule = Rule::CorrectDataType { mask: "AAANNNN".into() };
    assert_eq!(run(rule.clone(), "0SLl2O5").unwrap(), "OSL1205");
    assert!(matches!(run(rule, "short"), Err(RuleError::MaskMismatch { .. })));
}

#[test]
fn format_date_and_currency() {
    assert_eq!(run(Rule::FormatDate { output: "%m-%d-%Y".into() }, "31.01.2024").unwrap(), "01-31-2024");
    assert_eq!(run(Rule::FormatCurrency, "USD 1.234,50").unwrap(), "1234.50");
}

#[test]
fn calculate_chains_and_rounds() {
    assert_eq!(run(Rule::Calculate { expr: "/ 3".into() }, "10").unwrap(), "3.333");
    assert_eq!(run(Rule::Calculate { expr: "* 2 + 0.5".into() }, "4").unwrap(), "8.5");
    assert!(run(Rule::Calculate { expr: "/ 0".into() }, "4").is_err());
}

#[test]
fn calculate_fields_reads_siblings() {
    let siblings = vec![FieldNode::plain("p", "pieces", "4")];
    let rule = Rule::CalculateFields { op: ArithmeticOp::Multiply, label: "pieces".into() };
    assert_eq!(rewrite(&rule, "12.5", &env(&siblings)).unwrap(), "50");

    let missing = Rule::CalculateFields { op: ArithmeticOp::Add, label: "weight".into() };
    assert!(matches!(rewrite(&missing, "1", &env(&siblings)), Err(RuleError::MissingReference(_))));

    let zero = vec![FieldNode::plain("p", "pieces", "0")];
    let divide = Rule::CalculateFields { op: ArithmeticOp::Divide, label: "pieces".into() };
    assert!(matches!(rewrite(&divide, "1", &env(&zero)), Err(RuleError::DivisionByZero)));
}

#[test]
fn convert_decimals_drops_thousands_dots() {
    assert_eq!(run(Rule::ConvertDecimals, "1.234,5").unwrap(), "1234.5");
    assert_eq!(run(Rule::ConvertDecimals, "12,").unwrap(), "12");
    assert_eq!(run(Rule::ConvertDecimals, "n/a").unwrap(), "n/a");
}

#[test]
fn fix_dimension_separators_restores_missing_x() {
    assert_eq!(run(Rule::FixDimensionSeparators, "120x80 100").unwrap(), "120x80x100");
    assert_eq!(run(Rule::FixDimensionSeparators, "120x80x100 2").unwrap(), "120x80x100 2");
    assert_eq!(run(Rule::FixDimensionSeparators, "no dims").unwrap(), "no dims");
}

#[test]
fn node_rules_leave_value_alone() {
    let split = Rule::SplitBySeparator { separator: ",".into() };
    assert_eq!(run(split, "A,B").unwrap(), "A,B");
}

#[test]
fn conditions() {
    assert!(Condition::Contains(text("kg")).holds("12 KG").unwrap());
    assert!(Condition::DoesNotContain(text("lb")).holds("12 KG").unwrap());
    assert!(Condition::StartsWith(Matcher::Shape("1".into())).holds("12 KG").unwrap());
    assert!(!Condition::EndsWith(text("lb")).holds("12 KG").unwrap());
}

#[test]
fn rules_deserialize_from_tagged_json() {
    let json = r#"[
        {"type": "exclude", "pattern": {"text": "Tel"}},
        {"type": "roundDecimal", "places": 2},
        {"type": "filter", "test": "startsWith", "pattern": {"regex": "^[A-Z]"}},
        {"type": "conditional", "when": {"contains": {"text": "kg"}}, "then": [{"type": "trim"}]},
        {"type": "formatCurrency"}
    ]"#;
    let rules: Vec<Rule> = serde_json::from_str(json).unwrap();
    assert_eq!(rules[1], Rule::RoundDecimal { places: 2, mode: RoundMode::Nearest });
    assert_eq!(rules[3].name(), "conditional");
    assert!(rules.iter().all(|r| r.check().is_ok()));
}

#[test]
fn check_reaches_into_conditionals() {
    let rule = Rule::Conditional {
        when: Condition::Contains(text("x")),
        then: vec![Rule::Exclude { pattern: Matcher::Regex("[".into()) }],
    };
    assert!(matches!(rule.check(), Err(RuleError::InvalidRegex { .. })));
}

mod props {
    use super::*;
    use proptest::prelude::*;

    fn any_rule() -> impl Strategy<Value = Rule> {
        prop_oneof![
            Just(Rule::Trim),
            Just(Rule::FormatCurrency),
            Just(Rule::ConvertDecimals),
            Just(Rule::FixDimensionSeparators),
            Just(Rule::Calculate { expr: "* 1.5".into() }),
            Just(Rule::RoundDecimal { places: 2, mode: RoundMode::Up }),
            Just(Rule::CorrectDataType { mask: "AANN".into() }),
            (0usize..6, 0usize..8).prop_map(|(s, e)| Rule::ExtractSubstring { start: Some(s), end: Some(e) }),
            "[a-zA-Z0-9 ]{0,4}".prop_map(|t| Rule::Exclude { pattern: Matcher::Text(t) }),
            "[a-zA-Z0-9 .,]{0,4}".prop_map(|t| Rule::DeleteUntil { marker: Matcher::Shape(t) }),
            "[a-z(]{0,3}".prop_map(|t| Rule::ReplaceValue { mapping: vec![Replacement::new(t, "R")] }),
        ]
    }

    proptest! {
        #[test]
        fn rewrites_never_panic(rule in any_rule(), value in "\\PC{0,24}") {
            let _ = rewrite(&rule, &value, &env(&[]));
        }
    }
}
