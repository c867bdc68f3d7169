//! Document-level behaviour: migration, parsing, cloning and round trips.

use std::path::{Path, PathBuf};

use pricing_core::{
    dump, load_str, load_str_with_report, migrate, parse, serialize, FeatureValue, PricingError,
    Version,
};
use rust_decimal::Decimal;
use serde_yaml::Value;

fn fixture(name: &str) -> String {
    let path: PathBuf = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

fn yaml(text: &str) -> Value {
    serde_yaml::from_str(text).unwrap()
}

const TWO_PLANS: &str = r#"
version: "2.0"
saasName: Petclinic
createdAt: "2024-01-15"
currency: EUR
features:
  maxPets:
    valueType: NUMERIC
    defaultValue: 2
    expression: "userContext['pets'] < planContext['maxPets']"
    type: DOMAIN
plans:
  BASIC:
    price: 0
  ADVANCED:
    price: 10
    features:
      maxPets:
        value: 4
"#;

#[test]
fn plans_inherit_defaults_and_keep_overrides() {
    let m = load_str(TWO_PLANS).unwrap();
    let basic = m.plan("BASIC").unwrap().feature("maxPets").unwrap();
    let advanced = m.plan("ADVANCED").unwrap().feature("maxPets").unwrap();
    assert_eq!(basic.effective_value(), &FeatureValue::from(2));
    assert_eq!(advanced.effective_value(), &FeatureValue::from(4));
    assert_eq!(m.features["maxPets"].value, None);
}

#[test]
fn plan_copies_are_independent() {
    let mut m = load_str(TWO_PLANS).unwrap();
    if let Some(plans) = m.plans.as_mut() {
        let copy = plans.get_mut("BASIC").unwrap().features.get_mut("maxPets").unwrap();
        copy.value = Some(FeatureValue::from(7));
        copy.description = Some("edited".into());
    }
    assert_eq!(m.features["maxPets"].description, None);
    assert_eq!(m.features["maxPets"].default_value, FeatureValue::from(2));
    assert_eq!(
        m.plan("ADVANCED").unwrap().feature("maxPets").unwrap().effective_value(),
        &FeatureValue::from(4)
    );
}

#[test]
fn version_1_0_to_1_1_collapses_date_and_redundant_server_expression() {
    let doc = migrate(yaml(&fixture("petclinic-v1.0.yml")), Version::V1_1).unwrap();
    assert_eq!(doc["version"], Value::from("1.1"));
    assert_eq!(doc["createdAt"], Value::from("2024-01-15"));
    assert!(doc.get("day").is_none() && doc.get("month").is_none() && doc.get("year").is_none());
    assert!(doc["features"]["maxPets"].get("serverExpression").is_none());
    assert_eq!(
        doc["features"]["haveCalendar"]["serverExpression"],
        Value::from("planContext['haveCalendar'] && userContext['verified'] == true")
    );
    // Plans are untouched until the 2.0 step.
    assert_eq!(doc["plans"]["BASIC"]["monthlyPrice"], Value::from(0));
}

#[test]
fn full_chain_reports_every_step_and_the_annual_fallback() {
    let (m, report) = load_str_with_report(&fixture("petclinic-v1.0.yml")).unwrap();
    assert_eq!(report.applied, vec![Version::V1_0, Version::V1_1, Version::V1_2]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("PRO"));
    assert_eq!(m.plan("PRO").unwrap().price.amount(), Some(Decimal::from(300)));
    assert_eq!(m.plan("ADVANCED").unwrap().price.amount(), Some(Decimal::from(15)));
    assert_eq!(m.version, Version::LATEST);
}

#[test]
fn migration_is_idempotent() {
    for name in ["petclinic-v1.0.yml", "petclinic-v1.1.yml", "petclinic-v2.0.yml"] {
        let once = migrate(yaml(&fixture(name)), Version::LATEST).unwrap();
        let twice = migrate(once.clone(), Version::LATEST).unwrap();
        assert_eq!(once, twice, "{name}");
    }
}

#[test]
fn serialize_then_parse_round_trips() {
    for name in ["petclinic-v1.0.yml", "petclinic-v1.1.yml", "petclinic-v2.0.yml"] {
        let m = load_str(&fixture(name)).unwrap();
        let doc = serialize(&m).unwrap();
        assert_eq!(doc["version"], Value::from("2.0"));
        let again = parse(&doc).unwrap();
        assert_eq!(again, m, "{name}");
        assert_eq!(serialize(&again).unwrap(), doc, "{name}");
    }
}

#[test]
fn serializer_omits_absent_attributes_and_default_copies() {
    let text = dump(&load_str(TWO_PLANS).unwrap()).unwrap();
    assert!(!text.contains("null"));
    assert!(!text.contains("usageLimits"));
    let doc = yaml(&text);
    assert!(doc["plans"]["BASIC"].get("features").is_none());
    assert_eq!(doc["plans"]["ADVANCED"]["features"]["maxPets"]["value"], Value::from(4));
}

#[test]
fn formula_and_text_prices_survive() {
    let m = load_str(&fixture("petclinic-v2.0.yml")).unwrap();
    assert_eq!(m.plan("ADVANCED").unwrap().price.amount(), Some(Decimal::from(15)));
    assert_eq!(m.plan("ENTERPRISE").unwrap().price.amount(), None);
    let doc = serialize(&m).unwrap();
    assert_eq!(doc["plans"]["ADVANCED"]["price"], Value::from("#base * 1.5"));
    assert_eq!(doc["plans"]["ENTERPRISE"]["price"], Value::from("Contact sales"));
}

#[test]
fn deeply_nested_price_formula_is_an_error() {
    let formula = format!("#base + {}1{}", "(".repeat(10_000), ")".repeat(10_000));
    let text = TWO_PLANS.replace("price: 10", &format!("price: '{}'", formula));
    match load_str(&text) {
        Err(PricingError::Expression { context, .. }) => assert!(context.contains("ADVANCED")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn override_of_unknown_feature_is_rejected() {
    let text = TWO_PLANS.replace("maxPets:\n        value: 4", "maxCats:\n        value: 4");
    match load_str(&text) {
        Err(PricingError::FeatureNotFound(msg)) => assert!(msg.contains("maxCats")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn override_with_wrong_type_is_rejected() {
    let text = TWO_PLANS.replace("value: 4", "value: lots");
    assert!(matches!(load_str(&text), Err(PricingError::InvalidDefaultValue(_))));
}

#[test]
fn validity_window() {
    let m = load_str(&fixture("petclinic-v2.0.yml")).unwrap();
    let day = |s: &str| pricing_core::document::parse_date(s).unwrap();
    assert!(!m.is_active_on(day("2024-01-31")));
    assert!(m.is_active_on(day("2024-06-01")));
    assert!(!m.is_active_on(day("2025-02-01")));
}

#[test]
fn unsupported_version_is_a_version_error() {
    let text = TWO_PLANS.replace("version: \"2.0\"", "version: \"3.1\"");
    assert!(matches!(
        load_str(&text),
        Err(PricingError::Migration(pricing_core::MigrationError::Version(_)))
    ));
}
