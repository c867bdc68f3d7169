//! Mutations persisted through a document store.

use std::sync::atomic::{AtomicBool, Ordering};

use pricing_core::{
    EntityKind, Feature, FeatureKind, FeatureValue, Plan, Price, PricingError, PricingService,
    ValueType,
};
use pricing_storage::{DocumentStore, FileStore, MemoryStore, Revision, StorageError, StoredDocument};
use rust_decimal::Decimal;

const DOC: &str = r#"
version: "1.1"
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
    monthlyPrice: 0
  ADVANCED:
    monthlyPrice: 10
    features:
      maxPets:
        value: 4
"#;

#[test]
fn mutations_are_persisted_at_latest_version() {
    let service = PricingService::new(MemoryStore::with_content(DOC));
    service
        .add_feature(Feature::new(
            "haveCalendar",
            FeatureKind::Domain,
            ValueType::Boolean,
            false.into(),
        ))
        .unwrap();

    let stored = service.store().load().unwrap();
    assert!(stored.content.contains("version: '2.0'") || stored.content.contains("version: \"2.0\""));

    let m = service.load().unwrap();
    for plan in m.plans.as_ref().unwrap().values() {
        assert_eq!(
            plan.feature("haveCalendar").unwrap().effective_value(),
            &FeatureValue::Bool(false)
        );
    }

    service.remove_feature("haveCalendar").unwrap();
    assert!(service.get_plan("BASIC").unwrap().feature("haveCalendar").is_none());
}

#[test]
fn duplicate_plan_is_rejected_and_nothing_is_written() {
    let service = PricingService::new(MemoryStore::with_content(DOC));
    let before = service.store().load().unwrap().revision;
    let err = service
        .add_plan(Plan::new("BASIC", Price::Amount(Decimal::ONE)))
        .unwrap_err();
    assert!(matches!(err, PricingError::AlreadyExists { kind: EntityKind::Plan, ref name } if name == "BASIC"));
    assert_eq!(service.store().load().unwrap().revision, before);
}

#[test]
fn missing_plan_is_not_found() {
    let service = PricingService::new(MemoryStore::with_content(DOC));
    assert!(matches!(
        service.get_plan("GOLD"),
        Err(PricingError::NotFound { kind: EntityKind::Plan, .. })
    ));
    assert!(matches!(
        service.set_plan_feature_value("GOLD", "maxPets", 3.into()),
        Err(PricingError::NotFound { .. })
    ));
}

#[test]
fn price_edits() {
    let service = PricingService::new(MemoryStore::with_content(DOC));
    service
        .set_plan_price("ADVANCED", Price::Amount(Decimal::from(12)))
        .unwrap();
    assert_eq!(
        service.get_plan("ADVANCED").unwrap().price.amount(),
        Some(Decimal::from(12))
    );
    // No variables are declared, so a formula cannot resolve.
    assert!(matches!(
        service.set_plan_formula_price("ADVANCED", "#base * 2"),
        Err(PricingError::Expression { .. })
    ));
}

#[test]
fn replace_all_creates_missing_documents() {
    let dir = tempfile::tempdir().unwrap();
    let seed = PricingService::new(MemoryStore::with_content(DOC)).load().unwrap();

    let service = PricingService::new(FileStore::new(dir.path().join("pricing.yml")));
    service.replace_all(&seed).unwrap();
    assert_eq!(service.load().unwrap(), seed);

    service.set_plan_feature_value("BASIC", "maxPets", 3.into()).unwrap();
    assert_eq!(
        service.get_plan("BASIC").unwrap().feature("maxPets").unwrap().effective_value(),
        &FeatureValue::from(3)
    );
}

/// Changes the stored document right after the first read, as a concurrent
/// writer would.
struct RacingStore {
    inner: MemoryStore,
    raced: AtomicBool,
}

impl DocumentStore for RacingStore {
    fn location(&self) -> String {
        self.inner.location()
    }

    fn load(&self) -> Result<StoredDocument, StorageError> {
        let doc = self.inner.load()?;
        if !self.raced.swap(true, Ordering::SeqCst) {
            let edited = format!("{}# edited elsewhere\n", doc.content);
            self.inner.replace(&edited, &doc.revision)?;
        }
        Ok(doc)
    }

    fn create(&self, content: &str) -> Result<Revision, StorageError> {
        self.inner.create(content)
    }

    fn replace(&self, content: &str, expected: &Revision) -> Result<Revision, StorageError> {
        self.inner.replace(content, expected)
    }
}

#[test]
fn lost_race_is_a_conflict() {
    let service = PricingService::new(RacingStore {
        inner: MemoryStore::with_content(DOC),
        raced: AtomicBool::new(false),
    });
    let err = service.remove_plan("BASIC").unwrap_err();
    assert!(matches!(
        err,
        PricingError::Storage(StorageError::ConcurrentConflict { .. })
    ));
    // A second attempt reads the new revision and succeeds.
    service.remove_plan("BASIC").unwrap();
    assert!(service.get_plan("BASIC").is_err());
}

#[test]
fn feature_rename_is_persisted() {
    let service = PricingService::new(MemoryStore::with_content(DOC));
    let mut feature = service.load().unwrap().features["maxPets"].clone();
    feature.name = "maxAnimals".into();
    service.update_feature("maxPets", feature.clone()).unwrap();

    let advanced = service.get_plan("ADVANCED").unwrap();
    assert!(advanced.feature("maxPets").is_none());
    assert_eq!(
        advanced.feature("maxAnimals").unwrap().effective_value(),
        &FeatureValue::from(4)
    );

    let before = service.store().load().unwrap().revision;
    assert!(matches!(
        service.update_feature("maxPets", feature),
        Err(PricingError::NotFound { kind: EntityKind::Feature, .. })
    ));
    assert_eq!(service.store().load().unwrap().revision, before);
}

#[test]
fn plan_update_is_persisted() {
    let service = PricingService::new(MemoryStore::with_content(DOC));
    let mut plan = service.get_plan("BASIC").unwrap();
    plan.name = "FREE".into();
    plan.description = Some("Free forever".into());
    service.update_plan("BASIC", plan).unwrap();
    assert!(matches!(
        service.get_plan("BASIC"),
        Err(PricingError::NotFound { kind: EntityKind::Plan, .. })
    ));
    let free = service.get_plan("FREE").unwrap();
    assert_eq!(free.description.as_deref(), Some("Free forever"));
    assert_eq!(free.feature("maxPets").unwrap().effective_value(), &FeatureValue::from(2));
}
