//! Loading bundle artifacts from disk and running them through the service.

use clinic_assist::config::{AppConfig, ModelsConfig};
use clinic_assist::metrics::report::{CONFUSION_FILE, IMPORTANCE_FILE, ROC_FILE};
use clinic_assist::{
    ClinicError, ClinicService, LabelledRecord, ModelBundle, ModelRegistry, Record, RiskLabel, Task,
    Vectorizer,
};
use serde_json::{json, Value};
use std::path::PathBuf;

fn shipped(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models").join(name)
}

fn shipped_registry() -> ModelRegistry {
    ModelRegistry::load(&ModelsConfig {
        disease_path: shipped("disease_model.json"),
        outcome_path: shipped("outcome_model.json"),
    })
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

#[test]
fn shipped_bundles_load() {
    let registry = shipped_registry();
    let disease = registry.require(Task::Disease).unwrap();
    assert_eq!(disease.model().kind(), "tree_ensemble");
    assert_eq!(disease.labels().len(), 3);

    let outcome = registry.require(Task::Outcome).unwrap();
    assert_eq!(outcome.model().kind(), "dense");
    // trainer column order, projected from the canonical vector
    assert_eq!(outcome.alignment().map(|a| a.len()), Some(7));
}

#[test]
fn shipped_disease_model_ranks_a_distribution() {
    let service = ClinicService::new(shipped_registry(), Vectorizer::default(), 3);
    let ranked = service
        .predict_disease(&record(json!({"Fever": "Yes", "Fatigue": "Yes", "Age": 45})))
        .unwrap();
    assert_eq!(ranked.top3.len(), 3);
    assert_eq!(ranked.top3[0].disease, "Influenza");
    let total: f64 = ranked.top3.iter().map(|r| r.confidence).sum();
    assert!((total - 1.0).abs() < 1e-3);
}

#[test]
fn shipped_outcome_model_is_consistent() {
    let service = ClinicService::new(shipped_registry(), Vectorizer::default(), 3);
    let risk = service
        .predict_outcome(&record(json!({"Age": 70, "Blood Pressure": "High", "Fever": "yes"})))
        .unwrap();
    assert!((0.0..=1.0).contains(&risk.probability));
    assert_eq!(risk.risk == RiskLabel::High, risk.probability >= 0.5);
}

#[test]
fn shipped_importance_follows_split_gain() {
    let service = ClinicService::new(shipped_registry(), Vectorizer::default(), 3);
    let scores = service.feature_importance();
    assert_eq!(scores.len(), 8);
    assert_eq!(scores[0].feature, "Fever");
    assert_eq!(scores[0].importance, 0.372);
    assert_eq!(scores[5].importance, 0.0);
    let total: f64 = scores.iter().map(|s| s.importance).sum();
    assert!((total - 1.0).abs() < 1e-3);
}

#[test]
fn shipped_split_counts_line_up_with_declared_features() {
    let registry = shipped_registry();
    let disease = registry.require(Task::Disease).unwrap();
    let weights = disease.model().importance_by_weight().unwrap();
    assert!(!weights.is_empty());
    for name in weights.keys() {
        assert!(disease.features().contains(name), "undeclared feature {name}");
    }
    assert_eq!(weights.get("Fever"), Some(&2.0));
}

#[test]
fn service_from_config_uses_configured_paths() {
    let mut config = AppConfig::default();
    config.models.disease_path = shipped("disease_model.json");
    config.models.outcome_path = PathBuf::from("/nonexistent/outcome.json");

    let service = ClinicService::from_config(&config).unwrap();
    assert!(service.registry().is_loaded(Task::Disease));
    assert!(!service.registry().is_loaded(Task::Outcome));
    assert!(matches!(
        service.predict_outcome(&Record::new()),
        Err(ClinicError::ModelNotLoaded(Task::Outcome))
    ));
}

#[test]
fn schema_mismatch_is_reported_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{"model": {"kind": "random_forest"}, "labels": [], "features": []}"#,
    )
    .unwrap();
    assert!(ModelBundle::load(&path).is_none());
    assert!(ModelBundle::try_load(&path).is_err());
}

#[test]
fn evaluation_exports_artifacts() {
    let service = ClinicService::new(shipped_registry(), Vectorizer::default(), 3);
    let dataset: Vec<LabelledRecord> = serde_json::from_value(json!([
        {"record": {"Age": 25, "Fever": "No"}, "label": 0},
        {"record": {"Age": 30, "Blood Pressure": "Low"}, "label": 0},
        {"record": {"Age": 72, "Blood Pressure": "High", "Cholesterol": "High", "Fever": "Yes"}, "label": 1},
        {"record": {"Age": 65, "Difficulty Breathing": "Yes", "Cough": "Yes"}, "label": 1}
    ]))
    .unwrap();

    let report = service.evaluate(&dataset).unwrap();
    assert_eq!(report.samples, 4);
    assert!((0.0..=1.0).contains(&report.roc.auc));
    let cells: u64 = report.confusion.matrix.iter().flatten().sum();
    assert_eq!(cells, 4);
    assert_eq!(report.feature_importance.features.len(), 8);

    let dir = tempfile::tempdir().unwrap();
    report.write_artifacts(dir.path()).unwrap();
    for name in [IMPORTANCE_FILE, ROC_FILE, CONFUSION_FILE] {
        let text = std::fs::read_to_string(dir.path().join(name)).unwrap();
        let _: Value = serde_json::from_str(&text).unwrap();
    }
}
