use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use super::types::{ConfusionRequest, RocRequest, RocResponse};
use super::ApiResponse;
use crate::error::{ClinicError, Result};
use crate::features::Record;
use crate::metrics::ClassLabel;
use crate::service::ClinicService;

/// Request body as an object; anything else counts as `{}`.
fn body_object(body: &Value) -> Record {
    match body {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

fn parse_body<T: DeserializeOwned>(body: &Value) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(body_object(body)))?)
}

/// Accept 0/1 as integers, whole floats or booleans.
fn parse_binary(index: usize, value: &Value) -> Result<u8> {
    let parsed = match value {
        Value::Bool(b) => Some(u8::from(*b)),
        Value::Number(n) => match n.as_f64() {
            Some(x) if x == 0.0 => Some(0),
            Some(x) if x == 1.0 => Some(1),
            _ => None,
        },
        _ => None,
    };
    parsed.ok_or_else(|| {
        ClinicError::InvalidInput(format!("y_true[{index}] must be 0 or 1, found {value}"))
    })
}

fn same_label_kind(labels: &[ClassLabel]) -> Result<()> {
    let ints = labels.iter().filter(|l| matches!(l, ClassLabel::Int(_))).count();
    if ints != 0 && ints != labels.len() {
        return Err(ClinicError::InvalidInput(
            "labels must be all integers or all strings".to_string(),
        ));
    }
    Ok(())
}

/// Disease prediction: record in, `{"top3": [...]}` out.
pub fn predict_disease(service: &ClinicService, body: &Value) -> ApiResponse {
    let record = body_object(body);
    debug!(fields = record.len(), "predict disease request");
    service.predict_disease(&record).into()
}

/// Outcome prediction: record in, `{"risk", "probability"}` out.
pub fn predict_outcome(service: &ClinicService, body: &Value) -> ApiResponse {
    let record = body_object(body);
    debug!(fields = record.len(), "predict outcome request");
    service.predict_outcome(&record).into()
}

/// Always succeeds; `[]` without a disease model.
pub fn feature_importance(service: &ClinicService) -> ApiResponse {
    ApiResponse::ok(&service.feature_importance())
}

/// `{"y_true", "y_prob"}` in, `{"fpr", "tpr", "auc"}` out.
pub fn roc_data(service: &ClinicService, body: &Value) -> ApiResponse {
    let result = parse_body::<RocRequest>(body).and_then(|req| {
        let y_true = req
            .y_true
            .iter()
            .enumerate()
            .map(|(i, v)| parse_binary(i, v))
            .collect::<Result<Vec<u8>>>()?;
        let roc = service.roc(&y_true, &req.y_prob)?;
        Ok(RocResponse {
            fpr: roc.fpr,
            tpr: roc.tpr,
            auc: roc.auc,
        })
    });
    result.into()
}

/// `{"y_true", "y_pred"}` in, the bare 2-D count matrix out.
pub fn confusion_matrix(service: &ClinicService, body: &Value) -> ApiResponse {
    let result = parse_body::<ConfusionRequest>(body).and_then(|req| {
        if req.y_true.is_empty() {
            return Err(ClinicError::InsufficientSamples {
                required: 1,
                actual: 0,
            });
        }
        let all: Vec<ClassLabel> = req.y_true.iter().chain(&req.y_pred).cloned().collect();
        same_label_kind(&all)?;
        Ok(service.confusion_matrix(&req.y_true, &req.y_pred)?.matrix)
    });
    result.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Vectorizer;
    use crate::ml::MockClassifier;
    use crate::registry::{ModelBundle, ModelRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn service_with_outcome() -> ClinicService {
        let mut mock = MockClassifier::new();
        mock.expect_input_dim().return_const(8usize);
        mock.expect_predict_proba()
            .returning(|_| Ok(vec![0.25, 0.75]));
        let outcome = ModelBundle::new(Arc::new(mock), Vec::new(), Vec::new());
        ClinicService::new(ModelRegistry::new(None, Some(outcome)), Vectorizer::default(), 3)
    }

    #[test]
    fn outcome_response_shape() {
        let resp = predict_outcome(&service_with_outcome(), &json!({"Fever": "yes"}));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!({"risk": "High Risk", "probability": 0.75}));
    }

    #[test]
    fn missing_model_is_500_with_error_body() {
        let resp = predict_disease(&service_with_outcome(), &json!({}));
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body["error"], json!("Disease model not loaded"));
    }

    #[test]
    fn non_object_body_counts_as_empty() {
        let resp = predict_outcome(&service_with_outcome(), &json!([1, 2, 3]));
        assert_eq!(resp.status, 200);
        let resp = roc_data(&ClinicService::default(), &Value::Null);
        assert_eq!(resp.status, 400);
    }

    #[test]
    fn importance_without_model_is_empty_list() {
        let resp = feature_importance(&ClinicService::default());
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!([]));
    }

    #[test]
    fn roc_response_shape() {
        let resp = roc_data(
            &ClinicService::default(),
            &json!({"y_true": [0, 0, true, 1.0], "y_prob": [0.1, 0.4, 0.35, 0.8]}),
        );
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["auc"], json!(0.75));
        assert_eq!(resp.body["fpr"], json!([0.0, 0.0, 0.5, 0.5, 1.0]));
        assert!(resp.body.get("thresholds").is_none());
    }

    #[test]
    fn roc_rejects_short_and_malformed_input() {
        let service = ClinicService::default();
        let resp = roc_data(&service, &json!({"y_true": [1], "y_prob": [0.3]}));
        assert_eq!(resp.status, 400);
        assert!(resp.body["error"].is_string());

        let resp = roc_data(&service, &json!({"y_true": [0, 2], "y_prob": [0.3, 0.4]}));
        assert_eq!(resp.status, 400);

        let resp = roc_data(&service, &json!({"y_true": [0, 1], "y_prob": ["a", 0.4]}));
        assert_eq!(resp.status, 400);
    }

    #[test]
    fn confusion_response_is_bare_matrix() {
        let resp = confusion_matrix(
            &ClinicService::default(),
            &json!({"y_true": [0, 1, 0, 1], "y_pred": [0, 1, 1, 1]}),
        );
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!([[1, 1], [0, 2]]));
    }

    #[test]
    fn confusion_accepts_class_names() {
        let resp = confusion_matrix(
            &ClinicService::default(),
            &json!({"y_true": ["Flu", "Cold"], "y_pred": ["Flu", "Flu"]}),
        );
        assert_eq!(resp.body, json!([[0, 1], [0, 1]]));
    }

    #[test]
    fn confusion_accepts_the_numeric_forms_roc_accepts() {
        let service = ClinicService::default();
        let floats = confusion_matrix(
            &service,
            &json!({"y_true": [0.0, 1.0, 1.0], "y_pred": [0.0, 1.0, 0.0]}),
        );
        assert_eq!(floats.status, 200);
        assert_eq!(floats.body, json!([[1, 0], [1, 1]]));

        let bools = confusion_matrix(
            &service,
            &json!({"y_true": [true, false, 1], "y_pred": [true, true, 1.0]}),
        );
        assert_eq!(bools.status, 200);
        assert_eq!(bools.body, json!([[0, 1], [0, 2]]));

        let fractional = confusion_matrix(&service, &json!({"y_true": [0.5], "y_pred": [0.5]}));
        assert_eq!(fractional.status, 400);
    }

    #[test]
    fn confusion_errors() {
        let service = ClinicService::default();
        let empty = confusion_matrix(&service, &json!({"y_true": [], "y_pred": []}));
        assert_eq!(empty.status, 400);

        let mixed = confusion_matrix(&service, &json!({"y_true": [0, "Flu"], "y_pred": [0, 0]}));
        assert_eq!(mixed.status, 400);

        let ragged = confusion_matrix(&service, &json!({"y_true": [0, 1], "y_pred": [0]}));
        assert_eq!(ragged.status, 400);
    }
}
