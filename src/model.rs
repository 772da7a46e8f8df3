use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::types::{FeatureVector, Label};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("feature mapping has no column {0}")]
    MissingColumn(String),

    #[error("{what} has {found} entries, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("preprocessor scale for column {0} is zero")]
    ZeroScale(String),
}

/// Anything that maps a feature vector to a phishing/legitimate class.
pub trait Classifier: Send + Sync {
    /// Raw class: `0` is phishing, anything else legitimate.
    fn predict_class(&self, features: &FeatureVector) -> Result<i64, ModelError>;

    fn predict(&self, features: &FeatureVector) -> Result<Label, ModelError> {
        self.predict_class(features).map(Label::from_class)
    }
}

/// Standard-scaler transform fitted alongside the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    pub center: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Preprocessor {
    fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.center.iter().zip(&self.scale))
            .map(|(x, (center, scale))| (x - center) / scale)
            .collect()
    }
}

/// Serialized form of a fitted logistic model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub version: String,
    pub feature_order: Vec<String>,
    #[serde(default)]
    pub preprocessor: Option<Preprocessor>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

/// Feature values reordered into the model's column sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierRow(pub Vec<f64>);

impl ClassifierRow {
    pub fn from_mapping(
        mapping: &HashMap<String, f64>,
        columns: &[String],
    ) -> Result<Self, ModelError> {
        columns
            .iter()
            .map(|column| {
                mapping
                    .get(column)
                    .copied()
                    .ok_or_else(|| ModelError::MissingColumn(column.clone()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ClassifierRow)
    }
}

/// Preprocessor plus logistic model, loaded once at startup.
#[derive(Debug, Clone)]
pub struct NetworkModel {
    spec: ModelSpec,
}

impl NetworkModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let model = Self::from_spec(serde_json::from_str(&data)?)?;
        debug!("Parsed {} ({} columns)", path.display(), model.spec.feature_order.len());
        Ok(model)
    }

    pub fn from_spec(spec: ModelSpec) -> Result<Self, ModelError> {
        let columns = spec.feature_order.len();
        check_len("coefficients", columns, spec.coefficients.len())?;

        if let Some(pre) = &spec.preprocessor {
            check_len("preprocessor center", columns, pre.center.len())?;
            check_len("preprocessor scale", columns, pre.scale.len())?;
            if let Some(i) = pre.scale.iter().position(|s| *s == 0.0) {
                return Err(ModelError::ZeroScale(spec.feature_order[i].clone()));
            }
        }

        Ok(Self { spec })
    }

    pub fn version(&self) -> &str {
        &self.spec.version
    }

    /// Probability of the legitimate class.
    pub fn probability(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let row = ClassifierRow::from_mapping(&features.to_map(), &self.spec.feature_order)?;
        let x = match &self.spec.preprocessor {
            Some(pre) => pre.transform(&row.0),
            None => row.0,
        };

        let z = self.spec.intercept
            + x.iter()
                .zip(&self.spec.coefficients)
                .map(|(value, weight)| value * weight)
                .sum::<f64>();

        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

impl Classifier for NetworkModel {
    fn predict_class(&self, features: &FeatureVector) -> Result<i64, ModelError> {
        let p = self.probability(features)?;
        debug!("Model {} legitimate probability {:.3}", self.spec.version, p);
        Ok(if p >= 0.5 { 1 } else { 0 })
    }
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), ModelError> {
    if expected == found {
        Ok(())
    } else {
        Err(ModelError::DimensionMismatch { what, expected, found })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ContentFeatures, LexicalFeatures, RegistrationFeatures, TriState, FEATURE_COLUMNS,
    };

    fn columns() -> Vec<String> {
        FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn features(value: TriState) -> FeatureVector {
        let lexical = LexicalFeatures {
            having_ip_address: value,
            url_length: value,
            shortening_service: value,
            having_at_symbol: value,
            double_slash_redirecting: value,
            prefix_suffix: value,
            having_sub_domain: value,
            ssl_final_state: value,
            port: value,
            https_token: value,
            abnormal_url: value,
        };
        let registration = RegistrationFeatures {
            domain_registration_length: value,
            age_of_domain: value,
        };
        let content = ContentFeatures {
            request_url: value,
            url_of_anchor: value,
            links_in_tags: value,
            sfh: value,
            submitting_to_email: value,
            redirect: value,
            on_mouseover: value,
            right_click: value,
            popup_window: value,
            iframe: value,
        };
        FeatureVector::assemble(lexical, registration, content, value)
    }

    fn uniform_model() -> NetworkModel {
        NetworkModel::from_spec(ModelSpec {
            version: "test".to_string(),
            feature_order: columns(),
            preprocessor: None,
            intercept: 0.0,
            coefficients: vec![1.0; 30],
        })
        .unwrap()
    }

    #[test]
    fn test_legitimate_vector_predicts_legitimate() {
        let model = uniform_model();
        assert_eq!(model.predict(&features(TriState::Legitimate)).unwrap(), Label::Legitimate);
    }

    #[test]
    fn test_suspicious_vector_predicts_phishing() {
        let model = uniform_model();
        assert_eq!(model.predict_class(&features(TriState::Suspicious)).unwrap(), 0);
        assert_eq!(model.predict(&features(TriState::Suspicious)).unwrap(), Label::Phishing);
    }

    #[test]
    fn test_row_follows_model_column_order() {
        let mut mapping = HashMap::new();
        mapping.insert("a".to_string(), 1.0);
        mapping.insert("b".to_string(), -1.0);

        let order = ["b".to_string(), "a".to_string()];
        let row = ClassifierRow::from_mapping(&mapping, &order).unwrap();
        assert_eq!(row, ClassifierRow(vec![-1.0, 1.0]));
    }

    #[test]
    fn test_unknown_column_is_hard_error() {
        let mut order = columns();
        order[9] = "favicon_live".to_string();
        let model = NetworkModel::from_spec(ModelSpec {
            version: "test".to_string(),
            feature_order: order,
            preprocessor: None,
            intercept: 0.0,
            coefficients: vec![1.0; 30],
        })
        .unwrap();

        let err = model.predict(&features(TriState::Legitimate)).unwrap_err();
        assert!(matches!(err, ModelError::MissingColumn(c) if c == "favicon_live"));
    }

    #[test]
    fn test_rejects_mismatched_dimensions() {
        let err = NetworkModel::from_spec(ModelSpec {
            version: "test".to_string(),
            feature_order: columns(),
            preprocessor: None,
            intercept: 0.0,
            coefficients: vec![1.0; 29],
        })
        .unwrap_err();
        assert!(matches!(err, ModelError::DimensionMismatch { expected: 30, found: 29, .. }));
    }

    #[test]
    fn test_rejects_zero_scale() {
        let mut scale = vec![1.0; 30];
        scale[3] = 0.0;
        let err = NetworkModel::from_spec(ModelSpec {
            version: "test".to_string(),
            feature_order: columns(),
            preprocessor: Some(Preprocessor { center: vec![0.0; 30], scale }),
            intercept: 0.0,
            coefficients: vec![1.0; 30],
        })
        .unwrap_err();
        assert!(matches!(err, ModelError::ZeroScale(c) if c == "having_At_Symbol"));
    }

    #[test]
    fn test_preprocessor_is_applied() {
        let model = NetworkModel::from_spec(ModelSpec {
            version: "test".to_string(),
            feature_order: columns(),
            preprocessor: Some(Preprocessor { center: vec![1.0; 30], scale: vec![2.0; 30] }),
            intercept: 0.0,
            coefficients: vec![1.0; 30],
        })
        .unwrap();

        // Computed columns center to 0; the three neutral static defaults go negative.
        let p = model.probability(&features(TriState::Legitimate)).unwrap();
        assert!(p < 0.5);
    }

    #[test]
    fn test_model_file_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/example_model.json");
        let model = NetworkModel::load(path).unwrap();
        assert_eq!(model.version(), "placeholder");
        assert_eq!(model.spec.feature_order, columns());
        assert!(model.predict(&features(TriState::Legitimate)).is_ok());
    }
}
