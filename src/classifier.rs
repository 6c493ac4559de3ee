//! Substance classifier: multinomial logistic regression over feature
//! vectors.
//!
//! The deployed scanner's model ends in a softmax layer and thresholds the
//! winning posterior; this classifier keeps exactly that output contract
//! (per-class posteriors, argmax label, confidence in [0, 1]) with a
//! deterministic, dependency-light training rule: full-batch gradient
//! descent from zero initialization, so `fit` on the same data always
//! produces the same parameters.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};
use crate::features::FeatureVector;

// ---------------------------------------------------------------------------
// Training configuration
// ---------------------------------------------------------------------------

/// Gradient-descent hyperparameters. Persisted with the model so a retrain
/// from the same data reproduces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    /// L2 weight penalty; keeps posteriors calibrated instead of saturating.
    pub l2: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        // Step size sized for full-spectrum features (a few hundred
        // unit-variance dimensions); larger steps can oscillate.
        TrainConfig {
            learning_rate: 0.01,
            epochs: 1000,
            l2: 1e-3,
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// A trained model mapping a feature vector to a label and a posterior
/// confidence.
///
/// Constructed only by [`Classifier::fit`]; parameters and the label
/// vocabulary are immutable afterwards except via retraining (which builds
/// a fresh instance to be swapped in atomically by the caller).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    /// Label vocabulary in first-seen order at fit time.
    labels: Vec<String>,
    /// One weight row per class, `input_len` columns each.
    weights: Vec<Vec<f64>>,
    /// One bias per class.
    bias: Vec<f64>,
    /// Feature-vector length fixed at fit time.
    input_len: usize,
    config: TrainConfig,
}

impl Classifier {
    /// Train on a labelled feature set.
    ///
    /// The label vocabulary is the distinct labels in **first-seen order**.
    /// Fails with [`SpectraError::InsufficientTrainingData`] when fewer
    /// than 2 distinct labels are present, when feature lengths are ragged,
    /// or when `features` and `labels` disagree in count.
    pub fn fit(
        features: &[FeatureVector],
        labels: &[String],
        config: TrainConfig,
    ) -> Result<Self> {
        if features.is_empty() {
            return Err(SpectraError::InsufficientTrainingData(
                "empty training set".into(),
            ));
        }
        if features.len() != labels.len() {
            return Err(SpectraError::InsufficientTrainingData(format!(
                "{} feature vectors but {} labels",
                features.len(),
                labels.len()
            )));
        }

        let input_len = features[0].len();
        for (i, f) in features.iter().enumerate() {
            if f.len() != input_len {
                return Err(SpectraError::InsufficientTrainingData(format!(
                    "feature vector {i} has length {}, expected {input_len}",
                    f.len()
                )));
            }
            if let Some(j) = f.iter().position(|v| !v.is_finite()) {
                return Err(SpectraError::NonFinite {
                    context: "training features",
                    index: j,
                });
            }
        }
        if input_len == 0 {
            return Err(SpectraError::InsufficientTrainingData(
                "zero-length feature vectors".into(),
            ));
        }

        // Vocabulary in first-seen order.
        let mut vocab: Vec<String> = Vec::new();
        let class_ids: Vec<usize> = labels
            .iter()
            .map(|l| {
                if let Some(k) = vocab.iter().position(|v| v == l) {
                    k
                } else {
                    vocab.push(l.clone());
                    vocab.len() - 1
                }
            })
            .collect();

        if vocab.len() < 2 {
            return Err(SpectraError::InsufficientTrainingData(format!(
                "need at least 2 distinct labels, got {}",
                vocab.len()
            )));
        }

        let (n, d, k) = (features.len(), input_len, vocab.len());
        log::info!("fitting classifier: {n} samples, {d} features, {k} classes");

        let x = DMatrix::from_fn(n, d, |i, j| features[i][j]);
        let y = DMatrix::from_fn(n, k, |i, j| if class_ids[i] == j { 1.0 } else { 0.0 });

        // Full-batch gradient descent from zero init: deterministic.
        let mut w = DMatrix::<f64>::zeros(k, d);
        let mut b = DMatrix::<f64>::zeros(1, k);
        let lr = config.learning_rate;
        let inv_n = 1.0 / n as f64;

        for _ in 0..config.epochs {
            // logits: n x k
            let mut logits = &x * w.transpose();
            for i in 0..n {
                for j in 0..k {
                    logits[(i, j)] += b[(0, j)];
                }
            }
            let probs = softmax_rows(&logits);
            let resid = &probs - &y;

            let grad_w = resid.transpose() * &x * inv_n + &w * config.l2;
            w -= grad_w * lr;
            for j in 0..k {
                let g: f64 = (0..n).map(|i| resid[(i, j)]).sum::<f64>() * inv_n;
                b[(0, j)] -= lr * g;
            }
        }

        Ok(Classifier {
            labels: vocab,
            weights: (0..k)
                .map(|j| (0..d).map(|c| w[(j, c)]).collect())
                .collect(),
            bias: (0..k).map(|j| b[(0, j)]).collect(),
            input_len,
            config,
        })
    }

    /// The label vocabulary fixed at fit time, in first-seen order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Feature-vector length this model was trained on.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Per-class posterior probabilities for one feature vector, ordered
    /// like [`Classifier::labels`].
    pub fn posteriors(&self, feature: &FeatureVector) -> Result<Vec<f64>> {
        if feature.len() != self.input_len {
            return Err(SpectraError::DimensionMismatch {
                expected: self.input_len,
                actual: feature.len(),
            });
        }
        if let Some(j) = feature.iter().position(|v| !v.is_finite()) {
            return Err(SpectraError::NonFinite {
                context: "feature vector",
                index: j,
            });
        }

        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(feature).map(|(w, f)| w * f).sum::<f64>() + b)
            .collect();
        Ok(softmax(&logits))
    }

    /// Predict the most probable label and its posterior confidence.
    ///
    /// The classifier never maps to `UNKNOWN` itself; thresholding is the
    /// inference service's policy.
    pub fn predict(&self, feature: &FeatureVector) -> Result<(String, f64)> {
        let probs = self.posteriors(feature)?;
        let (idx, &conf) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap_or((0, &0.0));
        Ok((self.labels[idx].clone(), conf))
    }

    /// Serialize the full parameter state and vocabulary to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| SpectraError::Configuration(format!("classifier serialization: {e}")))
    }

    /// Rebuild a classifier from [`Classifier::to_json`] output. The
    /// deserialized model predicts identically to the original.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SpectraError::Configuration(format!("classifier deserialization: {e}")))
    }
}

/// Numerically stable softmax (max-shifted before exponentiation).
fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn softmax_rows(logits: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = logits.clone();
    for mut row in out.row_iter_mut() {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        for v in row.iter_mut() {
            *v = (*v - max).exp();
            sum += *v;
        }
        for v in row.iter_mut() {
            *v /= sum;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_class_set() -> (Vec<FeatureVector>, Vec<String>) {
        // Class A clusters near (1, 0), class B near (0, 1).
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..10 {
            let t = i as f64 * 0.02;
            features.push(vec![1.0 + t, t]);
            labels.push("A".to_string());
            features.push(vec![t, 1.0 + t]);
            labels.push("B".to_string());
        }
        (features, labels)
    }

    #[test]
    fn fit_then_predict_recovers_training_label() {
        let (features, labels) = two_class_set();
        let model = Classifier::fit(&features, &labels, TrainConfig::default()).unwrap();
        let (label, conf) = model.predict(&features[0]).unwrap();
        assert_eq!(label, "A");
        assert!(conf >= 0.5, "confidence {conf}");
        let (label, _) = model.predict(&features[1]).unwrap();
        assert_eq!(label, "B");
    }

    #[test]
    fn vocabulary_is_first_seen_order() {
        let (features, labels) = two_class_set();
        let model = Classifier::fit(&features, &labels, TrainConfig::default()).unwrap();
        assert_eq!(model.labels(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn posteriors_sum_to_one() {
        let (features, labels) = two_class_set();
        let model = Classifier::fit(&features, &labels, TrainConfig::default()).unwrap();
        let p = model.posteriors(&vec![0.5, 0.5]).unwrap();
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_class_rejected() {
        let features = vec![vec![1.0], vec![2.0]];
        let labels = vec!["A".to_string(), "A".to_string()];
        let err = Classifier::fit(&features, &labels, TrainConfig::default()).unwrap_err();
        assert!(matches!(err, SpectraError::InsufficientTrainingData(_)));
    }

    #[test]
    fn ragged_features_rejected() {
        let features = vec![vec![1.0, 2.0], vec![3.0]];
        let labels = vec!["A".to_string(), "B".to_string()];
        let err = Classifier::fit(&features, &labels, TrainConfig::default()).unwrap_err();
        assert!(matches!(err, SpectraError::InsufficientTrainingData(_)));
    }

    #[test]
    fn wrong_length_prediction_is_dimension_mismatch() {
        let (features, labels) = two_class_set();
        let model = Classifier::fit(&features, &labels, TrainConfig::default()).unwrap();
        let err = model.predict(&vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            SpectraError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn serde_round_trip_predicts_identically() {
        let (features, labels) = two_class_set();
        let model = Classifier::fit(&features, &labels, TrainConfig::default()).unwrap();
        let restored = Classifier::from_json(&model.to_json().unwrap()).unwrap();

        for f in &features {
            let a = model.posteriors(f).unwrap();
            let b = restored.posteriors(f).unwrap();
            assert_eq!(a, b, "posteriors diverged after round trip");
        }
    }
}
