//! Fitted classifiers loaded from JSON artifacts.
//!
//! Models are pure CPU inference over a small dense feature vector. They are
//! immutable after load and shared across requests behind `Arc`.

pub mod classifier;
pub mod dense;
pub mod trees;

pub use classifier::{argmax, Classifier, ModelSpec};
pub use dense::{Activation, DenseLayer, DenseNetwork};
pub use trees::{Objective, TreeEnsemble, TreeNode};

#[cfg(test)]
pub use classifier::MockClassifier;
