use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::api::{self, ApiResponse};
use crate::metrics::LabelledRecord;
use crate::service::ClinicService;

#[derive(Parser, Debug)]
#[command(name = "clinic-assist")]
#[command(version)]
#[command(about = "Disease and outcome-risk inference with classifier diagnostics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml plus the $CLINIC_ENV overlay)
    #[arg(short, long, default_value = "config", env = "CLINIC_CONFIG_DIR")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank the most likely diseases for a patient record
    PredictDisease {
        /// JSON record file, or "-" for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },
    /// Classify outcome risk for a patient record
    PredictOutcome {
        /// JSON record file, or "-" for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },
    /// Show disease-model feature importance
    FeatureImportance,
    /// ROC curve and AUC from {"y_true", "y_prob"}
    Roc {
        #[arg(short, long, default_value = "-")]
        input: String,
    },
    /// Confusion matrix from {"y_true", "y_pred"}
    ConfusionMatrix {
        #[arg(short, long, default_value = "-")]
        input: String,
    },
    /// Evaluate the outcome model on a labelled dataset and export artifacts
    Evaluate {
        /// JSON array of {"record": {...}, "label": 0|1}
        #[arg(short, long)]
        dataset: PathBuf,
        /// Directory for the exported JSON artifacts
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

/// Read a JSON document from a file, or stdin for "-".
pub fn read_json(input: &str) -> Result<Value> {
    let text = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read JSON from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))?
    };
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {input}"))
}

fn evaluate(service: &ClinicService, dataset: &Path, out_dir: &Path) -> Result<ApiResponse> {
    let text = std::fs::read_to_string(dataset)
        .with_context(|| format!("Failed to read dataset {}", dataset.display()))?;
    let samples: Vec<LabelledRecord> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid dataset {}", dataset.display()))?;

    let result = service.evaluate(&samples).and_then(|report| {
        let written: Vec<String> = report
            .write_artifacts(out_dir)?
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        Ok(json!({
            "samples": report.samples,
            "auc": report.roc.auc,
            "artifacts": written,
        }))
    });
    Ok(result.into())
}

/// Execute one command against the service.
pub fn run(service: &ClinicService, command: &Commands) -> Result<ApiResponse> {
    let response = match command {
        Commands::PredictDisease { input } => api::predict_disease(service, &read_json(input)?),
        Commands::PredictOutcome { input } => api::predict_outcome(service, &read_json(input)?),
        Commands::FeatureImportance => api::feature_importance(service),
        Commands::Roc { input } => api::roc_data(service, &read_json(input)?),
        Commands::ConfusionMatrix { input } => api::confusion_matrix(service, &read_json(input)?),
        Commands::Evaluate { dataset, out_dir } => evaluate(service, dataset, out_dir)?,
    };
    Ok(response)
}
