//! Condition comparison: preset application, dual simulation, comparative table.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use futures::future::join;
use serde_json::Value;
use shared::{
    domain::{derive_baseline, BaselineLabel, ConditionName, OutputField, ParameterName, ParameterSet},
    protocol::ConditionOutputs,
};
use tracing::{debug, info, warn};

use crate::{error::ClientError, view::ConditionsPage, SimulationBackend};

/// Both simulation results of one comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonResult {
    pub adjusted: ConditionOutputs,
    pub baseline: ConditionOutputs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub field: OutputField,
    pub adjusted: f64,
    pub baseline: f64,
}

impl ComparisonRow {
    pub fn display_name(&self) -> &'static str {
        output_display_name(self.field)
    }
}

pub fn output_display_name(field: OutputField) -> &'static str {
    match field {
        OutputField::QV => "Cardiac Output (L/min)",
        OutputField::QU => "Blood Flow to Upper Body (L/min)",
        OutputField::QL => "Blood Flow to Lower Body (L/min)",
        OutputField::QP => "Pulmonary Blood Flow (L/min)",
        OutputField::PSa => "Systemic Artery Pressure (mmHg)",
        OutputField::PPa => "Fontan Pressure (mmHg)",
        OutputField::PPv => "Common Atrium Pressure (mmHg)",
        OutputField::Oer => "Oxygen Extraction Ratio",
    }
}

/// Rendered comparison: one row per output, adjusted then baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    baseline_label: BaselineLabel,
    rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    pub const ADJUSTED_HEADER: &'static str = "With Condition";

    pub fn new(result: &ComparisonResult, baseline_label: BaselineLabel) -> Self {
        let rows = OutputField::ALL
            .iter()
            .map(|&field| ComparisonRow {
                field,
                adjusted: result.adjusted.value(field),
                baseline: result.baseline.value(field),
            })
            .collect();
        Self {
            baseline_label,
            rows,
        }
    }

    pub fn baseline_label(&self) -> BaselineLabel {
        self.baseline_label
    }

    pub fn rows(&self) -> &[ComparisonRow] {
        &self.rows
    }

    pub fn to_html(&self) -> String {
        let mut body = String::new();
        for row in &self.rows {
            body.push_str(&format!(
                "                <tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                row.display_name(),
                row.adjusted,
                row.baseline
            ));
        }
        format!(
            "<div class=\"card results-card\">\n    <table class=\"results-table\">\n        <thead>\n            <tr>\n                <th>Parameter</th>\n                <th>{}</th>\n                <th>{}</th>\n            </tr>\n        </thead>\n        <tbody>\n{body}        </tbody>\n    </table>\n</div>\n",
            Self::ADJUSTED_HEADER,
            self.baseline_label
        )
    }
}

impl fmt::Display for ComparisonTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<34} {:>16} {:>20}",
            "Parameter",
            Self::ADJUSTED_HEADER,
            self.baseline_label.as_str()
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<34} {:>16} {:>20}",
                row.display_name(),
                row.adjusted,
                row.baseline
            )?;
        }
        Ok(())
    }
}

/// A submitted comparison waiting for both simulations.
#[derive(Debug, Clone)]
pub struct PendingComparison {
    token: u64,
    adjusted: ParameterSet,
    baseline: ParameterSet,
    baseline_label: BaselineLabel,
}

impl PendingComparison {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn adjusted(&self) -> &ParameterSet {
        &self.adjusted
    }

    pub fn baseline(&self) -> &ParameterSet {
        &self.baseline
    }

    pub fn baseline_label(&self) -> BaselineLabel {
        self.baseline_label
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonOutcome {
    Rendered(ComparisonTable),
    /// A newer comparison was submitted before this one settled.
    Stale,
}

pub struct ConditionComparisonController<B> {
    backend: B,
    latest_token: AtomicU64,
}

impl<B: SimulationBackend> ConditionComparisonController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            latest_token: AtomicU64::new(0),
        }
    }

    /// Fetches the preset, writes it into the page controls and opens the
    /// confirmation modal. Returns the controls that changed.
    pub async fn apply_preset(
        &self,
        page: &mut ConditionsPage,
        condition: &str,
    ) -> Result<Vec<ParameterName>, ClientError> {
        let condition = ConditionName::parse(condition);
        let values = match self.backend.apply_preset(condition.wire_name()).await {
            Ok(values) => values,
            Err(error) => {
                warn!(condition = condition.wire_name(), %error, "failed to apply preset");
                page.set_status(error.user_message());
                return Err(error);
            }
        };

        let mut updated = Vec::new();
        for (key, value) in &values {
            let Some(text) = scalar_text(value) else {
                debug!(key = key.as_str(), "skipping non-scalar preset entry");
                continue;
            };
            let Some(name) = key
                .parse::<ParameterName>()
                .ok()
                .filter(|name| page.control(*name).is_some())
            else {
                debug!(key = key.as_str(), "preset key has no matching control");
                continue;
            };
            page.set_control(name, &text)?;
            updated.push(name);
        }

        info!(
            condition = condition.wire_name(),
            updated = updated.len(),
            "preset applied"
        );
        page.clear_status();
        page.modal_mut().open(condition.modal_text());
        Ok(updated)
    }

    /// Snapshots the controls, derives the baseline and takes a fresh token.
    pub fn begin_comparison(
        &self,
        page: &ConditionsPage,
    ) -> Result<PendingComparison, ClientError> {
        let adjusted = page.read_parameters()?;
        let (baseline, baseline_label) = derive_baseline(&adjusted);
        let token = self.latest_token.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(token, baseline_label = baseline_label.as_str(), "comparison submitted");
        Ok(PendingComparison {
            token,
            adjusted,
            baseline,
            baseline_label,
        })
    }

    /// Runs both simulations concurrently and waits for both to settle.
    pub async fn fetch(&self, pending: &PendingComparison) -> Result<ComparisonResult, ClientError> {
        let (adjusted, baseline) = join(
            self.backend.calculate_condition_values(&pending.adjusted),
            self.backend.process_condition(&pending.baseline),
        )
        .await;
        match (adjusted, baseline) {
            (Ok(adjusted), Ok(baseline)) => Ok(ComparisonResult { adjusted, baseline }),
            (Err(error), Ok(_)) | (Ok(_), Err(error)) => Err(error),
            (Err(adjusted), Err(baseline)) => {
                warn!(token = pending.token, error = %baseline, "baseline simulation also failed");
                Err(adjusted)
            }
        }
    }

    /// Renders a settled comparison unless a newer one has been submitted since.
    pub fn settle(
        &self,
        page: &mut ConditionsPage,
        pending: &PendingComparison,
        result: Result<ComparisonResult, ClientError>,
    ) -> Result<ComparisonOutcome, ClientError> {
        let latest = self.latest_token.load(Ordering::SeqCst);
        if pending.token != latest {
            debug!(token = pending.token, latest, "discarding stale comparison");
            return Ok(ComparisonOutcome::Stale);
        }

        match result {
            Ok(result) => {
                let table = ComparisonTable::new(&result, pending.baseline_label);
                page.results_mut().render(table.clone());
                page.clear_status();
                info!(
                    token = pending.token,
                    baseline_label = pending.baseline_label.as_str(),
                    "comparison rendered"
                );
                Ok(ComparisonOutcome::Rendered(table))
            }
            Err(error) => {
                warn!(token = pending.token, %error, "comparison failed");
                page.set_status(error.user_message());
                Err(error)
            }
        }
    }

    pub async fn run_comparison(
        &self,
        page: &mut ConditionsPage,
    ) -> Result<ComparisonOutcome, ClientError> {
        let pending = match self.begin_comparison(page) {
            Ok(pending) => pending,
            Err(error) => {
                warn!(%error, "cannot read comparison inputs");
                page.set_status(error.user_message());
                return Err(error);
            }
        };
        let result = self.fetch(&pending).await;
        self.settle(page, &pending, result)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
#[path = "tests/comparison_tests.rs"]
mod tests;
