//! Slider page: one `/process` call rendered as a single-column table.

use std::fmt;

use shared::protocol::SliderOutputs;
use tracing::{info, warn};

use crate::{error::ClientError, view::SliderPage, SimulationBackend};

#[derive(Debug, Clone, PartialEq)]
pub struct SliderRow {
    pub name: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliderTable {
    rows: Vec<SliderRow>,
}

impl SliderTable {
    pub fn new(outputs: &SliderOutputs) -> Self {
        let rows = [
            ("Systemic flow", outputs.q_s),
            ("Pulmonary flow", outputs.q_p),
            ("Arterial pressure", outputs.p_a),
            ("Venous pressure", outputs.p_v),
            ("Mixed oxygen saturation", outputs.s_m),
            ("Systemic venous saturation", outputs.s_sv),
            ("Oxygen delivery", outputs.od2),
        ]
        .into_iter()
        .map(|(name, value)| SliderRow { name, value })
        .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[SliderRow] {
        &self.rows
    }

    pub fn to_html(&self) -> String {
        let body: String = self
            .rows
            .iter()
            .map(|row| {
                format!(
                    "                <tr><td>{}</td><td>{}</td></tr>\n",
                    row.name, row.value
                )
            })
            .collect();
        format!(
            "<div class=\"card results-card\">\n    <table class=\"results-table\">\n        <thead>\n            <tr>\n                <th>Output Parameter</th>\n                <th>Value</th>\n            </tr>\n        </thead>\n        <tbody>\n{body}        </tbody>\n    </table>\n</div>\n"
        )
    }
}

impl fmt::Display for SliderTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<28} {:>12}", "Output Parameter", "Value")?;
        for row in &self.rows {
            writeln!(f, "{:<28} {:>12}", row.name, row.value)?;
        }
        Ok(())
    }
}

/// Posts the slider inputs and renders the outputs into the page.
pub async fn run_slider<B>(backend: &B, page: &mut SliderPage) -> Result<(), ClientError>
where
    B: SimulationBackend + ?Sized,
{
    match backend.process_slider(page.inputs()).await {
        Ok(outputs) => {
            page.results_mut().render(SliderTable::new(&outputs));
            page.clear_status();
            info!("slider simulation rendered");
            Ok(())
        }
        Err(error) => {
            warn!(%error, "slider simulation failed");
            page.set_status(error.user_message());
            Err(error)
        }
    }
}
