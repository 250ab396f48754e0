use serde::{Deserialize, Serialize};

use crate::domain::{OutputField, PlotInput, PlotKind};

pub const APPLY_PRESET_PATH: &str = "/apply_preset";
pub const PROCESS_PATH: &str = "/process";
pub const CALCULATE_CONDITION_PATH: &str = "/calculate_condition_values";
pub const GENERATE_PLOT_PATH: &str = "/generate_plot";
pub const GENERATE_CUSTOM_PLOT_PATH: &str = "/generate_custom_plot";

/// Raw `/apply_preset` body: control id to value, plus whatever else the backend adds.
pub type PresetValues = serde_json::Map<String, serde_json::Value>;

/// Result of one condition simulation. Fields the backend adds beyond these are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionOutputs {
    #[serde(rename = "Q_v")]
    pub q_v: f64,
    #[serde(rename = "Q_u")]
    pub q_u: f64,
    #[serde(rename = "Q_l")]
    pub q_l: f64,
    #[serde(rename = "Q_p")]
    pub q_p: f64,
    #[serde(rename = "P_sa")]
    pub p_sa: f64,
    #[serde(rename = "P_pa")]
    pub p_pa: f64,
    #[serde(rename = "P_pv")]
    pub p_pv: f64,
    #[serde(rename = "OER")]
    pub oer: f64,
}

impl ConditionOutputs {
    pub fn value(&self, field: OutputField) -> f64 {
        match field {
            OutputField::QV => self.q_v,
            OutputField::QU => self.q_u,
            OutputField::QL => self.q_l,
            OutputField::QP => self.q_p,
            OutputField::PSa => self.p_sa,
            OutputField::PPa => self.p_pa,
            OutputField::PPv => self.p_pv,
            OutputField::Oer => self.oer,
        }
    }
}

/// Result of the slider page simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderOutputs {
    #[serde(rename = "Q_s")]
    pub q_s: f64,
    #[serde(rename = "Q_p")]
    pub q_p: f64,
    #[serde(rename = "P_a")]
    pub p_a: f64,
    #[serde(rename = "P_v")]
    pub p_v: f64,
    #[serde(rename = "S_m")]
    pub s_m: f64,
    #[serde(rename = "S_sv")]
    pub s_sv: f64,
    #[serde(rename = "OD2")]
    pub od2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotQuery {
    pub plot_type: PlotKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPlotQuery {
    pub input1: PlotInput,
    pub input2: PlotInput,
    pub output: OutputField,
}

/// Base64-encoded PNG returned by both plot endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotResponse {
    pub plot: String,
}
