use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownName;

/// Declares a closed enum whose variants travel over the wire under fixed names.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownName;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                match raw {
                    $($wire => Ok($name::$variant),)+
                    other => Err(UnknownName::new(stringify!($name), other)),
                }
            }
        }
    };
}

wire_enum!(
    /// Input controls on the conditions page, in display order.
    ParameterName {
        Hr => "HR",
        Uvr => "UVR",
        Lvr => "LVR",
        Pvr => "PVR",
        SSa => "S_sa",
        Hb => "Hb",
        Cvo2u => "CVO2u",
        Cvo2l => "CVO2l",
    }
);

wire_enum!(
    /// Outputs returned by the condition calculation.
    OutputField {
        QV => "Q_v",
        QU => "Q_u",
        QL => "Q_l",
        QP => "Q_p",
        PSa => "P_sa",
        PPa => "P_pa",
        PPv => "P_pv",
        Oer => "OER",
    }
);

wire_enum!(
    /// Slider inputs posted by the slider page.
    SliderParameter {
        Hr => "HR",
        CSys => "C_sys",
        CDia => "C_dia",
        CA => "C_A",
        CV => "C_V",
        RS => "R_s",
        RP => "R_p",
        VTotal => "V_total",
        Hb => "Hb",
        Cvo2 => "CVO2",
    }
);

wire_enum!(
    /// Axes the custom heatmap can sweep: the eight condition inputs plus the
    /// five compliances the backend keeps fixed otherwise.
    PlotInput {
        Hr => "HR",
        Uvr => "UVR",
        Lvr => "LVR",
        Pvr => "PVR",
        SSa => "S_sa",
        Hb => "Hb",
        Cvo2u => "CVO2u",
        Cvo2l => "CVO2l",
        CD => "C_d",
        CS => "C_s",
        CSa => "C_sa",
        CPv => "C_pv",
        CPa => "C_pa",
    }
);

impl From<ParameterName> for PlotInput {
    fn from(name: ParameterName) -> Self {
        match name {
            ParameterName::Hr => PlotInput::Hr,
            ParameterName::Uvr => PlotInput::Uvr,
            ParameterName::Lvr => PlotInput::Lvr,
            ParameterName::Pvr => PlotInput::Pvr,
            ParameterName::SSa => PlotInput::SSa,
            ParameterName::Hb => PlotInput::Hb,
            ParameterName::Cvo2u => PlotInput::Cvo2u,
            ParameterName::Cvo2l => PlotInput::Cvo2l,
        }
    }
}

wire_enum!(
    /// Precomputed sensitivity plots served by `/generate_plot`.
    PlotKind {
        QS => "Q_s",
        QP => "Q_p",
        QTotal => "Q_total",
        PA => "P_a",
        PV => "P_v",
        SM => "S_m",
        SSv => "S_sv",
        Od2 => "OD2",
    }
);

wire_enum!(
    /// Clinical presets the backend knows how to apply.
    PresetCondition {
        LowPreload => "lowPreload",
        LungProblem => "lungProblem",
        HeartFailure => "heartFailure",
    }
);

impl ParameterName {
    /// Id of the text element that mirrors this control's value.
    pub fn label_id(self) -> String {
        format!("{}Value", self.as_str())
    }

    /// Value the conditions page starts with before any preset is applied.
    pub fn default_value(self) -> &'static str {
        match self {
            ParameterName::Hr => "100",
            ParameterName::Uvr => "45",
            ParameterName::Lvr => "35",
            ParameterName::Pvr => "10",
            ParameterName::SSa => "0.99",
            ParameterName::Hb => "15",
            ParameterName::Cvo2u => "70",
            ParameterName::Cvo2l => "50",
        }
    }
}

impl SliderParameter {
    /// Reference Norwood operating point the slider page starts from.
    pub fn default_value(self) -> &'static str {
        match self {
            SliderParameter::Hr => "140",
            SliderParameter::CSys => "1.4",
            SliderParameter::CDia => "6",
            SliderParameter::CA => "1.4",
            SliderParameter::CV => "6",
            SliderParameter::RS => "7.74",
            SliderParameter::RP => "0.34",
            SliderParameter::VTotal => "420",
            SliderParameter::Hb => "15",
            SliderParameter::Cvo2 => "150",
        }
    }
}

pub const GENERIC_PRESET_MESSAGE: &str = "Preset applied successfully!";

impl PresetCondition {
    pub fn message(self) -> &'static str {
        match self {
            PresetCondition::LowPreload => "Low Preload preset applied! Low preload refers to a reduced volume of blood returning to the heart, which limits the heart's ability to fill and pump effectively. This can occur due to hemorrhage, where blood is lost from the circulatory system; dehydration, which reduces overall intravascular volume; or obstruction, where physical barriers like tension pneumothorax or cardiac tamponade impede venous return. In each of these scenarios, the heart receives less blood during diastole, resulting in decreased stroke volume and cardiac output.",
            PresetCondition::LungProblem => "Lung Problem preset applied! Pulmonary diseases increase pulmonary vascular resistance, making it harder for blood to flow into the lungs. This reduces preload to the single ventricle, leading to decreased cardiac output. Even mild lung disease can have a major impact in Fontan patients due to their delicate hemodynamics.",
            PresetCondition::HeartFailure => "Heart Failure preset applied! In Fontan circulation, heart failure can develop due to the unique strain placed on the single functioning ventricle and the passive nature of pulmonary blood flow. Over time, the single ventricle may struggle to maintain adequate cardiac output. Ventricular dysfunction—whether systolic or diastolic—further compromises forward flow, leading to systemic congestion, exercise intolerance, and fatigue.",
        }
    }
}

/// A condition name as typed or clicked by the user.
///
/// Names that do not match a [`PresetCondition`] are still forwarded to the
/// backend, but only ever get the generic confirmation text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionName {
    Known(PresetCondition),
    Unrecognized(String),
}

impl ConditionName {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim();
        match normalized.parse::<PresetCondition>() {
            Ok(condition) => ConditionName::Known(condition),
            Err(_) => ConditionName::Unrecognized(normalized.to_string()),
        }
    }

    pub fn wire_name(&self) -> &str {
        match self {
            ConditionName::Known(condition) => condition.as_str(),
            ConditionName::Unrecognized(name) => name,
        }
    }

    pub fn modal_text(&self) -> &'static str {
        match self {
            ConditionName::Known(condition) => condition.message(),
            ConditionName::Unrecognized(_) => GENERIC_PRESET_MESSAGE,
        }
    }
}

/// Complete set of condition inputs, as the raw strings held by the controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<ParameterName, String>);

impl ParameterSet {
    /// Builds a set by asking `lookup` for every parameter; fails on the first gap.
    pub fn try_from_lookup<F>(mut lookup: F) -> Result<Self, ParameterName>
    where
        F: FnMut(ParameterName) -> Option<String>,
    {
        let mut values = BTreeMap::new();
        for &name in ParameterName::ALL {
            let value = lookup(name).ok_or(name)?;
            values.insert(name, value);
        }
        Ok(Self(values))
    }

    pub fn defaults() -> Self {
        Self(
            ParameterName::ALL
                .iter()
                .map(|&name| (name, name.default_value().to_string()))
                .collect(),
        )
    }

    pub fn get(&self, name: ParameterName) -> &str {
        self.0.get(&name).map(String::as_str).unwrap_or_default()
    }

    pub fn set(&mut self, name: ParameterName, value: impl Into<String>) {
        self.0.insert(name, value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterName, &str)> {
        self.0.iter().map(|(name, value)| (*name, value.as_str()))
    }
}

/// PVR value that marks the lung-problem scenario.
pub const PVR_OVERRIDE_SENTINEL: f64 = 27.0;
/// PVR the baseline run uses in place of the sentinel.
pub const PVR_BASELINE_OVERRIDE: &str = "10";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineLabel {
    Baseline,
    PvrOverride,
}

impl BaselineLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            BaselineLabel::Baseline => "Baseline",
            BaselineLabel::PvrOverride => "Baseline (PVR=10)",
        }
    }
}

impl fmt::Display for BaselineLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives the comparison reference from the user's adjusted inputs.
///
/// The baseline is an exact copy unless PVR is numerically 27, in which case
/// PVR is reset to 10.
pub fn derive_baseline(adjusted: &ParameterSet) -> (ParameterSet, BaselineLabel) {
    let mut baseline = adjusted.clone();
    let pvr = adjusted.get(ParameterName::Pvr).trim().parse::<f64>().ok();
    if pvr == Some(PVR_OVERRIDE_SENTINEL) {
        baseline.set(ParameterName::Pvr, PVR_BASELINE_OVERRIDE);
        return (baseline, BaselineLabel::PvrOverride);
    }
    (baseline, BaselineLabel::Baseline)
}

/// Slider page inputs, all ten required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliderInputs(BTreeMap<SliderParameter, String>);

impl SliderInputs {
    pub fn try_from_lookup<F>(mut lookup: F) -> Result<Self, SliderParameter>
    where
        F: FnMut(SliderParameter) -> Option<String>,
    {
        let mut values = BTreeMap::new();
        for &name in SliderParameter::ALL {
            let value = lookup(name).ok_or(name)?;
            values.insert(name, value);
        }
        Ok(Self(values))
    }

    pub fn defaults() -> Self {
        Self(
            SliderParameter::ALL
                .iter()
                .map(|&name| (name, name.default_value().to_string()))
                .collect(),
        )
    }

    pub fn get(&self, name: SliderParameter) -> &str {
        self.0.get(&name).map(String::as_str).unwrap_or_default()
    }

    pub fn set(&mut self, name: SliderParameter, value: impl Into<String>) {
        self.0.insert(name, value.into());
    }
}
