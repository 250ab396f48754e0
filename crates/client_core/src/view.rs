//! Typed page models standing in for the browser DOM.
//!
//! Each page is constructed once with its fixed element ids and handed to the
//! controllers by reference; nothing else looks elements up by id.

use std::collections::BTreeMap;

use shared::domain::{ParameterName, ParameterSet, SliderInputs};

use crate::{comparison::ComparisonTable, error::ClientError, slider::SliderTable};

pub const RESULTS_CONTAINER_ID: &str = "conditionResults";
pub const SLIDER_RESULTS_ID: &str = "sliderResults";
pub const MODAL_ID: &str = "confirmation-modal";
pub const MODAL_TEXT_ID: &str = "modal-text";
pub const MODAL_CLOSE_ID: &str = "modal-close";

/// An input control and its mirrored `<id>Value` label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    name: ParameterName,
    value: String,
    label: String,
}

impl Control {
    pub fn new(name: ParameterName, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name,
            label: value.clone(),
            value,
        }
    }

    pub fn id(&self) -> &'static str {
        self.name.as_str()
    }

    pub fn label_id(&self) -> String {
        self.name.label_id()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn set(&mut self, value: &str) {
        self.value = value.to_string();
        self.label = value.to_string();
    }

    pub fn to_html(&self) -> String {
        format!(
            "<input type=\"range\" id=\"{id}\" value=\"{value}\"> <span id=\"{label_id}\">{label}</span>",
            id = self.id(),
            value = escape_html(&self.value),
            label_id = self.label_id(),
            label = escape_html(&self.label),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modal {
    visible: bool,
    text: String,
}

impl Modal {
    pub fn open(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.visible = true;
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn to_html(&self) -> String {
        let display = if self.visible { "block" } else { "none" };
        format!(
            "<div id=\"{MODAL_ID}\" class=\"modal\" style=\"display: {display};\">\n    <div class=\"modal-content\">\n        <span id=\"{MODAL_CLOSE_ID}\" class=\"close\">&times;</span>\n        <p id=\"{MODAL_TEXT_ID}\">{}</p>\n    </div>\n</div>\n",
            escape_html(&self.text)
        )
    }
}

/// Hidden until something is rendered into it; keeps the last rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsContainer<T> {
    id: &'static str,
    visible: bool,
    content: Option<T>,
}

impl<T> ResultsContainer<T> {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            visible: false,
            content: None,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn render(&mut self, content: T) {
        self.content = Some(content);
        self.visible = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn content(&self) -> Option<&T> {
        self.content.as_ref()
    }
}

/// The conditions page: eight controls, results table, confirmation modal.
#[derive(Debug, Clone)]
pub struct ConditionsPage {
    controls: BTreeMap<ParameterName, Control>,
    results: ResultsContainer<ComparisonTable>,
    modal: Modal,
    status: Option<String>,
}

impl Default for ConditionsPage {
    fn default() -> Self {
        Self::with_values(&ParameterSet::defaults())
    }
}

impl ConditionsPage {
    pub fn with_values(values: &ParameterSet) -> Self {
        Self::with_controls(values.iter())
    }

    /// Page carrying only the given controls; missing ones behave like absent elements.
    pub fn with_controls<'a, I>(controls: I) -> Self
    where
        I: IntoIterator<Item = (ParameterName, &'a str)>,
    {
        Self {
            controls: controls
                .into_iter()
                .map(|(name, value)| (name, Control::new(name, value)))
                .collect(),
            results: ResultsContainer::new(RESULTS_CONTAINER_ID),
            modal: Modal::default(),
            status: None,
        }
    }

    pub fn control(&self, name: ParameterName) -> Option<&Control> {
        self.controls.get(&name)
    }

    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.controls.values()
    }

    /// One `<input>`/label pair per control, in display order.
    pub fn controls_html(&self) -> String {
        self.controls()
            .map(|control| format!("{}\n", control.to_html()))
            .collect()
    }

    /// Looks a control up by element id, as preset responses address them.
    pub fn control_by_id(&self, id: &str) -> Option<&Control> {
        id.parse::<ParameterName>()
            .ok()
            .and_then(|name| self.controls.get(&name))
    }

    pub fn set_control(&mut self, name: ParameterName, value: &str) -> Result<(), ClientError> {
        let control = self
            .controls
            .get_mut(&name)
            .ok_or_else(|| ClientError::MissingControl(name.as_str().to_string()))?;
        control.set(value);
        Ok(())
    }

    /// Snapshot of all eight controls, as submitted.
    pub fn read_parameters(&self) -> Result<ParameterSet, ClientError> {
        ParameterSet::try_from_lookup(|name| {
            self.controls
                .get(&name)
                .map(|control| control.value().to_string())
        })
        .map_err(|missing| ClientError::MissingControl(missing.as_str().to_string()))
    }

    pub fn results(&self) -> &ResultsContainer<ComparisonTable> {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut ResultsContainer<ComparisonTable> {
        &mut self.results
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn modal_mut(&mut self) -> &mut Modal {
        &mut self.modal
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }
}

/// The slider page: ten inputs and a single-column results table.
#[derive(Debug, Clone)]
pub struct SliderPage {
    inputs: SliderInputs,
    results: ResultsContainer<SliderTable>,
    status: Option<String>,
}

impl SliderPage {
    pub fn new(inputs: SliderInputs) -> Self {
        Self {
            inputs,
            results: ResultsContainer::new(SLIDER_RESULTS_ID),
            status: None,
        }
    }

    pub fn inputs(&self) -> &SliderInputs {
        &self.inputs
    }

    pub fn results(&self) -> &ResultsContainer<SliderTable> {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut ResultsContainer<SliderTable> {
        &mut self.results
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
