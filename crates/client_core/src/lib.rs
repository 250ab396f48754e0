use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{OutputField, ParameterSet, PlotInput, PlotKind, SliderInputs},
    error::BackendErrorBody,
    protocol::{
        ConditionOutputs, CustomPlotQuery, PlotQuery, PlotResponse, PresetValues, SliderOutputs,
        APPLY_PRESET_PATH, CALCULATE_CONDITION_PATH, GENERATE_CUSTOM_PLOT_PATH,
        GENERATE_PLOT_PATH, PROCESS_PATH,
    },
};
use tracing::{debug, info};
use url::Url;

pub mod comparison;
pub mod error;
pub mod plots;
pub mod slider;
pub mod view;

pub use comparison::{
    ComparisonOutcome, ComparisonResult, ComparisonTable, ConditionComparisonController,
    PendingComparison,
};
pub use error::{ClientError, ClientErrorKind};

/// Calls the simulation backend exposes to the front end.
#[async_trait]
pub trait SimulationBackend: Send + Sync {
    async fn apply_preset(&self, condition: &str) -> Result<PresetValues, ClientError>;
    async fn calculate_condition_values(
        &self,
        params: &ParameterSet,
    ) -> Result<ConditionOutputs, ClientError>;
    async fn process_condition(
        &self,
        params: &ParameterSet,
    ) -> Result<ConditionOutputs, ClientError>;
    async fn process_slider(&self, inputs: &SliderInputs) -> Result<SliderOutputs, ClientError>;
    async fn generate_plot(&self, kind: PlotKind) -> Result<PlotResponse, ClientError>;
    async fn generate_custom_plot(
        &self,
        input1: PlotInput,
        input2: PlotInput,
        output: OutputField,
    ) -> Result<PlotResponse, ClientError>;
}

pub struct HttpSimulationBackend {
    http: Client,
    base_url: Url,
}

impl HttpSimulationBackend {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut parsed = Url::parse(base_url.trim()).map_err(|source| {
            ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                source,
            }
        })?;
        // Relative joins replace the last segment unless the path ends in '/'.
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|source| ClientError::Transport {
                endpoint: "client setup",
                source,
            })?;

        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint_url(&self, path: &'static str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                source,
            })
    }

    async fn get_json<Q, T>(&self, path: &'static str, query: &Q) -> Result<T, ClientError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint_url(path)?;
        debug!(endpoint = path, "GET");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: path,
                source,
            })?;
        decode_response(path, response).await
    }

    async fn post_json<B, T>(&self, path: &'static str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint_url(path)?;
        debug!(endpoint = path, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: path,
                source,
            })?;
        decode_response(path, response).await
    }
}

async fn decode_response<T: DeserializeOwned>(
    endpoint: &'static str,
    response: Response,
) -> Result<T, ClientError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| ClientError::Transport { endpoint, source })?;

    if !status.is_success() {
        let message = serde_json::from_str::<BackendErrorBody>(&body)
            .map(|body| body.error)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        return Err(ClientError::Status {
            endpoint,
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| ClientError::Malformed {
        endpoint,
        reason: e.to_string(),
    })
}

#[async_trait]
impl SimulationBackend for HttpSimulationBackend {
    async fn apply_preset(&self, condition: &str) -> Result<PresetValues, ClientError> {
        info!(condition, "requesting preset");
        self.get_json(APPLY_PRESET_PATH, &[("condition", condition)])
            .await
    }

    async fn calculate_condition_values(
        &self,
        params: &ParameterSet,
    ) -> Result<ConditionOutputs, ClientError> {
        self.post_json(CALCULATE_CONDITION_PATH, params).await
    }

    async fn process_condition(
        &self,
        params: &ParameterSet,
    ) -> Result<ConditionOutputs, ClientError> {
        self.post_json(PROCESS_PATH, params).await
    }

    async fn process_slider(&self, inputs: &SliderInputs) -> Result<SliderOutputs, ClientError> {
        self.post_json(PROCESS_PATH, inputs).await
    }

    async fn generate_plot(&self, kind: PlotKind) -> Result<PlotResponse, ClientError> {
        info!(plot_type = %kind, "requesting plot");
        self.get_json(GENERATE_PLOT_PATH, &PlotQuery { plot_type: kind })
            .await
    }

    async fn generate_custom_plot(
        &self,
        input1: PlotInput,
        input2: PlotInput,
        output: OutputField,
    ) -> Result<PlotResponse, ClientError> {
        info!(%input1, %input2, %output, "requesting custom plot");
        self.get_json(
            GENERATE_CUSTOM_PLOT_PATH,
            &CustomPlotQuery {
                input1,
                input2,
                output,
            },
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
