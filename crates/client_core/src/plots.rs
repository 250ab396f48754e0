//! Plot page: fetches server-rendered PNGs and shows them or an error line.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{
    domain::{OutputField, PlotInput, PlotKind},
    protocol::{PlotResponse, GENERATE_CUSTOM_PLOT_PATH, GENERATE_PLOT_PATH},
};
use tracing::{info, warn};

use crate::{error::ClientError, SimulationBackend};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotImage {
    png: Vec<u8>,
    encoded: String,
}

impl PlotImage {
    pub fn decode(endpoint: &'static str, response: PlotResponse) -> Result<Self, ClientError> {
        let png = STANDARD
            .decode(response.plot.trim())
            .map_err(|e| ClientError::Malformed {
                endpoint,
                reason: format!("invalid base64 plot payload: {e}"),
            })?;
        if !png.starts_with(PNG_SIGNATURE) {
            return Err(ClientError::Malformed {
                endpoint,
                reason: "plot payload is not a PNG image".to_string(),
            });
        }
        Ok(Self {
            png,
            encoded: response.plot.trim().to_string(),
        })
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn to_html(&self, alt: &str) -> String {
        format!(
            "<img src=\"data:image/png;base64,{}\" alt=\"{alt}\">",
            self.encoded
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PlotContainer {
    #[default]
    Empty,
    Image(PlotImage),
    Error(&'static str),
}

impl PlotContainer {
    pub fn image(&self) -> Option<&PlotImage> {
        match self {
            PlotContainer::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn to_html(&self, alt: &str) -> String {
        match self {
            PlotContainer::Empty => String::new(),
            PlotContainer::Image(image) => image.to_html(alt),
            PlotContainer::Error(message) => format!("<p style=\"color: red;\">{message}</p>"),
        }
    }
}

pub const PLOT_ERROR_TEXT: &str = "Error displaying plot.";
pub const CUSTOM_PLOT_ERROR_TEXT: &str = "Error displaying custom plot.";

pub async fn display_plot<B>(
    backend: &B,
    container: &mut PlotContainer,
    kind: PlotKind,
) -> Result<(), ClientError>
where
    B: SimulationBackend + ?Sized,
{
    let result = backend
        .generate_plot(kind)
        .await
        .and_then(|response| PlotImage::decode(GENERATE_PLOT_PATH, response));
    settle_plot(container, result, PLOT_ERROR_TEXT)
}

pub async fn display_custom_plot<B>(
    backend: &B,
    container: &mut PlotContainer,
    input1: PlotInput,
    input2: PlotInput,
    output: OutputField,
) -> Result<(), ClientError>
where
    B: SimulationBackend + ?Sized,
{
    let result = backend
        .generate_custom_plot(input1, input2, output)
        .await
        .and_then(|response| PlotImage::decode(GENERATE_CUSTOM_PLOT_PATH, response));
    settle_plot(container, result, CUSTOM_PLOT_ERROR_TEXT)
}

fn settle_plot(
    container: &mut PlotContainer,
    result: Result<PlotImage, ClientError>,
    error_text: &'static str,
) -> Result<(), ClientError> {
    match result {
        Ok(image) => {
            info!(bytes = image.png().len(), "plot received");
            *container = PlotContainer::Image(image);
            Ok(())
        }
        Err(error) => {
            warn!(%error, "failed to display plot");
            *container = PlotContainer::Error(error_text);
            Err(error)
        }
    }
}
