use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    plots::{self, PlotContainer},
    slider,
    view::{ConditionsPage, SliderPage},
    ComparisonOutcome, ConditionComparisonController, HttpSimulationBackend,
};
use shared::domain::{OutputField, ParameterName, PlotInput, PlotKind, SliderInputs, SliderParameter};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "fontan-console", about = "Drive the Fontan circulation simulator backend")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Overrides the configured backend URL.
    #[arg(long)]
    backend_url: Option<String>,
    #[arg(long)]
    log_filter: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a clinical preset to the default conditions page.
    Preset {
        condition: String,
        #[arg(long)]
        html: bool,
    },
    /// Compare the adjusted inputs against their baseline.
    Compare {
        #[arg(long)]
        preset: Option<String>,
        #[command(flatten)]
        params: ConditionArgs,
        #[arg(long)]
        html: bool,
    },
    /// Run the slider page simulation; unset inputs keep their defaults.
    Slider {
        #[command(flatten)]
        inputs: SliderArgs,
        #[arg(long)]
        html: bool,
    },
    Plot {
        kind: PlotKind,
        #[arg(long)]
        out: PathBuf,
    },
    CustomPlot {
        input1: PlotInput,
        input2: PlotInput,
        output: OutputField,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct ConditionArgs {
    #[arg(long)]
    hr: Option<String>,
    #[arg(long)]
    uvr: Option<String>,
    #[arg(long)]
    lvr: Option<String>,
    #[arg(long)]
    pvr: Option<String>,
    #[arg(long = "s-sa")]
    s_sa: Option<String>,
    #[arg(long)]
    hb: Option<String>,
    #[arg(long)]
    cvo2u: Option<String>,
    #[arg(long)]
    cvo2l: Option<String>,
}

impl ConditionArgs {
    fn get(&self, name: ParameterName) -> Option<&str> {
        let value = match name {
            ParameterName::Hr => &self.hr,
            ParameterName::Uvr => &self.uvr,
            ParameterName::Lvr => &self.lvr,
            ParameterName::Pvr => &self.pvr,
            ParameterName::SSa => &self.s_sa,
            ParameterName::Hb => &self.hb,
            ParameterName::Cvo2u => &self.cvo2u,
            ParameterName::Cvo2l => &self.cvo2l,
        };
        value.as_deref()
    }
}

#[derive(Args, Debug, Default)]
struct SliderArgs {
    #[arg(long)]
    hr: Option<String>,
    #[arg(long)]
    c_sys: Option<String>,
    #[arg(long)]
    c_dia: Option<String>,
    #[arg(long)]
    c_a: Option<String>,
    #[arg(long)]
    c_v: Option<String>,
    #[arg(long)]
    r_s: Option<String>,
    #[arg(long)]
    r_p: Option<String>,
    #[arg(long)]
    v_total: Option<String>,
    #[arg(long)]
    hb: Option<String>,
    #[arg(long)]
    cvo2: Option<String>,
}

impl SliderArgs {
    fn get(&self, name: SliderParameter) -> Option<&str> {
        let value = match name {
            SliderParameter::Hr => &self.hr,
            SliderParameter::CSys => &self.c_sys,
            SliderParameter::CDia => &self.c_dia,
            SliderParameter::CA => &self.c_a,
            SliderParameter::CV => &self.c_v,
            SliderParameter::RS => &self.r_s,
            SliderParameter::RP => &self.r_p,
            SliderParameter::VTotal => &self.v_total,
            SliderParameter::Hb => &self.hb,
            SliderParameter::Cvo2 => &self.cvo2,
        };
        value.as_deref()
    }

    fn into_inputs(self) -> SliderInputs {
        let mut inputs = SliderInputs::defaults();
        for &name in SliderParameter::ALL {
            if let Some(value) = self.get(name) {
                inputs.set(name, value);
            }
        }
        inputs
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config)?;
    if let Some(url) = cli.backend_url {
        settings.backend_url = url;
    }
    if let Some(filter) = cli.log_filter {
        settings.log_filter = filter;
    }

    let filter =
        EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!(backend_url = %settings.backend_url, "using simulation backend");
    let backend =
        HttpSimulationBackend::with_timeout(&settings.backend_url, settings.request_timeout())?;

    match cli.command {
        Command::Preset { condition, html } => {
            let controller = ConditionComparisonController::new(backend);
            let mut page = ConditionsPage::default();
            let outcome = controller.apply_preset(&mut page, &condition).await;
            let updated = report_status(page.status(), outcome)?;
            if html {
                print!("{}{}", page.controls_html(), page.modal().to_html());
            } else {
                for name in updated {
                    if let Some(control) = page.control(name) {
                        println!("{} = {}", control.id(), control.value());
                    }
                }
                println!("\n{}", page.modal().text());
            }
        }
        Command::Compare {
            preset,
            params,
            html,
        } => {
            let controller = ConditionComparisonController::new(backend);
            let mut page = ConditionsPage::default();
            if let Some(condition) = preset {
                let outcome = controller.apply_preset(&mut page, &condition).await;
                report_status(page.status(), outcome)?;
                println!("{}\n", page.modal().text());
                page.modal_mut().close();
            }
            for &name in ParameterName::ALL {
                if let Some(value) = params.get(name) {
                    page.set_control(name, value)?;
                }
            }

            let outcome = controller.run_comparison(&mut page).await;
            match report_status(page.status(), outcome)? {
                ComparisonOutcome::Rendered(table) if html => print!("{}", table.to_html()),
                ComparisonOutcome::Rendered(table) => print!("{table}"),
                ComparisonOutcome::Stale => println!("comparison superseded by a newer request"),
            }
        }
        Command::Slider { inputs, html } => {
            let mut page = SliderPage::new(inputs.into_inputs());
            let outcome = slider::run_slider(&backend, &mut page).await;
            report_status(page.status(), outcome)?;
            if let Some(table) = page.results().content() {
                if html {
                    print!("{}", table.to_html());
                } else {
                    print!("{table}");
                }
            }
        }
        Command::Plot { kind, out } => {
            let mut container = PlotContainer::default();
            plots::display_plot(&backend, &mut container, kind).await?;
            write_plot(&container, &out).await?;
        }
        Command::CustomPlot {
            input1,
            input2,
            output,
            out,
        } => {
            let mut container = PlotContainer::default();
            plots::display_custom_plot(&backend, &mut container, input1, input2, output).await?;
            write_plot(&container, &out).await?;
        }
    }

    Ok(())
}

/// Echoes the page's status line to stderr before surfacing a failure.
fn report_status<T>(
    status: Option<&str>,
    outcome: Result<T, client_core::ClientError>,
) -> Result<T> {
    if outcome.is_err() {
        if let Some(status) = status {
            eprintln!("{status}");
        }
    }
    Ok(outcome?)
}

async fn write_plot(container: &PlotContainer, out: &Path) -> Result<()> {
    let image = container
        .image()
        .context("plot container holds no image")?;
    tokio::fs::write(out, image.png())
        .await
        .with_context(|| format!("failed to write plot to '{}'", out.display()))?;
    println!("wrote {} bytes to {}", image.png().len(), out.display());
    Ok(())
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;
