use super::*;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use shared::{
    domain::{PlotInput, PlotKind, PresetCondition, SliderInputs, GENERIC_PRESET_MESSAGE},
    protocol::{PlotResponse, PresetValues, SliderOutputs},
};
use tokio::{
    net::TcpListener,
    sync::{Barrier, Mutex},
};

use crate::HttpSimulationBackend;

const LOW_PRELOAD_TEXT: &str = "Low Preload preset applied! Low preload refers to a reduced volume of blood returning to the heart, which limits the heart's ability to fill and pump effectively. This can occur due to hemorrhage, where blood is lost from the circulatory system; dehydration, which reduces overall intravascular volume; or obstruction, where physical barriers like tension pneumothorax or cardiac tamponade impede venous return. In each of these scenarios, the heart receives less blood during diastole, resulting in decreased stroke volume and cardiac output.";
const LUNG_PROBLEM_TEXT: &str = "Lung Problem preset applied! Pulmonary diseases increase pulmonary vascular resistance, making it harder for blood to flow into the lungs. This reduces preload to the single ventricle, leading to decreased cardiac output. Even mild lung disease can have a major impact in Fontan patients due to their delicate hemodynamics.";
const HEART_FAILURE_TEXT: &str = "Heart Failure preset applied! In Fontan circulation, heart failure can develop due to the unique strain placed on the single functioning ventricle and the passive nature of pulmonary blood flow. Over time, the single ventricle may struggle to maintain adequate cardiac output. Ventricular dysfunction—whether systolic or diastolic—further compromises forward flow, leading to systemic congestion, exercise intolerance, and fatigue.";

#[derive(Clone, Default)]
struct MockBackendState {
    requests: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    fail_process: Arc<AtomicBool>,
}

fn outputs_json(q_v: f64, p_pa: f64) -> serde_json::Value {
    json!({
        "Q_v": q_v, "Q_u": 1.5, "Q_l": 1.6, "Q_p": 3.1,
        "P_sa": 75.0, "P_pa": p_pa, "P_pv": 6.0, "OER": 0.3
    })
}

async fn handle_calculate(
    State(state): State<MockBackendState>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    state
        .requests
        .lock()
        .await
        .push(("/calculate_condition_values".to_string(), body));
    Json(outputs_json(2.4, 21.5))
}

async fn handle_process(
    State(state): State<MockBackendState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    state
        .requests
        .lock()
        .await
        .push(("/process".to_string(), body));
    if state.fail_process.load(Ordering::SeqCst) {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "solver did not converge" })),
        ));
    }
    Ok(Json(outputs_json(3.1, 14.0)))
}

async fn handle_preset(
    Query(query): Query<std::collections::HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match query.get("condition").map(String::as_str) {
        Some("broken") => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid condition" })),
        )),
        Some("lungProblem") => Ok(Json(json!({
            "HR": 100, "UVR": 45, "LVR": 35, "PVR": 27, "S_sa": 0.99,
            "Hb": "15", "CVO2u": 70, "CVO2l": 50,
            "C_d": 0.02241, "message": "Preset lungProblem applied!",
            "compliance_values": { "C_d": 0.02241 }
        }))),
        _ => Ok(Json(json!({ "message": "ok" }))),
    }
}

async fn spawn_condition_backend() -> std::io::Result<(String, MockBackendState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = MockBackendState::default();
    let app = Router::new()
        .route("/apply_preset", get(handle_preset))
        .route("/calculate_condition_values", post(handle_calculate))
        .route("/process", post(handle_process))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn scenario_page() -> ConditionsPage {
    ConditionsPage::with_controls([
        (ParameterName::Hr, "75"),
        (ParameterName::Uvr, "10"),
        (ParameterName::Lvr, "5"),
        (ParameterName::Pvr, "27"),
        (ParameterName::SSa, "98"),
        (ParameterName::Hb, "14"),
        (ParameterName::Cvo2u, "12"),
        (ParameterName::Cvo2l, "12"),
    ])
}

async fn http_controller() -> (
    ConditionComparisonController<HttpSimulationBackend>,
    MockBackendState,
) {
    let (base, state) = spawn_condition_backend().await.expect("spawn backend");
    let backend = HttpSimulationBackend::new(&base).expect("backend");
    (ConditionComparisonController::new(backend), state)
}

#[tokio::test]
async fn lung_problem_scenario_sends_pvr_ten_baseline() {
    let (controller, state) = http_controller().await;
    let mut page = scenario_page();

    let outcome = controller.run_comparison(&mut page).await.expect("comparison");

    let requests = state.requests.lock().await.clone();
    assert_eq!(requests.len(), 2);
    let adjusted = requests
        .iter()
        .find(|(path, _)| path == "/calculate_condition_values")
        .map(|(_, body)| body.clone())
        .expect("adjusted request");
    let baseline = requests
        .iter()
        .find(|(path, _)| path == "/process")
        .map(|(_, body)| body.clone())
        .expect("baseline request");
    assert_eq!(adjusted["PVR"], "27");
    assert_eq!(baseline["PVR"], "10");
    for key in ["HR", "UVR", "LVR", "S_sa", "Hb", "CVO2u", "CVO2l"] {
        assert_eq!(adjusted[key], baseline[key], "{key} must be identical");
    }
    assert_eq!(baseline["HR"], "75");

    let ComparisonOutcome::Rendered(table) = outcome else {
        panic!("expected a rendered table");
    };
    assert_eq!(table.rows().len(), 8);
    assert_eq!(table.baseline_label().as_str(), "Baseline (PVR=10)");
    assert_eq!(table.rows()[0].display_name(), "Cardiac Output (L/min)");
    assert_eq!(table.rows()[0].adjusted, 2.4);
    assert_eq!(table.rows()[0].baseline, 3.1);
    assert_eq!(table.rows()[5].display_name(), "Fontan Pressure (mmHg)");
    assert_eq!(table.rows()[5].adjusted, 21.5);
    assert_eq!(table.rows()[5].baseline, 14.0);

    assert!(page.results().is_visible());
    assert_eq!(page.results().content(), Some(&table));
    assert!(page.status().is_none());

    let html = table.to_html();
    assert!(html.contains("<th>With Condition</th>"));
    assert!(html.contains("<th>Baseline (PVR=10)</th>"));
    assert!(html.contains("<tr><td>Cardiac Output (L/min)</td><td>2.4</td><td>3.1</td></tr>"));
    assert_eq!(html.matches("<tr><td>").count(), 8);
}

#[tokio::test]
async fn default_pvr_keeps_plain_baseline_label() {
    let (controller, state) = http_controller().await;
    let mut page = ConditionsPage::default();

    let outcome = controller.run_comparison(&mut page).await.expect("comparison");
    let ComparisonOutcome::Rendered(table) = outcome else {
        panic!("expected a rendered table");
    };
    assert_eq!(table.baseline_label().as_str(), "Baseline");

    let requests = state.requests.lock().await.clone();
    assert_eq!(requests[0].1, requests[1].1);
}

#[tokio::test]
async fn failed_baseline_request_leaves_results_untouched() {
    let (controller, state) = http_controller().await;
    let mut page = scenario_page();

    controller
        .run_comparison(&mut page)
        .await
        .expect("first comparison succeeds");
    let before = page.results().clone();

    state.fail_process.store(true, Ordering::SeqCst);
    page.set_control(ParameterName::Hr, "90").expect("HR exists");
    let err = controller
        .run_comparison(&mut page)
        .await
        .expect_err("baseline fails");

    assert!(matches!(err, ClientError::Status { status: 500, .. }));
    assert_eq!(page.results(), &before);
    let status = page.status().expect("visible status");
    assert!(status.contains("solver did not converge"), "{status}");
}

#[tokio::test]
async fn failed_first_comparison_keeps_container_hidden() {
    let (controller, state) = http_controller().await;
    state.fail_process.store(true, Ordering::SeqCst);
    let mut page = ConditionsPage::default();

    controller
        .run_comparison(&mut page)
        .await
        .expect_err("baseline fails");
    assert!(!page.results().is_visible());
    assert!(page.results().content().is_none());
}

#[tokio::test]
async fn preset_updates_only_present_controls() {
    let (controller, _state) = http_controller().await;
    let mut page = ConditionsPage::with_controls([
        (ParameterName::Hr, "60"),
        (ParameterName::Pvr, "10"),
        (ParameterName::Hb, "12"),
    ]);

    let mut updated = controller
        .apply_preset(&mut page, "lungProblem")
        .await
        .expect("preset");
    updated.sort();

    assert_eq!(
        updated,
        vec![ParameterName::Hr, ParameterName::Pvr, ParameterName::Hb]
    );
    let pvr = page.control(ParameterName::Pvr).expect("PVR");
    assert_eq!(pvr.value(), "27");
    assert_eq!(pvr.label(), "27");
    assert_eq!(page.control(ParameterName::Hb).map(|c| c.value()), Some("15"));
    assert_eq!(page.controls().count(), 3);
    assert!(page.modal().is_visible());
    assert_eq!(page.modal().text(), LUNG_PROBLEM_TEXT);
}

#[tokio::test]
async fn each_known_preset_opens_its_own_modal_text() {
    let (controller, state) = http_controller().await;

    for (condition, expected) in [
        ("lowPreload", LOW_PRELOAD_TEXT),
        ("heartFailure", HEART_FAILURE_TEXT),
    ] {
        let mut page = ConditionsPage::default();
        let updated = controller
            .apply_preset(&mut page, condition)
            .await
            .expect("preset");
        assert!(updated.is_empty(), "{condition}");
        assert!(page.modal().is_visible());
        assert_eq!(page.modal().text(), expected);
        assert!(page.status().is_none());
    }
    assert!(state.requests.lock().await.is_empty());
}

#[tokio::test]
async fn unrecognized_preset_shows_generic_message() {
    let (controller, _state) = http_controller().await;
    let mut page = ConditionsPage::default();

    let updated = controller
        .apply_preset(&mut page, "  marathon ")
        .await
        .expect("backend accepts the name");
    assert!(updated.is_empty());
    assert_eq!(page.modal().text(), GENERIC_PRESET_MESSAGE);
    assert_eq!(page.control(ParameterName::Pvr).map(|c| c.value()), Some("10"));
}

#[tokio::test]
async fn failed_preset_changes_nothing_but_status() {
    let (controller, _state) = http_controller().await;
    let mut page = ConditionsPage::default();

    let err = controller
        .apply_preset(&mut page, "broken")
        .await
        .expect_err("backend rejects");
    assert_eq!(err.kind(), crate::ClientErrorKind::Status);
    assert!(!page.modal().is_visible());
    for control in page.controls() {
        assert_eq!(control.value(), control.label());
    }
    assert_eq!(page.control(ParameterName::Hr).map(|c| c.value()), Some("100"));
    assert!(page.status().is_some());
}

#[test]
fn preset_messages_are_exact() {
    assert_eq!(PresetCondition::LowPreload.message(), LOW_PRELOAD_TEXT);
    assert_eq!(PresetCondition::LungProblem.message(), LUNG_PROBLEM_TEXT);
    assert_eq!(PresetCondition::HeartFailure.message(), HEART_FAILURE_TEXT);
    assert_eq!(GENERIC_PRESET_MESSAGE, "Preset applied successfully!");
}

#[test]
fn scalar_text_skips_nested_values() {
    assert_eq!(scalar_text(&json!(0.99)), Some("0.99".to_string()));
    assert_eq!(scalar_text(&json!(100)), Some("100".to_string()));
    assert_eq!(scalar_text(&json!("15")), Some("15".to_string()));
    assert_eq!(scalar_text(&json!({ "C_d": 0.02 })), None);
    assert_eq!(scalar_text(&json!(null)), None);
}

/// In-process backend whose outputs echo the submitted PVR.
struct ScriptedBackend {
    barrier: Option<Arc<Barrier>>,
    fail_calculate: bool,
    fail_process: bool,
}

impl ScriptedBackend {
    fn echo() -> Self {
        Self {
            barrier: None,
            fail_calculate: false,
            fail_process: false,
        }
    }

    fn outputs_for(params: &ParameterSet) -> ConditionOutputs {
        let pvr = params.get(ParameterName::Pvr).parse::<f64>().unwrap_or(-1.0);
        ConditionOutputs {
            q_v: pvr,
            q_u: 1.0,
            q_l: 1.0,
            q_p: 2.0,
            p_sa: 70.0,
            p_pa: 12.0,
            p_pv: 5.0,
            oer: 0.25,
        }
    }

    async fn rendezvous(&self) {
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
    }
}

#[async_trait]
impl SimulationBackend for ScriptedBackend {
    async fn apply_preset(&self, _condition: &str) -> Result<PresetValues, ClientError> {
        Ok(PresetValues::new())
    }

    async fn calculate_condition_values(
        &self,
        params: &ParameterSet,
    ) -> Result<ConditionOutputs, ClientError> {
        self.rendezvous().await;
        if self.fail_calculate {
            return Err(ClientError::Malformed {
                endpoint: "/calculate_condition_values",
                reason: "missing field `Q_v`".to_string(),
            });
        }
        Ok(Self::outputs_for(params))
    }

    async fn process_condition(
        &self,
        params: &ParameterSet,
    ) -> Result<ConditionOutputs, ClientError> {
        self.rendezvous().await;
        if self.fail_process {
            return Err(ClientError::Status {
                endpoint: "/process",
                status: 500,
                message: "solver did not converge".to_string(),
            });
        }
        Ok(Self::outputs_for(params))
    }

    async fn process_slider(&self, _inputs: &SliderInputs) -> Result<SliderOutputs, ClientError> {
        Err(ClientError::Malformed {
            endpoint: "/process",
            reason: "not scripted".to_string(),
        })
    }

    async fn generate_plot(&self, _kind: PlotKind) -> Result<PlotResponse, ClientError> {
        Err(ClientError::Malformed {
            endpoint: "/generate_plot",
            reason: "not scripted".to_string(),
        })
    }

    async fn generate_custom_plot(
        &self,
        _input1: PlotInput,
        _input2: PlotInput,
        _output: OutputField,
    ) -> Result<PlotResponse, ClientError> {
        Err(ClientError::Malformed {
            endpoint: "/generate_custom_plot",
            reason: "not scripted".to_string(),
        })
    }
}

#[tokio::test]
async fn both_simulations_are_in_flight_together() {
    let controller = ConditionComparisonController::new(ScriptedBackend {
        barrier: Some(Arc::new(Barrier::new(2))),
        fail_calculate: false,
        fail_process: false,
    });
    let mut page = ConditionsPage::default();

    // Each call waits for the other at the barrier, so sequential dispatch would hang.
    let outcome = tokio::time::timeout(Duration::from_secs(5), controller.run_comparison(&mut page))
        .await
        .expect("requests must be dispatched concurrently")
        .expect("comparison");
    assert!(matches!(outcome, ComparisonOutcome::Rendered(_)));
}

#[tokio::test]
async fn one_failed_simulation_renders_nothing() {
    let controller = ConditionComparisonController::new(ScriptedBackend {
        barrier: None,
        fail_calculate: true,
        fail_process: false,
    });
    let mut page = ConditionsPage::default();

    let err = controller
        .run_comparison(&mut page)
        .await
        .expect_err("adjusted fails");
    assert_eq!(err.kind(), crate::ClientErrorKind::Malformed);
    assert!(page.results().content().is_none());
    assert!(page.status().is_some());
}

#[tokio::test]
async fn double_failure_reports_the_adjusted_error() {
    let controller = ConditionComparisonController::new(ScriptedBackend {
        barrier: None,
        fail_calculate: true,
        fail_process: true,
    });
    let mut page = ConditionsPage::default();

    let err = controller
        .run_comparison(&mut page)
        .await
        .expect_err("both fail");
    assert!(matches!(
        err,
        ClientError::Malformed {
            endpoint: "/calculate_condition_values",
            ..
        }
    ));
    assert!(page.results().content().is_none());
    assert_eq!(page.status(), Some(err.user_message().as_str()));
}

#[tokio::test]
async fn baseline_failure_alone_fails_the_comparison() {
    let controller = ConditionComparisonController::new(ScriptedBackend {
        barrier: None,
        fail_calculate: false,
        fail_process: true,
    });
    let mut page = ConditionsPage::default();

    let err = controller
        .run_comparison(&mut page)
        .await
        .expect_err("baseline fails");
    assert!(matches!(err, ClientError::Status { status: 500, .. }));
    assert!(page.results().content().is_none());
}

#[tokio::test]
async fn stale_comparison_is_discarded_whatever_the_settle_order() {
    let controller = ConditionComparisonController::new(ScriptedBackend::echo());
    let mut page = ConditionsPage::default();

    page.set_control(ParameterName::Pvr, "12").expect("PVR");
    let older = controller.begin_comparison(&page).expect("older");
    page.set_control(ParameterName::Pvr, "14").expect("PVR");
    let newer = controller.begin_comparison(&page).expect("newer");
    assert!(newer.token() > older.token());
    assert_eq!(older.adjusted().get(ParameterName::Pvr), "12");
    assert_eq!(older.baseline(), older.adjusted());
    assert_eq!(newer.baseline().get(ParameterName::Pvr), "14");

    let older_result = controller.fetch(&older).await;
    let newer_result = controller.fetch(&newer).await;

    let outcome = controller
        .settle(&mut page, &newer, newer_result)
        .expect("newer renders");
    assert!(matches!(outcome, ComparisonOutcome::Rendered(_)));

    let outcome = controller
        .settle(&mut page, &older, older_result)
        .expect("older is dropped");
    assert_eq!(outcome, ComparisonOutcome::Stale);

    let table = page.results().content().expect("table");
    assert_eq!(table.rows()[0].adjusted, 14.0);
}

#[tokio::test]
async fn stale_failure_does_not_overwrite_status() {
    let controller = ConditionComparisonController::new(ScriptedBackend::echo());
    let mut page = ConditionsPage::default();

    let older = controller.begin_comparison(&page).expect("older");
    let _newer = controller.begin_comparison(&page).expect("newer");

    let outcome = controller
        .settle(
            &mut page,
            &older,
            Err(ClientError::Malformed {
                endpoint: "/process",
                reason: "truncated".to_string(),
            }),
        )
        .expect("stale failures are swallowed");
    assert_eq!(outcome, ComparisonOutcome::Stale);
    assert!(page.status().is_none());
}

#[test]
fn missing_control_blocks_submission() {
    let controller = ConditionComparisonController::new(ScriptedBackend::echo());
    let page = ConditionsPage::with_controls([(ParameterName::Hr, "80")]);
    let err = controller.begin_comparison(&page).expect_err("incomplete page");
    assert_eq!(err.kind(), crate::ClientErrorKind::Page);
}

#[test]
fn text_table_lists_every_output() {
    let outputs = ScriptedBackend::outputs_for(&ParameterSet::defaults());
    let table = ComparisonTable::new(
        &ComparisonResult {
            adjusted: outputs,
            baseline: outputs,
        },
        BaselineLabel::Baseline,
    );
    let text = table.to_string();
    assert_eq!(text.lines().count(), 9);
    assert!(text.lines().next().expect("header").contains("With Condition"));
    assert!(text.contains("Oxygen Extraction Ratio"));
}
