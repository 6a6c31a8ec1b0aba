//! # HTTP Handlers
//!
//! Cada função pública é um handler axum registrado em
//! [`super::create_router()`].
//!
//! | Handler | Método | Retorna |
//! |---------|--------|---------|
//! | `index` | GET `/` | formulário de sintomas (HTML) |
//! | `diagnose` | POST `/diagnose` | página de resultado (HTML) |
//! | `api_diagnose` | POST `/api/diagnose` | [`DiagnosisReport`] (JSON) |
//! | `api_diagnose_batch` | POST `/api/diagnose/batch` | `Vec<`[`BatchOutcome`]`>` (JSON) |
//! | `status` | GET `/status` | [`StatusResponse`] (JSON) |
//! | `reload_rules` | POST `/rules/reload` | [`ReloadSummary`] (JSON) |
//!
//! Toda requisição clona o `Arc<DiagnosisContext>` atual do estado, então um
//! reload concorrente nunca afeta um diagnóstico já em andamento.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use super::state::{AppState, ReloadSummary};
use super::templates;
use crate::core::KnowledgeBase;
use crate::error::{InputError, RuleDefect};
use crate::inference::{DiagnosisClassifier, InferenceReport, TraceEntry, UserFacts};

/// Diagnóstico final pronto para exibição.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedDiagnosis {
    pub code: String,
    pub label: String,
    pub cf: f64,
    /// `cf × 100`, arredondado a duas casas.
    pub cf_percent: f64,
}

/// Código com descrição e CF.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelledFact {
    pub code: String,
    pub label: String,
    pub cf: f64,
}

/// O que a página de resultado e a API JSON apresentam.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosisReport {
    pub converged: bool,
    pub passes: u32,
    pub top_diagnosis: Option<RankedDiagnosis>,
    pub diagnoses: Vec<RankedDiagnosis>,
    pub all_derived: Vec<LabelledFact>,
    pub inputs: Vec<LabelledFact>,
    pub trace: Vec<TraceEntry>,
}

impl DiagnosisReport {
    fn build(
        report: InferenceReport,
        inputs: &UserFacts,
        kb: &KnowledgeBase,
        classifier: &dyn DiagnosisClassifier,
    ) -> Self {
        let projection = report.project(classifier);
        let diagnoses: Vec<RankedDiagnosis> = projection
            .diagnoses
            .into_iter()
            .map(|d| RankedDiagnosis {
                label: kb.label(&d.code).to_string(),
                cf_percent: to_percent(d.cf),
                code: d.code,
                cf: d.cf,
            })
            .collect();
        let labelled = |code: &str, cf: f64| LabelledFact {
            code: code.to_string(),
            label: kb.label(code).to_string(),
            cf,
        };

        Self {
            converged: report.converged(),
            passes: report.passes,
            top_diagnosis: diagnoses.first().cloned(),
            all_derived: projection
                .all_derived
                .iter()
                .map(|f| labelled(&f.code, f.cf))
                .collect(),
            inputs: inputs.iter().map(|(code, &cf)| labelled(code, cf)).collect(),
            diagnoses,
            trace: report.trace.into_entries(),
        }
    }
}

fn to_percent(cf: f64) -> f64 {
    (cf * 100.0 * 100.0).round() / 100.0
}

/// Corpo de erro JSON das rotas da API.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: Option<String>,
}

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl ApiError {
    fn internal(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
            code: None,
        }
    }
}

impl From<InputError> for ApiError {
    fn from(e: InputError) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: e.code().map(str::to_string),
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

fn markup_to_html(m: maud::Markup) -> Html<String> {
    Html(m.into_string())
}

/// GET `/`: formulário de sintomas.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let context = state.current();
    markup_to_html(templates::symptom_form(&context.kb, &state.config.symptom_prefix))
}

/// Mantém os valores do formulário maiores que zero e junta os inválidos.
///
/// `"NaN"` e `"inf"` passam pelo parse de `f64`, então são recusados à parte.
fn parse_form(form: &BTreeMap<String, String>) -> Result<UserFacts, Vec<String>> {
    let mut facts = UserFacts::new();
    let mut errors = Vec::new();
    for (code, raw) in form {
        match raw.trim().parse::<f64>() {
            Ok(cf) if !cf.is_finite() => errors.push(format!("{code}: '{raw}' não é um número finito")),
            Ok(cf) if cf > 0.0 => {
                facts.insert(code.clone(), cf);
            }
            Ok(_) => {}
            Err(_) => errors.push(format!("{code}: '{raw}' não é um número")),
        }
    }
    if errors.is_empty() {
        Ok(facts)
    } else {
        Err(errors)
    }
}

/// POST `/diagnose`: envio do formulário, página de resultado renderizada.
pub async fn diagnose(
    State(state): State<AppState>,
    Form(form): Form<BTreeMap<String, String>>,
) -> (StatusCode, Html<String>) {
    let user_facts = match parse_form(&form) {
        Ok(facts) => facts,
        Err(errors) => {
            tracing::warn!(errors = errors.len(), "Formulário de diagnóstico rejeitado");
            return (StatusCode::BAD_REQUEST, markup_to_html(templates::error_page(&errors)));
        }
    };

    let context = state.current();
    let report = match context.engine.run(&user_facts) {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!(error = %e, "Entrada de diagnóstico rejeitada");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                markup_to_html(templates::error_page(&[e.to_string()])),
            );
        }
    };

    let view = DiagnosisReport::build(report, &user_facts, &context.kb, &*state.classifier);
    tracing::info!(
        inputs = user_facts.len(),
        diagnoses = view.diagnoses.len(),
        top = view.top_diagnosis.as_ref().map_or("none", |d| d.code.as_str()),
        "Diagnóstico servido"
    );
    (StatusCode::OK, markup_to_html(templates::result_page(&view, &context.kb)))
}

/// Corpo de POST `/api/diagnose`.
#[derive(Debug, Deserialize)]
pub struct DiagnoseRequest {
    #[serde(default)]
    pub facts: UserFacts,
}

/// POST `/api/diagnose`: JSON na entrada, relatório JSON na saída.
///
/// Diferente do formulário, todo fato enviado é usado, inclusive negativos.
pub async fn api_diagnose(
    State(state): State<AppState>,
    Json(request): Json<DiagnoseRequest>,
) -> Result<Json<DiagnosisReport>, ApiError> {
    let context = state.current();
    let report = context.engine.run(&request.facts).map_err(|e| {
        tracing::warn!(error = %e, "Entrada da API rejeitada");
        ApiError::from(e)
    })?;

    let view = DiagnosisReport::build(report, &request.facts, &context.kb, &*state.classifier);
    tracing::info!(
        inputs = request.facts.len(),
        diagnoses = view.diagnoses.len(),
        "Diagnóstico da API servido"
    );
    Ok(Json(view))
}

/// Corpo de POST `/api/diagnose/batch`.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub requests: Vec<DiagnoseRequest>,
}

/// Resultado de um item do lote; um item inválido não derruba os demais.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Ok {
        report: DiagnosisReport,
    },
    Rejected {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

/// POST `/api/diagnose/batch`: vários conjuntos de observações de uma vez.
///
/// As execuções rodam em paralelo via
/// [`InferenceEngine::run_batch`](crate::inference::InferenceEngine::run_batch)
/// dentro de `spawn_blocking`, para não ocupar as threads do runtime.
/// A resposta mantém a ordem de `requests`.
pub async fn api_diagnose_batch(
    State(state): State<AppState>,
    Json(batch): Json<BatchRequest>,
) -> Result<Json<Vec<BatchOutcome>>, ApiError> {
    let context = state.current();
    let classifier = state.classifier.clone();
    let inputs: Vec<UserFacts> = batch.requests.into_iter().map(|r| r.facts).collect();

    let outcomes = tokio::task::spawn_blocking(move || {
        context
            .engine
            .run_batch(&inputs)
            .into_iter()
            .zip(&inputs)
            .map(|(result, facts)| match result {
                Ok(report) => BatchOutcome::Ok {
                    report: DiagnosisReport::build(report, facts, &context.kb, &*classifier),
                },
                Err(e) => BatchOutcome::Rejected {
                    code: e.code().map(str::to_string),
                    error: e.to_string(),
                },
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Falha na tarefa de diagnóstico em lote");
        ApiError::internal(format!("batch worker failed: {e}"))
    })?;

    let rejected = outcomes
        .iter()
        .filter(|o| matches!(o, BatchOutcome::Rejected { .. }))
        .count();
    tracing::info!(requests = outcomes.len(), rejected, "Lote de diagnósticos servido");
    Ok(Json(outcomes))
}

/// Resposta de GET `/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub rules: usize,
    pub facts_known: usize,
    pub defects: Vec<RuleDefect>,
}

/// GET `/status`: regras carregadas, códigos com descrição e registros ignorados.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let context = state.current();
    Json(StatusResponse {
        rules: context.engine.rules().len(),
        facts_known: context.kb.len(),
        defects: context.engine.rules().defects().to_vec(),
    })
}

/// POST `/rules/reload`: relê os dois arquivos do disco.
pub async fn reload_rules(State(state): State<AppState>) -> Result<Json<ReloadSummary>, ApiError> {
    state.reload().map(Json).map_err(|e| {
        let message = format!("{e:#}");
        tracing::error!(error = %message, "Falha ao recarregar a base de regras");
        ApiError::internal(message)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::core::{Operator, Rule, RuleBase};
    use crate::inference::InferenceEngine;

    fn rule(id: &str, antecedents: &[&str], consequent: &str, cf: f64) -> Rule {
        Rule {
            id: id.to_string(),
            antecedents: antecedents.iter().map(|s| s.to_string()).collect(),
            consequent: consequent.to_string(),
            operator: Operator::And,
            rule_cf: cf,
        }
    }

    fn kb() -> KnowledgeBase {
        [
            ("G01", "Humor deprimido"),
            ("G02", "Perda de interesse"),
            ("K01", "Síndrome depressiva"),
            ("M01", "Transtorno depressivo maior"),
            ("M02", "Transtorno depressivo persistente"),
        ]
        .into_iter()
        .map(|(c, l)| (c.to_string(), l.to_string()))
        .collect()
    }

    fn state_with(rules: Vec<Rule>, config: AppConfig) -> AppState {
        AppState::new(InferenceEngine::with_defaults(RuleBase::new(rules)), kb(), config).unwrap()
    }

    fn state() -> AppState {
        state_with(
            vec![
                rule("R1", &["G01"], "M01", 0.6),
                rule("R2", &["G01", "G02"], "K01", 0.9),
                rule("R3", &["K01"], "M02", 0.5),
            ],
            AppConfig::default(),
        )
    }

    fn form(pairs: &[(&str, &str)]) -> Form<BTreeMap<String, String>> {
        Form(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    fn request(pairs: &[(&str, f64)]) -> DiagnoseRequest {
        DiagnoseRequest {
            facts: pairs.iter().map(|(c, v)| (c.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_percent_rounds_to_two_decimals() {
        assert_eq!(to_percent(0.48), 48.0);
        assert_eq!(to_percent(0.123456), 12.35);
        assert_eq!(to_percent(-0.5), -50.0);
    }

    #[test]
    fn test_parse_form_drops_zero_and_reports_garbage() {
        let facts = parse_form(&form(&[("G01", "0.8"), ("G02", "0"), ("G03", " 1 ")]).0).unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts.get("G03"), Some(&1.0));

        let errors = parse_form(&form(&[("G01", "abc"), ("G02", "0.5")]).0).unwrap_err();
        assert_eq!(errors, vec!["G01: 'abc' não é um número".to_string()]);
    }

    #[test]
    fn test_parse_form_reports_non_finite_values() {
        let errors =
            parse_form(&form(&[("G01", "NaN"), ("G02", "inf"), ("G03", "-infinity"), ("G04", "0.7")]).0)
                .unwrap_err();
        assert_eq!(
            errors,
            vec![
                "G01: 'NaN' não é um número finito".to_string(),
                "G02: 'inf' não é um número finito".to_string(),
                "G03: '-infinity' não é um número finito".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_index_lists_symptoms() {
        let Html(page) = index(State(state())).await;
        assert!(page.contains("Humor deprimido"));
        assert!(page.contains("Perda de interesse"));
        assert!(!page.contains("Transtorno depressivo maior"));
    }

    #[tokio::test]
    async fn test_form_diagnosis_renders_ranked_result() {
        let (status, Html(page)) =
            diagnose(State(state()), form(&[("G01", "0.8"), ("G02", "0.0")])).await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("Transtorno depressivo maior"));
        assert!(page.contains("48.00%"));
        assert!(page.contains("FATO: Humor deprimido (G01) com CF = 0.800"));
        assert!(!page.contains("Transtorno depressivo persistente"));
    }

    #[tokio::test]
    async fn test_form_diagnosis_rejects_bad_values() {
        let (status, Html(page)) = diagnose(State(state()), form(&[("G01", "muito")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(page.contains("não é um número"));

        let (status, Html(page)) = diagnose(State(state()), form(&[("G01", "NaN")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(page.contains("não é um número finito"));

        let (status, _) = diagnose(State(state()), form(&[("G01", "1.5")])).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_api_diagnosis_chains_through_intermediate() {
        let Json(report) = api_diagnose(State(state()), Json(request(&[("G01", 1.0), ("G02", 0.8)])))
            .await
            .unwrap();
        assert!(report.converged);
        assert_eq!(report.passes, 2);

        let codes: Vec<&str> = report.diagnoses.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["M01", "M02"]);
        assert_eq!(report.diagnoses[1].cf_percent, 36.0);
        assert_eq!(
            report.top_diagnosis.as_ref().map(|d| d.label.as_str()),
            Some("Transtorno depressivo maior")
        );
        assert_eq!(report.all_derived.len(), 3);
        assert_eq!(report.inputs[1].label, "Perda de interesse");
        assert!(!report.trace.is_empty());
    }

    #[tokio::test]
    async fn test_api_rejects_out_of_range_with_422() {
        let err = api_diagnose(State(state()), Json(request(&[("G01", -2.0)])))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code.as_deref(), Some("G01"));
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_configured_pattern_selects_diagnoses() {
        let config = AppConfig {
            diagnosis_pattern: Some("^K".to_string()),
            ..AppConfig::default()
        };
        let state = state_with(
            vec![rule("R1", &["G01"], "M01", 0.6), rule("R2", &["G01", "G02"], "K01", 0.9)],
            config,
        );
        let Json(report) = api_diagnose(State(state), Json(request(&[("G01", 1.0), ("G02", 1.0)])))
            .await
            .unwrap();
        let codes: Vec<&str> = report.diagnoses.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["K01"]);
        assert_eq!(report.all_derived.len(), 2);
    }

    /// Um código informado pelo usuário e concluído por regra passa a DERIVED
    /// e aparece entre os derivados, com o valor combinado.
    #[tokio::test]
    async fn test_concluded_user_code_is_listed_as_derived() {
        let state = state_with(vec![rule("R1", &["G01"], "G02", 0.5)], AppConfig::default());
        let Json(report) = api_diagnose(State(state), Json(request(&[("G01", 0.8), ("G02", 0.4)])))
            .await
            .unwrap();
        assert_eq!(report.all_derived.len(), 1);
        assert_eq!(report.all_derived[0].code, "G02");
        assert!((report.all_derived[0].cf - 0.64).abs() < 1e-9);
        assert!(report.diagnoses.is_empty());
    }

    #[tokio::test]
    async fn test_batch_keeps_order_and_isolates_rejections() {
        let batch = BatchRequest {
            requests: vec![
                request(&[("G01", 0.8)]),
                request(&[("G01", 2.0)]),
                request(&[("G01", 1.0), ("G02", 0.8)]),
                request(&[]),
            ],
        };
        let Json(outcomes) = api_diagnose_batch(State(state()), Json(batch)).await.unwrap();
        assert_eq!(outcomes.len(), 4);

        match &outcomes[0] {
            BatchOutcome::Ok { report } => {
                assert_eq!(report.top_diagnosis.as_ref().map(|d| d.cf_percent), Some(48.0));
            }
            other => panic!("expected ok, got {other:?}"),
        }
        match &outcomes[1] {
            BatchOutcome::Rejected { code, .. } => assert_eq!(code.as_deref(), Some("G01")),
            other => panic!("expected rejection, got {other:?}"),
        }
        match &outcomes[2] {
            BatchOutcome::Ok { report } => assert_eq!(report.passes, 2),
            other => panic!("expected ok, got {other:?}"),
        }
        match &outcomes[3] {
            BatchOutcome::Ok { report } => assert!(report.diagnoses.is_empty()),
            other => panic!("expected ok, got {other:?}"),
        }

        let json = serde_json::to_value(&outcomes).unwrap();
        assert_eq!(json[0]["status"], "ok");
        assert_eq!(json[1]["status"], "rejected");
        assert_eq!(json[1]["code"], "G01");
    }

    #[tokio::test]
    async fn test_status_reports_counts() {
        let Json(body) = status(State(state())).await;
        assert_eq!(body.rules, 3);
        assert_eq!(body.facts_known, 5);
        assert!(body.defects.is_empty());
    }

    #[tokio::test]
    async fn test_reload_failure_maps_to_500() {
        let dir = tempfile::tempdir().unwrap();
        let rules_path = dir.path().join("rules.json");
        std::fs::write(&rules_path, "[").unwrap();
        let config = AppConfig {
            rules_path,
            ..AppConfig::default()
        };
        let state = state_with(Vec::new(), config);
        let err = reload_rules(State(state)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("rules.json"));
    }
}
