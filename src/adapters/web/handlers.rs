//! HTTP request handlers for the web adapter.

use askama::Template;
use axum::{
    Form, Json,
    extract::{
        Path, State,
        rejection::{FormRejection, JsonRejection},
    },
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::domain::error::TradeflowError;
use crate::domain::journal::JournalDocument;
use crate::domain::ledger::BankEvolution;
use crate::domain::projection::ProjectionDay;
use crate::domain::record::{
    BankOperation, DailyRecord, NewRecord, RecordKind, local_timestamp,
};
use crate::domain::settings::UserSettings;
use crate::ports::export_port::ExportPort;
use crate::ports::journal_store::JournalStore;

use super::chart_svg::bank_evolution_svg;
use super::error::handle_error;
use super::templates::{
    CalendarFragment, CalendarPage, CalendarView, DashboardFragment, DashboardPage,
    DashboardView, ErrorPage, ProjectionFragment, ProjectionPage, ProjectionView, SetupFragment,
    SetupPage,
};
use super::{AppState, WebError, is_htmx_request};

/// Run a store call on the blocking pool; every backend does synchronous I/O.
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, TradeflowError>
where
    F: FnOnce(&dyn JournalStore) -> Result<T, TradeflowError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| TradeflowError::Storage {
            reason: format!("store task failed: {e}"),
        })?
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// JSON API
// ---------------------------------------------------------------------------

/// Body of the `/data` mutations: `{ "type": ..., "payload": ..., "id": ... }`.
#[derive(Debug, Deserialize)]
pub struct DataRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JournalDocument>,
}

impl MutationResponse {
    fn message(message: &'static str) -> Json<Self> {
        Json(Self {
            message,
            data: None,
        })
    }

    fn with_data(message: &'static str, data: JournalDocument) -> Json<Self> {
        Json(Self {
            message,
            data: Some(data),
        })
    }
}

fn parse_body(body: Result<Json<DataRequest>, JsonRejection>) -> Result<DataRequest, WebError> {
    body.map(|Json(req)| req)
        .map_err(|e| WebError::bad_request("Invalid request body").with_error(e.body_text()))
}

fn take_payload<T: DeserializeOwned>(req: &mut DataRequest) -> Result<T, WebError> {
    let value = req
        .payload
        .take()
        .ok_or_else(|| WebError::bad_request("Missing payload"))?;
    serde_json::from_value(value)
        .map_err(|e| WebError::bad_request("Invalid payload").with_error(e.to_string()))
}

pub async fn get_data(State(state): State<Arc<AppState>>) -> Result<Json<JournalDocument>, WebError> {
    Ok(Json(with_store(&state, |s| s.load()).await?))
}

pub async fn post_data(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DataRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>, WebError> {
    let mut req = parse_body(body)?;

    let doc = match req.kind.as_str() {
        "settings" => {
            let settings: UserSettings = take_payload(&mut req)?;
            with_store(&state, move |s| {
                s.save_settings(&settings)?;
                s.load()
            })
            .await?
        }
        "record" => {
            let record = take_payload::<NewRecord>(&mut req)?.into_record()?;
            let (id, kind) = (record.id.clone(), record.kind);
            let doc = with_store(&state, move |s| {
                s.insert_record(&record)?;
                s.load()
            })
            .await?;
            info!(%id, %kind, "record added");
            doc
        }
        "reset" => {
            let doc = with_store(&state, |s| {
                s.reset()?;
                s.load()
            })
            .await?;
            info!("journal reset");
            doc
        }
        _ => return Err(WebError::bad_request("Invalid payload type")),
    };

    Ok(MutationResponse::with_data("Data updated successfully", doc))
}

pub async fn put_data(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DataRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>, WebError> {
    let mut req = parse_body(body)?;

    match req.kind.as_str() {
        "record" => {
            let record: DailyRecord = take_payload(&mut req)?;
            with_store(&state, move |s| s.replace_record(&record)).await?;
        }
        "settings" => {
            let settings: UserSettings = take_payload(&mut req)?;
            with_store(&state, move |s| s.save_settings(&settings)).await?;
        }
        _ => return Err(WebError::bad_request("Invalid payload type for PUT")),
    }

    Ok(MutationResponse::message("Data updated successfully"))
}

pub async fn delete_data(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DataRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>, WebError> {
    let req = parse_body(body)?;

    match (req.kind.as_str(), req.id) {
        ("record", Some(id)) if !id.trim().is_empty() => {
            with_store(&state, move |s| s.delete_record(&id)).await?;
        }
        ("reset", _) => {
            with_store(&state, |s| s.reset()).await?;
            info!("journal reset");
        }
        _ => {
            return Err(WebError::bad_request(
                "Invalid payload type or missing ID for DELETE",
            ));
        }
    }

    Ok(MutationResponse::message("Data deleted successfully"))
}

pub async fn post_bank_operation(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BankOperation>, JsonRejection>,
) -> Result<Json<MutationResponse>, WebError> {
    let Json(operation) =
        body.map_err(|e| WebError::bad_request("Invalid payload").with_error(e.body_text()))?;
    let record = operation.into_record(Local::now().fixed_offset())?;
    let doc = with_store(&state, move |s| {
        s.insert_record(&record)?;
        s.load()
    })
    .await?;
    Ok(MutationResponse::with_data("Data updated successfully", doc))
}

pub async fn get_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<crate::domain::ledger::Summary>, WebError> {
    let doc = with_store(&state, |s| s.load()).await?;
    let summary = doc.summary().ok_or(TradeflowError::SettingsMissing)?;
    Ok(Json(summary))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResponse {
    pub start_balance: f64,
    pub daily_rate: f64,
    pub final_balance: f64,
    pub days: Vec<ProjectionDay>,
}

pub async fn get_projection(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProjectionResponse>, WebError> {
    let doc = with_store(&state, |s| s.load()).await?;
    let projection = doc
        .projection(today())
        .ok_or(TradeflowError::SettingsMissing)?;
    Ok(Json(ProjectionResponse {
        start_balance: projection.start_balance(),
        daily_rate: projection.daily_rate(),
        final_balance: projection.final_balance(),
        days: projection.iter().collect(),
    }))
}

pub async fn get_calendar(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<crate::domain::ledger::CalendarDay>>, WebError> {
    let records = with_store(&state, |s| s.records()).await?;
    Ok(Json(crate::domain::ledger::calendar(&records)))
}

pub async fn export_csv(State(state): State<Arc<AppState>>) -> Result<Response, WebError> {
    let records = with_store(&state, |s| s.records()).await?;
    let mut buf = Vec::new();
    CsvAdapter::new().write_to(&records, &mut buf)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"tradeflow.csv\"",
            ),
        ],
        buf,
    )
        .into_response())
}

pub async fn bank_chart_svg(State(state): State<Arc<AppState>>) -> Result<Response, WebError> {
    let doc = with_store(&state, |s| s.load()).await?;
    let evolution = doc.bank_evolution().unwrap_or(BankEvolution {
        initial_bank: 0.0,
        points: Vec::new(),
    });
    Ok((
        [(header::CONTENT_TYPE, "image/svg+xml")],
        bank_evolution_svg(&evolution),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// HTML pages
// ---------------------------------------------------------------------------

fn render(headers: &HeaderMap, page: impl Template, fragment: impl Template) -> Response {
    let rendered = if is_htmx_request(headers) {
        fragment.render()
    } else {
        page.render()
    };
    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(error = %e, "template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "template rendering failed").into_response()
        }
    }
}

fn dashboard_response(doc: &JournalDocument, headers: &HeaderMap) -> Response {
    match DashboardView::build(doc, today()) {
        Some(view) => render(
            headers,
            DashboardPage { view: &view },
            DashboardFragment { view: &view },
        ),
        None => render(headers, SetupPage, SetupFragment),
    }
}

/// HTMX swaps the fresh dashboard in; a plain form post is redirected back to it.
fn after_form_post(doc: &JournalDocument, headers: &HeaderMap) -> Response {
    if is_htmx_request(headers) {
        dashboard_response(doc, headers)
    } else {
        Redirect::to("/").into_response()
    }
}

pub async fn dashboard(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    match with_store(&state, |s| s.load()).await {
        Ok(doc) => dashboard_response(&doc, &headers),
        Err(e) => handle_error(e, &headers),
    }
}

pub async fn projection_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let doc = match with_store(&state, |s| s.load()).await {
        Ok(doc) => doc,
        Err(e) => return handle_error(e, &headers),
    };
    match doc.projection(today()) {
        Some(projection) => {
            let view = ProjectionView::from(&projection);
            render(
                &headers,
                ProjectionPage { view: &view },
                ProjectionFragment { view: &view },
            )
        }
        None => render(&headers, SetupPage, SetupFragment),
    }
}

pub async fn calendar_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    match with_store(&state, |s| s.records()).await {
        Ok(records) => {
            let view = CalendarView::build(&crate::domain::ledger::calendar(&records));
            render(
                &headers,
                CalendarPage { view: &view },
                CalendarFragment { view: &view },
            )
        }
        Err(e) => handle_error(e, &headers),
    }
}

#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    pub initial_bank: f64,
    pub daily_entry_target: f64,
    pub daily_profit_target: f64,
}

pub async fn settings_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<SettingsForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(e) => {
            return handle_error(TradeflowError::invalid_settings("form", e.body_text()), &headers);
        }
    };
    let settings = UserSettings {
        initial_bank: form.initial_bank,
        daily_entry_target: form.daily_entry_target,
        daily_profit_target: form.daily_profit_target,
    };
    let result = with_store(&state, move |s| {
        s.save_settings(&settings)?;
        s.load()
    })
    .await;
    match result {
        Ok(doc) => after_form_post(&doc, &headers),
        Err(e) => handle_error(e, &headers),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Gain,
    Loss,
}

#[derive(Debug, Deserialize)]
pub struct TradeForm {
    pub date: NaiveDate,
    pub result_type: ResultType,
    pub result_value: f64,
    pub entries: u32,
    pub wins: u32,
    pub losses: u32,
}

impl TradeForm {
    fn into_record(self) -> Result<DailyRecord, TradeflowError> {
        if self.result_value.is_nan() || self.result_value < 0.0 {
            return Err(TradeflowError::invalid_record(
                "result amount must be zero or positive",
            ));
        }
        let date = local_timestamp(self.date).ok_or_else(|| {
            TradeflowError::invalid_record(format!("{} has no local noon", self.date))
        })?;
        let return_value = match self.result_type {
            ResultType::Gain => self.result_value,
            ResultType::Loss => -self.result_value,
        };
        NewRecord {
            id: None,
            date,
            return_value,
            kind: RecordKind::Trade,
            entries: Some(self.entries),
            wins: Some(self.wins),
            losses: Some(self.losses),
        }
        .into_record()
    }
}

pub async fn record_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<TradeForm>, FormRejection>,
) -> Response {
    let record = match form
        .map_err(|e| TradeflowError::invalid_record(e.body_text()))
        .and_then(|Form(form)| form.into_record())
    {
        Ok(r) => r,
        Err(e) => return handle_error(e, &headers),
    };
    let result = with_store(&state, move |s| {
        s.insert_record(&record)?;
        s.load()
    })
    .await;
    match result {
        Ok(doc) => after_form_post(&doc, &headers),
        Err(e) => handle_error(e, &headers),
    }
}

pub async fn bank_operation_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    operation: Result<Form<BankOperation>, FormRejection>,
) -> Response {
    let record = match operation
        .map_err(|e| TradeflowError::invalid_record(e.body_text()))
        .and_then(|Form(op)| op.into_record(Local::now().fixed_offset()))
    {
        Ok(r) => r,
        Err(e) => return handle_error(e, &headers),
    };
    let result = with_store(&state, move |s| {
        s.insert_record(&record)?;
        s.load()
    })
    .await;
    match result {
        Ok(doc) => after_form_post(&doc, &headers),
        Err(e) => handle_error(e, &headers),
    }
}

pub async fn delete_record_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let result = with_store(&state, move |s| {
        s.delete_record(&id)?;
        s.load()
    })
    .await;
    match result {
        Ok(doc) => after_form_post(&doc, &headers),
        Err(e) => handle_error(e, &headers),
    }
}

pub async fn reset_form(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let result = with_store(&state, |s| {
        s.reset()?;
        s.load()
    })
    .await;
    match result {
        Ok(doc) => after_form_post(&doc, &headers),
        Err(e) => handle_error(e, &headers),
    }
}

pub async fn not_found() -> Response {
    let page = ErrorPage {
        status: 404,
        message: "Page not found",
    };
    match page.render() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Page not found").into_response(),
    }
}
