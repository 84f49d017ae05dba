use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use monitor_client::{
    domain::{Company, DeviceScan, Machine, PendingUser, User, UserUpdate},
    is_queryable_day, DocumentStore, StoreError,
};
use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date, OffsetDateTime, UtcOffset};

use crate::{
    directory::{self, CompanySummary, DeviceScanSummary, FleetSummary, Selection, UserSummary},
    export,
    filter::MetricKind,
    history::{load_history, FetchMode, HistoryError, HistoryFilter, HistoryLimits, HistoryView},
    metrics_server,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub limits: HistoryLimits,
    pub offset: UtcOffset,
}

/// Dashboard API routes. `/metrics` is mounted only when metrics are enabled.
pub fn router(state: AppState, serve_metrics: bool) -> Router {
    let api = Router::new()
        .route("/companies", get(list_companies))
        .route("/companies/:code/users", get(list_users))
        .route("/users/:id", patch(update_user).delete(delete_user))
        .route("/users/:id/pending", post(move_user_to_pending))
        .route("/machines", get(list_machines))
        .route("/machines/:id/history", get(machine_history))
        .route("/machines/:id/history.csv", get(machine_history_csv))
        .route("/devices", get(list_devices))
        .route("/selection", get(selection))
        .with_state(state);

    if serve_metrics {
        api.route("/metrics", get(metrics_server::metrics_handler))
    } else {
        api
    }
}

fn count_request(route: &'static str) {
    metrics::counter!("api_requests_total", "route" => route).increment(1);
}

fn store_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn store_failure(e: StoreError, what: &'static str) -> StatusCode {
    tracing::error!(error = %e, what, "document store request failed");
    store_status(&e)
}

#[derive(Debug, Serialize)]
pub struct CompanyListing {
    pub summary: CompanySummary,
    pub companies: Vec<Company>,
}

pub async fn list_companies(State(state): State<AppState>) -> Result<Json<CompanyListing>, StatusCode> {
    count_request("companies");
    let companies = state
        .store
        .fetch_companies()
        .await
        .map_err(|e| store_failure(e, "companies"))?;

    Ok(Json(CompanyListing {
        summary: directory::company_summary(&companies),
        companies,
    }))
}

#[derive(Debug, Serialize)]
pub struct UserListing {
    pub summary: UserSummary,
    pub users: Vec<User>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<UserListing>, StatusCode> {
    count_request("company_users");
    let users = state
        .store
        .fetch_users_by_company(&code)
        .await
        .map_err(|e| store_failure(e, "users"))?;

    Ok(Json(UserListing {
        summary: directory::user_summary(&users),
        users,
    }))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<UserUpdate>,
) -> Result<StatusCode, StatusCode> {
    count_request("update_user");
    state
        .store
        .update_user(&id, &update)
        .await
        .map_err(|e| store_failure(e, "update user"))?;

    tracing::info!(user_id = %id, "user updated");
    Ok(StatusCode::NO_CONTENT)
}

/// Moves the posted user back to the pending queue. The body must describe
/// the user named in the path.
pub async fn move_user_to_pending(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(user): Json<User>,
) -> Result<Json<PendingUser>, StatusCode> {
    count_request("move_user_to_pending");
    if user.id != id {
        return Err(StatusCode::BAD_REQUEST);
    }

    let pending = state
        .store
        .move_user_to_pending(&user)
        .await
        .map_err(|e| store_failure(e, "move user to pending"))?;

    tracing::info!(user_id = %id, pending_id = %pending.id, "user moved to pending");
    Ok(Json(pending))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    count_request("delete_user");
    state
        .store
        .delete_user(&id)
        .await
        .map_err(|e| store_failure(e, "delete user"))?;

    tracing::info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct MachineParams {
    pub company: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MachineListing {
    pub summary: FleetSummary,
    pub machines: Vec<Machine>,
}

pub async fn list_machines(
    State(state): State<AppState>,
    Query(params): Query<MachineParams>,
) -> Result<Json<MachineListing>, StatusCode> {
    count_request("machines");
    let (machines, companies) = tokio::try_join!(state.store.fetch_machines(), state.store.fetch_companies())
        .map_err(|e| store_failure(e, "machines"))?;

    let code = params.company.unwrap_or_default();
    let machines: Vec<Machine> = directory::machines_for_company(&machines, &companies, &code)
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(MachineListing {
        summary: directory::fleet_summary(&machines),
        machines,
    }))
}

#[derive(Debug, Serialize)]
pub struct DeviceListing {
    pub summary: DeviceScanSummary,
    pub scans: Vec<DeviceScan>,
}

pub async fn list_devices(State(state): State<AppState>) -> Result<Json<DeviceListing>, StatusCode> {
    count_request("devices");
    let scans = state
        .store
        .fetch_device_scans()
        .await
        .map_err(|e| store_failure(e, "device scans"))?;

    Ok(Json(DeviceListing {
        summary: directory::device_scan_summary(&scans),
        scans,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SelectionParams {
    pub company: Option<String>,
    pub machine: Option<String>,
}

/// Resolves which company and machine the history view should show.
///
/// With a company, the given machine is kept only if it belongs to that
/// company. Without one, the machine (if known) picks its own company, else
/// the first company and its first machine are used.
pub async fn selection(
    State(state): State<AppState>,
    Query(params): Query<SelectionParams>,
) -> Result<Json<Selection>, StatusCode> {
    count_request("selection");
    let (machines, companies) = tokio::try_join!(state.store.fetch_machines(), state.store.fetch_companies())
        .map_err(|e| store_failure(e, "selection"))?;

    let resolved = match params.company.filter(|c| !c.is_empty()) {
        Some(code) => Selection {
            machine_id: directory::reconcile_machine(&machines, &companies, &code, params.machine.as_deref()),
            company_code: Some(code),
        },
        None => directory::default_selection(&companies, &machines, params.machine.as_deref()),
    };
    Ok(Json(resolved))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub quick_date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub metric: Option<MetricKind>,
    /// Explicit "apply filters" load with the larger result cap.
    #[serde(default)]
    pub apply: bool,
}

pub fn parse_day(value: Option<&str>) -> Result<Option<Date>, String> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => {
            let day = Date::parse(s, format_description!("[year]-[month]-[day]"))
                .map_err(|e| format!("invalid date '{s}': {e}"))?;
            if !is_queryable_day(day) {
                return Err(format!("date '{s}' is out of range"));
            }
            Ok(Some(day))
        }
        None => Ok(None),
    }
}

impl HistoryParams {
    pub fn to_filter(&self, machine_id: &str, offset: UtcOffset) -> Result<HistoryFilter, String> {
        Ok(HistoryFilter::new(offset)
            .with_machine(machine_id)
            .with_quick_date(parse_day(self.quick_date.as_deref())?)
            .with_from_date(parse_day(self.from.as_deref())?)
            .with_to_date(parse_day(self.to.as_deref())?)
            .with_metric(self.metric.unwrap_or_default()))
    }

    pub fn mode(&self) -> FetchMode {
        if self.apply {
            FetchMode::ApplyFilters
        } else {
            FetchMode::Initial
        }
    }
}

async fn history_view(state: &AppState, machine_id: &str, params: &HistoryParams) -> Result<HistoryView, StatusCode> {
    let filter = params.to_filter(machine_id, state.offset).map_err(|e| {
        tracing::warn!(error = %e, machine_id, "rejected history query");
        StatusCode::BAD_REQUEST
    })?;

    load_history(state.store.as_ref(), &filter, state.limits, params.mode())
        .await
        .map_err(|e| match e {
            HistoryError::NoMachine => StatusCode::BAD_REQUEST,
            HistoryError::Fetch { .. } => StatusCode::SERVICE_UNAVAILABLE,
        })
}

pub async fn machine_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryView>, StatusCode> {
    count_request("machine_history");
    history_view(&state, &id, &params).await.map(Json)
}

/// CSV export of the filtered readings; `204` when there is nothing to export.
pub async fn machine_history_csv(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Response, StatusCode> {
    count_request("machine_history_csv");
    let view = history_view(&state, &id, &params).await?;
    if view.readings.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let machines = state
        .store
        .fetch_machines()
        .await
        .map_err(|e| store_failure(e, "machines"))?;
    let company = machines
        .iter()
        .find(|m| m.id == id)
        .map(|m| m.company.clone())
        .unwrap_or_default();

    let render = || -> Result<(String, String), export::ExportError> {
        let body = export::history_csv_string(&view.readings, &id, &company)?;
        let name = export::export_file_name(&id, OffsetDateTime::now_utc())?;
        Ok((body, name))
    };
    let (body, file_name) = render().map_err(|e| {
        tracing::error!(error = %e, machine_id = %id, "csv export failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    tracing::info!(machine_id = %id, rows = view.readings.len(), "history exported");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        body,
    )
        .into_response())
}
