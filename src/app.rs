//! HTTP surface: routing, application state and the dashboard handlers.
//!
//! Every handler answers JSON shaped `{ "status": "ok", ... }` or
//! `{ "status": "error", "message": ... }`, except downloads and charts,
//! which answer the file itself.

use crate::analytics::{self, profile};
use crate::columns::{ALL_SENTINEL, Field};
use crate::config::Config;
use crate::database::{EmployeePatch, EmployeeRepository, open_pool};
use crate::employee::Employee;
use crate::error::{DashboardError, Result};
use crate::export::{self, Format};
use crate::filter::{FilterConfig, FilterRequest};
use crate::graph::{self, GraphOptions};
use crate::loader;
use crate::login::{self, AuthGate, Principal, SessionId};
use crate::notifications;
use crate::pagination::{Page, checked_page_size};
use crate::report::{self, Table};
use crate::session::{DataSource, SessionContext, SessionStore};
use crate::slides;
use crate::store::RecordStore;
use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{Local, NaiveDate};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

const UPLOAD_LIMIT: usize = 20 * 1024 * 1024;

/// Shared, cheaply cloned application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: AuthGate,
    pub sessions: SessionStore,
    /// `None` when persistence is disabled
    pub repo: Option<EmployeeRepository>,
    default_store: RecordStore,
    default_source: DataSource,
}

impl AppState {
    /// Connect the database (if configured), set up the auth gate and load
    /// the default record store.
    ///
    /// A database that cannot be opened disables persistence instead of
    /// failing startup. Users then live in an in-memory table.
    pub async fn build(config: Config) -> Result<Self> {
        let repo = match &config.database_url {
            Some(url) => match EmployeeRepository::connect(url).await {
                Ok(repo) => Some(repo),
                Err(e) => {
                    error!("Database unavailable, persistence disabled: {}", e);
                    None
                }
            },
            None => {
                warn!("DATABASE_URL not set; persistence disabled");
                None
            }
        };

        let auth_pool = match &repo {
            Some(repo) => repo.pool().clone(),
            None => open_pool("sqlite::memory:").await?,
        };
        let auth = AuthGate::new(
            auth_pool,
            &config.bootstrap_admin_id,
            config.bootstrap_admin_password.as_deref(),
        )
        .await?;

        let (default_store, default_source) = initial_data(&config, repo.as_ref()).await;
        info!(
            "Default data: {} employees from {:?}",
            default_store.len(),
            default_source
        );

        Ok(AppState {
            config: Arc::new(config),
            auth,
            sessions: SessionStore::new(),
            repo,
            default_store,
            default_source,
        })
    }

    /// Record store a new session starts with
    pub fn default_data(&self) -> (RecordStore, DataSource) {
        (self.default_store.clone(), self.default_source.clone())
    }

    fn repo(&self) -> Result<&EmployeeRepository> {
        self.repo
            .as_ref()
            .ok_or_else(|| DashboardError::validation("the database is not configured"))
    }

    /// Run `f` against the caller's session
    async fn session<R>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut SessionContext) -> Result<R>,
    ) -> Result<R> {
        self.sessions.with(&id.0, f).await.ok_or(DashboardError::Auth)?
    }
}

async fn initial_data(config: &Config, repo: Option<&EmployeeRepository>) -> (RecordStore, DataSource) {
    if config.data_file.exists() {
        match loader::load_path(&config.data_file) {
            Ok(store) => {
                return (store, DataSource::File(config.data_file.display().to_string()));
            }
            Err(e) => error!("Could not load {}: {}", config.data_file.display(), e),
        }
    }
    if let Some(repo) = repo {
        match repo.load_store().await {
            Ok(store) => return (store, DataSource::Database),
            Err(e) => error!("Could not load employees from the database: {}", e),
        }
    }
    (RecordStore::empty(), DataSource::None)
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::Validation(_)
            | DashboardError::OutOfRange { .. }
            | DashboardError::Spreadsheet(_) => StatusCode::BAD_REQUEST,
            DashboardError::DuplicateKey(_) => StatusCode::CONFLICT,
            DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::Auth => StatusCode::UNAUTHORIZED,
            DashboardError::Forbidden(_) => StatusCode::FORBIDDEN,
            DashboardError::Io(_)
            | DashboardError::Persistence(_)
            | DashboardError::Export(_)
            | DashboardError::Chart(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("{}", self);
        }
        let body = json!({
            "status": "error",
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// `{ "status": "ok", "data": ... }`
pub fn ok<T: Serialize + ?Sized>(data: &T) -> Json<Value> {
    Json(json!({ "status": "ok", "data": data }))
}

/// `{ "status": "ok", "message": ... }`
pub fn ok_message(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "status": "ok", "message": message.into() }))
}

fn download(bytes: Vec<u8>, mime: &str, file_name: &str) -> Response {
    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    );
    (
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a column given by identifier or display label
fn parse_field(raw: &str) -> Result<Field> {
    Field::from_header(raw)
        .ok_or_else(|| DashboardError::validation(format!("unknown column `{}`", raw.trim())))
}

fn parse_fields(raw: &str) -> Result<Vec<Field>> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_field)
        .collect()
}

/// Build the router over `state`
pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/api/admin/users", get(login::list_users).post(login::add_user))
        .route("/api/admin/users/:login_id", axum::routing::delete(login::delete_user))
        .route("/api/admin/employees", post(add_employee))
        .route(
            "/api/admin/employees/:employee_id",
            put(update_employee).delete(delete_employee),
        )
        .route("/api/admin/import", post(import_employees))
        .route_layer(middleware::from_fn(login::require_admin));

    let protected = Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/me", get(login::whoami))
        .route("/api/account/password", post(login::change_password))
        .route("/api/employees/:employee_id", get(employee_profile))
        .route("/api/table", get(table_page))
        .route("/api/table/next", post(table_next))
        .route("/api/table/prev", post(table_prev))
        .route("/api/table/jump", post(table_jump))
        .route("/api/table/page_size", post(table_page_size))
        .route("/api/filter", post(apply_filter))
        .route("/api/filter/reset", post(reset_filter))
        .route("/api/filter/options", get(filter_options))
        .route("/api/summary", get(summary))
        .route("/api/org", get(org_structure))
        .route("/api/charts/:chart", get(chart))
        .route("/api/reports/aggregate", get(aggregate_report))
        .route("/api/reports/crosstab", get(crosstab_report))
        .route("/api/reports/age_bands", get(age_band_report))
        .route("/api/reports/statistics", get(statistics_report))
        .route("/api/export", get(export_view))
        .route("/api/slides", get(export_slides))
        .route("/api/notifications", get(list_notifications))
        .route("/api/upload", post(upload))
        .route("/api/source", post(switch_source))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login::require_auth,
        ));

    Router::new()
        .route(
            "/login",
            get(login::serve_login_page).post(login::handle_login),
        )
        .route("/logout", get(login::handle_logout).post(login::handle_logout))
        .merge(protected)
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the state, bind and serve until the process is stopped
pub async fn run(config: Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let state = AppState::build(config).await?;
    let addr = state.config.bind_addr.clone();
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(include_str!("static/dashboard.html"))
}

async fn employee_profile(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(employee_id): Path<String>,
) -> Result<Json<Value>> {
    let policy = state.config.retirement;
    let card = state
        .session(&session, |ctx| {
            ctx.store()
                .find(&employee_id)
                .map(|e| profile(e, today(), &policy))
                .ok_or_else(|| DashboardError::NotFound(format!("employee number {}", employee_id.trim())))
        })
        .await?;
    Ok(ok(&card))
}

#[derive(Serialize)]
struct PageBody {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    current_page: usize,
    page_count: usize,
    page_size: usize,
    total_rows: usize,
}

impl From<Page> for PageBody {
    fn from(page: Page) -> Self {
        let (headers, rows) = page.grid();
        PageBody {
            headers,
            rows,
            current_page: page.current_page,
            page_count: page.page_count,
            page_size: page.page_size,
            total_rows: page.total_rows,
        }
    }
}

async fn table_page(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<Value>> {
    let page = state.session(&session, |ctx| ctx.page()).await?;
    Ok(ok(&PageBody::from(page)))
}

async fn table_next(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<Value>> {
    let page = state.session(&session, |ctx| ctx.next_page()).await?;
    Ok(ok(&PageBody::from(page)))
}

async fn table_prev(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<Value>> {
    let page = state.session(&session, |ctx| ctx.prev_page()).await?;
    Ok(ok(&PageBody::from(page)))
}

#[derive(Deserialize)]
struct JumpRequest {
    page: usize,
}

async fn table_jump(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(req): Json<JumpRequest>,
) -> Result<Json<Value>> {
    let page = state.session(&session, |ctx| ctx.jump(req.page)).await?;
    Ok(ok(&PageBody::from(page)))
}

#[derive(Deserialize)]
struct PageSizeRequest {
    page_size: usize,
}

async fn table_page_size(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(req): Json<PageSizeRequest>,
) -> Result<Json<Value>> {
    let size = checked_page_size(req.page_size)?;
    let page = state
        .session(&session, |ctx| {
            ctx.set_page_size(size);
            ctx.page()
        })
        .await?;
    Ok(ok(&PageBody::from(page)))
}

async fn apply_filter(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(req): Json<FilterRequest>,
) -> Result<Json<Value>> {
    let config = FilterConfig::try_from(req)?;
    let page = state
        .session(&session, |ctx| {
            ctx.apply_filter(config)?;
            ctx.page()
        })
        .await?;
    Ok(ok(&PageBody::from(page)))
}

async fn reset_filter(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<Value>> {
    let page = state
        .session(&session, |ctx| {
            ctx.reset_filter();
            ctx.page()
        })
        .await?;
    Ok(ok(&PageBody::from(page)))
}

async fn filter_options(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<Value>> {
    let options = state
        .session(&session, |ctx| {
            let sorted = |field: Field| {
                let mut values = ctx.store().distinct(field);
                values.sort();
                values
            };
            let mut columns = vec![json!({ "ident": "all", "label": ALL_SENTINEL })];
            columns.extend(
                Field::ALL
                    .iter()
                    .filter(|f| f.is_text())
                    .map(|f| json!({ "ident": f.ident(), "label": f.label() })),
            );
            Ok(json!({
                "search_columns": columns,
                "department": sorted(Field::Department),
                "job_category": sorted(Field::JobCategory),
                "workplace": sorted(Field::Workplace),
                "source": ctx.source(),
            }))
        })
        .await?;
    Ok(ok(&options))
}

async fn summary(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<Value>> {
    let body = state
        .session(&session, |ctx| {
            let view = ctx.view();
            Ok(json!({
                "summary": report::summary(view),
                "average_age": analytics::average_age(view.rows(), today()),
                "average_age_by_department": analytics::average_age_by_department(view, today()),
            }))
        })
        .await?;
    Ok(ok(&body))
}

async fn org_structure(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<Value>> {
    let overview = state
        .session(&session, |ctx| Ok(analytics::department_overview(ctx.view(), today())))
        .await?;
    Ok(ok(&overview))
}

#[derive(Deserialize)]
struct ChartQuery {
    max_bars: Option<usize>,
    /// Second field for grouped bars
    by: Option<String>,
}

/// `age` renders the age histogram and `average_age` the per-department
/// average; anything else names a categorical column, grouped by `by` when
/// given
async fn chart(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(chart): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Result<Response> {
    let svg = state
        .session(&session, |ctx| match chart.as_str() {
            "age" => {
                let options = GraphOptions {
                    title: "توزيع الموظفين حسب الفئة العمرية".to_string(),
                    ..GraphOptions::default()
                };
                graph::age_histogram(ctx.view(), today(), &options)
            }
            "average_age" => {
                let options = GraphOptions {
                    title: "متوسط العمر حسب الإدارة".to_string(),
                    x_label: Field::Department.label().to_string(),
                    y_label: "متوسط العمر".to_string(),
                    ..GraphOptions::default()
                };
                graph::average_age_chart(ctx.view(), today(), &options)
            }
            raw => {
                let field = parse_field(raw)?;
                match query.by.as_deref().filter(|by| !by.is_empty()) {
                    Some(by) => {
                        let by = parse_field(by)?;
                        let options = GraphOptions {
                            title: format!("{} حسب {}", field.label(), by.label()),
                            x_label: field.label().to_string(),
                            ..GraphOptions::default()
                        };
                        graph::crosstab_chart(ctx.view(), field, by, &options)
                    }
                    None => {
                        let options = GraphOptions {
                            max_bars: query.max_bars,
                            ..GraphOptions::for_field(field)
                        };
                        graph::category_chart(ctx.view(), field, &options)
                    }
                }
            }
        })
        .await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

#[derive(Deserialize)]
struct ReportQuery {
    fields: Option<String>,
    row: Option<String>,
    col: Option<String>,
    #[serde(default)]
    margins: bool,
    format: Option<String>,
}

/// JSON table when no format is requested, otherwise a file download
fn table_response(table: Table, format: Option<&str>, stem: &str) -> Result<Response> {
    match format {
        None | Some("") | Some("table") => Ok(ok(&table).into_response()),
        Some(raw) => {
            let format: Format = raw.parse()?;
            let bytes = export::serialize(&table, format)?;
            let name = format.file_name(stem, Local::now().naive_local());
            Ok(download(bytes, format.mime_type(), &name))
        }
    }
}

async fn aggregate_report(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<ReportQuery>,
) -> Result<Response> {
    let fields = parse_fields(query.fields.as_deref().unwrap_or(""))?;
    let table = state
        .session(&session, |ctx| Ok(report::aggregate(ctx.view(), &fields)?.to_table()))
        .await?;
    table_response(table, query.format.as_deref(), "detailed_report")
}

async fn crosstab_report(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<ReportQuery>,
) -> Result<Response> {
    let row = parse_field(query.row.as_deref().unwrap_or(""))?;
    let col = parse_field(query.col.as_deref().unwrap_or(""))?;
    let table = state
        .session(&session, |ctx| {
            Ok(report::crosstab(ctx.view(), row, col, query.margins)?.to_table())
        })
        .await?;
    table_response(table, query.format.as_deref(), "crosstab_report")
}

async fn age_band_report(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<ReportQuery>,
) -> Result<Response> {
    let table = state
        .session(&session, |ctx| {
            Ok(analytics::age_bands_by_department(ctx.view(), today()).to_table())
        })
        .await?;
    table_response(table, query.format.as_deref(), "age_report")
}

async fn statistics_report(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Response> {
    let sheets = state
        .session(&session, |ctx| report::statistical_report(ctx.view()))
        .await?;
    let bytes = export::to_workbook(&sheets)?;
    let name = Format::Xlsx.file_name("statistical_report", Local::now().naive_local());
    Ok(download(bytes, Format::Xlsx.mime_type(), &name))
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
    columns: Option<String>,
    /// `page` exports only the current page
    scope: Option<String>,
}

async fn export_view(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let format: Format = query.format.as_deref().unwrap_or("xlsx").parse()?;
    let columns = match query.columns.as_deref() {
        Some(raw) if !raw.trim().is_empty() => parse_fields(raw)?,
        _ => Field::ALL.to_vec(),
    };
    let page_only = query.scope.as_deref() == Some("page");
    let (table, stem) = state
        .session(&session, |ctx| {
            if page_only {
                let page = ctx.page()?;
                let headers = columns.iter().map(|f| f.label().to_string()).collect();
                let rows = page
                    .rows
                    .iter()
                    .map(|r| columns.iter().map(|f| r.employee.display(*f)).collect())
                    .collect();
                let stem = format!("employee_data_page_{}", page.current_page);
                Ok((Table::new(headers, rows), stem))
            } else {
                let table = Table::from_view_columns(ctx.view(), &columns);
                Ok((table, "data_export".to_string()))
            }
        })
        .await?;
    let bytes = export::serialize(&table, format)?;
    let name = format.file_name(&stem, Local::now().naive_local());
    Ok(download(bytes, format.mime_type(), &name))
}

async fn export_slides(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Response> {
    let bytes = state
        .session(&session, |ctx| slides::build(ctx.view(), today()))
        .await?;
    Ok(download(bytes, slides::MIME_TYPE, "organizational_structure.pptx"))
}

async fn list_notifications(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<Value>> {
    let policy = state.config.retirement;
    let list = state
        .session(&session, |ctx| Ok(notifications::check(ctx.view(), today(), &policy)))
        .await?;
    Ok(ok(&list))
}

/// First file part of a multipart body plus the remaining text fields
struct UploadedForm {
    file: Option<(String, Vec<u8>)>,
    fields: Vec<(String, String)>,
}

async fn read_multipart(mut multipart: Multipart) -> Result<UploadedForm> {
    let mut form = UploadedForm {
        file: None,
        fields: Vec::new(),
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DashboardError::validation(format!("malformed upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) if form.file.is_none() => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| DashboardError::validation(format!("malformed upload: {e}")))?;
                form.file = Some((file_name, bytes.to_vec()));
            }
            Some(_) => {}
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| DashboardError::validation(format!("malformed upload: {e}")))?;
                form.fields.push((name, text));
            }
        }
    }
    Ok(form)
}

async fn upload(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let form = read_multipart(multipart).await?;
    let (file_name, bytes) = form
        .file
        .ok_or_else(|| DashboardError::validation("no file was uploaded"))?;
    let store = loader::load_upload(&file_name, &bytes)?;
    let count = store.len();
    info!("Uploaded {} with {} employees", file_name, count);
    state
        .session(&session, |ctx| {
            ctx.set_store(store, DataSource::Upload(file_name));
            Ok(())
        })
        .await?;
    Ok(ok_message(format!("تم تحميل {count} موظف")))
}

#[derive(Deserialize)]
struct SourceRequest {
    source: String,
}

async fn switch_source(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(req): Json<SourceRequest>,
) -> Result<Json<Value>> {
    let (store, source) = match req.source.as_str() {
        "database" => (state.repo()?.load_store().await?, DataSource::Database),
        "file" | "default" => state.default_data(),
        other => {
            return Err(DashboardError::validation(format!("unknown data source `{other}`")));
        }
    };
    let count = store.len();
    state
        .session(&session, |ctx| {
            ctx.set_store(store, source);
            Ok(())
        })
        .await?;
    Ok(ok_message(format!("تم تحميل {count} موظف")))
}

/// Reload the caller's store from the database after a write, when the
/// session is looking at the database
async fn refresh_from_database(state: &AppState, session: &SessionId) -> Result<()> {
    let on_database = state
        .session(session, |ctx| Ok(*ctx.source() == DataSource::Database))
        .await?;
    if on_database {
        let store = state.repo()?.load_store().await?;
        state
            .session(session, |ctx| {
                ctx.set_store(store, DataSource::Database);
                Ok(())
            })
            .await?;
    }
    Ok(())
}

async fn add_employee(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(employee): Json<Employee>,
) -> Result<Json<Value>> {
    state.repo()?.add_one(&employee).await?;
    refresh_from_database(&state, &session).await?;
    Ok(ok_message("تمت إضافة الموظف بنجاح."))
}

async fn update_employee(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(employee_id): Path<String>,
    Json(patch): Json<EmployeePatch>,
) -> Result<Json<Value>> {
    if patch.is_empty() {
        return Err(DashboardError::validation("nothing to update"));
    }
    let employee = state.repo()?.update_one(&employee_id, &patch).await?;
    refresh_from_database(&state, &session).await?;
    Ok(Json(json!({
        "status": "ok",
        "message": "تم تحديث بيانات الموظف بنجاح.",
        "data": employee,
    })))
}

async fn delete_employee(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(employee_id): Path<String>,
) -> Result<Json<Value>> {
    state.repo()?.delete_one(&employee_id).await?;
    refresh_from_database(&state, &session).await?;
    Ok(ok_message("تم حذف الموظف بنجاح."))
}

/// Import an uploaded file, or the caller's current store when no file is
/// attached. A `replace_existing` field of `true` empties the table first.
async fn import_employees(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let form = read_multipart(multipart).await?;
    let replace_existing = form
        .fields
        .iter()
        .any(|(name, value)| name == "replace_existing" && matches!(value.trim(), "true" | "on" | "1"));
    let rows = match form.file {
        Some((file_name, bytes)) => loader::read_upload(&file_name, &bytes)?,
        None => {
            state
                .session(&session, |ctx| Ok(ctx.store().rows().to_vec()))
                .await?
        }
    };
    info!(
        "`{}` importing {} rows (replace existing: {})",
        principal.login_id,
        rows.len(),
        replace_existing
    );
    let summary = state.repo()?.upsert_batch(&rows, replace_existing).await?;
    refresh_from_database(&state, &session).await?;
    Ok(Json(json!({
        "status": "ok",
        "message": summary.message(),
        "data": summary,
    })))
}
