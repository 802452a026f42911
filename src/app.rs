use axum::{
    Json, Router,
    body::Body,
    extract::{Multipart, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::aggregator::SessionAggregator;
use crate::config::AnalysisConfig;
use crate::downloader;
use crate::error::{AnalysisError, Warning, WarningKind};
use crate::graph::{self, GraphOptions};
use crate::loader;
use crate::report::{AnalysisReport, SummaryKind};
use crate::trend::fit_trend;

/// Aggregator for the current run; every upload batch replaces it.
pub struct AppState {
    config: AnalysisConfig,
    aggregator: Mutex<SessionAggregator>,
}

impl AppState {
    pub fn new(config: AnalysisConfig) -> Self {
        let aggregator = SessionAggregator::new(config.clone());
        Self {
            config,
            aggregator: Mutex::new(aggregator),
        }
    }

    fn aggregator(&self) -> MutexGuard<'_, SessionAggregator> {
        // A poisoned lock only means a previous request panicked mid-read.
        self.aggregator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Deserialize)]
struct ChartQuery {
    column: Option<String>,
    #[serde(default)]
    trend: bool,
    max: Option<f64>,
}

#[derive(Deserialize)]
struct ReportQuery {
    column: Option<String>,
    summary: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
}

/// Files of one multipart batch in arrival order. A `label` part belongs to
/// the file part directly before it, even when that file was empty.
#[derive(Default)]
struct UploadBatch {
    files: Vec<PendingFile>,
}

struct PendingFile {
    name: String,
    bytes: Vec<u8>,
    label: String,
}

impl UploadBatch {
    fn push_file(&mut self, name: String, bytes: Vec<u8>) {
        self.files.push(PendingFile {
            name,
            bytes,
            label: String::new(),
        });
    }

    fn set_label(&mut self, label: String) {
        if let Some(last) = self.files.last_mut() {
            last.label = label;
        }
    }

    fn truncate(&mut self, slots: usize) {
        if self.files.len() > slots {
            log::warn!(
                "{} files uploaded, only the first {} are used",
                self.files.len(),
                slots
            );
            self.files.truncate(slots);
        }
    }

    /// Loads every file into a fresh aggregator; unreadable or empty files
    /// become warnings.
    fn ingest(self, config: &AnalysisConfig) -> (SessionAggregator, Vec<Warning>) {
        let mut aggregator = SessionAggregator::new(config.clone());
        let mut warnings = Vec::new();
        for file in self.files {
            let loaded = if file.bytes.is_empty() {
                Err(AnalysisError::EmptyInput("file is empty".to_string()))
            } else {
                loader::load_table_bytes(&file.name, file.bytes, &config.range)
            };
            match loaded {
                Ok(table) => aggregator.ingest(table, &file.label),
                Err(e) => {
                    log::warn!("skipping {}: {}", file.name, e);
                    warnings.push(Warning::new(
                        WarningKind::EmptyInput,
                        format!("{}: {}", file.name, e),
                    ));
                }
            }
        }
        (aggregator, warnings)
    }
}

#[derive(Serialize)]
struct UploadResponse {
    status: String,
    ingested: usize,
    #[serde(flatten)]
    report: AnalysisReport,
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let status = match &self {
            AnalysisError::MissingColumn { .. } => StatusCode::NOT_FOUND,
            AnalysisError::EmptyInput(_) | AnalysisError::InsufficientData { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AnalysisError::UnsupportedFormat(_)
            | AnalysisError::Spreadsheet(_)
            | AnalysisError::Csv(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("{}", self);
        }
        (
            status,
            Json(ErrorResponse {
                status: "error".to_string(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Builds the router; split out of [`run`] so tests can drive it directly.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_landing))
        .route("/api/config", get(get_config))
        .route("/api/upload", post(upload_sessions))
        .route("/api/report", get(get_report))
        .route("/api/chart/line", get(line_chart))
        .route("/api/chart/radar", get(radar_chart))
        .route("/api/export/csv", get(export_csv))
        .route("/api/export/xlsx", get(export_xlsx))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: &str, config: AnalysisConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Arc::new(AppState::new(config)));

    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.clone())
}

/// Accepts one multipart batch: repeated `file` parts, each optionally
/// followed by a `label` part, plus optional `column` and `summary` fields.
///
/// Files that cannot be read are reported as warnings and the rest of the
/// batch is still analyzed.
async fn upload_sessions(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AnalysisError> {
    let mut batch = UploadBatch::default();
    let mut column = None;
    let mut summary = SummaryKind::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AnalysisError::EmptyInput(e.to_string()))?
    {
        let name = field.name().unwrap_or("unknown").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.xlsx").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AnalysisError::EmptyInput(e.to_string()))?;
                batch.push_file(file_name, bytes.to_vec());
            }
            "label" => batch.set_label(field.text().await.unwrap_or_default()),
            "column" => {
                let text = field.text().await.unwrap_or_default();
                if !text.trim().is_empty() {
                    column = Some(text.trim().to_string());
                }
            }
            "summary" => {
                let text = field.text().await.unwrap_or_default();
                summary = text.parse().unwrap_or_default();
            }
            other => log::debug!("ignoring multipart field {}", other),
        }
    }

    if batch.files.is_empty() {
        return Err(AnalysisError::EmptyInput("no files uploaded".to_string()));
    }
    batch.truncate(state.config.upload_slots);
    let (fresh, mut load_warnings) = batch.ingest(&state.config);

    let mut report = AnalysisReport::build(&fresh, column.as_deref(), summary)?;
    load_warnings.append(&mut report.warnings);
    report.warnings = load_warnings;
    let ingested = fresh.session_count();
    *state.aggregator() = fresh;

    Ok(Json(UploadResponse {
        status: "ok".to_string(),
        ingested,
        report,
    }))
}

async fn get_report(
    Query(params): Query<ReportQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalysisReport>, AnalysisError> {
    let summary = params
        .summary
        .as_deref()
        .map(|s| s.parse().unwrap_or_default())
        .unwrap_or_default();
    let aggregator = state.aggregator();
    let report = AnalysisReport::build(&aggregator, params.column.as_deref(), summary)?;
    Ok(Json(report))
}

async fn line_chart(
    Query(params): Query<ChartQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AnalysisError> {
    let aggregator = state.aggregator();
    let column = match params.column {
        Some(column) => column,
        None => aggregator
            .default_column()
            .ok_or_else(|| AnalysisError::EmptyInput("no numeric common columns".to_string()))?,
    };
    let series = aggregator.series_for(&column)?;
    let trend = if params.trend {
        Some(fit_trend(&series)?)
    } else {
        None
    };
    drop(aggregator);

    let options = GraphOptions {
        title: format!("{} の推移", column),
        ..GraphOptions::default()
    };
    let png = graph::create_line_chart(&series, trend.as_ref(), &options)?;
    Ok(png_response(png))
}

async fn radar_chart(
    Query(params): Query<ChartQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AnalysisError> {
    let snapshot = state.aggregator().latest_snapshot()?;
    let options = GraphOptions {
        title: "最新の結果".to_string(),
        width: 600,
        height: 600,
        ..GraphOptions::default()
    };
    let png = graph::create_radar_chart(&snapshot, params.max, &options)?;
    Ok(png_response(png))
}

async fn export_csv(State(state): State<Arc<AppState>>) -> Result<Response, AnalysisError> {
    let csv = downloader::to_csv(&state.aggregator())?;
    Ok(download_response(
        "text/csv; charset=utf-8",
        "averages.csv",
        csv.into_bytes(),
    ))
}

async fn export_xlsx(State(state): State<Arc<AppState>>) -> Result<Response, AnalysisError> {
    let xlsx = downloader::to_xlsx(&state.aggregator())?;
    Ok(download_response(
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "averages.xlsx",
        xlsx,
    ))
}

fn png_response(png: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], Body::from(png)).into_response()
}

fn download_response(content_type: &'static str, file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        Body::from(bytes),
    )
        .into_response()
}
