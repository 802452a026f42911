/*!
# Growth Sheet

Tracks a child's developmental-assessment scores across repeated measurement
sessions, built in Rust.

## Overview

Each session is one spreadsheet (Excel, ODS or CSV) whose first column names
the assessed items and whose remaining columns hold scores per category, such
as 認知 (cognition), 言語理解 (language comprehension) or 運動 (motor skills).
Sessions are uploaded in measurement order with a date label. The application
averages every category per session, plots how a chosen category develops over
time, draws the latest session as a radar chart and can fit a least-squares
trend line with its error and R².

## Architecture

### Frontend Layer
- **Technologies**: HTML, JavaScript
- Upload slots (file + date per session), column and summary selectors

### Backend Layer
- **Technologies**: Rust, axum (feature `web`)
- **Core Components**:
  - Loader - Reads the configured cell range of each uploaded sheet
  - Session Aggregator - Common columns, per-session means, changes, series
  - Trend Fit - Ordinary least squares over the session index
  - Report - Collects results and user-visible warnings for one run
  - Chart Renderer - Line and radar charts as PNG (plotters)
  - Export - Per-session averages as CSV or XLSX

Nothing is persisted: an aggregator lives for one run (one upload batch or one
CLI invocation).

## Modules

- **cell**: Cell values (number, text, missing)
- **table**: Parsed tables and their normalization
- **config**: Sheet range, allowed columns and policies
- **error**: Error taxonomy and user-visible warnings
- **loader**: Spreadsheet and CSV input
- **aggregator**: Multi-session aggregation
- **trend**: Least-squares trend fit
- **report**: Per-run analysis report
- **graph**: Chart rendering
- **downloader**: Summary export
- **app**: Routing for the web front end

## REST API Endpoints

- `/api/config` - Upload slot count and active configuration
- `/api/upload` - Multipart batch of session files and labels
- `/api/report` - Report for the current run
- `/api/chart/line`, `/api/chart/radar` - PNG charts
- `/api/export/csv`, `/api/export/xlsx` - Per-session averages
*/

pub mod aggregator;
#[cfg(feature = "web")]
pub mod app;
pub mod cell;
pub mod config;
pub mod downloader;
pub mod error;
pub mod graph;
pub mod loader;
pub mod report;
pub mod table;
pub mod trend;

/// Re-export the types most callers need
pub use aggregator::{AggregateRow, RadarSnapshot, SeriesPoint, SessionAggregator};
pub use cell::CellValue;
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result, Warning};
pub use report::{AnalysisReport, SummaryKind};
pub use table::Table;
pub use trend::{TrendFit, fit_trend};
