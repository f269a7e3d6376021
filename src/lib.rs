/*!
# HR Dashboard

A browser-based dashboard over an organization's employee roster, built in Rust.
The interface is Arabic and laid out right to left.

## Overview

Employees are loaded from a spreadsheet (or from the persisted employees table)
into an immutable record store. Each signed-in user then narrows that store with
a search and category filter, pages through the result, and derives reports,
charts and exports from whatever the filter currently shows.

## Architecture

### Frontend Layer
- **Technologies**: HTML, CSS, JavaScript (served as static pages)
- **Key Components**:
  - Filter panel - Search text, search column, category dropdowns, birth-date range
  - Data table - Paged view with sequence numbers continuing across pages
  - Reports and charts - Counts, cross tabulations, SVG bar charts
  - Administration - Users and employee records

### Backend Layer
- **Technologies**: Rust, axum, tokio
- **Core Components**:
  - Record Store - Validated employee rows with unique natural keys
  - Filter Engine - Derives views from the store without mutating it
  - Paginator - Page cursor that survives view changes
  - Report Builder - Group-by counts, cross tabulations and summaries
  - Exporter - xlsx, CSV (with BOM) and JSON
  - Auth Gate - Password digests and cookie sessions

### Data Persistence Layer
- SQLite through sqlx, one row per employee keyed by employee number and national ID
- Batch import with per-row error accounting
- Users table for the auth gate

## Modules

- **columns**: The ten employee columns, their identifiers and Arabic labels
- **employee**: Employee record and birth-date handling
- **store**: Record store and derived views
- **loader**: Spreadsheet and CSV ingestion
- **filter**: Search and category filtering
- **pagination**: Page cursor and page slicing
- **report**: Aggregations, cross tabulations and summary statistics
- **export**: Table serialization to xlsx, CSV and JSON
- **graph**: SVG bar charts
- **slides**: Organizational-structure presentation
- **analytics**: Age bands, profiles and per-department overviews
- **notifications**: Incomplete-data and retirement alerts
- **database**: Persistence bridge over SQLite
- **login**: Authentication and session middleware
- **session**: Per-session dashboard state
- **config**: Environment configuration
- **app**: Routing and handlers (feature `web`)

## REST API Endpoints

- `/login`, `/logout` - Session management
- `/api/table`, `/api/table/{next,prev,jump,page_size}` - Paging
- `/api/filter`, `/api/filter/reset`, `/api/filter/options` - Filtering
- `/api/reports/{aggregate,crosstab,age_bands,statistics}` - Reports
- `/api/export`, `/api/slides` - Downloads
- `/api/charts/{column|age|average_age}` - SVG charts; `?by=column` draws grouped bars
- `/api/admin/...` - Users, employee records and database import
*/

pub mod analytics;
pub mod columns;
pub mod config;
pub mod database;
pub mod employee;
pub mod error;
pub mod export;
pub mod filter;
pub mod graph;
pub mod loader;
pub mod login;
pub mod notifications;
pub mod pagination;
pub mod report;
pub mod session;
pub mod slides;
pub mod store;

#[cfg(feature = "web")]
pub mod app;

pub use columns::Field;
pub use employee::{BirthDate, Employee};
pub use error::{DashboardError, Result};
pub use store::{RecordStore, View};
