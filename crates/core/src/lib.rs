pub mod audit;
pub mod compose;
pub mod config;
pub mod domain;
pub mod errors;
pub mod finance;
pub mod ingest;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
pub use compose::{ComposeInput, DocumentComposer};
pub use config::{AppConfig, BackendKind, ConfigError, LoadOptions};
pub use domain::deviation::{DeviationRecord, DeviationReport, DeviationTotals};
pub use domain::document::{Cell, Column, DocumentKind, DocumentSpec, Section, Table};
pub use domain::line_item::{BillOfQuantities, LineItem};
pub use domain::meta::ProjectMeta;
pub use domain::summary::{Deductions, FinancialSummary};
pub use errors::IngestError;
pub use finance::{DeductionRates, FinancialEngine, StandardFinancialEngine};
pub use ingest::{IngestReport, Ingested, SheetIngestor};
