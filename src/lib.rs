pub mod cli;
pub mod config;
pub mod error;
pub mod index;
pub mod layout;
mod metrics;
pub mod navigator;
pub mod scan;
pub mod schema;
pub mod server;
pub mod session;
pub mod store;
pub mod utils;
pub mod value;

pub use config::Opts;
pub use error::{SchemaError, StoreError};
pub use layout::ExportLayout;
pub use schema::{FieldDef, FieldType, Schema};
pub use session::{Session, SessionState};
pub use store::{
    AnnotationStore, DatasetSummary, Record, ReloadIssue, ReloadReport, SaveOutcome,
};
pub use value::FieldValue;
