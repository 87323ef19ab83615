pub mod metrics;
pub mod profile_file;

pub use metrics::{init_metrics, record_snapshot, serve_metrics, CounterCursor};
pub use profile_file::{load_profile_document, parse_profile_document, ProfileDocument, ProfileFileError};
