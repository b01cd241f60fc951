//! Upload ingestion: naming, validation, persistence, edits and deletion of
//! samples and their files.

pub mod naming;
mod pending;
pub mod pipeline;
mod sanitize;

pub use pending::{PendingUpload, PendingUploads};
pub use pipeline::{SampleEdit, UploadedSample};
pub use sanitize::sanitize_error;
