//! Document processing workflows.
//!
//! This module coordinates the document lifecycle:
//! - Upload validation and storage
//! - The extraction pipeline (text, OCR, classification, entities, summary)
//! - Background batch runs
//! - Read access to stored documents

mod batch;
mod crud;
mod processing;
mod upload;

pub use batch::{BatchItem, BatchSubmission};
pub use crud::DocumentFile;
