//! Turning finished station records into output documents.

use thiserror::Error;

use crate::domain::StationRecord;

pub mod iso;

pub use iso::IsoRenderer;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("record has an empty identifier")]
    EmptyIdentifier,
}

/// Produces the text of one output document per record.
pub trait Renderer: Sync {
    fn render(&self, record: &StationRecord) -> Result<String, RenderError>;

    /// File extension for rendered documents, without the dot.
    fn extension(&self) -> &'static str {
        "xml"
    }
}
