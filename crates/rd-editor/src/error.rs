use rd_assets::{GenerateError, UploadError};
use rd_core::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("select some text first")]
    NoSelection,

    #[error("insufficient credits: {detail}")]
    InsufficientCredits { detail: String },

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Generation(GenerateError),

    #[error("the editor is read-only")]
    NotEditable,

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<GenerateError> for EditorError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::InsufficientCredits { detail } => {
                EditorError::InsufficientCredits { detail }
            }
            other => EditorError::Generation(other),
        }
    }
}
