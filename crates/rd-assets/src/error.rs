use thiserror::Error;

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("file is {size} bytes, larger than the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("unsupported file type `{mime}`: only images can be uploaded")]
    UnsupportedType { mime: String },

    /// `status` is absent when the request never got a response.
    #[error("upload failed{}: {body}", status_suffix(.status))]
    UploadFailed { status: Option<u16>, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("insufficient credits: {detail}")]
    InsufficientCredits { detail: String },

    #[error("generation failed{}: {body}", status_suffix(.status))]
    Failed { status: Option<u16>, body: String },
}
