pub mod client;
pub mod config;
pub mod error;
pub mod file;
pub mod generate;

pub use client::{
    AssetUploader, HttpResponse, HttpTransport, ReqwestTransport, TransportError, UploadClient,
    UploadResult,
};
pub use config::AssetConfig;
pub use error::{GenerateError, UploadError};
pub use file::{ImageFormat, LocalFile};
pub use generate::{AssistKind, Generation, GenerationClient, GenerationRequest, TextGenerator};
pub use reqwest::Url;
