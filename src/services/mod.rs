//! 业务能力层（Services）
//!
//! 每个服务只描述"我能做什么"，一次只处理一个文档

pub mod downloader;
pub mod extractor;
pub mod filename;
pub mod retry;
pub mod upload;
pub mod validator;

pub use downloader::{place_file, PageDownloader};
pub use extractor::DocumentExtractor;
pub use filename::FilenameSanitizer;
pub use retry::{RetryExecutor, RetryPolicy};
pub use upload::{UploadCoordinator, UploadOutcome};
pub use validator::{DocumentValidator, StructureReport, ValidationRule};
