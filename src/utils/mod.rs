pub mod logging;
pub mod timing;

pub use timing::OperationTimer;
