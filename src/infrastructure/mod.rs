//! 基础设施层（Infrastructure）
//!
//! 持有稀缺资源（浏览器页面、远程存储会话），只暴露能力

pub mod chromium_driver;
pub mod google_drive;
pub mod local_store;
pub mod page_driver;
pub mod remote_store;

pub use chromium_driver::{ChromiumLauncher, ChromiumPageDriver};
pub use google_drive::GoogleDriveStore;
pub use local_store::LocalDirectoryStore;
pub use page_driver::{PageDriver, PageDriverFactory, PageElement, WaitCondition};
pub use remote_store::RemoteStore;
