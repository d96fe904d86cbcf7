use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use job_instruction_downloader::config::{AppConfig, CloudProvider};
use job_instruction_downloader::infrastructure::{
    ChromiumLauncher, GoogleDriveStore, LocalDirectoryStore, RemoteStore,
};
use job_instruction_downloader::models::load_departments;
use job_instruction_downloader::orchestrator::DownloadOrchestrator;
use job_instruction_downloader::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = AppConfig::from_env()?;

    // 初始化日志
    logging::init(&config.logging)?;

    let departments_path = AppConfig::config_dir().join("departments.json");
    let mut departments = load_departments(&departments_path).await?;

    let store: Option<Arc<dyn RemoteStore>> = if config.cloud_storage.enabled {
        let store: Arc<dyn RemoteStore> = match config.cloud_storage.provider {
            CloudProvider::GoogleDrive => {
                Arc::new(GoogleDriveStore::from_settings(&config.cloud_storage)?)
            }
            CloudProvider::Local => Arc::new(LocalDirectoryStore::new(
                config.cloud_storage.local_root.clone(),
            )),
        };
        Some(store)
    } else {
        None
    };

    let launcher = ChromiumLauncher::new(
        config.browser.clone(),
        config.download.temp_directory.clone(),
    );

    // 初始化并运行
    let orchestrator = DownloadOrchestrator::new(config, Box::new(launcher), store)?
        .on_status(|message| info!("📣 {}", message))
        .on_progress(|completed, total| info!("📈 进度: {}/{}", completed, total));
    orchestrator.run(&mut departments).await?;

    Ok(())
}
