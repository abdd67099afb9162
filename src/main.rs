mod catalog;
mod config;
mod field_help;
mod launcher;
mod store;
mod tui;

use anyhow::{Context, Result};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // 加载配置
    let path = config::Config::config_path();
    let config = config::Config::load_or_default()
        .with_context(|| format!("读取配置文件 {} 失败", path.display()))?;
    log::debug!("工作目录: {}", config.work_dir.display());

    tui::run(config).await?;

    Ok(())
}
