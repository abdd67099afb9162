//! 导入启动器：导出临时 CSV，调用外部导入脚本，结束后回放脚本日志

use crate::config::{Config, TenantConfig};
use crate::store::{ImportStore, StoreError};
use chrono::{Local, NaiveDateTime};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("租户配置无效: {0}")]
    InvalidConfig(String),
    #[error("缺少依赖文件: {}", format_paths(.0))]
    MissingDependency(Vec<PathBuf>),
    #[error("导出临时 CSV 失败: {0}")]
    Export(#[source] StoreError),
    #[error("无法启动导入进程: {0}")]
    ProcessStart(#[source] io::Error),
    #[error("导入进程异常退出 (exit={code:?})")]
    ProcessFailed { code: Option<i32> },
    #[error("文件读写失败: {0}")]
    Io(#[from] io::Error),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 一次导入的结果
#[derive(Debug, Clone)]
pub struct LaunchReport {
    pub csv_path: PathBuf,
    pub log_file: Option<PathBuf>,
    /// 回放的日志行数
    pub lines: usize,
    pub csv_removed: bool,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ImportLauncher {
    shell: String,
    shell_args: Vec<String>,
    script: PathBuf,
    required_files: Vec<PathBuf>,
    work_dir: PathBuf,
    log_prefix: String,
}

impl ImportLauncher {
    pub fn from_config(config: &Config) -> Self {
        Self {
            shell: config.import_shell.clone(),
            shell_args: config.import_shell_args.clone(),
            script: config.import_script.clone(),
            required_files: config.required_files.clone(),
            work_dir: config.work_dir.clone(),
            log_prefix: config.log_prefix.clone(),
        }
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.work_dir.join("Logs")
    }

    /// 租户 ID 必须是域名形式（点号两侧都有内容），Client ID 不能为空
    pub fn validate_tenant(tenant: &TenantConfig) -> Result<(), LaunchError> {
        let tenant_id = tenant.tenant_id.trim();
        let domain_like = tenant_id
            .split_once('.')
            .map(|(head, tail)| !head.is_empty() && !tail.is_empty())
            .unwrap_or(false);
        if !domain_like {
            return Err(LaunchError::InvalidConfig(format!(
                "租户 ID {:?} 不是域名形式",
                tenant.tenant_id
            )));
        }
        if tenant.client_id.trim().is_empty() {
            return Err(LaunchError::InvalidConfig("Client ID 为空".to_string()));
        }
        Ok(())
    }

    /// 列出所有缺失的依赖文件（导入脚本 + required_files）
    pub fn missing_dependencies(&self) -> Vec<PathBuf> {
        std::iter::once(&self.script)
            .chain(self.required_files.iter())
            .filter(|p| !p.is_file())
            .cloned()
            .collect()
    }

    /// 启动前检查，任何副作用之前完成
    pub fn preflight(&self, tenant: &TenantConfig) -> Result<(), LaunchError> {
        Self::validate_tenant(tenant)?;
        let missing = self.missing_dependencies();
        if !missing.is_empty() {
            return Err(LaunchError::MissingDependency(missing));
        }
        Ok(())
    }

    fn import_args(&self, csv_path: &Path, tenant: &TenantConfig) -> Vec<String> {
        let mut args = self.shell_args.clone();
        args.extend([
            self.script.display().to_string(),
            "-CsvFile".to_string(),
            csv_path.display().to_string(),
            "-TenantID".to_string(),
            tenant.tenant_id.trim().to_string(),
            "-ClientID".to_string(),
            tenant.client_id.trim().to_string(),
            "-RedirectURL".to_string(),
            tenant.redirect_uri.trim().to_string(),
            "-WorkingFolder".to_string(),
            self.work_dir.display().to_string(),
            "-Force".to_string(),
            "-SkipModuleCheck".to_string(),
        ]);
        args
    }

    /// 执行一次导入。
    ///
    /// 阻塞直到外部进程退出；同一时刻只应有一个导入在进行。
    /// 进程退出后把它写的日志逐行发送到 `output_tx`，再删除临时 CSV。
    pub fn launch(
        &self,
        store: &ImportStore,
        tenant: &TenantConfig,
        output_tx: &mpsc::UnboundedSender<String>,
    ) -> Result<LaunchReport, LaunchError> {
        self.preflight(tenant)?;

        fs::create_dir_all(&self.work_dir)?;
        let stamp = Local::now().format(STAMP_FORMAT).to_string();
        let started = NaiveDateTime::parse_from_str(&stamp, STAMP_FORMAT)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let csv_path = self.work_dir.join(format!("import_{stamp}.csv"));
        store.export_csv(&csv_path).map_err(LaunchError::Export)?;
        let _ = output_tx.send(format!(
            "已导出 {} 条记录到 {}",
            store.len(),
            csv_path.display()
        ));

        log::info!("启动导入: {} {}", self.shell, self.script.display());
        let output = duct::cmd(&self.shell, self.import_args(&csv_path, tenant))
            .dir(&self.work_dir)
            .stdin_null()
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run();

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                log::warn!("无法启动 {}: {}", self.shell, e);
                remove_temp_csv(&csv_path, output_tx);
                return Err(LaunchError::ProcessStart(e));
            }
        };
        log::debug!("导入进程 stdout:\n{}", String::from_utf8_lossy(&output.stdout));
        log::debug!("导入进程 stderr:\n{}", String::from_utf8_lossy(&output.stderr));

        let log_file = find_log_file(&self.logs_dir(), &self.log_prefix, started);
        let mut lines = 0;
        match &log_file {
            Some(path) => match read_log(path) {
                Ok(text) => {
                    for line in text.lines() {
                        let _ = output_tx.send(line.to_string());
                        lines += 1;
                    }
                }
                Err(e) => {
                    log::warn!("读取日志 {} 失败: {}", path.display(), e);
                    let _ = output_tx.send(format!("⚠ 无法读取日志 {}: {}", path.display(), e));
                }
            },
            None => {
                let _ = output_tx.send(format!(
                    "⚠ 未在 {} 找到本次导入的日志",
                    self.logs_dir().display()
                ));
            }
        }

        let csv_removed = remove_temp_csv(&csv_path, output_tx);
        let exit_code = output.status.code();
        log::info!("导入结束 (exit={:?})", exit_code);

        if !output.status.success() {
            return Err(LaunchError::ProcessFailed { code: exit_code });
        }
        Ok(LaunchReport {
            csv_path,
            log_file,
            lines,
            csv_removed,
            exit_code,
        })
    }
}

/// 删除临时 CSV；失败时只记录，不影响导入结果
fn remove_temp_csv(path: &Path, output_tx: &mpsc::UnboundedSender<String>) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("删除临时文件 {} 失败: {}", path.display(), e);
            let _ = output_tx.send(format!("⚠ 临时文件 {} 未能删除: {}", path.display(), e));
            false
        }
    }
}

/// 在 `dir` 中寻找 `<prefix>_<yyyyMMddHHmmss>.log`，
/// 返回时间戳不早于 `since` 的最新一个
pub fn find_log_file(dir: &Path, prefix: &str, since: NaiveDateTime) -> Option<PathBuf> {
    let head = format!("{prefix}_");
    fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let stamp = name.strip_prefix(&head)?.strip_suffix(".log")?;
            let at = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
            (at >= since).then(|| (at, entry.path()))
        })
        .max_by_key(|(at, _)| *at)
        .map(|(_, path)| path)
}

/// 读取日志，兼容 UTF-8 (含 BOM) 与 Windows PowerShell 默认的 UTF-16LE
fn read_log(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        return Ok(String::from_utf16_lossy(&units));
    }
    let text = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    Ok(String::from_utf8_lossy(text).to_string())
}
