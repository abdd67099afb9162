use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 租户配置（Intune 导入脚本所需的标识）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// winget 可执行文件
    pub winget_command: String,
    /// 导入工作目录，Logs/ 位于其下
    pub work_dir: PathBuf,
    /// 导入脚本写日志时使用的文件名前缀
    pub log_prefix: String,
    pub import_shell: String,
    pub import_shell_args: Vec<String>,
    pub import_script: PathBuf,
    /// 启动前必须存在的其他文件
    pub required_files: Vec<PathBuf>,
    /// 字段说明文档地址，留空则禁用
    pub help_url: String,
    pub tenant: TenantConfig,
}

impl Default for Config {
    fn default() -> Self {
        let work_dir = home_dir().join(".lian/winget");
        Self {
            winget_command: "winget".to_string(),
            import_script: work_dir.join("Import-WinGetPackages.ps1"),
            work_dir,
            log_prefix: "WinGet-WinTuner".to_string(),
            import_shell: "pwsh".to_string(),
            import_shell_args: vec![
                "-NoProfile".to_string(),
                "-ExecutionPolicy".to_string(),
                "Bypass".to_string(),
                "-File".to_string(),
            ],
            required_files: Vec::new(),
            help_url: String::new(),
            tenant: TenantConfig::default(),
        }
    }
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
}

/// 展开 `~` 并把相对路径解析到 $HOME 下
pub fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        return home_dir().join(rest);
    }
    if path.is_relative() {
        home_dir().join(path)
    } else {
        path.to_path_buf()
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        home_dir().join(".config/lian-winget/config.toml")
    }

    pub fn load_or_default() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config.resolved())
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    fn resolved(mut self) -> Self {
        self.work_dir = resolve_path(&self.work_dir);
        self.import_script = resolve_path(&self.import_script);
        self.required_files = self.required_files.iter().map(|p| resolve_path(p)).collect();
        self
    }
}
