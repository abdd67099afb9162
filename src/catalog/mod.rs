//! Catalog 模块 — 对 winget 命令行的封装

pub mod parser;
pub mod types;

pub use types::{PackageDetail, SearchResultRecord};

use parser::{is_no_package_found, parse_package_detail, parse_search_output, parse_versions};
use std::io;
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("未找到包管理器: {0}")]
    NotFound(String),
    #[error("执行 {command} 失败: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("{command} {args} 执行失败 (exit={code:?}): {stderr}")]
    CommandFailed {
        command: String,
        args: String,
        code: Option<i32>,
        stderr: String,
    },
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub command: String,
}

impl Catalog {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// 确认可执行文件存在并能响应 `--version`
    pub fn detect(command: &str) -> Result<Self, CatalogError> {
        let ok = Command::new(command)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if ok {
            Ok(Self::new(command))
        } else {
            Err(CatalogError::NotFound(command.to_string()))
        }
    }

    pub fn name(&self) -> &str {
        &self.command
    }

    /// 运行 winget 并返回 stdout 文本
    fn run(&self, args: &[&str]) -> Result<String, CatalogError> {
        log::debug!("{} {}", self.command, args.join(" "));
        let output = Command::new(&self.command)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    CatalogError::NotFound(self.command.clone())
                } else {
                    CatalogError::Io {
                        command: self.command.clone(),
                        source,
                    }
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        // 无结果时 winget 以非零状态退出，但这不算失败
        if output.status.success() || is_no_package_found(&stdout) {
            return Ok(stdout);
        }
        Err(CatalogError::CommandFailed {
            command: self.command.clone(),
            args: args.join(" "),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    // ===== 查询 =====

    /// 搜索软件包 (winget search --query)
    pub fn search(&self, query: &str) -> Result<Vec<SearchResultRecord>, CatalogError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let raw = self.run(&["search", "--query", query])?;
        if is_no_package_found(&raw) {
            return Ok(Vec::new());
        }
        Ok(parse_search_output(&raw))
    }

    /// 获取包详情 (winget show --id)
    pub fn show(&self, id: &str) -> Result<PackageDetail, CatalogError> {
        let raw = self.run(&["show", "--id", id])?;
        if is_no_package_found(&raw) {
            return Ok(PackageDetail::default());
        }
        Ok(parse_package_detail(&raw))
    }

    /// 获取可用版本列表 (winget show --id --versions)
    pub fn versions(&self, id: &str) -> Result<Vec<String>, CatalogError> {
        let raw = self.run(&["show", "--id", id, "--versions"])?;
        if is_no_package_found(&raw) {
            return Ok(Vec::new());
        }
        Ok(parse_versions(&raw))
    }
}
