use crate::catalog::{Catalog, PackageDetail, SearchResultRecord};
use crate::config::Config;
use crate::launcher::LaunchReport;
use crate::store::{ImportField, ImportRecord, ImportStore, InstallContext};
use std::path::PathBuf;
use std::time::Instant;

// ========== 枚举 ==========

#[derive(Debug, Clone, PartialEq)]
pub enum AppMode {
    Dashboard,
    Search,     // Shift+S: winget search / show
    ImportList, // Shift+L: 导入列表
    Launch,     // 导入输出
    Settings,   // Shift+C: 设置
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchView {
    List,
    Detail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LaunchPhase {
    Idle,
    Running,
    Done,
    Error,
}

/// 导入列表底部的输入提示
#[derive(Debug, Clone, PartialEq)]
pub enum ListPrompt {
    ImportCsv,
    ExportCsv,
    EditField(ImportField),
}

/// 设置页面项目类型
#[derive(Debug, Clone)]
pub enum SettingsItem {
    /// 分组标题（不可选中）
    Section(String),
    /// 文本编辑项
    TextEdit {
        label: String,
        key: String,
        value: String,
    },
}

// ========== 事件 ==========

#[derive(Debug)]
pub enum AppEvent {
    CatalogDetected(Catalog),
    CatalogMissing(String),
    Error(String),
    SearchResults {
        results: Vec<SearchResultRecord>,
        seq: u64,
    },
    SearchFailed {
        message: String,
        seq: u64,
    },
    DetailLoaded {
        id: String,
        detail: PackageDetail,
        versions: Vec<String>,
    },
    FieldHelp {
        field: ImportField,
        text: String,
    },
    LaunchLine(String),
    LaunchComplete(Result<LaunchReport, String>),
}

// ========== 子状态结构体 ==========

pub struct SearchModeState {
    pub input: String,
    pub cursor: usize,
    pub view: SearchView,
    pub results: Vec<SearchResultRecord>,
    pub selected: usize,
    pub searching: bool,
    pub search_scheduled: Option<Instant>,
    pub search_seq: u64,
    pub detail_id: Option<String>,
    pub detail: Option<PackageDetail>,
    pub versions: Vec<String>,
    pub detail_scroll: usize,
}

pub struct ListModeState {
    pub selected: usize,
    pub field: usize,
    pub prompt: Option<ListPrompt>,
    pub buffer: String,
    pub cursor: usize,
    pub help: Option<String>,
}

pub struct LaunchModeState {
    pub phase: LaunchPhase,
    pub lines: Vec<String>,
    pub scroll: usize,
    pub report: Option<LaunchReport>,
}

pub struct SettingsModeState {
    pub items: Vec<SettingsItem>,
    pub selected: usize,
    pub editing: bool,
    pub edit_buffer: String,
    pub edit_cursor: usize,
    pub message: Option<String>,
}

// ========== 子状态 impl ==========

impl SearchModeState {
    pub fn new() -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            view: SearchView::List,
            results: Vec::new(),
            selected: 0,
            searching: false,
            search_scheduled: None,
            search_seq: 0,
            detail_id: None,
            detail: None,
            versions: Vec::new(),
            detail_scroll: 0,
        }
    }

    pub fn selected_result(&self) -> Option<&SearchResultRecord> {
        self.results.get(self.selected)
    }
}

impl ListModeState {
    pub fn new() -> Self {
        Self {
            selected: 0,
            field: 0,
            prompt: None,
            buffer: String::new(),
            cursor: 0,
            help: None,
        }
    }

    pub fn current_field(&self) -> ImportField {
        ImportField::ALL[self.field.min(ImportField::ALL.len() - 1)]
    }

    pub fn open_prompt(&mut self, prompt: ListPrompt, initial: String) {
        self.cursor = initial.chars().count();
        self.buffer = initial;
        self.prompt = Some(prompt);
    }

    pub fn close_prompt(&mut self) {
        self.prompt = None;
        self.buffer.clear();
        self.cursor = 0;
    }
}

impl LaunchModeState {
    pub fn new() -> Self {
        Self {
            phase: LaunchPhase::Idle,
            lines: Vec::new(),
            scroll: 0,
            report: None,
        }
    }

    pub fn add_line(&mut self, line: String) {
        self.lines.push(line);
        self.scroll = self.lines.len().saturating_sub(1);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self, visible_height: usize) {
        let max_scroll = self.lines.len().saturating_sub(visible_height);
        if self.scroll < max_scroll {
            self.scroll += 1;
        }
    }

    pub fn clamp_scroll(&mut self, visible_height: usize) {
        let max_scroll = self.lines.len().saturating_sub(visible_height);
        self.scroll = self.scroll.min(max_scroll);
    }
}

impl SettingsModeState {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            selected: 0,
            editing: false,
            edit_buffer: String::new(),
            edit_cursor: 0,
            message: None,
        }
    }
}

// ========== App ==========

pub struct App {
    pub mode: AppMode,
    pub config: Config,
    pub store: ImportStore,
    pub catalog: Option<Catalog>,
    pub catalog_error: Option<String>,
    /// 状态栏提示（重复添加、导入导出结果等）
    pub status: Option<String>,
    pub error_message: Option<String>,
    pub should_quit: bool,
    // 子状态
    pub search: SearchModeState,
    pub list: ListModeState,
    pub launch: LaunchModeState,
    pub settings: SettingsModeState,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            mode: AppMode::Dashboard,
            config,
            store: ImportStore::new(),
            catalog: None,
            catalog_error: None,
            status: None,
            error_message: None,
            should_quit: false,
            search: SearchModeState::new(),
            list: ListModeState::new(),
            launch: LaunchModeState::new(),
            settings: SettingsModeState::new(),
        }
    }

    /// 正在等待文本输入时，Shift+字母不作为模式切换
    pub fn is_typing(&self) -> bool {
        match self.mode {
            AppMode::Search => self.search.view == SearchView::List,
            AppMode::ImportList => self.list.prompt.is_some(),
            AppMode::Settings => self.settings.editing,
            _ => false,
        }
    }

    pub fn is_launching(&self) -> bool {
        self.launch.phase == LaunchPhase::Running
    }

    /// 导入进行中列表只读；返回 false 时已写入提示
    fn ensure_store_writable(&mut self) -> bool {
        if self.is_launching() {
            self.status = Some("导入进行中，导入列表暂时只读".to_string());
            return false;
        }
        true
    }

    pub fn reset_search_state(&mut self) {
        self.search = SearchModeState::new();
    }

    pub fn default_csv_path(&self) -> PathBuf {
        self.config.work_dir.join("packages.csv")
    }

    // ===== 导入列表操作 =====

    /// 把当前选中的搜索结果移入导入列表
    pub fn move_selected_to_store(&mut self) {
        if !self.ensure_store_writable() {
            return;
        }
        let Some(result) = self.search.selected_result().cloned() else {
            return;
        };
        self.status = Some(match ImportRecord::from_search(&result) {
            Ok(record) => match self.store.add(record) {
                Ok(()) => format!("✓ 已加入导入列表: {}", result.id),
                Err(e) => format!("✗ {}", e),
            },
            Err(e) => format!("✗ {}", e),
        });
    }

    pub fn delete_selected_row(&mut self) {
        if !self.ensure_store_writable() {
            return;
        }
        let Some(record) = self.store.get(self.list.selected).cloned() else {
            return;
        };
        if self.store.remove(&record) {
            self.status = Some(format!("已删除 {}", record.package_id));
        }
        self.list.selected = self.list.selected.min(self.store.len().saturating_sub(1));
    }

    /// 布尔字段与上下文直接切换，其余字段打开编辑框
    pub fn activate_current_field(&mut self) {
        let field = self.list.current_field();
        let Some(record) = self.store.get(self.list.selected) else {
            return;
        };
        let current = record.get(field);
        let context = record.context;
        if field.is_bool() || field == ImportField::Context {
            let next = match field {
                ImportField::Context => match context {
                    InstallContext::Machine => InstallContext::User.to_string(),
                    InstallContext::User => InstallContext::Machine.to_string(),
                },
                _ => (current != "True").to_string(),
            };
            self.apply_field_value(field, &next);
        } else {
            self.list.open_prompt(ListPrompt::EditField(field), current);
        }
    }

    pub fn apply_field_value(&mut self, field: ImportField, value: &str) {
        if !self.ensure_store_writable() {
            return;
        }
        if let Err(e) = self.store.set_field(self.list.selected, field, value) {
            self.status = Some(format!("✗ {}", e));
        }
    }

    pub fn import_csv(&mut self, path: &str) {
        if !self.ensure_store_writable() {
            return;
        }
        let path = crate::config::resolve_path(std::path::Path::new(path.trim()));
        self.status = Some(match self.store.load_csv(&path) {
            Ok(summary) if summary.duplicates.is_empty() => {
                format!("✓ 已从 {} 导入 {} 条记录", path.display(), summary.records)
            }
            Ok(summary) => format!(
                "✓ 已导入 {} 条记录，注意重复的 PackageID: {}",
                summary.records,
                summary.duplicates.join(", ")
            ),
            Err(e) => format!("✗ 导入失败，列表未改动: {}", e),
        });
        self.list.selected = 0;
    }

    pub fn export_csv(&mut self, path: &str) {
        let path = crate::config::resolve_path(std::path::Path::new(path.trim()));
        self.status = Some(match self.store.export_csv(&path) {
            Ok(()) => format!("✓ 已导出 {} 条记录到 {}", self.store.len(), path.display()),
            Err(e) => format!("✗ 导出失败: {}", e),
        });
    }

    /// 确认底部输入框
    pub fn confirm_list_prompt(&mut self) {
        let Some(prompt) = self.list.prompt.clone() else {
            return;
        };
        let buffer = self.list.buffer.clone();
        self.list.close_prompt();
        match prompt {
            ListPrompt::ImportCsv => self.import_csv(&buffer),
            ListPrompt::ExportCsv => self.export_csv(&buffer),
            ListPrompt::EditField(field) => self.apply_field_value(field, &buffer),
        }
    }

    pub fn finish_launch(&mut self, result: Result<LaunchReport, String>) {
        match result {
            Ok(report) => {
                self.launch.add_line(format!(
                    "─── 导入完成: {} 行日志 (exit={:?}) ───",
                    report.lines, report.exit_code
                ));
                if !report.csv_removed {
                    self.launch
                        .add_line(format!("临时文件保留在 {}", report.csv_path.display()));
                }
                self.launch.report = Some(report);
                self.launch.phase = LaunchPhase::Done;
            }
            Err(e) => {
                self.launch.add_line(format!("─── 导入失败: {} ───", e));
                self.error_message = Some(e);
                self.launch.phase = LaunchPhase::Error;
            }
        }
    }

    // ===== 设置 =====

    /// 从当前 config 构建设置项列表
    pub fn build_settings_items(&mut self) {
        let text = |label: &str, key: &str, value: String| SettingsItem::TextEdit {
            label: label.to_string(),
            key: key.to_string(),
            value,
        };
        self.settings.items = vec![
            SettingsItem::Section("租户".to_string()),
            text("租户 ID", "tenant_id", self.config.tenant.tenant_id.clone()),
            text("Client ID", "client_id", self.config.tenant.client_id.clone()),
            text("重定向 URI", "redirect_uri", self.config.tenant.redirect_uri.clone()),
            SettingsItem::Section("导入".to_string()),
            text("winget 命令", "winget_command", self.config.winget_command.clone()),
            text("工作目录", "work_dir", self.config.work_dir.display().to_string()),
            text("导入脚本", "import_script", self.config.import_script.display().to_string()),
            text("脚本解释器", "import_shell", self.config.import_shell.clone()),
            text("日志前缀", "log_prefix", self.config.log_prefix.clone()),
            SettingsItem::Section("帮助".to_string()),
            text("字段说明地址", "help_url", self.config.help_url.clone()),
        ];
        self.settings.selected = 0;
        self.settings.editing = false;
        self.settings.message = None;
    }

    fn focusable_settings(&self) -> Vec<usize> {
        self.settings
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| !matches!(item, SettingsItem::Section(_)))
            .map(|(i, _)| i)
            .collect()
    }

    /// 开始编辑 TextEdit 项
    pub fn start_settings_edit(&mut self) {
        if let Some(&real_idx) = self.focusable_settings().get(self.settings.selected) {
            if let SettingsItem::TextEdit { value, .. } = &self.settings.items[real_idx] {
                self.settings.edit_buffer = value.clone();
                self.settings.edit_cursor = self.settings.edit_buffer.chars().count();
                self.settings.editing = true;
            }
        }
    }

    /// 确认编辑并写回 config
    pub fn confirm_settings_edit(&mut self) {
        if let Some(&real_idx) = self.focusable_settings().get(self.settings.selected) {
            let buf = self.settings.edit_buffer.trim().to_string();
            if let SettingsItem::TextEdit { key, value, .. } = &mut self.settings.items[real_idx] {
                *value = buf.clone();
                match key.as_str() {
                    "tenant_id" => self.config.tenant.tenant_id = buf,
                    "client_id" => self.config.tenant.client_id = buf,
                    "redirect_uri" => self.config.tenant.redirect_uri = buf,
                    "winget_command" => {
                        if self.config.winget_command != buf {
                            // 换了命令需要重新检测
                            self.catalog = None;
                        }
                        self.config.winget_command = buf;
                    }
                    "work_dir" => {
                        self.config.work_dir = crate::config::resolve_path(&PathBuf::from(buf))
                    }
                    "import_script" => {
                        self.config.import_script =
                            crate::config::resolve_path(&PathBuf::from(buf))
                    }
                    "import_shell" => self.config.import_shell = buf,
                    "log_prefix" => self.config.log_prefix = buf,
                    "help_url" => self.config.help_url = buf,
                    _ => {}
                }
            }
        }
        self.settings.editing = false;
    }

    /// 保存配置到磁盘
    pub fn save_settings(&mut self) {
        self.settings.message = Some(match self.config.save() {
            Ok(()) => format!("✓ 已保存到 {}", Config::config_path().display()),
            Err(e) => format!("✗ 保存失败: {}", e),
        });
    }

    /// 获取可聚焦项数量
    pub fn settings_focusable_count(&self) -> usize {
        self.focusable_settings().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with_results() -> App {
        let mut app = App::new(Config::default());
        app.search.results = vec![
            SearchResultRecord {
                name: "VLC media player".to_string(),
                id: "VideoLAN.VLC".to_string(),
                version: "3.0.20".to_string(),
            },
            SearchResultRecord {
                name: "7-Zip".to_string(),
                id: "7zip.7zip".to_string(),
                version: "23.01".to_string(),
            },
        ];
        app
    }

    #[test]
    fn moving_twice_shows_a_notice_and_keeps_one() {
        let mut app = app_with_results();
        app.move_selected_to_store();
        assert!(app.status.as_deref().unwrap().starts_with('✓'));
        app.move_selected_to_store();
        assert!(app.status.as_deref().unwrap().contains("已在导入列表中"));
        assert_eq!(app.store.len(), 1);
    }

    #[test]
    fn store_is_read_only_while_launching() {
        let mut app = app_with_results();
        app.move_selected_to_store();
        app.launch.phase = LaunchPhase::Running;

        app.search.selected = 1;
        app.move_selected_to_store();
        app.delete_selected_row();
        app.list.field = 1;
        app.activate_current_field();

        assert_eq!(app.store.len(), 1);
        assert_eq!(app.store.get(0).unwrap().context, InstallContext::Machine);
        assert!(app.status.as_deref().unwrap().contains("只读"));
    }

    #[test]
    fn toggles_and_edits_fields() {
        let mut app = app_with_results();
        app.move_selected_to_store();

        app.list.field = 1; // Context
        app.activate_current_field();
        assert_eq!(app.store.get(0).unwrap().context, InstallContext::User);

        app.list.field = 2; // AcceptNewerVersion
        app.activate_current_field();
        assert!(!app.store.get(0).unwrap().accept_newer_version);

        app.list.field = 4; // TargetVersion
        app.activate_current_field();
        assert_eq!(app.list.prompt, Some(ListPrompt::EditField(ImportField::TargetVersion)));
        app.list.buffer = "3.0.18".to_string();
        app.confirm_list_prompt();
        assert_eq!(app.store.get(0).unwrap().target_version, "3.0.18");
        assert!(app.list.prompt.is_none());
    }

    #[test]
    fn export_then_import_through_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.csv").display().to_string();
        let mut app = app_with_results();
        app.move_selected_to_store();
        app.search.selected = 1;
        app.move_selected_to_store();

        app.list.open_prompt(ListPrompt::ExportCsv, path.clone());
        app.confirm_list_prompt();
        assert!(app.status.as_deref().unwrap().starts_with('✓'));

        let before = app.store.clone();
        app.list.selected = 0;
        app.delete_selected_row();
        assert_eq!(app.store.len(), 1);

        app.list.open_prompt(ListPrompt::ImportCsv, path);
        app.confirm_list_prompt();
        assert_eq!(app.store, before);
    }

    #[test]
    fn failed_import_keeps_list() {
        let mut app = app_with_results();
        app.move_selected_to_store();
        app.import_csv("/definitely/not/here.csv");
        assert_eq!(app.store.len(), 1);
        assert!(app.status.as_deref().unwrap().contains("列表未改动"));
    }

    #[test]
    fn typing_modes_suppress_shortcuts() {
        let mut app = App::new(Config::default());
        assert!(!app.is_typing());
        app.mode = AppMode::Search;
        assert!(app.is_typing());
        app.search.view = SearchView::Detail;
        assert!(!app.is_typing());
        app.mode = AppMode::ImportList;
        assert!(!app.is_typing());
        app.list.open_prompt(ListPrompt::ImportCsv, String::new());
        assert!(app.is_typing());
    }

    #[test]
    fn settings_edit_writes_back_to_config() {
        let mut app = App::new(Config::default());
        app.build_settings_items();
        assert_eq!(app.settings_focusable_count(), 9);

        app.settings.selected = 0;
        app.start_settings_edit();
        app.settings.edit_buffer = " contoso.onmicrosoft.com ".to_string();
        app.confirm_settings_edit();
        assert_eq!(app.config.tenant.tenant_id, "contoso.onmicrosoft.com");
        assert!(!app.settings.editing);
    }
}
