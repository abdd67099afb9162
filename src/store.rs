//! 导入列表：待导入 Intune 的软件包记录及其部署设置，支持 CSV 导入 / 导出

use crate::catalog::SearchResultRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} 已在导入列表中")]
    DuplicateKey(String),
    #[error("PackageID 不能为空")]
    EmptyPackageId,
    #[error("字段 {field} 的值无效: {value:?}")]
    InvalidValue { field: &'static str, value: String },
    #[error("没有第 {0} 行")]
    IndexOutOfRange(usize),
    #[error("CSV 解析失败: {0}")]
    Csv(#[from] csv::Error),
    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),
}

// ========== 安装上下文 ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InstallContext {
    #[default]
    Machine,
    User,
}

impl InstallContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallContext::Machine => "Machine",
            InstallContext::User => "User",
        }
    }
}

impl fmt::Display for InstallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallContext {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "machine" => Ok(InstallContext::Machine),
            "user" => Ok(InstallContext::User),
            _ => Err(StoreError::InvalidValue {
                field: ImportField::Context.header(),
                value: s.to_string(),
            }),
        }
    }
}

/// CSV 中的空单元格与缺列一样取默认值
impl TryFrom<String> for InstallContext {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Ok(InstallContext::default());
        }
        value.parse()
    }
}

impl From<InstallContext> for String {
    fn from(value: InstallContext) -> Self {
        value.as_str().to_string()
    }
}

// ========== 布尔值（CSV 中写作 True / False） ==========

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn bool_str(v: bool) -> &'static str {
    if v {
        "True"
    } else {
        "False"
    }
}

mod csv_bool {
    use super::{bool_str, parse_bool};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(bool_str(*v))
    }

    /// 空单元格为 false
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        parse_or(d, false)
    }

    /// 空单元格为 true
    pub fn default_true<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        parse_or(d, true)
    }

    fn parse_or<'de, D: Deserializer<'de>>(d: D, blank: bool) -> Result<bool, D::Error> {
        let raw = String::deserialize(d)?;
        if raw.trim().is_empty() {
            return Ok(blank);
        }
        parse_bool(&raw).ok_or_else(|| D::Error::custom(format!("invalid boolean: {raw:?}")))
    }
}

// ========== 字段 ==========

/// 导入记录的全部字段，顺序即 CSV 列顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportField {
    PackageId,
    Context,
    AcceptNewerVersion,
    UpdateOnly,
    TargetVersion,
    StopProcessInstall,
    StopProcessUninstall,
    PreScriptInstall,
    PostScriptInstall,
    PreScriptUninstall,
    PostScriptUninstall,
    CustomArgumentListInstall,
    CustomArgumentListUninstall,
    InstallIntent,
    Notification,
    GroupId,
}

impl ImportField {
    pub const ALL: [ImportField; 16] = [
        ImportField::PackageId,
        ImportField::Context,
        ImportField::AcceptNewerVersion,
        ImportField::UpdateOnly,
        ImportField::TargetVersion,
        ImportField::StopProcessInstall,
        ImportField::StopProcessUninstall,
        ImportField::PreScriptInstall,
        ImportField::PostScriptInstall,
        ImportField::PreScriptUninstall,
        ImportField::PostScriptUninstall,
        ImportField::CustomArgumentListInstall,
        ImportField::CustomArgumentListUninstall,
        ImportField::InstallIntent,
        ImportField::Notification,
        ImportField::GroupId,
    ];

    /// CSV 表头名
    pub fn header(&self) -> &'static str {
        match self {
            ImportField::PackageId => "PackageID",
            ImportField::Context => "Context",
            ImportField::AcceptNewerVersion => "AcceptNewerVersion",
            ImportField::UpdateOnly => "UpdateOnly",
            ImportField::TargetVersion => "TargetVersion",
            ImportField::StopProcessInstall => "StopProcessInstall",
            ImportField::StopProcessUninstall => "StopProcessUninstall",
            ImportField::PreScriptInstall => "PreScriptInstall",
            ImportField::PostScriptInstall => "PostScriptInstall",
            ImportField::PreScriptUninstall => "PreScriptUninstall",
            ImportField::PostScriptUninstall => "PostScriptUninstall",
            ImportField::CustomArgumentListInstall => "CustomArgumentListInstall",
            ImportField::CustomArgumentListUninstall => "CustomArgumentListUninstall",
            ImportField::InstallIntent => "InstallIntent",
            ImportField::Notification => "Notification",
            ImportField::GroupId => "GroupID",
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, ImportField::AcceptNewerVersion | ImportField::UpdateOnly)
    }
}

// ========== 导入记录 ==========

/// 一条导入记录。字段声明顺序必须与 `ImportField::ALL` 一致。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ImportRecord {
    #[serde(rename = "PackageID")]
    pub package_id: String,
    pub context: InstallContext,
    #[serde(
        serialize_with = "csv_bool::serialize",
        deserialize_with = "csv_bool::default_true"
    )]
    pub accept_newer_version: bool,
    #[serde(with = "csv_bool")]
    pub update_only: bool,
    pub target_version: String,
    pub stop_process_install: String,
    pub stop_process_uninstall: String,
    pub pre_script_install: String,
    pub post_script_install: String,
    pub pre_script_uninstall: String,
    pub post_script_uninstall: String,
    pub custom_argument_list_install: String,
    pub custom_argument_list_uninstall: String,
    pub install_intent: String,
    pub notification: String,
    #[serde(rename = "GroupID")]
    pub group_id: String,
}

impl Default for ImportRecord {
    fn default() -> Self {
        Self {
            package_id: String::new(),
            context: InstallContext::Machine,
            accept_newer_version: true,
            update_only: false,
            target_version: String::new(),
            stop_process_install: String::new(),
            stop_process_uninstall: String::new(),
            pre_script_install: String::new(),
            post_script_install: String::new(),
            pre_script_uninstall: String::new(),
            post_script_uninstall: String::new(),
            custom_argument_list_install: String::new(),
            custom_argument_list_uninstall: String::new(),
            install_intent: String::new(),
            notification: String::new(),
            group_id: String::new(),
        }
    }
}

impl ImportRecord {
    /// 以默认部署设置新建记录
    pub fn new(package_id: &str) -> Result<Self, StoreError> {
        let package_id = package_id.trim();
        if package_id.is_empty() {
            return Err(StoreError::EmptyPackageId);
        }
        Ok(Self {
            package_id: package_id.to_string(),
            ..Self::default()
        })
    }

    /// 把一条搜索结果移入导入列表时使用
    pub fn from_search(result: &SearchResultRecord) -> Result<Self, StoreError> {
        Self::new(&result.id)
    }

    pub fn get(&self, field: ImportField) -> String {
        match field {
            ImportField::PackageId => self.package_id.clone(),
            ImportField::Context => self.context.to_string(),
            ImportField::AcceptNewerVersion => bool_str(self.accept_newer_version).to_string(),
            ImportField::UpdateOnly => bool_str(self.update_only).to_string(),
            ImportField::TargetVersion => self.target_version.clone(),
            ImportField::StopProcessInstall => self.stop_process_install.clone(),
            ImportField::StopProcessUninstall => self.stop_process_uninstall.clone(),
            ImportField::PreScriptInstall => self.pre_script_install.clone(),
            ImportField::PostScriptInstall => self.post_script_install.clone(),
            ImportField::PreScriptUninstall => self.pre_script_uninstall.clone(),
            ImportField::PostScriptUninstall => self.post_script_uninstall.clone(),
            ImportField::CustomArgumentListInstall => self.custom_argument_list_install.clone(),
            ImportField::CustomArgumentListUninstall => self.custom_argument_list_uninstall.clone(),
            ImportField::InstallIntent => self.install_intent.clone(),
            ImportField::Notification => self.notification.clone(),
            ImportField::GroupId => self.group_id.clone(),
        }
    }

    /// 以文本形式设置字段，布尔与上下文字段会被校验
    pub fn set(&mut self, field: ImportField, value: &str) -> Result<(), StoreError> {
        let invalid = || StoreError::InvalidValue {
            field: field.header(),
            value: value.to_string(),
        };
        match field {
            ImportField::PackageId => {
                let id = value.trim();
                if id.is_empty() {
                    return Err(StoreError::EmptyPackageId);
                }
                self.package_id = id.to_string();
            }
            ImportField::Context => self.context = value.parse()?,
            ImportField::AcceptNewerVersion => {
                self.accept_newer_version = parse_bool(value).ok_or_else(invalid)?
            }
            ImportField::UpdateOnly => self.update_only = parse_bool(value).ok_or_else(invalid)?,
            ImportField::TargetVersion => self.target_version = value.to_string(),
            ImportField::StopProcessInstall => self.stop_process_install = value.to_string(),
            ImportField::StopProcessUninstall => self.stop_process_uninstall = value.to_string(),
            ImportField::PreScriptInstall => self.pre_script_install = value.to_string(),
            ImportField::PostScriptInstall => self.post_script_install = value.to_string(),
            ImportField::PreScriptUninstall => self.pre_script_uninstall = value.to_string(),
            ImportField::PostScriptUninstall => self.post_script_uninstall = value.to_string(),
            ImportField::CustomArgumentListInstall => {
                self.custom_argument_list_install = value.to_string()
            }
            ImportField::CustomArgumentListUninstall => {
                self.custom_argument_list_uninstall = value.to_string()
            }
            ImportField::InstallIntent => self.install_intent = value.to_string(),
            ImportField::Notification => self.notification = value.to_string(),
            ImportField::GroupId => self.group_id = value.to_string(),
        }
        Ok(())
    }
}

// ========== 导入列表 ==========

/// CSV 导入结果
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub records: usize,
    /// 文件中重复出现的 PackageID（照样载入，只做提示）
    pub duplicates: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportStore {
    records: Vec<ImportRecord>,
}

impl ImportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ImportRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImportRecord> {
        self.records.get(index)
    }

    pub fn contains(&self, package_id: &str) -> bool {
        self.records.iter().any(|r| r.package_id == package_id)
    }

    /// 追加记录；PackageID 已存在时返回 DuplicateKey，列表不变
    pub fn add(&mut self, record: ImportRecord) -> Result<(), StoreError> {
        if self.contains(&record.package_id) {
            log::info!("跳过重复的包 {}", record.package_id);
            return Err(StoreError::DuplicateKey(record.package_id));
        }
        self.records.push(record);
        Ok(())
    }

    /// 删除与给定记录相同的第一条；不存在时返回 false
    pub fn remove(&mut self, record: &ImportRecord) -> bool {
        let pos = self.records.iter().position(|r| r == record);
        pos.and_then(|pos| self.remove_at(pos)).is_some()
    }

    /// 按选中行删除
    pub fn remove_at(&mut self, index: usize) -> Option<ImportRecord> {
        if index < self.records.len() {
            Some(self.records.remove(index))
        } else {
            None
        }
    }

    /// 编辑某一行的字段；修改 PackageID 时同样保证唯一
    pub fn set_field(
        &mut self,
        index: usize,
        field: ImportField,
        value: &str,
    ) -> Result<(), StoreError> {
        if index >= self.records.len() {
            return Err(StoreError::IndexOutOfRange(index));
        }
        if field == ImportField::PackageId {
            let id = value.trim();
            let taken = self
                .records
                .iter()
                .enumerate()
                .any(|(i, r)| i != index && r.package_id == id);
            if taken {
                return Err(StoreError::DuplicateKey(id.to_string()));
            }
        }
        self.records[index].set(field, value)
    }

    // ===== CSV =====

    /// 从 CSV 文件整体替换列表。任何一行解析失败都会放弃本次导入，原列表保持不变。
    pub fn load_csv(&mut self, path: &Path) -> Result<LoadSummary, StoreError> {
        let file = File::open(path)?;
        let summary = self.load_from_reader(file)?;
        log::info!("从 {} 导入 {} 条记录", path.display(), summary.records);
        Ok(summary)
    }

    pub fn load_from_reader<R: Read>(&mut self, mut reader: R) -> Result<LoadSummary, StoreError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        // Windows PowerShell 的 Export-Csv 默认在首行写 #TYPE；其余以 # 开头的行都是数据
        let body = match text.split_once('\n') {
            Some((first, rest)) if first.starts_with("#TYPE") => rest,
            None if text.starts_with("#TYPE") => "",
            _ => text,
        };
        let mut rdr = csv::ReaderBuilder::new().from_reader(body.as_bytes());

        let mut incoming: Vec<ImportRecord> = Vec::new();
        for row in rdr.deserialize() {
            let mut record: ImportRecord = row?;
            record.package_id = record.package_id.trim().to_string();
            if record.package_id.is_empty() {
                return Err(StoreError::EmptyPackageId);
            }
            incoming.push(record);
        }

        let mut duplicates: Vec<String> = Vec::new();
        for (i, record) in incoming.iter().enumerate() {
            let seen_before = incoming[..i].iter().any(|r| r.package_id == record.package_id);
            if seen_before && !duplicates.contains(&record.package_id) {
                duplicates.push(record.package_id.clone());
            }
        }
        if !duplicates.is_empty() {
            log::warn!("CSV 中存在重复的 PackageID: {}", duplicates.join(", "));
        }

        let summary = LoadSummary {
            records: incoming.len(),
            duplicates,
        };
        self.records = incoming;
        Ok(summary)
    }

    /// 导出全部记录到 CSV（覆盖已有文件）
    pub fn export_csv(&self, path: &Path) -> Result<(), StoreError> {
        let file = File::create(path)?;
        self.write_to(file)?;
        log::info!("已导出 {} 条记录到 {}", self.records.len(), path.display());
        Ok(())
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), StoreError> {
        // 与 Export-Csv 一样给每个字段加引号，以 # 开头的 PackageID 不会被当成注释
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(writer);

        // 表头单独写，空列表导出后也能被重新导入
        wtr.write_record(ImportField::ALL.iter().map(|f| f.header()))?;
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlc() -> SearchResultRecord {
        SearchResultRecord {
            name: "VLC media player".to_string(),
            id: "VideoLAN.VLC".to_string(),
            version: "3.0.20".to_string(),
        }
    }

    fn sample_store() -> ImportStore {
        let mut store = ImportStore::new();
        store.add(ImportRecord::from_search(&vlc()).unwrap()).unwrap();

        let mut record = ImportRecord::new("7zip.7zip").unwrap();
        record.context = InstallContext::User;
        record.accept_newer_version = false;
        record.update_only = true;
        record.target_version = "23.01".to_string();
        record.stop_process_install = "7zFM".to_string();
        record.pre_script_install = r"C:\Scripts\pre, install.ps1".to_string();
        record.custom_argument_list_install = r#"/S /D="C:\Program Files\7-Zip""#.to_string();
        record.install_intent = "Required".to_string();
        record.notification = "showAll".to_string();
        record.group_id = "0f9c,aa".to_string();
        store.add(record).unwrap();
        store
    }

    #[test]
    fn moving_a_search_result_applies_defaults() {
        let mut store = ImportStore::new();
        store.add(ImportRecord::from_search(&vlc()).unwrap()).unwrap();

        assert_eq!(store.len(), 1);
        let record = store.get(0).unwrap();
        assert_eq!(record.package_id, "VideoLAN.VLC");
        assert_eq!(record.context, InstallContext::Machine);
        assert!(record.accept_newer_version);
        assert!(!record.update_only);
        for field in &ImportField::ALL[4..] {
            assert!(record.get(*field).is_empty(), "{} should be empty", field.header());
        }
    }

    #[test]
    fn empty_package_id_is_rejected() {
        assert!(matches!(ImportRecord::new("  "), Err(StoreError::EmptyPackageId)));
    }

    #[test]
    fn adding_twice_keeps_the_first_record() {
        let mut store = ImportStore::new();
        let mut first = ImportRecord::new("VideoLAN.VLC").unwrap();
        first.target_version = "3.0.18".to_string();
        store.add(first.clone()).unwrap();

        let second = ImportRecord::new("VideoLAN.VLC").unwrap();
        let err = store.add(second).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(ref id) if id == "VideoLAN.VLC"));
        assert_eq!(store.records(), &[first]);
    }

    #[test]
    fn removing_a_missing_record_is_a_noop() {
        let mut store = sample_store();
        let stranger = ImportRecord::new("Nobody.Nothing").unwrap();
        assert!(!store.remove(&stranger));
        assert_eq!(store.len(), 2);
        assert!(store.remove_at(10).is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove_preserves_order_of_the_rest() {
        let mut store = sample_store();
        store.add(ImportRecord::new("Git.Git").unwrap()).unwrap();
        let vlc_record = store.get(0).unwrap().clone();
        assert!(store.remove(&vlc_record));
        let ids: Vec<&str> = store.records().iter().map(|r| r.package_id.as_str()).collect();
        assert_eq!(ids, vec!["7zip.7zip", "Git.Git"]);
    }

    #[test]
    fn csv_round_trip_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.csv");
        let store = sample_store();
        store.export_csv(&path).unwrap();

        let mut loaded = ImportStore::new();
        let summary = loaded.load_csv(&path).unwrap();
        assert_eq!(summary.records, 2);
        assert!(summary.duplicates.is_empty());
        assert_eq!(loaded, store);
    }

    #[test]
    fn empty_store_round_trips_with_header() {
        let mut buf = Vec::new();
        ImportStore::new().write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with(r#""PackageID","Context","AcceptNewerVersion","UpdateOnly","TargetVersion","#));
        assert!(text.trim_end().ends_with(r#""InstallIntent","Notification","GroupID""#));

        let mut loaded = sample_store();
        loaded.load_from_reader(buf.as_slice()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn export_writes_true_false_and_quotes_commas() {
        let mut buf = Vec::new();
        sample_store().write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with(r#""VideoLAN.VLC","Machine","True","False","#));
        assert!(lines[2].contains(r#""C:\Scripts\pre, install.ps1""#));
        assert!(lines[2].ends_with(r#""0f9c,aa""#));
    }

    #[test]
    fn load_accepts_powershell_style_csv() {
        let csv = "#TYPE System.Management.Automation.PSCustomObject\n\
\"PackageID\",\"Context\",\"AcceptNewerVersion\",\"UpdateOnly\",\"GroupID\"\n\
\"Git.Git\",\"user\",\"true\",\"0\",\"abc\"\n";
        let mut store = ImportStore::new();
        store.load_from_reader(csv.as_bytes()).unwrap();

        let record = store.get(0).unwrap();
        assert_eq!(record.package_id, "Git.Git");
        assert_eq!(record.context, InstallContext::User);
        assert!(record.accept_newer_version);
        assert!(!record.update_only);
        assert_eq!(record.group_id, "abc");
        assert!(record.target_version.is_empty());
    }

    #[test]
    fn hash_prefixed_package_id_round_trips() {
        let mut store = ImportStore::new();
        store.add(ImportRecord::new("#Contoso.App").unwrap()).unwrap();
        store.add(ImportRecord::new("Git.Git").unwrap()).unwrap();

        let mut buf = Vec::new();
        store.write_to(&mut buf).unwrap();
        let mut loaded = ImportStore::new();
        let summary = loaded.load_from_reader(buf.as_slice()).unwrap();

        assert_eq!(summary.records, 2);
        assert_eq!(loaded, store);
    }

    #[test]
    fn unquoted_hash_row_is_data_not_comment() {
        let csv = "#TYPE System.Management.Automation.PSCustomObject\nPackageID\n#Contoso.App\nGit.Git\n";
        let mut store = ImportStore::new();
        store.load_from_reader(csv.as_bytes()).unwrap();
        let ids: Vec<&str> = store.records().iter().map(|r| r.package_id.as_str()).collect();
        assert_eq!(ids, vec!["#Contoso.App", "Git.Git"]);
    }

    #[test]
    fn blank_cells_take_defaults_like_missing_columns() {
        let csv = "PackageID,Context,AcceptNewerVersion,UpdateOnly\nGit.Git,,,\n";
        let mut store = ImportStore::new();
        store.load_from_reader(csv.as_bytes()).unwrap();

        let record = store.get(0).unwrap();
        assert_eq!(record, &ImportRecord::new("Git.Git").unwrap());
    }

    #[test]
    fn load_replaces_and_reports_duplicates() {
        let csv = "PackageID,Context\nGit.Git,Machine\nGit.Git,User\nVideoLAN.VLC,Machine\n";
        let mut store = sample_store();
        let summary = store.load_from_reader(csv.as_bytes()).unwrap();

        assert_eq!(summary.records, 3);
        assert_eq!(summary.duplicates, vec!["Git.Git".to_string()]);
        assert_eq!(store.len(), 3);
        assert!(!store.contains("7zip.7zip"));
    }

    #[test]
    fn failed_load_leaves_store_untouched() {
        let before = sample_store();

        let cases = [
            // 缺少 PackageID 列
            "Context,AcceptNewerVersion\nMachine,True\n",
            // PackageID 为空
            "PackageID,Context\n,Machine\n",
            // 上下文非法
            "PackageID,Context\nGit.Git,Everyone\n",
            // 布尔值非法
            "PackageID,UpdateOnly\nGit.Git,maybe\n",
            // 列数不一致
            "PackageID,Context\nGit.Git,Machine,extra\n",
        ];
        for case in cases {
            let mut store = before.clone();
            assert!(store.load_from_reader(case.as_bytes()).is_err(), "{case}");
            assert_eq!(store, before);
        }
    }

    #[test]
    fn load_of_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = sample_store();
        let err = store.load_csv(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn export_to_unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/list.csv");
        assert!(matches!(sample_store().export_csv(&path), Err(StoreError::Io(_))));
    }

    #[test]
    fn set_field_validates_and_keeps_ids_unique() {
        let mut store = sample_store();

        store.set_field(0, ImportField::Context, "user").unwrap();
        store.set_field(0, ImportField::UpdateOnly, "yes").unwrap();
        store.set_field(0, ImportField::TargetVersion, "3.0.18").unwrap();
        let record = store.get(0).unwrap();
        assert_eq!(record.context, InstallContext::User);
        assert!(record.update_only);
        assert_eq!(record.get(ImportField::TargetVersion), "3.0.18");

        assert!(matches!(
            store.set_field(0, ImportField::PackageId, "7zip.7zip"),
            Err(StoreError::DuplicateKey(_))
        ));
        assert!(matches!(
            store.set_field(0, ImportField::AcceptNewerVersion, "sometimes"),
            Err(StoreError::InvalidValue { .. })
        ));
        assert!(matches!(
            store.set_field(5, ImportField::Notification, "x"),
            Err(StoreError::IndexOutOfRange(5))
        ));
        // 改成自身当前的 ID 不算重复
        store.set_field(0, ImportField::PackageId, "VideoLAN.VLC").unwrap();
    }

    #[test]
    fn header_order_matches_serialized_field_order() {
        let mut buf = Vec::new();
        {
            let mut wtr = csv::Writer::from_writer(&mut buf);
            wtr.serialize(ImportRecord::new("A.B").unwrap()).unwrap();
            wtr.flush().unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let header = text.lines().next().unwrap();
        let expected: Vec<&str> = ImportField::ALL.iter().map(|f| f.header()).collect();
        assert_eq!(header, expected.join(","));
    }
}
