//! Catalog 相关数据类型定义

/// 搜索结果条目（每次搜索重新生成）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultRecord {
    pub name: String,
    pub id: String,
    pub version: String,
}

/// 包详情（`show --id` 的键值字段，保持原始顺序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageDetail {
    pub fields: Vec<(String, String)>,
}

impl PackageDetail {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}
