use reqwest::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HelpError {
    #[error("未配置字段说明地址 (help_url)")]
    NotConfigured,
    #[error("获取字段说明失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("字段说明请求失败 (状态码 {0})")]
    Status(u16),
    #[error("文档中没有 {0} 的说明")]
    NotFound(String),
}

/// 字段说明：下载一份静态文档，按字段名查找描述
pub struct FieldHelpClient {
    client: Client,
    url: String,
}

impl FieldHelpClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub async fn fetch_document(&self) -> Result<String, HelpError> {
        if self.url.trim().is_empty() {
            return Err(HelpError::NotConfigured);
        }
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(HelpError::Status(response.status().as_u16()));
        }
        Ok(response.text().await?)
    }

    pub async fn describe(&self, field: &str) -> Result<String, HelpError> {
        let doc = self.fetch_document().await.inspect_err(|e| {
            log::warn!("字段说明下载失败: {}", e);
        })?;
        describe_field(&doc, field).ok_or_else(|| HelpError::NotFound(field.to_string()))
    }
}

fn strip_markup(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '`' || c == '*' || c == '_').trim()
}

/// 在文档里查找第一处以字段名开头的说明。
///
/// 支持 markdown 表格行 `| Field | 说明 |`、列表项 `- **Field**: 说明` 和 `Field: 说明`。
pub fn describe_field(doc: &str, field: &str) -> Option<String> {
    for line in doc.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with('|') {
            let cells: Vec<&str> = trimmed
                .trim_matches('|')
                .split('|')
                .map(str::trim)
                .collect();
            if cells.first().map(|c| strip_markup(c) == field).unwrap_or(false) {
                let text = cells[1..]
                    .iter()
                    .filter(|c| !c.is_empty())
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" ");
                if !text.is_empty() {
                    return Some(text);
                }
            }
            continue;
        }

        let item = trimmed.trim_start_matches(['-', '*', ' ']);
        let item = item.trim_start_matches("**").trim_start_matches('`');
        if let Some(rest) = item.strip_prefix(field) {
            let rest = rest.trim_start_matches(['*', '`']).trim_start();
            if let Some(desc) = rest.strip_prefix(':').or_else(|| rest.strip_prefix('-')) {
                let desc = desc.trim();
                if !desc.is_empty() {
                    return Some(desc.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
# Columns

| Column | Description |
|--------|-------------|
| `PackageID` | The winget package identifier. |
| Context | Install as `Machine` or `User`. |
| AcceptNewerVersion | Allow newer versions | default True |

- **UpdateOnly**: Only create an update application.
TargetVersion: Pin to this version; empty means latest.
";

    #[test]
    fn finds_table_rows() {
        assert_eq!(
            describe_field(DOC, "PackageID").as_deref(),
            Some("The winget package identifier.")
        );
        assert_eq!(
            describe_field(DOC, "AcceptNewerVersion").as_deref(),
            Some("Allow newer versions default True")
        );
    }

    #[test]
    fn finds_list_items_and_plain_lines() {
        assert_eq!(
            describe_field(DOC, "UpdateOnly").as_deref(),
            Some("Only create an update application.")
        );
        assert_eq!(
            describe_field(DOC, "TargetVersion").as_deref(),
            Some("Pin to this version; empty means latest.")
        );
    }

    #[test]
    fn unknown_field_is_none() {
        assert_eq!(describe_field(DOC, "GroupID"), None);
        // 表头里的 Column 不是字段
        assert_eq!(describe_field(DOC, "Description"), None);
    }

    #[tokio::test]
    async fn fetches_and_describes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/README.md")
            .with_status(200)
            .with_body(DOC)
            .create_async()
            .await;

        let client = FieldHelpClient::new(format!("{}/README.md", server.url()));
        let desc = client.describe("Context").await.unwrap();
        assert_eq!(desc, "Install as `Machine` or `User`.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_failure_is_reported_not_fatal() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/README.md")
            .with_status(404)
            .create_async()
            .await;

        let client = FieldHelpClient::new(format!("{}/README.md", server.url()));
        assert!(matches!(client.describe("Context").await, Err(HelpError::Status(404))));
    }

    #[tokio::test]
    async fn empty_url_is_not_configured() {
        let client = FieldHelpClient::new("");
        assert!(matches!(client.fetch_document().await, Err(HelpError::NotConfigured)));
    }
}
