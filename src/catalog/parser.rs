//! winget 输出解析函数

use super::types::{PackageDetail, SearchResultRecord};
use regex::Regex;
use std::sync::LazyLock;

/// winget 搜索无结果时输出的整行提示
pub const NO_PACKAGE_FOUND: &str = "No package found matching input criteria.";

/// 列被截断时 winget 输出的省略号；按 Windows-1252 解码后会变成 `â€¦`
const TRUNCATION_ARTIFACTS: &[&str] = &["â€¦", "…"];

/// 搜索结果行：名称（贪婪）+ 点分标识 + 版本，后面可能还有 Match / Source 列。
///
/// 标识的第一段必须含字母，这样 `3.0.20` 之类的版本号不会被误认成标识。
static SEARCH_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>.+)\s+(?P<id>[^\s.]*[A-Za-z][^\s.]*(?:\.[^\s.]+)+)\s+(?P<version>\S+)(?:\s.*)?$",
    )
    .expect("search line pattern is valid")
});

/// 清理单行终端输出：去掉 ANSI 转义序列、控制字符，
/// 以及 `\r` 就地刷新的旋转进度（只保留最后一段可见文本）
pub fn clean_line(line: &str) -> String {
    let visible = line
        .rsplit('\r')
        .find(|segment| !segment.trim().is_empty())
        .unwrap_or("");

    let mut result = String::with_capacity(visible.len());
    let mut chars = visible.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\x1b' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    while let Some(&next) = chars.peek() {
                        chars.next();
                        if next.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
            }
            c if c.is_control() && c != '\t' => {}
            _ => result.push(c),
        }
    }

    result
}

/// 输出中是否包含"未找到包"提示（调用方据此直接返回空结果）
pub fn is_no_package_found(output: &str) -> bool {
    output
        .lines()
        .any(|line| clean_line(line).trim() == NO_PACKAGE_FOUND)
}

fn strip_truncation(id: &str) -> String {
    TRUNCATION_ARTIFACTS
        .iter()
        .fold(id.to_string(), |acc, artifact| acc.replace(artifact, ""))
}

/// 解析 `winget search` 的表格输出。
///
/// 不匹配的行（表头、分隔线、被截断的行）直接丢弃；结果保持输入顺序，不去重。
pub fn parse_search_output(output: &str) -> Vec<SearchResultRecord> {
    output
        .lines()
        .filter_map(|line| {
            let cleaned = clean_line(line);
            let caps = SEARCH_LINE.captures(&cleaned)?;

            let name = caps["name"].trim().to_string();
            let id = strip_truncation(caps["id"].trim()).trim().to_string();
            let version = caps["version"].trim().to_string();

            if name.is_empty() || id.is_empty() {
                return None;
            }
            Some(SearchResultRecord { name, id, version })
        })
        .collect()
}

/// 解析 `winget show --id` 的详情输出
pub fn parse_package_detail(output: &str) -> PackageDetail {
    let mut fields: Vec<(String, String)> = Vec::new();

    for raw in output.lines() {
        let line = clean_line(raw);
        if line.trim().is_empty() {
            continue;
        }
        let indented = line.starts_with(' ') || line.starts_with('\t');

        if !indented {
            if let Some(colon_pos) = line.find(':') {
                let key = line[..colon_pos].trim();
                let value = line[colon_pos + 1..].trim();
                if !key.is_empty() {
                    fields.push((key.to_string(), value.to_string()));
                    continue;
                }
            }
        }
        if indented {
            if let Some(last) = fields.last_mut() {
                if !last.1.is_empty() {
                    last.1.push(' ');
                }
                last.1.push_str(line.trim());
            }
        }
    }

    PackageDetail { fields }
}

/// 解析 `winget show --id <id> --versions`：分隔线之后的每个非空行都是一个版本
pub fn parse_versions(output: &str) -> Vec<String> {
    let mut versions = Vec::new();
    let mut after_separator = false;

    for raw in output.lines() {
        let line = clean_line(raw);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !after_separator {
            after_separator = trimmed.chars().all(|c| c == '-');
            continue;
        }
        versions.push(trimmed.to_string());
    }

    versions
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_OUTPUT: &str = "\
Name               Id                  Version   Match        Source
-------------------------------------------------------------------
VLC media player   VideoLAN.VLC        3.0.20                 winget
VLC UWP            9NBLGGH4VVNH        Unknown                msstore
Microsoft .NET SDK 8.0 Microsoft.DotNet.SDK.8 8.0.100 Tag: dotnet winget
Visual Studio Code Microsoft.VisualStudioCode… 1.85.1 winget
";

    #[test]
    fn parses_literal_example() {
        let records = parse_search_output("VLC media player   VideoLAN.VLC   3.0.20");
        assert_eq!(
            records,
            vec![SearchResultRecord {
                name: "VLC media player".to_string(),
                id: "VideoLAN.VLC".to_string(),
                version: "3.0.20".to_string(),
            }]
        );
    }

    #[test]
    fn dash_line_produces_nothing() {
        assert!(parse_search_output("-----------").is_empty());
    }

    #[test]
    fn skips_header_and_undotted_ids() {
        let records = parse_search_output(SEARCH_OUTPUT);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["VideoLAN.VLC", "Microsoft.DotNet.SDK.8", "Microsoft.VisualStudioCode"]
        );
    }

    #[test]
    fn dotted_tokens_inside_name_stay_in_name() {
        let records = parse_search_output(SEARCH_OUTPUT);
        assert_eq!(records[1].name, "Microsoft .NET SDK 8.0");
        assert_eq!(records[1].version, "8.0.100");
    }

    #[test]
    fn dotted_tag_in_match_column_wins_over_id() {
        // 名称捕获是贪婪的：Match 列里带点的标签会被当成 ID，行为固定在这里
        let records =
            parse_search_output("Node.js   OpenJS.NodeJS   20.10.0   Tag: node.js   winget");
        assert_eq!(
            records,
            vec![SearchResultRecord {
                name: "Node.js   OpenJS.NodeJS   20.10.0   Tag:".to_string(),
                id: "node.js".to_string(),
                version: "winget".to_string(),
            }]
        );
    }

    #[test]
    fn strips_mojibake_ellipsis_from_id_only() {
        let line = "Some Long Applicationâ€¦  Publisher.SomeLongAppâ€¦  2.1";
        let records = parse_search_output(line);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "Publisher.SomeLongApp");
        assert_eq!(records[0].name, "Some Long Applicationâ€¦");
    }

    #[test]
    fn truncated_row_without_version_is_dropped() {
        assert!(parse_search_output("Microsoft Visual Studio  Microsoft.Visual…").is_empty());
    }

    #[test]
    fn spinner_residue_is_ignored() {
        let output = "\r   - \r   \\ \r\x1b[2KVLC media player   VideoLAN.VLC   3.0.20\r\n";
        let records = parse_search_output(output);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "VLC media player");
    }

    #[test]
    fn output_never_exceeds_line_count_and_fields_are_non_empty() {
        let records = parse_search_output(SEARCH_OUTPUT);
        assert!(records.len() <= SEARCH_OUTPUT.lines().count());
        for r in &records {
            assert!(!r.name.trim().is_empty());
            assert!(!r.id.trim().is_empty());
        }
    }

    #[test]
    fn whitespace_name_is_excluded() {
        assert!(parse_search_output("    VideoLAN.VLC   3.0.20").is_empty());
    }

    #[test]
    fn detects_no_package_sentinel() {
        assert!(is_no_package_found("\r - \rNo package found matching input criteria.\r\n"));
        assert!(!is_no_package_found(SEARCH_OUTPUT));
    }

    #[test]
    fn parses_show_output() {
        let output = "\
Found VLC media player [VideoLAN.VLC]
Version: 3.0.20
Publisher: VideoLAN
Homepage: https://www.videolan.org/
Tags:
  dvd
  media
Installer:
  Installer Type: nullsoft
";
        let detail = parse_package_detail(output);
        assert_eq!(detail.get("version"), Some("3.0.20"));
        assert_eq!(detail.get("Homepage"), Some("https://www.videolan.org/"));
        assert_eq!(detail.get("Tags"), Some("dvd media"));
        assert_eq!(detail.get("Installer"), Some("Installer Type: nullsoft"));
        assert_eq!(detail.fields[0].0, "Version");
    }

    #[test]
    fn parses_versions_after_separator() {
        let output = "\
Found VLC media player [VideoLAN.VLC]
Version
-------
3.0.20
3.0.18

";
        assert_eq!(parse_versions(output), vec!["3.0.20", "3.0.18"]);
    }

    #[test]
    fn versions_without_separator_are_empty() {
        assert!(parse_versions("No package found matching input criteria.").is_empty());
    }
}
