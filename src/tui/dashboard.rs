use super::state::App;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const ASCII_LOGO: &str = r#"
██       ██                   
░██      ░░                   
░██       ██  ██████  ███████ 
░██      ░██ ░░░░░░██░░██░░░██
░██      ░██  ███████ ░██  ░██
░██      ░██ ██░░░░██ ░██  ░██
░████████░██░░████████░██  ░██
░░░░░░░░ ░░  ░░░░░░░░ ░░   ░░"#;

pub fn render_dashboard(f: &mut Frame, app: &App) {
    let area = f.area();
    f.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
        area,
    );

    let mut lines: Vec<Line> = vec![Line::from("")];
    for logo_line in ASCII_LOGO.lines() {
        lines.push(Line::from(Span::styled(
            logo_line.to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(Span::styled(
        "winget → Intune 导入列表",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    lines.push(section_title("── 状态 ──"));
    lines.push(Line::from(""));

    let catalog = match &app.catalog {
        Some(c) => c.name().to_string(),
        None => match &app.catalog_error {
            Some(e) => format!("不可用 ({})", e),
            None => "检测中...".to_string(),
        },
    };
    lines.push(info_line("winget  ", &catalog));
    lines.push(info_line("导入列表  ", &format!("{} 个软件包", app.store.len())));

    let tenant = &app.config.tenant.tenant_id;
    let tenant = if tenant.is_empty() { "(未设置)" } else { tenant.as_str() };
    lines.push(info_line("租户  ", tenant));
    lines.push(info_line("工作目录  ", &app.config.work_dir.display().to_string()));
    if app.is_launching() {
        lines.push(Line::from(Span::styled(
            "导入进行中...",
            Style::default().fg(Color::Yellow),
        )));
    }

    lines.push(Line::from(""));
    lines.push(section_title("── 快捷键 ──"));
    lines.push(Line::from(""));
    lines.push(shortcut_line("S", " 搜索软件包   "));
    lines.push(shortcut_line("L", " 导入列表     "));
    lines.push(shortcut_line("C", " 设置         "));
    lines.push(shortcut_line("q", " 退出         "));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("lian-winget v{}  ", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::DarkGray),
    )));

    // 垂直居中
    let content_height = lines.len() as u16;
    let inner = area.inner(Margin {
        horizontal: 1,
        vertical: 1,
    });
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(content_height),
            Constraint::Min(0),
        ])
        .split(inner);

    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), vertical[1]);
}

fn section_title(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(
        text,
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ))
}

/// 状态行: "标签: 值"
fn info_line(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{label}: "),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled(value.to_string(), Style::default().fg(Color::White)),
    ])
}

/// 快捷键行: "  X  描述"
fn shortcut_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(
            format!("  {key}"),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(desc.to_string(), Style::default().fg(Color::White)),
    ])
}
