use super::input;
use super::launch;
use super::layout;
use super::state::{App, AppEvent, AppMode, ListPrompt};
use super::theme::{ACCENT, BRIGHT_WHITE, DESC_DIM, DIM, HIGHLIGHT, SEL_BG};
use crate::field_help::FieldHelpClient;
use crate::store::ImportField;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

pub fn handle_list_key(key: KeyEvent, app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    if app.list.prompt.is_some() {
        handle_prompt_key(key, app);
        return;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.mode = AppMode::Dashboard,
        KeyCode::Up => {
            app.list.selected = app.list.selected.saturating_sub(1);
            app.list.help = None;
        }
        KeyCode::Down => {
            if app.list.selected + 1 < app.store.len() {
                app.list.selected += 1;
            }
            app.list.help = None;
        }
        KeyCode::Left => {
            app.list.field = app.list.field.saturating_sub(1);
            app.list.help = None;
        }
        KeyCode::Right => {
            if app.list.field + 1 < ImportField::ALL.len() {
                app.list.field += 1;
            }
            app.list.help = None;
        }
        KeyCode::Enter => app.activate_current_field(),
        KeyCode::Char('d') | KeyCode::Delete if !ctrl => app.delete_selected_row(),
        KeyCode::Char('o') if ctrl => {
            let path = app.default_csv_path().display().to_string();
            app.list.open_prompt(ListPrompt::ImportCsv, path);
        }
        KeyCode::Char('s') if ctrl => {
            let path = app.default_csv_path().display().to_string();
            app.list.open_prompt(ListPrompt::ExportCsv, path);
        }
        KeyCode::Char('r') if ctrl => launch::spawn_launch_task(app, tx),
        KeyCode::Char('?') => fetch_field_help(app, tx),
        _ => {}
    }
}

fn handle_prompt_key(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Esc => app.list.close_prompt(),
        KeyCode::Enter => app.confirm_list_prompt(),
        _ => {
            let list = &mut app.list;
            input::handle_edit_key(key, &mut list.buffer, &mut list.cursor);
        }
    }
}

/// 后台下载字段说明文档，结果以事件形式回到主循环
fn fetch_field_help(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let field = app.list.current_field();
    app.list.help = Some(format!("正在获取 {} 的说明...", field.header()));
    let client = FieldHelpClient::new(app.config.help_url.clone());
    let tx = tx.clone();
    tokio::spawn(async move {
        let text = match client.describe(field.header()).await {
            Ok(desc) => desc,
            Err(e) => format!("✗ {}", e),
        };
        let _ = tx.send(AppEvent::FieldHelp { field, text }).await;
    });
}

// ===== 渲染 =====

pub fn render_import_list(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // 列表 + 字段
            Constraint::Length(3), // 提示 / 输入
            Constraint::Length(3), // footer
        ])
        .split(f.area());

    let title = if app.is_launching() {
        format!("📋 导入列表 ({}) - 导入中，只读", app.store.len())
    } else {
        format!("📋 导入列表 ({}) (Shift+L)", app.store.len())
    };
    layout::render_header(f, &title, chunks[0]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);
    render_rows(f, app, panels[0]);
    render_fields(f, app, panels[1]);

    render_prompt_line(f, app, chunks[2]);

    let hint = if app.list.prompt.is_some() {
        "Enter 确认 | Esc 取消"
    } else {
        "↑↓ 行 | ←→ 字段 | Enter 编辑 | d 删除 | ? 说明 | Ctrl+O 导入 | Ctrl+S 导出 | Ctrl+R 开始导入 | Esc 返回"
    };
    layout::render_footer(f, hint, app.status.as_deref(), chunks[3]);
}

fn render_rows(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" PackageID ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(block, area);
    let padded = inner.inner(Margin {
        horizontal: 1,
        vertical: 0,
    });

    if app.store.is_empty() {
        f.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled("列表为空", Style::default().fg(Color::DarkGray))),
                Line::from(Span::styled(
                    "Shift+S 搜索后按 Tab 加入，或 Ctrl+O 导入 CSV",
                    Style::default().fg(Color::DarkGray),
                )),
            ]),
            padded,
        );
        return;
    }

    let visible = padded.height as usize;
    let scroll = layout::follow_selection(app.list.selected, visible);
    let lines: Vec<Line> = app
        .store
        .records()
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible)
        .map(|(i, record)| {
            let selected = i == app.list.selected;
            let base = if selected {
                Style::default().bg(SEL_BG)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(
                    if selected { "► " } else { "  " },
                    base.fg(BRIGHT_WHITE).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    record.package_id.clone(),
                    base.fg(if selected { BRIGHT_WHITE } else { ACCENT }),
                ),
                Span::styled(
                    format!("  {}", record.context),
                    base.fg(if selected { DESC_DIM } else { DIM }),
                ),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), padded);

    if app.store.len() > visible {
        layout::render_scrollbar(f, app.store.len(), scroll, area);
    }
}

fn render_fields(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" 字段 ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(block, area);
    let padded = inner.inner(Margin {
        horizontal: 1,
        vertical: 0,
    });

    let Some(record) = app.store.get(app.list.selected) else {
        return;
    };

    let label_width = ImportField::ALL
        .iter()
        .map(|field| UnicodeWidthStr::width(field.header()))
        .max()
        .unwrap_or(0);
    let current = app.list.current_field();

    let mut lines: Vec<Line> = ImportField::ALL
        .iter()
        .map(|&field| {
            let selected = field == current;
            let base = if selected {
                Style::default().bg(SEL_BG)
            } else {
                Style::default()
            };
            let pad = label_width.saturating_sub(UnicodeWidthStr::width(field.header()));
            let value = record.get(field);
            let value_span = if value.is_empty() {
                Span::styled("-", base.fg(DIM))
            } else {
                Span::styled(value, base.fg(if selected { BRIGHT_WHITE } else { Color::White }))
            };
            Line::from(vec![
                Span::styled(
                    format!("{}{}  ", field.header(), " ".repeat(pad)),
                    base.fg(if selected { HIGHLIGHT } else { ACCENT })
                        .add_modifier(Modifier::BOLD),
                ),
                value_span,
            ])
        })
        .collect();

    if let Some(help) = &app.list.help {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            help.clone(),
            Style::default().fg(Color::Cyan),
        )));
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), padded);
}

fn render_prompt_line(f: &mut Frame, app: &App, area: Rect) {
    match &app.list.prompt {
        Some(prompt) => {
            let label = match prompt {
                ListPrompt::ImportCsv => "导入 CSV:".to_string(),
                ListPrompt::ExportCsv => "导出 CSV:".to_string(),
                ListPrompt::EditField(field) => format!("{}:", field.header()),
            };
            input::render_input_box(f, &app.list.buffer, app.list.cursor, &label, true, area);
        }
        None => {
            let field = app.list.current_field();
            let tip = if field.is_bool() || field == ImportField::Context {
                format!("{}: Enter 切换", field.header())
            } else {
                format!("{}: Enter 编辑", field.header())
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray));
            f.render_widget(
                Paragraph::new(Span::styled(tip, Style::default().fg(Color::DarkGray))).block(block),
                area,
            );
        }
    }
}
