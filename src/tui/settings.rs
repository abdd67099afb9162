use super::input;
use super::layout;
use super::state::{App, AppEvent, AppMode, SettingsItem};
use super::theme::{ACCENT, BRIGHT_WHITE, DIM, HIGHLIGHT, SEL_BG};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

/// 处理设置模式按键
pub fn handle_settings_key(key: KeyEvent, app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    if app.settings.editing {
        handle_editing_key(key, app, tx)
    } else {
        handle_browsing_key(key, app)
    }
}

fn handle_browsing_key(key: KeyEvent, app: &mut App) {
    let total = app.settings_focusable_count();
    match key.code {
        KeyCode::Esc => app.mode = AppMode::Dashboard,
        KeyCode::Up => {
            app.settings.selected = app.settings.selected.saturating_sub(1);
            app.settings.message = None;
        }
        KeyCode::Down => {
            if app.settings.selected + 1 < total {
                app.settings.selected += 1;
            }
            app.settings.message = None;
        }
        KeyCode::Enter => {
            app.start_settings_edit();
            app.settings.message = None;
        }
        KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.save_settings();
        }
        _ => {}
    }
}

fn handle_editing_key(key: KeyEvent, app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    match key.code {
        KeyCode::Esc => app.settings.editing = false,
        KeyCode::Enter => {
            app.confirm_settings_edit();
            // winget 命令改了就重新检测
            if app.catalog.is_none() {
                super::spawn_detect(app.config.winget_command.clone(), tx);
            }
        }
        _ => {
            let settings = &mut app.settings;
            input::handle_edit_key(key, &mut settings.edit_buffer, &mut settings.edit_cursor);
        }
    }
}

/// 渲染设置视图
pub fn render_settings(f: &mut Frame, app: &App) {
    let chunks = layout::main_layout(f.area());
    layout::render_header(f, "⚙  设置 (Shift+C)", chunks[0]);

    let content_block = Block::default()
        .title(format!(" {} ", crate::config::Config::config_path().display()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let content_inner = content_block.inner(chunks[1]);
    f.render_widget(content_block, chunks[1]);

    let padded = content_inner.inner(Margin {
        horizontal: 2,
        vertical: 1,
    });
    if padded.height >= 3 {
        render_items(f, app, padded);
    }

    let hint = if app.settings.editing {
        "输入新值 | Enter 确认 | Esc 取消"
    } else {
        "↑↓ 选择 | Enter 编辑 | Ctrl+S 保存 | Esc 返回"
    };
    layout::render_footer(f, hint, app.settings.message.as_deref(), chunks[2]);
}

fn render_items(f: &mut Frame, app: &App, area: Rect) {
    let items = &app.settings.items;
    let max_label_width = items
        .iter()
        .filter_map(|item| match item {
            SettingsItem::TextEdit { label, .. } => Some(UnicodeWidthStr::width(label.as_str())),
            SettingsItem::Section(_) => None,
        })
        .max()
        .unwrap_or(10);

    let mut lines: Vec<Line> = Vec::new();
    let mut focusable_idx = 0;
    for (i, item) in items.iter().enumerate() {
        match item {
            SettingsItem::Section(title) => {
                if i > 0 {
                    lines.push(Line::from(""));
                }
                lines.push(Line::from(Span::styled(
                    format!("── {} ──", title),
                    Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD),
                )));
            }
            SettingsItem::TextEdit { label, value, .. } => {
                let is_selected = focusable_idx == app.settings.selected;
                let padding = max_label_width.saturating_sub(UnicodeWidthStr::width(label.as_str()));
                let label_padded = format!(" {}:{} ", label, " ".repeat(padding));
                let bg = if is_selected {
                    Style::default().bg(SEL_BG)
                } else {
                    Style::default()
                };

                let mut spans = vec![Span::styled(
                    label_padded,
                    bg.fg(ACCENT).add_modifier(Modifier::BOLD),
                )];
                if is_selected && app.settings.editing {
                    spans.extend(input::cursor_spans(
                        &app.settings.edit_buffer,
                        app.settings.edit_cursor,
                        true,
                    ));
                } else if value.is_empty() {
                    spans.push(Span::styled("(未设置)", bg.fg(DIM)));
                } else {
                    let fg = if is_selected { BRIGHT_WHITE } else { Color::White };
                    spans.push(Span::styled(value.clone(), bg.fg(fg)));
                }
                lines.push(Line::from(spans));
                focusable_idx += 1;
            }
        }
    }

    let visible_height = area.height as usize;
    let total_lines = lines.len();
    let selected_line = find_selected_line(items, app.settings.selected);
    let scroll = if total_lines > visible_height && selected_line >= visible_height {
        selected_line.saturating_sub(visible_height / 2)
    } else {
        0
    };

    let visible: Vec<Line> = lines.into_iter().skip(scroll).take(visible_height).collect();
    f.render_widget(Paragraph::new(visible), area);
}

/// 找到选中项在渲染行中的行号
fn find_selected_line(items: &[SettingsItem], selected: usize) -> usize {
    let mut line = 0;
    let mut focusable_idx = 0;
    for (i, item) in items.iter().enumerate() {
        match item {
            SettingsItem::Section(_) => {
                if i > 0 {
                    line += 1;
                }
                line += 1;
            }
            SettingsItem::TextEdit { .. } => {
                if focusable_idx == selected {
                    return line;
                }
                line += 1;
                focusable_idx += 1;
            }
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn selected_line_skips_section_headers() {
        let mut app = App::new(Config::default());
        app.build_settings_items();
        // 租户标题占第 0 行
        assert_eq!(find_selected_line(&app.settings.items, 0), 1);
        // 第二组前有空行和标题
        assert_eq!(find_selected_line(&app.settings.items, 3), 6);
    }

    #[test]
    fn escape_cancels_edit_without_writing() {
        let mut app = App::new(Config::default());
        app.mode = AppMode::Settings;
        app.build_settings_items();
        let (tx, _rx) = mpsc::channel(4);

        handle_settings_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE), &mut app, &tx);
        assert!(app.settings.editing);
        handle_settings_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE), &mut app, &tx);
        handle_settings_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE), &mut app, &tx);
        assert!(!app.settings.editing);
        assert_eq!(app.config.tenant.tenant_id, "");
        assert_eq!(app.mode, AppMode::Settings);
    }
}
