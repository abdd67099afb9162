use super::input;
use super::layout;
use super::state::{App, AppEvent, AppMode, SearchView};
use super::theme::{ACCENT, BRIGHT_WHITE, DESC_DIM, DIM, HIGHLIGHT, SEL_BG};
use crate::catalog::SearchResultRecord;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::time::Instant;
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

/// 详情视图总行数（用于滚动边界）
pub fn detail_total_lines(app: &App) -> usize {
    let fields = app.search.detail.as_ref().map(|d| d.fields.len()).unwrap_or(0);
    let versions = if app.search.versions.is_empty() {
        0
    } else {
        2 + app.search.versions.len()
    };
    fields + versions
}

pub fn handle_search_key(
    key: KeyEvent,
    app: &mut App,
    tx: &mpsc::Sender<AppEvent>,
    term_height: u16,
) {
    match app.search.view {
        SearchView::List => handle_list_key(key, app, tx),
        SearchView::Detail => handle_detail_key(key, app, term_height),
    }
}

fn handle_list_key(key: KeyEvent, app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    match key.code {
        KeyCode::Esc => {
            app.mode = AppMode::Dashboard;
            app.reset_search_state();
        }
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.mode = AppMode::ImportList;
        }
        KeyCode::Up => {
            app.search.selected = app.search.selected.saturating_sub(1);
        }
        KeyCode::Down => {
            if app.search.selected + 1 < app.search.results.len() {
                app.search.selected += 1;
            }
        }
        KeyCode::Tab => app.move_selected_to_store(),
        KeyCode::Enter => load_detail(app, tx),
        _ => {
            let search = &mut app.search;
            if input::handle_edit_key(key, &mut search.input, &mut search.cursor) {
                schedule_search(app);
            }
        }
    }
}

/// 标记一次待执行的搜索，由主循环在防抖结束后执行
fn schedule_search(app: &mut App) {
    app.search.search_seq += 1;
    if app.search.input.trim().is_empty() {
        app.search.search_scheduled = None;
        app.search.results.clear();
        app.search.selected = 0;
        app.search.searching = false;
        return;
    }
    app.search.search_scheduled = Some(Instant::now());
    app.search.searching = true;
}

/// 防抖结束后真正发起搜索
pub fn execute_pending_search(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let Some(catalog) = app.catalog.clone() else {
        app.search.searching = false;
        app.status = Some("✗ winget 尚未就绪".to_string());
        return;
    };
    let query = app.search.input.clone();
    let seq = app.search.search_seq;
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = tokio::task::spawn_blocking(move || catalog.search(&query)).await;
        let event = match result {
            Ok(Ok(results)) => AppEvent::SearchResults { results, seq },
            Ok(Err(e)) => AppEvent::SearchFailed {
                message: e.to_string(),
                seq,
            },
            Err(e) => AppEvent::SearchFailed {
                message: format!("任务执行失败: {}", e),
                seq,
            },
        };
        let _ = tx.send(event).await;
    });
}

/// 加载选中包的 show 与版本列表
fn load_detail(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let Some(result) = app.search.selected_result().cloned() else {
        return;
    };
    let Some(catalog) = app.catalog.clone() else {
        return;
    };
    app.status = Some(format!("正在获取 {} 的详情...", result.id));
    let tx = tx.clone();
    tokio::spawn(async move {
        let id = result.id.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let detail = catalog.show(&id)?;
            // 版本列表拿不到不影响详情显示
            let versions = catalog.versions(&id).unwrap_or_else(|e| {
                log::warn!("获取 {} 版本列表失败: {}", id, e);
                Vec::new()
            });
            Ok::<_, crate::catalog::CatalogError>((detail, versions))
        })
        .await;
        let event = match joined {
            Ok(Ok((detail, versions))) => AppEvent::DetailLoaded {
                id: result.id,
                detail,
                versions,
            },
            Ok(Err(e)) => AppEvent::Error(format!("获取包信息失败: {}", e)),
            Err(e) => AppEvent::Error(format!("任务执行失败: {}", e)),
        };
        let _ = tx.send(event).await;
    });
}

fn handle_detail_key(key: KeyEvent, app: &mut App, term_height: u16) {
    let visible = layout::visible_content_height(term_height);
    let max_scroll = detail_total_lines(app).saturating_sub(visible);

    match key.code {
        KeyCode::Esc => {
            app.search.view = SearchView::List;
            app.search.detail = None;
            app.search.detail_id = None;
            app.search.versions.clear();
            app.search.detail_scroll = 0;
        }
        KeyCode::Tab => app.move_selected_to_store(),
        KeyCode::Up => {
            app.search.detail_scroll = app.search.detail_scroll.saturating_sub(1);
        }
        KeyCode::Down => {
            if app.search.detail_scroll < max_scroll {
                app.search.detail_scroll += 1;
            }
        }
        KeyCode::PageUp => {
            app.search.detail_scroll = app.search.detail_scroll.saturating_sub(10);
        }
        KeyCode::PageDown => {
            app.search.detail_scroll = (app.search.detail_scroll + 10).min(max_scroll);
        }
        _ => {}
    }
}

// ===== 渲染 =====

pub fn render_search(f: &mut Frame, app: &App) {
    match app.search.view {
        SearchView::List => render_list_view(f, app),
        SearchView::Detail => render_detail_view(f, app),
    }
}

fn render_list_view(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(3), // 输入框
            Constraint::Min(0),    // 结果
            Constraint::Length(3), // footer
        ])
        .split(f.area());

    layout::render_header(f, "🔍 搜索 winget 软件包 (Shift+S)", chunks[0]);
    input::render_input_box(f, &app.search.input, app.search.cursor, ">", true, chunks[1]);
    render_results(f, app, chunks[2]);

    let hint = if app.search.searching {
        "搜索中... | ↑↓ 选择 | Enter 详情 | Tab 加入导入列表 | Ctrl+L 导入列表 | Esc 返回"
    } else {
        "输入关键词搜索 | ↑↓ 选择 | Enter 详情 | Tab 加入导入列表 | Ctrl+L 导入列表 | Esc 返回"
    };
    layout::render_footer(f, hint, app.status.as_deref(), chunks[3]);
}

fn render_results(f: &mut Frame, app: &App, area: Rect) {
    let results = &app.search.results;
    let block = Block::default()
        .title(format!(" 结果 ({}) ", results.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(block, area);
    let padded = inner.inner(Margin {
        horizontal: 1,
        vertical: 0,
    });

    if results.is_empty() {
        let text = if app.catalog.is_none() {
            "winget 不可用，请在设置中检查 winget 命令"
        } else {
            "无结果"
        };
        f.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray))),
            padded,
        );
        return;
    }

    let visible = padded.height as usize;
    let scroll = layout::follow_selection(app.search.selected, visible);
    let name_width = results
        .iter()
        .map(|r| UnicodeWidthStr::width(r.name.as_str()))
        .max()
        .unwrap_or(0)
        .min(40);

    let lines: Vec<Line> = results
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible)
        .map(|(i, r)| {
            let in_store = app.store.contains(&r.id);
            result_line(r, name_width, i == app.search.selected, in_store)
        })
        .collect();
    f.render_widget(Paragraph::new(lines), padded);

    if results.len() > visible {
        layout::render_scrollbar(f, results.len(), scroll, area);
    }
}

fn result_line(r: &SearchResultRecord, name_width: usize, selected: bool, in_store: bool) -> Line<'static> {
    let pad = name_width.saturating_sub(UnicodeWidthStr::width(r.name.as_str()));
    let name = format!("{}{}  ", r.name, " ".repeat(pad));
    let mark = if in_store { "  [已加入]" } else { "" };
    let base = if selected {
        Style::default().bg(SEL_BG)
    } else {
        Style::default()
    };
    let marker = if selected { "► " } else { "  " };
    Line::from(vec![
        Span::styled(marker, base.fg(BRIGHT_WHITE).add_modifier(Modifier::BOLD)),
        Span::styled(name, base.fg(if selected { BRIGHT_WHITE } else { HIGHLIGHT })),
        Span::styled(r.id.clone(), base.fg(ACCENT).add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {}", r.version), base.fg(if selected { DESC_DIM } else { Color::White })),
        Span::styled(mark, base.fg(DIM)),
    ])
}

fn render_detail_view(f: &mut Frame, app: &App) {
    let chunks = layout::main_layout(f.area());
    let id = app.search.detail_id.as_deref().unwrap_or("未知");
    let title = match app.search.detail.as_ref().and_then(|d| d.get("Publisher")) {
        Some(publisher) => format!("📦 包信息 - {} ({})", id, publisher),
        None => format!("📦 包信息 - {}", id),
    };
    layout::render_header(f, &title, chunks[0]);
    render_detail_content(f, app, chunks[1]);
    layout::render_footer(
        f,
        "↑↓ 滚动 | PgUp/PgDn 翻页 | Tab 加入导入列表 | Esc 返回列表",
        app.status.as_deref(),
        chunks[2],
    );
}

fn render_detail_content(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(block, area);
    let padded = inner.inner(Margin {
        horizontal: 1,
        vertical: 0,
    });

    let mut all_lines: Vec<Line> = Vec::new();
    if let Some(detail) = &app.search.detail {
        let target_width = detail
            .fields
            .iter()
            .map(|(k, _)| UnicodeWidthStr::width(k.as_str()))
            .max()
            .unwrap_or(0)
            .min(24);
        for (key, value) in &detail.fields {
            let pad = target_width.saturating_sub(UnicodeWidthStr::width(key.as_str()));
            all_lines.push(Line::from(vec![
                Span::styled(
                    format!("{}{}  ", key, " ".repeat(pad)),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::styled(value.clone(), Style::default().fg(Color::White)),
            ]));
        }
    }

    if !app.search.versions.is_empty() {
        all_lines.push(Line::from(""));
        all_lines.push(Line::from(Span::styled(
            "──── 可用版本 ────",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        for v in &app.search.versions {
            all_lines.push(Line::from(Span::styled(
                format!("  {}", v),
                Style::default().fg(Color::White),
            )));
        }
    }

    let total_lines = all_lines.len();
    let visible_height = padded.height as usize;
    let actual_scroll = app
        .search
        .detail_scroll
        .min(total_lines.saturating_sub(visible_height));

    let visible: Vec<Line> = all_lines
        .into_iter()
        .skip(actual_scroll)
        .take(visible_height)
        .collect();
    f.render_widget(Paragraph::new(visible).wrap(Wrap { trim: false }), padded);

    if total_lines > visible_height {
        layout::render_scrollbar(f, total_lines, actual_scroll, area);
    }
}
