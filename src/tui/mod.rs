mod dashboard;
mod import_list;
mod input;
mod launch;
mod layout;
mod search;
mod settings;
pub mod state;
mod theme;

use crate::catalog::Catalog;
use crate::config::Config;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use state::{App, AppEvent, AppMode, SearchView};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

/// 搜索防抖间隔
const DEBOUNCE_MS: u128 = 250;

pub async fn run(config: Config) -> Result<()> {
    // 终端初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config);
    let (tx, mut rx) = mpsc::channel(32);

    spawn_detect(app.config.winget_command.clone(), &tx);

    loop {
        let term_size = terminal.size()?;
        let visible = layout::visible_content_height(term_size.height);

        if app.mode == AppMode::Launch {
            app.launch.clamp_scroll(visible);
        }
        if app.mode == AppMode::Search && app.search.view == SearchView::Detail {
            let max_scroll = search::detail_total_lines(&app).saturating_sub(visible);
            app.search.detail_scroll = app.search.detail_scroll.min(max_scroll);
        }

        // 防抖: 最后一次按键后停顿才真正搜索
        if let Some(scheduled) = app.search.search_scheduled {
            if scheduled.elapsed().as_millis() >= DEBOUNCE_MS {
                app.search.search_scheduled = None;
                search::execute_pending_search(&mut app, &tx);
            }
        }

        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                // Windows 终端会同时上报按下和松开
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        app.should_quit = true;
                    }
                    KeyCode::Char('q') if app.mode == AppMode::Dashboard => {
                        app.should_quit = true;
                    }
                    // 模式切换快捷键 (Shift + 字母)，输入状态下作为普通字符
                    KeyCode::Char('S') if !app.is_typing() => {
                        if app.mode != AppMode::Search {
                            app.mode = AppMode::Search;
                            app.reset_search_state();
                        }
                    }
                    KeyCode::Char('L') if !app.is_typing() => {
                        app.mode = AppMode::ImportList;
                    }
                    KeyCode::Char('C') if !app.is_typing() => {
                        app.mode = AppMode::Settings;
                        app.build_settings_items();
                    }
                    // 委托给当前模式处理
                    _ => match app.mode {
                        AppMode::Dashboard => {}
                        AppMode::Search => {
                            search::handle_search_key(key, &mut app, &tx, term_size.height)
                        }
                        AppMode::ImportList => import_list::handle_list_key(key, &mut app, &tx),
                        AppMode::Launch => launch::handle_launch_key(key, &mut app, term_size.height),
                        AppMode::Settings => settings::handle_settings_key(key, &mut app, &tx),
                    },
                }
            }
        }

        // 处理异步事件
        while let Ok(event) = rx.try_recv() {
            handle_event(&mut app, event);
        }

        if app.should_quit {
            break;
        }
    }

    // 恢复终端
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

/// 后台检测 winget 是否可用
pub(crate) fn spawn_detect(command: String, tx: &mpsc::Sender<AppEvent>) {
    let tx = tx.clone();
    tokio::spawn(async move {
        let detected = tokio::task::spawn_blocking(move || Catalog::detect(&command)).await;
        let event = match detected {
            Ok(Ok(catalog)) => AppEvent::CatalogDetected(catalog),
            Ok(Err(e)) => AppEvent::CatalogMissing(e.to_string()),
            Err(e) => AppEvent::CatalogMissing(format!("任务执行失败: {}", e)),
        };
        let _ = tx.send(event).await;
    });
}

fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::CatalogDetected(catalog) => {
            log::info!("检测到 winget: {}", catalog.name());
            app.catalog = Some(catalog);
            app.catalog_error = None;
        }
        AppEvent::CatalogMissing(e) => {
            log::warn!("winget 不可用: {}", e);
            app.catalog = None;
            app.catalog_error = Some(e);
        }
        AppEvent::Error(msg) => {
            log::error!("{}", msg);
            app.status = Some(format!("✗ {}", msg));
        }
        AppEvent::SearchResults { results, seq } => {
            // 只接受最新一次搜索的结果
            if seq == app.search.search_seq {
                app.search.results = results;
                app.search.selected = 0;
                if app.search.search_scheduled.is_none() {
                    app.search.searching = false;
                }
            }
        }
        AppEvent::SearchFailed { message, seq } => {
            if seq == app.search.search_seq {
                app.search.results.clear();
                app.search.selected = 0;
                app.search.searching = false;
                app.status = Some(format!("✗ 搜索失败: {}", message));
            }
        }
        AppEvent::DetailLoaded {
            id,
            detail,
            versions,
        } => {
            app.search.detail_id = Some(id);
            app.search.detail = Some(detail);
            app.search.versions = versions;
            app.search.detail_scroll = 0;
            app.search.view = SearchView::Detail;
            app.status = None;
        }
        AppEvent::FieldHelp { field, text } => {
            // 用户已经移到别的字段就丢弃
            if app.list.current_field() == field {
                app.list.help = Some(format!("{}: {}", field.header(), text));
            }
        }
        AppEvent::LaunchLine(line) => app.launch.add_line(line),
        AppEvent::LaunchComplete(result) => app.finish_launch(result),
    }
}

fn ui(f: &mut Frame, app: &App) {
    match app.mode {
        AppMode::Dashboard => dashboard::render_dashboard(f, app),
        AppMode::Search => search::render_search(f, app),
        AppMode::ImportList => import_list::render_import_list(f, app),
        AppMode::Launch => launch::render_launch(f, app),
        AppMode::Settings => settings::render_settings(f, app),
    }
}
