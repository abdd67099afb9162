use super::layout;
use super::state::{App, AppEvent, AppMode, LaunchPhase};
use crate::launcher::ImportLauncher;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use tokio::sync::mpsc;

/// 导入输出页按键
pub fn handle_launch_key(key: KeyEvent, app: &mut App, term_height: u16) {
    let visible = layout::visible_content_height(term_height);
    match key.code {
        // 导入进行中也允许返回，后台继续运行
        KeyCode::Esc => app.mode = AppMode::ImportList,
        KeyCode::Up => app.launch.scroll_up(),
        KeyCode::Down => app.launch.scroll_down(visible),
        KeyCode::PageUp => app.launch.scroll = app.launch.scroll.saturating_sub(10),
        KeyCode::PageDown => {
            app.launch.scroll += 10;
            app.launch.clamp_scroll(visible);
        }
        KeyCode::Home => app.launch.scroll = 0,
        KeyCode::End => {
            app.launch.scroll = app.launch.lines.len();
            app.launch.clamp_scroll(visible);
        }
        _ => {}
    }
}

/// 启动导入任务。外部进程在独立线程中运行，日志逐行转发给主循环。
pub fn spawn_launch_task(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    if app.is_launching() {
        app.status = Some("已有导入在进行中".to_string());
        return;
    }
    if app.store.is_empty() {
        app.status = Some("✗ 导入列表为空".to_string());
        return;
    }

    let launcher = ImportLauncher::from_config(&app.config);
    let tenant = app.config.tenant.clone();
    // 校验失败直接在列表页提示，不切换页面
    if let Err(e) = launcher.preflight(&tenant) {
        app.status = Some(format!("✗ {}", e));
        return;
    }

    let snapshot = app.store.clone();
    app.mode = AppMode::Launch;
    app.launch.phase = LaunchPhase::Running;
    app.launch.lines.clear();
    app.launch.report = None;
    app.launch.scroll = 0;
    app.launch.add_line(format!("正在导入 {} 个软件包...", snapshot.len()));
    app.error_message = None;

    let tx_clone = tx.clone();
    std::thread::spawn(move || {
        let (output_tx, mut output_rx) = mpsc::unbounded_channel();

        let tx_for_lines = tx_clone.clone();
        let forwarder = std::thread::spawn(move || {
            while let Some(line) = output_rx.blocking_recv() {
                let _ = tx_for_lines.blocking_send(AppEvent::LaunchLine(line));
            }
        });

        let result = launcher.launch(&snapshot, &tenant, &output_tx);
        drop(output_tx);
        // 等日志行全部转发后再报告结束
        let _ = forwarder.join();

        let outcome = result.map_err(|e| {
            log::error!("导入失败: {}", e);
            e.to_string()
        });
        let _ = tx_clone.blocking_send(AppEvent::LaunchComplete(outcome));
    });
}

pub fn render_launch(f: &mut Frame, app: &App) {
    let chunks = layout::main_layout(f.area());
    let title = match app.launch.phase {
        LaunchPhase::Running => "🚀 导入中...",
        LaunchPhase::Done => "✅ 导入完成",
        LaunchPhase::Error => "❌ 导入失败",
        LaunchPhase::Idle => "🚀 导入",
    };
    layout::render_header(f, title, chunks[0]);

    let log_title = match app.launch.report.as_ref().and_then(|r| r.log_file.as_ref()) {
        Some(path) => format!("日志 {}", path.display()),
        None => "输出".to_string(),
    };
    layout::render_scrollable_content(f, &log_title, &app.launch.lines, app.launch.scroll, chunks[1]);

    let hint = if app.is_launching() {
        "↑↓ 滚动 | Esc 返回列表（导入在后台继续）"
    } else {
        "↑↓ 滚动 | PgUp/PgDn 翻页 | Home/End | Esc 返回列表"
    };
    layout::render_footer(f, hint, app.error_message.as_deref(), chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::ImportRecord;

    #[test]
    fn empty_list_is_refused() {
        let mut app = App::new(Config::default());
        let (tx, _rx) = mpsc::channel(4);
        spawn_launch_task(&mut app, &tx);
        assert_eq!(app.launch.phase, LaunchPhase::Idle);
        assert!(app.status.as_deref().unwrap().contains("为空"));
    }

    #[test]
    fn invalid_tenant_stays_on_list() {
        let mut app = App::new(Config::default());
        app.mode = AppMode::ImportList;
        app.store.add(ImportRecord::new("VideoLAN.VLC").unwrap()).unwrap();
        app.config.tenant.tenant_id = "contoso".to_string();
        let (tx, _rx) = mpsc::channel(4);

        spawn_launch_task(&mut app, &tx);
        assert_eq!(app.mode, AppMode::ImportList);
        assert_eq!(app.launch.phase, LaunchPhase::Idle);
        assert!(app.status.as_deref().unwrap().starts_with('✗'));
    }

    #[test]
    fn second_launch_is_refused_while_running() {
        let mut app = App::new(Config::default());
        app.launch.phase = LaunchPhase::Running;
        let (tx, _rx) = mpsc::channel(4);
        spawn_launch_task(&mut app, &tx);
        assert!(app.status.as_deref().unwrap().contains("进行中"));
    }
}
