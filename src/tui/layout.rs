use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

/// 标准三段式布局：Header(3) + Content(弹性) + Footer(3)
pub fn main_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area)
        .to_vec()
}

/// 渲染通用 header
pub fn render_header(f: &mut Frame, title: &str, area: Rect) {
    let header = Paragraph::new(title)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    f.render_widget(header, area);
}

/// 渲染 footer：快捷键提示，若有状态消息则显示在提示前
pub fn render_footer(f: &mut Frame, hint: &str, status: Option<&str>, area: Rect) {
    let mut spans = Vec::new();
    if let Some(msg) = status {
        let color = if msg.starts_with('✗') {
            Color::Red
        } else if msg.starts_with('✓') {
            Color::Green
        } else {
            Color::Yellow
        };
        spans.push(Span::styled(format!(" {} ", msg), Style::default().fg(color)));
        spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    }
    spans.push(Span::styled(format!(" {}", hint), Style::default().fg(Color::Green)));

    let footer = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);
    f.render_widget(footer, area);
}

/// 根据内容长度绘制右侧滚动条
pub fn render_scrollbar(f: &mut Frame, total: usize, position: usize, area: Rect) {
    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("↑"))
        .end_symbol(Some("↓"));
    let mut state = ScrollbarState::new(total).position(position);
    f.render_stateful_widget(
        scrollbar,
        area.inner(Margin {
            horizontal: 0,
            vertical: 1,
        }),
        &mut state,
    );
}

/// 渲染带滚动条的内容区域
pub fn render_scrollable_content(
    f: &mut Frame,
    title: &str,
    lines: &[String],
    scroll_offset: usize,
    area: Rect,
) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let padded = inner.inner(Margin {
        horizontal: 1,
        vertical: 0,
    });

    let total_lines = lines.len();
    let visible_height = padded.height as usize;
    let actual_scroll = scroll_offset.min(total_lines.saturating_sub(visible_height));

    let visible_content: Vec<Line> = lines
        .iter()
        .skip(actual_scroll)
        .take(visible_height)
        .map(|line| Line::from(line.clone()))
        .collect();

    f.render_widget(
        Paragraph::new(visible_content).wrap(Wrap { trim: false }),
        padded,
    );

    if total_lines > visible_height {
        render_scrollbar(f, total_lines, actual_scroll, area);
    }
}

/// 估算内容区域可见行数（总高度减去 header/footer/borders）
pub fn visible_content_height(term_height: u16) -> usize {
    term_height.saturating_sub(8) as usize
}

/// 让选中项保持在可见窗口内，返回滚动偏移
pub fn follow_selection(selected: usize, visible: usize) -> usize {
    if visible == 0 {
        return selected;
    }
    (selected + 1).saturating_sub(visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_stays_visible() {
        assert_eq!(follow_selection(0, 10), 0);
        assert_eq!(follow_selection(9, 10), 0);
        assert_eq!(follow_selection(10, 10), 1);
        assert_eq!(follow_selection(25, 10), 16);
        assert_eq!(follow_selection(3, 0), 3);
    }
}
