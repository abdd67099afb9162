use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// 把文本按光标拆成 (光标前, 光标处字符, 光标后)，光标按字符计数
pub fn split_at_cursor(text: &str, cursor: usize) -> (String, String, String) {
    let chars: Vec<char> = text.chars().collect();
    let cursor = cursor.min(chars.len());
    let before: String = chars[..cursor].iter().collect();
    let at = chars
        .get(cursor)
        .map(|c| c.to_string())
        .unwrap_or_else(|| " ".to_string());
    let after: String = chars.iter().skip(cursor + 1).collect();
    (before, at, after)
}

/// 带光标的单行文本 spans
pub fn cursor_spans(text: &str, cursor: usize, focused: bool) -> Vec<Span<'static>> {
    let (before, at, after) = split_at_cursor(text, cursor);
    let cursor_style = if focused {
        Style::default().fg(Color::Black).bg(Color::White)
    } else {
        Style::default().fg(Color::White)
    };
    vec![
        Span::styled(before, Style::default().fg(Color::White)),
        Span::styled(at, cursor_style),
        Span::styled(after, Style::default().fg(Color::White)),
    ]
}

/// 渲染带边框的输入框
pub fn render_input_box(
    f: &mut Frame,
    text: &str,
    cursor: usize,
    label: &str,
    focused: bool,
    area: Rect,
) {
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let mut spans = vec![Span::styled(
        format!("{label} "),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    spans.extend(cursor_spans(text, cursor, focused));

    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

// ===== 共享文本编辑工具函数 =====

/// UTF-8 安全的字符位置转字节位置
pub fn char_to_byte(s: &str, char_pos: usize) -> usize {
    s.char_indices()
        .nth(char_pos)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// 在字符串的指定光标位置插入字符
pub fn str_insert_char(s: &mut String, cursor: &mut usize, c: char) {
    let byte_pos = char_to_byte(s, *cursor);
    s.insert(byte_pos, c);
    *cursor += 1;
}

/// Backspace: 删除光标前的字符
pub fn str_delete_back(s: &mut String, cursor: &mut usize) {
    if *cursor > 0 {
        *cursor -= 1;
        let byte_pos = char_to_byte(s, *cursor);
        let next_byte_pos = char_to_byte(s, *cursor + 1);
        s.drain(byte_pos..next_byte_pos);
    }
}

/// Delete: 删除光标后的字符
pub fn str_delete_forward(s: &mut String, cursor: &mut usize) {
    let char_count = s.chars().count();
    if *cursor < char_count {
        let byte_pos = char_to_byte(s, *cursor);
        let next_byte_pos = char_to_byte(s, *cursor + 1);
        s.drain(byte_pos..next_byte_pos);
    }
}

/// 处理单行编辑按键，返回文本是否发生变化。
/// 带 Ctrl/Alt 的字符不会写入文本。
pub fn handle_edit_key(key: KeyEvent, s: &mut String, cursor: &mut usize) -> bool {
    match key.code {
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL)
                || key.modifiers.contains(KeyModifiers::ALT)
            {
                return false;
            }
            str_insert_char(s, cursor, c);
            true
        }
        KeyCode::Backspace => {
            let before = s.len();
            str_delete_back(s, cursor);
            s.len() != before
        }
        KeyCode::Delete => {
            let before = s.len();
            str_delete_forward(s, cursor);
            s.len() != before
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
            false
        }
        KeyCode::Right => {
            if *cursor < s.chars().count() {
                *cursor += 1;
            }
            false
        }
        KeyCode::Home => {
            *cursor = 0;
            false
        }
        KeyCode::End => {
            *cursor = s.chars().count();
            false
        }
        _ => false,
    }
}
