//! 界面配色，所有页面共用

use ratatui::style::Color;

/// 强调色（包 ID、当前字段）
pub const ACCENT: Color = Color::Rgb(91, 206, 250);
/// 次强调色（包名）
pub const HIGHLIGHT: Color = Color::Rgb(245, 169, 184);
/// 选中行背景色
pub const SEL_BG: Color = Color::Rgb(45, 35, 55);
/// 亮白色
pub const BRIGHT_WHITE: Color = Color::Rgb(255, 255, 255);
/// 暗灰色（次要信息）
pub const DIM: Color = Color::Rgb(130, 130, 140);
/// 选中行内的次要文字
pub const DESC_DIM: Color = Color::Rgb(180, 180, 190);
