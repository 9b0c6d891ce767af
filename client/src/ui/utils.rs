use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders},
};

// Helper: Rounded panel with a bold title
pub fn titled_block(title: &str, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .title(Span::styled(
            title,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ))
}

// Helper: Key hint in the status bar
pub fn key_hint(key: &str) -> Span<'_> {
    Span::styled(key, Style::default().fg(Color::Yellow))
}

// Helper: Character grid that fits inside `area`, capped at `max`
pub fn pane_size(area: Rect, max: (usize, usize)) -> (usize, usize) {
    (
        (area.width as usize).min(max.0),
        (area.height as usize).min(max.1),
    )
}
