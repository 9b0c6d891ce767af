use super::utils::{key_hint, pane_size, titled_block};
use crate::app::PreviewView;
use crate::ascii_converter::AsciiConverter;
use common::image_frame::ImageFrame;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Paragraph},
};

pub fn render_preview(
    f: &mut Frame,
    view: &PreviewView<'_>,
    converter: &AsciiConverter,
    max_pane: (usize, usize),
    area: Rect,
) {
    // Split into status + panes + key help
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status bar
            Constraint::Min(5),    // Raw and adjusted frames
            Constraint::Length(3), // Key help
        ])
        .split(area);

    let status = Paragraph::new(Line::from(vec![
        Span::styled(" Brightness: ", Style::default().fg(Color::White)),
        Span::styled(
            format!("{:.0}", view.settings.brightness()),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled("Contrast: ", Style::default().fg(Color::White)),
        Span::styled(
            format!("{:.1}", view.settings.contrast()),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled("Saved: ", Style::default().fg(Color::White)),
        Span::styled(
            view.saved.to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(view.message, Style::default().fg(Color::Gray)),
    ]))
    .alignment(Alignment::Left)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(status, chunks[0]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    render_pane(f, " Raw ", Color::Blue, view.raw, converter, max_pane, panes[0]);
    render_pane(
        f,
        " Adjusted ",
        Color::Magenta,
        view.adjusted,
        converter,
        max_pane,
        panes[1],
    );

    let help = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        key_hint("+/-"),
        Span::raw(" brightness | "),
        key_hint("[/]"),
        Span::raw(" contrast | "),
        key_hint("Space"),
        Span::raw(" save | "),
        key_hint("q"),
        Span::raw(" quit"),
    ]))
    .alignment(Alignment::Left)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(help, chunks[2]);
}

fn render_pane(
    f: &mut Frame,
    title: &str,
    border: Color,
    frame: Option<&ImageFrame>,
    converter: &AsciiConverter,
    max_pane: (usize, usize),
    area: Rect,
) {
    let block = titled_block(title, border);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let body = match frame {
        Some(frame) => {
            let (w, h) = pane_size(inner, max_pane);
            Text::from(
                converter
                    .convert(frame, w, h)
                    .into_iter()
                    .map(Line::from)
                    .collect::<Vec<_>>(),
            )
        }
        None => Text::from(Line::from(Span::styled(
            "waiting for camera...",
            Style::default().fg(Color::DarkGray),
        ))),
    };

    f.render_widget(Paragraph::new(body).alignment(Alignment::Center), inner);
}
