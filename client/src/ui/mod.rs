pub mod preview;

mod utils;

use crate::app::{Display, PreviewView};
use crate::ascii_converter::AsciiConverter;
use common::config::PreviewConfig;
use common::logger::Logger;
use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    style::{Color, Style},
    widgets::{Block, BorderType, Borders},
};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

/// Full-screen terminal preview. Raw mode and the alternate screen are
/// active for as long as this value lives.
pub struct TerminalDisplay {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    converter: AsciiConverter,
    max_pane: (usize, usize),
    logger: Arc<Logger>,
    _cleanup_guard: CleanupGuard,
}

// Restores the terminal even if drawing fails halfway through setup
struct CleanupGuard;

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
        let _ = Terminal::new(CrosstermBackend::new(std::io::stdout()))
            .and_then(|mut term| term.show_cursor());
    }
}

impl TerminalDisplay {
    pub fn new(preview: &PreviewConfig, logger: Arc<Logger>) -> Result<Self, io::Error> {
        enable_raw_mode()?;
        let cleanup_guard = CleanupGuard;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;

        // log lines on the console would tear the preview
        logger.set_console_echo(false);

        Ok(Self {
            terminal,
            converter: AsciiConverter::default(),
            max_pane: (preview.ascii_width, preview.ascii_height),
            logger,
            _cleanup_guard: cleanup_guard,
        })
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        self.logger.set_console_echo(true);
    }
}

impl Display for TerminalDisplay {
    fn show(&mut self, view: &PreviewView<'_>) -> io::Result<()> {
        let converter = &self.converter;
        let max_pane = self.max_pane;

        self.terminal.draw(|f| {
            let size = f.area();

            let background = Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::DarkGray))
                .style(Style::default().bg(Color::Black));

            let inner_area = background.inner(size);
            f.render_widget(background, size);

            preview::render_preview(f, view, converter, max_pane, inner_area);
        })?;
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<KeyEvent>> {
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                // Windows reports releases too
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(key));
                }
            }
        }
        Ok(None)
    }
}
