//! Custom TUI widgets

use super::ThemeColors;
use crate::trial::PhaseView;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};

/// Full-area colored signal with centered text
pub struct SignalPanel<'a> {
    view: &'a PhaseView,
    colors: &'a ThemeColors,
}

impl<'a> SignalPanel<'a> {
    pub fn new(view: &'a PhaseView, colors: &'a ThemeColors) -> Self {
        Self { view, colors }
    }
}

impl<'a> Widget for SignalPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let phase = self.view.phase;
        let fill = Style::default().bg(self.colors.phase_bg(phase));
        buf.set_style(area, fill);

        let text_style = fill
            .fg(self.colors.phase_text(phase))
            .add_modifier(Modifier::BOLD);
        let lines = &self.view.lines;
        let top = area.y + (area.height / 2).saturating_sub(lines.len() as u16 / 2);

        for (i, line) in lines.iter().enumerate() {
            let y = top + i as u16;
            if y >= area.y + area.height {
                break;
            }
            let width = (line.chars().count() as u16).min(area.width);
            let x = area.x + (area.width - width) / 2;
            buf.set_stringn(x, y, line, width as usize, text_style);
        }
    }
}

/// Status bar widget
pub struct StatusBar<'a> {
    phase: &'a str,
    trials: &'a str,
    elapsed: &'a str,
    message: Option<&'a str>,
    colors: &'a ThemeColors,
}

impl<'a> StatusBar<'a> {
    pub fn new(phase: &'a str, trials: &'a str, elapsed: &'a str, colors: &'a ThemeColors) -> Self {
        Self {
            phase,
            trials,
            elapsed,
            message: None,
            colors,
        }
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }
}

impl<'a> Widget for StatusBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg_style = Style::default()
            .bg(self.colors.status_bg)
            .fg(self.colors.status_fg);
        buf.set_style(area, bg_style);

        let left = format!(" {} | {} ", self.phase, self.trials);
        buf.set_string(area.x, area.y, &left, bg_style.add_modifier(Modifier::BOLD));

        if let Some(msg) = self.message {
            let msg_style = bg_style.fg(self.colors.status_message);
            let msg_x = area.x + (area.width / 2).saturating_sub(msg.len() as u16 / 2);
            buf.set_string(msg_x, area.y, msg, msg_style);
        }

        let right = format!(" {} | Esc: quit ", self.elapsed);
        let right_x = area.x + area.width.saturating_sub(right.len() as u16);
        buf.set_string(right_x, area.y, &right, bg_style);
    }
}
