//! Signal colors resolved from the configuration

use crate::config::{ColorConfig, Rgb};
use crate::trial::TrialPhase;
use ratatui::style::Color;

/// Complete color palette for the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColors {
    /// Signal while waiting (also the start screen)
    pub ready: Color,
    /// Signal once the cue is shown
    pub react: Color,
    /// Signal after an early response
    pub early: Color,
    /// Signal while showing the result
    pub result: Color,
    pub early_text: Color,
    pub result_text: Color,
    /// Text on the start screen
    pub text: Color,
    pub status_bg: Color,
    pub status_fg: Color,
    /// Transient status messages
    pub status_message: Color,
}

fn rgb([r, g, b]: Rgb) -> Color {
    Color::Rgb(r, g, b)
}

impl ThemeColors {
    pub fn from_config(colors: &ColorConfig) -> Self {
        Self {
            ready: rgb(colors.ready),
            react: rgb(colors.react),
            early: rgb(colors.early),
            result: rgb(colors.result),
            early_text: rgb(colors.early_text),
            result_text: rgb(colors.result_text),
            text: Color::White,
            status_bg: Color::DarkGray,
            status_fg: Color::White,
            status_message: Color::Yellow,
        }
    }

    /// Fill color of the signal panel
    pub fn phase_bg(&self, phase: TrialPhase) -> Color {
        match phase {
            TrialPhase::Initial | TrialPhase::Ready => self.ready,
            TrialPhase::React => self.react,
            TrialPhase::Early => self.early,
            TrialPhase::Result => self.result,
        }
    }

    /// Text color on the signal panel
    pub fn phase_text(&self, phase: TrialPhase) -> Color {
        match phase {
            TrialPhase::Early => self.early_text,
            TrialPhase::Result => self.result_text,
            _ => self.text,
        }
    }
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self::from_config(&ColorConfig::default())
    }
}
