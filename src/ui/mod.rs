//! Terminal User Interface components

mod app;
pub mod theme;
mod widgets;

pub use app::{App, AppState};
pub use theme::ThemeColors;
pub use widgets::*;

use crate::clock::Clock;
use rand::Rng;
use ratatui::layout::{Constraint, Layout};
use ratatui::Frame;

/// Draw the signal panel and the status bar. Records the signal area as the
/// mouse hit-test region.
pub fn draw<C: Clock, R: Rng>(frame: &mut Frame, app: &mut App<C, R>) {
    let [signal_area, status_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());
    app.set_signal_area(signal_area);

    let view = app.view();
    frame.render_widget(SignalPanel::new(&view, &app.colors), signal_area);

    let trials = app.trial_summary();
    let elapsed = app.elapsed_formatted();
    let status = StatusBar::new(view.phase.name(), &trials, &elapsed, &app.colors)
        .message(app.get_status());
    frame.render_widget(status, status_area);
}
