use gridseq::shared::{DisplayState, TransportStatus};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::grid::draw_grid;
use super::mode::{TuiState, VolumeTarget};

const HELP: [&str; 6] = [
    "arrows move   enter toggle cell   c toggle accented cell",
    "space play/stop   p pause/resume   l loop",
    "b/B bpm   [ ] beats per measure   s subdivision",
    "m mute   v switch track/master   - = volume",
    "? help   esc quit",
    "(tempo, meter and grid edits only while stopped)",
];

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let help_height = if ts.show_help { HELP.len() as u16 + 2 } else { 0 };
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                         // transport line
            Constraint::Min(state.tracks.len() as u16 + 3), // grid
            Constraint::Length(help_height),
            Constraint::Length(1), // message line
        ])
        .split(area);

    draw_status(frame, sections[0], state, ts);
    draw_grid(frame, sections[1], state);
    if ts.show_help {
        draw_help(frame, sections[2]);
    }
    draw_message(frame, sections[3], state);
}

fn draw_status(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let status_color = match state.status {
        TransportStatus::Playing => Color::LightGreen,
        TransportStatus::Paused => Color::Yellow,
        TransportStatus::Stopped => Color::Gray,
    };
    let target = match ts.volume_target {
        VolumeTarget::Track => "track",
        VolumeTarget::Master => "master",
    };
    let line = Line::from(vec![
        Span::styled(format!(" {:<5}", state.status.label()), Style::default().fg(status_color)),
        Span::raw(format!(
            "  {:.0} bpm  {}/{}  1/{}  {}  master {:>3}%  [vol: {target}]",
            state.bpm,
            state.numerator,
            state.denominator,
            state.subdivision,
            if state.looping { "loop" } else { "once" },
            (state.master_volume * 100.0).round() as i32,
        )),
    ]);
    let block = Block::default().borders(Borders::ALL).title(" gridseq ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = HELP.iter().map(|l| Line::from(*l)).collect();
    let block = Block::default().borders(Borders::ALL).title(" keys ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_message(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let text = Span::styled(format!(" {}", state.display_text), Style::default().fg(Color::LightRed));
    frame.render_widget(Paragraph::new(Line::from(text)), area);
}
