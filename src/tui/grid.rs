use gridseq::shared::{CellState, DisplayState, TrackRow};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

const NAME_WIDTH: usize = 10;

// one line per track: name, level, then a glyph per column.
// the audible column is lit, the cursor cell is reversed
pub fn draw_grid(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let mut lines = vec![column_ruler(state)];
    for (row_idx, row) in state.tracks.iter().enumerate() {
        lines.push(track_line(row_idx, row, state));
    }
    if state.tracks.is_empty() {
        lines.push(Line::from(Span::styled(
            "no .wav files found in the project directory",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let grid = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" grid "));
    frame.render_widget(grid, area);
}

fn column_ruler(state: &DisplayState) -> Line<'static> {
    let per_beat = (state.subdivision / state.denominator.max(1)).max(1) as usize;
    let mut spans = vec![Span::raw(" ".repeat(NAME_WIDTH + 6))];
    for col in 0..state.columns {
        let mark = if col % per_beat == 0 { "|" } else { "." };
        let style = if state.active_column == Some(col) {
            Style::default().fg(Color::LightMagenta)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("{mark} "), style));
    }
    Line::from(spans)
}

fn track_line(row_idx: usize, row: &TrackRow, state: &DisplayState) -> Line<'static> {
    let name_style = if row.muted {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    };
    let mut name: String = row.id.chars().take(NAME_WIDTH).collect();
    while name.chars().count() < NAME_WIDTH {
        name.push(' ');
    }
    let mut spans = vec![
        Span::styled(name, name_style),
        Span::styled(format!(" {:>3}% ", (row.volume * 100.0).round() as i32), Style::default().fg(Color::Gray)),
    ];

    for (col, cell) in row.cells.iter().enumerate() {
        let glyph = match cell {
            CellState::Empty => "·",
            CellState::Single => "■",
            CellState::Combined => "◆",
        };
        let mut style = match (cell, state.active_column == Some(col)) {
            (CellState::Empty, true) => Style::default().fg(Color::Magenta),
            (CellState::Empty, false) => Style::default().fg(Color::DarkGray),
            (_, true) => Style::default().fg(Color::LightMagenta).add_modifier(Modifier::BOLD),
            (_, false) => Style::default().fg(Color::White),
        };
        if state.cursor == (col, row_idx) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(format!("{glyph} "), style));
    }
    Line::from(spans)
}
