use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};

use crate::shared::{DisplayState, MIN_METER_DB};

use super::mode::TuiState;

pub fn render(frame: &mut Frame, area: Rect, ds: &DisplayState, ts: &TuiState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // song + device header
            Constraint::Length(4), // progress + loop/marker rail
            Constraint::Min(6),    // track meters
            Constraint::Length(6), // library
            Constraint::Length(1), // advisory footer
        ])
        .split(area);

    draw_header(frame, sections[0], ds);
    draw_progress(frame, sections[1], ds);
    draw_tracks(frame, sections[2], ds, ts);
    draw_library(frame, sections[3], ds, ts);
    draw_advisory(frame, sections[4], ds);
}

fn draw_header(frame: &mut Frame, area: Rect, ds: &DisplayState) {
    let state = match (ds.playing, ds.looping) {
        (true, true) => "PLAY+LOOP",
        (true, false) => "PLAY",
        (false, true) => "STOP (loop armed)",
        (false, false) => "STOP",
    };
    let song = if ds.song_name.is_empty() { "(no song)" } else { &ds.song_name };
    let line = Line::from(vec![
        Span::styled(format!(" {song} "), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("{} Hz  |  ", ds.song_rate)),
        Span::raw(format!("{}  {}ch @ {} Hz  |  ", ds.device_name, ds.device_channels, ds.device_rate)),
        Span::styled(state, Style::default().fg(Color::Cyan)),
    ]);
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("stemcast"));
    frame.render_widget(p, area);
}

fn draw_progress(frame: &mut Frame, area: Rect, ds: &DisplayState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1)])
        .split(area);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("position"))
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(ds.progress.clamp(0.0, 1.0))
        .label(format!("{:5.1}%", ds.progress * 100.0));
    frame.render_widget(gauge, rows[0]);

    // loop bounds and markers on a one-line rail under the gauge
    let width = rows[1].width.max(1) as usize;
    let mut rail: Vec<char> = vec!['-'; width];
    let at = |p: f64| ((p.clamp(0.0, 1.0) * (width - 1) as f64).round() as usize).min(width - 1);
    rail[at(ds.loop_start)] = '[';
    rail[at(ds.loop_end)] = ']';
    for (i, marker) in ds.markers.iter().enumerate() {
        if let Some(p) = marker {
            rail[at(*p)] = char::from(b'1' + i as u8);
        }
    }
    let rail: String = rail.into_iter().collect();
    frame.render_widget(Paragraph::new(rail).style(Style::default().fg(Color::DarkGray)), rows[1]);
}

fn draw_tracks(frame: &mut Frame, area: Rect, ds: &DisplayState, ts: &TuiState) {
    let items: Vec<ListItem> = ds
        .tracks
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let selected = i == ts.selected_track;
            let cursor = if selected { ">" } else { " " };
            let line = Line::from(vec![
                Span::raw(format!("{cursor}{i:2}  ")),
                Span::styled(format!("{:<20.20}", t.name), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(" vol {:4.2}  ", t.volume)),
                Span::styled(meter_bar(t.meter_db, 24), Style::default().fg(Color::Green)),
                Span::raw(format!(" {:6.1} dB", t.meter_db)),
            ]);
            let style = if selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            ListItem::new(line).style(style)
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("stems"));
    frame.render_widget(list, area);
}

fn draw_library(frame: &mut Frame, area: Rect, ds: &DisplayState, ts: &TuiState) {
    let items: Vec<ListItem> = ds
        .songs
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let cursor = if i == ts.selected_song { ">" } else { " " };
            let style = if i == ts.selected_song {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            ListItem::new(format!("{cursor} {name}")).style(style)
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("library (n/p, Enter)"));
    frame.render_widget(list, area);
}

fn draw_advisory(frame: &mut Frame, area: Rect, ds: &DisplayState) {
    let (text, style) = match &ds.advisory {
        Some(msg) => (msg.as_str(), Style::default().fg(Color::Black).bg(Color::Yellow)),
        None => ("", Style::default()),
    };
    frame.render_widget(Paragraph::new(text).style(style), area);
}

/// Fixed-width bar from the display floor up to 0 dB.
fn meter_bar(db: f32, width: usize) -> String {
    let t = ((db - MIN_METER_DB) / -MIN_METER_DB).clamp(0.0, 1.0);
    let lit = (t * width as f32).round() as usize;
    let mut bar = String::with_capacity(width);
    for i in 0..width {
        bar.push(if i < lit { '|' } else { ' ' });
    }
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_bar_spans_the_display_range() {
        assert_eq!(meter_bar(0.0, 8), "||||||||");
        assert_eq!(meter_bar(MIN_METER_DB, 8), "        ");
        assert_eq!(meter_bar(MIN_METER_DB / 2.0, 8), "||||    ");
    }
}
