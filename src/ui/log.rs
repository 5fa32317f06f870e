use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::command::CommandSource;
use crate::event::EventLog;
use crate::ui::Theme;

/// Render the newest logged engine calls, newest at the top
pub fn render_event_log(frame: &mut Frame, area: Rect, log: &EventLog, theme: &Theme) {
    let block = Block::default()
        .title(Span::styled(
            format!(" Events ({}) ", log.latest_id()),
            Style::default().fg(theme.channel_label),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.bg));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = log
        .recent(inner.height as usize)
        .map(|event| {
            let source_color = match event.source {
                CommandSource::Keyboard => theme.highlight,
                CommandSource::Autopilot => theme.dimmed,
            };
            Line::from(vec![
                Span::styled(
                    format!("{:>5} {} ", event.id, clock_time(event.timestamp)),
                    Style::default().fg(theme.dimmed),
                ),
                Span::styled(
                    format!("{:<5}", event.source.name()),
                    Style::default().fg(source_color),
                ),
                Span::styled(event.command.description(), Style::default().fg(theme.fg)),
            ])
        })
        .collect();

    frame.render_widget(
        Paragraph::new(lines).style(Style::default().bg(theme.bg)),
        inner,
    );
}

/// HH:MM:SS (UTC) of a millisecond Unix timestamp
fn clock_time(timestamp_ms: u64) -> String {
    let secs = timestamp_ms / 1000;
    format!("{:02}:{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_time_wraps_at_midnight() {
        assert_eq!(clock_time(0), "00:00:00");
        assert_eq!(clock_time((13 * 3600 + 5 * 60 + 9) * 1000 + 999), "13:05:09");
        assert_eq!(clock_time(86_400_000 + 61_000), "00:01:01");
    }
}
