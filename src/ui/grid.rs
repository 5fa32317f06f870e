use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::engine::Track;
use crate::sequencer::{Channel, Pattern, STEPS};
use crate::synth::{freq_to_midi, note_name, DrumKind};
use crate::ui::Theme;

/// Everything the transport bar shows
pub struct TransportInfo<'a> {
    pub playing: bool,
    pub pending: bool,
    pub muted: bool,
    pub track: Track,
    pub tempo: f32,
    pub pattern_name: &'a str,
    pub pattern_index: usize,
    pub step_index: u64,
    pub difficulty: f32,
    pub score: u64,
    pub autopilot: bool,
}

/// Render the active pattern's five channels with the playhead
pub fn render_grid(
    frame: &mut Frame,
    area: Rect,
    pattern: &Pattern,
    playhead: Option<usize>,
    theme: &Theme,
) {
    let block = Block::default()
        .title(Span::styled(
            format!(
                " Pattern: {}  register {}  density {} ",
                pattern.name,
                register_label(pattern),
                pattern.density()
            ),
            Style::default().fg(theme.channel_label),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.bg));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let label_width = 8u16;
    let available_width = inner.width.saturating_sub(label_width);
    let cell_width = (available_width / STEPS as u16).max(2);

    for (row, channel) in Channel::ALL.iter().enumerate() {
        let y = inner.y + row as u16;
        if y >= inner.y + inner.height {
            break;
        }

        frame.render_widget(
            Paragraph::new(format!("{:>7} ", channel.name()))
                .style(Style::default().fg(theme.channel_label)),
            Rect::new(inner.x, y, label_width.min(inner.width), 1),
        );

        for step in 0..STEPS {
            let x = inner.x + label_width + step as u16 * cell_width;
            if x + 2 > inner.x + inner.width {
                break;
            }

            let symbol = cell_symbol(pattern, *channel, step);
            let active = symbol.is_some();
            let at_playhead = playhead == Some(step);

            let (text, style) = match (active, at_playhead) {
                (true, true) => (
                    symbol.unwrap_or("##"),
                    Style::default().fg(theme.bg).bg(theme.playhead).bold(),
                ),
                (false, true) => ("::", Style::default().fg(theme.playhead).bg(theme.bg)),
                (true, false) => (
                    symbol.unwrap_or("##"),
                    Style::default().fg(theme.step_on).bg(theme.bg),
                ),
                // Beat markers (every 4 steps)
                (false, false) if step % 4 == 0 => {
                    (". ", Style::default().fg(theme.dimmed).bg(theme.bg))
                }
                (false, false) => ("- ", Style::default().fg(theme.step_off).bg(theme.bg)),
            };

            frame.render_widget(Paragraph::new(text).style(style), Rect::new(x, y, 2, 1));
        }
    }
}

/// Cell text for an event starting on `step`, or None for an empty cell
fn cell_symbol(pattern: &Pattern, channel: Channel, step: usize) -> Option<&'static str> {
    if channel == Channel::Drums {
        return pattern.drum_at(step).map(|kind| match kind {
            DrumKind::Kick => "K ",
            DrumKind::Snare => "S ",
            DrumKind::HiHat => "h ",
        });
    }
    pattern.has_event(channel, step).then_some("##")
}

/// Note name of the pattern's mean lead pitch
fn register_label(pattern: &Pattern) -> String {
    match pattern.register() {
        freq if freq > 0.0 => note_name(freq_to_midi(freq)),
        _ => "-".to_string(),
    }
}

/// Render transport status bar
pub fn render_transport(frame: &mut Frame, area: Rect, info: &TransportInfo, theme: &Theme) {
    let (status, status_style) = if info.muted {
        ("MUTE", Style::default().fg(theme.frantic).bold())
    } else if info.playing {
        ("PLAY", Style::default().fg(theme.step_on).bold())
    } else if info.pending {
        ("WAIT", Style::default().fg(theme.tense))
    } else {
        ("STOP", Style::default().fg(theme.dimmed))
    };
    let sep = || Span::styled(" | ", Style::default().fg(theme.border));

    let mut spans = vec![
        Span::styled(format!(" {} ", status), status_style),
        sep(),
        Span::styled(info.track.name(), Style::default().fg(theme.fg)),
        sep(),
        Span::styled(
            format!("{:.0} BPM", info.tempo),
            Style::default().fg(theme.tempo_color(info.tempo)).bold(),
        ),
        sep(),
        Span::styled(
            format!("Pattern {} ({})", info.pattern_index, info.pattern_name),
            Style::default().fg(theme.fg),
        ),
        sep(),
        Span::styled(
            format!(
                "Step {:2}/{} #{}",
                info.step_index % STEPS as u64 + 1,
                STEPS,
                info.step_index
            ),
            Style::default().fg(theme.fg),
        ),
        sep(),
        Span::styled(
            format!("Diff {:.1}  Score {}", info.difficulty, info.score),
            Style::default().fg(theme.fg),
        ),
    ];
    if info.autopilot {
        spans.push(sep());
        spans.push(Span::styled("AUTO", Style::default().fg(theme.highlight).bold()));
    }

    let transport = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .style(Style::default().bg(theme.bg)),
        );

    frame.render_widget(transport, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::PatternLibrary;

    #[test]
    fn cells_mark_events_and_drum_kinds() {
        let library = PatternLibrary::builtin();
        let drift = library.get(0);
        assert_eq!(cell_symbol(drift, Channel::Drums, 0), Some("K "));
        assert_eq!(cell_symbol(drift, Channel::Drums, 4), Some("h "));
        assert_eq!(cell_symbol(drift, Channel::Lead, 0), Some("##"));
        assert_eq!(cell_symbol(drift, Channel::Lead, 1), None);
        assert_eq!(cell_symbol(drift, Channel::Arp, 0), None);
    }

    #[test]
    fn register_label_names_the_mean_lead_pitch() {
        let mut pattern = Pattern::new("probe");
        assert_eq!(register_label(&pattern), "-");
        pattern.lead.push(crate::sequencer::NoteEvent {
            freq: 440.0,
            start: 0,
            duration: 1.0,
        });
        assert_eq!(register_label(&pattern), "A4");
    }
}
