use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::audio::RenderStats;
use crate::ui::Theme;

/// Figures shown in the levels panel
pub struct LevelsInfo {
    pub music_volume: f32,
    pub sfx_volume: f32,
    pub muted: bool,
    pub live_handles: usize,
    /// None when no device output is running
    pub render: Option<RenderStats>,
}

/// Render volume bars, mute state and render-thread figures
pub fn render_levels(frame: &mut Frame, area: Rect, info: &LevelsInfo, theme: &Theme) {
    let block = Block::default()
        .title(Span::styled(" Levels ", Style::default().fg(theme.channel_label)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.bg));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 {
        return;
    }

    let bar_width = inner.width.saturating_sub(12).max(4) as usize;
    let mut lines = vec![
        level_line("Music", info.music_volume, bar_width, info.muted, theme),
        level_line("SFX", info.sfx_volume, bar_width, info.muted, theme),
        Line::from(""),
        Line::from(vec![
            Span::styled("Live  ", Style::default().fg(theme.channel_label)),
            Span::styled(
                format!("{} voices", info.live_handles),
                Style::default().fg(theme.fg),
            ),
        ]),
    ];

    match info.render {
        Some(stats) => {
            lines.push(Line::from(vec![
                Span::styled("Out   ", Style::default().fg(theme.channel_label)),
                Span::styled(
                    format!("{} voices  peak {:.2}", stats.active_voices, stats.peak),
                    Style::default().fg(theme.fg),
                ),
            ]));
        }
        None => lines.push(Line::from(Span::styled(
            "Out   no audio device",
            Style::default().fg(theme.dimmed),
        ))),
    }

    frame.render_widget(
        Paragraph::new(lines).style(Style::default().bg(theme.bg)),
        inner,
    );
}

fn level_line<'a>(label: &'a str, volume: f32, width: usize, muted: bool, theme: &Theme) -> Line<'a> {
    let filled = (volume.clamp(0.0, 1.0) * width as f32).round() as usize;
    let color = if muted {
        theme.dimmed
    } else if volume > 0.85 {
        theme.frantic
    } else if volume > 0.6 {
        theme.tense
    } else {
        theme.calm
    };

    Line::from(vec![
        Span::styled(format!("{:<6}", label), Style::default().fg(theme.channel_label)),
        Span::styled("\u{2588}".repeat(filled), Style::default().fg(color)),
        Span::styled(
            "\u{2591}".repeat(width - filled.min(width)),
            Style::default().fg(theme.step_off),
        ),
        Span::styled(format!(" {:>3.0}%", volume * 100.0), Style::default().fg(theme.fg)),
    ])
}
