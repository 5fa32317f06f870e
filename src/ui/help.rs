use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::ui::Theme;

const RULE: &str = "  ──────────────────────────────────────";

pub struct HelpState {
    pub scroll: usize,
}

impl HelpState {
    pub fn new() -> Self {
        Self { scroll: 0 }
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self, max_lines: usize, visible: usize) {
        if max_lines > visible && self.scroll < max_lines - visible {
            self.scroll += 1;
        }
    }
}

impl Default for HelpState {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the keybinding overlay on top of whatever is in `area`
pub fn render_help(frame: &mut Frame, area: Rect, help_state: &HelpState, theme: &Theme) {
    let block = Block::default()
        .title(Span::styled(" Help ", Style::default().fg(theme.channel_label)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.bg));

    frame.render_widget(Clear, area);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = build_help_lines(theme);
    let total_lines = lines.len();
    let visible = inner.height as usize;

    let visible_lines: Vec<Line> = lines
        .into_iter()
        .skip(help_state.scroll)
        .take(visible)
        .collect();

    frame.render_widget(
        Paragraph::new(visible_lines).style(Style::default().bg(theme.bg)),
        inner,
    );

    // Scroll indicator
    if total_lines > visible {
        let pct = (help_state.scroll * 100) / (total_lines - visible);
        let indicator_area = Rect::new(
            inner.x + inner.width.saturating_sub(6),
            inner.y + inner.height.saturating_sub(1),
            6.min(inner.width),
            1,
        );
        frame.render_widget(
            Paragraph::new(format!(" {}% ", pct)).style(Style::default().fg(theme.dimmed)),
            indicator_area,
        );
    }
}

/// Total number of help lines (for scroll bounds)
pub fn help_line_count(theme: &Theme) -> usize {
    build_help_lines(theme).len()
}

fn build_help_lines(theme: &Theme) -> Vec<Line<'static>> {
    let header_style = Style::default().fg(theme.highlight).bold();
    let key_style = Style::default().fg(theme.step_on);
    let desc_style = Style::default().fg(theme.fg);
    let dim_style = Style::default().fg(theme.dimmed);

    let sections: [(&str, &[(&str, &str)]); 4] = [
        (
            "  MUSIC",
            &[
                ("  Space / P ", "Start / stop gameplay music"),
                ("  N         ", "Start menu music"),
                ("  Up/Down   ", "Difficulty up / down by 0.1"),
                ("  [ / ]     ", "Score down / up by 250"),
                ("  A         ", "Toggle autopilot"),
            ],
        ),
        (
            "  GAME EVENTS",
            &[
                ("  K         ", "Kill"),
                ("  S         ", "Killstreak (streak grows while held)"),
                ("  F         ", "Frenzy start"),
                ("  X         ", "Frenzy extend"),
                ("  E         ", "Frenzy end"),
                ("  L         ", "Level up fanfare"),
            ],
        ),
        (
            "  SOUNDS",
            &[
                ("  1-9, 0    ", "Play a sound effect"),
                ("  M         ", "Toggle mute"),
                ("  - / =     ", "Music volume down / up"),
                ("  , / .     ", "Effects volume down / up"),
            ],
        ),
        (
            "  GLOBAL",
            &[
                ("  ? / G     ", "Toggle this help"),
                ("  Q / Esc   ", "Quit"),
            ],
        ),
    ];

    let mut lines = vec![
        Line::from(Span::styled("  FRENZYTONE KEYBINDINGS", header_style)),
        Line::from(""),
    ];
    for (title, keys) in sections {
        lines.push(Line::from(Span::styled(title, header_style)));
        lines.push(Line::from(Span::styled(RULE, dim_style)));
        for (key, desc) in keys {
            add_key(&mut lines, key, desc, key_style, desc_style);
        }
        lines.push(Line::from(""));
    }
    lines
}

fn add_key(lines: &mut Vec<Line<'static>>, key: &str, desc: &str, key_style: Style, desc_style: Style) {
    lines.push(Line::from(vec![
        Span::styled(key.to_string(), key_style),
        Span::styled(format!("  {}", desc), desc_style),
    ]));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_stays_within_bounds() {
        let mut state = HelpState::new();
        state.scroll_up();
        assert_eq!(state.scroll, 0);

        let total = help_line_count(&Theme::default());
        for _ in 0..total * 2 {
            state.scroll_down(total, 10);
        }
        assert_eq!(state.scroll, total - 10);
    }
}
