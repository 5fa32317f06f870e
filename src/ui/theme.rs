use ratatui::style::Color;

/// Theme configuration for the playground
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub bg: Color,
    pub fg: Color,
    pub step_on: Color,
    pub step_off: Color,
    pub playhead: Color,
    pub channel_label: Color,
    /// Tempo readout below 160 BPM
    pub calm: Color,
    /// Tempo readout below 240 BPM
    pub tense: Color,
    /// Tempo readout at 240 BPM and above
    pub frantic: Color,
    pub border: Color,
    pub highlight: Color,
    pub dimmed: Color,
}

impl Theme {
    /// Default theme - uses terminal's ANSI colors
    pub fn default_theme() -> Self {
        Self {
            name: "default",
            bg: Color::Reset,
            fg: Color::Reset,
            step_on: Color::Green,
            step_off: Color::DarkGray,
            playhead: Color::Yellow,
            channel_label: Color::Cyan,
            calm: Color::Green,
            tense: Color::Yellow,
            frantic: Color::Red,
            border: Color::White,
            highlight: Color::Magenta,
            dimmed: Color::DarkGray,
        }
    }

    /// Arcade cabinet neon
    pub fn neon() -> Self {
        Self {
            name: "neon",
            bg: Color::Black,
            fg: Color::Rgb(230, 230, 255),
            step_on: Color::Rgb(0, 255, 200),
            step_off: Color::Rgb(40, 40, 70),
            playhead: Color::Rgb(255, 60, 200),
            channel_label: Color::Rgb(120, 160, 255),
            calm: Color::Rgb(0, 200, 255),
            tense: Color::Rgb(255, 200, 0),
            frantic: Color::Rgb(255, 40, 80),
            border: Color::Rgb(90, 60, 200),
            highlight: Color::Rgb(255, 60, 200),
            dimmed: Color::Rgb(60, 60, 90),
        }
    }

    /// Warm amber monochrome CRT
    pub fn amber_crt() -> Self {
        Self {
            name: "amber-crt",
            bg: Color::Black,
            fg: Color::Rgb(255, 176, 0),
            step_on: Color::Rgb(255, 176, 0),
            step_off: Color::Rgb(80, 55, 0),
            playhead: Color::Rgb(255, 220, 150),
            channel_label: Color::Rgb(200, 140, 0),
            calm: Color::Rgb(150, 100, 0),
            tense: Color::Rgb(200, 140, 0),
            frantic: Color::Rgb(255, 176, 0),
            border: Color::Rgb(180, 125, 0),
            highlight: Color::Rgb(255, 220, 150),
            dimmed: Color::Rgb(60, 40, 0),
        }
    }

    /// Get theme by name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default_theme()),
            "neon" => Some(Self::neon()),
            "amber-crt" => Some(Self::amber_crt()),
            _ => None,
        }
    }

    /// List all available theme names
    pub fn available_themes() -> &'static [&'static str] {
        &["default", "neon", "amber-crt"]
    }

    /// Color for a tempo readout
    pub fn tempo_color(&self, tempo: f32) -> Color {
        if tempo < 160.0 {
            self.calm
        } else if tempo < 240.0 {
            self.tense
        } else {
            self.frantic
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_theme()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_theme_resolves() {
        for name in Theme::available_themes() {
            let theme = Theme::from_name(name).expect("listed theme exists");
            assert_eq!(theme.name, *name);
        }
        assert!(Theme::from_name("sepia").is_none());
    }
}
