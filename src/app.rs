use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;

use frenzytone::audio::DeviceOutput;
use frenzytone::command::{Command, CommandSource};
use frenzytone::engine::{GameEvent, SoundEngine, Track};
use frenzytone::event::EventLog;
use frenzytone::sequencer::STEPS;
use frenzytone::synth::SoundKind;
use frenzytone::ui::{
    help_line_count, render_event_log, render_grid, render_help, render_levels,
    render_transport, HelpState, LevelsInfo, Theme, TransportInfo,
};

const DIFFICULTY_STEP: f32 = 0.1;
const MAX_DIFFICULTY: f32 = 10.0;
const SCORE_STEP: u64 = 250;
const VOLUME_STEP: f32 = 0.1;

/// Simulated player feeding kills, streaks and frenzies to the engine
pub struct Autopilot {
    rng: Pcg32,
    elapsed: f64,
    next_kill_at: f64,
    kills: u32,
    frenzy_ends_at: Option<f64>,
}

/// Kill count that triggers a frenzy
const FRENZY_KILLS: u32 = 15;
const FRENZY_SECS: f64 = 8.0;
const POINTS_PER_KILL: u64 = 100;

impl Autopilot {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            elapsed: 0.0,
            next_kill_at: 0.5,
            kills: 0,
            frenzy_ends_at: None,
        }
    }

    /// Advance by `dt` seconds, returning the game events that happened
    pub fn tick(&mut self, dt: f64) -> Vec<GameEvent> {
        self.elapsed += dt;
        let mut events = Vec::new();

        if let Some(end) = self.frenzy_ends_at {
            if self.elapsed >= end {
                self.frenzy_ends_at = None;
                self.kills = 0;
                events.push(GameEvent::FrenzyEnd);
            }
        }

        while self.elapsed >= self.next_kill_at {
            let gap = if self.frenzy_ends_at.is_some() {
                self.rng.random_range(0.15..0.5)
            } else {
                self.rng.random_range(0.3..1.2)
            };
            self.next_kill_at += gap;
            self.kills += 1;
            events.push(GameEvent::Kill);

            if self.kills % 5 == 0 {
                events.push(GameEvent::Killstreak {
                    streak: self.kills / 5,
                });
            }
            if self.frenzy_ends_at.is_none() && self.kills >= FRENZY_KILLS {
                self.frenzy_ends_at = Some(self.elapsed + FRENZY_SECS);
                events.push(GameEvent::FrenzyStart { tier: 1 });
            } else if self.kills == FRENZY_KILLS + 10 {
                if let Some(end) = self.frenzy_ends_at.as_mut() {
                    *end += FRENZY_SECS / 2.0;
                    events.push(GameEvent::FrenzyExtend { tier: 1 });
                }
            }
        }
        events
    }
}

/// Playground host: stands in for a game, driving the engine from the keyboard
pub struct App {
    theme: Theme,
    engine: SoundEngine<DeviceOutput>,
    event_log: EventLog,
    help_state: HelpState,
    show_help: bool,
    difficulty: f32,
    score: u64,
    streak: u32,
    frenzy_tier: u32,
    autopilot: Option<Autopilot>,
    autopilot_seed: u64,
    should_quit: bool,
    /// Temporary status message shown in the footer
    status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(theme: Theme, engine: SoundEngine<DeviceOutput>, difficulty: f32, seed: u64) -> Self {
        Self {
            theme,
            engine,
            event_log: EventLog::new(),
            help_state: HelpState::new(),
            show_help: false,
            difficulty: difficulty.clamp(1.0, MAX_DIFFICULTY),
            score: 0,
            streak: 0,
            frenzy_tier: 0,
            autopilot: None,
            autopilot_seed: seed,
            should_quit: false,
            status_message: None,
        }
    }

    /// Run the main application loop
    pub fn run(&mut self) -> Result<()> {
        self.dispatch(Command::Init, CommandSource::Keyboard);
        if !self.engine.is_available() {
            self.set_status("No audio output available; running silent".to_string());
        }

        let mut terminal = Self::setup_terminal()?;
        let result = self.main_loop(&mut terminal);
        self.engine.stop_music();
        Self::restore_terminal(&mut terminal)?;
        result
    }

    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(terminal)
    }

    fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    /// Main event loop. Every frame stands in for one game tick.
    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_frame = Instant::now();
        loop {
            terminal.draw(|frame| self.render(frame))?;

            // ~60fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            let dt = last_frame.elapsed().as_secs_f64();
            last_frame = Instant::now();
            self.game_tick(dt);

            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    fn game_tick(&mut self, dt: f64) {
        if let Some(autopilot) = self.autopilot.as_mut() {
            let events = autopilot.tick(dt);
            self.difficulty = (self.difficulty + 0.02 * dt as f32).min(MAX_DIFFICULTY);
            for event in events {
                if event == GameEvent::Kill {
                    self.score += POINTS_PER_KILL;
                }
                self.dispatch(Command::GameEvent(event), CommandSource::Autopilot);
            }
        }

        self.dispatch(
            Command::UpdateDifficulty {
                difficulty: self.difficulty,
                score: self.score,
            },
            CommandSource::Autopilot,
        );
        self.engine.pump();
    }

    fn dispatch(&mut self, cmd: Command, source: CommandSource) {
        self.event_log.log(cmd.clone(), source);
        self.engine.dispatch(cmd);
    }

    fn key(&mut self, cmd: Command) {
        self.dispatch(cmd, CommandSource::Keyboard);
    }

    fn set_status(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.show_help {
            self.handle_help_key(key.code);
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('?') | KeyCode::Char('g') => self.show_help = true,

            KeyCode::Char(' ') | KeyCode::Char('p') => {
                if self.engine.is_playing() || self.engine.is_start_pending() {
                    self.key(Command::StopMusic);
                } else {
                    self.key(Command::StartMusic {
                        track: Track::Gameplay,
                        difficulty: self.difficulty,
                    });
                }
            }
            KeyCode::Char('n') => {
                self.key(Command::StopMusic);
                self.key(Command::StartMusic {
                    track: Track::Menu,
                    difficulty: self.difficulty,
                });
            }

            KeyCode::Char('k') => {
                self.score += POINTS_PER_KILL;
                self.key(Command::GameEvent(GameEvent::Kill));
            }
            KeyCode::Char('s') => {
                self.streak += 1;
                self.key(Command::GameEvent(GameEvent::Killstreak {
                    streak: self.streak,
                }));
            }
            KeyCode::Char('f') => {
                self.frenzy_tier += 1;
                self.key(Command::GameEvent(GameEvent::FrenzyStart {
                    tier: self.frenzy_tier,
                }));
            }
            KeyCode::Char('x') => {
                let tier = self.frenzy_tier.max(1);
                self.key(Command::GameEvent(GameEvent::FrenzyExtend { tier }));
            }
            KeyCode::Char('e') => {
                self.frenzy_tier = 0;
                self.streak = 0;
                self.key(Command::GameEvent(GameEvent::FrenzyEnd));
            }
            KeyCode::Char('l') => self.key(Command::GameEvent(GameEvent::LevelUp)),

            KeyCode::Up => {
                self.difficulty = (self.difficulty + DIFFICULTY_STEP).min(MAX_DIFFICULTY);
            }
            KeyCode::Down => {
                self.difficulty = (self.difficulty - DIFFICULTY_STEP).max(1.0);
            }
            KeyCode::Char(']') => self.score += SCORE_STEP,
            KeyCode::Char('[') => self.score = self.score.saturating_sub(SCORE_STEP),

            KeyCode::Char('m') => self.key(Command::ToggleMute),
            KeyCode::Char('-') => {
                let v = self.engine.state().music_volume - VOLUME_STEP;
                self.key(Command::SetMusicVolume(v.max(0.0)));
            }
            KeyCode::Char('=') => {
                let v = self.engine.state().music_volume + VOLUME_STEP;
                self.key(Command::SetMusicVolume(v.min(1.0)));
            }
            KeyCode::Char(',') => {
                let v = self.engine.state().sfx_volume - VOLUME_STEP;
                self.key(Command::SetSfxVolume(v.max(0.0)));
            }
            KeyCode::Char('.') => {
                let v = self.engine.state().sfx_volume + VOLUME_STEP;
                self.key(Command::SetSfxVolume(v.min(1.0)));
            }

            KeyCode::Char('a') => {
                if self.autopilot.take().is_some() {
                    self.set_status("Autopilot off".to_string());
                } else {
                    self.autopilot = Some(Autopilot::new(self.autopilot_seed));
                    self.autopilot_seed = self.autopilot_seed.wrapping_add(1);
                    self.set_status("Autopilot on".to_string());
                }
            }

            KeyCode::Char(c) if c.is_ascii_digit() => {
                if let Some(kind) = sound_for_digit(c) {
                    self.set_status(format!("Sound: {}", kind.name()));
                    self.key(Command::PlaySound(kind));
                }
            }
            _ => {}
        }
    }

    fn handle_help_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::Char('k') => self.help_state.scroll_up(),
            KeyCode::Down | KeyCode::Char('j') => {
                let total = help_line_count(&self.theme);
                self.help_state.scroll_down(total, 20);
            }
            KeyCode::Char('q') => self.should_quit = true,
            _ => self.show_help = false,
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.bg)),
            area,
        );

        // Layout: header, transport, grid, panels, footer
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(3), // Transport
                Constraint::Length(7), // Grid
                Constraint::Min(6),    // Levels + event log
                Constraint::Length(3), // Footer
            ])
            .split(area);

        self.render_header(frame, chunks[0]);

        let state = self.engine.state();
        let pattern = self.engine.current_pattern();
        let transport = TransportInfo {
            playing: state.music_playing,
            pending: self.engine.is_start_pending(),
            muted: state.muted,
            track: state.track,
            tempo: state.current_tempo,
            pattern_name: &pattern.name,
            pattern_index: state.current_pattern_index,
            step_index: state.step_index,
            difficulty: self.difficulty,
            score: self.score,
            autopilot: self.autopilot.is_some(),
        };
        render_transport(frame, chunks[1], &transport, &self.theme);

        let playhead = state
            .music_playing
            .then_some((state.step_index % STEPS as u64) as usize);
        render_grid(frame, chunks[2], pattern, playhead, &self.theme);

        let panels = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(40), Constraint::Min(20)])
            .split(chunks[3]);

        let levels = LevelsInfo {
            music_volume: state.music_volume,
            sfx_volume: state.sfx_volume,
            muted: state.muted,
            live_handles: self.engine.live_handle_count(),
            render: self.engine.output().map(|out| *out.stats().read()),
        };
        render_levels(frame, panels[0], &levels, &self.theme);
        render_event_log(frame, panels[1], &self.event_log, &self.theme);

        if self.show_help {
            let help_area = chunks[2].union(chunks[3]);
            render_help(frame, help_area, &self.help_state, &self.theme);
        }

        self.render_footer(frame, chunks[4]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let title = format!(" FRENZYTONE v{} [PLAYGROUND] ", env!("CARGO_PKG_VERSION"));
        let header = Paragraph::new(title)
            .style(
                Style::default()
                    .fg(self.theme.highlight)
                    .bg(self.theme.bg)
                    .bold(),
            )
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.border))
                    .style(Style::default().bg(self.theme.bg)),
            );
        frame.render_widget(header, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        // Show status message if recent (within 3 seconds)
        let text = match self.status_message {
            Some((ref msg, instant)) if instant.elapsed().as_secs() < 3 => msg.clone(),
            _ => self.footer_help(),
        };

        let footer = Paragraph::new(text)
            .style(Style::default().fg(self.theme.dimmed).bg(self.theme.bg))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.border))
                    .style(Style::default().bg(self.theme.bg)),
            );
        frame.render_widget(footer, area);
    }

    fn footer_help(&self) -> String {
        if self.show_help {
            return format!("Up/Down:Scroll | any key:Back | Q:Quit | {}", self.theme.name);
        }
        format!(
            "SPACE:Play | N:Menu | K:Kill | S:Streak | F/X/E:Frenzy | L:Level | Up/Down:Diff | 0-9:Sfx | M:Mute | A:Auto | G:Help | Q:Quit | {}",
            self.theme.name
        )
    }
}

/// Keys 1-9 then 0 pick the first ten effects
fn sound_for_digit(c: char) -> Option<SoundKind> {
    let digit = c.to_digit(10)? as usize;
    let index = if digit == 0 { 9 } else { digit - 1 };
    SoundKind::ALL.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_map_to_sounds() {
        assert_eq!(sound_for_digit('1'), Some(SoundKind::ALL[0]));
        assert_eq!(sound_for_digit('9'), Some(SoundKind::ALL[8]));
        assert_eq!(sound_for_digit('0'), Some(SoundKind::ALL[9]));
        assert_eq!(sound_for_digit('x'), None);
    }

    #[test]
    fn autopilot_kills_and_frenzies() {
        let mut pilot = Autopilot::new(7);
        let mut events = Vec::new();
        for _ in 0..60 * 60 {
            events.extend(pilot.tick(1.0 / 60.0));
        }

        let kills = events.iter().filter(|e| **e == GameEvent::Kill).count();
        assert!(kills >= 40, "only {} kills in a minute", kills);

        let start = events
            .iter()
            .position(|e| matches!(e, GameEvent::FrenzyStart { .. }))
            .expect("a frenzy starts");
        let end = events
            .iter()
            .position(|e| *e == GameEvent::FrenzyEnd)
            .expect("the frenzy ends");
        assert!(start < end);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::Killstreak { .. })));
    }

    #[test]
    fn autopilot_is_reproducible() {
        let mut a = Autopilot::new(3);
        let mut b = Autopilot::new(3);
        for _ in 0..600 {
            assert_eq!(a.tick(0.016), b.tick(0.016));
        }
    }
}
