//! TUI rendering for the keyboard
//!
//! Draws the nine registers side by side as one piano and maps terminal
//! mouse positions back to keys.

use crate::config::Theme;
use crate::keyboard::{Keyboard, RegisterView};
use crate::note::{PitchClass, Register};
use crate::pressed::PressedNotes;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Widget};

/// Narrowest white key that still shows a separator
pub const MIN_KEY_WIDTH: u16 = 2;
/// Widest white key
pub const MAX_KEY_WIDTH: u16 = 5;

/// Screen rectangle of one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRect {
    pub pitch_class: PitchClass,
    pub register: Register,
    pub is_black_key: bool,
    pub pressed: bool,
    pub rect: Rect,
}

impl KeyRect {
    fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.rect.x
            && column < self.rect.x + self.rect.width
            && row >= self.rect.y
            && row < self.rect.y + self.rect.height
    }
}

/// Key rectangles for one frame, white keys first then black keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardLayout {
    pub keys: Vec<KeyRect>,
    pub key_width: u16,
}

fn black_key_width(key_width: u16) -> u16 {
    (key_width * 2 / 3).max(1)
}

impl KeyboardLayout {
    /// Lay out the visible keys of `view` inside `area`.
    ///
    /// Returns `None` when the area cannot fit every white key.
    pub fn compute(area: Rect, view: &[RegisterView]) -> Option<Self> {
        let white_count = view
            .iter()
            .flat_map(|(_, keys)| keys)
            .filter(|k| k.visible && !k.is_black_key)
            .count() as u16;
        if white_count == 0 || area.height < 3 {
            return None;
        }

        let key_width = (area.width / white_count).min(MAX_KEY_WIDTH);
        if key_width < MIN_KEY_WIDTH {
            return None;
        }

        let total_width = key_width * white_count;
        let left = area.x + (area.width - total_width) / 2;
        let right = left + total_width;
        let black_height = (area.height * 3 / 5).max(1);
        let bw = black_key_width(key_width);

        let mut whites = Vec::new();
        let mut blacks = Vec::new();
        let mut index = 0u16;

        for (register, states) in view {
            let mut white_x = [None; 12];
            for key in states.iter().filter(|k| k.visible && !k.is_black_key) {
                let x = left + index * key_width;
                white_x[key.pitch_class.semitone() as usize] = Some(x);
                whites.push(KeyRect {
                    pitch_class: key.pitch_class,
                    register: *register,
                    is_black_key: false,
                    pressed: key.pressed,
                    rect: Rect::new(x, area.y, key_width, area.height),
                });
                index += 1;
            }

            // A black key straddles the boundary after the white key one
            // semitone below it.
            for key in states.iter().filter(|k| k.visible && k.is_black_key) {
                let below = (key.pitch_class.semitone() + 11) % 12;
                let Some(x) = white_x[below as usize] else {
                    continue;
                };
                let boundary = x + key_width;
                let bx = boundary.saturating_sub((bw + 1) / 2).min(right - bw);
                blacks.push(KeyRect {
                    pitch_class: key.pitch_class,
                    register: *register,
                    is_black_key: true,
                    pressed: key.pressed,
                    rect: Rect::new(bx, area.y, bw, black_height),
                });
            }
        }

        whites.extend(blacks);
        Some(Self {
            keys: whites,
            key_width,
        })
    }

    /// Key under a terminal cell; black keys sit on top of white keys
    pub fn hit_test(&self, column: u16, row: u16) -> Option<(PitchClass, Register)> {
        self.keys
            .iter()
            .rev()
            .find(|k| k.contains(column, row))
            .map(|k| (k.pitch_class, k.register))
    }
}

/// Piano widget for rendering a computed layout
pub struct PianoWidget<'a> {
    layout: &'a KeyboardLayout,
    theme: &'a Theme,
}

impl<'a> PianoWidget<'a> {
    pub fn new(layout: &'a KeyboardLayout, theme: &'a Theme) -> Self {
        Self { layout, theme }
    }
}

impl<'a> Widget for PianoWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let separator = Style::default().fg(Color::Black).bg(self.theme.white_key());

        for key in &self.layout.keys {
            let rect = key.rect.intersection(area);
            if rect.is_empty() {
                continue;
            }

            if key.is_black_key {
                let bg = if key.pressed {
                    self.theme.pressed_black_key()
                } else {
                    self.theme.black_key()
                };
                buf.set_style(rect, Style::default().bg(bg));
                continue;
            }

            let bg = if key.pressed {
                self.theme.pressed_key()
            } else {
                self.theme.white_key()
            };
            buf.set_style(rect, Style::default().bg(bg));

            let edge = rect.x + rect.width - 1;
            for y in rect.y..rect.y + rect.height {
                buf.set_string(edge, y, "│", separator);
            }

            if self.theme.show_note_names && key.pitch_class == PitchClass::C {
                let label = if rect.width > 2 {
                    format!("C{}", key.register)
                } else {
                    key.register.to_string()
                };
                let style = Style::default().fg(Color::DarkGray).bg(bg);
                buf.set_string(rect.x, rect.y + rect.height - 1, label, style);
            }
        }
    }
}

/// Everything the screen needs for one frame
pub struct ScreenState<'a> {
    pub keyboard: &'a Keyboard,
    pub pressed: &'a PressedNotes,
    pub theme: &'a Theme,
    pub show_alias_names: bool,
}

/// Space-separated held notes, with alias spellings when asked for
pub fn describe_pressed(pressed: &PressedNotes, show_alias_names: bool) -> String {
    if !show_alias_names || pressed.is_empty() {
        return pressed.describe();
    }
    pressed
        .iter()
        .map(|n| format!("{}{}", n.pitch_class.label(), n.register))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the whole screen. Returns the key layout for mouse hit testing,
/// or `None` when the terminal is too small for the keyboard.
pub fn render_screen(frame: &mut Frame, state: &ScreenState) -> Option<KeyboardLayout> {
    let area = frame.area();
    let theme = state.theme;
    let keyboard = state.keyboard;

    let device_rows = keyboard.devices().len().max(1) as u16 + 2;
    let help_rows = if theme.show_help { 1 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(device_rows),
            Constraint::Length(help_rows),
        ])
        .split(area);

    render_status(frame, chunks[0], state);

    let piano_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border()));
    let piano_area = piano_block.inner(chunks[1]);
    frame.render_widget(piano_block, chunks[1]);

    let view = keyboard.render(state.pressed);
    let layout = KeyboardLayout::compute(piano_area, &view);
    match &layout {
        Some(layout) => frame.render_widget(PianoWidget::new(layout, theme), piano_area),
        None => frame.render_widget(
            Paragraph::new("Terminal too small for the keyboard").style(Style::default().fg(Color::Yellow)),
            piano_area,
        ),
    }

    render_devices(frame, chunks[2], keyboard, theme);

    if theme.show_help {
        let help = Line::from(vec![
            Span::styled(" click ", Style::default().fg(Color::White)),
            Span::styled("play  ", Style::default().fg(Color::DarkGray)),
            Span::styled("p ", Style::default().fg(Color::White)),
            Span::styled("power  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Tab ", Style::default().fg(Color::White)),
            Span::styled("device  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Esc ", Style::default().fg(Color::White)),
            Span::styled("quit", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(help), chunks[3]);
    }

    layout
}

fn render_status(frame: &mut Frame, area: Rect, state: &ScreenState) {
    let keyboard = state.keyboard;
    let (power, power_color) = if keyboard.is_powered() {
        ("ON", Color::LightGreen)
    } else {
        ("OFF", Color::LightRed)
    };

    let title = match keyboard.selected_device() {
        Some(device) => format!(" Piano <- {} ", device.display_name()),
        None => " Piano (no MIDI input) ".to_string(),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(state.theme.border()));

    let line = Line::from(vec![
        Span::styled("● ", Style::default().fg(power_color)),
        Span::styled(format!("{}  ", power), Style::default().fg(power_color).add_modifier(Modifier::BOLD)),
        Span::styled("Playing: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            describe_pressed(state.pressed, state.show_alias_names),
            Style::default().fg(state.theme.pressed_key()).add_modifier(Modifier::BOLD),
        ),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_devices(frame: &mut Frame, area: Rect, keyboard: &Keyboard, theme: &Theme) {
    let block = Block::default()
        .title(" Select Your MIDI Controller ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border()));

    let lines: Vec<Line> = if keyboard.devices().is_empty() {
        vec![Line::from(Span::styled(
            "No controllers detected. If you just connected a controller, restart to see it here.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        let selected = keyboard.state().selected;
        keyboard
            .devices()
            .iter()
            .enumerate()
            .map(|(i, device)| {
                if selected == Some(i) {
                    Line::from(Span::styled(
                        format!("> {}", device.display_name()),
                        Style::default().fg(theme.pressed_key()).add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(format!("  {}", device.display_name()))
                }
            })
            .collect()
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(i: u8) -> Register {
        Register::new(i).unwrap()
    }

    fn layout(width: u16, height: u16, pressed: &PressedNotes) -> Option<KeyboardLayout> {
        let view = Keyboard::default().render(pressed);
        KeyboardLayout::compute(Rect::new(0, 0, width, height), &view)
    }

    #[test]
    fn test_layout_places_every_visible_key() {
        let layout = layout(104, 6, &PressedNotes::new()).unwrap();
        assert_eq!(layout.key_width, 2);
        assert_eq!(layout.keys.iter().filter(|k| !k.is_black_key).count(), 52);
        assert_eq!(layout.keys.iter().filter(|k| k.is_black_key).count(), 37);
    }

    #[test]
    fn test_layout_too_narrow() {
        assert!(layout(60, 6, &PressedNotes::new()).is_none());
        assert!(layout(104, 2, &PressedNotes::new()).is_none());
    }

    #[test]
    fn test_hit_test() {
        let layout = layout(104, 6, &PressedNotes::new()).unwrap();

        assert_eq!(layout.hit_test(0, 5), Some((PitchClass::A, reg(0))));
        assert_eq!(layout.hit_test(103, 5), Some((PitchClass::C, reg(8))));

        // C4 is the 24th white key (columns 46-47); C#4 sits on its edge
        assert_eq!(layout.hit_test(46, 0), Some((PitchClass::C, reg(4))));
        assert_eq!(layout.hit_test(47, 0), Some((PitchClass::CSharp, reg(4))));
        assert_eq!(layout.hit_test(47, 5), Some((PitchClass::C, reg(4))));

        assert_eq!(layout.hit_test(104, 0), None);
        assert_eq!(layout.hit_test(0, 6), None);
    }

    #[test]
    fn test_no_black_key_between_e_and_f() {
        let layout = layout(104, 6, &PressedNotes::new()).unwrap();
        // E4 is white key 25 (columns 50-51); its right edge is not covered
        assert_eq!(layout.hit_test(51, 0), Some((PitchClass::E, reg(4))));
    }

    #[test]
    fn test_pressed_state_reaches_layout() {
        let pressed = PressedNotes::parse(["Db4", "A0"]).unwrap();
        let layout = layout(104, 6, &pressed).unwrap();
        let held: Vec<_> = layout
            .keys
            .iter()
            .filter(|k| k.pressed)
            .map(|k| (k.pitch_class, k.register.index()))
            .collect();
        assert_eq!(held, vec![(PitchClass::A, 0), (PitchClass::CSharp, 4)]);
    }

    #[test]
    fn test_describe_pressed() {
        let pressed = PressedNotes::parse(["Gb2", "C3"]).unwrap();
        assert_eq!(describe_pressed(&pressed, false), "F#2 C3");
        assert_eq!(describe_pressed(&pressed, true), "F#/Gb2 C3");
        assert_eq!(describe_pressed(&PressedNotes::new(), true), "-");
    }

    #[test]
    fn test_widget_renders_pressed_key_color() {
        let pressed = PressedNotes::parse(["A0"]).unwrap();
        let layout = layout(104, 6, &pressed).unwrap();
        let theme = Theme::default();
        let area = Rect::new(0, 0, 104, 6);
        let mut buf = Buffer::empty(area);
        PianoWidget::new(&layout, &theme).render(area, &mut buf);

        assert_eq!(buf.get(0, 5).bg, theme.pressed_key());
        assert_eq!(buf.get(2, 5).bg, theme.white_key());
    }

    #[test]
    fn test_widget_uses_theme_for_pressed_black_keys() {
        let pressed = PressedNotes::parse(["C#4"]).unwrap();
        let layout = layout(104, 6, &pressed).unwrap();
        let theme = Theme {
            pressed_black_key_color: "#102030".to_string(),
            ..Theme::default()
        };
        let area = Rect::new(0, 0, 104, 6);
        let mut buf = Buffer::empty(area);
        PianoWidget::new(&layout, &theme).render(area, &mut buf);

        assert_eq!(buf.get(47, 0).bg, Color::Rgb(0x10, 0x20, 0x30));
        // D#4 is not pressed
        assert_eq!(buf.get(49, 0).bg, theme.black_key());
    }
}
