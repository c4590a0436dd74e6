//! Configuration file support for piano-keys
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/piano-keys/config.toml`
//! - macOS: `~/Library/Application Support/piano-keys/config.toml`
//! - Windows: `%APPDATA%\piano-keys\config.toml`

use crate::error::{Error, Result};
use crate::event::EventNormalizer;
use crate::keyboard::KeyboardState;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Keyboard configuration
    pub keyboard: KeyboardSettings,
    /// MIDI input configuration
    pub midi: MidiSettings,
    /// UI/Theme configuration
    pub theme: Theme,
}

impl Config {
    /// Load configuration from the default config file location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Err(Error::Config(format!("Config file not found at {:?}", path)))
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration or return default if not found
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Using default config: {}", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the default config file location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "piano-keys") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Err(Error::Config("Could not determine config directory".to_string()))
        }
    }

    /// Create a default config file with comments
    pub fn create_default_config_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        Self::write_default_config(&path)?;
        Ok(path)
    }

    /// Write the commented default config to `path`
    pub fn write_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = r#"# piano-keys configuration file

[keyboard]
# Start with the keyboard powered on
power_on_start = false

# Select the first MIDI input whose name contains this text (optional)
# device = "KeyStep"

# Label black keys with both spellings (C#/Db) instead of sharps only
show_alias_names = false

[midi]
# MIDI client name
client_name = "piano-keys"

# MIDI input port name
port_name = "midi_in"

# Only accept notes on this MIDI channel (0-15); omit for all channels
# channel = 0

[theme]
# Colors for the keyboard display
white_key_color = "white"
black_key_color = "dark_gray"
pressed_key_color = "cyan"
pressed_black_key_color = "magenta"
border_color = "cyan"

# Show note names on keys
show_note_names = true

# Show keyboard shortcuts help
show_help = true
"#;

        fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(channel) = self.midi.channel {
            if channel > 15 {
                return Err(Error::Config(format!(
                    "MIDI channel must be 0-15, got {}",
                    channel
                )));
            }
        }
        Ok(())
    }

    /// Event normalizer for the configured MIDI channel
    pub fn to_normalizer(&self) -> EventNormalizer {
        EventNormalizer::new().with_channel(self.midi.channel)
    }

    /// Initial controls snapshot (no devices yet)
    pub fn initial_state(&self) -> KeyboardState {
        KeyboardState {
            power: self.keyboard.power_on_start,
            ..KeyboardState::default()
        }
    }
}

/// Keyboard settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardSettings {
    /// Start powered on
    pub power_on_start: bool,
    /// Device name filter for auto-selection
    pub device: Option<String>,
    /// Label black keys as `C#/Db`
    pub show_alias_names: bool,
}

/// MIDI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiSettings {
    /// MIDI client name
    pub client_name: String,
    /// MIDI input port name
    pub port_name: String,
    /// Channel filter (0-15)
    pub channel: Option<u8>,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            client_name: "piano-keys".to_string(),
            port_name: "midi_in".to_string(),
            channel: None,
        }
    }
}

/// Theme/UI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// White key color
    pub white_key_color: String,
    /// Black key color
    pub black_key_color: String,
    /// Pressed white key color
    pub pressed_key_color: String,
    /// Pressed black key color
    pub pressed_black_key_color: String,
    /// Border color
    pub border_color: String,
    /// Show note names on keys
    pub show_note_names: bool,
    /// Show help text
    pub show_help: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            white_key_color: "white".to_string(),
            black_key_color: "dark_gray".to_string(),
            pressed_key_color: "cyan".to_string(),
            pressed_black_key_color: "magenta".to_string(),
            border_color: "cyan".to_string(),
            show_note_names: true,
            show_help: true,
        }
    }
}

impl Theme {
    /// Parse a color string to ratatui Color
    pub fn parse_color(s: &str) -> ratatui::style::Color {
        use ratatui::style::Color;
        match s.to_lowercase().as_str() {
            "black" => Color::Black,
            "red" => Color::Red,
            "green" => Color::Green,
            "yellow" => Color::Yellow,
            "blue" => Color::Blue,
            "magenta" => Color::Magenta,
            "cyan" => Color::Cyan,
            "gray" | "grey" => Color::Gray,
            "dark_gray" | "dark_grey" | "darkgray" | "darkgrey" => Color::DarkGray,
            "light_red" | "lightred" => Color::LightRed,
            "light_green" | "lightgreen" => Color::LightGreen,
            "light_yellow" | "lightyellow" => Color::LightYellow,
            "light_blue" | "lightblue" => Color::LightBlue,
            "light_magenta" | "lightmagenta" => Color::LightMagenta,
            "light_cyan" | "lightcyan" => Color::LightCyan,
            "white" => Color::White,
            s if s.starts_with('#') && s.len() == 7 && s.is_ascii() => {
                match (
                    u8::from_str_radix(&s[1..3], 16),
                    u8::from_str_radix(&s[3..5], 16),
                    u8::from_str_radix(&s[5..7], 16),
                ) {
                    (Ok(r), Ok(g), Ok(b)) => Color::Rgb(r, g, b),
                    _ => Color::White,
                }
            }
            _ => Color::White,
        }
    }

    pub fn white_key(&self) -> ratatui::style::Color {
        Self::parse_color(&self.white_key_color)
    }

    pub fn black_key(&self) -> ratatui::style::Color {
        Self::parse_color(&self.black_key_color)
    }

    pub fn pressed_key(&self) -> ratatui::style::Color {
        Self::parse_color(&self.pressed_key_color)
    }

    pub fn pressed_black_key(&self) -> ratatui::style::Color {
        Self::parse_color(&self.pressed_black_key_color)
    }

    pub fn border(&self) -> ratatui::style::Color {
        Self::parse_color(&self.border_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.keyboard.power_on_start);
        assert_eq!(config.midi.client_name, "piano-keys");
        assert_eq!(config.midi.channel, None);
        assert!(!config.initial_state().power);
    }

    #[test]
    fn test_default_config_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::write_default_config(&path).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.midi.port_name, "midi_in");
        assert_eq!(config.theme.pressed_key_color, "cyan");
        assert_eq!(config.theme.pressed_black_key_color, "magenta");
        assert!(config.keyboard.device.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.keyboard.power_on_start = true;
        config.keyboard.device = Some("keystep".to_string());
        config.midi.channel = Some(9);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(loaded.initial_state().power);
        assert_eq!(loaded.keyboard.device.as_deref(), Some("keystep"));
        assert_eq!(loaded.to_normalizer().channel(), Some(9));
    }

    #[test]
    fn test_invalid_channel_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[midi]\nchannel = 16\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[keyboard]\npower_on_start = true\n").unwrap();
        assert!(config.keyboard.power_on_start);
        assert_eq!(config.midi.client_name, "piano-keys");
        assert!(config.theme.show_help);
    }

    #[test]
    fn test_color_parsing() {
        use ratatui::style::Color;
        assert_eq!(Theme::parse_color("cyan"), Color::Cyan);
        assert_eq!(Theme::parse_color("DARK_GRAY"), Color::DarkGray);
        assert_eq!(Theme::parse_color("#ff0000"), Color::Rgb(255, 0, 0));
        assert_eq!(Theme::parse_color("#zz0000"), Color::White);
        // seven bytes, but not seven characters
        assert_eq!(Theme::parse_color("#a€ab"), Color::White);
    }
}
