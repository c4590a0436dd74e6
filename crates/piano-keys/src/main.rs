//! piano-keys - Nine-register piano keyboard for the terminal
//!
//! Play with the mouse or a MIDI controller; every press and release is
//! reported as a note event.

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossbeam_channel::Receiver;
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
        KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::cell::RefCell;
use std::fs::File;
use std::io::{self, stdout, LineWriter};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use piano_keys::{
    config::Config,
    keyboard::{write_event_line, Command, Keyboard, KeyboardEvent},
    midi::{DeviceProvider, MidiInputManager, MidiMessage, MidirDevices},
    pressed::PressedNotes,
    ui::{render_screen, KeyboardLayout, ScreenState},
};

#[derive(Parser)]
#[command(name = "piano-keys")]
#[command(author, version, about = "Nine-register piano keyboard for the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path (default: ~/.config/piano-keys/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start with the keyboard powered on
    #[arg(long)]
    power_on: bool,

    /// Select the first MIDI input whose name contains this text
    #[arg(short, long)]
    device: Option<String>,

    /// Only accept MIDI notes on this channel (0-15)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=15))]
    channel: Option<u8>,

    /// Append every emitted event as a JSON line to this file
    #[arg(long)]
    event_log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file
    Init,
    /// Show the configuration file path
    ConfigPath,
    /// List available MIDI input devices
    ListDevices,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_default(),
    };

    match cli.command {
        Some(Commands::Init) => {
            let path = Config::create_default_config_file()?;
            println!("Created default config at: {}", path.display());
            return Ok(());
        }
        Some(Commands::ConfigPath) => {
            let path = Config::config_path()?;
            println!("{}", path.display());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            let devices = MidirDevices::new(&config.midi.client_name).devices()?;
            if devices.is_empty() {
                println!("No MIDI input devices found");
            } else {
                println!("Available MIDI input devices:");
                for device in devices {
                    println!("  [{}] {}", device.port_index, device.display_name());
                }
            }
            return Ok(());
        }
        None => {}
    }

    // Apply CLI overrides
    if cli.power_on {
        config.keyboard.power_on_start = true;
    }
    if cli.device.is_some() {
        config.keyboard.device = cli.device;
    }
    if cli.channel.is_some() {
        config.midi.channel = cli.channel;
    }

    run_tui(config, cli.event_log)
}

fn run_tui(config: Config, event_log: Option<PathBuf>) -> Result<()> {
    // Host-side state: the pressed notes belong to us, not to the keyboard
    let pressed = Rc::new(RefCell::new(PressedNotes::new()));

    let mut keyboard = Keyboard::new(config.to_normalizer()).with_state(config.initial_state());
    {
        let pressed = pressed.clone();
        keyboard.subscribe(move |event| match event {
            KeyboardEvent::Note(note) => {
                pressed.borrow_mut().apply(note);
            }
            KeyboardEvent::PowerChanged { power: false } => pressed.borrow_mut().clear(),
            _ => {}
        });
    }
    if let Some(path) = event_log {
        let mut writer = LineWriter::new(File::create(&path)?);
        log::info!("Writing events to {}", path.display());
        keyboard.subscribe(move |event| {
            if let Err(e) = write_event_line(&mut writer, event) {
                log::warn!("Failed to write event: {}", e);
            }
        });
    }

    // No devices is a normal state: the mouse still plays
    let devices = match MidirDevices::new(&config.midi.client_name).devices() {
        Ok(devices) => devices,
        Err(e) => {
            log::warn!("MIDI input unavailable: {}", e);
            Vec::new()
        }
    };
    keyboard.apply(Command::SetDevices(devices))?;

    let (mut midi_input, midi_rx) = MidiInputManager::new(&config.midi.client_name, &config.midi.port_name);
    if let Some(filter) = &config.keyboard.device {
        let needle = filter.to_lowercase();
        match keyboard
            .devices()
            .iter()
            .position(|d| d.name.to_lowercase().contains(&needle))
        {
            Some(index) => {
                keyboard.apply(Command::SelectDevice(Some(index)))?;
                connect_selected(&keyboard, &mut midi_input);
            }
            None => log::warn!("No MIDI device found matching '{}'", filter),
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(
        &mut terminal,
        &mut keyboard,
        &pressed,
        &mut midi_input,
        &midi_rx,
        &config,
    );

    // Cleanup
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;

    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    keyboard: &mut Keyboard,
    pressed: &Rc<RefCell<PressedNotes>>,
    midi_input: &mut MidiInputManager,
    midi_rx: &Receiver<MidiMessage>,
    config: &Config,
) -> Result<()> {
    let mut layout: Option<KeyboardLayout> = None;

    loop {
        // Draw
        terminal.draw(|frame| {
            let snapshot = pressed.borrow();
            layout = render_screen(
                frame,
                &ScreenState {
                    keyboard: &*keyboard,
                    pressed: &snapshot,
                    theme: &config.theme,
                    show_alias_names: config.keyboard.show_alias_names,
                },
            );
        })?;

        // Device input, in arrival order
        while let Ok(message) = midi_rx.try_recv() {
            keyboard.device_input(&message);
        }

        // Poll for terminal events
        if !event::poll(Duration::from_millis(16))? {
            continue;
        }

        match event::read()? {
            Event::FocusLost => {
                keyboard.pointer_up();
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    if let Some((pitch_class, register)) = layout
                        .as_ref()
                        .and_then(|l| l.hit_test(mouse.column, mouse.row))
                    {
                        keyboard.pointer_down(pitch_class, register);
                    }
                }
                MouseEventKind::Up(MouseButton::Left) => {
                    keyboard.pointer_up();
                }
                _ => {}
            },
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Esc => {
                    keyboard.pointer_up();
                    return Ok(());
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    keyboard.pointer_up();
                    return Ok(());
                }
                KeyCode::Char('p') => {
                    keyboard.apply(Command::TogglePower)?;
                }
                KeyCode::Tab => {
                    let next = next_device(keyboard);
                    keyboard.apply(Command::SelectDevice(next))?;
                    connect_selected(keyboard, midi_input);
                }
                _ => {}
            },
            _ => {}
        }
    }
}

/// Cycle through the devices, then back to none
fn next_device(keyboard: &Keyboard) -> Option<usize> {
    let count = keyboard.devices().len();
    match keyboard.state().selected {
        None if count > 0 => Some(0),
        Some(i) if i + 1 < count => Some(i + 1),
        _ => None,
    }
}

fn connect_selected(keyboard: &Keyboard, midi_input: &mut MidiInputManager) {
    match keyboard.selected_device() {
        Some(device) => {
            if let Err(e) = midi_input.open(device) {
                log::warn!("Failed to open MIDI device {}: {}", device.display_name(), e);
            }
        }
        None => midi_input.close(),
    }
}
