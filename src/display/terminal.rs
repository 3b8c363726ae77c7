use super::sink::DisplaySink;
use super::stats::DisplayStats;
use crate::error::{AbrSimError, Result};
use crate::frame::VideoFrame;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Headless sink that reports rendering progress through logs and, when
/// enabled, reads a quit key from the controlling terminal
pub struct TerminalDisplaySink {
    keyboard_quit: bool,
    raw_mode: bool,
    stats: DisplayStats,
}

impl TerminalDisplaySink {
    pub fn new(keyboard_quit: bool) -> Self {
        Self {
            keyboard_quit,
            raw_mode: false,
            stats: DisplayStats::default(),
        }
    }

    fn is_quit_key(code: KeyCode, modifiers: KeyModifiers) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => true,
            KeyCode::Char('c') => modifiers.contains(KeyModifiers::CONTROL),
            _ => false,
        }
    }
}

impl DisplaySink for TerminalDisplaySink {
    fn open(&mut self) -> Result<()> {
        self.stats.reset();

        if self.keyboard_quit && !self.raw_mode {
            enable_raw_mode().map_err(|e| AbrSimError::Display {
                details: format!("Failed to enable raw mode for keyboard input: {}", e),
            })?;
            self.raw_mode = true;
            info!("Keyboard quit enabled - press q or Esc to stop playback");
        }
        Ok(())
    }

    fn show(&mut self, frame: &VideoFrame) -> Result<()> {
        if self.stats.record_frame_render(frame.resolution()) {
            info!("Rendering at {}", frame.resolution());
        }
        trace!(
            "Frame {} shown at {} ({}ms after decode)",
            frame.id,
            frame.resolution(),
            frame.age_ms()
        );
        Ok(())
    }

    fn poll_quit(&mut self) -> bool {
        if !self.raw_mode {
            return false;
        }

        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        if Self::is_quit_key(key.code, key.modifiers) {
                            info!("Quit key pressed - requesting stop");
                            return true;
                        }
                        debug!("Key pressed: {:?}", key.code);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Error reading keyboard event: {}", e);
                        return false;
                    }
                },
                Ok(false) => return false,
                Err(e) => {
                    warn!("Error polling for keyboard events: {}", e);
                    return false;
                }
            }
        }
    }

    fn close(&mut self) {
        if self.raw_mode {
            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }
            self.raw_mode = false;
        }
    }

    fn stats(&self) -> DisplayStats {
        self.stats.clone()
    }

    fn name(&self) -> &str {
        "terminal"
    }
}

impl Drop for TerminalDisplaySink {
    fn drop(&mut self) {
        self.close();
    }
}
