// src/display/terminal.rs
//! Terminal status screen for tracking and the daily reset countdown

use crate::{error::Result, reset::Countdown, session::TrackingStatus};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Everything shown in one refresh.
#[derive(Debug, Clone, Default)]
pub struct StatusFrame {
    pub tracking: Option<TrackingStatus>,
    pub next_reset: Option<Countdown>,
    pub message: Option<String>,
}

pub struct TerminalDisplay;

impl TerminalDisplay {
    pub fn new() -> Self {
        Self
    }

    pub fn enter(&self) -> Result<()> {
        execute!(io::stdout(), Hide, DisableLineWrap)?;
        Ok(())
    }

    pub fn leave(&self) -> Result<()> {
        execute!(io::stdout(), Show, EnableLineWrap)?;
        Ok(())
    }

    /// Clear the screen and draw a frame
    pub fn draw(&self, frame: &StatusFrame) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        self.render(&mut stdout, frame)?;
        stdout.flush()?;
        Ok(())
    }

    fn render(&self, out: &mut impl Write, frame: &StatusFrame) -> Result<()> {
        execute!(
            out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(48)),
            Print("\nHabitumap\n"),
            Print("=".repeat(48)),
            Print("\n\n"),
            ResetColor
        )?;

        if let Some(ref status) = frame.tracking {
            self.render_tracking_section(out, status)?;
        }

        if let Some(countdown) = frame.next_reset {
            execute!(
                out,
                SetForegroundColor(Color::Cyan),
                Print("HABITS:\n"),
                ResetColor,
                Print(format!("  Next reset in: {}\n\n", countdown))
            )?;
        }

        if let Some(ref message) = frame.message {
            execute!(out, Print(format!("{}\n\n", message)))?;
        }

        execute!(
            out,
            SetForegroundColor(Color::Green),
            Print("Press Ctrl+C to stop\n"),
            ResetColor
        )?;
        Ok(())
    }

    fn render_tracking_section(&self, out: &mut impl Write, status: &TrackingStatus) -> Result<()> {
        let (color, state) = if status.active {
            (Color::Yellow, "RECORDING")
        } else {
            (Color::DarkGrey, "IDLE")
        };

        execute!(
            out,
            SetForegroundColor(color),
            Print(format!("TRACKING: {}\n", state)),
            ResetColor,
            Print(format!("  Duration:  {:>12}\n", status.duration)),
            Print(format!("  Distance:  {:>12}\n", status.distance)),
            Print(format!("  Samples:   {:>12}\n", status.samples)),
            Print(format!("  Points:    {:>12}\n\n", status.points))
        )?;
        Ok(())
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

/// Clear `running` on Ctrl+C.
pub fn stop_on_ctrl_c(running: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            running.store(false, Ordering::Relaxed);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(frame: &StatusFrame) -> String {
        let mut out = Vec::new();
        TerminalDisplay::new().render(&mut out, frame).unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn test_render_tracking() {
        let frame = StatusFrame {
            tracking: Some(TrackingStatus {
                active: true,
                duration: "1h 5m".to_string(),
                distance: "3.21 km".to_string(),
                distance_km: 3.21,
                samples: 40,
                points: 2,
            }),
            next_reset: Some(Countdown { hours: 3, minutes: 2, seconds: 1 }),
            message: None,
        };

        let text = rendered(&frame);
        assert!(text.contains("RECORDING"));
        assert!(text.contains("1h 5m"));
        assert!(text.contains("3.21 km"));
        assert!(text.contains("Next reset in: 3h 2m 1s"));
    }

    #[test]
    fn test_render_message_only() {
        let frame = StatusFrame {
            message: Some("Waiting for fix".to_string()),
            ..StatusFrame::default()
        };
        let text = rendered(&frame);
        assert!(text.contains("Waiting for fix"));
        assert!(!text.contains("TRACKING"));
    }
}
