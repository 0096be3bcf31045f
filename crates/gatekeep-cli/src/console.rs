//! Terminal stand-ins for the board peripherals.
//!
//! Keys are typed on stdin (`12345=`, `+`, `-`), one or more per line. The
//! LCD is redrawn on stdout after every write. Motor and buzzer changes are
//! logged.

use gatekeep_hardware::{
    AlarmDevice, CharacterDisplay, DoorActuator, HardwareError, Key, KeypadDevice,
    MotorDirection, Result, VirtualDisplay, display::DISPLAY_COLUMNS,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, info, warn};

/// Keypad fed by a task reading stdin, so presses typed while the session is
/// busy queue up and can be dropped.
pub struct StdinKeypad {
    key_rx: mpsc::UnboundedReceiver<Key>,
}

impl StdinKeypad {
    pub fn new() -> Self {
        let (key_tx, key_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "Reading stdin failed");
                        break;
                    }
                };
                for c in line.chars().filter(|c| !c.is_whitespace()) {
                    match Key::from_char(c) {
                        Some(key) => {
                            if key_tx.send(key).is_err() {
                                return;
                            }
                        }
                        None => warn!(%c, "Not a keypad key"),
                    }
                }
            }
        });
        Self { key_rx }
    }
}

impl KeypadDevice for StdinKeypad {
    async fn read_key(&mut self) -> Result<Key> {
        self.key_rx
            .recv()
            .await
            .ok_or_else(|| HardwareError::disconnected("stdin"))
    }

    fn discard_pending(&mut self) -> usize {
        let mut dropped = 0;
        while self.key_rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

/// Virtual LCD echoed to stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsoleDisplay {
    screen: VirtualDisplay,
}

impl ConsoleDisplay {
    fn redraw(&self) {
        let border = "-".repeat(DISPLAY_COLUMNS);
        println!("+{border}+");
        for row in 0..2 {
            println!("|{}|", self.screen.line(row));
        }
        println!("+{border}+");
    }
}

impl CharacterDisplay for ConsoleDisplay {
    async fn clear(&mut self) -> Result<()> {
        self.screen.clear().await
    }

    async fn write_at(&mut self, row: u8, col: u8, text: &str) -> Result<()> {
        self.screen.write_at(row, col, text).await?;
        self.redraw();
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LoggedActuator {
    direction: Option<MotorDirection>,
}

impl DoorActuator for LoggedActuator {
    async fn rotate(&mut self, direction: MotorDirection, speed: u8) -> Result<()> {
        if self.direction != Some(direction) {
            info!(%direction, speed, "Door motor");
        }
        self.direction = Some(direction);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LoggedAlarm;

impl AlarmDevice for LoggedAlarm {
    async fn set_active(&mut self, active: bool) -> Result<()> {
        if active {
            warn!("Buzzer on");
        } else {
            debug!("Buzzer off");
        }
        Ok(())
    }
}
