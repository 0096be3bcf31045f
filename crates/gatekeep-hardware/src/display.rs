//! Virtual 16×2 character LCD.
//!
//! The HMI node's display is a 2-row, 16-column character LCD driven by
//! cursor-positioned writes. `VirtualDisplay` keeps the character buffer in
//! memory and records every string written, so tests can check which
//! screens were shown and in which order.
//!
//! # Character Encoding - ASCII Only
//!
//! The LCD's character ROM only covers printable ASCII (0x20-0x7E). Any
//! other character is stored as `?`.
//!
//! # Examples
//!
//! ```
//! use gatekeep_hardware::{CharacterDisplay, VirtualDisplay};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut display = VirtualDisplay::new();
//! display.write_at(0, 0, "Plz Enter Pass:").await.unwrap();
//! display.write_at(1, 0, "***").await.unwrap();
//!
//! assert_eq!(display.line(0).trim_end(), "Plz Enter Pass:");
//! assert_eq!(display.line(1).trim_end(), "***");
//! # }
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    error::{HardwareError, Result},
    traits::CharacterDisplay,
};

/// Rows on the LCD.
pub const DISPLAY_ROWS: usize = 2;

/// Columns on the LCD.
pub const DISPLAY_COLUMNS: usize = 16;

#[derive(Debug)]
struct Screen {
    cells: [[char; DISPLAY_COLUMNS]; DISPLAY_ROWS],
    writes: Vec<String>,
}

/// In-memory character LCD. Clones share the same screen.
#[derive(Debug, Clone)]
pub struct VirtualDisplay {
    screen: Arc<Mutex<Screen>>,
}

impl VirtualDisplay {
    pub fn new() -> Self {
        Self {
            screen: Arc::new(Mutex::new(Screen {
                cells: [[' '; DISPLAY_COLUMNS]; DISPLAY_ROWS],
                writes: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One row, padded to full width. Out-of-range rows read as blank.
    pub fn line(&self, row: usize) -> String {
        match self.lock().cells.get(row) {
            Some(cells) => cells.iter().collect(),
            None => " ".repeat(DISPLAY_COLUMNS),
        }
    }

    /// Both rows with trailing blanks trimmed.
    pub fn lines(&self) -> [String; DISPLAY_ROWS] {
        [
            self.line(0).trim_end().to_string(),
            self.line(1).trim_end().to_string(),
        ]
    }

    /// Every string written since creation, in order.
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    /// `true` if `text` was written at some point.
    pub fn has_shown(&self, text: &str) -> bool {
        self.lock().writes.iter().any(|w| w == text)
    }
}

impl Default for VirtualDisplay {
    fn default() -> Self {
        Self::new()
    }
}

fn sanitize(c: char) -> char {
    if (' '..='~').contains(&c) { c } else { '?' }
}

impl CharacterDisplay for VirtualDisplay {
    async fn clear(&mut self) -> Result<()> {
        let mut screen = self.lock();
        for row in screen.cells.iter_mut() {
            row.fill(' ');
        }
        Ok(())
    }

    async fn write_at(&mut self, row: u8, col: u8, text: &str) -> Result<()> {
        let (row, col) = (usize::from(row), usize::from(col));
        if row >= DISPLAY_ROWS || col >= DISPLAY_COLUMNS {
            return Err(HardwareError::invalid_data(format!(
                "Cursor ({row}, {col}) outside {DISPLAY_ROWS}x{DISPLAY_COLUMNS} display"
            )));
        }

        let mut screen = self.lock();
        for (cell, c) in screen.cells[row][col..].iter_mut().zip(text.chars()) {
            *cell = sanitize(c);
        }
        screen.writes.push(text.to_string());
        Ok(())
    }
}
