//! Screens shown on the HMI's 16×2 LCD.
//!
//! Each screen is a fixed set of positioned strings. Prompt screens also
//! carry the cursor where the masked entry is echoed.

use gatekeep_hardware::{CharacterDisplay, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    EnterCredential,
    ConfirmCredential,
    EnterOldCredential,
    EnterNewCredential,
    Menu,
    Mismatch,
    Incorrect,
    Locked,
    DoorUnlocking,
    WaitForPeople,
    DoorLocking,
    LinkTimeout,
}

/// A string placed at `(row, col)`.
type Placed = (u8, u8, &'static str);

impl Screen {
    pub fn text(&self) -> &'static [Placed] {
        match self {
            Screen::EnterCredential => &[(0, 0, "Plz Enter Pass:")],
            Screen::ConfirmCredential => &[(0, 0, "Plz re-enter the"), (1, 0, "same pass: ")],
            Screen::EnterOldCredential => &[(0, 0, "Plz enter old"), (1, 0, "pass: ")],
            Screen::EnterNewCredential => &[(0, 0, "Plz Enter New"), (1, 0, "Pass: ")],
            Screen::Menu => &[(0, 0, "+ : OPEN DOOR"), (1, 0, "- : CHANGE PASS")],
            Screen::Mismatch => &[(0, 0, "Mismatch!!")],
            Screen::Incorrect => &[(0, 0, "Incorrect..")],
            Screen::Locked => &[(0, 1, "System LOCKED"), (1, 0, "Wait for 1 min.")],
            Screen::DoorUnlocking => &[(0, 1, "Door Unlocking"), (1, 3, "Please Wait")],
            Screen::WaitForPeople => &[(0, 0, "Wait for People"), (1, 3, "to Enter")],
            Screen::DoorLocking => &[(0, 2, "Door Locking")],
            Screen::LinkTimeout => &[(0, 0, "Link Timeout"), (1, 0, "Try again")],
        }
    }

    /// Where entry echo starts, for prompt screens.
    pub fn entry_cursor(&self) -> Option<(u8, u8)> {
        match self {
            Screen::EnterCredential => Some((1, 0)),
            Screen::ConfirmCredential => Some((1, 11)),
            Screen::EnterOldCredential | Screen::EnterNewCredential => Some((1, 6)),
            _ => None,
        }
    }

    /// Clear the display and draw this screen.
    pub async fn show<D: CharacterDisplay>(&self, display: &mut D) -> Result<()> {
        display.clear().await?;
        for &(row, col, text) in self.text() {
            display.write_at(row, col, text).await?;
        }
        Ok(())
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.text().first().map_or("", |&(_, _, text)| text);
        f.write_str(first)
    }
}
