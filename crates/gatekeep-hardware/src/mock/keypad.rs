//! Mock keypad implementation for testing and development.

use crate::{HardwareError, Result, traits::KeypadDevice, types::Key};
use tokio::sync::mpsc;

/// Keypad fed from a channel.
///
/// # Example
///
/// ```
/// use gatekeep_hardware::{Key, KeypadDevice, mock::MockKeypad};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (mut keypad, handle) = MockKeypad::new();
/// handle.press(Key::Plus).await.unwrap();
/// assert_eq!(keypad.read_key().await.unwrap(), Key::Plus);
/// # }
/// ```
#[derive(Debug)]
pub struct MockKeypad {
    key_rx: mpsc::Receiver<Key>,
}

impl MockKeypad {
    pub fn new() -> (Self, MockKeypadHandle) {
        let (key_tx, key_rx) = mpsc::channel(32);
        (Self { key_rx }, MockKeypadHandle { key_tx })
    }
}

impl KeypadDevice for MockKeypad {
    async fn read_key(&mut self) -> Result<Key> {
        self.key_rx
            .recv()
            .await
            .ok_or_else(|| HardwareError::disconnected("Keypad input channel closed"))
    }

    fn discard_pending(&mut self) -> usize {
        let mut dropped = 0;
        while self.key_rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

/// Handle for pressing keys on a [`MockKeypad`].
#[derive(Debug, Clone)]
pub struct MockKeypadHandle {
    key_tx: mpsc::Sender<Key>,
}

impl MockKeypadHandle {
    pub async fn press(&self, key: Key) -> Result<()> {
        self.key_tx
            .send(key)
            .await
            .map_err(|_| HardwareError::disconnected("Keypad input channel closed"))
    }

    /// Press one digit key per element.
    pub async fn press_digits(&self, digits: &[u8]) -> Result<()> {
        for &digit in digits {
            self.press(Key::digit(digit)?).await?;
        }
        Ok(())
    }

    /// Type a full credential entry: the digits followed by `=`.
    pub async fn enter_credential(&self, digits: &[u8]) -> Result<()> {
        self.press_digits(digits).await?;
        self.press(Key::Equals).await
    }

    /// Press the keys printed as `keys`, skipping characters not on the keypad.
    pub async fn type_str(&self, keys: &str) -> Result<()> {
        for key in keys.chars().filter_map(Key::from_char) {
            self.press(key).await?;
        }
        Ok(())
    }
}
