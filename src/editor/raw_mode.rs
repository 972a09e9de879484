use std::io;
use std::sync::Once;

use crossterm::terminal;

static RESTORE_ON_PANIC: Once = Once::new();

/// Raw terminal mode (no line buffering, no echo) for as long as the guard
/// lives.
///
/// Dropping the guard restores cooked mode, so every way out of the line
/// reader releases the terminal: submit, Ctrl-D and errors alike. A guard
/// taken while raw mode is already on leaves it on when dropped.
pub struct RawModeGuard {
    restore: bool,
}

impl RawModeGuard {
    pub fn enter() -> io::Result<Self> {
        RESTORE_ON_PANIC.call_once(|| {
            let prev = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                let _ = terminal::disable_raw_mode();
                prev(info);
            }));
        });

        if terminal::is_raw_mode_enabled()? {
            return Ok(Self { restore: false });
        }
        terminal::enable_raw_mode()?;
        Ok(Self { restore: true })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.restore {
            let _ = terminal::disable_raw_mode();
        }
    }
}
