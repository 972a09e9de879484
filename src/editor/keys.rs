const TAB: u8 = 9;
const BACKSPACE: u8 = 8;
const DELETE: u8 = 127;
const ESCAPE: u8 = 27;
const CTRL_C: u8 = 3;
const CTRL_D: u8 = 4;

/// What a byte (or byte sequence) from the terminal means to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(u8),
    Enter,
    Tab,
    Backspace,
    RecallPrevious,
    Interrupt,
    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Idle,
    EscapeSeen,
    BracketSeen,
}

/// Turns raw terminal bytes into keys.
///
/// Escape sequences are tracked as `Idle -> EscapeSeen -> BracketSeen`.
/// Only `ESC [ A` (up arrow) means something; any other byte in the middle
/// of a sequence is swallowed and the decoder goes back to idle. Another
/// `ESC` restarts the sequence.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    state: State,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match (self.state, byte) {
            // a fresh ESC always starts a new sequence
            (_, ESCAPE) => {
                self.state = State::EscapeSeen;
                None
            }
            (State::Idle, _) => plain_key(byte),
            (State::EscapeSeen, b'[') => {
                self.state = State::BracketSeen;
                None
            }
            (State::BracketSeen, b'A') => {
                self.state = State::Idle;
                Some(Key::RecallPrevious)
            }
            (State::EscapeSeen | State::BracketSeen, _) => {
                self.state = State::Idle;
                None
            }
        }
    }
}

fn plain_key(byte: u8) -> Option<Key> {
    match byte {
        b'\n' | b'\r' => Some(Key::Enter),
        TAB => Some(Key::Tab),
        DELETE | BACKSPACE => Some(Key::Backspace),
        CTRL_C => Some(Key::Interrupt),
        CTRL_D => Some(Key::EndOfInput),
        // printable ASCII and any byte of a UTF-8 sequence
        0x20..=0x7e | 0x80..=0xff => Some(Key::Char(byte)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Vec<Key> {
        let mut decoder = KeyDecoder::new();
        bytes.iter().filter_map(|b| decoder.feed(*b)).collect()
    }

    #[test]
    fn test_plain_bytes() {
        assert_eq!(
            decode(b"a\t\x7f\n"),
            [Key::Char(b'a'), Key::Tab, Key::Backspace, Key::Enter]
        );
        assert_eq!(decode(b"\r\x04\x03"), [Key::Enter, Key::EndOfInput, Key::Interrupt]);
    }

    #[test]
    fn test_up_arrow() {
        assert_eq!(decode(b"\x1b[Ax"), [Key::RecallPrevious, Key::Char(b'x')]);
    }

    #[test]
    fn test_other_sequences_are_swallowed() {
        // down arrow, then ESC followed by a plain letter
        assert_eq!(decode(b"\x1b[B\x1bqz"), [Key::Char(b'z')]);
    }

    #[test]
    fn test_repeated_escape_restarts_sequence() {
        assert_eq!(decode(b"\x1b\x1b[A"), [Key::RecallPrevious]);
        assert_eq!(decode(b"\x1b[\x1b[Ab"), [Key::RecallPrevious, Key::Char(b'b')]);
    }

    #[test]
    fn test_recall_resets_state() {
        assert_eq!(decode(b"\x1b[AA"), [Key::RecallPrevious, Key::Char(b'A')]);
    }

    #[test]
    fn test_ignores_other_controls() {
        assert_eq!(decode(b"\x01\x02b"), [Key::Char(b'b')]);
    }
}
