use std::io::{self, BufRead, IsTerminal, Read, Write};

use crossterm::{cursor, execute, style::Print};

use super::keys::{Key, KeyDecoder};
use super::raw_mode::RawModeGuard;
use crate::history::History;

/// Appended to the line when Tab submits it for completion.
pub const AUTO_COMPLETE_MARKER: u8 = b'?';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C: the line was thrown away, prompt again.
    Interrupted,
    EndOfInput,
}

pub struct LineEditor {
    buffer: Vec<u8>,
    max_line: usize,
    decoder: KeyDecoder,
}

impl LineEditor {
    pub fn new(max_line: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(max_line),
            max_line,
            decoder: KeyDecoder::new(),
        }
    }

    /// Prompt and read one line from the terminal.
    ///
    /// `initial` is pre-filled into the line as if typed. When stdin is not
    /// a terminal the line is read as-is, without prompt or editing.
    pub fn read_line(
        &mut self,
        prompt: &str,
        history: &mut History,
        initial: &str,
    ) -> io::Result<ReadOutcome> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return self.read_plain(stdin.lock(), history);
        }

        let _guard = RawModeGuard::enter()?;
        let mut stdout = io::stdout();
        execute!(stdout, Print(prompt))?;
        self.edit(stdin.lock(), &mut stdout, history, initial)
    }

    /// Run the editing loop over raw bytes, echoing to `out`.
    pub fn edit<R: Read, W: Write>(
        &mut self,
        input: R,
        out: &mut W,
        history: &mut History,
        initial: &str,
    ) -> io::Result<ReadOutcome> {
        self.buffer.clear();
        self.decoder = KeyDecoder::new();
        if !initial.is_empty() {
            self.replace_line(out, initial.as_bytes())?;
        }

        for byte in input.bytes() {
            let Some(key) = self.decoder.feed(byte?) else {
                continue;
            };
            match key {
                Key::Char(c) => {
                    self.buffer.push(c);
                    out.write_all(&[c])?;
                    out.flush()?;
                    if self.buffer.len() >= self.max_line - 1 {
                        return self.submit(out, history);
                    }
                }
                Key::Backspace => {
                    if self.erase_last() {
                        execute!(out, cursor::MoveLeft(1), Print(' '), cursor::MoveLeft(1))?;
                    }
                }
                Key::RecallPrevious => {
                    if let Some(previous) = history.previous() {
                        let previous = previous.as_bytes().to_vec();
                        self.replace_line(out, &previous)?;
                    }
                }
                Key::Tab => {
                    self.buffer.push(AUTO_COMPLETE_MARKER);
                    return self.submit(out, history);
                }
                Key::Enter => return self.submit(out, history),
                Key::Interrupt => {
                    self.buffer.clear();
                    execute!(out, Print("^C\r\n"))?;
                    return Ok(ReadOutcome::Interrupted);
                }
                Key::EndOfInput => {
                    self.buffer.clear();
                    execute!(out, Print("\r\n"))?;
                    return Ok(ReadOutcome::EndOfInput);
                }
            }
        }

        Ok(ReadOutcome::EndOfInput)
    }

    fn read_plain<R: BufRead>(
        &mut self,
        mut input: R,
        history: &mut History,
    ) -> io::Result<ReadOutcome> {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(ReadOutcome::EndOfInput);
        }
        let text = line.trim_end_matches(['\n', '\r']).to_string();
        history.add(text.clone());
        Ok(ReadOutcome::Line(text))
    }

    fn submit<W: Write>(&mut self, out: &mut W, history: &mut History) -> io::Result<ReadOutcome> {
        execute!(out, Print("\r\n"))?;
        let text = String::from_utf8_lossy(&self.buffer).into_owned();
        history.add(text.clone());
        Ok(ReadOutcome::Line(text))
    }

    /// Remove the last character, all of its UTF-8 bytes.
    fn erase_last(&mut self) -> bool {
        let mut erased = false;
        while let Some(byte) = self.buffer.pop() {
            erased = true;
            if byte & 0xC0 != 0x80 {
                break;
            }
        }
        erased
    }

    fn visible_len(&self) -> usize {
        String::from_utf8_lossy(&self.buffer).chars().count()
    }

    fn replace_line<W: Write>(&mut self, out: &mut W, line: &[u8]) -> io::Result<()> {
        for _ in 0..self.visible_len() {
            execute!(out, cursor::MoveLeft(1), Print(' '), cursor::MoveLeft(1))?;
        }
        self.buffer.clear();
        let keep = line.len().min(self.max_line - 1);
        self.buffer.extend_from_slice(&line[..keep]);
        out.write_all(&self.buffer)?;
        out.flush()
    }
}
