use std::fmt::Display;
use std::io::{self, Write};

use colored::Colorize;
use log::{debug, info};
use nix::sys::signal::{signal, SigHandler, Signal};

use crate::builtins::Builtin;
use crate::config::Config;
use crate::editor::{complete, LineEditor, ReadOutcome, AUTO_COMPLETE_MARKER};
use crate::executor::{ExitStatus, Executor};
use crate::history::History;
use crate::parser;
use crate::prompt::Prompt;

pub struct Shell {
    config: Config,
    prompt: Prompt,
    history: History,
    editor: LineEditor,
    executor: Executor,
    /// Text pre-filled into the next prompt, left by completion.
    pending: String,
    running: bool,
}

impl Shell {
    pub fn new(config: Config) -> Self {
        Self {
            prompt: Prompt::new(&config.user, &config.shell_name),
            history: History::new(),
            editor: LineEditor::new(config.max_line),
            executor: Executor::new(&config.shell_name, config.search_path.clone()),
            pending: String::new(),
            running: true,
            config,
        }
    }

    /// The read-eval loop. Returns when `exit` is entered or input ends.
    pub fn run(&mut self) {
        // Ctrl+C belongs to the foreground children, not the shell
        // SAFETY: installs SIG_IGN, no handler code runs
        unsafe {
            let _ = signal(Signal::SIGINT, SigHandler::SigIgn);
        }

        while self.running {
            self.executor.reap_background();

            let prompt = self.prompt.get_string();
            let initial = std::mem::take(&mut self.pending);
            match self.editor.read_line(&prompt, &mut self.history, &initial) {
                Ok(ReadOutcome::Line(line)) => {
                    self.eval(&line);
                }
                Ok(ReadOutcome::Interrupted) => continue,
                Ok(ReadOutcome::EndOfInput) => break,
                Err(e) => {
                    self.report("input", &e);
                    break;
                }
            }
        }

        self.executor.reap_background();
        let running = self.executor.background_jobs();
        if running > 0 {
            info!("leaving {} background jobs running", running);
        }
        info!("shell exiting");
    }

    /// Parse and run one line.
    pub fn eval(&mut self, line: &str) -> ExitStatus {
        // an unfinished line still goes back to the prompt
        if parser::is_auto_complete(line) {
            self.complete(line);
            return ExitStatus::Success;
        }

        let pipeline = match parser::parse(line) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                self.report("syntax", &e);
                return ExitStatus::Success;
            }
        };
        debug!("pipeline: {}", pipeline);

        let context = pipeline.head().name.clone();
        let result = match Builtin::detect(&pipeline) {
            Some(builtin) => builtin.run(),
            None => self.executor.execute(&pipeline),
        };

        match result {
            Ok(ExitStatus::RequestExit) => {
                self.running = false;
                ExitStatus::RequestExit
            }
            Ok(status) => status,
            Err(e) => {
                self.report(&context, &e);
                ExitStatus::Success
            }
        }
    }

    fn complete(&mut self, line: &str) {
        let text = line.trim_end_matches([' ', '\t']);
        let text = text.strip_suffix(AUTO_COMPLETE_MARKER as char).unwrap_or(text);
        let completion = complete(text, &self.config.search_path);

        if !completion.candidates.is_empty() {
            println!("{}", completion.candidates.join("    "));
        }
        self.pending = completion.line;
    }

    fn report(&self, context: &str, err: &dyn Display) {
        let message = format!("{}: {}: {}", self.config.shell_name, context, err);
        let _ = writeln!(io::stderr(), "{}", message.red());
    }
}
