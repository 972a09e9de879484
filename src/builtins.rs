use std::env;
use std::path::PathBuf;

use log::debug;

use crate::command::Pipeline;
use crate::error::{Result, ShellError};
use crate::executor::ExitStatus;

/// Commands the shell handles itself instead of forking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    Empty,
    Exit,
    Cd(Option<String>),
}

impl Builtin {
    /// Decided on the first stage's name; anything else goes to the
    /// executor.
    pub fn detect(pipeline: &Pipeline) -> Option<Self> {
        if pipeline.is_empty() {
            return Some(Builtin::Empty);
        }
        let head = pipeline.head();
        match head.name.as_str() {
            "exit" => Some(Builtin::Exit),
            "cd" => Some(Builtin::Cd(head.args.first().cloned())),
            _ => None,
        }
    }

    pub fn run(self) -> Result<ExitStatus> {
        match self {
            Builtin::Empty => Ok(ExitStatus::Success),
            Builtin::Exit => Ok(ExitStatus::RequestExit),
            Builtin::Cd(path) => {
                change_dir(path)?;
                Ok(ExitStatus::Success)
            }
        }
    }
}

fn change_dir(path: Option<String>) -> Result<()> {
    let target = match path {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(env::var("HOME").unwrap_or_else(|_| "/".to_string())),
    };
    debug!("cd {}", target.display());
    env::set_current_dir(&target).map_err(|source| ShellError::ChangeDir {
        path: target,
        source,
    })
}
