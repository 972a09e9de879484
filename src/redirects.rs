use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use crate::command::{Command, OutputMode};
use crate::error::{Result, ShellError};

/// Files a stage reads from or writes to instead of its pipe ends.
///
/// Opened in the shell before forking; the parent drops them once the
/// stage's child exists.
#[derive(Debug, Default)]
pub struct Redirections {
    pub stdin: Option<File>,
    pub stdout: Option<File>,
}

impl Redirections {
    pub fn open(cmd: &Command) -> Result<Self> {
        let mut redirections = Self::default();

        if let Some(path) = &cmd.redirect_in {
            let file = File::open(path).map_err(|source| ShellError::Redirect {
                path: PathBuf::from(path),
                source,
            })?;
            redirections.stdin = Some(file);
        }

        if let Some(out) = &cmd.redirect_out {
            let mut options = OpenOptions::new();
            options.create(true);
            match out.mode {
                OutputMode::Truncate => options.write(true).truncate(true),
                OutputMode::Append => options.append(true),
            };
            let file = options.open(&out.path).map_err(|source| ShellError::Redirect {
                path: PathBuf::from(&out.path),
                source,
            })?;
            redirections.stdout = Some(file);
        }

        Ok(redirections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::fs;
    use std::io::Write;

    #[test]
    fn test_opens_nothing_without_redirects() {
        let pipeline = parse("ls -l").unwrap();
        let redirections = Redirections::open(pipeline.head()).unwrap();
        assert!(redirections.stdin.is_none());
        assert!(redirections.stdout.is_none());
    }

    #[test]
    fn test_truncate_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "old contents\n").unwrap();

        let pipeline = parse(&format!("cmd >{}", path.display())).unwrap();
        let mut out = Redirections::open(pipeline.head()).unwrap().stdout.unwrap();
        out.write_all(b"one\n").unwrap();
        drop(out);
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\n");

        let pipeline = parse(&format!("cmd >>{}", path.display())).unwrap();
        let mut out = Redirections::open(pipeline.head()).unwrap().stdout.unwrap();
        out.write_all(b"two\n").unwrap();
        drop(out);
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_missing_input_names_the_path() {
        let pipeline = parse("sort </no/such/input.txt").unwrap();
        let err = Redirections::open(pipeline.head()).unwrap_err();
        match err {
            ShellError::Redirect { path, .. } => {
                assert_eq!(path, PathBuf::from("/no/such/input.txt"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
