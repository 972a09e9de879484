use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Result of completing the last word of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Every match, shown to the user when there is more than one.
    pub candidates: Vec<String>,
    /// The line with its last word extended as far as all matches agree.
    pub line: String,
}

/// Complete the last word of `line`.
///
/// A word in command position (first word, or first after `|`) completes
/// against executables in `search_path`; a word containing `/` completes
/// inside that directory; any other word completes in the current directory.
pub fn complete(line: &str, search_path: &[PathBuf]) -> Completion {
    let token_start = line
        .rfind(|c: char| c.is_whitespace())
        .map(|i| i + 1)
        .unwrap_or(0);
    let (head, token) = line.split_at(token_start);

    let mut completion = Completion {
        candidates: Vec::new(),
        line: line.to_string(),
    };
    if token.is_empty() {
        return completion;
    }

    let (dir, prefix) = match split_dir_prefix(token) {
        Some((dir, prefix)) => (Some(dir), prefix),
        None => (None, token.to_string()),
    };
    let matches = match &dir {
        Some(dir) => list_dir_matches(dir, &prefix),
        None if in_command_position(head) => list_path_commands(&prefix, search_path),
        None => list_dir_matches(".", &prefix),
    }
    .unwrap_or_default();

    if matches.is_empty() {
        return completion;
    }

    let mut word = common_prefix(&matches);
    if matches.len() == 1 && !word.ends_with('/') {
        word.push(' ');
    }
    if word.len() > prefix.len() {
        let full = match &dir {
            Some(dir) if dir.ends_with('/') => format!("{}{}", dir, word),
            Some(dir) => format!("{}/{}", dir, word),
            None => word,
        };
        completion.line = format!("{}{}", head, full);
    }
    if matches.len() > 1 {
        completion.candidates = matches;
    }
    completion
}

fn in_command_position(head: &str) -> bool {
    match head.split_whitespace().last() {
        None => true,
        Some(word) => word == "|",
    }
}

pub fn split_dir_prefix(path: &str) -> Option<(String, String)> {
    let idx = path.rfind('/')?;
    let dir = if idx == 0 {
        "/".to_string()
    } else {
        path[..idx].to_string()
    };
    Some((dir, path[idx + 1..].to_string()))
}

fn visible(name: &str, prefix: &str) -> bool {
    name.starts_with(prefix) && (prefix.starts_with('.') || !name.starts_with('.'))
}

pub fn list_dir_matches(dir: impl AsRef<Path>, prefix: &str) -> io::Result<Vec<String>> {
    let mut matches = Vec::new();
    for entry in fs::read_dir(dir)?.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if !visible(&name, prefix) {
            continue;
        }
        if entry.path().is_dir() {
            matches.push(format!("{}/", name));
        } else {
            matches.push(name);
        }
    }
    matches.sort();
    Ok(matches)
}

pub fn list_path_commands(prefix: &str, search_path: &[PathBuf]) -> io::Result<Vec<String>> {
    let mut matches = Vec::new();
    for dir in search_path {
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !visible(&name, prefix) {
                continue;
            }
            if let Ok(meta) = entry.metadata() {
                if meta.is_file() && is_executable(&meta) {
                    matches.push(name);
                }
            }
        }
    }
    matches.sort();
    matches.dedup();
    Ok(matches)
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    true
}

pub fn common_prefix(strings: &[String]) -> String {
    let Some(first) = strings.first() else {
        return String::new();
    };
    let mut prefix_len = first.chars().count();
    for s in &strings[1..] {
        prefix_len = prefix_len.min(
            first
                .chars()
                .zip(s.chars())
                .take_while(|(a, b)| a == b)
                .count(),
        );
    }
    first.chars().take(prefix_len).collect()
}
