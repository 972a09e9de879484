use std::fmt;

/// How an output redirection opens its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Truncate,
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRedirect {
    pub path: String,
    pub mode: OutputMode,
}

/// One pipeline stage.
///
/// An empty `name` marks a no-op line; such a command never carries
/// arguments or redirections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
    pub redirect_in: Option<String>,
    pub redirect_out: Option<OutputRedirect>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn push_arg(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    pub fn redirect_out_truncate(&self) -> Option<&str> {
        match &self.redirect_out {
            Some(r) if r.mode == OutputMode::Truncate => Some(&r.path),
            _ => None,
        }
    }

    pub fn redirect_out_append(&self) -> Option<&str> {
        match &self.redirect_out {
            Some(r) if r.mode == OutputMode::Append => Some(&r.path),
            _ => None,
        }
    }
}

/// The parsed form of one input line: stages joined by `|`, left to right.
///
/// `background` and `auto_complete` are detected once on the whole line and
/// apply to the pipeline as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Command>,
    pub background: bool,
    pub auto_complete: bool,
}

impl Pipeline {
    pub fn empty() -> Self {
        Self {
            stages: vec![Command::default()],
            background: false,
            auto_complete: false,
        }
    }

    /// First stage; a pipeline always has at least one.
    pub fn head(&self) -> &Command {
        &self.stages[0]
    }

    pub fn is_empty(&self) -> bool {
        self.head().is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.stages.iter()
    }
}

impl<'a> IntoIterator for &'a Pipeline {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.iter()
    }
}

/// Arguments the tokenizer would otherwise read as syntax get quoted.
fn needs_quotes(arg: &str) -> bool {
    arg == "|"
        || arg.starts_with(['<', '>', '"', '\''])
        || arg.ends_with(['&', '?'])
}

/// Write `word` after `lead`, quoting it when needed.
fn write_word(f: &mut fmt::Formatter<'_>, lead: &str, word: &str) -> fmt::Result {
    if needs_quotes(word) {
        write!(f, "{}\"{}\"", lead, word)
    } else {
        write!(f, "{}{}", lead, word)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_word(f, "", &self.name)?;
        for arg in &self.args {
            write_word(f, " ", arg)?;
        }
        if let Some(path) = &self.redirect_in {
            write_word(f, " <", path)?;
        }
        if let Some(path) = self.redirect_out_truncate() {
            write_word(f, " >", path)?;
        }
        if let Some(path) = self.redirect_out_append() {
            write_word(f, " >>", path)?;
        }
        Ok(())
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", stage)?;
        }
        if self.background {
            f.write_str(" &")?;
        }
        if self.auto_complete {
            f.write_str("?")?;
        }
        Ok(())
    }
}
