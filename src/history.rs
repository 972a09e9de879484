/// One-slot line history: the last submitted line, recalled with the up arrow.
#[derive(Debug, Default)]
pub struct History {
    previous: Option<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites whatever was remembered before.
    pub fn add(&mut self, line: String) {
        self.previous = Some(line);
    }

    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_slot() {
        let mut history = History::new();
        assert_eq!(history.previous(), None);
        history.add("ls".into());
        history.add("pwd".into());
        assert_eq!(history.previous(), Some("pwd"));
    }
}
