use std::env;

/// Renders `user@host:cwd shellname$ `.
pub struct Prompt {
    user: String,
    host: String,
    shell_name: String,
}

impl Prompt {
    pub fn new(user: &str, shell_name: &str) -> Self {
        let host = whoami::fallible::hostname().unwrap_or_else(|_| String::from("localhost"));
        Self {
            user: user.to_string(),
            host,
            shell_name: shell_name.to_string(),
        }
    }

    pub fn get_string(&self) -> String {
        let cwd = env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| String::from("?"));

        format!("{}@{}:{} {}$ ", self.user, self.host, cwd, self.shell_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_layout() {
        let prompt = Prompt {
            user: "ada".into(),
            host: "box".into(),
            shell_name: "seashell".into(),
        };
        let text = prompt.get_string();
        assert!(text.starts_with("ada@box:"));
        assert!(text.ends_with(" seashell$ "));
    }
}
