use regex::Regex;
use std::sync::LazyLock;

/// `<rank> ┃ <name>`, names optionally carrying nick (`~`) and bedrock (`!`) markers
pub const DEFAULT_CHAT_SENDER_PATTERN: &str = r"[A-Za-z\-+]+\s\x{2503}\s(~?!?[A-Za-z0-9_]{1,16})";

static DEFAULT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(DEFAULT_CHAT_SENDER_PATTERN).expect("built-in chat sender pattern is valid")
});

/// Extracts the sender name from a rendered chat line
#[derive(Debug, Clone)]
pub struct ChatSenderPattern {
    regex: Regex,
}

impl ChatSenderPattern {
    /// Custom pattern; the first capture group must be the sender name
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// First sender name in `line`, markers included
    pub fn sender<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.regex
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

impl Default for ChatSenderPattern {
    fn default() -> Self {
        Self {
            regex: DEFAULT_PATTERN.clone(),
        }
    }
}
