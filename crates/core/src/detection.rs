use serde::{Deserialize, Serialize};

/// One distinct detection label together with the engines that emitted it.
///
/// Engine order matters: the first engine decides which tokenizer suffix
/// rules apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub engines: Vec<String>,
}

impl Detection {
    pub fn new<I, S>(label: impl Into<String>, engines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            engines: engines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn first_engine(&self) -> Option<&str> {
        self.engines.first().map(String::as_str)
    }
}
