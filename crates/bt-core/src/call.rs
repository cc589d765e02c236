//! `name(key <sep> value, ...)` expressions shared by predicate templates and instance lines.

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExpr {
    pub name: String,
    pub args: Vec<(String, String)>,
}

impl CallExpr {
    /// Parses `name(k1 <sep> v1, k2 <sep> v2)`. Commas inside double quotes do not split
    /// arguments. An empty argument list is allowed.
    pub fn parse(text: &str, separator: char) -> Result<Self> {
        let text = text.trim();
        let open = text
            .find('(')
            .ok_or_else(|| CoreError::invalid(format!("expected '(' in '{text}'")))?;
        if !text.ends_with(')') {
            return Err(CoreError::invalid(format!("expected trailing ')' in '{text}'")));
        }

        let name = text[..open].trim();
        if name.is_empty() {
            return Err(CoreError::invalid(format!("missing name in '{text}'")));
        }

        let body = &text[open + 1..text.len() - 1];
        let mut args = Vec::new();
        for part in split_args(body) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once(separator).ok_or_else(|| {
                CoreError::invalid(format!("expected '{separator}' in argument '{part}'"))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CoreError::invalid(format!("missing key in argument '{part}'")));
            }
            args.push((key.to_string(), value.trim().to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            args,
        })
    }

    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v.as_str()))
    }
}

fn split_args(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}
