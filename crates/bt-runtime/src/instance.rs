//! Line-oriented instance definitions.
//!
//! ```text
//! # comment
//! ParameterInstance: Robot {r1}
//! PredicateInstance: holding(agent = r1, myObject = box1, isNegated = false)
//! ActionInstance: PickUp(client : r1, obj : box1)
//! ```

use bt_core::{CallExpr, PredicateTemplate};

use crate::error::LoadError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceLine {
    Parameter { type_name: String, name: String },
    Predicate(PredicateTemplate),
    Action { action_type: String, args: Vec<(String, String)> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// 1-based line number in the source text.
    pub line: usize,
    pub instance: InstanceLine,
}

const PARAMETER: &str = "ParameterInstance:";
const PREDICATE: &str = "PredicateInstance:";
const ACTION: &str = "ActionInstance:";

/// Parses one line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(text: &str) -> Result<Option<InstanceLine>, String> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }

    if let Some(rest) = text.strip_prefix(PARAMETER) {
        return parse_parameter(rest).map(Some);
    }
    if text.starts_with(PREDICATE) {
        return PredicateTemplate::parse(text)
            .map(|t| Some(InstanceLine::Predicate(t)))
            .map_err(|e| e.to_string());
    }
    if let Some(rest) = text.strip_prefix(ACTION) {
        let call = CallExpr::parse(rest, ':').map_err(|e| e.to_string())?;
        return Ok(Some(InstanceLine::Action {
            action_type: call.name,
            args: call.args,
        }));
    }

    Err(format!("unrecognised instance line '{text}'"))
}

fn parse_parameter(rest: &str) -> Result<InstanceLine, String> {
    let rest = rest.trim();
    let (type_name, tail) = rest
        .split_once('{')
        .ok_or_else(|| format!("expected '{{name}}' in '{rest}'"))?;
    let name = tail
        .strip_suffix('}')
        .ok_or_else(|| format!("expected closing '}}' in '{rest}'"))?
        .trim();
    let type_name = type_name.trim();
    if type_name.is_empty() || name.is_empty() {
        return Err(format!("expected '<type> {{<name>}}', got '{rest}'"));
    }
    Ok(InstanceLine::Parameter {
        type_name: type_name.to_string(),
        name: name.to_string(),
    })
}

pub fn parse_document(text: &str) -> Result<Vec<ParsedLine>, LoadError> {
    let mut parsed = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        match parse_line(raw) {
            Ok(Some(instance)) => parsed.push(ParsedLine { line, instance }),
            Ok(None) => {}
            Err(message) => return Err(LoadError::Parse { line, message }),
        }
    }
    Ok(parsed)
}
