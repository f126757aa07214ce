//! Message selectors
//!
//! Every operation on a runtime value is a message send. The set of selectors
//! the runtime understands is closed; names coming from scripts that match no
//! selector are kept as `Named` so the scope call path can resolve them as
//! function names, and so receivers can report them in `MessageNotFound`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Add,
    Sub,
    Mul,
    Div,
    Compare,
    Neg,
    And,
    Or,
    IsEmpty,
    /// Rewritten to `IsEmpty` + `Neg` before dispatch
    IsNotEmpty,
    Iterate,
    Get,
    Set,
    Has,
    Call,
    Length,
    ToUpper,
    ToLower,
    Start,
    End,
    Date,
    Named(String),
}

impl Selector {
    /// Resolve a script-level message name.
    ///
    /// The generic tree spells internal selectors with a leading underscore
    /// (`_isEmpty`), user-facing methods without (`toUpper`); both are accepted.
    pub fn from_name(name: &str) -> Selector {
        match name.strip_prefix('_').unwrap_or(name) {
            "add" => Selector::Add,
            "sub" => Selector::Sub,
            "mul" => Selector::Mul,
            "div" => Selector::Div,
            "compare" => Selector::Compare,
            "neg" => Selector::Neg,
            "and" => Selector::And,
            "or" => Selector::Or,
            "isEmpty" => Selector::IsEmpty,
            "isNotEmpty" => Selector::IsNotEmpty,
            "iterate" => Selector::Iterate,
            "get" => Selector::Get,
            "set" => Selector::Set,
            "has" => Selector::Has,
            "call" => Selector::Call,
            "length" => Selector::Length,
            "toUpper" => Selector::ToUpper,
            "toLower" => Selector::ToLower,
            "start" => Selector::Start,
            "end" => Selector::End,
            "date" => Selector::Date,
            _ => Selector::Named(name.to_string()),
        }
    }

    /// Selector for an arithmetic operator token
    pub fn arithmetic(operator: &str) -> Option<Selector> {
        match operator {
            "+" => Some(Selector::Add),
            "-" => Some(Selector::Sub),
            "*" => Some(Selector::Mul),
            "/" => Some(Selector::Div),
            _ => None,
        }
    }

    /// Selector for a logical operator token
    pub fn logical(operator: &str) -> Option<Selector> {
        match operator {
            "and" | "&&" => Some(Selector::And),
            "or" | "||" => Some(Selector::Or),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Selector::Add => "add",
            Selector::Sub => "sub",
            Selector::Mul => "mul",
            Selector::Div => "div",
            Selector::Compare => "compare",
            Selector::Neg => "neg",
            Selector::And => "and",
            Selector::Or => "or",
            Selector::IsEmpty => "isEmpty",
            Selector::IsNotEmpty => "isNotEmpty",
            Selector::Iterate => "iterate",
            Selector::Get => "get",
            Selector::Set => "set",
            Selector::Has => "has",
            Selector::Call => "call",
            Selector::Length => "length",
            Selector::ToUpper => "toUpper",
            Selector::ToLower => "toLower",
            Selector::Start => "start",
            Selector::End => "end",
            Selector::Date => "date",
            Selector::Named(name) => name,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underscore_prefix_is_optional() {
        assert_eq!(Selector::from_name("_isEmpty"), Selector::IsEmpty);
        assert_eq!(Selector::from_name("isEmpty"), Selector::IsEmpty);
        assert_eq!(Selector::from_name("_isNotEmpty"), Selector::IsNotEmpty);
    }

    #[test]
    fn test_unknown_names_are_kept() {
        assert_eq!(
            Selector::from_name("name"),
            Selector::Named("name".to_string())
        );
        assert_eq!(Selector::from_name("today").name(), "today");
    }

    #[test]
    fn test_operator_tokens() {
        assert_eq!(Selector::arithmetic("/"), Some(Selector::Div));
        assert_eq!(Selector::arithmetic("%"), None);
        assert_eq!(Selector::logical("&&"), Some(Selector::And));
        assert_eq!(Selector::logical("xor"), None);
    }
}
