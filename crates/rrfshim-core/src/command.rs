//! Command line reading
//!
//! Splits a raw text command into a command name and its named parameters
//! the same way the host interpreter does. Two syntaxes are recognised:
//! - traditional: `M106 S128 T2` (name is a letter followed by a number,
//!   each parameter is a letter immediately followed by its value)
//! - extended: `KTC_TOOL_SET_TEMPERATURE T=1 ACTV_TMP=210`

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::CommandLineError;

/// Parameters supplied to a single command invocation
///
/// Names are stored upper-cased so lookups are case-insensitive. Values are
/// raw text and never interpreted. Insertion order is kept for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationContext {
    params: Vec<(String, String)>,
}

impl InvocationContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from name/value pairs; later duplicates win
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut ctx = Self::new();
        for (name, value) in pairs {
            ctx.insert(name.as_ref(), value);
        }
        ctx
    }

    /// Set a parameter, replacing any earlier value under the same name
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_uppercase();
        let value = value.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.params.push((name, value)),
        }
    }

    /// Look up a parameter value by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the parameter was supplied at all (an empty value counts)
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of supplied parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether no parameters were supplied
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Which of the host's two syntaxes a line was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandSyntax {
    /// `M106 S128 T2`
    Traditional,
    /// `NAME KEY=VALUE`
    Extended,
}

/// A parsed text command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLine {
    /// Upper-cased command name
    pub name: String,
    /// Supplied parameters
    pub params: InvocationContext,
    /// Syntax the line was written in
    pub syntax: CommandSyntax,
}

fn traditional_name() -> &'static Regex {
    static TRADITIONAL_NAME: OnceLock<Regex> = OnceLock::new();
    TRADITIONAL_NAME
        .get_or_init(|| Regex::new(r"^[A-Z][0-9]+(\.[0-9]+)?$").expect("invalid regex pattern"))
}

impl CommandLine {
    /// Parse one line of text
    ///
    /// Returns `Ok(None)` for blank and comment-only lines.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandLineError> {
        let cleaned = strip_comment(line).trim();
        if cleaned.is_empty() {
            return Ok(None);
        }

        let mut tokens = tokenize(cleaned).map_err(|_| CommandLineError::UnterminatedQuote {
            command: cleaned
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_ascii_uppercase(),
        })?;
        let name = tokens.remove(0).to_ascii_uppercase();
        if name.contains('=') {
            return Err(CommandLineError::MissingName {
                line: cleaned.to_string(),
            });
        }

        let syntax = if traditional_name().is_match(&name) {
            CommandSyntax::Traditional
        } else {
            CommandSyntax::Extended
        };

        let mut params = InvocationContext::new();
        for token in tokens {
            let (key, value) = match syntax {
                CommandSyntax::Traditional => split_traditional(&token),
                CommandSyntax::Extended => split_extended(&token),
            }
            .ok_or_else(|| CommandLineError::MalformedParameter {
                command: name.clone(),
                token: token.clone(),
            })?;
            params.insert(key, unquote(value));
        }

        Ok(Some(Self {
            name,
            params,
            syntax,
        }))
    }

    /// Canonical text form of the command
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (name, value) in self.params.iter() {
            match self.syntax {
                CommandSyntax::Traditional => write!(f, " {}{}", name, value)?,
                CommandSyntax::Extended => write!(f, " {}={}", name, quote_if_needed(value))?,
            }
        }
        Ok(())
    }
}

/// Remove a trailing `;` comment
fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Split on whitespace outside double quotes
fn tokenize(text: &str) -> Result<Vec<String>, ()> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in text.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err(());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

/// `S128` → (`S`, `128`); `S` → (`S`, ``); `S=128` is tolerated
fn split_traditional(token: &str) -> Option<(&str, &str)> {
    let first = token.chars().next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    let (key, rest) = token.split_at(first.len_utf8());
    Some((key, rest.strip_prefix('=').unwrap_or(rest)))
}

/// `KEY=VALUE` → (`KEY`, `VALUE`)
fn split_extended(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once('=')?;
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

/// Quote a value that would otherwise be split by the host
pub(crate) fn quote_if_needed(value: &str) -> String {
    if value.chars().any(char::is_whitespace) {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}
