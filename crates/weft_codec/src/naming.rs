//! Property naming strategies.
//!
//! A strategy maps a declared identifier to its wire name. The registry
//! applies it once per property while building, never per call, since
//! strategies are not required to be idempotent.

use std::sync::Arc;

/// Maps a declared property name to a wire name.
pub trait NamingStrategy: Send + Sync + 'static {
    fn translate(&self, name: &str) -> String;
}

impl<F> NamingStrategy for F
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    #[inline]
    fn translate(&self, name: &str) -> String {
        self(name)
    }
}

/// Names of the builtin strategies.
pub mod names {
    pub const IDENTITY: &str = "IDENTITY";
    pub const SNAKE_CASE: &str = "SNAKE_CASE";
    pub const UPPER_SNAKE_CASE: &str = "UPPER_SNAKE_CASE";
    pub const KEBAB_CASE: &str = "KEBAB_CASE";
    pub const LOWER_CAMEL_CASE: &str = "LOWER_CAMEL_CASE";
    pub const UPPER_CAMEL_CASE: &str = "UPPER_CAMEL_CASE";
    pub const LOWER_CASE: &str = "LOWER_CASE";
    pub const LOWER_DOT_CASE: &str = "LOWER_DOT_CASE";
}

/// Splits an identifier in any common case convention into lowercase words.
///
/// `firstName`, `first_name` and `FirstName` all give `["first", "name"]`;
/// acronyms stay together, `HTTPServer` gives `["http", "server"]`.
pub fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '_' | '-' | '.' | ' ') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lower_camel(name: &str) -> String {
    let words = split_words(name);
    let mut out = String::with_capacity(name.len());
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            out.push_str(word);
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

fn upper_camel(name: &str) -> String {
    split_words(name).iter().map(|word| capitalize(word)).collect()
}

fn entry(
    name: &'static str,
    strategy: impl NamingStrategy,
) -> (&'static str, Arc<dyn NamingStrategy>) {
    (name, Arc::new(strategy))
}

/// The builtin strategies, by name.
pub(crate) fn builtins() -> Vec<(&'static str, Arc<dyn NamingStrategy>)> {
    vec![
        entry(names::IDENTITY, |name: &str| name.to_owned()),
        entry(names::SNAKE_CASE, |name: &str| split_words(name).join("_")),
        entry(names::UPPER_SNAKE_CASE, |name: &str| {
            split_words(name).join("_").to_uppercase()
        }),
        entry(names::KEBAB_CASE, |name: &str| split_words(name).join("-")),
        entry(names::LOWER_CAMEL_CASE, lower_camel),
        entry(names::UPPER_CAMEL_CASE, upper_camel),
        entry(names::LOWER_CASE, |name: &str| split_words(name).concat()),
        entry(names::LOWER_DOT_CASE, |name: &str| split_words(name).join(".")),
    ]
}

// -----------------------------------------------------------------------------
// Tests
