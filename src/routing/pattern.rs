//! Route template compilation.
//!
//! # Responsibilities
//! - Tokenize templates into literal, `:name` and `*name` parts
//! - List parameter names in order of appearance
//! - Compile templates into anchored regular expressions
//!
//! # Design Decisions
//! - A token runs from its sigil to the next `/` (or the end of the template)
//! - Parameter extraction and compilation share one tokenizer, so name order
//!   always equals capture-group order
//! - Literal text is escaped with `regex::escape`
//! - The empty template matches exactly `/`

use regex::Regex;

use crate::error::RouteError;

/// Capture group for a single path segment.
const SEGMENT_GROUP: &str = "([^/]+)";

/// Capture group for the remainder of a path, slashes included.
const CATCH_ALL_GROUP: &str = "(.*)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Literal(&'a str),
    Param(&'a str),
    CatchAll(&'a str),
}

fn tokenize(template: &str) -> Vec<Token<'_>> {
    let bytes = template.as_bytes();
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let sigil = bytes[i];
        if sigil != b':' && sigil != b'*' {
            i += 1;
            continue;
        }

        let name_start = i + 1;
        let name_end = template[name_start..]
            .find('/')
            .map_or(template.len(), |offset| name_start + offset);

        // A bare sigil stays literal.
        if name_end == name_start {
            i += 1;
            continue;
        }

        if literal_start < i {
            tokens.push(Token::Literal(&template[literal_start..i]));
        }
        let name = &template[name_start..name_end];
        tokens.push(if sigil == b':' {
            Token::Param(name)
        } else {
            Token::CatchAll(name)
        });

        i = name_end;
        literal_start = name_end;
    }

    if literal_start < template.len() {
        tokens.push(Token::Literal(&template[literal_start..]));
    }
    tokens
}

/// Returns the parameter names of `template` in the order they occur.
///
/// `"users/:id/posts/:postId"` yields `["id", "postId"]`.
pub fn extract_params(template: &str) -> Vec<String> {
    tokenize(template)
        .into_iter()
        .filter_map(|token| match token {
            Token::Param(name) | Token::CatchAll(name) => Some(name.to_string()),
            Token::Literal(_) => None,
        })
        .collect()
}

/// Builds the anchored regex source for `template`.
fn regex_source(template: &str) -> String {
    let normalized = if template.is_empty() {
        "/".to_string()
    } else if template.starts_with('/') {
        template.to_string()
    } else {
        format!("/{template}")
    };

    let mut source = String::with_capacity(normalized.len() + 8);
    source.push('^');
    for token in tokenize(&normalized) {
        match token {
            Token::Literal(text) => source.push_str(&regex::escape(text)),
            Token::Param(_) => source.push_str(SEGMENT_GROUP),
            Token::CatchAll(_) => source.push_str(CATCH_ALL_GROUP),
        }
    }
    source.push('$');
    source
}

/// Compiles `template` into a matchable path pattern.
pub fn compile(template: &str) -> Result<PathPattern, RouteError> {
    let source = regex_source(template);
    let regex = Regex::new(&source).map_err(|source| RouteError::InvalidTemplate {
        template: template.to_string(),
        source,
    })?;

    Ok(PathPattern {
        template: template.to_string(),
        params: extract_params(template),
        regex,
    })
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    params: Vec<String>,
    regex: Regex,
}

impl PathPattern {
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names, in capture-group order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.regex.as_str() == other.regex.as_str() && self.params == other.params
    }
}

impl Eq for PathPattern {}
