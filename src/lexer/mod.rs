//! Rule-driven lexer producing the token stream the combinators consume.
//!
//! A [`Lexer`] owns an ordered list of [`Rule`]s. At every offset the rules
//! are tried in order and the first one whose regex matches *at* the offset
//! wins; ignorable rules advance the position without emitting a token.
//! Rule order is therefore part of the grammar: keywords go before the
//! identifier rule that would swallow them.

use std::fmt;

use regex::Regex;
use thiserror::Error;
use tracing::trace;

/// Token class identifier. Tag `0` is reserved for the empty token, which
/// is why `Atom(0)` never matches anything and is flagged invalid.
pub type Tag = u32;

/// Errors produced while building rules or tokenizing input.
#[derive(Debug, Error)]
pub enum LexError {
    /// No rule matched at `position`.
    #[error("unexpected lexeme at offset {position}")]
    UnexpectedLexem { position: usize },

    /// A rule pattern failed to compile.
    #[error("invalid rule pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A single lexing rule: a regex pattern, the tag its matches carry, and
/// whether matches are discarded instead of emitted.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: String,
    pub tag: Tag,
    pub ignorable: bool,
    regex: Regex,
}

impl Rule {
    /// A rule whose matches become tokens tagged `tag`.
    pub fn new(pattern: impl Into<String>, tag: Tag) -> Result<Self, LexError> {
        Self::build(pattern.into(), tag, false)
    }

    /// A rule whose matches advance the position but emit nothing
    /// (whitespace, comments).
    pub fn ignorable(pattern: impl Into<String>, tag: Tag) -> Result<Self, LexError> {
        Self::build(pattern.into(), tag, true)
    }

    fn build(pattern: String, tag: Tag, ignorable: bool) -> Result<Self, LexError> {
        let regex = Regex::new(&pattern).map_err(|source| LexError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        Ok(Self {
            pattern,
            tag,
            ignorable,
            regex,
        })
    }

    /// An ignorable rule with an empty pattern can never make progress.
    pub fn is_valid(&self) -> bool {
        !(self.pattern.is_empty() && self.ignorable)
    }

    /// The match must begin exactly at `position` and consume at least one
    /// character; anything else counts as "no match" here.
    fn find_at<'i>(&self, input: &'i str, position: usize) -> Option<&'i str> {
        self.regex
            .find_at(input, position)
            .filter(|m| m.start() == position && !m.as_str().is_empty())
            .map(|m| m.as_str())
    }
}

/// A single lexeme: the matched substring, its half-open span in the
/// source, and the tag of the rule that produced it.
///
/// `Lexem::default()` is the designated empty token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexem {
    pub content: String,
    pub start: usize,
    pub length: usize,
    pub end: usize,
    pub tag: Tag,
}

impl Lexem {
    pub fn new(content: impl Into<String>, start: usize, tag: Tag) -> Self {
        let content = content.into();
        let length = content.len();
        Self {
            start,
            length,
            end: start + length,
            tag,
            content,
        }
    }

    /// True for the designated empty token only.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.start == 0 && self.length == 0 && self.end == 0
    }
}

impl fmt::Display for Lexem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' ({}..{}, tag {})",
            self.content, self.start, self.end, self.tag
        )
    }
}

/// The token stream handed to the parser.
pub type Lexems = Vec<Lexem>;

/// Converts a source string into a token stream by repeatedly applying the
/// first matching rule.
pub struct Lexer {
    rules: Vec<Rule>,
}

impl Lexer {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Tokenize the whole input. Fails with [`LexError::UnexpectedLexem`]
    /// as soon as an offset is reached where no rule matches.
    pub fn tokenize(&self, input: &str) -> Result<Lexems, LexError> {
        let mut out = Vec::new();
        let mut position = 0;
        while position < input.len() {
            match self.find_lexem(input, position)? {
                (Some(lexem), next) => {
                    out.push(lexem);
                    position = next;
                }
                (None, next) => position = next,
            }
        }
        trace!(tokens = out.len(), "tokenized input");
        Ok(out)
    }

    fn find_lexem(
        &self,
        input: &str,
        position: usize,
    ) -> Result<(Option<Lexem>, usize), LexError> {
        for rule in &self.rules {
            if let Some(content) = rule.find_at(input, position) {
                let next = position + content.len();
                if rule.ignorable {
                    return Ok((None, next));
                }
                return Ok((Some(Lexem::new(content, position, rule.tag)), next));
            }
        }
        Err(LexError::UnexpectedLexem { position })
    }
}
