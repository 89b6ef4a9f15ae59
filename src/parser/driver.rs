//! Top-level entry: run a root combinator over a token stream.

use tracing::trace;

use crate::ast::{NodeRef, SyntaxTree};
use crate::lexer::Lexems;

use super::{Combinator, State};

/// Owns a root combinator and remembers the final [`State`] of the last
/// run for post-mortem inspection.
pub struct Driver<P> {
    parser: P,
    finish: State,
}

impl<P: Combinator> Driver<P> {
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            finish: State::default(),
        }
    }

    /// True iff the root accepted and consumed the whole input. Empty
    /// input is rejected without invoking the root.
    pub fn accept(&mut self, input: &Lexems, root: Option<NodeRef>) -> bool {
        self.run(input, root)
    }

    /// The constructed tree on acceptance, an empty tree otherwise.
    pub fn parse(&mut self, input: &Lexems, root: Option<NodeRef>) -> SyntaxTree {
        if self.run(input, root) {
            self.finish.tree.clone()
        } else {
            SyntaxTree::empty()
        }
    }

    /// The final state of the last run: position reached, verdict, and
    /// the (possibly partial) tree.
    pub fn finish(&self) -> &State {
        &self.finish
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    fn run(&mut self, input: &Lexems, root: Option<NodeRef>) -> bool {
        assert!(self.parser.is_valid(), "driving an invalid parser");

        if input.is_empty() {
            self.finish = State::default();
            return false;
        }

        let start = State::new(input.as_slice(), SyntaxTree::new(root));
        self.finish = self.parser.parse(start);

        let accepted = self.finish.accept && self.finish.done();
        trace!(accepted, position = self.finish.current(), "drive finished");
        accepted
    }
}
