//! The decorated combinator: lifecycle callbacks around an inner parser.

use std::ops::{Add, BitOr};
use std::rc::Rc;

use tracing::trace;

use super::combinators::{impl_grammar_ops, And, Or};
use super::{Combinator, State};

/// A lifecycle callback. Actions mutate the state's tree (and, for the
/// post-evaluation hooks, may inspect the verdict); they return nothing.
pub type Action = Rc<dyn Fn(&mut State)>;

/// Wraps an inner combinator with three optional callbacks:
///
/// - `before` runs against the input state,
/// - `on_accept` runs on an accepting result,
/// - `on_fail` runs on a rejecting result.
///
/// Decorations are the sole channel through which a parse side-effects
/// the tree; the canonical callback triples live in the binding helpers
/// ([`super::bind`], [`super::bind_primary`]). The optional name feeds
/// the trace events.
#[derive(Clone, Default)]
pub struct Decorated {
    inner: Option<Rc<dyn Combinator>>,
    before: Option<Action>,
    accepted: Option<Action>,
    failed: Option<Action>,
    name: Option<String>,
}

/// Decorate a combinator. Callbacks are installed with the builder
/// methods on the result.
pub fn decorate(inner: impl Combinator + 'static) -> Decorated {
    Decorated::new(inner)
}

impl Decorated {
    pub fn new(inner: impl Combinator + 'static) -> Self {
        Self {
            inner: Some(Rc::new(inner)),
            ..Self::default()
        }
    }

    pub fn on_before(mut self, action: impl Fn(&mut State) + 'static) -> Self {
        self.before = Some(Rc::new(action));
        self
    }

    pub fn on_accept(mut self, action: impl Fn(&mut State) + 'static) -> Self {
        self.accepted = Some(Rc::new(action));
        self
    }

    pub fn on_fail(mut self, action: impl Fn(&mut State) + 'static) -> Self {
        self.failed = Some(Rc::new(action));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The diagnostic name, if one was given.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

impl Combinator for Decorated {
    fn parse(&self, mut state: State) -> State {
        assert!(self.is_valid(), "running an incomplete decorated parser");
        let inner = self.inner.as_ref().expect("validity implies an inner parser");

        if let Some(before) = &self.before {
            // `before` builds tree structure for the inner parse to grow
            // under; only those tree effects carry forward - the token
            // position it saw is the one the inner parser starts from.
            let mut staged = state.clone();
            before(&mut staged);
            state.tree = staged.tree;
        }

        let mut result = inner.parse(state);
        if result.accept {
            if let Some(accepted) = &self.accepted {
                accepted(&mut result);
            }
            trace!(parser = self.label(), position = result.current(), "accepted");
        } else {
            if let Some(failed) = &self.failed {
                failed(&mut result);
            }
            trace!(parser = self.label(), position = result.current(), "rejected");
        }
        result
    }

    fn is_valid(&self) -> bool {
        self.inner.as_ref().is_some_and(|inner| inner.is_valid())
    }
}

impl_grammar_ops!(Decorated);
