//! Leaf and composite combinators, plus the `+` / `|` grammar operators.

use std::cell::RefCell;
use std::ops::{Add, BitOr};
use std::rc::Rc;

use crate::lexer::Tag;

use super::{Combinator, State};

/// `+` builds a sequence, `|` an ordered choice, for every combinator
/// type. `Add` binds tighter than `BitOr`, so `a + b | c` reads as
/// `(a + b) | c`.
macro_rules! impl_grammar_ops {
    ($ty:ident $(< $($param:ident),+ >)?) => {
        impl<$($($param: Combinator,)+)? Rhs: Combinator> Add<Rhs> for $ty $(< $($param),+ >)? {
            type Output = And<Self, Rhs>;

            fn add(self, rhs: Rhs) -> Self::Output {
                And::new(self, rhs)
            }
        }

        impl<$($($param: Combinator,)+)? Rhs: Combinator> BitOr<Rhs> for $ty $(< $($param),+ >)? {
            type Output = Or<Self, Rhs>;

            fn bitor(self, rhs: Rhs) -> Self::Output {
                Or::new(self, rhs)
            }
        }
    };
}
pub(crate) use impl_grammar_ops;

/// Match a single token carrying `tag`.
pub fn atom(tag: Tag) -> Atom {
    Atom::new(tag)
}

/// Match any single token.
pub fn any() -> Any {
    Any
}

/// `left` then `right`; also spelled `left + right`.
pub fn sequence<L: Combinator, R: Combinator>(left: L, right: R) -> And<L, R> {
    And::new(left, right)
}

/// `left`, or `right` if `left` rejects; also spelled `left | right`.
pub fn alternation<L: Combinator, R: Combinator>(left: L, right: R) -> Or<L, R> {
    Or::new(left, right)
}

/// Greedy repetition, at least once.
pub fn one_or_more<P: Combinator>(inner: P) -> OneOrMore<P> {
    OneOrMore::new(inner)
}

/// An unbound recursion point; define it with [`Forward::bind`].
pub fn forward() -> Forward {
    Forward::new()
}

/// Matches one token by tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct Atom {
    tag: Tag,
}

impl Atom {
    pub fn new(tag: Tag) -> Self {
        Self { tag }
    }
}

impl Combinator for Atom {
    fn parse(&self, mut state: State) -> State {
        state.accept = matches!(state.peek(), Some(lexem) if lexem.tag == self.tag);
        if state.accept {
            state.advance();
        }
        state
    }

    /// Tag `0` is the empty-token sentinel, so an `Atom(0)` can never
    /// match real input.
    fn is_valid(&self) -> bool {
        self.tag != 0
    }
}

/// Matches any one token.
#[derive(Debug, Clone, Copy, Default)]
pub struct Any;

impl Combinator for Any {
    fn parse(&self, mut state: State) -> State {
        state.accept = !state.done();
        if state.accept {
            state.advance();
        }
        state
    }

    fn is_valid(&self) -> bool {
        true
    }
}

/// Sequence: `left` then `right`.
#[derive(Clone)]
pub struct And<L, R> {
    left: L,
    right: R,
}

impl<L: Combinator, R: Combinator> And<L, R> {
    pub fn new(left: L, right: R) -> Self {
        Self { left, right }
    }
}

impl<L: Combinator, R: Combinator> Combinator for And<L, R> {
    fn parse(&self, mut state: State) -> State {
        let left = self.left.parse(state.clone());
        if !left.accept {
            state.accept = false;
            return state;
        }

        let right = self.right.parse(left);
        if !right.accept {
            // hand the untouched input back so an enclosing Or retries
            // the other branch from a clean point
            state.accept = false;
            return state;
        }

        right
    }

    fn is_valid(&self) -> bool {
        self.left.is_valid() && self.right.is_valid()
    }
}

/// Ordered choice: `left`, else `right` from the same point.
#[derive(Clone)]
pub struct Or<L, R> {
    left: L,
    right: R,
}

impl<L: Combinator, R: Combinator> Or<L, R> {
    pub fn new(left: L, right: R) -> Self {
        Self { left, right }
    }
}

impl<L: Combinator, R: Combinator> Combinator for Or<L, R> {
    fn parse(&self, mut state: State) -> State {
        let left = self.left.parse(state.clone());
        if left.accept {
            return left;
        }

        let right = self.right.parse(state.clone());
        if right.accept {
            return right;
        }

        state.accept = false;
        state
    }

    /// A half-defined alternation still recognizes its defined branch.
    fn is_valid(&self) -> bool {
        self.left.is_valid() || self.right.is_valid()
    }
}

/// Greedy, non-backtracking repetition of `inner`, at least once.
#[derive(Clone)]
pub struct OneOrMore<P> {
    inner: P,
}

impl<P: Combinator> OneOrMore<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<P: Combinator> Combinator for OneOrMore<P> {
    fn parse(&self, state: State) -> State {
        let mut result = self.inner.parse(state);
        while result.accept && !result.done() {
            let mark = result.current();
            let next = self.inner.parse(result.clone());
            if !next.accept || next.current() == mark {
                // a zero-width success would loop forever; treat it as
                // the end of the repetition
                break;
            }
            result = next;
        }
        result
    }

    fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }
}

type ForwardImpl = Rc<dyn Fn(&Forward, State) -> State>;

/// A late-bound combinator, the recursion point of a grammar.
///
/// The definition closure receives the forward itself, so a rule can
/// refer to its own name:
///
/// ```
/// use parselib::parser::{atom, Combinator, Forward};
///
/// let expr = Forward::declare(|expr, state| {
///     let grammar = atom(1) | (atom(2) + expr.clone() + atom(3));
///     grammar.parse(state)
/// });
/// assert!(expr.is_valid());
/// ```
///
/// Clones share the definition cell, so a clone embedded into a larger
/// grammar before [`Forward::bind`] is called still resolves afterwards.
#[derive(Clone, Default)]
pub struct Forward {
    thunk: Rc<RefCell<Option<ForwardImpl>>>,
}

impl Forward {
    /// An unbound forward; running it before [`Forward::bind`] is a
    /// fatal precondition violation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct and bind in one step.
    pub fn declare(definition: impl Fn(&Forward, State) -> State + 'static) -> Self {
        let fwd = Self::new();
        fwd.bind(definition);
        fwd
    }

    /// Supply (or replace) the definition.
    pub fn bind(&self, definition: impl Fn(&Forward, State) -> State + 'static) {
        *self.thunk.borrow_mut() = Some(Rc::new(definition));
    }
}

impl Combinator for Forward {
    fn parse(&self, state: State) -> State {
        let thunk = self
            .thunk
            .borrow()
            .clone()
            .expect("running an unbound forward parser");
        thunk(self, state)
    }

    fn is_valid(&self) -> bool {
        self.thunk.borrow().is_some()
    }
}

impl_grammar_ops!(Atom);
impl_grammar_ops!(Any);
impl_grammar_ops!(And<L, R>);
impl_grammar_ops!(Or<L, R>);
impl_grammar_ops!(OneOrMore<P>);
impl_grammar_ops!(Forward);
