//! # Tree-building callback triples
//!
//! A grammar rule that should produce an AST node gets bound to a node
//! type with three canonical actions, matching the three moments of a
//! decorated parse:
//!
//! 1. **before** - a fresh node is created and the cursor moves onto it,
//!    so everything the rule's children build attaches underneath;
//! 2. **on accept** - the cursor steps back to the parent, leaving the
//!    finished subtree in place;
//! 3. **on fail** - the half-built node is popped out of its parent and
//!    dropped, restoring the tree for the next alternation branch.
//!
//! Terminals use [`primary_builder`] instead: one leaf appended under the
//! cursor on accept, nothing to undo on failure.
//!
//! After any complete parse every node created by the before step is
//! either reachable from the root or has been popped - provided
//! alternation branches that append nodes are themselves bound, so their
//! rollback runs when they reject.

use std::any::type_name;
use std::rc::Rc;

use crate::ast::{node, Ast};

use super::decorated::{Action, Decorated};
use super::State;

/// Create a `T` under the cursor and move the cursor onto it.
pub fn before_action<T: Ast + Default + 'static>(state: &mut State) {
    let candidate = node(T::default());
    candidate.borrow_mut().set_parent(state.tree.cursor().as_ref());
    state.tree.append(Rc::clone(&candidate));
    state.tree.set_cursor(Some(candidate));
}

/// Step the cursor back to its parent; the finished subtree stays.
pub fn accept_action(state: &mut State) {
    let parent = state.tree.cursor().and_then(|cursor| cursor.borrow().parent());
    state.tree.set_cursor(parent);
}

/// Pop the half-built cursor node out of its parent and move the cursor
/// back up. Dropping the popped handle frees the partial subtree.
pub fn fail_action(state: &mut State) {
    let Some(victim) = state.tree.cursor() else {
        return;
    };
    let parent = victim.borrow().parent();
    state.tree.set_cursor(parent.clone());
    if let Some(parent) = parent {
        parent.borrow_mut().pop(victim.borrow().id());
    }
}

/// An accept-time action that turns the most recently consumed token into
/// a leaf node under the cursor. Constant constructor arguments are
/// captured by the `make` closure.
pub fn primary_builder<T, F>(make: F) -> Action
where
    T: Ast + 'static,
    F: Fn(&str) -> T + 'static,
{
    Rc::new(move |state: &mut State| {
        let content = match state.latest() {
            Some(lexem) => lexem.content.clone(),
            None => return,
        };
        let leaf = node(make(&content));
        leaf.borrow_mut().set_parent(state.tree.cursor().as_ref());
        state.tree.append(leaf);
    })
}

/// Bind a rule to the node type `T`: install the canonical triple and
/// name the parser after the type.
pub fn bind<T: Ast + Default + 'static>(parser: Decorated) -> Decorated {
    parser
        .on_before(before_action::<T>)
        .on_accept(accept_action)
        .on_fail(fail_action)
        .name(type_name::<T>())
}

/// Like [`bind`], with a custom action composed after the canonical one
/// on each phase - the custom action always observes the cursor movement
/// and cannot bypass it.
pub fn bind_with<T, F>(parser: Decorated, custom: F) -> Decorated
where
    T: Ast + Default + 'static,
    F: Fn(&mut State) + 'static,
{
    let custom = Rc::new(custom);
    let on_before = Rc::clone(&custom);
    let on_accept = Rc::clone(&custom);
    let on_fail = custom;
    parser
        .on_before(move |state| {
            before_action::<T>(state);
            on_before(state);
        })
        .on_accept(move |state| {
            accept_action(state);
            on_accept(state);
        })
        .on_fail(move |state| {
            fail_action(state);
            on_fail(state);
        })
        .name(type_name::<T>())
}

/// Bind a terminal rule to the leaf type `T` built by `make` from the
/// consumed token's content.
pub fn bind_primary<T, F>(parser: Decorated, make: F) -> Decorated
where
    T: Ast + 'static,
    F: Fn(&str) -> T + 'static,
{
    let action = primary_builder(make);
    parser
        .on_accept(move |state: &mut State| action(state))
        .name(type_name::<T>())
}
