//! # AST Substrate
//!
//! The parser grows a syntax tree as a side effect of recognition, so the
//! tree machinery here is deliberately small: a node capability trait
//! ([`Ast`]), shared node handles ([`NodeRef`]), and a [`SyntaxTree`]
//! wrapper holding the root plus a *cursor* - the node under which the
//! next attach happens.
//!
//! ## Ownership
//!
//! A parent owns its children (strong [`Rc`] handles in whatever
//! collection the concrete node keeps); the parent back-reference is a
//! [`Weak`], so popping a child out of its parent really does free the
//! detached subtree. Cycles are impossible by construction.
//!
//! ## Cursor discipline
//!
//! The cursor is the only way nodes are attached during parsing. The tree
//! never moves it on its own; the decoration callbacks in
//! [`crate::parser`] do, in matched before/accept/fail steps.
//!
//! Concrete node types live with the client. A node embeds a [`NodeBase`]
//! (identity + parent link) and decides for itself what `append`, `pop`
//! and `accept` mean - leaves typically make the first two no-ops.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable numeric node identity, unique within the process.
pub type NodeId = u64;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle to a tree node.
pub type NodeRef = Rc<RefCell<dyn Ast>>;

/// Non-owning handle used for parent back-references.
pub type WeakNodeRef = Weak<RefCell<dyn Ast>>;

/// Wrap a concrete node into a shared handle.
pub fn node(ast: impl Ast + 'static) -> NodeRef {
    Rc::new(RefCell::new(ast))
}

/// External traversal over a finished tree. Concrete nodes decide the
/// order in which they hand themselves and their children over.
pub trait Visitor {
    fn visit(&mut self, node: &dyn Ast);
}

/// Identity and parent plumbing embedded in every concrete node.
#[derive(Debug, Clone)]
pub struct NodeBase {
    id: NodeId,
    parent: Option<WeakNodeRef>,
}

impl NodeBase {
    pub fn new() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            parent: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn set_parent(&mut self, parent: Option<&NodeRef>) {
        self.parent = parent.map(Rc::downgrade);
    }
}

impl Default for NodeBase {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability trait for tree nodes.
///
/// `append` and `pop` are the attach/detach pair the cursor protocol
/// drives; `accept` dispatches a [`Visitor`]. `as_any` exists so client
/// code can downcast node handles back to their concrete types.
pub trait Ast {
    fn base(&self) -> &NodeBase;
    fn base_mut(&mut self) -> &mut NodeBase;

    fn append(&mut self, child: NodeRef);
    fn pop(&mut self, child: NodeId);
    fn accept(&self, visitor: &mut dyn Visitor);
    fn as_any(&self) -> &dyn Any;

    fn id(&self) -> NodeId {
        self.base().id()
    }

    fn parent(&self) -> Option<NodeRef> {
        self.base().parent()
    }

    fn set_parent(&mut self, parent: Option<&NodeRef>) {
        self.base_mut().set_parent(parent);
    }
}

/// A tree under construction: an optional root and the cursor marking the
/// current insertion point.
///
/// Cloning a `SyntaxTree` clones the two handles, not the nodes - clones
/// share structure, which is exactly what lets sibling alternation
/// branches observe (and roll back) each other's work.
///
/// The tree is itself an [`Ast`] node, so a finished tree can be grafted
/// into a larger one.
#[derive(Clone, Default)]
pub struct SyntaxTree {
    base: NodeBase,
    root: Option<NodeRef>,
    cursor: Option<NodeRef>,
}

impl SyntaxTree {
    /// A tree growing under `root`; the cursor starts there.
    pub fn new(root: Option<NodeRef>) -> Self {
        Self {
            base: NodeBase::new(),
            cursor: root.clone(),
            root,
        }
    }

    /// A tree with no root and no cursor.
    pub fn empty() -> Self {
        Self::new(None)
    }

    pub fn root(&self) -> Option<&NodeRef> {
        self.root.as_ref()
    }

    pub fn cursor(&self) -> Option<NodeRef> {
        self.cursor.clone()
    }

    pub fn set_cursor(&mut self, cursor: Option<NodeRef>) {
        self.cursor = cursor;
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

impl Ast for SyntaxTree {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    /// Attach under the cursor, not under the root.
    fn append(&mut self, child: NodeRef) {
        if let Some(cursor) = &self.cursor {
            cursor.borrow_mut().append(child);
        }
    }

    /// Detach from the cursor's collection.
    fn pop(&mut self, child: NodeId) {
        if let Some(cursor) = &self.cursor {
            cursor.borrow_mut().pop(child);
        }
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        if let Some(root) = &self.root {
            root.borrow().accept(visitor);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("root", &self.root.as_ref().map(|r| r.borrow().id()))
            .field("cursor", &self.cursor.as_ref().map(|c| c.borrow().id()))
            .finish()
    }
}
