use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use parselib::ast::{node, Ast, NodeBase, NodeId, NodeRef, SyntaxTree, Visitor};
use parselib::lexer::{Lexems, Lexer, Rule, Tag};
use parselib::parser::{atom, bind, bind_primary, bind_with, decorate, Decorated, Driver, State};

const NUM: Tag = 1;
const ADD: Tag = 2;
const SUB: Tag = 3;

fn tokens(input: &str) -> Lexems {
    let rules = vec![
        Rule::new(r"\d+", NUM).unwrap(),
        Rule::new(r"\+", ADD).unwrap(),
        Rule::new(r"-", SUB).unwrap(),
        Rule::ignorable(r"\s+", 254).unwrap(),
    ];
    Lexer::new(rules).tokenize(input).expect("lexing failed")
}

/// Binary expression node: keeps its children in order.
#[derive(Default)]
struct AddAst {
    base: NodeBase,
    children: Vec<NodeRef>,
}

impl Ast for AddAst {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn append(&mut self, child: NodeRef) {
        self.children.push(child);
    }

    fn pop(&mut self, child: NodeId) {
        self.children.retain(|c| c.borrow().id() != child);
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
        for child in &self.children {
            child.borrow().accept(visitor);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Numeric leaf.
#[derive(Default)]
struct NumAst {
    base: NodeBase,
    value: i64,
}

impl NumAst {
    fn new(content: &str) -> Self {
        Self {
            base: NodeBase::new(),
            value: content.parse().expect("the grammar only feeds digits"),
        }
    }
}

impl Ast for NumAst {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn append(&mut self, _child: NodeRef) {}

    fn pop(&mut self, _child: NodeId) {}

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Operator leaf.
#[derive(Default)]
struct OpAst {
    base: NodeBase,
    op: String,
}

impl OpAst {
    fn new(content: &str) -> Self {
        Self {
            base: NodeBase::new(),
            op: content.to_string(),
        }
    }
}

impl Ast for OpAst {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn append(&mut self, _child: NodeRef) {}

    fn pop(&mut self, _child: NodeId) {}

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn num() -> Decorated {
    bind_primary(decorate(atom(NUM)), NumAst::new)
}

fn op() -> Decorated {
    bind_primary(decorate(atom(ADD) | atom(SUB)), OpAst::new)
}

fn children_of(branch: &NodeRef) -> Vec<NodeRef> {
    branch
        .borrow()
        .as_any()
        .downcast_ref::<AddAst>()
        .expect("expected a branch node")
        .children
        .clone()
}

fn num_value(leaf: &NodeRef) -> i64 {
    leaf.borrow()
        .as_any()
        .downcast_ref::<NumAst>()
        .expect("expected a numeric leaf")
        .value
}

fn op_text(leaf: &NodeRef) -> String {
    leaf.borrow()
        .as_any()
        .downcast_ref::<OpAst>()
        .expect("expected an operator leaf")
        .op
        .clone()
}

#[test]
fn terminals_attach_under_the_given_root() {
    let root = node(AddAst::default());
    let mut driver = Driver::new(num() + op() + num());

    let tree = driver.parse(&tokens("3+4"), Some(Rc::clone(&root)));
    assert!(!tree.is_empty());

    let children = children_of(&root);
    assert_eq!(children.len(), 3);
    assert_eq!(num_value(&children[0]), 3);
    assert_eq!(op_text(&children[1]), "+");
    assert_eq!(num_value(&children[2]), 4);

    // every leaf points back at the node it grew under
    for child in &children {
        let parent = child.borrow().parent().expect("attached leaf has a parent");
        assert!(Rc::ptr_eq(&parent, &root));
    }
}

#[test]
fn bound_rules_nest_their_subtree() {
    let root = node(AddAst::default());
    let stmt = bind::<AddAst>(decorate(num() + op() + num()));
    let mut driver = Driver::new(stmt);

    assert!(driver.accept(&tokens("3-4"), Some(Rc::clone(&root))));

    let top = children_of(&root);
    assert_eq!(top.len(), 1);
    let inner = children_of(&top[0]);
    assert_eq!(inner.len(), 3);
    assert_eq!(op_text(&inner[1]), "-");
}

#[test]
fn cursor_returns_to_the_root_after_acceptance() {
    let root = node(AddAst::default());
    let stmt = bind::<AddAst>(decorate(num() + op() + num()));
    let mut driver = Driver::new(stmt);

    assert!(driver.accept(&tokens("3+4"), Some(Rc::clone(&root))));

    let cursor = driver.finish().tree.cursor().expect("cursor survives the parse");
    assert!(Rc::ptr_eq(&cursor, &root));
}

#[test]
fn rejection_rolls_the_partial_subtree_back() {
    let root = node(AddAst::default());
    let stmt = bind::<AddAst>(decorate(num() + op() + num()));
    let mut driver = Driver::new(stmt);

    // "3+" gets through NUM and the operator before the grammar starves
    let tree = driver.parse(&tokens("3+"), Some(Rc::clone(&root)));
    assert!(tree.is_empty());
    assert!(!driver.finish().accept);

    // the half-built node and the leaves under it are gone
    assert!(children_of(&root).is_empty());
    let cursor = driver.finish().tree.cursor().expect("cursor is restored");
    assert!(Rc::ptr_eq(&cursor, &root));
}

#[test]
fn rejection_without_a_root_leaves_an_empty_tree() {
    let stmt = bind::<AddAst>(decorate(num() + op() + num()));
    let mut driver = Driver::new(stmt);

    let tree = driver.parse(&tokens("3+"), None);
    assert!(tree.is_empty());
    assert!(driver.finish().tree.cursor().is_none());
}

#[test]
fn failed_alternation_branches_leave_no_orphans() {
    let root = node(AddAst::default());
    let sub_stmt = bind::<AddAst>(decorate(num() + atom(SUB) + num()));
    let add_stmt = bind::<AddAst>(decorate(num() + atom(ADD) + num()));
    let mut driver = Driver::new(sub_stmt | add_stmt);

    // the subtraction branch consumes "3" before rejecting; its node must
    // not survive into the addition branch's tree
    assert!(driver.accept(&tokens("3+4"), Some(Rc::clone(&root))));
    assert_eq!(children_of(&root).len(), 1);
}

#[test]
fn custom_actions_run_after_the_canonical_ones() {
    let root = node(AddAst::default());
    let root_id = root.borrow().id();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let stmt = bind_with::<AddAst, _>(decorate(num() + op() + num()), move |state: &mut State| {
        let at = state.tree.cursor().map(|cursor| cursor.borrow().id());
        sink.borrow_mut().push(at);
    });

    let mut driver = Driver::new(stmt);
    assert!(driver.accept(&tokens("3+4"), Some(root)));

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    // before: the canonical action has already moved the cursor onto the
    // fresh node; accept: it is already back at the root
    assert_ne!(seen[0], Some(root_id));
    assert_eq!(seen[1], Some(root_id));
}

struct CountingVisitor {
    nodes: usize,
    numbers: Vec<i64>,
}

impl Visitor for CountingVisitor {
    fn visit(&mut self, visited: &dyn Ast) {
        self.nodes += 1;
        if let Some(num) = visited.as_any().downcast_ref::<NumAst>() {
            self.numbers.push(num.value);
        }
    }
}

#[test]
fn visitor_walks_the_finished_tree() {
    let root = node(AddAst::default());
    let stmt = bind::<AddAst>(decorate(num() + op() + num()));
    let mut driver = Driver::new(stmt);

    let tree = driver.parse(&tokens("3+4"), Some(root));
    let mut visitor = CountingVisitor {
        nodes: 0,
        numbers: Vec::new(),
    };
    tree.accept(&mut visitor);

    // root, bound node, two numbers, one operator
    assert_eq!(visitor.nodes, 5);
    assert_eq!(visitor.numbers, vec![3, 4]);
}

#[test]
fn pop_severs_ownership() {
    let root = node(AddAst::default());
    let mut tree = SyntaxTree::new(Some(Rc::clone(&root)));

    let leaf = node(NumAst::new("7"));
    let leaf_id = leaf.borrow().id();
    tree.append(Rc::clone(&leaf));
    assert_eq!(children_of(&root).len(), 1);

    tree.pop(leaf_id);
    assert!(children_of(&root).is_empty());
}

#[test]
fn node_identities_grow_monotonically() {
    let first = NodeBase::new();
    let second = NodeBase::new();
    let third = NodeBase::new();
    assert!(first.id() < second.id());
    assert!(second.id() < third.id());
}

#[test]
fn a_tree_can_sit_inside_another_tree() {
    let inner_root = node(NumAst::new("42"));
    let inner = SyntaxTree::new(Some(inner_root));

    let outer_root = node(AddAst::default());
    let mut outer = SyntaxTree::new(Some(Rc::clone(&outer_root)));
    outer.append(node(inner));

    let mut visitor = CountingVisitor {
        nodes: 0,
        numbers: Vec::new(),
    };
    outer.accept(&mut visitor);
    // the nested tree dispatches to its own root
    assert_eq!(visitor.numbers, vec![42]);
}
