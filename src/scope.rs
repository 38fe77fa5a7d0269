//! Statement scopes and the control-flow tracer.
//!
//! Control flow is recorded, not executed: `if_then`, `loop_n`, and
//! `switch` run their body closures exactly once against a fresh scope
//! frame and keep the statements the bodies pushed. A body that returns
//! an error poisons the graph; emission then refuses to produce text.

use crate::bindings::BindingKind;
use crate::error::{Result, ShaderError};
use crate::graph::{Expr, Graph, GraphInner, IntoExpr, NodeId, NodeKind};
use crate::types::{self, ScalarKind, Type};

#[derive(Clone, Debug, Default)]
pub(crate) struct Scope {
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug)]
pub(crate) enum Stmt {
    /// Declare the node's named variable, initialized to its expression.
    Decl { node: NodeId },
    Assign {
        target: NodeId,
        value: NodeId,
    },
    If {
        cond: NodeId,
        then: Scope,
        elifs: Vec<(NodeId, Scope)>,
        else_: Option<Scope>,
    },
    /// Counted loop over `index` in `0..count`.
    Loop {
        count: NodeId,
        index: NodeId,
        body: Scope,
    },
    Switch {
        value: NodeId,
        cases: Vec<(i32, Scope)>,
        default: Option<Scope>,
    },
    Return(Option<NodeId>),
    Break,
    Continue,
}

impl Scope {
    /// Visit the node ids this scope's statements refer to directly,
    /// recursing into nested scopes.
    pub(crate) fn visit_nodes(&self, f: &mut impl FnMut(NodeId)) {
        for stmt in &self.stmts {
            match stmt {
                Stmt::Decl { node } => f(*node),
                Stmt::Assign { target, value } => {
                    f(*target);
                    f(*value);
                }
                Stmt::If {
                    cond,
                    then,
                    elifs,
                    else_,
                } => {
                    f(*cond);
                    then.visit_nodes(f);
                    for (c, scope) in elifs {
                        f(*c);
                        scope.visit_nodes(f);
                    }
                    if let Some(scope) = else_ {
                        scope.visit_nodes(f);
                    }
                }
                Stmt::Loop { count, index, body } => {
                    f(*count);
                    f(*index);
                    body.visit_nodes(f);
                }
                Stmt::Switch {
                    value,
                    cases,
                    default,
                } => {
                    f(*value);
                    for (_, scope) in cases {
                        scope.visit_nodes(f);
                    }
                    if let Some(scope) = default {
                        scope.visit_nodes(f);
                    }
                }
                Stmt::Return(Some(node)) => f(*node),
                Stmt::Return(None) | Stmt::Break | Stmt::Continue => {}
            }
        }
    }

    /// Collect the types of all `return` statements, recursing.
    pub(crate) fn return_types(&self, inner: &GraphInner, out: &mut Vec<Type>) {
        for stmt in &self.stmts {
            match stmt {
                Stmt::Return(Some(node)) => out.push(inner.node(*node).ty.clone()),
                Stmt::If {
                    then, elifs, else_, ..
                } => {
                    then.return_types(inner, out);
                    for (_, scope) in elifs {
                        scope.return_types(inner, out);
                    }
                    if let Some(scope) = else_ {
                        scope.return_types(inner, out);
                    }
                }
                Stmt::Loop { body, .. } => body.return_types(inner, out),
                Stmt::Switch { cases, default, .. } => {
                    for (_, scope) in cases {
                        scope.return_types(inner, out);
                    }
                    if let Some(scope) = default {
                        scope.return_types(inner, out);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Copy the root scope, dropping `Decl` statements whose variables are not
/// reachable from the given roots or from any other root statement. Control
/// flow and assignments always survive.
pub(crate) fn pruned_root_scope(inner: &GraphInner, roots: &[NodeId]) -> Scope {
    let root = &inner.scopes[0];

    let mut reachable = std::collections::HashSet::new();
    let mut grow = |start: NodeId, set: &mut std::collections::HashSet<NodeId>| {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !set.insert(id) {
                continue;
            }
            let node = inner.node(id);
            if let NodeKind::Call { func, args } = &node.kind {
                stack.extend(args.iter().copied());
                inner.functions[*func].body.visit_nodes(&mut |n| stack.push(n));
            } else {
                crate::graph::node_operands(&node.kind, &mut stack);
            }
        }
    };

    for root in roots {
        grow(*root, &mut reachable);
    }
    let non_decls = Scope {
        stmts: root
            .stmts
            .iter()
            .filter(|s| !matches!(s, Stmt::Decl { .. }))
            .cloned()
            .collect(),
    };
    let mut stmt_nodes = Vec::new();
    non_decls.visit_nodes(&mut |id| stmt_nodes.push(id));
    for id in stmt_nodes {
        grow(id, &mut reachable);
    }

    // Reverse pass: a declaration kept because a later statement uses it
    // may itself pull earlier declarations in.
    let mut keep = vec![false; root.stmts.len()];
    for (i, stmt) in root.stmts.iter().enumerate().rev() {
        match stmt {
            Stmt::Decl { node } if !reachable.contains(node) => {}
            Stmt::Decl { node } => {
                keep[i] = true;
                // The node itself is already marked; its initializer's
                // operands may not be.
                let mut operands = Vec::new();
                let n = inner.node(*node);
                if let NodeKind::Call { func, args } = &n.kind {
                    operands.extend(args.iter().copied());
                    inner.functions[*func]
                        .body
                        .visit_nodes(&mut |id| operands.push(id));
                } else {
                    crate::graph::node_operands(&n.kind, &mut operands);
                }
                for op in operands {
                    grow(op, &mut reachable);
                }
            }
            _ => keep[i] = true,
        }
    }

    Scope {
        stmts: root
            .stmts
            .iter()
            .zip(keep)
            .filter(|(_, k)| *k)
            .map(|(s, _)| s.clone())
            .collect(),
    }
}

impl Graph {
    /// Run `body` against a fresh scope frame and return the traced scope.
    pub(crate) fn trace(&self, body: impl FnOnce() -> Result<()>) -> Result<Scope> {
        self.inner.borrow_mut().scopes.push(Scope::default());
        let result = body();
        let scope = self
            .inner
            .borrow_mut()
            .scopes
            .pop()
            .expect("trace pushed a frame");
        match result {
            Ok(()) => Ok(scope),
            Err(err) => {
                self.poison(&err.to_string());
                Err(err)
            }
        }
    }

    /// Record an `if` branch; chain `else_if`/`else_then` on the result.
    pub fn if_then(&self, cond: &Expr, body: impl FnOnce() -> Result<()>) -> Result<IfChain> {
        require_bool(cond, "if_then")?;
        let then = self.trace(body)?;
        let mut inner = self.inner.borrow_mut();
        let depth = inner.scopes.len() - 1;
        inner.current_scope_mut().stmts.push(Stmt::If {
            cond: cond.id,
            then,
            elifs: Vec::new(),
            else_: None,
        });
        let index = inner.scopes[depth].stmts.len() - 1;
        drop(inner);
        Ok(IfChain {
            graph: self.clone(),
            depth,
            index,
        })
    }

    /// Record a counted loop; the body receives the loop index.
    pub fn loop_n(
        &self,
        count: impl IntoExpr,
        body: impl FnOnce(&Expr) -> Result<()>,
    ) -> Result<()> {
        let count = count.into_expr(self);
        let count_ty = count.ty();
        if !matches!(count_ty, Type::Scalar(ScalarKind::Int | ScalarKind::Uint)) {
            return Err(ShaderError::Type {
                op: "loop_n",
                lhs: count_ty.to_string(),
                rhs: "()".into(),
            });
        }
        let index = {
            let name = self.inner.borrow_mut().alloc_name("i");
            let expr = self.push_node(NodeKind::Local, count_ty);
            self.inner.borrow_mut().nodes[expr.id.index()].var_name = Some(name);
            expr
        };
        self.inner.borrow_mut().loop_depth += 1;
        let traced = self.trace(|| body(&index));
        self.inner.borrow_mut().loop_depth -= 1;
        let scope = traced?;
        self.inner.borrow_mut().current_scope_mut().stmts.push(Stmt::Loop {
            count: count.id,
            index: index.id,
            body: scope,
        });
        Ok(())
    }

    /// Record a switch over an integer scrutinee; chain `case`/`default`.
    pub fn switch(&self, value: &Expr) -> Result<SwitchChain> {
        let ty = value.ty();
        if !matches!(ty, Type::Scalar(ScalarKind::Int | ScalarKind::Uint)) {
            return Err(ShaderError::Type {
                op: "switch",
                lhs: ty.to_string(),
                rhs: "()".into(),
            });
        }
        let mut inner = self.inner.borrow_mut();
        let depth = inner.scopes.len() - 1;
        inner.current_scope_mut().stmts.push(Stmt::Switch {
            value: value.id,
            cases: Vec::new(),
            default: None,
        });
        let index = inner.scopes[depth].stmts.len() - 1;
        drop(inner);
        Ok(SwitchChain {
            graph: self.clone(),
            depth,
            index,
        })
    }

    /// `break` out of the innermost loop.
    pub fn break_loop(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.loop_depth == 0 {
            return Err(ShaderError::MisplacedStatement {
                keyword: "break",
                context: "loop",
            });
        }
        inner.current_scope_mut().stmts.push(Stmt::Break);
        Ok(())
    }

    /// `continue` the innermost loop.
    pub fn continue_loop(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.loop_depth == 0 {
            return Err(ShaderError::MisplacedStatement {
                keyword: "continue",
                context: "loop",
            });
        }
        inner.current_scope_mut().stmts.push(Stmt::Continue);
        Ok(())
    }

    /// Return a value from the function body being traced.
    pub fn ret(&self, value: impl IntoExpr) -> Result<()> {
        let value = value.into_expr(self);
        let mut inner = self.inner.borrow_mut();
        if inner.fn_depth == 0 {
            return Err(ShaderError::MisplacedStatement {
                keyword: "return",
                context: "function body",
            });
        }
        inner
            .current_scope_mut()
            .stmts
            .push(Stmt::Return(Some(value.id)));
        Ok(())
    }
}

/// Chained `if`/`else if`/`else` recorder returned by [`Graph::if_then`].
pub struct IfChain {
    graph: Graph,
    depth: usize,
    index: usize,
}

impl IfChain {
    fn patch(
        &self,
        keyword: &'static str,
        apply: impl FnOnce(&mut Stmt),
    ) -> Result<()> {
        let mut inner = self.graph.inner.borrow_mut();
        let at_if = inner.scopes.len() - 1 == self.depth
            && inner.scopes[self.depth].stmts.len() - 1 == self.index
            && matches!(inner.scopes[self.depth].stmts[self.index], Stmt::If { .. });
        if !at_if {
            return Err(ShaderError::DanglingElse(keyword));
        }
        apply(&mut inner.scopes[self.depth].stmts[self.index]);
        Ok(())
    }

    pub fn else_if(self, cond: &Expr, body: impl FnOnce() -> Result<()>) -> Result<IfChain> {
        require_bool(cond, "else_if")?;
        // Validate the chain is still open before tracing the body.
        self.patch("else_if", |_| {})?;
        let scope = self.graph.trace(body)?;
        self.patch("else_if", |stmt| {
            if let Stmt::If { elifs, .. } = stmt {
                elifs.push((cond.id, scope));
            }
        })?;
        Ok(self)
    }

    pub fn else_then(self, body: impl FnOnce() -> Result<()>) -> Result<()> {
        self.patch("else", |_| {})?;
        let scope = self.graph.trace(body)?;
        self.patch("else", |stmt| {
            if let Stmt::If { else_, .. } = stmt {
                *else_ = Some(scope);
            }
        })
    }
}

/// Chained `case`/`default` recorder returned by [`Graph::switch`].
pub struct SwitchChain {
    graph: Graph,
    depth: usize,
    index: usize,
}

impl SwitchChain {
    fn patch(
        &self,
        keyword: &'static str,
        apply: impl FnOnce(&mut Stmt),
    ) -> Result<()> {
        let mut inner = self.graph.inner.borrow_mut();
        let at_switch = inner.scopes.len() - 1 == self.depth
            && inner.scopes[self.depth].stmts.len() - 1 == self.index
            && matches!(inner.scopes[self.depth].stmts[self.index], Stmt::Switch { .. });
        if !at_switch {
            return Err(ShaderError::DanglingElse(keyword));
        }
        apply(&mut inner.scopes[self.depth].stmts[self.index]);
        Ok(())
    }

    pub fn case(self, label: i32, body: impl FnOnce() -> Result<()>) -> Result<SwitchChain> {
        self.patch("case", |_| {})?;
        let scope = self.graph.trace(body)?;
        self.patch("case", |stmt| {
            if let Stmt::Switch { cases, .. } = stmt {
                cases.push((label, scope));
            }
        })?;
        Ok(self)
    }

    pub fn default(self, body: impl FnOnce() -> Result<()>) -> Result<()> {
        self.patch("default", |_| {})?;
        let scope = self.graph.trace(body)?;
        self.patch("default", |stmt| {
            if let Stmt::Switch { default, .. } = stmt {
                *default = Some(scope);
            }
        })
    }
}

impl Expr {
    /// Record an assignment to this l-value.
    pub fn assign(&self, value: impl IntoExpr) -> Result<()> {
        let value = value.into_expr(&self.graph);
        if value.ty() != self.ty() {
            return Err(ShaderError::Type {
                op: "=",
                lhs: self.ty().to_string(),
                rhs: value.ty().to_string(),
            });
        }
        let mut inner = self.graph.inner.borrow_mut();
        if !is_assignable(&inner, self.id) {
            return Err(ShaderError::NotAssignable);
        }
        inner.current_scope_mut().stmts.push(Stmt::Assign {
            target: self.id,
            value: value.id,
        });
        Ok(())
    }
}

fn is_assignable(inner: &GraphInner, id: NodeId) -> bool {
    let node = inner.node(id);
    if node.var_name.is_some() {
        return true;
    }
    match &node.kind {
        NodeKind::Local => true,
        NodeKind::Index { base, .. } => match &inner.node(*base).kind {
            NodeKind::Binding(i) => inner.binding(*i).kind == BindingKind::Storage,
            _ => is_assignable(inner, *base),
        },
        NodeKind::Member { base, .. } => is_assignable(inner, *base),
        // A swizzle is an l-value only when it names each component once.
        NodeKind::Swizzle { base, pattern } => {
            let mut seen = [false; 4];
            for c in pattern.chars() {
                let slot = match c {
                    'x' => 0,
                    'y' => 1,
                    'z' => 2,
                    _ => 3,
                };
                if seen[slot] {
                    return false;
                }
                seen[slot] = true;
            }
            is_assignable(inner, *base)
        }
        _ => false,
    }
}

fn require_bool(cond: &Expr, op: &'static str) -> Result<()> {
    if cond.ty() == types::BOOL {
        Ok(())
    } else {
        Err(ShaderError::Type {
            op,
            lhs: cond.ty().to_string(),
            rhs: "()".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_outside_loop_is_rejected() {
        let g = Graph::new();
        assert!(matches!(
            g.break_loop(),
            Err(ShaderError::MisplacedStatement { keyword: "break", .. })
        ));
    }

    #[test]
    fn return_outside_function_is_rejected() {
        let g = Graph::new();
        let v = g.float(1.0);
        assert!(matches!(
            g.ret(&v),
            Err(ShaderError::MisplacedStatement { keyword: "return", .. })
        ));
    }

    #[test]
    fn if_condition_must_be_bool() {
        let g = Graph::new();
        let x = g.float(1.0);
        assert!(g.if_then(&x, || Ok(())).is_err());
    }

    #[test]
    fn else_must_follow_its_if() {
        let g = Graph::new();
        let cond = g.float(1.0).gt(0.0f32).unwrap();
        let chain = g.if_then(&cond, || Ok(())).unwrap();
        // An intervening statement closes the chain.
        g.float(3.0).to_var();
        assert!(matches!(
            chain.else_then(|| Ok(())),
            Err(ShaderError::DanglingElse("else"))
        ));
    }

    #[test]
    fn loop_body_sees_a_typed_index() {
        let g = Graph::new();
        g.loop_n(g.int(4), |i| {
            assert_eq!(i.ty(), types::INT);
            let v = i.to_float()?.to_var();
            v.assign(v.add(1.0f32)?)?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn failed_trace_poisons_the_graph() {
        let g = Graph::new();
        let cond = g.boolean(true);
        let res = g.if_then(&cond, || {
            g.float(1.0).add(g.int(1))?;
            Ok(())
        });
        assert!(res.is_err());
        assert!(g.inner.borrow().poisoned.is_some());
    }

    #[test]
    fn uniforms_are_not_assignable() {
        let g = Graph::new();
        let u = g.uniform("u_scale", 1.0f32).unwrap();
        assert!(matches!(u.assign(2.0f32), Err(ShaderError::NotAssignable)));
    }

    #[test]
    fn swizzle_targets_must_name_each_component_once() {
        let g = Graph::new();
        let v = g.vec2((0.0f32, 0.0f32)).unwrap().to_var();
        v.swizzle("yx").unwrap().assign(&v).unwrap();
        assert!(matches!(
            v.swizzle("xx").unwrap().assign(&v),
            Err(ShaderError::NotAssignable)
        ));
    }

    #[test]
    fn storage_elements_are_assignable() {
        let g = Graph::new();
        let buf = g.storage("data", types::FLOAT, 0).unwrap();
        let slot = buf.element(g.uint(0)).unwrap();
        slot.assign(3.0f32).unwrap();
        assert!(buf.assign(buf.element(g.uint(1)).unwrap()).is_err());
    }
}
