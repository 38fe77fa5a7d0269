//! Reusable shader functions.
//!
//! A [`GraphFn`] wraps a Rust closure over expression handles. The closure
//! is traced lazily on first call and memoized per argument-type tuple, so
//! one `GraphFn` yields one emitted definition per distinct signature no
//! matter how many call sites it has.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Result, ShaderError};
use crate::graph::{node_operands, Expr, ExprArgs, Graph, NodeId, NodeKind};
use crate::scope::{Scope, Stmt};
use crate::types::Type;

/// A traced overload, ready for emission.
#[derive(Clone, Debug)]
pub(crate) struct Function {
    pub name: String,
    /// Parameter nodes, in declaration order; their names live in the
    /// nodes' `var_name` slots.
    pub params: Vec<NodeId>,
    pub ret: Type,
    pub body: Scope,
}

/// Declared name and shape for a [`GraphFn`], set ahead of tracing.
#[derive(Clone, Debug)]
struct Layout {
    name: String,
    params: Vec<String>,
    ret: Type,
}

struct FnState {
    layout: Option<Layout>,
    /// Emitted base name; fixed by the first trace.
    base_name: Option<String>,
    /// Argument-type tuple to index in `GraphInner::functions`.
    overloads: HashMap<Vec<Type>, usize>,
}

/// A graph function built from a Rust closure.
#[derive(Clone)]
pub struct GraphFn {
    graph: Graph,
    #[allow(clippy::type_complexity)]
    body: Rc<dyn Fn(&[Expr]) -> Result<Expr>>,
    state: Rc<RefCell<FnState>>,
    in_progress: Rc<Cell<bool>>,
}

impl Graph {
    /// Register a closure as a shader function. Nothing is traced until
    /// the first [`GraphFn::call`].
    pub fn func(&self, body: impl Fn(&[Expr]) -> Result<Expr> + 'static) -> GraphFn {
        GraphFn {
            graph: self.clone(),
            body: Rc::new(body),
            state: Rc::new(RefCell::new(FnState {
                layout: None,
                base_name: None,
                overloads: HashMap::new(),
            })),
            in_progress: Rc::new(Cell::new(false)),
        }
    }
}

impl GraphFn {
    /// Declare the emitted name, parameter names, and return type. Must
    /// run before the first call; the traced body is checked against it.
    pub fn set_layout(&self, name: &str, params: &[&str], ret: Type) -> Result<&Self> {
        let mut state = self.state.borrow_mut();
        if state.base_name.is_some() {
            return Err(ShaderError::MisplacedStatement {
                keyword: "set_layout",
                context: "function that has not been traced yet",
            });
        }
        state.layout = Some(Layout {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            ret,
        });
        Ok(self)
    }

    /// Call the function with the given arguments, tracing the body for
    /// this argument-type tuple if it has not been traced before.
    pub fn call(&self, args: impl ExprArgs) -> Result<Expr> {
        let args = args.into_exprs(&self.graph);
        let arg_tys: Vec<Type> = args.iter().map(Expr::ty).collect();

        let cached = self.state.borrow().overloads.get(&arg_tys).copied();
        let index = match cached {
            Some(index) => index,
            None => self.trace_overload(&arg_tys)?,
        };

        let ret = self.graph.inner.borrow().functions[index].ret.clone();
        let ids = args.iter().map(|a| a.id).collect();
        Ok(self.graph.push_node(
            NodeKind::Call {
                func: index,
                args: ids,
            },
            ret,
        ))
    }

    fn trace_overload(&self, arg_tys: &[Type]) -> Result<usize> {
        let fn_name = self.display_name();
        if self.in_progress.get() {
            return Err(ShaderError::RecursiveFunction { function: fn_name });
        }

        let layout = self.state.borrow().layout.clone();
        if let Some(layout) = &layout {
            if layout.params.len() != arg_tys.len() {
                return Err(ShaderError::LayoutMismatch {
                    function: fn_name,
                    declared: format!("{} parameters", layout.params.len()),
                    found: format!("{} arguments", arg_tys.len()),
                });
            }
        }

        // Anything traced before this index belongs to the caller; the
        // body may only reach past it for literals, bindings, and builtins.
        let start = self.graph.inner.borrow().nodes.len() as u32;

        let params: Vec<Expr> = arg_tys
            .iter()
            .enumerate()
            .map(|(i, ty)| {
                let name = {
                    let mut inner = self.graph.inner.borrow_mut();
                    match &layout {
                        Some(layout) => inner.alloc_name(&layout.params[i]),
                        None => inner.alloc_name(&format!("p{i}")),
                    }
                };
                let expr = self.graph.push_node(NodeKind::Local, ty.clone());
                self.graph.inner.borrow_mut().nodes[expr.id.index()].var_name = Some(name);
                expr
            })
            .collect();

        self.in_progress.set(true);
        self.graph.inner.borrow_mut().fn_depth += 1;
        let traced = self.graph.trace(|| {
            let result = (self.body)(&params)?;
            let mut inner = self.graph.inner.borrow_mut();
            inner
                .current_scope_mut()
                .stmts
                .push(Stmt::Return(Some(result.id)));
            Ok(())
        });
        self.graph.inner.borrow_mut().fn_depth -= 1;
        self.in_progress.set(false);
        let body = traced?;

        self.check_captures(&body, start, &fn_name)?;

        let ret = self.return_type(&body, &fn_name)?;
        if let Some(layout) = &layout {
            if layout.ret != ret {
                return Err(ShaderError::LayoutMismatch {
                    function: fn_name,
                    declared: layout.ret.to_string(),
                    found: ret.to_string(),
                });
            }
        }

        let name = {
            let mut state = self.state.borrow_mut();
            match &state.base_name {
                // Later overloads get suffixed names; WGSL has no
                // overloading, so every signature emits its own symbol.
                Some(base) => self.graph.inner.borrow_mut().alloc_name(&base.clone()),
                None => {
                    let base = match &layout {
                        Some(layout) => {
                            self.graph.inner.borrow_mut().alloc_name(&layout.name)
                        }
                        None => self.graph.inner.borrow_mut().alloc_fn_name(),
                    };
                    state.base_name = Some(base.clone());
                    base
                }
            }
        };

        let mut inner = self.graph.inner.borrow_mut();
        let index = inner.functions.len();
        inner.functions.push(Function {
            name,
            params: params.iter().map(|p| p.id).collect(),
            ret,
            body,
        });
        drop(inner);
        self.state
            .borrow_mut()
            .overloads
            .insert(arg_tys.to_vec(), index);
        Ok(index)
    }

    /// Every node the body reaches that predates the trace must be a
    /// literal, binding, or builtin; anything else was captured from the
    /// caller's expression context.
    fn check_captures(&self, body: &Scope, start: u32, fn_name: &str) -> Result<()> {
        let inner = self.graph.inner.borrow();
        let mut pending = Vec::new();
        body.visit_nodes(&mut |id| pending.push(id));
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            let node = inner.node(id);
            if id.index() < start as usize
                && !matches!(
                    node.kind,
                    NodeKind::Literal(_) | NodeKind::Binding(_) | NodeKind::Builtin(_)
                )
            {
                return Err(ShaderError::CapturedExternal {
                    function: fn_name.to_string(),
                });
            }
            node_operands(&node.kind, &mut pending);
        }
        Ok(())
    }

    fn return_type(&self, body: &Scope, fn_name: &str) -> Result<Type> {
        let inner = self.graph.inner.borrow();
        let mut types = Vec::new();
        body.return_types(&inner, &mut types);
        let Some(last) = types.last().cloned() else {
            return Err(ShaderError::LayoutMismatch {
                function: fn_name.to_string(),
                declared: "a return value".into(),
                found: "none".into(),
            });
        };
        for ty in &types {
            if *ty != last {
                return Err(ShaderError::LayoutMismatch {
                    function: fn_name.to_string(),
                    declared: last.to_string(),
                    found: ty.to_string(),
                });
            }
        }
        Ok(last)
    }

    fn display_name(&self) -> String {
        let state = self.state.borrow();
        state
            .base_name
            .clone()
            .or_else(|| state.layout.as_ref().map(|l| l.name.clone()))
            .unwrap_or_else(|| "<anonymous>".to_string())
    }
}
