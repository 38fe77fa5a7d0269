//! Binding/layout extraction.
//!
//! Walks a finished graph and produces the backend-agnostic manifest the
//! runtime buffer-upload layer consumes: one ordered entry per referenced
//! external input, with type, byte layout, and update kind. Backend-specific
//! location or group/binding resolution happens downstream, never here.

use serde::{Deserialize, Serialize};

use crate::graph::{node_operands, Expr, Graph, GraphInner, NodeId, NodeKind};
use crate::types::Type;

/// How a binding's data reaches the GPU.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    /// Host-settable scalar/vector/matrix value.
    Uniform,
    /// Per-vertex buffer.
    Attribute,
    /// Per-instance buffer.
    Instance,
    /// Shared read/write buffer.
    Storage,
    /// 2D texture (plus an implicit sampler on WGSL).
    Texture,
    /// Compile-time constant; baked into the source, never uploaded, and
    /// therefore never part of the manifest.
    Constant,
}

/// One external input of a compiled shader.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BindingEntry {
    pub name: String,
    pub ty: Type,
    pub kind: BindingKind,
    /// Component count x 4 (f32/i32/u32 components); per-element size for
    /// storage buffers.
    pub byte_size: u32,
    /// Element stride for storage buffers, absent otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stride: Option<u32>,
    /// Declared element count for storage buffers; 0 means runtime-sized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<u32>,
}

/// The ordered set of external inputs a shader requires.
///
/// Entry order is first-reference order over the walked roots and is stable
/// across repeated extractions from the same unmodified graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BindingManifest {
    pub entries: Vec<BindingEntry>,
    /// Non-fatal findings, e.g. declared bindings never referenced.
    pub warnings: Vec<String>,
}

impl BindingManifest {
    pub fn total_uniform_bytes(&self) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.kind == BindingKind::Uniform)
            .map(|e| e.byte_size)
            .sum()
    }
}

/// Collect the indices of bindings referenced from the root scope and the
/// given roots, in first-reference order.
pub(crate) fn referenced_bindings(inner: &GraphInner, roots: &[NodeId]) -> Vec<usize> {
    let mut order = Vec::new();
    let mut seen_nodes = std::collections::HashSet::new();
    let mut seen_bindings = std::collections::HashSet::new();

    let mut walk = |start: NodeId| {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !seen_nodes.insert(id) {
                continue;
            }
            let node = inner.node(id);
            match &node.kind {
                NodeKind::Binding(i) => {
                    if seen_bindings.insert(*i) {
                        order.push(*i);
                    }
                }
                NodeKind::Call { func, args } => {
                    // Depth-first, left to right; a stack pops in reverse.
                    let function = &inner.functions[*func];
                    let mut operands: Vec<NodeId> = args.clone();
                    function.body.visit_nodes(&mut |n| operands.push(n));
                    operands.reverse();
                    stack.extend(operands);
                }
                kind => {
                    let mut operands = Vec::new();
                    node_operands(kind, &mut operands);
                    operands.reverse();
                    stack.extend(operands);
                }
            }
        }
    };

    let pruned = crate::scope::pruned_root_scope(inner, roots);
    let mut stmt_roots = Vec::new();
    pruned.visit_nodes(&mut |id| stmt_roots.push(id));
    for id in stmt_roots {
        walk(id);
    }
    for root in roots {
        walk(*root);
    }
    order
}

/// Produce the manifest for a graph, walking the given root expressions
/// (fragment color, vertex position, ...) after the root scope's statements.
///
/// Declared bindings that are never referenced are dropped from the entry
/// list and reported as warnings.
pub fn extract_bindings(graph: &Graph, roots: &[&Expr]) -> BindingManifest {
    let inner = graph.inner.borrow();
    let root_ids: Vec<NodeId> = roots.iter().map(|r| r.id).collect();
    let referenced = referenced_bindings(&inner, &root_ids);

    let mut manifest = BindingManifest::default();
    for &i in &referenced {
        let decl = inner.binding(i);
        if decl.kind == BindingKind::Constant {
            continue;
        }
        let byte_size = decl.ty.byte_size();
        let is_storage = decl.kind == BindingKind::Storage;
        manifest.entries.push(BindingEntry {
            name: decl.name.clone(),
            ty: decl.ty.clone(),
            kind: decl.kind,
            byte_size,
            stride: is_storage.then_some(byte_size),
            len: is_storage.then_some(decl.array_len),
        });
    }

    let referenced_set: std::collections::HashSet<usize> = referenced.into_iter().collect();
    for (i, decl) in inner.bindings.iter().enumerate() {
        if decl.kind != BindingKind::Constant && !referenced_set.contains(&i) {
            manifest
                .warnings
                .push(format!("binding `{}` is declared but never referenced", decl.name));
        }
    }
    manifest
}

impl Graph {
    /// See [`extract_bindings`].
    pub fn bindings(&self, roots: &[&Expr]) -> BindingManifest {
        extract_bindings(self, roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{self};

    #[test]
    fn entries_follow_first_reference_order() {
        let g = Graph::new();
        let b = g.uniform("u_b", [0.0f32, 0.0]).unwrap();
        let a = g.uniform("u_a", 1.0f32).unwrap();
        // Reference a before b.
        let root = g.vec3((&a, &b)).unwrap();
        let manifest = g.bindings(&[&root]);
        let names: Vec<&str> = manifest.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["u_a", "u_b"]);
        assert_eq!(manifest.entries[0].byte_size, 4);
        assert_eq!(manifest.entries[1].byte_size, 8);
    }

    #[test]
    fn unreferenced_bindings_warn_instead_of_failing() {
        let g = Graph::new();
        g.uniform("u_unused", 0.0f32).unwrap();
        let u = g.uniform("u_used", 0.0f32).unwrap();
        let manifest = g.bindings(&[&u]);
        assert_eq!(manifest.entries.len(), 1);
        assert_eq!(manifest.warnings.len(), 1);
        assert!(manifest.warnings[0].contains("u_unused"));
    }

    #[test]
    fn storage_entries_carry_stride_and_len() {
        let g = Graph::new();
        let buf = g.storage("particles", Type::vec4(), 128).unwrap();
        let first = buf.element(g.uint(0)).unwrap();
        let manifest = g.bindings(&[&first]);
        let entry = &manifest.entries[0];
        assert_eq!(entry.kind, BindingKind::Storage);
        assert_eq!(entry.byte_size, 16);
        assert_eq!(entry.stride, Some(16));
        assert_eq!(entry.len, Some(128));
    }

    #[test]
    fn constants_never_reach_the_manifest() {
        let g = Graph::new();
        let c = g.constant("PI", std::f32::consts::PI).unwrap();
        let root = c.mul(2.0f32).unwrap();
        let manifest = g.bindings(&[&root]);
        assert!(manifest.entries.is_empty());
        assert!(manifest.warnings.is_empty());
    }

    #[test]
    fn extraction_is_stable_across_calls() {
        let g = Graph::new();
        let t = g.uniform("u_time", 0.0f32).unwrap();
        let r = g.attribute("a_pos", types::FLOAT).unwrap();
        let root = t.add(&r).unwrap();
        assert_eq!(g.bindings(&[&root]), g.bindings(&[&root]));
    }

    #[test]
    fn manifest_serializes_to_json() {
        let g = Graph::new();
        let u = g.uniform("u_scale", [1.0f32, 1.0]).unwrap();
        let manifest = g.bindings(&[&u]);
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"u_scale\""));
        assert!(json.contains("\"uniform\""));
    }
}
