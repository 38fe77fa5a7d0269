//! WGSL program assembly: binding groups, struct I/O, entry points.
//!
//! Input/output structs are synthesized from the builtins, varyings, and
//! vertex attributes the walked graph actually references; an entry point
//! that touches none of them gets no input struct at all.

use super::{Emitter, EmitOptions, Stage, VaryingInfo};
use crate::error::Result;
use crate::graph::{GraphInner, NodeId};

pub(crate) fn fragment(
    inner: &GraphInner,
    color: NodeId,
    opts: &EmitOptions,
) -> Result<(String, Vec<VaryingInfo>)> {
    let mut e = Emitter::new(inner, Stage::Fragment, opts);
    let scope = e.pruned_root(&[color]);
    let mut body = String::new();
    e.scope_stmts(&scope, 1, &mut body)?;
    let color_text = e.expr(color)?;

    let mut fields = String::new();
    for b in &e.used_builtins {
        fields.push_str(&format!(
            "  @builtin({0}) {0}: {1},\n",
            b.name(),
            b.ty().wgsl()
        ));
    }
    for (i, v) in e.varyings.iter().enumerate() {
        fields.push_str(&format!("  @location({i}) {}: {},\n", v.name, v.ty.wgsl()));
    }

    let mut out = String::new();
    let headers = e.headers_text();
    if !headers.is_empty() {
        out.push_str(&headers);
        out.push('\n');
    }
    if fields.is_empty() {
        out.push_str("@fragment\nfn main() -> @location(0) vec4f {\n");
    } else {
        out.push_str(&format!("struct FragmentInput {{\n{fields}}}\n\n"));
        out.push_str("@fragment\nfn main(input: FragmentInput) -> @location(0) vec4f {\n");
    }
    out.push_str(&body);
    out.push_str(&format!("  return {color_text};\n}}\n"));
    Ok((out, e.varyings.clone()))
}

pub(crate) fn vertex(
    inner: &GraphInner,
    position: NodeId,
    varyings: &[VaryingInfo],
    opts: &EmitOptions,
) -> Result<String> {
    let mut e = Emitter::new(inner, Stage::Vertex, opts);
    let mut roots = vec![position];
    roots.extend(varyings.iter().map(|v| v.source));
    let scope = e.pruned_root(&roots);

    let mut body = String::new();
    e.scope_stmts(&scope, 1, &mut body)?;

    let mut assigns = String::new();
    for v in varyings {
        let source = e.expr(v.source)?;
        assigns.push_str(&format!("  output.{} = {source};\n", v.name));
    }
    let position_text = e.expr(position)?;

    let mut input_fields = String::new();
    for b in &e.used_builtins {
        input_fields.push_str(&format!(
            "  @builtin({0}) {0}: {1},\n",
            b.name(),
            b.ty().wgsl()
        ));
    }
    for &index in &e.used_attributes {
        let decl = inner.binding(index);
        input_fields.push_str(&format!(
            "  @location({}) {}: {},\n",
            e.slots.attribute[&index],
            decl.name,
            decl.ty.wgsl()
        ));
    }

    let mut output_fields = String::from("  @builtin(position) position: vec4f,\n");
    for (i, v) in varyings.iter().enumerate() {
        output_fields.push_str(&format!(
            "  @location({i}) {}: {},\n",
            v.name,
            v.ty.wgsl()
        ));
    }

    let mut out = String::new();
    let headers = e.headers_text();
    if !headers.is_empty() {
        out.push_str(&headers);
        out.push('\n');
    }
    if !input_fields.is_empty() {
        out.push_str(&format!("struct VertexInput {{\n{input_fields}}}\n\n"));
    }
    out.push_str(&format!("struct VertexOutput {{\n{output_fields}}}\n\n"));
    if input_fields.is_empty() {
        out.push_str("@vertex\nfn main() -> VertexOutput {\n");
    } else {
        out.push_str("@vertex\nfn main(input: VertexInput) -> VertexOutput {\n");
    }
    out.push_str("  var output: VertexOutput;\n");
    out.push_str(&body);
    out.push_str(&assigns);
    out.push_str(&format!(
        "  output.position = {position_text};\n  return output;\n}}\n"
    ));
    Ok(out)
}

pub(crate) fn compute(inner: &GraphInner, opts: &EmitOptions) -> Result<String> {
    let mut e = Emitter::new(inner, Stage::Compute, opts);
    let scope = e.pruned_root(&[]);
    let mut body = String::new();
    e.scope_stmts(&scope, 1, &mut body)?;

    let mut fields = String::new();
    for b in &e.used_builtins {
        fields.push_str(&format!(
            "  @builtin({0}) {0}: {1},\n",
            b.name(),
            b.ty().wgsl()
        ));
    }

    let mut out = String::new();
    let headers = e.headers_text();
    if !headers.is_empty() {
        out.push_str(&headers);
        out.push('\n');
    }
    if fields.is_empty() {
        out.push_str(&format!(
            "@compute @workgroup_size({})\nfn main() {{\n",
            opts.workgroup_size
        ));
    } else {
        out.push_str(&format!("struct ComputeInput {{\n{fields}}}\n\n"));
        out.push_str(&format!(
            "@compute @workgroup_size({})\nfn main(input: ComputeInput) {{\n",
            opts.workgroup_size
        ));
    }
    out.push_str(&body);
    out.push_str("}\n");
    Ok(out)
}
