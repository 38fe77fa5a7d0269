//! GLSL program assembly (ES 3.00 and ES 1.00).

use super::{Emitter, EmitOptions, GlslVersion, Stage, VaryingInfo};
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
    let headers = e.headers_text();

    let mut out = String::new();
    match opts.glsl_version {
        GlslVersion::Es300 => {
            out.push_str("#version 300 es\nprecision highp float;\nprecision highp int;\n");
            if !headers.is_empty() {
                out.push('\n');
                out.push_str(&headers);
            }
            out.push_str("\nout vec4 fragColor;\n\nvoid main() {\n");
            out.push_str(&body);
            out.push_str(&format!("  fragColor = {color_text};\n}}\n"));
        }
        GlslVersion::Es100 => {
            out.push_str("precision highp float;\n");
            if !headers.is_empty() {
                out.push('\n');
                out.push_str(&headers);
            }
            out.push_str("\nvoid main() {\n");
            out.push_str(&body);
            out.push_str(&format!("  gl_FragColor = {color_text};\n}}\n"));
        }
    }
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

    let out_keyword = match opts.glsl_version {
        GlslVersion::Es300 => "out",
        GlslVersion::Es100 => "varying",
    };
    let mut assigns = String::new();
    for v in varyings {
        e.header(
            format!("varying:{}", v.name),
            format!("{out_keyword} {} {};", v.ty.glsl(), v.name),
        );
        let source = e.expr(v.source)?;
        assigns.push_str(&format!("  {} = {source};\n", v.name));
    }
    let position_text = e.expr(position)?;
    let headers = e.headers_text();

    let mut out = String::new();
    if opts.glsl_version == GlslVersion::Es300 {
        out.push_str("#version 300 es\nprecision highp float;\nprecision highp int;\n");
    } else {
        out.push_str("precision highp float;\n");
    }
    if !headers.is_empty() {
        out.push('\n');
        out.push_str(&headers);
    }
    out.push_str("\nvoid main() {\n");
    out.push_str(&body);
    out.push_str(&assigns);
    out.push_str(&format!("  gl_Position = {position_text};\n}}\n"));
    Ok(out)
}
