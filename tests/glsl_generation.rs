use shader_forge::validation::{validate_glsl, GlslStage};
use shader_forge::{compile_program, EmitOptions, Graph, ShaderError, ShaderSource, Type};

#[test]
fn solid_color_fragment_has_the_es300_skeleton() {
    let g = Graph::new();
    let color = g.vec4((1.0f32, 0.0f32, 0.0f32, 1.0f32)).unwrap();
    let src = g.emit_fragment(&color, &EmitOptions::glsl()).unwrap();

    assert!(src.starts_with("#version 300 es\n"), "missing version directive:\n{src}");
    assert!(src.contains("precision highp float;"));
    assert!(src.contains("out vec4 fragColor;"));
    assert!(src.contains("fragColor = vec4(1.0, 0.0, 0.0, 1.0);"));
    validate_glsl(&src, GlslStage::Fragment)
        .unwrap_or_else(|e| panic!("naga rejected emitted GLSL: {e:#}\n{src}"));
}

#[test]
fn uniforms_surface_as_global_declarations() {
    let g = Graph::new();
    let tint = g.uniform("u_tint", [0.2f32, 0.4, 0.8]).unwrap();
    let alpha = g.uniform("u_alpha", 1.0f32).unwrap();
    let color = g.vec4((tint, alpha)).unwrap();
    let src = g.emit_fragment(&color, &EmitOptions::glsl()).unwrap();

    assert!(src.contains("uniform vec3 u_tint;"), "{src}");
    assert!(src.contains("uniform float u_alpha;"), "{src}");
    // Declarations precede main in reference order.
    let tint_at = src.find("uniform vec3 u_tint;").unwrap();
    let alpha_at = src.find("uniform float u_alpha;").unwrap();
    assert!(tint_at < alpha_at);
    validate_glsl(&src, GlslStage::Fragment).unwrap();
}

#[test]
fn if_without_else_emits_no_else_branch() {
    let g = Graph::new();
    let threshold = g.uniform("u_threshold", 0.5f32).unwrap();
    let level = g.float(0.1).to_var();
    g.if_then(&threshold.gt(0.25f32).unwrap(), || level.assign(1.0f32))
        .unwrap();
    let color = g.vec4((level.clone(), level.clone(), level, g.float(1.0))).unwrap();
    let src = g.emit_fragment(&color, &EmitOptions::glsl()).unwrap();

    assert!(src.contains("if ((u_threshold > 0.25)) {"), "{src}");
    assert!(!src.contains("else"), "unexpected else branch:\n{src}");
    validate_glsl(&src, GlslStage::Fragment).unwrap();
}

#[test]
fn integer_division_stays_integer() {
    let g = Graph::new();
    let q = g.int(7).div(g.int(2)).unwrap().to_float().unwrap();
    let color = g.vec4((q.clone(), q.clone(), q, g.float(1.0))).unwrap();
    let src = g.emit_fragment(&color, &EmitOptions::glsl()).unwrap();

    assert!(src.contains("(7 / 2)"), "{src}");
    validate_glsl(&src, GlslStage::Fragment).unwrap();
}

#[test]
fn float_remainder_uses_the_mod_builtin() {
    let g = Graph::new();
    let t = g.uniform("u_time", 0.0f32).unwrap();
    let wrapped = t.rem(1.0f32).unwrap();
    let color = g
        .vec4((wrapped.clone(), wrapped.clone(), wrapped, g.float(1.0)))
        .unwrap();
    let src = g.emit_fragment(&color, &EmitOptions::glsl()).unwrap();

    assert!(src.contains("mod(u_time, 1.0)"), "{src}");
    assert!(!src.contains("u_time %"), "{src}");
    validate_glsl(&src, GlslStage::Fragment).unwrap();
}

#[test]
fn program_wires_varyings_from_vertex_to_fragment() {
    let g = Graph::new();
    let pos = g.attribute("a_pos", Type::vec2()).unwrap();
    let clip = g.vec4((pos.clone(), 0.0f32, 1.0f32)).unwrap();
    let uv = g.vertex_stage(&pos, "v_uv").unwrap();
    let color = g.vec4((uv, 0.0f32, 1.0f32)).unwrap();

    let program = compile_program(&(&clip).into(), &(&color).into(), &EmitOptions::glsl()).unwrap();

    assert!(program.vertex.contains("in vec2 a_pos;"), "{}", program.vertex);
    assert!(program.vertex.contains("out vec2 v_uv;"), "{}", program.vertex);
    assert!(program.vertex.contains("  v_uv = a_pos;"), "{}", program.vertex);
    assert!(
        program.vertex.contains("gl_Position = vec4(a_pos, 0.0, 1.0);"),
        "{}",
        program.vertex
    );
    assert!(program.fragment.contains("in vec2 v_uv;"), "{}", program.fragment);
    assert!(
        program.fragment.contains("fragColor = vec4(v_uv, 0.0, 1.0);"),
        "{}",
        program.fragment
    );

    validate_glsl(&program.vertex, GlslStage::Vertex).unwrap();
    validate_glsl(&program.fragment, GlslStage::Fragment).unwrap();

    let names: Vec<&str> = program
        .manifest
        .entries
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(names, ["a_pos"]);
}

#[test]
fn es100_profile_uses_legacy_keywords() {
    let g = Graph::new();
    let pos = g.attribute("a_pos", Type::vec2()).unwrap();
    let clip = g.vec4((pos.clone(), 0.0f32, 1.0f32)).unwrap();
    let uv = g.vertex_stage(&pos, "v_uv").unwrap();
    let color = g.vec4((uv, 0.0f32, 1.0f32)).unwrap();

    let program =
        compile_program(&(&clip).into(), &(&color).into(), &EmitOptions::glsl_es100()).unwrap();

    assert!(!program.vertex.contains("#version"), "{}", program.vertex);
    assert!(program.vertex.contains("attribute vec2 a_pos;"), "{}", program.vertex);
    assert!(program.vertex.contains("varying vec2 v_uv;"), "{}", program.vertex);
    assert!(program.fragment.contains("varying vec2 v_uv;"), "{}", program.fragment);
    assert!(program.fragment.contains("gl_FragColor ="), "{}", program.fragment);
}

#[test]
fn es100_rejects_switch_statements() {
    let g = Graph::new();
    let mode = g.uniform("u_mode", 1i32).unwrap();
    let level = g.float(0.0).to_var();
    g.switch(&mode)
        .unwrap()
        .case(0, || level.assign(0.25f32))
        .unwrap()
        .default(|| level.assign(1.0f32))
        .unwrap();
    let color = g.vec4((level.clone(), level.clone(), level, g.float(1.0))).unwrap();

    let err = g.emit_fragment(&color, &EmitOptions::glsl_es100()).unwrap_err();
    assert!(matches!(err, ShaderError::UnsupportedBuiltin { .. }), "{err}");

    // The same graph emits fine on the default profile.
    let src = g.emit_fragment(&color, &EmitOptions::glsl()).unwrap();
    assert!(src.contains("switch (u_mode) {"), "{src}");
    assert!(src.contains("break;"), "{src}");
    validate_glsl(&src, GlslStage::Fragment).unwrap();
}

#[test]
fn storage_buffers_are_rejected_on_glsl() {
    let g = Graph::new();
    let buf = g.storage("data", shader_forge::FLOAT, 16).unwrap();
    let v = buf.element(g.uint(0)).unwrap();
    let color = g.vec4((v.clone(), v.clone(), v, g.float(1.0))).unwrap();

    let err = g.emit_fragment(&color, &EmitOptions::glsl()).unwrap_err();
    assert!(matches!(err, ShaderError::UnsupportedBuiltin { .. }), "{err}");
}

#[test]
fn raw_sources_pass_through_untouched() {
    let g = Graph::new();
    let color = g.vec4((0.0f32, 0.0f32, 0.0f32, 1.0f32)).unwrap();
    let raw = "void main() { gl_Position = vec4(0.0); }";
    let vertex: ShaderSource = raw.into();

    let program = compile_program(&vertex, &(&color).into(), &EmitOptions::glsl()).unwrap();
    assert_eq!(program.vertex, raw);
    assert!(program.manifest.entries.is_empty());
}

#[test]
fn program_stages_must_share_one_graph() {
    let vg = Graph::new();
    let clip = vg.vec4((0.0f32, 0.0f32, 0.0f32, 1.0f32)).unwrap();
    let fg = Graph::new();
    fg.uniform("u_tint", [1.0f32, 1.0, 1.0]).unwrap();
    let color = fg.vec4((0.0f32, 0.0f32, 0.0f32, 1.0f32)).unwrap();

    let err =
        compile_program(&(&clip).into(), &(&color).into(), &EmitOptions::glsl()).unwrap_err();
    assert!(matches!(err, ShaderError::MixedGraphs), "{err}");
}

#[test]
fn non_finite_literals_never_reach_the_output() {
    let g = Graph::new();
    let bad = g.float(f32::NAN);
    let color = g.vec4((bad, 0.0f32, 0.0f32, 1.0f32)).unwrap();
    let err = g.emit_fragment(&color, &EmitOptions::glsl()).unwrap_err();
    assert!(matches!(err, ShaderError::ScopeImbalance(_)), "{err}");

    let g = Graph::new();
    assert!(matches!(
        g.uniform("u_gain", f32::INFINITY),
        Err(ShaderError::AmbiguousShape(_))
    ));
}

#[test]
fn unused_declarations_are_pruned_from_the_body() {
    let g = Graph::new();
    let dead = g.float(42.0).to_var();
    let _ = dead;
    let live = g.float(0.5).to_var();
    let color = g.vec4((live.clone(), live.clone(), live, g.float(1.0))).unwrap();
    let src = g.emit_fragment(&color, &EmitOptions::glsl()).unwrap();

    assert!(!src.contains("42.0"), "dead declaration survived:\n{src}");
    assert!(src.contains("0.5"), "{src}");
    validate_glsl(&src, GlslStage::Fragment).unwrap();
}
