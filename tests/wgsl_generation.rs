use shader_forge::validation::validate_wgsl;
use shader_forge::{
    compile_program, Builtin, EmitOptions, Graph, ShaderError, Type, FLOAT,
};

#[test]
fn solid_color_fragment_is_valid_wgsl() {
    let g = Graph::new();
    let color = g.vec4((0.1f32, 0.2f32, 0.3f32, 1.0f32)).unwrap();
    let src = g.emit_fragment(&color, &EmitOptions::wgsl()).unwrap();

    assert!(src.contains("@fragment\nfn main() -> @location(0) vec4f {"), "{src}");
    assert!(src.contains("return vec4f(0.1, 0.2, 0.3, 1.0);"), "{src}");
    validate_wgsl(&src).unwrap_or_else(|e| panic!("naga rejected emitted WGSL: {e:#}\n{src}"));
}

#[test]
fn uniform_slots_follow_declaration_order_across_stages() {
    let g = Graph::new();
    g.uniform("u_first", 1.0f32).unwrap();
    let second = g.uniform("u_second", 2.0f32).unwrap();
    let color = g
        .vec4((second.clone(), second.clone(), second, g.float(1.0)))
        .unwrap();
    let src = g.emit_fragment(&color, &EmitOptions::wgsl()).unwrap();

    // The slot is assigned by declaration order, not by reference order, so
    // a vertex stage of the same graph agrees on the layout.
    assert!(
        src.contains("@group(0) @binding(1) var<uniform> u_second: f32;"),
        "{src}"
    );
    assert!(!src.contains("u_first"), "{src}");
    validate_wgsl(&src).unwrap();
}

#[test]
fn functions_emit_one_definition_per_signature() {
    let g = Graph::new();
    let double = g.func(|args| args[0].mul(2.0f32));
    double.set_layout("double", &["x"], FLOAT).unwrap();
    let a = double.call((g.float(0.25),)).unwrap();
    let b = double.call((g.float(0.5),)).unwrap();
    let color = g.vec4((a, b, 0.0f32, 1.0f32)).unwrap();
    let src = g.emit_fragment(&color, &EmitOptions::wgsl()).unwrap();

    assert_eq!(
        src.matches("fn double(x: f32) -> f32 {").count(),
        1,
        "{src}"
    );
    // One definition plus two call sites.
    assert_eq!(src.matches("double(").count(), 3, "{src}");
    validate_wgsl(&src).unwrap();
}

#[test]
fn select_replaces_the_ternary() {
    let g = Graph::new();
    let t = g.uniform("u_time", 0.0f32).unwrap();
    let v = t.gt(0.5f32).unwrap().select(1.0f32, 0.0f32).unwrap();
    let color = g.vec4((v.clone(), v.clone(), v, g.float(1.0))).unwrap();
    let src = g.emit_fragment(&color, &EmitOptions::wgsl()).unwrap();

    assert!(src.contains("select(0.0, 1.0, (u_time > 0.5))"), "{src}");
    validate_wgsl(&src).unwrap();
}

#[test]
fn texture_bindings_come_in_pairs() {
    let g = Graph::new();
    let tex = g.texture("u_tex").unwrap();
    let uv = g
        .builtin(Builtin::FragCoord)
        .xy()
        .unwrap()
        .mul(0.001f32)
        .unwrap();
    let color = tex.sample(uv).unwrap();
    let src = g.emit_fragment(&color, &EmitOptions::wgsl()).unwrap();

    assert!(
        src.contains("@group(1) @binding(0) var u_tex: texture_2d<f32>;"),
        "{src}"
    );
    assert!(
        src.contains("@group(1) @binding(1) var u_tex_sampler: sampler;"),
        "{src}"
    );
    assert!(src.contains("textureSample(u_tex, u_tex_sampler, "), "{src}");
    assert!(src.contains("@builtin(position) position: vec4f,"), "{src}");
    validate_wgsl(&src).unwrap();
}

#[test]
fn program_synthesizes_io_structs() {
    let g = Graph::new();
    let pos = g.attribute("a_pos", Type::vec2()).unwrap();
    let clip = g.vec4((pos.clone(), 0.0f32, 1.0f32)).unwrap();
    let uv = g.vertex_stage(&pos, "v_uv").unwrap();
    let color = g.vec4((uv, 0.0f32, 1.0f32)).unwrap();

    let program = compile_program(&(&clip).into(), &(&color).into(), &EmitOptions::wgsl()).unwrap();

    assert!(
        program.vertex.contains("struct VertexInput {\n  @location(0) a_pos: vec2f,\n}"),
        "{}",
        program.vertex
    );
    assert!(
        program
            .vertex
            .contains("struct VertexOutput {\n  @builtin(position) position: vec4f,\n  @location(0) v_uv: vec2f,\n}"),
        "{}",
        program.vertex
    );
    assert!(program.vertex.contains("  output.v_uv = input.a_pos;"), "{}", program.vertex);
    assert!(
        program.fragment.contains("struct FragmentInput {\n  @location(0) v_uv: vec2f,\n}"),
        "{}",
        program.fragment
    );
    assert!(
        program.fragment.contains("return vec4f(input.v_uv, 0.0, 1.0);"),
        "{}",
        program.fragment
    );

    validate_wgsl(&program.vertex).unwrap();
    validate_wgsl(&program.fragment).unwrap();
}

#[test]
fn compute_writes_storage_buffers() {
    let g = Graph::new();
    let buf = g.storage("data", FLOAT, 64).unwrap();
    let gid = g.builtin(Builtin::GlobalInvocationId);
    let i = gid.x().unwrap();
    let slot = buf.element(&i).unwrap();
    slot.assign(i.to_float().unwrap().mul(2.0f32).unwrap()).unwrap();

    let src = g.emit_compute(&EmitOptions::wgsl()).unwrap();
    assert!(
        src.contains("@group(2) @binding(0) var<storage, read_write> data: array<f32, 64>;"),
        "{src}"
    );
    assert!(src.contains("@compute @workgroup_size(32)"), "{src}");
    assert!(
        src.contains("@builtin(global_invocation_id) global_invocation_id: vec3u,"),
        "{src}"
    );
    validate_wgsl(&src).unwrap();

    let err = g.emit_compute(&EmitOptions::glsl()).unwrap_err();
    assert!(matches!(err, ShaderError::UnsupportedBuiltin { .. }), "{err}");
}

#[test]
fn switch_gains_a_default_clause() {
    let g = Graph::new();
    let mode = g.uniform("u_mode", 0i32).unwrap();
    let level = g.float(0.0).to_var();
    g.switch(&mode)
        .unwrap()
        .case(0, || level.assign(0.25f32))
        .unwrap()
        .case(1, || level.assign(0.75f32))
        .unwrap();
    let color = g.vec4((level.clone(), level.clone(), level, g.float(1.0))).unwrap();
    let src = g.emit_fragment(&color, &EmitOptions::wgsl()).unwrap();

    assert!(src.contains("switch (u_mode) {"), "{src}");
    assert!(src.contains("default:"), "missing synthesized default:\n{src}");
    validate_wgsl(&src).unwrap();
}

#[test]
fn loops_count_with_a_typed_index() {
    let g = Graph::new();
    let acc = g.float(0.0).to_var();
    g.loop_n(g.int(4), |i| {
        acc.assign(acc.add(i.to_float()?)?)?;
        Ok(())
    })
    .unwrap();
    let color = g.vec4((acc.clone(), acc.clone(), acc, g.float(1.0))).unwrap();
    let src = g.emit_fragment(&color, &EmitOptions::wgsl()).unwrap();

    assert!(src.contains("for (var i: i32 = 0; i < 4; i++) {"), "{src}");
    validate_wgsl(&src).unwrap();
}
