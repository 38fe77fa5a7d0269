use pretty_assertions::assert_eq;
use shader_forge::{
    compile_program, BindingKind, BindingManifest, EmitOptions, Graph, Type,
};

#[test]
fn program_manifest_covers_both_stages() {
    let g = Graph::new();
    let pos = g.attribute("a_pos", Type::vec2()).unwrap();
    let mvp = g.uniform("u_mvp", [0.0f32; 16]).unwrap();
    let clip = mvp
        .mul(g.vec4((pos.clone(), 0.0f32, 1.0f32)).unwrap())
        .unwrap();
    let tint = g.uniform("u_tint", [1.0f32, 1.0, 1.0]).unwrap();
    let uv = g.vertex_stage(&pos, "v_uv").unwrap();
    let color = g
        .vec4((tint.mul(uv.x().unwrap()).unwrap(), g.float(1.0)))
        .unwrap();

    let program = compile_program(&(&clip).into(), &(&color).into(), &EmitOptions::wgsl()).unwrap();

    let names: Vec<&str> = program
        .manifest
        .entries
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    // Vertex stage first, then the fragment-only uniform.
    assert_eq!(names, ["u_mvp", "a_pos", "u_tint"]);

    let sizes: Vec<u32> = program.manifest.entries.iter().map(|e| e.byte_size).collect();
    assert_eq!(sizes, [64, 8, 12]);
    assert_eq!(program.manifest.total_uniform_bytes(), 76);
}

#[test]
fn attribute_entries_keep_their_kind() {
    let g = Graph::new();
    let pos = g.attribute("a_pos", Type::vec3()).unwrap();
    let offset = g.instance_attribute("i_offset", Type::vec3()).unwrap();
    let clip = g.vec4((pos.add(&offset).unwrap(), 1.0f32)).unwrap();

    let manifest = g.bindings(&[&clip]);
    assert_eq!(manifest.entries[0].kind, BindingKind::Attribute);
    assert_eq!(manifest.entries[1].kind, BindingKind::Instance);
}

#[test]
fn emission_is_byte_identical_across_calls() {
    let g = Graph::new();
    let t = g.uniform("u_time", 0.0f32).unwrap();
    let level = g.float(0.0).to_var();
    g.if_then(&t.gt(0.5f32).unwrap(), || level.assign(1.0f32))
        .unwrap();
    let color = g.vec4((level.clone(), level.clone(), level, g.float(1.0))).unwrap();

    for opts in [EmitOptions::glsl(), EmitOptions::glsl_es100(), EmitOptions::wgsl()] {
        let first = g.emit_fragment(&color, &opts).unwrap();
        let second = g.emit_fragment(&color, &opts).unwrap();
        assert_eq!(first, second);
    }
    assert_eq!(g.bindings(&[&color]), g.bindings(&[&color]));
}

#[test]
fn manifest_agrees_with_emitted_declarations() {
    let g = Graph::new();
    // Declared but never referenced; pruned from both the source and the
    // entry list.
    g.uniform("u_unused", 0.0f32).unwrap();
    let u = g.uniform("u_used", 0.0f32).unwrap();
    let color = g.vec4((u.clone(), u.clone(), u, g.float(1.0))).unwrap();

    let src = g.emit_fragment(&color, &EmitOptions::wgsl()).unwrap();
    let manifest = g.bindings(&[&color]);

    assert!(!src.contains("u_unused"), "{src}");
    assert_eq!(manifest.entries.len(), 1);
    assert_eq!(manifest.entries[0].name, "u_used");
    assert_eq!(manifest.warnings.len(), 1);
    assert!(manifest.warnings[0].contains("u_unused"));
}

#[test]
fn manifest_round_trips_through_json() {
    let g = Graph::new();
    let buf = g.storage("particles", Type::vec4(), 256).unwrap();
    let head = buf.element(g.uint(0)).unwrap();
    let t = g.uniform("u_dt", 0.016f32).unwrap();
    let root = head.mul(&t).unwrap();

    let manifest = g.bindings(&[&root]);
    let json = serde_json::to_string_pretty(&manifest).unwrap();
    let back: BindingManifest = serde_json::from_str(&json).unwrap();
    assert_eq!(manifest, back);

    let storage = &manifest.entries[0];
    assert_eq!(storage.kind, BindingKind::Storage);
    assert_eq!(storage.stride, Some(16));
    assert_eq!(storage.len, Some(256));
}
