//! One graph, both backends: everything here must emit valid source for
//! GLSL ES 3.00 and WGSL alike, with matching arithmetic semantics.

use proptest::prelude::*;
use shader_forge::validation::{validate_glsl, validate_wgsl, GlslStage};
use shader_forge::{EmitOptions, Graph, Expr};

fn portable_fragment(g: &Graph) -> Expr {
    let t = g.uniform("u_time", 0.0f32).unwrap();
    let steps = g.int(7).div(g.int(2)).unwrap();
    let base = t.sin().unwrap().mul(0.5f32).unwrap().add(0.5f32).unwrap();
    let level = base.to_var();
    g.loop_n(steps, |i| {
        level.assign(level.mul(0.9f32)?.add(i.to_float()?.mul(0.01f32)?)?)?;
        Ok(())
    })
    .unwrap();
    g.if_then(&level.gt(1.0f32).unwrap(), || level.assign(1.0f32))
        .unwrap();
    let pulse = t
        .rem(2.0f32)
        .unwrap()
        .lt(1.0f32)
        .unwrap()
        .select(level.clone(), level.one_minus().unwrap())
        .unwrap();
    g.vec4((pulse.clamp(0.0f32, 1.0f32).unwrap(), level.clone(), base, g.float(1.0)))
        .unwrap()
}

#[test]
fn portable_graph_is_valid_on_both_targets() {
    let g = Graph::new();
    let color = portable_fragment(&g);

    let glsl = g.emit_fragment(&color, &EmitOptions::glsl()).unwrap();
    validate_glsl(&glsl, GlslStage::Fragment)
        .unwrap_or_else(|e| panic!("naga rejected GLSL: {e:#}\n{glsl}"));

    let wgsl = g.emit_fragment(&color, &EmitOptions::wgsl()).unwrap();
    validate_wgsl(&wgsl).unwrap_or_else(|e| panic!("naga rejected WGSL: {e:#}\n{wgsl}"));
}

#[test]
fn integer_division_truncates_on_both_targets() {
    let g = Graph::new();
    let color = portable_fragment(&g);

    // Both backends keep 7 / 2 in integer arithmetic; neither rewrites it
    // into a float division.
    let glsl = g.emit_fragment(&color, &EmitOptions::glsl()).unwrap();
    let wgsl = g.emit_fragment(&color, &EmitOptions::wgsl()).unwrap();
    assert!(glsl.contains("(7 / 2)"), "{glsl}");
    assert!(wgsl.contains("(7 / 2)"), "{wgsl}");
    assert!(!glsl.contains("7.0 / 2.0"), "{glsl}");
    assert!(!wgsl.contains("7.0 / 2.0"), "{wgsl}");
}

#[test]
fn float_remainder_spelling_follows_the_target() {
    let g = Graph::new();
    let color = portable_fragment(&g);

    let glsl = g.emit_fragment(&color, &EmitOptions::glsl()).unwrap();
    let wgsl = g.emit_fragment(&color, &EmitOptions::wgsl()).unwrap();
    assert!(glsl.contains("mod(u_time, 2.0)"), "{glsl}");
    assert!(wgsl.contains("(u_time % 2.0)"), "{wgsl}");
}

proptest! {
    #[test]
    fn emission_is_deterministic_for_arbitrary_literals(
        v in -1.0e6f32..1.0e6f32,
        count in 1i32..8,
    ) {
        let g = Graph::new();
        let base = g.float(v).to_var();
        g.loop_n(g.int(count), |_| {
            base.assign(base.mul(0.5f32)?)?;
            Ok(())
        })
        .unwrap();
        let color = g
            .vec4((base.clone(), base.clone(), base.clone(), g.float(1.0)))
            .unwrap();

        for opts in [EmitOptions::glsl(), EmitOptions::wgsl()] {
            let first = g.emit_fragment(&color, &opts).unwrap();
            let second = g.emit_fragment(&color, &opts).unwrap();
            prop_assert_eq!(&first, &second);
        }
    }

    #[test]
    fn float_literals_parse_back_on_both_targets(v in -1.0e3f32..1.0e3f32) {
        let g = Graph::new();
        let x = g.float(v);
        let color = g.vec4((x.clone(), x.clone(), x, g.float(1.0))).unwrap();

        let glsl = g.emit_fragment(&color, &EmitOptions::glsl()).unwrap();
        prop_assert!(validate_glsl(&glsl, GlslStage::Fragment).is_ok(), "{}", glsl);
        let wgsl = g.emit_fragment(&color, &EmitOptions::wgsl()).unwrap();
        prop_assert!(validate_wgsl(&wgsl).is_ok(), "{}", wgsl);
    }
}
