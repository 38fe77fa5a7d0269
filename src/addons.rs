//! Stock shader functions built on the public [`GraphFn`] DSL.
//!
//! Each constructor registers a function on the given graph and returns
//! the handle; nothing is traced until the first call, and repeated calls
//! share one emitted definition per signature.

use crate::error::Result;
use crate::func::GraphFn;
use crate::graph::Graph;
use crate::types::{self, Type};

/// Photoshop-style overlay blend of two channel values.
pub fn blend_overlay(graph: &Graph) -> Result<GraphFn> {
    let g = graph.clone();
    let f = graph.func(move |args| {
        let (base, blend) = (args[0].clone(), args[1].clone());
        let dark = base.mul(&blend)?.mul(2.0f32)?;
        g.if_then(&base.lt(0.5f32)?, || g.ret(&dark))?;
        base.one_minus()?
            .mul(blend.one_minus()?)?
            .mul(2.0f32)?
            .one_minus()
    });
    f.set_layout("blend_overlay", &["base", "blend"], types::FLOAT)?;
    Ok(f)
}

/// Overlay blend applied per color channel.
pub fn blend_overlay_vec3(graph: &Graph) -> Result<GraphFn> {
    let channel = blend_overlay(graph)?;
    let g = graph.clone();
    let f = graph.func(move |args| {
        let (base, blend) = (args[0].clone(), args[1].clone());
        let r = channel.call((base.x()?, blend.x()?))?;
        let gr = channel.call((base.y()?, blend.y()?))?;
        let b = channel.call((base.z()?, blend.z()?))?;
        g.vec3((r, gr, b))
    });
    f.set_layout("blend_overlay_vec3", &["base", "blend"], Type::vec3())?;
    Ok(f)
}

/// Bouncing ease-out curve over `t` in `0..1`.
pub fn bounce_out(graph: &Graph) -> Result<GraphFn> {
    let f = graph.func(|args| {
        let t = args[0].clone();
        let t2 = t.mul(&t)?.to_var();
        let b1 = t2.mul(7.5625f32)?;
        let b2 = t2.mul(9.075f32)?.sub(t.mul(9.9f32)?)?.add(3.4f32)?;
        let b3 = t2
            .mul(4356.0f32 / 361.0)?
            .sub(t.mul(35442.0f32 / 1805.0)?)?
            .add(16061.0f32 / 1805.0)?;
        let b4 = t2.mul(10.8f32)?.sub(t.mul(20.52f32)?)?.add(10.72f32)?;
        let tail = t.lt(9.0f32 / 10.0)?.select(b3, b4)?;
        let mid = t.lt(8.0f32 / 11.0)?.select(b2, tail)?;
        t.lt(4.0f32 / 11.0)?.select(b1, mid)
    });
    f.set_layout("bounce_out", &["t"], types::FLOAT)?;
    Ok(f)
}

/// Rec. 709 relative luminance of a linear RGB color.
pub fn luminance(graph: &Graph) -> Result<GraphFn> {
    let g = graph.clone();
    let f = graph.func(move |args| {
        let weights = g.vec3((0.2126f32, 0.7152f32, 0.0722f32))?;
        args[0].dot(weights)
    });
    f.set_layout("luminance", &["color"], types::FLOAT)?;
    Ok(f)
}

/// Convert a hue/saturation/value color to RGB.
pub fn hsv2rgb(graph: &Graph) -> Result<GraphFn> {
    let g = graph.clone();
    let f = graph.func(move |args| {
        let c = args[0].clone();
        let k = g.vec4((1.0f32, 2.0f32 / 3.0, 1.0f32 / 3.0, 3.0f32))?.to_var();
        let p = c
            .swizzle("xxx")?
            .add(k.xyz()?)?
            .fract()?
            .mul(6.0f32)?
            .sub(k.swizzle("www")?)?
            .abs()?;
        let ramp = p.sub(k.swizzle("xxx")?)?.clamp(0.0f32, 1.0f32)?;
        k.swizzle("xxx")?.mix(ramp, c.y()?)?.mul(c.z()?)
    });
    f.set_layout("hsv2rgb", &["c"], Type::vec3())?;
    Ok(f)
}

/// Signed distance from `p` to a circle of the given radius at the origin.
pub fn sdf_circle(graph: &Graph) -> Result<GraphFn> {
    let f = graph.func(|args| args[0].length()?.sub(&args[1]));
    f.set_layout("sdf_circle", &["p", "radius"], types::FLOAT)?;
    Ok(f)
}
