//! Shader source validation using the naga library.
//!
//! The emitters produce text, not a parsed module; these helpers feed that
//! text back through naga's frontends so tests (and callers who want a
//! safety net before handing sources to a GPU API) can catch invalid
//! output with a readable, line-numbered report.

use anyhow::{anyhow, Context, Result};

/// Validate WGSL source using naga's parser and validator.
///
/// Returns the parsed naga Module on success, or an error carrying the
/// numbered source on failure.
pub fn validate_wgsl(source: &str) -> Result<naga::Module> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| anyhow!("WGSL parse failed:\n{}", format_error(source, &e.to_string())))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("WGSL validation failed:\n{}", format_error(source, &e.to_string())))?;
    Ok(module)
}

/// Validate WGSL and note which graph or stage generated it.
pub fn validate_wgsl_with_context(source: &str, context: &str) -> Result<naga::Module> {
    validate_wgsl(source).with_context(|| format!("{context} generated invalid WGSL"))
}

/// Pipeline stage a GLSL source targets; naga's GLSL frontend needs it.
#[derive(Debug, Clone, Copy)]
pub enum GlslStage {
    Vertex,
    Fragment,
}

/// Validate GLSL source using naga's GLSL frontend.
pub fn validate_glsl(source: &str, stage: GlslStage) -> Result<naga::Module> {
    let shader_stage = match stage {
        GlslStage::Vertex => naga::ShaderStage::Vertex,
        GlslStage::Fragment => naga::ShaderStage::Fragment,
    };

    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options {
        stage: shader_stage,
        defines: Default::default(),
    };

    let module = frontend
        .parse(&options, source)
        .map_err(|e| anyhow!("GLSL parse failed:\n{}", format_error(source, &format!("{e:?}"))))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("GLSL validation failed:\n{}", format_error(source, &e.to_string())))?;
    Ok(module)
}

/// Format a validation error with the numbered source attached.
fn format_error(source: &str, error: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("  {error}\n"));
    output.push_str("\nGenerated source:\n---\n");
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");
    output
}
