use pest_derive::Parser;

pub mod ast;
pub mod errors;
pub mod macros;
pub mod parse;
pub mod preprocess;
pub mod render;

mod log;

pub use parse::{parse, parse_file};
pub use render::{RenderOptions, Renderer};

#[derive(Parser)]
#[grammar = "tikz.pest"]
pub struct TikzParser;

/// Render TikZ source to SVG with default document settings.
///
/// Returns the SVG string on success. Only a parse failure is an error;
/// everything downstream degrades instead of failing, so malformed
/// expressions or unknown names still produce a document.
pub fn tikz_to_svg(source: &str) -> Result<String, miette::Report> {
    tikz_to_svg_with(source, RenderOptions::default())
}

/// Render TikZ source to SVG with explicit document settings.
pub fn tikz_to_svg_with(source: &str, opts: RenderOptions) -> Result<String, miette::Report> {
    if !opts.scale.is_finite() || opts.scale <= 0.0 {
        return Err(errors::RenderError::InvalidScale { value: opts.scale }.into());
    }
    let cleaned = preprocess::preprocess(source);
    let expanded = macros::MacroExpander::new().extract_and_expand(&cleaned);
    let picture = parse::parse(&expanded)?;
    Ok(Renderer::new(opts).convert(&picture))
}
