//! SVG rendering for parsed pictures
//!
//! This module is organized into submodules:
//! - `defaults`: Default sizes and settings
//! - `context`: EvalContext scope chain for variables and coordinates
//! - `eval`: Expression evaluation and option processing
//! - `geometry`: The drawing-space to render-space transform
//! - `resolve`: Coordinate resolution against the transform and context
//! - `path`: Path-segment walking and SVG path data
//! - `style`: Option-map to style-string conversion
//! - `text`: Inline math detection for node text
//! - `foreach`: Statement-level loop expansion

pub mod context;
pub mod defaults;
pub mod eval;
pub mod foreach;
pub mod geometry;
pub mod path;
pub mod resolve;
pub mod style;
pub mod text;

pub use context::EvalContext;

use std::collections::HashMap;

use glam::DVec2;

use crate::ast::*;
use crate::log::debug;
use crate::render::context::Value;
use crate::render::geometry::Transform;
use crate::render::resolve::{NamedPoints, Resolver};

/// Output document settings.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Pixels per drawing unit.
    pub scale: f64,
    pub width: u32,
    pub height: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scale: defaults::SCALE,
            width: defaults::CANVAS_WIDTH,
            height: defaults::CANVAS_HEIGHT,
        }
    }
}

/// Walks a picture's statements and serializes the SVG document.
///
/// Carries all run-scoped state: the evaluation context chain, the
/// named-point table (global to the run, last write wins), registered
/// styles and declared layers. Not meant to be reused across pictures.
pub struct Renderer {
    opts: RenderOptions,
    transform: Transform,
    pub(crate) ctx: EvalContext,
    names: NamedPoints,
    styles: HashMap<String, OptionMap>,
    layer_order: Vec<String>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

impl Renderer {
    pub fn new(opts: RenderOptions) -> Self {
        let transform = Transform {
            scale: opts.scale,
            offset_x: f64::from(opts.width / 2),
            offset_y: f64::from(opts.height / 2),
        };
        Self {
            opts,
            transform,
            ctx: EvalContext::new(),
            names: NamedPoints::new(),
            styles: HashMap::new(),
            layer_order: Vec::new(),
        }
    }

    /// Render a picture to a complete SVG document.
    pub fn convert(&mut self, picture: &Picture) -> String {
        self.register_styles(&picture.options);

        let mut elements = Vec::new();
        if has_arrows(&picture.statements) {
            elements.push(arrow_markers().to_string());
        }

        for stmt in &picture.statements {
            if let Some(element) = self.visit_statement(stmt) {
                elements.push(element);
            }
        }

        let content = elements.join("\n  ");
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n  {content}\n</svg>",
            w = self.opts.width,
            h = self.opts.height,
        )
    }

    pub(crate) fn visit_statement(&mut self, stmt: &Statement) -> Option<String> {
        match stmt {
            Statement::Draw(draw) => Some(self.visit_draw(draw)),
            Statement::Node(node) => Some(self.visit_node(node)),
            Statement::CoordinateDef(def) => {
                self.visit_coordinate_def(def);
                None
            }
            Statement::Scope(scope) => self.visit_scope(scope),
            Statement::Foreach(stmt) => {
                let elements = foreach::expand(self, stmt);
                (!elements.is_empty()).then(|| elements.join("\n  "))
            }
            Statement::MacroDef(def) => {
                self.visit_macro_def(def);
                None
            }
            Statement::Layer(layer) => self.visit_layer(layer),
            Statement::LayerDecl(_decl) => {
                debug!(name = _decl.name.as_str(), "layer declared");
                None
            }
            Statement::LayerSet(set) => {
                self.layer_order = set.layers.clone();
                None
            }
            Statement::StyleDef(def) => {
                self.styles.extend(def.styles.clone());
                None
            }
        }
    }

    fn visit_draw(&mut self, stmt: &DrawStatement) -> String {
        let rendered =
            path::render_path(&stmt.path, &self.transform, &self.ctx, &mut self.names);

        let evaluated = eval::process_options(&stmt.options, &self.ctx);
        let style = style::convert(&evaluated, stmt.command);

        let mut markers = String::new();
        if has_flag(&stmt.options, &["<-", "<->"]) {
            markers.push_str(" marker-start=\"url(#arrow-start)\"");
        }
        if has_flag(&stmt.options, &["->", "<->"]) {
            markers.push_str(" marker-end=\"url(#arrow-end)\"");
        }

        let mut out = format!("<path d=\"{}\" style=\"{style}\"{markers}/>", rendered.data);

        // Inline node labels inherit the draw statement's options, with
        // the node's own options layered on top.
        for (point, node) in &rendered.nodes {
            let mut merged = stmt.options.clone();
            merged.extend(node.options.clone());
            if let Some(name) = &node.name {
                let name = eval::eval_string(name, &self.ctx);
                self.names.insert(name, *point);
            }
            out.push_str("\n  ");
            out.push_str(&self.text_element(*point, &node.text, &merged));
        }

        out
    }

    fn visit_node(&mut self, node: &NodeStatement) -> String {
        let point = match &node.position {
            Some(position) => {
                Resolver::new(&self.transform, &self.ctx, &self.names).resolve(position, None)
            }
            None => self.transform.origin(),
        };

        if let Some(name) = &node.name {
            // Names may embed loop variables, e.g. "p\i".
            let name = eval::eval_string(name, &self.ctx);
            self.names.insert(name, point);
        }

        self.text_element(point, &node.text, &node.options)
    }

    fn text_element(&self, point: DVec2, text: &str, options: &OptionMap) -> String {
        let style = style::convert_text_style(options);
        let (anchor, baseline) = text_anchors(options);
        let content = if text::has_math(text) {
            let (plain, _typeset) = text::render(text);
            plain
        } else {
            text.to_string()
        };
        format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" style=\"{style}\" text-anchor=\"{anchor}\" dominant-baseline=\"{baseline}\">{content}</text>",
            point.x, point.y
        )
    }

    fn visit_coordinate_def(&mut self, def: &CoordinateDef) {
        if let Some(position) = &def.position {
            let point =
                Resolver::new(&self.transform, &self.ctx, &self.names).resolve(position, None);
            let name = eval::eval_string(&def.name, &self.ctx);
            self.names.insert(name, point);
        }
    }

    fn visit_scope(&mut self, scope: &Scope) -> Option<String> {
        let mut elements = Vec::new();
        for stmt in &scope.statements {
            if let Some(element) = self.visit_statement(stmt) {
                elements.push(element);
            }
        }
        if elements.is_empty() {
            return None;
        }

        // Scope options style the group wrapper only; they are not
        // consulted by child statements' own option resolution.
        let style = style::convert(&scope.options, DrawCommand::Draw);
        let content = elements.join("\n    ");
        Some(format!("<g style=\"{style}\">\n    {content}\n  </g>"))
    }

    fn visit_macro_def(&mut self, def: &MacroDef) {
        match eval::evaluate(&def.body, &self.ctx) {
            Ok(value) => self.ctx.set_variable(&def.name, Value::Num(value)),
            Err(_) => {
                self.ctx.set_variable(&def.name, Value::Str(def.body.clone()));
            }
        }
    }

    fn visit_layer(&mut self, layer: &Layer) -> Option<String> {
        let mut elements = Vec::new();
        for stmt in &layer.statements {
            if let Some(element) = self.visit_statement(stmt) {
                elements.push(element);
            }
        }
        if elements.is_empty() {
            return None;
        }

        // Declared z-order is recorded but output keeps source order.
        let content = elements.join("\n    ");
        Some(format!("<g data-layer=\"{}\">\n    {content}\n  </g>", layer.name))
    }

    /// Look up a registered `name/.style` option map.
    pub fn style(&self, name: &str) -> Option<&OptionMap> {
        self.styles.get(name)
    }

    /// Layer names from the last `\pgfsetlayers` seen, in declared order.
    pub fn layer_order(&self) -> &[String] {
        &self.layer_order
    }

    fn register_styles(&mut self, options: &OptionMap) {
        for (key, value) in options {
            if let OptionValue::Map(map) = value {
                if key.ends_with("/.style") {
                    self.styles.insert(key.clone(), map.clone());
                }
            }
        }
    }
}

fn has_flag(options: &OptionMap, keys: &[&str]) -> bool {
    keys.iter().any(|k| matches!(options.get(*k), Some(OptionValue::Flag)))
}

/// Direction keywords to SVG text attributes. Compound flags like
/// "above right" contribute both an anchor and a baseline.
fn text_anchors(options: &OptionMap) -> (&'static str, &'static str) {
    let mut anchor = "middle";
    let mut baseline = "middle";
    for (key, value) in options {
        if !matches!(value, OptionValue::Flag) {
            continue;
        }
        for word in key.split_whitespace() {
            match word {
                "right" => anchor = "start",
                "left" => anchor = "end",
                "above" => baseline = "auto",
                "below" => baseline = "hanging",
                _ => {}
            }
        }
    }
    (anchor, baseline)
}

fn has_arrows(statements: &[Statement]) -> bool {
    statements.iter().any(|stmt| match stmt {
        Statement::Draw(draw) => has_flag(&draw.options, &["->", "<-", "<->"]),
        Statement::Scope(scope) => has_arrows(&scope.statements),
        Statement::Foreach(stmt) => has_arrows(&stmt.body),
        Statement::Layer(layer) => has_arrows(&layer.statements),
        _ => false,
    })
}

fn arrow_markers() -> &'static str {
    r##"<defs>
    <marker id="arrow-end" viewBox="0 0 10 10" refX="9" refY="5"
            markerWidth="6" markerHeight="6" orient="auto-start-reverse">
      <path d="M 0 0 L 10 5 L 0 10 z" fill="context-stroke"/>
    </marker>
    <marker id="arrow-start" viewBox="0 0 10 10" refX="1" refY="5"
            markerWidth="6" markerHeight="6" orient="auto-start-reverse">
      <path d="M 10 0 L 0 5 L 10 10 z" fill="context-stroke"/>
    </marker>
  </defs>"##
}
