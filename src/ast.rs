//! Abstract Syntax Tree types for the TikZ subset
//!
//! The parser produces a [`Picture`] holding a flat list of statements.
//! Coordinate components stay as raw expression strings (`"2*\r"`, `"90"`);
//! nothing is evaluated until render time, when loop variables and macros
//! are in scope.

use std::collections::HashMap;

/// A parsed `tikzpicture` environment (or a bare statement list)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Picture {
    pub options: OptionMap,
    pub statements: Vec<Statement>,
}

/// A top-level TikZ statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Path-drawing command: \draw, \fill, \filldraw, \clip
    Draw(DrawStatement),
    /// Standalone node: \node (name) at (pos) {text};
    Node(NodeStatement),
    /// Named point definition: \coordinate (name) at (pos);
    CoordinateDef(CoordinateDef),
    /// Option scope: \begin{scope}[...] ... \end{scope}
    Scope(Scope),
    /// Loop: \foreach \i in {...} { ... }
    Foreach(ForeachLoop),
    /// Computed macro: \pgfmathsetmacro{\name}{expr}
    MacroDef(MacroDef),
    /// Layer environment: \begin{pgfonlayer}{name} ... \end{pgfonlayer}
    Layer(Layer),
    /// \pgfdeclarelayer{name}
    LayerDecl(LayerDecl),
    /// \pgfsetlayers{a,b,main}
    LayerSet(LayerSet),
    /// Style definitions: \tikzset{name/.style={...}}
    StyleDef(StyleDef),
}

/// A drawing command with its options and path
#[derive(Debug, Clone, PartialEq)]
pub struct DrawStatement {
    pub command: DrawCommand,
    pub options: OptionMap,
    pub path: Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCommand {
    Draw,
    Fill,
    FillDraw,
    Clip,
}

impl DrawCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            DrawCommand::Draw => "draw",
            DrawCommand::Fill => "fill",
            DrawCommand::FillDraw => "filldraw",
            DrawCommand::Clip => "clip",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub segments: Vec<PathSegment>,
}

/// One step of a path walk
///
/// `destination` is absent for `cycle`. Modifier operations (circle, arc)
/// appear as their own segments right after the element they attach to.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub op: PathOp,
    pub destination: Option<Coordinate>,
    /// Inline `coordinate (name)` label on this element
    pub coord_label: Option<String>,
    /// Inline `node {...}` label on this element
    pub node_label: Option<InlineNode>,
}

impl PathSegment {
    pub fn new(op: PathOp, destination: Option<Coordinate>) -> Self {
        PathSegment {
            op,
            destination,
            coord_label: None,
            node_label: None,
        }
    }
}

/// Path operation connecting or decorating elements
#[derive(Debug, Clone, PartialEq)]
pub enum PathOp {
    /// First element of a path
    Start,
    /// Adjacent elements with no connector between them
    Move,
    /// `--`
    Line,
    /// `..`
    Curve,
    /// `|-`
    HorizThenVert,
    /// `-|`
    VertThenHoriz,
    /// `rectangle`
    Rectangle,
    /// `grid`
    Grid,
    /// `cycle`
    Cycle,
    /// `circle (radius)` attached to the previous element
    Circle { radius: String },
    /// `arc (start:end:radius)` or `arc [start angle=..., ...]`
    Arc(ArcSpec),
    /// `.. controls (c1) and (c2) ..`
    Controls { points: Vec<Coordinate> },
}

/// Arc parameters, kept raw until resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ArcSpec {
    pub start_angle: String,
    pub end_angle: String,
    pub radius: String,
}

/// A `node {...}` appearing inside a path
#[derive(Debug, Clone, PartialEq)]
pub struct InlineNode {
    pub name: Option<String>,
    pub text: String,
    pub options: OptionMap,
}

/// A standalone `\node` statement
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStatement {
    pub name: Option<String>,
    pub position: Option<Coordinate>,
    pub text: String,
    pub options: OptionMap,
}

/// `\coordinate (name) at (pos);`
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateDef {
    pub name: String,
    pub position: Option<Coordinate>,
    pub options: OptionMap,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    pub options: OptionMap,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeachLoop {
    /// Variable names without the leading backslash
    pub variables: Vec<String>,
    pub values: Vec<ForeachValue>,
    pub evaluate: Option<EvaluateClause>,
    pub body: Vec<Statement>,
}

/// One entry of a foreach value list, after `...` range expansion
#[derive(Debug, Clone, PartialEq)]
pub enum ForeachValue {
    Num(f64),
    Str(String),
    /// Slash-separated tuple for multi-variable loops (`0/a, 1/b`)
    Tuple(Vec<String>),
}

/// `evaluate=\i as \y using <expr>` on a foreach loop
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluateClause {
    pub source: String,
    pub target: String,
    pub expression: String,
}

/// `\pgfmathsetmacro{\name}{body}`
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDef {
    pub name: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerDecl {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerSet {
    pub layers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDef {
    pub styles: HashMap<String, OptionMap>,
}

/// A coordinate as written in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub system: CoordSystem,
    /// `[x, y]` for cartesian, `[angle, radius]` for polar, empty for named
    pub values: Vec<String>,
    /// Referenced name for [`CoordSystem::Named`]
    pub name: Option<String>,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordSystem {
    Cartesian,
    Polar,
    Named,
    Relative,
}

/// Relative-coordinate detail: which prefix operator was used and what the
/// inner coordinate form was
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifiers {
    pub operator: Option<RelOp>,
    pub inner_system: Option<CoordSystem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    /// `++` moves the cursor to the resolved point
    Persist,
    /// `+` leaves the cursor where it was
    Once,
}

impl Coordinate {
    pub fn cartesian(x: impl Into<String>, y: impl Into<String>) -> Self {
        Coordinate {
            system: CoordSystem::Cartesian,
            values: vec![x.into(), y.into()],
            name: None,
            modifiers: Modifiers::default(),
        }
    }

    pub fn polar(angle: impl Into<String>, radius: impl Into<String>) -> Self {
        Coordinate {
            system: CoordSystem::Polar,
            values: vec![angle.into(), radius.into()],
            name: None,
            modifiers: Modifiers::default(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Coordinate {
            system: CoordSystem::Named,
            values: Vec::new(),
            name: Some(name.into()),
            modifiers: Modifiers::default(),
        }
    }

    pub fn relative(inner: Coordinate, op: RelOp) -> Self {
        Coordinate {
            system: CoordSystem::Relative,
            values: inner.values,
            name: inner.name,
            modifiers: Modifiers {
                operator: Some(op),
                inner_system: Some(inner.system),
            },
        }
    }

    /// Whether the cursor should advance past this coordinate. Only the
    /// one-shot `+` prefix leaves the cursor in place.
    pub fn advances_cursor(&self) -> bool {
        !(self.system == CoordSystem::Relative && self.modifiers.operator == Some(RelOp::Once))
    }
}

pub type OptionMap = HashMap<String, OptionValue>;

/// Value of one option key
///
/// Flags (`thick`, `->`) carry no value; nested `/.style` definitions carry
/// a whole option map.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Flag,
    Str(String),
    Num(f64),
    Map(OptionMap),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Num(n) => Some(*n),
            OptionValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
