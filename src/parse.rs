//! Parse pest pairs into AST nodes

use std::path::Path as FsPath;

use crate::ast::*;
use crate::errors::ParseError;
use crate::{Rule, TikzParser};
use pest::Parser;
use pest::iterators::Pair;

/// Parse preprocessed TikZ source into a [`Picture`].
pub fn parse(source: &str) -> Result<Picture, miette::Report> {
    let pairs = TikzParser::parse(Rule::program, source).map_err(ParseError::from)?;

    // Several environments concatenate into one picture; later global
    // options extend (and on key collision override) earlier ones.
    let mut picture = Picture::default();
    for pair in pairs {
        if pair.as_rule() == Rule::program {
            for inner in pair.into_inner() {
                match inner.as_rule() {
                    Rule::picture => {
                        let parsed = parse_picture(inner)?;
                        picture.options.extend(parsed.options);
                        picture.statements.extend(parsed.statements);
                    }
                    Rule::statement => picture.statements.push(parse_statement(inner)?),
                    Rule::EOI => {}
                    _ => {}
                }
            }
        }
    }
    Ok(picture)
}

/// Parse a file from disk. Preprocessing and macro expansion are the
/// caller's job; this is the raw grammar entry point.
pub fn parse_file(path: impl AsRef<FsPath>) -> Result<Picture, miette::Report> {
    let source = std::fs::read_to_string(path.as_ref())
        .map_err(|e| miette::miette!("cannot read {}: {e}", path.as_ref().display()))?;
    parse(&source)
}

fn parse_picture(pair: Pair<Rule>) -> Result<Picture, miette::Report> {
    let mut picture = Picture::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::options => picture.options = parse_options(inner)?,
            Rule::statement => picture.statements.push(parse_statement(inner)?),
            _ => {}
        }
    }
    Ok(picture)
}

fn parse_statement(pair: Pair<Rule>) -> Result<Statement, miette::Report> {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::draw_stmt => Ok(Statement::Draw(parse_draw(inner, DrawCommand::Draw)?)),
        Rule::fill_stmt => Ok(Statement::Draw(parse_draw(inner, DrawCommand::Fill)?)),
        Rule::filldraw_stmt => Ok(Statement::Draw(parse_draw(inner, DrawCommand::FillDraw)?)),
        Rule::clip_stmt => Ok(Statement::Draw(parse_draw(inner, DrawCommand::Clip)?)),
        Rule::node_stmt => Ok(Statement::Node(parse_node_stmt(inner)?)),
        Rule::coordinate_stmt => Ok(Statement::CoordinateDef(parse_coordinate_stmt(inner)?)),
        Rule::scope_env => Ok(Statement::Scope(parse_scope(inner)?)),
        Rule::layer_env => Ok(Statement::Layer(parse_layer_env(inner)?)),
        Rule::foreach_stmt => Ok(Statement::Foreach(parse_foreach(inner)?)),
        Rule::macro_stmt => Ok(Statement::MacroDef(parse_macro_stmt(inner)?)),
        Rule::layer_decl => Ok(Statement::LayerDecl(parse_layer_decl(inner))),
        Rule::layer_set => Ok(Statement::LayerSet(parse_layer_set(inner))),
        Rule::style_def => Ok(Statement::StyleDef(parse_style_def(inner)?)),
        _ => Err(miette::miette!(
            "Unexpected rule in statement: {:?}",
            inner.as_rule()
        )),
    }
}

fn parse_draw(pair: Pair<Rule>, command: DrawCommand) -> Result<DrawStatement, miette::Report> {
    let mut options = OptionMap::new();
    let mut path = Path::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::options => options = parse_options(inner)?,
            Rule::path => path = parse_path(inner)?,
            _ => {}
        }
    }
    Ok(DrawStatement {
        command,
        options,
        path,
    })
}

// ============================================================================
// Paths
// ============================================================================

/// A path element before segment assembly: the coordinate plus anything
/// attached to it.
struct Element {
    coord: Coordinate,
    coord_label: Option<String>,
    node_label: Option<InlineNode>,
    modifier: Option<PathOp>,
}

enum PathItem {
    Connector(PathOp),
    Element(Element),
    Cycle,
}

fn parse_path(pair: Pair<Rule>) -> Result<Path, miette::Report> {
    let mut items = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::path_connector => items.push(PathItem::Connector(parse_connector(inner)?)),
            Rule::path_element => items.push(parse_path_element(inner)?),
            Rule::path_foreach => items.extend(expand_inline_foreach(inner)?),
            _ => {}
        }
    }
    Ok(assemble_path(items))
}

/// Turn a flat connector/element stream into segments. The first element
/// becomes [`PathOp::Start`]; adjacent elements with no connector between
/// them become moves; a trailing modifier gets its own segment.
fn assemble_path(items: Vec<PathItem>) -> Path {
    let mut segments = Vec::new();
    let mut have_current = false;
    let mut pending: Option<PathOp> = None;

    for item in items {
        match item {
            PathItem::Connector(op) => pending = Some(op),
            PathItem::Cycle => segments.push(PathSegment::new(PathOp::Cycle, None)),
            PathItem::Element(el) => {
                let op = if !have_current {
                    PathOp::Start
                } else {
                    pending.take().unwrap_or(PathOp::Move)
                };
                let mut seg = PathSegment::new(op, Some(el.coord.clone()));
                seg.coord_label = el.coord_label;
                seg.node_label = el.node_label;
                segments.push(seg);
                if let Some(modifier) = el.modifier {
                    segments.push(PathSegment::new(modifier, Some(el.coord)));
                }
                have_current = true;
                pending = None;
            }
        }
    }
    Path { segments }
}

fn parse_connector(pair: Pair<Rule>) -> Result<PathOp, miette::Report> {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::line_to => Ok(PathOp::Line),
        Rule::curve_to => Ok(PathOp::Curve),
        Rule::horiz_vert => Ok(PathOp::HorizThenVert),
        Rule::vert_horiz => Ok(PathOp::VertThenHoriz),
        Rule::rectangle_op => Ok(PathOp::Rectangle),
        Rule::grid_op => Ok(PathOp::Grid),
        Rule::controls_connector => {
            let mut points = Vec::new();
            for p in inner.into_inner() {
                if p.as_rule() == Rule::coordinate {
                    points.push(parse_coordinate(p)?);
                }
            }
            Ok(PathOp::Controls { points })
        }
        _ => Err(miette::miette!(
            "Unexpected rule in connector: {:?}",
            inner.as_rule()
        )),
    }
}

fn parse_path_element(pair: Pair<Rule>) -> Result<PathItem, miette::Report> {
    let mut coord = None;
    let mut coord_label = None;
    let mut node_label = None;
    let mut modifier = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::cycle_op => return Ok(PathItem::Cycle),
            Rule::coordinate => coord = Some(parse_coordinate(inner)?),
            Rule::element_suffix => {
                let suffix = inner.into_inner().next().unwrap();
                match suffix.as_rule() {
                    Rule::coord_label => coord_label = Some(parse_coord_label(suffix)),
                    Rule::node_label => node_label = Some(parse_inline_node(suffix)?),
                    Rule::circle_mod => modifier = Some(parse_circle_mod(suffix)),
                    Rule::arc_mod => modifier = Some(parse_arc_mod(suffix)?),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    let coord = coord.ok_or_else(|| miette::miette!("path element without coordinate"))?;
    Ok(PathItem::Element(Element {
        coord,
        coord_label,
        node_label,
        modifier,
    }))
}

fn parse_coord_label(pair: Pair<Rule>) -> String {
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::paren_name {
            return paren_name_text(inner);
        }
    }
    String::new()
}

fn parse_inline_node(pair: Pair<Rule>) -> Result<InlineNode, miette::Report> {
    let mut name = None;
    let mut options = OptionMap::new();
    let mut text = String::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::options => options = parse_options(inner)?,
            Rule::paren_name => name = Some(paren_name_text(inner)),
            Rule::text_block => text = text_block_content(inner),
            _ => {}
        }
    }
    Ok(InlineNode {
        name,
        text,
        options,
    })
}

fn parse_circle_mod(pair: Pair<Rule>) -> PathOp {
    let radius = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::radius_value)
        .map(|p| p.as_str().trim().to_string())
        .unwrap_or_else(|| "1".to_string());
    PathOp::Circle { radius }
}

fn parse_arc_mod(pair: Pair<Rule>) -> Result<PathOp, miette::Report> {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::arc_paren => {
            let values: Vec<String> = inner
                .into_inner()
                .filter(|p| p.as_rule() == Rule::arc_value)
                .map(|p| p.as_str().trim().to_string())
                .collect();
            if values.len() != 3 {
                return Err(miette::miette!("arc needs (start:end:radius)"));
            }
            Ok(PathOp::Arc(ArcSpec {
                start_angle: values[0].clone(),
                end_angle: values[1].clone(),
                radius: values[2].clone(),
            }))
        }
        Rule::arc_bracket => {
            let mut spec = ArcSpec {
                start_angle: "0".to_string(),
                end_angle: "0".to_string(),
                radius: "1".to_string(),
            };
            for p in inner.into_inner() {
                if p.as_rule() == Rule::options {
                    let map = parse_options(p)?;
                    if let Some(v) = option_text(&map, "start angle") {
                        spec.start_angle = v;
                    }
                    if let Some(v) = option_text(&map, "end angle") {
                        spec.end_angle = v;
                    }
                    if let Some(v) = option_text(&map, "radius") {
                        spec.radius = v;
                    }
                }
            }
            Ok(PathOp::Arc(spec))
        }
        _ => Err(miette::miette!(
            "Unexpected rule in arc: {:?}",
            inner.as_rule()
        )),
    }
}

fn option_text(map: &OptionMap, key: &str) -> Option<String> {
    match map.get(key)? {
        OptionValue::Num(n) => Some(fmt_number(*n)),
        OptionValue::Str(s) => Some(s.clone()),
        _ => None,
    }
}

// ============================================================================
// Inline foreach in paths
// ============================================================================

/// Expand `\foreach` inside a path at parse time by textually substituting
/// each loop value into the body's coordinates.
fn expand_inline_foreach(pair: Pair<Rule>) -> Result<Vec<PathItem>, miette::Report> {
    let mut variables = Vec::new();
    let mut values = Vec::new();
    let mut body: Vec<(Option<PathOp>, Pair<Rule>)> = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::foreach_vars => variables = parse_foreach_vars(inner),
            Rule::foreach_values => values = parse_foreach_values(inner),
            // The evaluate clause needs render-time math and is ignored in
            // parse-time expansion.
            Rule::foreach_opts => {}
            Rule::inline_path_items => {
                let mut pending = None;
                for item in inner.into_inner() {
                    match item.as_rule() {
                        Rule::path_connector => pending = Some(parse_connector(item)?),
                        Rule::path_element => body.push((pending.take(), item)),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    let mut expanded = Vec::new();
    for value in &values {
        let var_map = bind_values(&variables, value);
        for (connector, element_pair) in &body {
            if let Some(op) = connector {
                expanded.push(PathItem::Connector(op.clone()));
            }
            let item = parse_path_element(element_pair.clone())?;
            expanded.push(substitute_item(item, &var_map));
        }
    }
    Ok(expanded)
}

fn bind_values(variables: &[String], value: &ForeachValue) -> Vec<(String, String)> {
    match value {
        ForeachValue::Tuple(parts) => variables
            .iter()
            .zip(parts.iter())
            .map(|(var, part)| (var.clone(), part.clone()))
            .collect(),
        other => match variables.first() {
            Some(var) => vec![(var.clone(), foreach_value_text(other))],
            None => Vec::new(),
        },
    }
}

fn foreach_value_text(value: &ForeachValue) -> String {
    match value {
        ForeachValue::Num(n) => fmt_number(*n),
        ForeachValue::Str(s) => s.clone(),
        ForeachValue::Tuple(parts) => parts.join("/"),
    }
}

fn substitute_item(item: PathItem, var_map: &[(String, String)]) -> PathItem {
    match item {
        PathItem::Element(mut el) => {
            for value in &mut el.coord.values {
                *value = substitute_vars(value, var_map);
            }
            if let Some(name) = &el.coord.name {
                el.coord.name = Some(substitute_vars(name, var_map));
            }
            if let Some(label) = &el.coord_label {
                el.coord_label = Some(substitute_vars(label, var_map));
            }
            PathItem::Element(el)
        }
        other => other,
    }
}

/// Replace `\var` references with their bound values, leaving unknown
/// commands alone.
fn substitute_vars(expr: &str, var_map: &[(String, String)]) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut rest = expr;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let len = tail
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .map(char::len_utf8)
            .sum::<usize>();
        let name = &tail[..len];
        match var_map.iter().find(|(var, _)| var == name) {
            Some((_, value)) if len > 0 => out.push_str(value),
            _ => {
                out.push('\\');
                out.push_str(name);
            }
        }
        rest = &tail[len..];
    }
    out.push_str(rest);
    out
}

// ============================================================================
// Coordinates
// ============================================================================

fn parse_coordinate(pair: Pair<Rule>) -> Result<Coordinate, miette::Report> {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::abs_coordinate => parse_abs_coordinate(inner),
        Rule::rel_coordinate => {
            let mut op = RelOp::Persist;
            let mut coord = None;
            for p in inner.into_inner() {
                match p.as_rule() {
                    Rule::rel_op => {
                        op = if p.as_str() == "++" {
                            RelOp::Persist
                        } else {
                            RelOp::Once
                        };
                    }
                    Rule::abs_coordinate => coord = Some(parse_abs_coordinate(p)?),
                    _ => {}
                }
            }
            let coord =
                coord.ok_or_else(|| miette::miette!("relative coordinate without body"))?;
            Ok(Coordinate::relative(coord, op))
        }
        _ => Err(miette::miette!(
            "Unexpected rule in coordinate: {:?}",
            inner.as_rule()
        )),
    }
}

fn parse_abs_coordinate(pair: Pair<Rule>) -> Result<Coordinate, miette::Report> {
    let body = pair.into_inner().next().unwrap();
    let body = body.into_inner().next().unwrap();
    match body.as_rule() {
        Rule::cartesian_body => {
            let values: Vec<String> = body
                .into_inner()
                .filter(|p| p.as_rule() == Rule::coord_value)
                .map(|p| p.as_str().trim().to_string())
                .collect();
            if values.len() != 2 {
                return Err(miette::miette!("cartesian coordinate needs (x,y)"));
            }
            Ok(Coordinate::cartesian(values[0].clone(), values[1].clone()))
        }
        Rule::polar_body => {
            let values: Vec<String> = body
                .into_inner()
                .filter(|p| p.as_rule() == Rule::coord_value)
                .map(|p| p.as_str().trim().to_string())
                .collect();
            if values.len() != 2 {
                return Err(miette::miette!("polar coordinate needs (angle:radius)"));
            }
            Ok(Coordinate::polar(values[0].clone(), values[1].clone()))
        }
        Rule::named_body => {
            // Anchor suffixes are accepted but resolution uses the base
            // point, so only the name is kept.
            let name = body
                .into_inner()
                .find(|p| p.as_rule() == Rule::coord_name)
                .map(|p| p.as_str().trim().to_string())
                .unwrap_or_default();
            Ok(Coordinate::named(name))
        }
        _ => Err(miette::miette!(
            "Unexpected rule in coordinate body: {:?}",
            body.as_rule()
        )),
    }
}

// ============================================================================
// Statements
// ============================================================================

fn parse_node_stmt(pair: Pair<Rule>) -> Result<NodeStatement, miette::Report> {
    let mut node = NodeStatement {
        name: None,
        position: None,
        text: String::new(),
        options: OptionMap::new(),
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::options => node.options.extend(parse_options(inner)?),
            Rule::paren_name => node.name = Some(paren_name_text(inner)),
            Rule::at_coordinate => {
                for p in inner.into_inner() {
                    if p.as_rule() == Rule::coordinate {
                        node.position = Some(parse_coordinate(p)?);
                    }
                }
            }
            Rule::text_block => node.text = text_block_content(inner),
            _ => {}
        }
    }
    Ok(node)
}

fn parse_coordinate_stmt(pair: Pair<Rule>) -> Result<CoordinateDef, miette::Report> {
    let mut def = CoordinateDef {
        name: String::new(),
        position: None,
        options: OptionMap::new(),
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::options => def.options = parse_options(inner)?,
            Rule::paren_name => def.name = paren_name_text(inner),
            Rule::at_coordinate => {
                for p in inner.into_inner() {
                    if p.as_rule() == Rule::coordinate {
                        def.position = Some(parse_coordinate(p)?);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(def)
}

fn parse_scope(pair: Pair<Rule>) -> Result<Scope, miette::Report> {
    let mut scope = Scope::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::options => scope.options = parse_options(inner)?,
            Rule::statement => scope.statements.push(parse_statement(inner)?),
            _ => {}
        }
    }
    Ok(scope)
}

fn parse_layer_env(pair: Pair<Rule>) -> Result<Layer, miette::Report> {
    let mut layer = Layer {
        name: String::new(),
        statements: Vec::new(),
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => layer.name = inner.as_str().to_string(),
            Rule::statement => layer.statements.push(parse_statement(inner)?),
            _ => {}
        }
    }
    Ok(layer)
}

fn parse_macro_stmt(pair: Pair<Rule>) -> Result<MacroDef, miette::Report> {
    let mut name = String::new();
    let mut body = String::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => name = strip_backslash(inner.as_str()),
            Rule::macro_body => body = inner.as_str().trim().to_string(),
            _ => {}
        }
    }
    Ok(MacroDef { name, body })
}

fn parse_layer_decl(pair: Pair<Rule>) -> LayerDecl {
    let name = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::ident)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    LayerDecl { name }
}

fn parse_layer_set(pair: Pair<Rule>) -> LayerSet {
    let mut layers = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::ident_list {
            layers = inner
                .into_inner()
                .filter(|p| p.as_rule() == Rule::ident)
                .map(|p| p.as_str().to_string())
                .collect();
        }
    }
    LayerSet { layers }
}

fn parse_style_def(pair: Pair<Rule>) -> Result<StyleDef, miette::Report> {
    let mut def = StyleDef::default();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::style_assignments {
            for assignment in inner.into_inner() {
                if assignment.as_rule() == Rule::style_assignment {
                    let mut name = String::new();
                    let mut options = OptionMap::new();
                    for p in assignment.into_inner() {
                        match p.as_rule() {
                            Rule::style_path => name = p.as_str().to_string(),
                            Rule::option_list => options = parse_option_list(p)?,
                            _ => {}
                        }
                    }
                    def.styles.insert(name, options);
                }
            }
        }
    }
    Ok(def)
}

// ============================================================================
// Foreach
// ============================================================================

fn parse_foreach(pair: Pair<Rule>) -> Result<ForeachLoop, miette::Report> {
    let mut fl = ForeachLoop {
        variables: Vec::new(),
        values: Vec::new(),
        evaluate: None,
        body: Vec::new(),
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::foreach_vars => fl.variables = parse_foreach_vars(inner),
            Rule::foreach_opts => fl.evaluate = Some(parse_evaluate_clause(inner)),
            Rule::foreach_values => fl.values = parse_foreach_values(inner),
            Rule::foreach_body => {
                for p in inner.into_inner() {
                    if p.as_rule() == Rule::statement {
                        fl.body.push(parse_statement(p)?);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(fl)
}

fn parse_foreach_vars(pair: Pair<Rule>) -> Vec<String> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::variable)
        .map(|p| strip_backslash(p.as_str()))
        .collect()
}

fn parse_evaluate_clause(pair: Pair<Rule>) -> EvaluateClause {
    let mut clause = EvaluateClause {
        source: String::new(),
        target: String::new(),
        expression: String::new(),
    };
    let mut vars_seen = 0;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => {
                if vars_seen == 0 {
                    clause.source = strip_backslash(inner.as_str());
                } else {
                    clause.target = strip_backslash(inner.as_str());
                }
                vars_seen += 1;
            }
            Rule::using_expr => clause.expression = inner.as_str().trim().to_string(),
            _ => {}
        }
    }
    clause
}

enum RawItem {
    Dots,
    Value(ForeachValue),
}

fn parse_foreach_values(pair: Pair<Rule>) -> Vec<ForeachValue> {
    let mut raw = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::foreach_item {
            let item = inner.into_inner().next();
            match item {
                Some(p) if p.as_rule() == Rule::dots => raw.push(RawItem::Dots),
                Some(p) if p.as_rule() == Rule::foreach_value => {
                    raw.push(RawItem::Value(parse_foreach_value(p)));
                }
                _ => {}
            }
        }
    }
    expand_ranges(raw)
}

fn parse_foreach_value(pair: Pair<Rule>) -> ForeachValue {
    let tokens: Vec<String> = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::value_token)
        .map(|p| p.as_str().trim().to_string())
        .collect();
    if tokens.len() > 1 {
        ForeachValue::Tuple(tokens)
    } else {
        let token = tokens.into_iter().next().unwrap_or_default();
        match token.parse::<f64>() {
            Ok(n) => ForeachValue::Num(n),
            Err(_) => ForeachValue::Str(token),
        }
    }
}

/// Expand `...` range notation: `{a,...,b}` steps by 1 (or -1 downward),
/// `{a,a2,...,b}` steps by `a2 - a`. An epsilon keeps float accumulation
/// from dropping the final value.
fn expand_ranges(items: Vec<RawItem>) -> Vec<ForeachValue> {
    let dots_idx = items.iter().position(|i| matches!(i, RawItem::Dots));

    let Some(idx) = dots_idx else {
        return items
            .into_iter()
            .filter_map(|i| match i {
                RawItem::Value(v) => Some(v),
                RawItem::Dots => None,
            })
            .collect();
    };

    let numeric = |i: usize| -> Option<f64> {
        match items.get(i)? {
            RawItem::Value(ForeachValue::Num(n)) => Some(*n),
            RawItem::Value(ForeachValue::Str(s)) => s.trim().parse().ok(),
            _ => None,
        }
    };

    let parsed = match idx {
        1 => numeric(0).zip(numeric(2)).map(|(start, end)| {
            let step = if end >= start { 1.0 } else { -1.0 };
            (start, end, step)
        }),
        2 => numeric(0)
            .zip(numeric(1))
            .zip(numeric(3))
            .map(|((start, second), end)| (start, end, second - start)),
        _ => None,
    };

    let Some((start, end, step)) = parsed else {
        return items
            .into_iter()
            .filter_map(|i| match i {
                RawItem::Value(v) => Some(v),
                RawItem::Dots => None,
            })
            .collect();
    };

    let mut values = Vec::new();
    if step > 0.0 {
        let mut current = start;
        while current <= end + 1e-10 {
            values.push(ForeachValue::Num(current));
            current += step;
        }
    } else if step < 0.0 {
        let mut current = start;
        while current >= end - 1e-10 {
            values.push(ForeachValue::Num(current));
            current += step;
        }
    } else {
        values.push(ForeachValue::Num(start));
    }
    values
}

// ============================================================================
// Options
// ============================================================================

fn parse_options(pair: Pair<Rule>) -> Result<OptionMap, miette::Report> {
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::option_list {
            return parse_option_list(inner);
        }
    }
    Ok(OptionMap::new())
}

fn parse_option_list(pair: Pair<Rule>) -> Result<OptionMap, miette::Report> {
    let mut map = OptionMap::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::option {
            let opt = inner.into_inner().next().unwrap();
            match opt.as_rule() {
                Rule::flag => {
                    map.insert(opt.as_str().trim().to_string(), OptionValue::Flag);
                }
                Rule::arrow_flag => {
                    map.insert(opt.as_str().to_string(), OptionValue::Flag);
                }
                Rule::key_value => {
                    let mut key = String::new();
                    let mut value = OptionValue::Flag;
                    for p in opt.into_inner() {
                        match p.as_rule() {
                            Rule::option_key => key = p.as_str().trim().to_string(),
                            Rule::option_value => {
                                let raw = p.as_str().trim();
                                value = match raw.parse::<f64>() {
                                    Ok(n) => OptionValue::Num(n),
                                    Err(_) => OptionValue::Str(raw.to_string()),
                                };
                            }
                            _ => {}
                        }
                    }
                    map.insert(key, value);
                }
                Rule::style_opt => {
                    let mut key = String::new();
                    let mut styles = OptionMap::new();
                    for p in opt.into_inner() {
                        match p.as_rule() {
                            Rule::option_key => key = p.as_str().trim().to_string(),
                            Rule::option_list => styles = parse_option_list(p)?,
                            _ => {}
                        }
                    }
                    map.insert(format!("{key}/.style"), OptionValue::Map(styles));
                }
                _ => {}
            }
        }
    }
    Ok(map)
}

// ============================================================================
// Shared helpers
// ============================================================================

fn paren_name_text(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::name_with_vars)
        .map(|p| p.as_str().trim().to_string())
        .unwrap_or_default()
}

fn text_block_content(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::text_content)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

fn strip_backslash(s: &str) -> String {
    s.trim().trim_start_matches('\\').to_string()
}

/// Format a number the way loop substitution needs it: integral floats
/// print without a fractional part so `P\i` becomes `P1`, not `P1.0`.
pub(crate) fn fmt_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
