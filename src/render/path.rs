//! Path rendering: segment lists to SVG path data.

use glam::DVec2;

use crate::ast::{ArcSpec, InlineNode, Path, PathOp};
use crate::log::debug;
use crate::render::context::EvalContext;
use crate::render::defaults::GRID_STEP;
use crate::render::eval;
use crate::render::geometry::Transform;
use crate::render::resolve::{NamedPoints, Resolver};

/// Output of a path walk: the path data string plus any inline node
/// labels encountered along the way, each with its anchor point.
pub struct RenderedPath {
    pub data: String,
    pub nodes: Vec<(DVec2, InlineNode)>,
}

/// Walk a path's segments and build SVG path data.
///
/// Keeps a cursor (the current point) across segments. Inline coordinate
/// labels are written into `names` as the walk passes them, so later
/// segments of the same path can already refer to them by name.
pub fn render_path(
    path: &Path,
    transform: &Transform,
    ctx: &EvalContext,
    names: &mut NamedPoints,
) -> RenderedPath {
    let mut data: Vec<String> = Vec::new();
    let mut nodes: Vec<(DVec2, InlineNode)> = Vec::new();
    let mut current: Option<DVec2> = None;

    for segment in &path.segments {
        // Fresh borrow per segment so label insertion below stays legal.
        let resolver = Resolver::new(transform, ctx, names);
        let label_point: Option<DVec2>;

        match &segment.op {
            PathOp::Cycle => {
                data.push("Z".into());
                label_point = current;
            }
            PathOp::Circle { radius } => {
                let center = match (current, &segment.destination) {
                    (Some(cur), Some(dest)) => resolver.resolve(dest, Some(cur)),
                    (Some(cur), None) => cur,
                    _ => transform.origin(),
                };
                let r = resolver.eval_value(Some(radius)) * transform.scale;
                data.extend(circle_commands(center, r));
                current = Some(center);
                label_point = current;
            }
            PathOp::Arc(spec) => {
                if let Some(cmd) = render_arc(spec, current, &resolver, transform) {
                    data.push(cmd);
                }
                // An arc never moves the cursor.
                label_point = current;
            }
            PathOp::Controls { points } => {
                if let (Some(cur), Some(dest)) = (current, &segment.destination) {
                    let end = resolver.resolve(dest, Some(cur));
                    if let Some(cmd) = bezier_command(end, points, cur, &resolver) {
                        data.push(cmd);
                        current = Some(end);
                    }
                }
                label_point = current;
            }
            op => {
                let Some(dest) = &segment.destination else { continue };
                let p = resolver.resolve(dest, current);

                match op {
                    PathOp::Start | PathOp::Move => {
                        data.push(format!("M {:.2} {:.2}", p.x, p.y));
                    }
                    PathOp::Line => {
                        data.push(format!("L {:.2} {:.2}", p.x, p.y));
                    }
                    PathOp::Curve => {
                        data.push(simple_curve(p, current));
                    }
                    PathOp::HorizThenVert => match current {
                        Some(cur) => {
                            data.push(format!("L {:.2} {:.2}", p.x, cur.y));
                            data.push(format!("L {:.2} {:.2}", p.x, p.y));
                        }
                        None => data.push(format!("L {:.2} {:.2}", p.x, p.y)),
                    },
                    PathOp::VertThenHoriz => match current {
                        Some(cur) => {
                            data.push(format!("L {:.2} {:.2}", cur.x, p.y));
                            data.push(format!("L {:.2} {:.2}", p.x, p.y));
                        }
                        None => data.push(format!("L {:.2} {:.2}", p.x, p.y)),
                    },
                    PathOp::Rectangle => {
                        if let Some(cur) = current {
                            data.push(format!("L {:.2} {:.2}", p.x, cur.y));
                            data.push(format!("L {:.2} {:.2}", p.x, p.y));
                            data.push(format!("L {:.2} {:.2}", cur.x, p.y));
                            data.push("Z".into());
                        }
                    }
                    PathOp::Grid => {
                        if let Some(cur) = current {
                            data.extend(grid_commands(cur, p));
                        } else {
                            debug!("grid without a start corner, skipping");
                        }
                    }
                    _ => data.push(format!("L {:.2} {:.2}", p.x, p.y)),
                }

                if dest.advances_cursor() {
                    current = Some(p);
                }
                label_point = Some(p);
            }
        }

        if let Some(point) = label_point {
            if let Some(label) = &segment.coord_label {
                let name = eval::eval_string(label, ctx);
                names.insert(name, point);
            }
            if let Some(node) = &segment.node_label {
                nodes.push((point, node.clone()));
            }
        }
    }

    RenderedPath { data: data.join(" "), nodes }
}

/// A full circle as M + two half-turn arcs. Starts at the west point.
fn circle_commands(center: DVec2, radius: f64) -> Vec<String> {
    let (cx, cy) = (center.x, center.y);
    vec![
        format!("M {:.2} {:.2}", cx - radius, cy),
        format!("A {:.2} {:.2} 0 1 0 {:.2} {:.2}", radius, radius, cx + radius, cy),
        format!("A {:.2} {:.2} 0 1 0 {:.2} {:.2}", radius, radius, cx - radius, cy),
    ]
}

fn render_arc(
    spec: &ArcSpec,
    current: Option<DVec2>,
    resolver: &Resolver<'_>,
    transform: &Transform,
) -> Option<String> {
    let cur = current?;
    let start = resolver.eval_value(Some(&spec.start_angle));
    let end = resolver.eval_value(Some(&spec.end_angle));
    let radius = resolver.eval_value(Some(&spec.radius)) * transform.scale;

    let (start_rad, end_rad) = (start.to_radians(), end.to_radians());

    // End point is the chord offset from the cursor; y is flipped here
    // directly because the radius is already in render units.
    let end_x = cur.x + radius * (end_rad.cos() - start_rad.cos());
    let end_y = cur.y - radius * (end_rad.sin() - start_rad.sin());

    let large_arc = i32::from((end - start).abs() > 180.0);
    let sweep = i32::from(end > start);

    Some(format!(
        "A {radius:.2} {radius:.2} 0 {large_arc} {sweep} {end_x:.2} {end_y:.2}"
    ))
}

fn bezier_command(
    dest: DVec2,
    controls: &[crate::ast::Coordinate],
    cur: DVec2,
    resolver: &Resolver<'_>,
) -> Option<String> {
    match controls {
        [c1, c2] => {
            let c1 = resolver.resolve(c1, Some(cur));
            let c2 = resolver.resolve(c2, Some(cur));
            Some(format!(
                "C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
                c1.x, c1.y, c2.x, c2.y, dest.x, dest.y
            ))
        }
        [c1] => {
            let c1 = resolver.resolve(c1, Some(cur));
            Some(format!("Q {:.2} {:.2} {:.2} {:.2}", c1.x, c1.y, dest.x, dest.y))
        }
        _ => None,
    }
}

/// `..` without explicit controls: quadratic through the midpoint, which
/// degenerates to a straight line but keeps the curve command shape.
fn simple_curve(dest: DVec2, current: Option<DVec2>) -> String {
    match current {
        Some(cur) => {
            let mid = (cur + dest) / 2.0;
            format!("Q {:.2} {:.2} {:.2} {:.2}", mid.x, mid.y, dest.x, dest.y)
        }
        None => format!("L {:.2} {:.2}", dest.x, dest.y),
    }
}

fn grid_commands(a: DVec2, b: DVec2) -> Vec<String> {
    let (x_start, x_end) = (a.x.min(b.x), a.x.max(b.x));
    let (y_start, y_end) = (a.y.min(b.y), a.y.max(b.y));

    let mut commands = Vec::new();

    let mut x = x_start;
    while x <= x_end + 0.01 {
        commands.push(format!("M {x:.2} {y_start:.2}"));
        commands.push(format!("L {x:.2} {y_end:.2}"));
        x += GRID_STEP;
    }

    let mut y = y_start;
    while y <= y_end + 0.01 {
        commands.push(format!("M {x_start:.2} {y:.2}"));
        commands.push(format!("L {x_end:.2} {y:.2}"));
        y += GRID_STEP;
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Coordinate, PathSegment};

    fn render(path: &Path) -> RenderedPath {
        let transform = Transform::default();
        let ctx = EvalContext::new();
        let mut names = NamedPoints::new();
        render_path(path, &transform, &ctx, &mut names)
    }

    fn seg(op: PathOp, dest: Coordinate) -> PathSegment {
        PathSegment::new(op, Some(dest))
    }

    #[test]
    fn line_between_two_points() {
        let path = Path {
            segments: vec![
                seg(PathOp::Start, Coordinate::cartesian("0", "0")),
                seg(PathOp::Line, Coordinate::cartesian("1", "1")),
            ],
        };
        assert_eq!(render(&path).data, "M 250.00 250.00 L 278.35 221.65");
    }

    #[test]
    fn rectangle_closes() {
        let path = Path {
            segments: vec![
                seg(PathOp::Start, Coordinate::cartesian("0", "0")),
                seg(PathOp::Rectangle, Coordinate::cartesian("1", "1")),
            ],
        };
        assert_eq!(
            render(&path).data,
            "M 250.00 250.00 L 278.35 250.00 L 278.35 221.65 L 250.00 221.65 Z"
        );
    }

    #[test]
    fn rectangle_without_cursor_is_silent() {
        let path = Path {
            segments: vec![seg(PathOp::Rectangle, Coordinate::cartesian("1", "1"))],
        };
        assert_eq!(render(&path).data, "");
    }

    #[test]
    fn circle_as_two_arcs() {
        let path = Path {
            segments: vec![
                seg(PathOp::Start, Coordinate::cartesian("0", "0")),
                seg(PathOp::Circle { radius: "1".into() }, Coordinate::cartesian("0", "0")),
            ],
        };
        let data = render(&path).data;
        assert_eq!(
            data,
            "M 250.00 250.00 \
             M 221.65 250.00 \
             A 28.35 28.35 0 1 0 278.35 250.00 \
             A 28.35 28.35 0 1 0 221.65 250.00"
        );
    }

    #[test]
    fn arc_without_cursor_emits_nothing() {
        let spec = ArcSpec {
            start_angle: "0".into(),
            end_angle: "90".into(),
            radius: "1".into(),
        };
        let path = Path {
            segments: vec![PathSegment::new(PathOp::Arc(spec), None)],
        };
        assert_eq!(render(&path).data, "");
    }

    #[test]
    fn arc_quarter_turn() {
        let spec = ArcSpec {
            start_angle: "0".into(),
            end_angle: "90".into(),
            radius: "1".into(),
        };
        let path = Path {
            segments: vec![
                seg(PathOp::Start, Coordinate::cartesian("0", "0")),
                seg(PathOp::Arc(spec), Coordinate::cartesian("0", "0")),
            ],
        };
        // Chord from (250,250): dx = r(cos90-cos0) = -28.35, dy flip.
        assert_eq!(
            render(&path).data,
            "M 250.00 250.00 A 28.35 28.35 0 0 1 221.65 221.65"
        );
    }

    #[test]
    fn cursor_sticks_after_persistent_relative() {
        use crate::ast::RelOp;
        let rel = |op| Coordinate::relative(Coordinate::cartesian("1", "0"), op);
        let path = Path {
            segments: vec![
                seg(PathOp::Start, Coordinate::cartesian("0", "0")),
                seg(PathOp::Line, rel(RelOp::Once)),
                seg(PathOp::Line, rel(RelOp::Persist)),
            ],
        };
        // The one-shot offset draws but does not move the cursor, so both
        // relative lines land on the same target.
        assert_eq!(
            render(&path).data,
            "M 250.00 250.00 L 278.35 250.00 L 278.35 250.00"
        );
    }

    #[test]
    fn orthogonal_connectors() {
        let path = Path {
            segments: vec![
                seg(PathOp::Start, Coordinate::cartesian("0", "0")),
                seg(PathOp::HorizThenVert, Coordinate::cartesian("1", "1")),
            ],
        };
        assert_eq!(
            render(&path).data,
            "M 250.00 250.00 L 278.35 250.00 L 278.35 221.65"
        );
    }

    #[test]
    fn coord_label_usable_later_in_same_path() {
        let mut first = seg(PathOp::Start, Coordinate::cartesian("1", "0"));
        first.coord_label = Some("p".into());
        let path = Path {
            segments: vec![
                first,
                seg(PathOp::Line, Coordinate::cartesian("2", "0")),
                seg(PathOp::Line, Coordinate::named("p")),
            ],
        };
        let transform = Transform::default();
        let ctx = EvalContext::new();
        let mut names = NamedPoints::new();
        let out = render_path(&path, &transform, &ctx, &mut names);
        assert_eq!(
            out.data,
            "M 278.35 250.00 L 306.70 250.00 L 278.35 250.00"
        );
        assert!(names.contains_key("p"));
    }

    #[test]
    fn inline_node_collected_at_its_point() {
        let mut first = seg(PathOp::Start, Coordinate::cartesian("0", "0"));
        first.node_label = Some(InlineNode {
            name: None,
            text: "A".into(),
            options: Default::default(),
        });
        let path = Path { segments: vec![first] };
        let out = render(&path);
        assert_eq!(out.nodes.len(), 1);
        assert_eq!(out.nodes[0].0, DVec2::new(250.0, 250.0));
    }

    #[test]
    fn grid_lines_cover_the_box() {
        let path = Path {
            segments: vec![
                seg(PathOp::Start, Coordinate::cartesian("0", "0")),
                seg(PathOp::Grid, Coordinate::cartesian("2", "2")),
            ],
        };
        let data = render(&path).data;
        // 3 vertical + 3 horizontal lines, two commands each, after the move.
        assert_eq!(data.matches("M ").count(), 7);
        assert!(data.contains("M 250.00 193.30 L 306.70 193.30"));
    }

    #[test]
    fn explicit_controls_cubic() {
        let path = Path {
            segments: vec![
                seg(PathOp::Start, Coordinate::cartesian("0", "0")),
                seg(
                    PathOp::Controls {
                        points: vec![
                            Coordinate::cartesian("0", "1"),
                            Coordinate::cartesian("1", "1"),
                        ],
                    },
                    Coordinate::cartesian("1", "0"),
                ),
            ],
        };
        assert_eq!(
            render(&path).data,
            "M 250.00 250.00 C 250.00 221.65 278.35 221.65 278.35 250.00"
        );
    }
}
