//! Coordinate resolution: AST coordinates to render-space points.

use glam::DVec2;
use std::collections::HashMap;

use crate::ast::{CoordSystem, Coordinate};
use crate::log::debug;
use crate::render::context::EvalContext;
use crate::render::eval;
use crate::render::geometry::{polar_to_cartesian, Transform};

/// Named points resolved so far, keyed by raw name. Last write wins.
pub type NamedPoints = HashMap<String, DVec2>;

/// Borrowed view over everything coordinate resolution needs.
///
/// Cheap to re-create per segment, which lets the path walker insert
/// coordinate labels into the named table between resolutions.
pub struct Resolver<'a> {
    pub transform: &'a Transform,
    pub ctx: &'a EvalContext,
    pub names: &'a NamedPoints,
}

impl<'a> Resolver<'a> {
    pub fn new(transform: &'a Transform, ctx: &'a EvalContext, names: &'a NamedPoints) -> Self {
        Self { transform, ctx, names }
    }

    /// Resolve a coordinate to a render-space point.
    ///
    /// `current` is the path cursor, consulted by relative coordinates.
    /// Resolution never fails: bad expressions read as 0.0 and unknown
    /// names fall back to the origin.
    pub fn resolve(&self, coord: &Coordinate, current: Option<DVec2>) -> DVec2 {
        match coord.system {
            CoordSystem::Cartesian => {
                let x = self.eval_value(coord.values.first());
                let y = self.eval_value(coord.values.get(1));
                self.transform.to_svg(x, y)
            }
            CoordSystem::Polar => {
                let angle = self.eval_value(coord.values.first());
                let radius = self.eval_value(coord.values.get(1));
                let p = polar_to_cartesian(angle, radius);
                self.transform.to_svg(p.x, p.y)
            }
            CoordSystem::Named => self.resolve_named(coord),
            CoordSystem::Relative => self.resolve_relative(coord, current),
        }
    }

    fn resolve_named(&self, coord: &Coordinate) -> DVec2 {
        let name = coord.name.as_deref().unwrap_or_default();
        match self.names.get(name) {
            Some(p) => *p,
            None => {
                debug!(name, "unknown named coordinate, using origin");
                self.transform.origin()
            }
        }
    }

    fn resolve_relative(&self, coord: &Coordinate, current: Option<DVec2>) -> DVec2 {
        let a = self.eval_value(coord.values.first());
        let b = self.eval_value(coord.values.get(1));
        let delta = match coord.modifiers.inner_system {
            Some(CoordSystem::Polar) => polar_to_cartesian(a, b),
            _ => DVec2::new(a, b),
        };
        match current {
            // Offset from the cursor, scaled and y-flipped but not re-centered.
            Some(cur) => cur + self.transform.delta_to_svg(delta.x, delta.y),
            // No cursor yet: the offset is taken as an absolute position.
            None => self.transform.to_svg(delta.x, delta.y),
        }
    }

    /// Evaluate one coordinate component. Falls back to a plain float
    /// parse, then to 0.0, so a bad expression degrades instead of failing.
    pub fn eval_value(&self, raw: Option<&String>) -> f64 {
        let Some(raw) = raw else { return 0.0 };
        match eval::evaluate(raw, self.ctx) {
            Ok(v) => v,
            Err(_) => match raw.trim().parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    debug!(value = raw.as_str(), "unevaluable coordinate value, using 0");
                    0.0
                }
            },
        }
    }
}
