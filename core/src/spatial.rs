//! Collision queries against the static map geometry.

use glam::Vec2;

/// One-shot collision queries against static geometry.
///
/// Only [`SpatialQuery::point_blocked`] is required; the segment and probe
/// queries are derived from it by sampling, which matches how the tile map
/// resolves collisions at unit granularity.
pub trait SpatialQuery {
    /// Reports whether the world point lies inside solid geometry.
    fn point_blocked(&self, point: Vec2) -> bool;

    /// First blocked point along the segment from `from` to `to`, if any.
    fn first_intersection(&self, from: Vec2, to: Vec2) -> Option<SegmentHit> {
        let distance = from.distance(to);
        let steps = (distance + 1.0) as u32;
        let mut before = from;
        for step in 0..=steps {
            let point = from.lerp(to, step as f32 / steps as f32);
            if self.point_blocked(point) {
                return Some(SegmentHit { point, before });
            }
            before = point;
        }
        None
    }

    /// Moves `position` by `velocity` unless the destination is blocked, in
    /// which case the blocked velocity components are reflected and scaled by
    /// `elasticity` while the position stays put.
    ///
    /// Returns the resulting position and velocity.
    fn move_point(&self, position: Vec2, velocity: Vec2, elasticity: f32) -> (Vec2, Vec2) {
        if !self.point_blocked(position + velocity) {
            return (position + velocity, velocity);
        }

        let mut reflected = velocity;
        let mut affected = 0;
        if self.point_blocked(Vec2::new(position.x + velocity.x, position.y)) {
            reflected.x *= -elasticity;
            affected += 1;
        }
        if self.point_blocked(Vec2::new(position.x, position.y + velocity.y)) {
            reflected.y *= -elasticity;
            affected += 1;
        }
        if affected == 0 {
            reflected *= -elasticity;
        }
        (position, reflected)
    }

    /// Teleport zone tag at the world point, if any.
    fn zone_at(&self, _point: Vec2) -> Option<u32> {
        None
    }
}

/// Result of a segment query that struck solid geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentHit {
    /// First sampled point inside solid geometry.
    pub point: Vec2,
    /// Last sampled point before the collision.
    pub before: Vec2,
}

/// Point on the segment `from`..`to` closest to `point`.
#[must_use]
pub fn closest_point_on_segment(from: Vec2, to: Vec2, point: Vec2) -> Vec2 {
    let segment = to - from;
    let length = segment.length();
    if length <= f32::EPSILON {
        return from;
    }
    let direction = segment / length;
    let along = direction.dot(point - from);
    if along <= 0.0 {
        from
    } else if along >= length {
        to
    } else {
        from + direction * along
    }
}
