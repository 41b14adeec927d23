//! Upper bounds on the kernel value reachable inside a tree node
//!
//! For a positive semi-definite kernel K(x, y) = <φ(x), φ(y)>. Writing every
//! point p under a node as φ(p) = φ(c) + b with ||b|| <= R (c the node center,
//! R its covering radius) gives, by Cauchy-Schwarz:
//!
//! * point to node: K(q, p) <= K(q, c) + ||φ(q)|| R
//! * node to node:  K(q, p) <= K(c_q, c_r) + R_q ||φ(c_r)|| + R_r ||φ(c_q)|| + R_q R_r
//! * norms only:    K(q, p) <= ||φ(q)|| ||φ(p)||
//!
//! Every returned bound is the minimum of the ball form and the norm form,
//! padded by `ROUNDING_SLACK` relative to the magnitudes involved so rounding
//! in the kernel evaluations can never make it optimistic.

use crate::tree::Node;

/// Relative padding applied to distances and bounds
pub const ROUNDING_SLACK: f64 = 1e-10;

/// Squared feature-space distance ||φ(a) - φ(b)||² from kernel values, clamped at 0
pub fn squared_distance(kaa: f64, kbb: f64, kab: f64) -> f64 {
    (kaa + kbb - 2.0 * kab).max(0.0)
}

/// Feature-space distance padded so it is never below the exact distance
pub fn covering_distance(kaa: f64, kbb: f64, kab: f64) -> f64 {
    let slack = ROUNDING_SLACK * (kaa.abs() + kbb.abs() + 2.0 * kab.abs());
    (squared_distance(kaa, kbb, kab) + slack).sqrt()
}

/// Upper bound on K(q, p) over every point p under `node`
///
/// `center_kernel` is K(q, node.center) and `query_norm` is sqrt(K(q, q)).
pub fn point_node_bound(center_kernel: f64, query_norm: f64, node: &Node) -> f64 {
    let spread = query_norm * node.radius;
    let scale = center_kernel.abs() + spread + query_norm * node.center_norm;
    let ball = center_kernel + spread + ROUNDING_SLACK * scale;
    let norm = query_norm * node.max_norm * (1.0 + ROUNDING_SLACK);
    finite_or_unbounded(ball.min(norm))
}

/// Upper bound on K(q, p) over every q under `query` and p under `reference`
///
/// `center_kernel` is K(query.center, reference.center).
pub fn node_node_bound(center_kernel: f64, query: &Node, reference: &Node) -> f64 {
    let spread = query.radius * reference.center_norm
        + reference.radius * query.center_norm
        + query.radius * reference.radius;
    let scale = center_kernel.abs() + spread + query.center_norm * reference.center_norm;
    let ball = center_kernel + spread + ROUNDING_SLACK * scale;
    let norm = query.max_norm * reference.max_norm * (1.0 + ROUNDING_SLACK);
    finite_or_unbounded(ball.min(norm))
}

// A NaN bound must never prune anything
fn finite_or_unbounded(bound: f64) -> f64 {
    if bound.is_nan() {
        f64::INFINITY
    } else {
        bound
    }
}
