//! Fair-share ratio solver.
//!
//! Minimises a smooth-enough objective over variables grouped in blocks.
//! Every block must sum to 1 and every variable stays in `[lo, hi]`.  The
//! method is projected gradient descent: central finite-difference gradient,
//! backtracking line search, and Euclidean projection of each block onto the
//! bounded simplex.

use std::ops::Range;

/// Finite-difference step.
const FD_STEP: f64 = 1e-6;
/// Smallest line-search step before giving up.
const MIN_STEP: f64 = 1e-10;
/// Objective change treated as convergence.
const TOLERANCE: f64 = 1e-9;

/// Box-and-simplex constraints of a share problem.
#[derive(Clone, Debug)]
pub struct ShareConstraints {
    pub blocks: Vec<Range<usize>>,
    pub lo:     f64,
    pub hi:     f64,
}

impl ShareConstraints {
    /// Bounds `(eps, 1 - eps)` on every variable.
    pub fn with_margin(blocks: Vec<Range<usize>>, eps: f64) -> Self {
        Self { blocks, lo: eps, hi: 1.0 - eps }
    }

    /// Project `x` in place onto the feasible set.
    pub fn project(&self, x: &mut [f64]) {
        for block in &self.blocks {
            project_block(&mut x[block.clone()], self.lo, self.hi);
        }
    }
}

/// Result of [`minimize`].
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    pub x:          Vec<f64>,
    pub value:      f64,
    pub iterations: usize,
}

/// Minimise `f` from `x0` subject to `cons`.
pub fn minimize(
    f:        impl Fn(&[f64]) -> f64,
    x0:       Vec<f64>,
    cons:     &ShareConstraints,
    max_iter: usize,
) -> Solution {
    let mut x = x0;
    cons.project(&mut x);
    let mut fx = f(&x);
    let mut grad = vec![0.0; x.len()];
    let mut probe = x.clone();
    let mut step = 1.0;
    let mut iterations = 0;

    while iterations < max_iter {
        iterations += 1;

        // ── Gradient ──────────────────────────────────────────────────────
        for i in 0..x.len() {
            probe.copy_from_slice(&x);
            probe[i] = x[i] + FD_STEP;
            let up = f(&probe);
            probe[i] = x[i] - FD_STEP;
            let down = f(&probe);
            grad[i] = (up - down) / (2.0 * FD_STEP);
        }
        if grad.iter().all(|g| g.abs() < TOLERANCE) {
            break;
        }

        // ── Backtracking line search ──────────────────────────────────────
        let mut accepted = None;
        while step >= MIN_STEP {
            for i in 0..x.len() {
                probe[i] = x[i] - step * grad[i];
            }
            cons.project(&mut probe);
            let fp = f(&probe);
            if fp < fx - TOLERANCE {
                accepted = Some(fp);
                break;
            }
            step *= 0.5;
        }
        let Some(fp) = accepted else { break };

        x.copy_from_slice(&probe);
        let improvement = fx - fp;
        fx = fp;
        step = (step * 2.0).min(1.0);
        if improvement < TOLERANCE {
            break;
        }
    }

    Solution { x, value: fx, iterations }
}

/// Euclidean projection of `v` onto `{ Σx = 1, lo <= x <= hi }`.
///
/// The projection is `clamp(v - τ, lo, hi)` for the unique `τ` making the
/// sum 1, found by bisection.  Assumes `len * lo <= 1 <= len * hi`.
fn project_block(v: &mut [f64], lo: f64, hi: f64) {
    if v.is_empty() {
        return;
    }
    let sum_at = |tau: f64, v: &[f64]| v.iter().map(|x| (x - tau).clamp(lo, hi)).sum::<f64>();

    let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = v.iter().copied().fold(f64::INFINITY, f64::min);
    // Σ is non-increasing in τ: at `lower` every entry sits at `hi`, at
    // `upper` every entry sits at `lo`.
    let (mut lower, mut upper) = (min - hi, max - lo);
    for _ in 0..100 {
        let mid = 0.5 * (lower + upper);
        if sum_at(mid, v) > 1.0 {
            lower = mid;
        } else {
            upper = mid;
        }
    }
    let tau = 0.5 * (lower + upper);
    for x in v.iter_mut() {
        *x = (*x - tau).clamp(lo, hi);
    }
}
