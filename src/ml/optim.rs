// ============================================================
// Layer 5 - L-BFGS Minimiser
// ============================================================
// Limited-memory BFGS with a backtracking (Armijo) line search,
// used to fit the logistic regression.
//
// Each iteration:
//   1. two-loop recursion turns the gradient into a search
//      direction using the last `memory` (s, y) pairs
//   2. halve the step until the sufficient-decrease condition
//      f(x + a·d) <= f(x) + c·a·∇f·d holds
//   3. store s = Δx, y = Δ∇f when the curvature s·y is positive
//
// Stops on a small gradient (max-norm), a negligible relative
// decrease of f, or the iteration limit.
//
// Reference: Nocedal & Wright (2006), Numerical Optimization, §7.2

use nalgebra::DVector;
use std::collections::VecDeque;

/// Sufficient-decrease constant of the Armijo condition
const ARMIJO_C: f64 = 1e-4;
/// Smallest step tried before the line search gives up
const MIN_STEP: f64 = 1e-20;

#[derive(Debug, Clone)]
pub struct LbfgsConfig {
    pub max_iter:  usize,
    pub memory:    usize,
    /// Converged when max |∇f| falls below this
    pub grad_tol:  f64,
    /// Converged when (f_old - f_new) / max(|f_old|, |f_new|, 1) falls below this
    pub ftol:      f64,
}

impl Default for LbfgsConfig {
    fn default() -> Self {
        Self {
            max_iter: 4000,
            memory:   10,
            grad_tol: 1e-6,
            ftol:     1e3 * f64::EPSILON,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub x:          DVector<f64>,
    pub value:      f64,
    pub iterations: usize,
    pub converged:  bool,
}

/// Minimise `objective`, which returns (f(x), ∇f(x)).
pub fn minimize<F>(objective: F, x0: DVector<f64>, cfg: &LbfgsConfig) -> Minimum
where
    F: Fn(&DVector<f64>) -> (f64, DVector<f64>),
{
    let mut x = x0;
    let (mut f, mut g) = objective(&x);

    let mut s_hist: VecDeque<DVector<f64>> = VecDeque::with_capacity(cfg.memory);
    let mut y_hist: VecDeque<DVector<f64>> = VecDeque::with_capacity(cfg.memory);
    let mut rho:    VecDeque<f64>          = VecDeque::with_capacity(cfg.memory);

    for iter in 0..cfg.max_iter {
        if g.amax() <= cfg.grad_tol {
            return Minimum { x, value: f, iterations: iter, converged: true };
        }

        // ── Two-loop recursion ───────────────────────────────────────────────
        let k         = s_hist.len();
        let mut q     = g.clone();
        let mut alpha = vec![0.0; k];
        for i in (0..k).rev() {
            alpha[i] = rho[i] * s_hist[i].dot(&q);
            q.axpy(-alpha[i], &y_hist[i], 1.0);
        }

        let gamma = if k > 0 {
            s_hist[k - 1].dot(&y_hist[k - 1]) / y_hist[k - 1].norm_squared()
        } else {
            // first step: unit length along the gradient
            1.0 / g.norm().max(1.0)
        };
        let mut r = q * gamma;
        for i in 0..k {
            let beta = rho[i] * y_hist[i].dot(&r);
            r.axpy(alpha[i] - beta, &s_hist[i], 1.0);
        }

        let mut direction = -r;
        let mut slope     = g.dot(&direction);
        if slope >= 0.0 {
            // not a descent direction: restart from steepest descent
            s_hist.clear();
            y_hist.clear();
            rho.clear();
            direction = -g.clone();
            slope     = -g.norm_squared();
        }

        // ── Backtracking line search ─────────────────────────────────────────
        let mut step = 1.0;
        let (x_new, f_new, g_new) = loop {
            let candidate = &x + &direction * step;
            let (fc, gc)  = objective(&candidate);
            if fc <= f + ARMIJO_C * step * slope || step < MIN_STEP {
                break (candidate, fc, gc);
            }
            step *= 0.5;
        };

        if step < MIN_STEP {
            tracing::debug!("L-BFGS line search stalled after {} iterations", iter);
            return Minimum { x, value: f, iterations: iter, converged: false };
        }

        // ── Curvature pair ───────────────────────────────────────────────────
        let s  = &x_new - &x;
        let yv = &g_new - &g;
        let sy = s.dot(&yv);
        if sy > 1e-10 {
            if s_hist.len() == cfg.memory {
                s_hist.pop_front();
                y_hist.pop_front();
                rho.pop_front();
            }
            s_hist.push_back(s);
            y_hist.push_back(yv);
            rho.push_back(1.0 / sy);
        }

        let decrease = (f - f_new) / f.abs().max(f_new.abs()).max(1.0);
        x = x_new;
        f = f_new;
        g = g_new;

        if decrease <= cfg.ftol {
            return Minimum { x, value: f, iterations: iter + 1, converged: true };
        }
    }

    Minimum { x, value: f, iterations: cfg.max_iter, converged: false }
}
