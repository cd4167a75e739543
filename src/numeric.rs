// SPDX-License-Identifier: AGPL-3.0-only

//! Plain-Rust numerical kernels: adaptive quadrature and cubic splines.
//!
//! Both are small, dependency-free implementations sized for the smooth
//! radial integrands this crate produces (polytropic gas profiles,
//! Compton-y aperture integrals). Quadrature reports non-convergence
//! through a flag rather than panicking, so callers can surface a
//! computation warning while keeping the best available estimate.

/// Result of an adaptive quadrature call.
#[derive(Debug, Clone, Copy)]
pub struct QuadResult {
    /// Best estimate of the integral
    pub value: f64,
    /// Estimated absolute error of the final refinement
    pub abs_err: f64,
    /// False when the recursion depth limit was reached before the
    /// tolerance was met anywhere in the interval
    pub converged: bool,
}

const MAX_DEPTH: u32 = 48;

fn simpson(fa: f64, fm: f64, fb: f64, h: f64) -> f64 {
    h / 6.0 * (fa + 4.0 * fm + fb)
}

#[allow(clippy::too_many_arguments)]
fn adapt<F: Fn(f64) -> f64>(
    f: &F,
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    eps: f64,
    depth: u32,
    err_acc: &mut f64,
    ok: &mut bool,
) -> f64 {
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = f(lm);
    let frm = f(rm);
    let left = simpson(fa, flm, fm, m - a);
    let right = simpson(fm, frm, fb, b - m);
    let delta = left + right - whole;
    // Richardson: Simpson halving gains a factor 15
    if delta.abs() <= 15.0 * eps || depth == 0 {
        if depth == 0 && delta.abs() > 15.0 * eps {
            *ok = false;
        }
        *err_acc += delta.abs() / 15.0;
        return left + right + delta / 15.0;
    }
    adapt(f, a, m, fa, flm, fm, left, 0.5 * eps, depth - 1, err_acc, ok)
        + adapt(f, m, b, fm, frm, fb, right, 0.5 * eps, depth - 1, err_acc, ok)
}

/// Adaptive Simpson quadrature of `f` over [a, b] to relative tolerance
/// `rel_tol` (with an absolute floor for integrals near zero).
pub fn quad_adaptive<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, rel_tol: f64) -> QuadResult {
    if a == b {
        return QuadResult {
            value: 0.0,
            abs_err: 0.0,
            converged: true,
        };
    }
    let fa = f(a);
    let m = 0.5 * (a + b);
    let fm = f(m);
    let fb = f(b);
    let whole = simpson(fa, fm, fb, b - a);
    let eps = rel_tol * whole.abs().max(1e-300);
    let mut err_acc = 0.0;
    let mut ok = true;
    let value = adapt(
        &f, a, b, fa, fm, fb, whole, eps, MAX_DEPTH, &mut err_acc, &mut ok,
    );
    QuadResult {
        value,
        abs_err: err_acc,
        converged: ok,
    }
}

/// Minimal seeded LCG for reproducible sampling (synthetic accretion
/// histories, bootstrap resampling). Not cryptographic.
#[derive(Debug, Clone)]
pub(crate) struct Lcg {
    state: u64,
}

impl Lcg {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Index in [0, n).
    pub(crate) fn index(&mut self, n: usize) -> usize {
        (self.next_u64() >> 33) as usize % n
    }

    /// Uniform deviate in [0, 1).
    pub(crate) fn uniform(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Standard normal deviate (Box-Muller).
    pub(crate) fn gaussian(&mut self) -> f64 {
        let u1 = self.uniform().max(f64::MIN_POSITIVE);
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// Natural cubic spline through strictly increasing abscissae.
///
/// Evaluation clamps to the tabulated range; the radial profiles splined
/// here are flat at the inner grid edge, so clamped extrapolation toward
/// r=0 introduces no spurious structure into aperture integrals.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots (natural boundary: zero at ends)
    y2: Vec<f64>,
}

impl CubicSpline {
    /// Build a natural spline. Requires n >= 3 strictly increasing knots.
    pub fn new(x: &[f64], y: &[f64]) -> Option<Self> {
        let n = x.len();
        if n < 3 || y.len() != n {
            return None;
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }
        // Thomas algorithm for the tridiagonal second-derivative system
        let mut y2 = vec![0.0; n];
        let mut u = vec![0.0; n];
        for i in 1..n - 1 {
            let sig = (x[i] - x[i - 1]) / (x[i + 1] - x[i - 1]);
            let p = sig * y2[i - 1] + 2.0;
            y2[i] = (sig - 1.0) / p;
            let d = (y[i + 1] - y[i]) / (x[i + 1] - x[i]) - (y[i] - y[i - 1]) / (x[i] - x[i - 1]);
            u[i] = (6.0 * d / (x[i + 1] - x[i - 1]) - sig * u[i - 1]) / p;
        }
        for i in (0..n - 1).rev() {
            y2[i] = y2[i] * y2[i + 1] + u[i];
        }
        Some(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            y2,
        })
    }

    /// Evaluate the spline at `xq`, clamped to the tabulated range.
    pub fn eval(&self, xq: f64) -> f64 {
        let n = self.x.len();
        let xq = xq.clamp(self.x[0], self.x[n - 1]);
        // binary search for the bracketing interval
        let i = match self.x.binary_search_by(|v| v.total_cmp(&xq)) {
            Ok(i) => i.min(n - 2),
            Err(i) => i.saturating_sub(1).min(n - 2),
        };
        let h = self.x[i + 1] - self.x[i];
        let a = (self.x[i + 1] - xq) / h;
        let b = (xq - self.x[i]) / h;
        a * self.y[i]
            + b * self.y[i + 1]
            + ((a * a * a - a) * self.y2[i] + (b * b * b - b) * self.y2[i + 1]) * h * h / 6.0
    }
}
