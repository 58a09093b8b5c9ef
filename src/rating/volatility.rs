//! Volatility update (step 5 of Glicko-2)
//!
//! Finds the root of
//!
//! ```text
//! f(x) = eˣ(Δ² − φ² − v − eˣ) / (2(φ² + v + eˣ)²) − (x − a) / τ²
//! a    = ln σ²
//! ```
//!
//! with the Illinois variant of regula falsi. The new volatility is
//! `exp(x / 2)` at the root.

use crate::config::rating::RulesetConfig;
use serde::{Deserialize, Serialize};

/// Reason the solver gave up
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{reason} (after {iterations} iterations)")]
pub struct SolverError {
    pub iterations: usize,
    pub reason: String,
}

/// Converged volatility
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySolution {
    pub volatility: f64,
    /// Bracket expansion steps plus Illinois steps
    pub iterations: usize,
}

/// Illinois-method root finder for the new volatility σ'
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilitySolver {
    tau: f64,
    tolerance: f64,
    max_iterations: usize,
}

impl VolatilitySolver {
    pub fn new(tau: f64, tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tau,
            tolerance,
            max_iterations,
        }
    }

    pub fn from_config(config: &RulesetConfig) -> Self {
        Self::new(
            config.system_tau,
            config.convergence_tolerance,
            config.max_solver_iterations,
        )
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// The function whose root is ln σ'²
    pub fn objective(&self, x: f64, delta: f64, phi: f64, v: f64, a: f64) -> f64 {
        let ex = x.exp();
        let phi_sq = phi * phi;
        let denominator = phi_sq + v + ex;
        ex * (delta * delta - phi_sq - v - ex) / (2.0 * denominator * denominator)
            - (x - a) / (self.tau * self.tau)
    }

    /// Solve for σ' given the pre-period φ and σ, the estimated variance `v`
    /// and the rating improvement estimate `delta`.
    pub fn solve(
        &self,
        phi: f64,
        sigma: f64,
        v: f64,
        delta: f64,
    ) -> Result<VolatilitySolution, SolverError> {
        let a = (sigma * sigma).ln();
        let f = |x: f64| self.objective(x, delta, phi, v, a);
        let mut iterations = 0;

        let mut big_a = a;
        let excess = delta * delta - phi * phi - v;
        let mut big_b = if excess > 0.0 {
            excess.ln()
        } else {
            let mut k = 1.0;
            while f(a - k * self.tau) < 0.0 {
                iterations += 1;
                if iterations >= self.max_iterations {
                    return Err(SolverError {
                        iterations,
                        reason: "bracket expansion did not find a sign change".to_string(),
                    });
                }
                k += 1.0;
            }
            a - k * self.tau
        };

        let mut f_a = f(big_a);
        let mut f_b = f(big_b);
        if !f_a.is_finite() || !f_b.is_finite() {
            return Err(SolverError {
                iterations,
                reason: format!(
                    "non-finite bracket: f({}) = {}, f({}) = {}",
                    big_a, f_a, big_b, f_b
                ),
            });
        }

        while (big_b - big_a).abs() > self.tolerance {
            iterations += 1;
            if iterations >= self.max_iterations {
                return Err(SolverError {
                    iterations,
                    reason: format!(
                        "bracket [{}, {}] did not shrink below tolerance",
                        big_a, big_b
                    ),
                });
            }

            let big_c = big_a + (big_a - big_b) * f_a / (f_b - f_a);
            let f_c = f(big_c);
            if !big_c.is_finite() || !f_c.is_finite() {
                return Err(SolverError {
                    iterations,
                    reason: format!("non-finite iterate {} (f = {})", big_c, f_c),
                });
            }
            if f_c == 0.0 {
                return Ok(VolatilitySolution {
                    volatility: (big_c / 2.0).exp(),
                    iterations,
                });
            }

            if f_c * f_b < 0.0 {
                big_a = big_b;
                f_a = f_b;
            } else {
                // Illinois step: halve the retained endpoint
                f_a /= 2.0;
            }
            big_b = big_c;
            f_b = f_c;
        }

        Ok(VolatilitySolution {
            volatility: (big_a / 2.0).exp(),
            iterations,
        })
    }
}

impl Default for VolatilitySolver {
    fn default() -> Self {
        Self::from_config(&RulesetConfig::default())
    }
}
