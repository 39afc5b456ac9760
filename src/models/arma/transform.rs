//! Reparameterisation that keeps AR polynomials stationary and MA
//! polynomials invertible during unconstrained optimisation.
//!
//! An unconstrained vector `x` maps to partial autocorrelations
//! `r = tanh(x)`, which map to polynomial coefficients through the
//! Durbin-Levinson recursion (Monahan 1984). Every `|r| < 1` yields a
//! stationary polynomial.

/// Partial autocorrelations to AR coefficients (`x_t = sum phi_j x_{t-j}`).
pub fn pacf_to_ar(pacf: &[f64]) -> Vec<f64> {
    let mut phi: Vec<f64> = Vec::with_capacity(pacf.len());
    for (k, &r) in pacf.iter().enumerate() {
        let prev = phi.clone();
        for j in 0..k {
            phi[j] = prev[j] - r * prev[k - 1 - j];
        }
        phi.push(r);
    }
    phi
}

/// AR coefficients back to partial autocorrelations.
///
/// Returns `None` if the polynomial is not stationary.
pub fn ar_to_pacf(ar: &[f64]) -> Option<Vec<f64>> {
    let mut phi = ar.to_vec();
    let mut pacf = vec![0.0; ar.len()];

    for k in (0..ar.len()).rev() {
        let r = phi[k];
        if !(r.abs() < 1.0) {
            return None;
        }
        pacf[k] = r;
        let denom = 1.0 - r * r;
        let prev: Vec<f64> = (0..k).map(|j| (phi[j] + r * phi[k - 1 - j]) / denom).collect();
        phi.truncate(k);
        phi.copy_from_slice(&prev);
    }

    Some(pacf)
}

/// Unconstrained parameters to stationary AR coefficients.
pub fn constrain_ar(unconstrained: &[f64]) -> Vec<f64> {
    let pacf: Vec<f64> = unconstrained.iter().map(|x| x.tanh()).collect();
    pacf_to_ar(&pacf)
}

/// Unconstrained parameters to invertible MA coefficients
/// (`e_t + sum theta_j e_{t-j}`).
pub fn constrain_ma(unconstrained: &[f64]) -> Vec<f64> {
    constrain_ar(unconstrained).into_iter().map(|a| -a).collect()
}

/// Inverse of [`constrain_ar`], or `None` for a non-stationary polynomial.
pub fn unconstrain_ar(ar: &[f64]) -> Option<Vec<f64>> {
    ar_to_pacf(ar).map(|pacf| pacf.into_iter().map(f64::atanh).collect())
}
