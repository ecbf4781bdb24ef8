use anyhow::Result;
use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};

#[cfg(feature = "mt")]
use rayon::prelude::*;

/// Local quadratic regression evaluated directly at every input point.
///
/// Each fit uses the `floor(n * span)` nearest neighbours (at least 3) with
/// tricube weights. Returns the fitted values in input order.
pub fn loess_fit(x: &[f64], y: &[f64], span: f64, threads: usize) -> Result<Vec<f64>> {
    if x.len() != y.len() {
        anyhow::bail!("loess input lengths differ: x={} y={}", x.len(), y.len());
    }
    let n = x.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));
    let xs: Vec<f64> = order.iter().map(|&i| x[i]).collect();
    let ys: Vec<f64> = order.iter().map(|&i| y[i]).collect();
    let q = ((n as f64 * span).floor() as usize).clamp(n.min(3), n);

    let fitted_sorted = fit_all(&xs, &ys, q, threads)?;

    let mut fitted = vec![0.0f64; n];
    for (pos, &orig) in order.iter().enumerate() {
        fitted[orig] = fitted_sorted[pos];
    }
    Ok(fitted)
}

#[cfg(feature = "mt")]
fn fit_all(xs: &[f64], ys: &[f64], q: usize, threads: usize) -> Result<Vec<f64>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build thread pool: {}", e))?;
    Ok(pool.install(|| {
        (0..xs.len())
            .into_par_iter()
            .map(|i| fit_at(xs, ys, i, q))
            .collect()
    }))
}

#[cfg(not(feature = "mt"))]
fn fit_all(xs: &[f64], ys: &[f64], q: usize, _threads: usize) -> Result<Vec<f64>> {
    Ok((0..xs.len()).map(|i| fit_at(xs, ys, i, q)).collect())
}

/// `xs` must be sorted; the q nearest neighbours of `xs[i]` are then a
/// contiguous window.
fn fit_at(xs: &[f64], ys: &[f64], i: usize, q: usize) -> f64 {
    let n = xs.len();
    let x0 = xs[i];

    let mut lo = i.saturating_sub(q - 1).min(n - q);
    while lo + q < n && xs[lo + q] - x0 < x0 - xs[lo] {
        lo += 1;
    }
    while lo > 0 && x0 - xs[lo - 1] < xs[lo + q - 1] - x0 {
        lo -= 1;
    }
    let hi = lo + q;

    let d = (x0 - xs[lo]).max(xs[hi - 1] - x0);
    if d <= 0.0 {
        let window = &ys[lo..hi];
        return window.iter().sum::<f64>() / window.len() as f64;
    }

    let mut s = [0.0f64; 5];
    let mut t = [0.0f64; 3];
    let mut w_sum = 0.0f64;
    let mut wy_sum = 0.0f64;
    for j in lo..hi {
        let u = (xs[j] - x0) / d;
        let w = tricube(u.abs());
        if w == 0.0 {
            continue;
        }
        let mut p = w;
        for k in 0..5 {
            s[k] += p;
            if k < 3 {
                t[k] += p * ys[j];
            }
            p *= u;
        }
        w_sum += w;
        wy_sum += w * ys[j];
    }

    let quad = Matrix3::new(s[0], s[1], s[2], s[1], s[2], s[3], s[2], s[3], s[4]);
    if let Some(beta) = quad.lu().solve(&Vector3::new(t[0], t[1], t[2])) {
        if beta[0].is_finite() && quad.determinant().abs() > 1e-12 {
            return beta[0];
        }
    }

    let lin = Matrix2::new(s[0], s[1], s[1], s[2]);
    if let Some(beta) = lin.lu().solve(&Vector2::new(t[0], t[1])) {
        if beta[0].is_finite() && lin.determinant().abs() > 1e-12 {
            return beta[0];
        }
    }

    if w_sum > 0.0 {
        wy_sum / w_sum
    } else {
        ys[i]
    }
}

fn tricube(u: f64) -> f64 {
    if u >= 1.0 {
        0.0
    } else {
        let a = 1.0 - u * u * u;
        a * a * a
    }
}
