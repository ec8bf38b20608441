//! Detrending and smoothing applied to a raw window before band filtering.

pub const SAVGOL_WINDOW: usize = 11;
pub const SAVGOL_ORDER: usize = 3;

/// Subtracts the arithmetic mean (DC removal).
pub fn remove_mean(signal: &[f64]) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let mean = signal.iter().sum::<f64>() / signal.len() as f64;
    signal.iter().map(|&x| x - mean).collect()
}

/// Pulse channel: mean removal followed by Savitzky-Golay smoothing.
pub fn condition_pulse(signal: &[f64]) -> Vec<f64> {
    let detrended = remove_mean(signal);
    savgol_filter(&detrended, SAVGOL_WINDOW, SAVGOL_ORDER)
}

/// Breath channel skips the smoothing step.
pub fn condition_breath(signal: &[f64]) -> Vec<f64> {
    remove_mean(signal)
}

/// Local polynomial smoothing. Interior samples use the centred kernel; the first and
/// last `window / 2` samples are read off a polynomial fitted to the first/last window.
/// Signals shorter than `window` are returned unchanged.
pub fn savgol_filter(signal: &[f64], window: usize, order: usize) -> Vec<f64> {
    let n = signal.len();
    if window % 2 == 0 || order >= window || n < window {
        return signal.to_vec();
    }
    let half = window / 2;
    let centre = savgol_coefficients(window, order, half);

    let mut smoothed = vec![0.0; n];
    for i in half..n - half {
        smoothed[i] = centre
            .iter()
            .zip(&signal[i - half..=i + half])
            .map(|(c, x)| c * x)
            .sum();
    }

    let head = &signal[..window];
    let tail = &signal[n - window..];
    for k in 0..half {
        let coeffs = savgol_coefficients(window, order, k);
        smoothed[k] = dot(&coeffs, head);

        let pos = window - half + k;
        let coeffs = savgol_coefficients(window, order, pos);
        smoothed[n - half + k] = dot(&coeffs, tail);
    }

    smoothed
}

/// Least-squares weights that evaluate a degree-`order` fit over `window` samples at
/// sample `pos` of that window.
pub fn savgol_coefficients(window: usize, order: usize, pos: usize) -> Vec<f64> {
    let terms = order + 1;
    let design: Vec<Vec<f64>> = (0..window)
        .map(|i| {
            let offset = i as f64 - pos as f64;
            (0..terms).map(|j| offset.powi(j as i32)).collect()
        })
        .collect();

    let mut gram = vec![vec![0.0; terms]; terms];
    for row in &design {
        for a in 0..terms {
            for b in 0..terms {
                gram[a][b] += row[a] * row[b];
            }
        }
    }

    let mut unit = vec![0.0; terms];
    unit[0] = 1.0;
    let weights = solve(gram, unit);

    design.iter().map(|row| dot(row, &weights)).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

// Gaussian elimination with partial pivoting; the Gram matrix here is small and
// positive definite.
fn solve(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Vec<f64> {
    let n = rhs.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| {
                matrix[a][col]
                    .abs()
                    .partial_cmp(&matrix[b][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        matrix.swap(col, pivot);
        rhs.swap(col, pivot);

        let diag = matrix[col][col];
        if diag == 0.0 {
            continue;
        }
        for row in col + 1..n {
            let factor = matrix[row][col] / diag;
            for k in col..n {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| matrix[row][k] * solution[k]).sum();
        let diag = matrix[row][row];
        solution[row] = if diag == 0.0 { 0.0 } else { (rhs[row] - tail) / diag };
    }
    solution
}
