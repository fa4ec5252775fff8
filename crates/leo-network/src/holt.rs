//! Window statistics used by the bandwidth predictors.

/// Harmonic mean of the nonzero samples after any leading zeros.
///
/// Returns `None` when no sample is nonzero.  Zero samples mark ticks where a
/// satellite was not visible and carry no information about its rate.
pub fn harmonic_mean(samples: &[f64]) -> Option<f64> {
    let (sum, n) = samples
        .iter()
        .skip_while(|v| **v == 0.0)
        .filter(|v| **v != 0.0)
        .fold((0.0, 0usize), |(sum, n), v| (sum + 1.0 / v, n + 1));
    (n > 0).then(|| n as f64 / sum)
}

/// Grid of smoothing parameters searched by [`holt_winters_forecast`].
const GRID_STEPS: usize = 19;

/// One-step-ahead forecast with Holt's additive-trend exponential smoothing.
///
/// Level and trend are initialised from the first two samples; the smoothing
/// parameters `(alpha, beta)` are chosen from a `0.05..=0.95` grid by minimum
/// one-step squared error.  Leading zeros are dropped.  With fewer than two
/// usable samples the last sample is returned unchanged.  The forecast is
/// floored at zero.
pub fn holt_winters_forecast(samples: &[f64]) -> Option<f64> {
    let last = *samples.last()?;
    if samples.len() <= 1 {
        return Some(last);
    }
    let ys: Vec<f64> = samples.iter().copied().skip_while(|v| *v == 0.0).collect();
    if ys.len() < 2 {
        return Some(last);
    }

    let mut best = (f64::INFINITY, last);
    for i in 1..=GRID_STEPS {
        let alpha = i as f64 * 0.05;
        for j in 1..=GRID_STEPS {
            let beta = j as f64 * 0.05;
            let (sse, forecast) = holt_fit(&ys, alpha, beta);
            if sse < best.0 {
                best = (sse, forecast);
            }
        }
    }
    Some(best.1.max(0.0))
}

/// Run Holt smoothing over `ys`; return the SSE of one-step predictions and
/// the forecast for the next step.
fn holt_fit(ys: &[f64], alpha: f64, beta: f64) -> (f64, f64) {
    let mut level = ys[0];
    let mut trend = ys[1] - ys[0];
    let mut sse = 0.0;
    for &y in &ys[1..] {
        let predicted = level + trend;
        sse += (y - predicted).powi(2);
        let prev_level = level;
        level = alpha * y + (1.0 - alpha) * (level + trend);
        trend = beta * (level - prev_level) + (1.0 - beta) * trend;
    }
    (sse, level + trend)
}
