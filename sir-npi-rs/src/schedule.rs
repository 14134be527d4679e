use crate::parameters::NpiWindow;

/// Transmission rate in effect at time `t`: `(1 - epsilon) * beta_0` inside the
/// closed window, `beta_0` everywhere else. `epsilon` is applied as given.
pub fn effective_beta(t: f64, beta_0: f64, window: NpiWindow, epsilon: f64) -> f64 {
    if window.contains(t) {
        (1.0 - epsilon) * beta_0
    } else {
        beta_0
    }
}
