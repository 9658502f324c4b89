use std::{fmt::Display, ops::Deref};

use chrono::Duration;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}%", self.0)
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || value.is_nan() {
            None
        } else {
            Some(Percentage(value))
        }
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of `whole` taken by `value`. A zero `whole` yields 0%.
pub fn duration_percentage(value: Duration, whole: Duration) -> Percentage {
    if whole.is_zero() {
        return Percentage(0.);
    }
    Percentage::new_opt(value.num_milliseconds() as f64 / whole.num_milliseconds() as f64 * 100.)
        .unwrap_or(Percentage(0.))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::duration_percentage;

    #[test]
    fn percentage_of_expected_day() {
        let whole = Duration::minutes(450);
        assert_eq!(*duration_percentage(Duration::minutes(225), whole), 50.);
        assert_eq!(duration_percentage(Duration::minutes(450), whole).to_string(), "100%");
        assert_eq!(duration_percentage(Duration::minutes(10), Duration::zero()).to_string(), "0%");
    }
}
