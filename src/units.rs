/// Unit conversions between the NDBC feed (metric) and display units.
///
/// The forward conversions round to one decimal place, matching what the
/// history view shows. The inverse helpers keep full precision.

const FEET_PER_METER: f64 = 3.28084;

/// Rounds to the given number of decimal places (half away from zero).
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Meters to feet, rounded to 0.1 ft.
pub fn m_to_ft(meters: f64) -> f64 {
    round_to(meters * FEET_PER_METER, 1)
}

/// Celsius to Fahrenheit, rounded to 0.1 °F.
pub fn c_to_f(celsius: f64) -> f64 {
    round_to(celsius * 9.0 / 5.0 + 32.0, 1)
}

pub fn ft_to_m(feet: f64) -> f64 {
    feet / FEET_PER_METER
}

pub fn f_to_c(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}
