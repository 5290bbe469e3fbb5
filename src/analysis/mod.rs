/// Data analysis for the surfwatch service.
///
/// Submodules:
/// - `normalize` — converts raw feed rows to display units inside the retention window.
/// - `aggregate` — fetches every location of one or all regions and picks the top location.
/// - `forecast`  — linear trend extrapolation of wave height.

pub mod aggregate;
pub mod forecast;
pub mod normalize;
