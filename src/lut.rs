//! Two-column lookup tables (`power.lut` and friends).

use crate::error::{read_text_lossy, Result};
use crate::ini::parse_f64;
use std::path::Path;

pub type Curve = Vec<(f64, f64)>;

/// Reads a curve sorted ascending by x. Only a missing file is an error.
pub fn parse(path: &Path) -> Result<Curve> {
    Ok(parse_str(&read_text_lossy(path)?))
}

pub fn parse_str(text: &str) -> Curve {
    let mut curve: Curve = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';') && !line.starts_with('#'))
        .filter_map(|line| {
            let mut parts = line
                .split(|c: char| c == ',' || c == '|' || c.is_whitespace())
                .filter(|p| !p.is_empty());
            let x = parse_f64(parts.next()?)?;
            let y = parse_f64(parts.next()?)?;
            Some((x, y))
        })
        .collect();
    curve.sort_by(|a, b| a.0.total_cmp(&b.0));
    curve
}

/// Point with the largest y, `(0, 0)` for an empty curve. The first maximum wins.
pub fn peak(curve: &[(f64, f64)]) -> (f64, f64) {
    curve.iter().fold(None, |best: Option<(f64, f64)>, &p| match best {
        Some(b) if b.1 >= p.1 => Some(b),
        _ => Some(p),
    })
    .unwrap_or((0.0, 0.0))
}

/// Linear interpolation, clamped to the curve ends. `None` for an empty curve.
pub fn interpolate(curve: &[(f64, f64)], x: f64) -> Option<f64> {
    let first = curve.first()?;
    let last = curve.last()?;
    if x <= first.0 {
        return Some(first.1);
    }
    if x >= last.0 {
        return Some(last.1);
    }
    curve.windows(2).find_map(|w| {
        let (x0, y0) = w[0];
        let (x1, y1) = w[1];
        if x < x0 || x > x1 {
            return None;
        }
        if (x1 - x0).abs() < f64::EPSILON {
            return Some(y0);
        }
        Some(y0 + (y1 - y0) * (x - x0) / (x1 - x0))
    })
}
