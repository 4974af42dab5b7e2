use crate::config::{Candidate, ResultCandidate};

fn hue_to_rgb(p: f64, q: f64, t: f64) -> f64 {
    let mut t = t;
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }

    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn to_channel(x: f64) -> u8 {
    x.round().clamp(0.0, 255.0) as u8
}

/// Converts a colour to RGB.
///
/// The hue is in degrees, the saturation and the lightness in percent.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let h = h / 360.0;
    let s = s / 100.0;
    let l = l / 100.0;

    if s == 0.0 {
        let grey = to_channel(l * 255.0);
        return (grey, grey, grey);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    (
        to_channel(hue_to_rgb(p, q, h + 1.0 / 3.0) * 255.0),
        to_channel(hue_to_rgb(p, q, h) * 255.0),
        to_channel(hue_to_rgb(p, q, h - 1.0 / 3.0) * 255.0),
    )
}

/// Gives each candidate its own colour for the flow diagram.
///
/// The hues are spread evenly around the colour wheel in roster order, so the
/// colours only depend on the order and the number of candidates.
pub fn assign_colours(
    candidates: &[Candidate],
    saturation: f64,
    lightness: f64,
) -> Vec<ResultCandidate> {
    let n = candidates.len() as f64;
    candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            let hue = idx as f64 * (360.0 / n);
            let (r, g, b) = hsl_to_rgb(hue, saturation, lightness);
            ResultCandidate {
                id: c.id.clone(),
                label: c.label.clone(),
                color: format!("#{:02X}{:02X}{:02X}", r, g, b),
            }
        })
        .collect()
}
