/// Viridis sampled at every tenth; intermediate values interpolate linearly in RGB.
const VIRIDIS_STOPS: &[(f64, (u8, u8, u8))] = &[
    (0.0, (68, 1, 84)),
    (0.1, (72, 36, 117)),
    (0.2, (65, 68, 135)),
    (0.3, (53, 95, 141)),
    (0.4, (42, 120, 142)),
    (0.5, (33, 145, 140)),
    (0.6, (34, 168, 132)),
    (0.7, (68, 191, 112)),
    (0.8, (122, 209, 81)),
    (0.9, (189, 223, 38)),
    (1.0, (253, 231, 37)),
];

fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
    let t = t.clamp(0.0, 1.0);
    let value = a as f64 + (b as f64 - a as f64) * t;
    value.round().clamp(0.0, 255.0) as u8
}

/// Perceptually uniform sequential palette over `[0, 1]`. Out-of-range and
/// NaN inputs clamp to the ends.
pub fn viridis(t: f64) -> (u8, u8, u8) {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    for window in VIRIDIS_STOPS.windows(2) {
        let (left_pos, left_color) = window[0];
        let (right_pos, right_color) = window[1];
        if t >= left_pos && t <= right_pos {
            let span = (right_pos - left_pos).max(f64::EPSILON);
            let local = (t - left_pos) / span;
            return (
                lerp_u8(left_color.0, right_color.0, local),
                lerp_u8(left_color.1, right_color.1, local),
                lerp_u8(left_color.2, right_color.2, local),
            );
        }
    }

    VIRIDIS_STOPS
        .last()
        .map(|(_, color)| *color)
        .unwrap_or((253, 231, 37))
}

pub fn rgb_to_hex((r, g, b): (u8, u8, u8)) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// CSS color string for a normalized intensity.
pub fn color_scale(t: f64) -> String {
    rgb_to_hex(viridis(t))
}

#[cfg(test)]
mod tests {
    use super::{color_scale, rgb_to_hex, viridis};

    #[test]
    fn viridis_matches_palette_edges() {
        assert_eq!(viridis(0.0), (68, 1, 84));
        assert_eq!(viridis(0.5), (33, 145, 140));
        assert_eq!(viridis(1.0), (253, 231, 37));
    }

    #[test]
    fn viridis_clamps_out_of_range_input() {
        assert_eq!(viridis(-3.0), viridis(0.0));
        assert_eq!(viridis(7.5), viridis(1.0));
        assert_eq!(viridis(f64::NAN), viridis(0.0));
    }

    #[test]
    fn viridis_interpolates_between_stops() {
        assert_eq!(viridis(0.92), (202, 225, 38));
    }

    #[test]
    fn hex_formatting_is_lowercase_and_padded() {
        assert_eq!(rgb_to_hex((0, 10, 255)), "#000aff");
        assert_eq!(color_scale(0.0), "#440154");
        assert_eq!(color_scale(1.0), "#fde725");
    }

    #[test]
    fn color_scale_is_deterministic() {
        assert_eq!(color_scale(0.37), color_scale(0.37));
    }
}
