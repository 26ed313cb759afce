use rand::Rng;
use shared::MAX_NAME_LEN;

// Curated, high-contrast colours for the first players to join.
const PALETTE: [&str; 24] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#fabebe", "#008080", "#e6beff", "#9a6324", "#fffac8", "#800000", "#aaffc3",
    "#808000", "#ffd8b1", "#000075", "#808080", "#ff6f61", "#6b5b95", "#88b04b", "#f7cac9",
];

const GOLDEN_ANGLE: f64 = 137.508;

// Deterministic colour for a join rank; golden-angle hues once the palette runs out
pub fn player_color(color_index: u32) -> String {
    match PALETTE.get(color_index as usize) {
        Some(color) => color.to_string(),
        None => format!("hsl({:.1}, 70%, 55%)", player_hue(color_index)),
    }
}

pub fn player_hue(color_index: u32) -> f64 {
    (color_index as f64 * GOLDEN_ANGLE).rem_euclid(360.0)
}

// Trimmed display name, or a random guest name when none was given
pub fn display_name(requested: Option<&str>) -> String {
    match requested.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.chars().take(MAX_NAME_LEN).collect(),
        None => format!("Guest-{:04}", rand::thread_rng().gen_range(0..10_000)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_palette_colors_for_first_indices() {
        assert_eq!(player_color(0), "#e6194b");
        assert_eq!(player_color(23), "#f7cac9");
    }

    #[test]
    fn test_golden_angle_colors_beyond_palette() {
        assert_approx_eq!(player_hue(24), (24.0 * 137.508) % 360.0, 1e-9);
        assert_eq!(player_color(24), format!("hsl({:.1}, 70%, 55%)", player_hue(24)));
        assert_ne!(player_color(24), player_color(25));
    }

    #[test]
    fn test_colors_are_deterministic() {
        for index in [0, 5, 24, 99, 1000] {
            assert_eq!(player_color(index), player_color(index));
        }
    }

    #[test]
    fn test_display_name_trims_and_truncates() {
        assert_eq!(display_name(Some("  Alice ")), "Alice");
        let long = "x".repeat(100);
        assert_eq!(display_name(Some(&long)).len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_display_name_generates_guest() {
        for requested in [None, Some(""), Some("   ")] {
            let name = display_name(requested);
            assert!(name.starts_with("Guest-"), "unexpected name {}", name);
            assert_eq!(name.len(), "Guest-0000".len());
        }
    }
}
