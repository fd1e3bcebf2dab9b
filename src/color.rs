use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| hsl_to_color32((i as f32 / n as f32) * 360.0, 0.75, 0.55))
        .collect()
}

/// Sequential scale for `t` in `[0, 1]`: pale to deep blue.
pub fn sequential(t: f64) -> Color32 {
    let t = t.clamp(0.0, 1.0) as f32;
    hsl_to_color32(215.0, 0.7, 0.95 - 0.55 * t)
}

/// Diverging scale for `t` in `[-1, 1]`: red through white to blue.
pub fn diverging(t: f64) -> Color32 {
    let t = t.clamp(-1.0, 1.0) as f32;
    let hue = if t < 0.0 { 5.0 } else { 215.0 };
    hsl_to_color32(hue, 0.7, 0.95 - 0.5 * t.abs())
}

// ---------------------------------------------------------------------------
// Color mapping: series label → Color32
// ---------------------------------------------------------------------------

/// Labels that always get the same colour, whatever else is on the chart.
const FIXED: [(&str, Color32); 4] = [
    ("APROVADO", Color32::from_rgb(46, 160, 67)),
    ("REPROVADO", Color32::from_rgb(214, 39, 40)),
    ("SIM", Color32::from_rgb(255, 127, 14)),
    ("NÃO", Color32::from_rgb(31, 119, 180)),
];

/// Maps the series labels of one chart to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map for the given labels, in display order.
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let labels: Vec<&str> = labels.into_iter().collect();
        let palette = generate_palette(labels.len());
        let mapping = labels
            .iter()
            .zip(palette)
            .map(|(label, generated)| {
                let fixed = FIXED.iter().find(|(name, _)| name == label).map(|(_, c)| *c);
                (label.to_string(), fixed.unwrap_or(generated))
            })
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::LIGHT_BLUE,
        }
    }

    /// Look up the colour for a label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Return the legend entries (label → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.mapping.iter().map(|(v, c)| (v.clone(), *c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let p = generate_palette(6);
        assert_eq!(p.len(), 6);
        for (i, a) in p.iter().enumerate() {
            assert!(p[i + 1..].iter().all(|b| b != a));
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn approval_labels_keep_fixed_colours() {
        let map = ColorMap::new(["REPROVADO", "APROVADO"]);
        assert_eq!(map.color_for("APROVADO"), Color32::from_rgb(46, 160, 67));
        assert_eq!(map.color_for("unknown"), Color32::LIGHT_BLUE);
        assert_eq!(map.legend_entries().len(), 2);
    }

    #[test]
    fn scales_darken_with_magnitude() {
        let light = sequential(0.0);
        let dark = sequential(1.0);
        assert!(dark.r() < light.r());
        assert_eq!(diverging(0.5), diverging(0.5));
        assert_ne!(diverging(-0.8), diverging(0.8));
    }
}
