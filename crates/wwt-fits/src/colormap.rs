//! Named color lookup tables used to tint single-channel images.

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn gray(v: u8) -> Self {
        Self::new(v, v, v, 255)
    }
}

/// A color map defined by evenly spaced RGB control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMap {
    name: &'static str,
    stops: &'static [[u8; 3]],
}

const GRAY: &[[u8; 3]] = &[[0, 0, 0], [255, 255, 255]];

const GREYS: &[[u8; 3]] = &[[255, 255, 255], [0, 0, 0]];

const VIRIDIS: &[[u8; 3]] = &[
    [68, 1, 84],
    [71, 44, 122],
    [59, 81, 139],
    [44, 113, 142],
    [33, 144, 141],
    [39, 173, 129],
    [92, 200, 99],
    [170, 220, 50],
    [253, 231, 37],
];

const PLASMA: &[[u8; 3]] = &[
    [13, 8, 135],
    [84, 2, 163],
    [139, 10, 165],
    [185, 50, 137],
    [219, 92, 104],
    [244, 136, 73],
    [254, 188, 43],
    [249, 221, 36],
    [240, 249, 33],
];

const INFERNO: &[[u8; 3]] = &[
    [0, 0, 4],
    [31, 12, 72],
    [85, 15, 109],
    [136, 34, 106],
    [186, 54, 85],
    [227, 89, 51],
    [249, 140, 10],
    [249, 201, 50],
    [252, 255, 164],
];

const MAGMA: &[[u8; 3]] = &[
    [0, 0, 4],
    [28, 16, 68],
    [79, 18, 123],
    [129, 37, 129],
    [181, 54, 122],
    [229, 80, 100],
    [251, 135, 97],
    [254, 194, 135],
    [252, 253, 191],
];

const CIVIDIS: &[[u8; 3]] = &[
    [0, 34, 78],
    [64, 77, 107],
    [124, 123, 120],
    [188, 175, 111],
    [254, 232, 56],
];

impl ColorMap {
    pub const GRAY: ColorMap = ColorMap::new("gray", GRAY);
    pub const GREYS: ColorMap = ColorMap::new("greys", GREYS);
    pub const VIRIDIS: ColorMap = ColorMap::new("viridis", VIRIDIS);
    pub const PLASMA: ColorMap = ColorMap::new("plasma", PLASMA);
    pub const INFERNO: ColorMap = ColorMap::new("inferno", INFERNO);
    pub const MAGMA: ColorMap = ColorMap::new("magma", MAGMA);
    pub const CIVIDIS: ColorMap = ColorMap::new("cividis", CIVIDIS);

    pub const ALL: [ColorMap; 7] = [
        ColorMap::GRAY,
        ColorMap::GREYS,
        ColorMap::VIRIDIS,
        ColorMap::PLASMA,
        ColorMap::INFERNO,
        ColorMap::MAGMA,
        ColorMap::CIVIDIS,
    ];

    /// `stops` must hold at least two colors.
    pub const fn new(name: &'static str, stops: &'static [[u8; 3]]) -> Self {
        assert!(stops.len() >= 2);
        Self { name, stops }
    }

    /// Find a built-in map by name, ignoring case. `grey` is accepted for `gray`.
    pub fn by_name(name: &str) -> Option<ColorMap> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("grey") {
            return Some(ColorMap::GRAY);
        }
        Self::ALL
            .into_iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Opaque color at position `t` in `[0, 1]`, interpolated between control points.
    ///
    /// NaN yields a transparent pixel.
    pub fn lookup(&self, t: f64) -> Rgba {
        if t.is_nan() {
            return Rgba::TRANSPARENT;
        }
        let segments = (self.stops.len() - 1) as f64;
        let pos = t.clamp(0.0, 1.0) * segments;
        let i = (libm::floor(pos) as usize).min(self.stops.len() - 2);
        let frac = pos - i as f64;
        let (a, b) = (self.stops[i], self.stops[i + 1]);
        let mix = |x: u8, y: u8| libm::round(x as f64 + (y as f64 - x as f64) * frac) as u8;
        Rgba::new(mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2]), 255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_endpoints_hit_control_points() {
        assert_eq!(ColorMap::VIRIDIS.lookup(0.0), Rgba::new(68, 1, 84, 255));
        assert_eq!(ColorMap::VIRIDIS.lookup(1.0), Rgba::new(253, 231, 37, 255));
        assert_eq!(ColorMap::GREYS.lookup(0.0), Rgba::gray(255));
    }

    #[test]
    fn gray_interpolates_linearly() {
        assert_eq!(ColorMap::GRAY.lookup(0.5), Rgba::gray(128));
        assert_eq!(ColorMap::GRAY.lookup(204.0 / 255.0), Rgba::gray(204));
    }

    #[test]
    fn lookup_clamps_and_handles_nan() {
        assert_eq!(ColorMap::MAGMA.lookup(-1.0), ColorMap::MAGMA.lookup(0.0));
        assert_eq!(ColorMap::MAGMA.lookup(7.0), ColorMap::MAGMA.lookup(1.0));
        assert_eq!(ColorMap::MAGMA.lookup(f64::NAN), Rgba::TRANSPARENT);
    }

    #[test]
    fn by_name_is_case_insensitive() {
        assert_eq!(ColorMap::by_name("Viridis"), Some(ColorMap::VIRIDIS));
        assert_eq!(ColorMap::by_name("grey"), Some(ColorMap::GRAY));
        assert_eq!(ColorMap::by_name("jet"), None);
    }

    #[test]
    fn rgba_is_four_bytes() {
        let px = [Rgba::new(1, 2, 3, 4)];
        assert_eq!(bytemuck::cast_slice::<Rgba, u8>(&px), &[1, 2, 3, 4]);
    }
}
