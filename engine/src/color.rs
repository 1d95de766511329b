use serde::{Deserialize, Serialize};

/// Packed `0xRRGGBB` tint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xFF_FF_FF);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub const fn r(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub const fn g(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    pub const fn b(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Per-channel linear blend; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, to: Rgb, t: f32) -> Rgb {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 1.0 };
        let mix = |a: u8, b: u8| -> u8 {
            let v = a as f32 + (b as f32 - a as f32) * t;
            v.round().clamp(0.0, 255.0) as u8
        };
        Rgb::new(mix(self.r(), to.r()), mix(self.g(), to.g()), mix(self.b(), to.b()))
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:06X}", self.0 & 0xFF_FF_FF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints_are_exact() {
        let from = Rgb(0xAAAAAA);
        let to = Rgb::WHITE;
        assert_eq!(from.lerp(to, 0.0), from);
        assert_eq!(from.lerp(to, 1.0), to);
    }

    #[test]
    fn lerp_blends_each_channel_independently() {
        let mid = Rgb::new(0, 100, 200).lerp(Rgb::new(200, 100, 0), 0.5);
        assert_eq!((mid.r(), mid.g(), mid.b()), (100, 100, 100));
    }

    #[test]
    fn serializes_as_packed_integer() {
        assert_eq!(serde_json::to_string(&Rgb(0xFFD46B)).expect("serialize"), "16766059");
        let back: Rgb = serde_json::from_str("16766059").expect("deserialize");
        assert_eq!(back, Rgb(0xFFD46B));
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(Rgb(0x7A1717).to_string(), "#7A1717");
    }
}
