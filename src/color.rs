use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::gray(0.);
    pub const WHITE: Color = Color::gray(1.);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Color {
        Color { r, g, b, a: 1. }
    }

    pub const fn gray(level: f64) -> Color {
        Color::rgb(level, level, level)
    }

    /// Packs the color into a 0xAARRGGBB pixel value.
    pub fn pixel(&self) -> u32 {
        let channel = |c: f64| (c.max(0.).min(1.) * 255.).round() as u32;
        channel(self.a) << 24 | channel(self.r) << 16 | channel(self.g) << 8 | channel(self.b)
    }
}

/// A server-side image that can be used as a background tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pixmap {
    /// Native pixmap id.
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

/// How a surface's background is filled.
///
/// Pixmaps are shared; a view holds one reference for as long as the pixmap is its background.
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Color(Color),
    Pixmap(Arc<Pixmap>),
}

impl Default for Background {
    fn default() -> Self {
        Background::Color(Color::default())
    }
}

#[test]
fn test_color_pixel() {
    assert_eq!(Color::BLACK.pixel(), 0xff00_0000);
    assert_eq!(Color::WHITE.pixel(), 0xffff_ffff);
    assert_eq!(Color::rgb(1., 0., 0.).pixel(), 0xffff_0000);
    assert_eq!(Color { r: 2., g: -1., b: 0., a: 0. }.pixel(), 0x00ff_0000);
}
