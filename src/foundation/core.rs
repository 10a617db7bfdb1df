use crate::foundation::error::{MatchcutError, MatchcutResult};

/// Absolute 0-based frame index in job timeline space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Byte length of one RGBA8 frame for this canvas.
    pub fn rgba8_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

/// Straight-alpha RGBA8 color. Serializes as a `#RRGGBB`/`#RRGGBBAA` hex
/// string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional, case-insensitive).
    pub fn parse_hex(s: &str) -> MatchcutResult<Self> {
        let s = s.trim();
        let s = s.strip_prefix('#').unwrap_or(s);

        fn hex_byte(pair: &str) -> MatchcutResult<u8> {
            u8::from_str_radix(pair, 16)
                .map_err(|_| MatchcutError::config(format!("invalid hex byte \"{pair}\"")))
        }

        match s.len() {
            6 => Ok(Self {
                r: hex_byte(&s[0..2])?,
                g: hex_byte(&s[2..4])?,
                b: hex_byte(&s[4..6])?,
                a: 255,
            }),
            8 => Ok(Self {
                r: hex_byte(&s[0..2])?,
                g: hex_byte(&s[2..4])?,
                b: hex_byte(&s[4..6])?,
                a: hex_byte(&s[6..8])?,
            }),
            _ => Err(MatchcutError::config(
                "hex color must be #RRGGBB or #RRGGBBAA",
            )),
        }
    }

}

impl serde::Serialize for Rgba8 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        };
        serializer.serialize_str(&s)
    }
}

impl<'de> serde::Deserialize<'de> for Rgba8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// One rendered frame: row-major premultiplied RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRgba {
    /// Validate that `data` matches `width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> MatchcutResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| MatchcutError::render("frame buffer size overflow"))?;
        if data.len() != expected {
            return Err(MatchcutError::render(format!(
                "frame data len {} does not match {}x{}x4",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_rgb_and_rgba() {
        let c = Rgba8::parse_hex("#ff0000").unwrap();
        assert_eq!(c, Rgba8::opaque(255, 0, 0));

        let c = Rgba8::parse_hex("0000FF80").unwrap();
        assert_eq!(c.b, 255);
        assert_eq!(c.a, 128);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(Rgba8::parse_hex("#f00").is_err());
        assert!(Rgba8::parse_hex("#zzzzzz").is_err());
        assert!(Rgba8::parse_hex("").is_err());
    }

    #[test]
    fn frame_rejects_mismatched_buffer() {
        assert!(FrameRgba::new(2, 2, vec![0u8; 15]).is_err());
        assert!(FrameRgba::new(2, 2, vec![0u8; 16]).is_ok());
    }
}
