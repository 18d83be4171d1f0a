// Placeholder image generation
//
// Images are generated once and then reused: an existing file is never
// regenerated, so a re-run uploads byte-identical content.

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::SeedError;

const LABEL_ORIGIN: (u32, u32) = (10, 10);
const GLYPH_SIZE: u32 = 8;
const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Fill color for a placeholder, parsed from a color name or `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 3]);

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("white", [255, 255, 255]),
    ("black", [0, 0, 0]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("orange", [255, 165, 0]),
    ("purple", [128, 0, 128]),
];

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(format!("Invalid hex color '{}'", s));
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
            return match (channel(0), channel(2), channel(4)) {
                (Ok(r), Ok(g), Ok(b)) => Ok(Color([r, g, b])),
                _ => Err(format!("Invalid hex color '{}'", s)),
            };
        }

        let lower = s.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, rgb)| Color(*rgb))
            .ok_or_else(|| format!("Unknown color '{}'", s))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((name, _)) = NAMED_COLORS.iter().find(|(_, rgb)| *rgb == self.0) {
            return write!(f, "{}", name);
        }
        let [r, g, b] = self.0;
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

/// One placeholder in the upload plan
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlaceholderSpec {
    pub name: String,
    pub color: Color,
    pub width: u32,
    pub height: u32,
}

impl PlaceholderSpec {
    pub fn new(name: &str, color: Color, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            color,
            width,
            height,
        }
    }

    pub fn orientation(&self) -> Orientation {
        match self.height.cmp(&self.width) {
            std::cmp::Ordering::Greater => Orientation::Portrait,
            std::cmp::Ordering::Less => Orientation::Landscape,
            std::cmp::Ordering::Equal => Orientation::Square,
        }
    }

    /// The default three-image plan, in upload order (oldest first).
    ///
    /// With newest-first display the frame shows portrait_new, landscape_mid,
    /// portrait_old, so portrait pairing has to skip over the landscape.
    pub fn default_plan() -> Vec<PlaceholderSpec> {
        vec![
            PlaceholderSpec::new("portrait_old.png", Color([0, 0, 255]), 500, 1000),
            PlaceholderSpec::new("landscape_mid.png", Color([255, 0, 0]), 1000, 500),
            PlaceholderSpec::new("portrait_new.png", Color([0, 128, 0]), 500, 1000),
        ]
    }
}

/// Make sure the placeholder exists under `dir`, generating it if needed.
///
/// Returns the path to the file. An existing file is left untouched.
pub fn ensure_placeholder(dir: &Path, spec: &PlaceholderSpec) -> Result<PathBuf, SeedError> {
    let path = dir.join(&spec.name);
    if path.exists() {
        tracing::debug!(path = %path.display(), "placeholder already present");
        return Ok(path);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut img = RgbImage::from_pixel(spec.width, spec.height, Rgb(spec.color.0));
    stamp_label(&mut img, &spec.name);

    match ImageFormat::from_path(&path) {
        Ok(format) => img.save_with_format(&path, format)?,
        Err(_) => img.save_with_format(&path, ImageFormat::Png)?,
    }

    tracing::info!(
        path = %path.display(),
        width = spec.width,
        height = spec.height,
        color = %spec.color,
        "generated placeholder"
    );
    Ok(path)
}

/// Generate every placeholder of the plan, in order, off the async runtime.
pub async fn prepare_all(dir: &Path, plan: &[PlaceholderSpec]) -> Result<Vec<PathBuf>, SeedError> {
    let dir = dir.to_path_buf();
    let plan = plan.to_vec();
    tokio::task::spawn_blocking(move || {
        plan.iter()
            .map(|spec| ensure_placeholder(&dir, spec))
            .collect::<Result<Vec<_>, _>>()
    })
    .await
    .map_err(|e| SeedError::Image(format!("Image generation task failed: {}", e)))?
}

// Draw text with the 8x8 bitmap font, clipped to the image bounds
fn stamp_label(img: &mut RgbImage, text: &str) {
    let (x0, y0) = LABEL_ORIGIN;
    for (i, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let gx = x0 + i as u32 * GLYPH_SIZE;
        for (row, &bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let (x, y) = (gx + col, y0 + row as u32);
                if x < img.width() && y < img.height() {
                    img.put_pixel(x, y, LABEL_COLOR);
                }
            }
        }
    }
}
