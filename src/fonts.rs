//! Locating a TrueType font for detection labels.
//!
//! The lookup never fails: when no candidate can be loaded the resolver hands
//! back [`LabelFont::Unavailable`], and label sizing falls back to a
//! fixed-width estimate.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};

/// Point size labels are rendered at.
pub const LABEL_FONT_SIZE: f32 = 16.0;

/// Per-character width used when no font metrics are available.
pub const FALLBACK_CHAR_WIDTH: u32 = 6;
/// Line height used when no font metrics are available.
pub const FALLBACK_TEXT_HEIGHT: u32 = 12;

const WINDOWS_FONTS: &[&str] = &[
    "C:/Windows/Fonts/arial.ttf",
    "C:/Windows/Fonts/calibri.ttf",
    "C:/Windows/Fonts/verdana.ttf",
];

const LINUX_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/ubuntu/Ubuntu-R.ttf",
    "/System/Library/Fonts/Arial.ttf",
];

const MACOS_FONTS: &[&str] = &[
    "/System/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "/Library/Fonts/Arial.ttf",
];

// Tried after the platform row, wherever we are running.
const GENERIC_FONTS: &[&str] = &[
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/local/share/fonts/DejaVuSans.ttf",
];

/// Ordered font candidates for an OS name as reported by [`std::env::consts::OS`].
pub fn platform_candidates(os: &str) -> &'static [&'static str] {
    match os {
        "windows" => WINDOWS_FONTS,
        "linux" => LINUX_FONTS,
        _ => MACOS_FONTS,
    }
}

/// A loaded label font, or the marker that none could be found.
pub enum LabelFont {
    Loaded { font: FontVec, scale: PxScale },
    Unavailable,
}

impl LabelFont {
    pub fn is_available(&self) -> bool {
        matches!(self, LabelFont::Loaded { .. })
    }

    /// Width and height of `text` once rendered.
    pub fn text_size(&self, text: &str) -> (u32, u32) {
        match self {
            LabelFont::Loaded { font, scale } => imageproc::drawing::text_size(*scale, font, text),
            LabelFont::Unavailable => (
                text.chars().count() as u32 * FALLBACK_CHAR_WIDTH,
                FALLBACK_TEXT_HEIGHT,
            ),
        }
    }
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelFont::Loaded { scale, .. } => f
                .debug_struct("Loaded")
                .field("scale", &scale.y)
                .finish_non_exhaustive(),
            LabelFont::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// Candidate table resolved once at startup.
#[derive(Debug, Clone)]
pub struct FontResolver {
    candidates: Vec<PathBuf>,
    fallbacks: Vec<PathBuf>,
}

impl FontResolver {
    pub fn new(candidates: Vec<PathBuf>, fallbacks: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            fallbacks,
        }
    }

    pub fn for_platform(os: &str) -> Self {
        Self::new(
            platform_candidates(os).iter().map(PathBuf::from).collect(),
            GENERIC_FONTS.iter().map(PathBuf::from).collect(),
        )
    }

    pub fn for_current_platform() -> Self {
        Self::for_platform(std::env::consts::OS)
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    pub fn resolve(&self) -> LabelFont {
        let found = self
            .candidates
            .iter()
            .chain(self.fallbacks.iter())
            .find_map(|path| load_font(path).map(|font| (path, font)));

        match found {
            Some((path, font)) => {
                tracing::debug!("using label font {}", path.display());
                LabelFont::Loaded {
                    font,
                    scale: PxScale::from(LABEL_FONT_SIZE),
                }
            }
            None => {
                tracing::warn!("no usable font found; label text will not be rendered");
                LabelFont::Unavailable
            }
        }
    }
}

fn load_font(path: &Path) -> Option<FontVec> {
    if !path.is_file() {
        return None;
    }

    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(err) => {
            tracing::debug!("skipping font {}: {err}", path.display());
            return None;
        }
    };

    match FontVec::try_from_vec_and_index(data, 0) {
        Ok(font) => Some(font),
        Err(err) => {
            tracing::debug!("skipping font {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_rows() {
        assert_eq!(platform_candidates("windows")[0], "C:/Windows/Fonts/arial.ttf");
        assert_eq!(platform_candidates("linux").len(), 4);
        assert_eq!(platform_candidates("macos"), MACOS_FONTS);
        assert_eq!(platform_candidates("freebsd"), MACOS_FONTS);
    }

    #[test]
    fn missing_fonts_yield_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FontResolver::new(
            vec![dir.path().join("nope.ttf")],
            vec![dir.path().join("also-nope.ttf")],
        );
        assert!(!resolver.resolve().is_available());
    }

    #[test]
    fn unparsable_font_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"definitely not a font").unwrap();

        let resolver = FontResolver::new(vec![bogus], vec![]);
        assert!(!resolver.resolve().is_available());
    }

    #[test]
    fn heuristic_text_size() {
        let font = LabelFont::Unavailable;
        assert_eq!(font.text_size("cat 99.9%"), (54, 12));
        assert_eq!(font.text_size(""), (0, 12));
    }
}
