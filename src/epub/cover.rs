//! Generated cover image.

use crate::util::{escape_xml, title_case};

pub const COVER_WIDTH: u32 = 600;
pub const COVER_HEIGHT: u32 = 800;

const MIN_FONT_SIZE: u32 = 5;
const TITLE_MAX_FONT: u32 = 60;
const CREATOR_MAX_FONT: u32 = 40;

/// Advance width of a monospace glyph relative to its font size.
const GLYPH_ADVANCE: f64 = 0.6;

/// Render an SVG cover with the title at the top and the creator at the
/// bottom, both title-cased and centered.
pub fn cover_svg(title: &str, creator: &str) -> String {
    let title = title_case(title);
    let creator = title_case(creator);
    let title_size = fit_font_size(&title, 0.9, TITLE_MAX_FONT);
    let creator_size = fit_font_size(&creator, 0.5, CREATOR_MAX_FONT);

    format!(
        r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
  <rect width="100%" height="100%" fill="#1f2a36"/>
  <rect x="20" y="20" width="{iw}" height="{ih}" fill="none" stroke="#c9b37e" stroke-width="2"/>
  <text x="{cx}" y="{ty}" font-family="FreeMono, monospace" font-size="{title_size}" fill="#ffffff" text-anchor="middle">{title}</text>
  <text x="{cx}" y="{cy}" font-family="FreeMono, monospace" font-size="{creator_size}" fill="#ffffff" text-anchor="middle">{creator}</text>
</svg>
"##,
        w = COVER_WIDTH,
        h = COVER_HEIGHT,
        iw = COVER_WIDTH - 40,
        ih = COVER_HEIGHT - 40,
        cx = COVER_WIDTH / 2,
        ty = 10 + title_size,
        cy = COVER_HEIGHT - creator_size / 2,
        title = escape_xml(&title),
        creator = escape_xml(&creator),
    )
}

/// Grow the font until the text spans `ratio` of the cover width or the
/// size reaches `max`.
fn fit_font_size(text: &str, ratio: f64, max: u32) -> u32 {
    let limit = ratio * f64::from(COVER_WIDTH);
    let mut size = MIN_FONT_SIZE;
    while text_width(text, size) <= limit && size < max {
        size += 1;
    }
    size
}

fn text_width(text: &str, size: u32) -> f64 {
    text.chars().count() as f64 * f64::from(size) * GLYPH_ADVANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_hits_max_size() {
        assert_eq!(fit_font_size("Hi", 0.9, TITLE_MAX_FONT), TITLE_MAX_FONT);
        assert_eq!(fit_font_size("Me", 0.5, CREATOR_MAX_FONT), CREATOR_MAX_FONT);
    }

    #[test]
    fn test_long_text_shrinks_to_fit() {
        let title = "a".repeat(40);
        let size = fit_font_size(&title, 0.9, TITLE_MAX_FONT);
        assert!(size < TITLE_MAX_FONT);
        // first size past the limit, as the loop stops right after crossing it
        assert!(text_width(&title, size - 1) <= 0.9 * f64::from(COVER_WIDTH));
    }

    #[test]
    fn test_cover_svg_contents() {
        let svg = cover_svg("the art of <war>", "sun tzu");
        assert!(svg.contains("The Art Of &lt;War&gt;"));
        assert!(svg.contains(">Sun Tzu</text>"));
        assert!(svg.contains(r#"width="600" height="800""#));
    }
}
