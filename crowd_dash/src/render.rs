use std::path::Path;

use ab_glyph::FontArc;
use anyhow::{Context, Result};
use tracing::info;
use zone_common::image_surface::ImageSurface;
use zone_common::overlay::render_overlay;
use zone_common::zone::ZoneRegistry;

/// Paints a saved zone layout over an image file.
pub fn render_zones(input: &Path, zones: &Path, output: &Path, font: Option<&Path>) -> Result<()> {
    let frame = image::open(input)
        .with_context(|| format!("Failed to open image {}", input.display()))?
        .to_rgba8();
    let registry = ZoneRegistry::load_from(zones)?;

    let mut surface = ImageSurface::new(frame);
    if let Some(path) = font {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read font {}", path.display()))?;
        let font = FontArc::try_from_vec(data).context("Unsupported font file")?;
        surface = surface.with_font(font);
    }

    render_overlay(&mut surface, registry.zones(), None);
    // RGB output so JPEG targets work too.
    image::DynamicImage::ImageRgba8(surface.into_image())
        .to_rgb8()
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("painted {} zone(s) onto {}", registry.len(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zone_common::geometry::Rect;
    use zone_common::zone::ZoneForm;

    #[test]
    fn test_render_zones_to_png() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("frame.png");
        image::RgbaImage::from_pixel(100, 80, image::Rgba([0, 0, 0, 255]))
            .save(&input)
            .unwrap();

        let mut registry = ZoneRegistry::new();
        let form = ZoneForm {
            name: "Gate".into(),
            color: "#FF0000".into(),
            ..ZoneForm::default()
        };
        registry.add(Rect::new(20.0, 20.0, 40.0, 30.0), &form).unwrap();
        let zones = dir.path().join("zones.json");
        registry.save_to(&zones).unwrap();

        let output = dir.path().join("out.png");
        render_zones(&input, &zones, &output, None).unwrap();

        let painted = image::open(&output).unwrap().to_rgba8();
        assert_eq!(painted.dimensions(), (100, 80));
        // border pixel is the zone color, far corner untouched
        assert_eq!(painted.get_pixel(20, 35)[0], 255);
        assert_eq!(painted.get_pixel(99, 79), &image::Rgba([0, 0, 0, 255]));
    }
}
