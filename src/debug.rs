//! Debug export of pipeline rasters as PNG files

use crate::error::PrepError;
use crate::preprocessing::PipelineResult;
use crate::raster::RasterImage;
use std::path::{Path, PathBuf};

/// Write a raster as PNG, creating parent directories as needed
pub fn export_raster(raster: &RasterImage, path: &Path) -> Result<(), PrepError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PrepError::io(parent, e))?;
    }
    raster
        .to_rgb_image()?
        .save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Export the binary output and, when kept, the tone-mapped intermediate.
///
/// Files are named `<stem>.binary.png` and `<stem>.tonemap.png` inside `dir`.
pub fn export_result(
    result: &PipelineResult,
    dir: &Path,
    stem: &str,
) -> Result<Vec<PathBuf>, PrepError> {
    let mut written = Vec::new();

    let binary = dir.join(format!("{}.binary.png", stem));
    export_raster(&result.image, &binary)?;
    written.push(binary);

    if let Some(tone_mapped) = &result.tone_mapped {
        let path = dir.join(format!("{}.tonemap.png", stem));
        export_raster(tone_mapped, &path)?;
        written.push(path);
    }

    tracing::debug!("Exported {} debug image(s) to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::Pipeline;
    use crate::profile::Profile;

    fn capture() -> RasterImage {
        RasterImage::from_fn(40, 20, |x, _| {
            if x % 8 < 2 {
                [15, 15, 15]
            } else {
                [210, 210, 210]
            }
        })
        .unwrap()
    }

    #[test]
    fn test_export_raster_round_trips_through_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.png");
        let raster = capture();

        export_raster(&raster, &path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(RasterImage::from_rgb_image(loaded).unwrap(), raster);
    }

    #[test]
    fn test_export_result_writes_intermediates_when_kept() {
        let dir = tempfile::tempdir().unwrap();
        let result = Pipeline::new()
            .with_intermediates(true)
            .process(&capture(), &Profile::hdr())
            .unwrap();

        let written = export_result(&result, dir.path(), "frame").unwrap();

        assert_eq!(
            written,
            vec![
                dir.path().join("frame.binary.png"),
                dir.path().join("frame.tonemap.png")
            ]
        );
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_export_result_skips_missing_intermediates() {
        let dir = tempfile::tempdir().unwrap();
        let result = Pipeline::new().process(&capture(), &Profile::sdr()).unwrap();

        let written = export_result(&result, dir.path(), "frame").unwrap();
        assert_eq!(written.len(), 1);
        assert!(!dir.path().join("frame.tonemap.png").exists());
    }
}
