//! End-to-end conversion: image → filtered pixels → heightmap → mesh → STL.
//!
//! Each call is independent; nothing is cached between invocations.

use tracing::{info, instrument};

use crate::error::Result;
use crate::filter::apply_filters_with;
use crate::geometry::MeshGeometry;
use crate::heightmap::{extract_heightmap, Heightmap};
use crate::raster::{ImageOpsSurface, RasterImage, RasterSurface};
use crate::relief::build_relief;
use crate::settings::{FilterSettings, ModelSettings};
use crate::stl::{to_binary_stl, BinaryMeshBuffer};

/// Everything produced by one full pipeline run.
#[derive(Debug, Clone)]
pub struct Lithophane {
    pub heightmap: Heightmap,
    pub mesh: MeshGeometry,
    pub stl: BinaryMeshBuffer,
}

/// Filter the image and extract its heightmap, sampled at the model's
/// sampling resolution. Useful on its own for live previews.
pub fn generate_heightmap(
    image: &RasterImage,
    filter: &FilterSettings,
    model: &ModelSettings,
) -> Result<Heightmap> {
    generate_heightmap_with(image, filter, model, &ImageOpsSurface)
}

/// [`generate_heightmap`] with a caller-supplied raster surface.
pub fn generate_heightmap_with<S: RasterSurface + ?Sized>(
    image: &RasterImage,
    filter: &FilterSettings,
    model: &ModelSettings,
    surface: &S,
) -> Result<Heightmap> {
    let filtered = apply_filters_with(image, filter, model.sampling_resolution, surface)?;
    Ok(extract_heightmap(&filtered))
}

/// Run every stage and return the heightmap, mesh and serialized STL.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn build_lithophane(
    image: &RasterImage,
    filter: &FilterSettings,
    model: &ModelSettings,
) -> Result<Lithophane> {
    model.validate()?;
    let heightmap = generate_heightmap(image, filter, model)?;
    let mesh = build_relief(&heightmap, model)?;
    let stl = to_binary_stl(&mesh)?;

    info!(
        map_width = heightmap.width(),
        map_height = heightmap.height(),
        triangles = mesh.triangle_count(),
        bytes = stl.len(),
        "lithophane generated"
    );

    Ok(Lithophane {
        heightmap,
        mesh,
        stl,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LithoError;

    #[test]
    fn test_heightmap_respects_sampling_resolution() {
        let image = RasterImage::filled(40, 10, [128, 128, 128, 255]).unwrap();
        let model = ModelSettings {
            sampling_resolution: 20,
            ..ModelSettings::default()
        };
        let map = generate_heightmap(&image, &FilterSettings::default(), &model).unwrap();
        assert_eq!((map.width(), map.height()), (20, 5));
    }

    #[test]
    fn test_model_validated_before_filtering() {
        let image = RasterImage::filled(2, 2, [0, 0, 0, 255]).unwrap();
        let model = ModelSettings {
            height: 0.0,
            ..ModelSettings::default()
        };
        assert!(matches!(
            build_lithophane(&image, &FilterSettings::default(), &model),
            Err(LithoError::InvalidModelSettings { .. })
        ));
    }

    #[test]
    fn test_outputs_agree() {
        let image = RasterImage::filled(6, 3, [255, 255, 255, 255]).unwrap();
        let result =
            build_lithophane(&image, &FilterSettings::default(), &ModelSettings::default()).unwrap();
        assert_eq!(result.heightmap.values().len(), 18);
        assert_eq!(result.stl.triangle_count() as usize, result.mesh.triangle_count());
    }
}
