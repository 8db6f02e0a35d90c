//! End-to-end scenarios through the public API.

use litho_core::stl::{PREAMBLE_SIZE, RECORD_SIZE};
use litho_core::{
    build_lithophane, build_relief, parse_binary_stl, to_binary_stl, FilterSettings, GridLayout,
    Heightmap, LithoError, ModelSettings, RasterImage,
};

fn white_square_settings() -> ModelSettings {
    ModelSettings {
        width: 20.0,
        height: 20.0,
        depth: 5.0,
        base_height: 2.0,
        frame_width: 0.0,
        curve_angle: 0.0,
        ..ModelSettings::default()
    }
}

#[test]
fn white_square_produces_flat_slab() {
    let image = RasterImage::filled(4, 4, [255, 255, 255, 255]).unwrap();
    let result = build_lithophane(&image, &FilterSettings::default(), &white_square_settings())
        .unwrap();

    assert_eq!((result.heightmap.width(), result.heightmap.height()), (4, 4));
    assert!(result.heightmap.values().iter().all(|&v| v == 1.0));

    let grid = 5 * 5;
    assert_eq!(result.mesh.vertex_count(), 2 * grid);
    let (top, bottom) = result.mesh.vertices.split_at(grid);
    assert!(top.iter().all(|p| (p.z - 7.0).abs() < 1e-6));
    assert!(bottom.iter().all(|p| p.z == 0.0));

    // 16 cells x 4 surface triangles, 16 perimeter segments x 2 wall triangles.
    assert_eq!(result.mesh.triangle_count(), 64 + 32);
    assert_eq!(result.stl.len(), PREAMBLE_SIZE + 96 * RECORD_SIZE);
    assert_eq!(result.stl.triangle_count(), 96);

    let bounds = result.mesh.bounds().unwrap();
    assert!((bounds.size().z - 7.0).abs() < 1e-6);
    assert!(result.mesh.edge_report().is_oriented_manifold());
}

#[test]
fn full_turn_closes_the_cylinder() {
    let image = RasterImage::filled(4, 4, [255, 255, 255, 255]).unwrap();
    let settings = ModelSettings {
        curve_angle: 360.0,
        ..white_square_settings()
    };
    let result = build_lithophane(&image, &FilterSettings::default(), &settings).unwrap();
    let layout = GridLayout::new(4, 4, &settings).unwrap();
    let n = layout.grid_vertex_count();

    for row in 0..=layout.segs_y {
        let first = layout.index(row, 0) as usize;
        let last = layout.index(row, layout.segs_x) as usize;
        for offset in [0, n] {
            let gap = result.mesh.vertices[first + offset] - result.mesh.vertices[last + offset];
            assert!(gap.norm() < 1e-4, "row {row} offset {offset}: {gap:?}");
        }
    }
}

#[test]
fn transparent_regions_stay_on_the_base() {
    let mut pixels = Vec::new();
    for i in 0..9 {
        let alpha = if i % 2 == 0 { 0 } else { 255 };
        pixels.extend_from_slice(&[255, 255, 255, alpha]);
    }
    let image = RasterImage::from_rgba(3, 3, pixels).unwrap();
    let result = build_lithophane(&image, &FilterSettings::default(), &white_square_settings())
        .unwrap();
    let expected = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
    assert_eq!(result.heightmap.values(), &expected);
}

#[test]
fn invert_turns_black_into_full_relief() {
    let image = RasterImage::filled(2, 2, [0, 0, 0, 255]).unwrap();
    let filter = FilterSettings {
        invert: true,
        ..FilterSettings::default()
    };
    let result = build_lithophane(&image, &filter, &white_square_settings()).unwrap();
    assert!(result.heightmap.values().iter().all(|&v| v == 1.0));
}

#[test]
fn framed_sheet_grows_by_twice_the_frame() {
    let image = RasterImage::filled(10, 5, [128, 128, 128, 255]).unwrap();
    let settings = ModelSettings {
        width: 100.0,
        height: 50.0,
        frame_width: 5.0,
        frame_depth: 4.0,
        base_height: 1.0,
        ..ModelSettings::default()
    };
    let result = build_lithophane(&image, &FilterSettings::default(), &settings).unwrap();
    let size = result.mesh.bounds().unwrap().size();
    assert!((size.x - 110.0).abs() < 1e-3);
    assert!((size.y - 60.0).abs() < 1e-3);
    // Frame rim is the tallest feature: base 1 + frame 4.
    assert!((size.z - 5.0).abs() < 1e-5);
    assert!(result.mesh.edge_report().is_oriented_manifold());
}

#[test]
fn stl_round_trip_preserves_geometry() {
    let map = Heightmap::new(3, 2, vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]).unwrap();
    let mesh = build_relief(&map, &white_square_settings()).unwrap();
    let buffer = to_binary_stl(&mesh).unwrap();

    let parsed = parse_binary_stl(buffer.as_bytes()).unwrap();
    assert_eq!(parsed.triangle_count(), mesh.triangle_count());
    assert_eq!(
        buffer.len() - PREAMBLE_SIZE,
        parsed.triangle_count() * RECORD_SIZE
    );
    for (i, facet) in parsed.facets.iter().enumerate() {
        assert_eq!(facet.vertices, mesh.triangle(i).vertices);
    }
}

#[test]
fn errors_surface_before_output() {
    let image = RasterImage::filled(2, 2, [0, 0, 0, 255]).unwrap();
    let filter = FilterSettings {
        gamma: -1.0,
        ..FilterSettings::default()
    };
    assert!(matches!(
        build_lithophane(&image, &filter, &ModelSettings::default()),
        Err(LithoError::InvalidFilterSettings { .. })
    ));

    assert!(matches!(
        RasterImage::from_rgba(0, 0, Vec::new()),
        Err(LithoError::InvalidDimensions { .. })
    ));
    assert!(matches!(
        to_binary_stl(&Default::default()),
        Err(LithoError::EmptyMesh)
    ));
}
