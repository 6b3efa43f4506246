//! Enhancement chain properties.

use grid_processor::{
    expand_to_clip_bounds, read_point_table, reconstruct_grid, upsample, write_point_table, EnhancementChain,
    EnhancementConfig, NoConform,
};
use raster_common::{AoiDocument, AreaOfInterest, BoundingBox, GeoTransform, RasterGrid};
use test_utils::{nan_positions, ndvi_field, ramp_grid, rectangle_polygon, with_nan_holes};

fn aoi_of(bounds: (f64, f64, f64, f64)) -> AreaOfInterest {
    AreaOfInterest::new(vec![AoiDocument::from_value(rectangle_polygon(bounds)).unwrap()])
}

fn bits(grid: &RasterGrid) -> Vec<u32> {
    grid.data().iter().map(|v| v.to_bits()).collect()
}

#[test]
fn test_upsample_factor_at_most_one_is_identity() {
    let grid = with_nan_holes(&ndvi_field(7, 5), &[(2, 2)]);
    let gt = GeoTransform::new(-47.0, -22.0, 0.01, 0.01).unwrap();
    for factor in [1.0, 0.5, 0.0, -3.0] {
        let (out, t) = upsample(&grid, &gt, factor).unwrap();
        assert_eq!(bits(&out), bits(&grid));
        assert_eq!(t, gt);
    }
}

#[test]
fn test_chain_quadrant_mask() {
    let grid = with_nan_holes(&ramp_grid(4, 4), &[(0, 0)]);
    let gt = GeoTransform::new(0.0, 4.0, 1.0, 1.0).unwrap();
    let chain = EnhancementChain::new(EnhancementConfig {
        clip: true,
        sharpen: true,
        sharpen_radius: 1.0,
        sharpen_amount: 1.5,
        ..Default::default()
    });
    let aoi = aoi_of((2.0, 0.0, 4.0, 2.0));

    let (out, _) = chain.apply(grid, gt, &aoi, None, &NoConform).unwrap();
    assert_eq!(out.finite_count(), 4);
    for (r, c) in nan_positions(&out) {
        assert!(r < 2 || c < 2);
    }
    assert!(out.get(0, 0).unwrap().is_nan());
}

#[test]
fn test_chain_is_deterministic_and_remask_is_stable() {
    let grid = ndvi_field(12, 12);
    let gt = GeoTransform::new(0.0, 12.0, 1.0, 1.0).unwrap();
    let chain = EnhancementChain::new(EnhancementConfig::compare_all());
    let aoi = AreaOfInterest::new(vec![AoiDocument::from_value(serde_json::json!({
        "type": "Polygon",
        "coordinates": [[[1.5, 1.2], [10.7, 2.4], [6.1, 11.3], [1.5, 1.2]]]
    }))
    .unwrap()]);

    let (a, ta) = chain.apply(grid.clone(), gt, &aoi, None, &NoConform).unwrap();
    let (b, tb) = chain.apply(grid, gt, &aoi, None, &NoConform).unwrap();
    assert_eq!(ta, tb);
    assert_eq!(bits(&a), bits(&b));
    assert_eq!(a.shape(), (144, 144));

    let remasked = grid_processor::mask_with_aoi(&a, &ta, &aoi).unwrap();
    assert_eq!(bits(&remasked), bits(&a));
}

#[test]
fn test_clip_disabled_keeps_every_pixel() {
    let grid = ndvi_field(6, 6);
    let gt = GeoTransform::new(0.0, 6.0, 1.0, 1.0).unwrap();
    let chain = EnhancementChain::new(EnhancementConfig::default());
    let (out, t) = chain
        .apply(grid.clone(), gt, &aoi_of((0.0, 0.0, 1.0, 1.0)), None, &NoConform)
        .unwrap();
    assert_eq!(bits(&out), bits(&grid));
    assert_eq!(t, gt);
}

#[test]
fn test_raster_table_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let grid = ndvi_field(5, 7);
    let gt = GeoTransform::new(-47.16, -22.85, 0.0005, 0.0005).unwrap();
    let path = dir.path().join("NDVI.csv");

    assert_eq!(write_point_table(&grid, &gt, &path).unwrap(), 35);
    let (rebuilt, t) = reconstruct_grid(&read_point_table(&path).unwrap()).unwrap();
    assert_eq!(rebuilt.shape(), grid.shape());
    assert_eq!(bits(&rebuilt), bits(&grid));
    assert!((t.origin_x() - gt.origin_x()).abs() < 1e-9);
    assert!((t.origin_y() - gt.origin_y()).abs() < 1e-9);
}

#[test]
fn test_table_with_holes_is_irregular() {
    let dir = tempfile::tempdir().unwrap();
    let grid = with_nan_holes(&ndvi_field(5, 7), &[(0, 3), (4, 6)]);
    let gt = GeoTransform::new(-47.16, -22.85, 0.0005, 0.0005).unwrap();
    let path = dir.path().join("holes.csv");

    assert_eq!(write_point_table(&grid, &gt, &path).unwrap(), 33);
    let err = reconstruct_grid(&read_point_table(&path).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        grid_processor::RenderError::IrregularGrid {
            distinct_lons: 7,
            distinct_lats: 5,
            rows: 33
        }
    ));
}

#[test]
fn test_expand_keeps_data_aligned() {
    let grid = ramp_grid(2, 2);
    let gt = GeoTransform::new(1.0, 3.0, 0.5, 0.5).unwrap();
    let clip = BoundingBox::new(0.0, 1.0, 2.5, 3.0);
    let (out, t) = expand_to_clip_bounds(&grid, &gt, &clip).unwrap();
    // Two columns on the left, one on the right, two rows below
    assert_eq!(out.shape(), (4, 5));
    assert_eq!(t.origin_x(), 0.0);
    assert_eq!(out.get(0, 2), Some(1.0));
    assert_eq!(out.get(1, 3), Some(4.0));
    assert_eq!(out.finite_count(), 4);
}
