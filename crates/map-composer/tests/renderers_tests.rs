//! End-to-end renderer tests against GeoTIFF, GeoJSON and CSV fixtures.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use grid_processor::{read_point_table, reconstruct_grid};
use map_composer::{
    export_indices_csv, render_compare_all, CsvMapRenderer, IndexMapRenderer, MultiIndexMapRenderer,
    OverlayMapRenderer, RenderError, RenderOptions, TrueColorRenderer, TrueColorSource, COMPARE_ALL_FILE,
    ESRI_WORLD_IMAGERY, TRUE_COLOR_LAYER,
};
use raster_common::{AreaOfInterest, GeoTransform};
use test_utils::fixtures::{area, rectangle_polygon, write_geojson, write_point_csv};
use test_utils::generators::{ndvi_field, ramp_grid, reflectance_band};
use test_utils::{assert_approx_eq, GeoTiffFixture};

const NO_AOI: &[PathBuf] = &[];

fn field_tiff(dir: &Path, name: &str, grid: &raster_common::RasterGrid) -> PathBuf {
    let (x0, _, _, y1) = area::FIELD;
    GeoTiffFixture::from_grid(grid)
        .origin(x0 - 0.02, y1 + 0.02)
        .pixel_size(0.004, 0.004)
        .write_in(dir, name)
        .unwrap()
}

fn decode_overlay(data_uri: &str) -> image::DynamicImage {
    let encoded = data_uri.strip_prefix("data:image/png;base64,").unwrap();
    let bytes = STANDARD.decode(encoded).unwrap();
    image::load_from_memory(&bytes).unwrap()
}

#[test]
fn test_index_map_document() {
    let dir = tempfile::tempdir().unwrap();
    let raster = field_tiff(dir.path(), "NDVI.tif", &ndvi_field(20, 20));
    let aoi = write_geojson(dir.path(), "field.geojson", &rectangle_polygon(area::FIELD)).unwrap();

    let renderer = IndexMapRenderer::new(RenderOptions::default()).unwrap();
    let layer = renderer.prepare(&raster, &[aoi]).unwrap();
    let document = renderer.document(&layer).unwrap();

    assert_eq!(document.zoom_start(), 11);
    assert_eq!(document.base_layers()[1].name, ESRI_WORLD_IMAGERY);
    assert_eq!(document.overlays().len(), 1);
    assert_eq!(document.aoi_overlays().len(), 1);

    let legend = &document.legends()[0];
    assert_eq!(legend.colors.len(), 10);
    assert_eq!(
        legend.caption,
        format!("NDVI (min={:.3}, max={:.3})", legend.vmin, legend.vmax)
    );
    assert!(legend.vmin < legend.vmax);

    let overlay = decode_overlay(&document.overlays()[0].data_uri).to_rgba8();
    assert_eq!((overlay.width(), overlay.height()), (20, 20));
    // Default opacity 0.75
    assert_eq!(overlay.get_pixel(10, 10)[3], 191);
}

#[test]
fn test_index_map_render_writes_html() {
    let dir = tempfile::tempdir().unwrap();
    let raster = field_tiff(dir.path(), "NDMI.tif", &ndvi_field(12, 12));
    let output = dir.path().join("maps/ndmi.html");

    let renderer = IndexMapRenderer::new(RenderOptions::default()).unwrap();
    let written = renderer.render(&raster, NO_AOI, &output).unwrap();
    assert_eq!(written, output);

    let html = std::fs::read_to_string(&output).unwrap();
    assert!(html.contains("<title>NDMI</title>"));
    assert!(html.contains("data:image/png;base64,"));
    assert!(html.contains("NDMI (min="));
}

#[test]
fn test_export_csv_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let grid = ndvi_field(6, 5);
    let raster = field_tiff(dir.path(), "NDVI.tif", &grid);
    let renderer = IndexMapRenderer::new(RenderOptions::default()).unwrap();
    let layer = renderer.prepare(&raster, NO_AOI).unwrap();

    let table = dir.path().join("tables/NDVI.csv");
    assert_eq!(renderer.export_csv(&layer, &table).unwrap(), 30);

    let (rebuilt, transform) = reconstruct_grid(&read_point_table(&table).unwrap()).unwrap();
    assert_eq!(rebuilt.shape(), layer.grid().shape());
    for (a, b) in rebuilt.data().iter().zip(layer.grid().data()) {
        assert_eq!(a, b);
    }
    assert_approx_eq!(transform.origin_x(), layer.transform().origin_x(), 1e-9);
    assert_approx_eq!(transform.pixel_width(), layer.transform().pixel_width(), 1e-9);
}

#[test]
fn test_multi_index_groups() {
    let dir = tempfile::tempdir().unwrap();
    let rasters = vec![
        field_tiff(dir.path(), "NDVI.tif", &ndvi_field(10, 10)),
        field_tiff(dir.path(), "NDRE.tif", &ramp_grid(10, 10)),
    ];
    let renderer = MultiIndexMapRenderer::new(RenderOptions::default()).unwrap();
    let layers = renderer.prepare(&rasters, NO_AOI).unwrap();
    let document = renderer.document(&layers).unwrap();

    let overlays = document.overlays();
    assert_eq!(overlays.len(), 2);
    assert!(overlays[0].show);
    assert!(!overlays[1].show);
    assert!(overlays[0].name.starts_with("NDVI ("));
    assert!(overlays[1].name.contains(".."));

    // One legend per group, tied to it by name
    assert_eq!(document.legends().len(), 2);
    assert_eq!(document.legends()[1].layer.as_deref(), Some(overlays[1].name.as_str()));
    assert_eq!(document.layer_control().map(|c| c.collapsed), Some(false));
}

#[test]
fn test_multi_index_centres_on_union_of_layers() {
    let dir = tempfile::tempdir().unwrap();
    let rasters = vec![
        GeoTiffFixture::from_grid(&ramp_grid(2, 2))
            .origin(0.0, 2.0)
            .pixel_size(1.0, 1.0)
            .write_in(dir.path(), "west.tif")
            .unwrap(),
        GeoTiffFixture::from_grid(&ramp_grid(2, 2))
            .origin(10.0, 12.0)
            .pixel_size(1.0, 1.0)
            .write_in(dir.path(), "east.tif")
            .unwrap(),
    ];
    let renderer = MultiIndexMapRenderer::new(RenderOptions::default()).unwrap();
    let layers = renderer.prepare(&rasters, NO_AOI).unwrap();
    let document = renderer.document(&layers).unwrap();

    let [lat, lon] = document.center();
    assert_approx_eq!(lat, 6.0, 1e-6);
    assert_approx_eq!(lon, 6.0, 1e-6);
}

#[test]
fn test_multi_index_requires_a_raster() {
    let renderer = MultiIndexMapRenderer::new(RenderOptions::default()).unwrap();
    assert!(matches!(
        renderer.prepare(&[], NO_AOI),
        Err(RenderError::InvalidConfig(_))
    ));
}

#[test]
fn test_csv_map_grid_layout() {
    let dir = tempfile::tempdir().unwrap();
    let transform = GeoTransform::new(-47.2, -22.8, 0.01, 0.01).unwrap();
    let table = write_point_csv(dir.path(), "NDVI.csv", &ramp_grid(3, 3), &transform).unwrap();

    let renderer = CsvMapRenderer::new(RenderOptions::default()).unwrap();
    let layer = renderer.prepare(&table, NO_AOI).unwrap();
    assert_eq!(layer.grid().shape(), (3, 3));
    assert_eq!(layer.grid().finite_count(), 9);
    // First row is the northernmost
    assert_eq!(layer.grid().get(0, 0), Some(1.0));
    assert_eq!(layer.grid().get(2, 2), Some(9.0));

    let document = renderer.document(&layer).unwrap();
    let [[south, west], [north, east]] = document.overlays()[0].bounds;
    assert_approx_eq!(west, -47.2, 1e-9);
    assert_approx_eq!(east, -47.17, 1e-9);
    assert_approx_eq!(north, -22.8, 1e-9);
    assert_approx_eq!(south, -22.83, 1e-9);
}

fn write_bands(dir: &Path, gains: [f32; 3]) -> TrueColorSource {
    let [r, g, b] = gains;
    TrueColorSource::new(
        field_tiff(dir, "B04.tif", &reflectance_band(16, 16, r)),
        field_tiff(dir, "B03.tif", &reflectance_band(16, 16, g)),
        field_tiff(dir, "B02.tif", &reflectance_band(16, 16, b)),
    )
}

#[test]
fn test_true_color_document() {
    let dir = tempfile::tempdir().unwrap();
    let bands = write_bands(dir.path(), [1.0, 0.8, 0.6]);
    let renderer = TrueColorRenderer::new(RenderOptions::default()).unwrap();

    let composite = renderer.prepare(&bands, &AreaOfInterest::empty()).unwrap();
    assert_eq!(composite.image.dimensions(), (16, 16));

    let document = renderer.document(&composite, &AreaOfInterest::empty()).unwrap();
    assert_eq!(document.zoom_start(), 12);
    assert_eq!(document.overlays()[0].name, TRUE_COLOR_LAYER);
    assert_eq!(document.legends()[0].caption, "RGB composite (2-98%)");
    assert_eq!(document.legends()[0].colors, vec!["#000000", "#FFFFFF"]);
    assert_eq!(document.legends()[0].vmax, 255.0);
    assert_eq!(document.fit_bounds(), Some(composite.bounds.to_lat_lon_corners()));
}

#[test]
fn test_true_color_constant_bands_are_black() {
    let dir = tempfile::tempdir().unwrap();
    let constant = raster_common::RasterGrid::filled(8, 8, 0.3);
    let bands = TrueColorSource::new(
        field_tiff(dir.path(), "R.tif", &constant),
        field_tiff(dir.path(), "G.tif", &constant),
        field_tiff(dir.path(), "B.tif", &constant),
    );
    let renderer = TrueColorRenderer::new(RenderOptions::default()).unwrap();
    let composite = renderer.prepare(&bands, &AreaOfInterest::empty()).unwrap();
    assert!(composite.image.pixels().all(|p| p.0 == [0, 0, 0]));
}

#[test]
fn test_overlay_map_filters_tables() {
    let dir = tempfile::tempdir().unwrap();
    let bands = write_bands(dir.path(), [1.0, 0.9, 0.7]);
    let tables = dir.path().join("tables");
    std::fs::create_dir_all(&tables).unwrap();
    let transform = GeoTransform::new(area::FIELD.0, area::FIELD.3, 0.004, 0.004).unwrap();
    for name in ["NDVI.csv", "NDRE.csv", "NDMI.csv"] {
        write_point_csv(&tables, name, &ndvi_field(8, 8), &transform).unwrap();
    }

    let selected = OverlayMapRenderer::select_tables(&tables, &[]).unwrap();
    let stems: Vec<String> = selected.iter().map(|p| map_composer::layer_name(p)).collect();
    assert_eq!(stems, vec!["NDMI", "NDRE", "NDVI"]);

    let filtered = OverlayMapRenderer::select_tables(&tables, &["NDVI".to_string()]).unwrap();
    assert_eq!(filtered.len(), 1);

    assert!(matches!(
        OverlayMapRenderer::select_tables(&tables, &["EVI".to_string()]),
        Err(RenderError::InputNotFound { .. })
    ));

    let renderer = OverlayMapRenderer::new(RenderOptions::default()).unwrap();
    let output = dir.path().join("overlay.html");
    renderer
        .render(&bands, &tables, &["NDVI".to_string(), "NDRE".to_string()], NO_AOI, &output)
        .unwrap();
    let html = std::fs::read_to_string(&output).unwrap();
    assert!(html.contains("RdYlGn (relative scale)"));
    assert!(html.contains(r#""name":"True color""#));
    assert!(html.contains(r#""control":false"#));
}

#[test]
fn test_export_indices_csv_batch() {
    let dir = tempfile::tempdir().unwrap();
    let indices = dir.path().join("indices");
    std::fs::create_dir_all(&indices).unwrap();
    field_tiff(&indices, "NDVI.tif", &ndvi_field(5, 5));
    field_tiff(&indices, "EVI.tif", &ramp_grid(5, 5));
    std::fs::write(indices.join("notes.txt"), "ignored").unwrap();

    let out = dir.path().join("tables");
    let written = export_indices_csv(&indices, NO_AOI, &out, RenderOptions::default()).unwrap();
    assert_eq!(written, vec![out.join("EVI.csv"), out.join("NDVI.csv")]);
    assert!(written.iter().all(|p| p.exists()));

    let empty = dir.path().join("empty");
    std::fs::create_dir_all(&empty).unwrap();
    assert!(matches!(
        export_indices_csv(&empty, NO_AOI, &out, RenderOptions::default()),
        Err(RenderError::InputNotFound { .. })
    ));
}

#[test]
fn test_compare_all_is_reused_until_sources_change() {
    let dir = tempfile::tempdir().unwrap();
    let indices = dir.path().join("indices");
    std::fs::create_dir_all(&indices).unwrap();
    let ndvi = field_tiff(&indices, "NDVI.tif", &ndvi_field(4, 4));
    field_tiff(&indices, "NDRE.tif", &ramp_grid(4, 4));
    let maps = dir.path().join("maps");

    let first = render_compare_all(&indices, NO_AOI, &maps).unwrap();
    assert!(first.rebuilt);
    assert_eq!(first.path, maps.join(COMPARE_ALL_FILE));

    let second = render_compare_all(&indices, NO_AOI, &maps).unwrap();
    assert!(!second.rebuilt);

    let file = std::fs::OpenOptions::new().write(true).open(&ndvi).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(3600)).unwrap();
    let third = render_compare_all(&indices, NO_AOI, &maps).unwrap();
    assert!(third.rebuilt);
}
