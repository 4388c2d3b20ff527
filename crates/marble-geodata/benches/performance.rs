//! Performance benchmarks for marble-geodata
//!
//! Run with: cargo bench --package marble-geodata

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use geo::Point as GeoPoint;
use gpx::{Gpx, Track, TrackSegment, Waypoint};
use marble_geodata::{
    Coordinates, Document, Folder, GeoDataTreeModel, GeoFeature, Geometry, LineString, ModelIndex,
    Placemark, gpx_to_document, kml, pack,
};

/// Generate a realistic GPX track with the specified number of points.
fn generate_gpx_track(num_points: usize, base_lat: f64, base_lon: f64) -> Gpx {
    let mut gpx = Gpx::default();
    let mut track = Track::default();
    let mut segment = TrackSegment::default();

    for i in 0..num_points {
        let t = i as f64 / num_points as f64;
        let lat = base_lat + t * 0.1 + (t * 50.0).sin() * 0.001;
        let lon = base_lon + t * 0.1 + (t * 30.0).cos() * 0.001;
        segment.points.push(Waypoint::new(GeoPoint::new(lon, lat)));
    }

    track.segments.push(segment);
    gpx.tracks.push(track);
    gpx
}

/// Document with `folders` folders of `placemarks` line placemarks each
fn generate_document(folders: usize, placemarks: usize, points: usize) -> Document {
    let mut document = Document::new();
    for f in 0..folders {
        let mut folder = Folder::named(format!("Folder {f}"));
        for p in 0..placemarks {
            let coordinates = (0..points)
                .map(|i| Coordinates::new(13.0 + i as f64 * 1e-3, 52.0 + p as f64 * 1e-3, 35.0))
                .collect();
            folder.append(Placemark::with_geometry(
                format!("Placemark {f}/{p}"),
                Geometry::LineString(LineString::from_coordinates(coordinates)),
            ));
        }
        document.append(folder);
    }
    document
}

// ============================================================================
// I/O Benchmarks
// ============================================================================

fn bench_gpx_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("gpx_import");

    for points in [1_000, 50_000] {
        let gpx = generate_gpx_track(points, 51.5, -0.1);
        group.throughput(Throughput::Elements(points as u64));
        group.bench_with_input(BenchmarkId::from_parameter(points), &gpx, |b, gpx| {
            b.iter(|| gpx_to_document(gpx));
        });
    }

    group.finish();
}

fn bench_kml(c: &mut Criterion) {
    let mut group = c.benchmark_group("kml");
    group.sample_size(20);

    let document = generate_document(10, 100, 50);
    let text = kml::write_kml(&document).unwrap();
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("write_10x100", |b| {
        b.iter(|| kml::write_kml(&document).unwrap());
    });
    group.bench_function("parse_10x100", |b| {
        b.iter(|| kml::parse_kml(&text).unwrap());
    });

    group.finish();
}

fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack");

    let document = generate_document(10, 100, 50);
    let bytes = pack::pack_to_bytes(&document).unwrap();
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("pack_10x100", |b| {
        b.iter(|| pack::pack_to_bytes(&document).unwrap());
    });
    group.bench_function("unpack_10x100", |b| {
        b.iter(|| pack::unpack_from_bytes(&bytes).unwrap());
    });

    group.finish();
}

// ============================================================================
// Tree Model Benchmarks
// ============================================================================

fn bench_tree_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_model");

    let mut model = GeoDataTreeModel::new();
    for _ in 0..10 {
        model.add_document(generate_document(10, 100, 2));
    }
    let last = model
        .feature(&ModelIndex::from_path(&[9, 9, 99]))
        .map(GeoFeature::uid)
        .unwrap();

    group.bench_function("index_of_last", |b| {
        b.iter(|| model.index_of(last));
    });

    group.bench_function("walk_all_rows", |b| {
        b.iter(|| {
            let mut rows = 0;
            let mut stack = vec![ModelIndex::root()];
            while let Some(index) = stack.pop() {
                let count = model.row_count(&index);
                rows += count;
                stack.extend((0..count).filter_map(|row| model.index(row, &index)));
            }
            rows
        });
    });

    group.bench_function("add_remove_document", |b| {
        let document = generate_document(1, 100, 2);
        b.iter(|| {
            let row = model.add_document(document.clone()).unwrap();
            model.remove_document_at(row)
        });
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_gpx_import, bench_kml, bench_pack, bench_tree_model);

criterion_main!(benches);
