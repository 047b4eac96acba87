use criterion::{criterion_group, criterion_main, Criterion};
use pocketmill_cam::{Contour, PocketGenerator, PocketParams, Region};

fn bench_rectangle_pocket(c: &mut Criterion) {
    let outline = Contour::rectangle(0.0, 0.0, 80.0, 40.0).unwrap();
    let region = Region::new(outline, Vec::new());

    c.bench_function("rectangle_pocket_80x40", |b| {
        b.iter(|| {
            let generator =
                PocketGenerator::new(region.clone(), PocketParams::for_cutter(3.0)).unwrap();
            generator.run().unwrap()
        });
    });
}

fn bench_island_pocket(c: &mut Criterion) {
    let outline = Contour::rectangle(0.0, 0.0, 100.0, 100.0).unwrap();
    let island = Contour::rectangle(40.0, 40.0, 20.0, 20.0).unwrap();
    let region = Region::new(outline, vec![island]);

    c.bench_function("island_pocket_100x100", |b| {
        b.iter(|| {
            let generator =
                PocketGenerator::new(region.clone(), PocketParams::for_cutter(3.0)).unwrap();
            generator.run().unwrap()
        });
    });
}

criterion_group!(benches, bench_rectangle_pocket, bench_island_pocket);
criterion_main!(benches);
