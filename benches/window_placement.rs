use criterion::{black_box, criterion_group, criterion_main, Criterion};
use placekeeper::config::ReconcilerTuning;
use placekeeper::services::reconciler::{centered_origin, clamp_to_area, resolve_collisions};
use placekeeper::shell::{Point, Rect, Size};

fn benchmark_window_placement(c: &mut Criterion) {
    let tuning = ReconcilerTuning::default();
    let area = Rect::new(0, 0, 1920, 1080);
    let size = Size::new(800, 600);
    // A crowded diagonal forces the full collision walk
    let siblings: Vec<Point> = (0..40).map(|step| Point::new(step * 50, step * 50)).collect();

    c.bench_function("window_placement", |b| {
        b.iter(|| {
            let origin = centered_origin(black_box(area), black_box(size));
            let origin = resolve_collisions(black_box(origin), black_box(&siblings), &tuning);
            black_box(clamp_to_area(origin, size, area, tuning.edge_margin))
        })
    });
}

criterion_group!(benches, benchmark_window_placement);
criterion_main!(benches);
