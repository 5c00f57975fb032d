use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use psylab_core::ImageId;
use psylab_render::SkiaRenderer;

fn harness() -> (SkiaRenderer, ImageId, Vec<u8>) {
    let width = 1920u32;
    let height = 1080u32;
    let mut r = SkiaRenderer::new(width, height, 0.05, (0.5, 0.375)).unwrap();
    let (w, h) = r.image_box();
    let pixels = [90u8, 140, 200, 255].repeat((w * h) as usize);
    let id = r.add_image(pixels, w, h).unwrap();
    let fb = vec![0u8; (width * height * 4) as usize];
    (r, id, fb)
}

pub fn bench_trial_frames(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_frame");
    g.sample_size(40);

    g.bench_function("fixation_to_image", |b| {
        b.iter_batched(
            || {
                let (mut r, id, mut fb) = harness();
                r.render_fixation(&mut fb).unwrap();
                (r, id, fb)
            },
            |(mut r, id, mut fb)| {
                let stats = r.render_image(id, &mut fb).unwrap();
                black_box(stats.total);
            },
            BatchSize::LargeInput,
        )
    });

    g.bench_function("steady_image", |b| {
        let (mut r, id, mut fb) = harness();
        r.render_image(id, &mut fb).unwrap();
        b.iter(|| {
            let stats = r.render_image(id, &mut fb).unwrap();
            black_box(stats.dirty_count);
        })
    });

    g.finish();
}

criterion_group!(benches, bench_trial_frames);
criterion_main!(benches);
