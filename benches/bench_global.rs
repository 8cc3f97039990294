use criterion::{
  BenchmarkId,
  Criterion,
  criterion_group,
  criterion_main,
};
use segalloc::SegAlloc;
use std::hint::black_box;

#[global_allocator]
static GLOBAL: SegAlloc = SegAlloc::new();

// Pairs of payload sizes whose blocks land on either side of a class
// threshold once header and footer are added.
const BOUNDARY_SIZES: [usize; 6] = [32, 48, 96, 112, 4064, 4080];

fn bench_class_boundaries(c: &mut Criterion) {
  let mut group = c.benchmark_group("global_class_boundary");
  for size in BOUNDARY_SIZES {
    group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
      b.iter(|| {
        let bytes = vec![0u8; black_box(size)].into_boxed_slice();
        black_box(bytes);
      });
    });
  }
  group.finish();
}

fn bench_coalescing_churn(c: &mut Criterion) {
  c.bench_function("global_coalesce_runs", |b| {
    b.iter(|| {
      let mut run: Vec<Option<Box<[u8; 96]>>> = (0..256).map(|_| Some(Box::new([0u8; 96]))).collect();
      // Every other slot first, so the second pass merges both neighbours.
      for slot in run.iter_mut().step_by(2) {
        black_box(slot.take());
      }
      for slot in run.iter_mut().skip(1).step_by(2) {
        black_box(slot.take());
      }
      black_box(run);
    });
  });
}

fn bench_vec_growth(c: &mut Criterion) {
  c.bench_function("global_vec_push_16k", |b| {
    b.iter(|| {
      let mut v = Vec::new();
      for i in 0..16 * 1024u32 {
        v.push(black_box(i));
      }
      black_box(v);
    });
  });
}

fn bench_aligned_box(c: &mut Criterion) {
  #[repr(align(256))]
  struct Page([u8; 512]);

  c.bench_function("global_box_align_256", |b| {
    b.iter(|| {
      let bx = Box::new(Page([0u8; 512]));
      black_box(bx);
    });
  });
}

criterion_group!(
  benches,
  bench_class_boundaries,
  bench_coalescing_churn,
  bench_vec_growth,
  bench_aligned_box,
);
criterion_main!(benches);
