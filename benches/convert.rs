use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use index_bridge::{BackendClass, ElementWidth, HostBackend, IndexDataManager, IndexRange, convert_indices};

const INDEX_COUNT: u32 = 64 * 1024;

fn source_indices(width: ElementWidth) -> Vec<u8> {
    let mask = width.restart_index();
    (0..INDEX_COUNT)
        .flat_map(|i| {
            let value = (i.wrapping_mul(2_654_435_761) >> 7) & mask;
            value.to_ne_bytes()[..width.bytes() as usize].to_vec()
        })
        .collect()
}

fn conversion_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_indices");

    for (source, destination, remap) in [
        (ElementWidth::U16, ElementWidth::U16, false),
        (ElementWidth::U8, ElementWidth::U16, false),
        (ElementWidth::U8, ElementWidth::U16, true),
        (ElementWidth::U16, ElementWidth::U32, true),
    ] {
        let input = source_indices(source);
        let mut output = vec![0u8; (INDEX_COUNT << destination.shift()) as usize];
        let name = format!("{source:?}_to_{destination:?}{}", if remap { "_remap" } else { "" });

        group.bench_function(name, |b| {
            b.iter(|| {
                convert_indices(source, destination, black_box(&input), INDEX_COUNT, &mut output, remap)
                    .expect("conversion should not fail");
                black_box(&output);
            });
        });
    }

    group.finish();
}

fn streaming_benchmarks(c: &mut Criterion) {
    let mut manager = IndexDataManager::new(HostBackend::new(BackendClass::ReservedRestart));
    let input = source_indices(ElementWidth::U16);
    let range = IndexRange::compute(ElementWidth::U16, &input, INDEX_COUNT as usize, false);

    c.bench_function("prepare_immediate_u16_workaround", |b| {
        b.iter(|| {
            let translated = manager
                .prepare_immediate(ElementWidth::U16, INDEX_COUNT, black_box(&input), range, false)
                .expect("streaming should not fail");
            black_box(translated);
        });
    });
}

criterion_group!(benches, conversion_benchmarks, streaming_benchmarks);
criterion_main!(benches);
