//! Benchmarks for distance tables, flat PQ search and IVFADC search.

use adc_search::constants::pq::{CODES_8BIT, REFERENCE_DIM, REFERENCE_SUBVECTOR_DIM};
use adc_search::dataset::{encode_cell_rows, encode_rows, recall_at_k, Dataset};
use adc_search::{
    AdcEngine, CellId, CoarseQuantizer, DistanceTable, MemoryStore, SubspaceLayout, VectorId,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const N_VECTORS: usize = 10_000;
const N_CELLS: usize = 64;

fn build_store() -> (MemoryStore, Dataset) {
    println!("Building synthetic store ({} x {})...", N_VECTORS, REFERENCE_DIM);
    let mut dataset = Dataset::generate_seeded(N_VECTORS, 100, REFERENCE_DIM, 42);
    dataset.compute_ground_truth(10);
    let layout = SubspaceLayout::from_dim(REFERENCE_DIM, REFERENCE_SUBVECTOR_DIM).unwrap();
    let codebook = dataset.sample_codebook(layout, CODES_8BIT, 7).unwrap();

    let coarse = CoarseQuantizer::new(
        dataset.vectors[..N_CELLS]
            .iter()
            .enumerate()
            .map(|(i, v)| (CellId(i as u32), v.as_slice().to_vec())),
    )
    .unwrap();

    let store = MemoryStore::new();
    store.put_code_rows("pq_quantization", encode_rows(&codebook, &dataset.vectors).unwrap());
    store.put_cell_rows(
        "fine_quantization",
        encode_cell_rows(&coarse, &codebook, &dataset.vectors).unwrap(),
    );
    store.put_codebook("pq_codebook", codebook.clone());
    store.put_codebook("residual_codebook", codebook);
    store.put_coarse_quantizer(coarse);
    (store, dataset)
}

fn mean_recall<F>(dataset: &Dataset, mut search: F) -> f32
where
    F: FnMut(&[f32]) -> Vec<u64>,
{
    let total: f32 = dataset
        .queries
        .iter()
        .zip(&dataset.ground_truth)
        .map(|(q, truth)| recall_at_k(&search(q.as_slice()), truth, 10))
        .sum();
    total / dataset.queries.len() as f32
}

fn benchmark_search(c: &mut Criterion) {
    let (store, dataset) = build_store();
    let codebook = adc_search::RowStore::codebook(&store, "pq_codebook").unwrap();
    let queries = &dataset.queries;
    let engine = AdcEngine::new(&store);

    let hit_ids = |results: adc_search::SearchResults| -> Vec<u64> {
        results.into_hits().into_iter().map(|h| h.id.0).collect()
    };
    println!(
        "recall@10: pq_flat {:.3}, ivfadc {:.3}",
        mean_recall(&dataset, |q| hit_ids(engine.pq_search(q, 10).unwrap())),
        mean_recall(&dataset, |q| hit_ids(engine.ivfadc_search(q, 10).unwrap())),
    );

    c.bench_function("distance_table_300d_12x256", |b| {
        let query = queries[0].as_slice();
        b.iter(|| black_box(DistanceTable::build(black_box(query), &codebook).unwrap()))
    });

    let mut group = c.benchmark_group("search");
    group.sample_size(20);

    for k in [1, 10, 100] {
        let mut query_idx = 0;
        group.bench_with_input(BenchmarkId::new("pq_flat", k), &k, |b, &k| {
            b.iter(|| {
                let query = &queries[query_idx % queries.len()];
                query_idx += 1;
                black_box(engine.pq_search(query.as_slice(), k).unwrap().count())
            })
        });

        let mut query_idx = 0;
        group.bench_with_input(BenchmarkId::new("ivfadc", k), &k, |b, &k| {
            b.iter(|| {
                let query = &queries[query_idx % queries.len()];
                query_idx += 1;
                black_box(engine.ivfadc_search(query.as_slice(), k).unwrap().count())
            })
        });
    }

    for n_ids in [100, 1_000] {
        let ids: Vec<VectorId> = (1..=n_ids as u64).map(VectorId).collect();
        let mut query_idx = 0;
        group.bench_with_input(BenchmarkId::new("pq_filtered", n_ids), &ids, |b, ids| {
            b.iter(|| {
                let query = &queries[query_idx % queries.len()];
                query_idx += 1;
                black_box(engine.pq_search_filtered(query.as_slice(), 10, ids).unwrap().count())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_search);
criterion_main!(benches);
