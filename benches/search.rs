use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dimspec::database::Database;
use dimspec::search::search;
use dimspec::spectrum::{normalize, IntensityStatistics, NormalizationMethod, Peak, Spectrum};
use rusqlite::{params, Connection};
use tempfile::TempDir;

/// Create a compounds table with `rows` synthetic entries
fn create_compounds(dir: &TempDir, rows: usize) -> std::path::PathBuf {
    let path = dir.path().join("bench.sqlite");
    let mut conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE compounds (id INTEGER PRIMARY KEY, name TEXT, formula TEXT, fixedmass REAL);",
    )
    .unwrap();
    let tx = conn.transaction().unwrap();
    {
        let mut stmt = tx
            .prepare("INSERT INTO compounds VALUES (?1, ?2, ?3, ?4)")
            .unwrap();
        for i in 0..rows {
            let prefix = if i % 7 == 0 { "PF" } else { "Fluoro" };
            stmt.execute(params![
                i as i64,
                format!("{}-compound-{}", prefix, i),
                format!("C{}HF{}O2", 4 + i % 10, 7 + i % 20),
                200.0 + (i % 800) as f64 * 0.37,
            ])
            .unwrap();
        }
    }
    tx.commit().unwrap();
    path
}

/// Benchmark paged keyword search over tables of increasing size
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for rows in [1_000, 10_000, 50_000] {
        let dir = TempDir::new().unwrap();
        let path = create_compounds(&dir, rows);
        let db = Database::open(&path).unwrap();

        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("first_page", rows), &rows, |b, _| {
            b.iter(|| black_box(search(&db, "compounds", "pf", 50, 1).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("last_page", rows), &rows, |b, _| {
            let pages = search(&db, "compounds", "pf", 50, 1).unwrap().page_count();
            b.iter(|| black_box(search(&db, "compounds", "pf", 50, pages).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("unfiltered", rows), &rows, |b, _| {
            b.iter(|| black_box(search(&db, "compounds", "", 500, 3).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark normalization and statistics on spectra of increasing length
fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for peaks in [100, 1_000, 10_000] {
        let spectrum = Spectrum::new(
            1,
            (0..peaks)
                .map(|j| Peak::new(100.0 + j as f64 * 0.1, ((j * 7919) % 10_007) as f64))
                .collect(),
        );
        group.throughput(Throughput::Elements(peaks as u64));
        for method in NormalizationMethod::ALL {
            group.bench_with_input(
                BenchmarkId::new(method.as_str(), peaks),
                &spectrum,
                |b, s| b.iter(|| black_box(normalize(s, method))),
            );
        }
        group.bench_with_input(BenchmarkId::new("statistics", peaks), &spectrum, |b, s| {
            b.iter(|| black_box(IntensityStatistics::of_spectrum(s)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_search, bench_normalize);
criterion_main!(benches);
