use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sheetson::{CellCoord, CellValue, Classifier, ComplexExtractor, Grid, SheetExtractor};

/// Build a dense table grid with a blank-band separator every `band` rows.
fn build_grid(rows: u32, cols: u32, band: u32) -> Grid {
    let mut cells = Vec::new();
    for row in 0..rows {
        // Leave a 2-row gap between bands
        if row % band >= band - 2 {
            continue;
        }
        for col in 0..cols {
            let value = if row % band == 0 {
                CellValue::String(format!("header_{}", col))
            } else {
                CellValue::Number((row * cols + col) as f64)
            };
            cells.push((CellCoord::new(row, col), value));
        }
    }
    Grid::build("bench".to_string(), cells, vec![], 0)
}

fn bench_classify(c: &mut Criterion) {
    let classifier = Classifier::new(2, 0.6, 0.5);
    let grid = build_grid(1000, 20, 50);

    c.bench_function("classify_1000x20", |b| {
        b.iter(|| classifier.classify(black_box(&grid)))
    });
}

fn bench_complex_extract(c: &mut Criterion) {
    let extractor = ComplexExtractor::new(2, 0.5, 4);
    let grid = build_grid(1000, 20, 50);

    c.bench_function("complex_extract_1000x20", |b| {
        b.iter(|| extractor.extract(black_box(&grid)).unwrap())
    });
}

criterion_group!(benches, bench_classify, bench_complex_extract);
criterion_main!(benches);
