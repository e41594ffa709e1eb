use criterion::{criterion_group, criterion_main, Criterion};
use metahub_core::{Analyzer, Column, Dataset, SearchEngine, Table};

const COMMENTS: &str = "Primary identifier for user accounts, joined to billing_invoices.user_ref \
    and refreshed nightly from the CRM export (see runbook section 4.2).";

fn catalog(tables: usize, columns: usize) -> Vec<Dataset> {
    let tables = (0..tables)
        .map(|t| {
            let cols = (0..columns).map(|c| Column::new(format!("col_{t}_{c}_amount"), COMMENTS, "text")).collect();
            Table::new(format!("table_{t}_orders"), COMMENTS, cols)
        })
        .collect();
    vec![Dataset::new("bench", tables)]
}

fn bench_tokenize(c: &mut Criterion) {
    let ngram = Analyzer::default();
    let word = Analyzer::word();
    c.bench_function("tokenize_ngram_1_3", |b| b.iter(|| ngram.tokenize(COMMENTS)));
    c.bench_function("tokenize_word", |b| b.iter(|| word.tokenize(COMMENTS)));
}

fn bench_search(c: &mut Criterion) {
    let engine = SearchEngine::default();
    c.bench_function("rebuild_200x20", |b| b.iter(|| engine.rebuild(catalog(200, 20))));
    c.bench_function("search_columns_substring", |b| b.iter(|| engine.search_columns("user acc", 0, 20)));
}

criterion_group!(benches, bench_tokenize, bench_search);
criterion_main!(benches);
