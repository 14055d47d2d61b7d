use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use page_previews::{LanguageDirection, PreviewModelBuilder, process_extract, remove_parentheticals};

const CASES: &[(&str, &str)] = &[
    ("plain", "The cat is a domestic species of small carnivorous mammal..."),
    (
        "parenthetical",
        "The cat (Felis catus), commonly referred to as the domestic cat (or house cat), is a small mammal...",
    ),
    (
        "nested",
        "Zürich (/ˈzjʊərɪk/ ZURE-ik; German: [ˈtsyːrɪç] (listen)) is the largest city in Switzerland...",
    ),
    ("unbalanced", "An aside (that never closes is kept verbatim..."),
];

fn bench_remove_parentheticals(c: &mut Criterion) {
    for &(label, text) in CASES {
        c.bench_with_input(
            BenchmarkId::new("remove_parentheticals", label),
            &text,
            |b, &text| {
                b.iter(|| black_box(remove_parentheticals(black_box(text)).len()));
            },
        );
    }
}

fn bench_process_extract(c: &mut Criterion) {
    for &(label, text) in CASES {
        c.bench_with_input(BenchmarkId::new("process_extract", label), &text, |b, &text| {
            b.iter(|| black_box(process_extract(black_box(Some(text)))));
        });
    }
}

fn bench_build_model(c: &mut Criterion) {
    let (_, text) = CASES[1];
    c.bench_function("preview_model::build_at", |b| {
        b.iter(|| {
            let model = PreviewModelBuilder::new(
                "Cat",
                "https://en.wikipedia.org/wiki/Cat",
                "en",
                LanguageDirection::Ltr,
            )
            .extract(text)
            .last_modified(1_500_000_000_000)
            .build_at(black_box(1_500_000_100_000));
            black_box(model.preview_type());
        });
    });
}

criterion_group!(
    benches,
    bench_remove_parentheticals,
    bench_process_extract,
    bench_build_model
);
criterion_main!(benches);
