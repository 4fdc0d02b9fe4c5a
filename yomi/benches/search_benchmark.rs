use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use yomi::search::search_in_index;
use yomi::{Category, Entity, SearchApi, SearchIndex, SearchStore, StaticEntitySource, StoreConfig};

const HAN: &[&str] = &["千本桜", "初音", "世界", "恋", "夢", "歌", "星", "未来", "東京", "青空"];
const KANA: &[&str] = &["ミク", "ルカ", "メルト", "ワールド", "ロミオ", "シンデレラ", "さくら", "ねこ"];
const LATIN: &[&str] = &[
    "Miku", "Melt", "World", "Love", "Dream", "Night", "Tell", "Heart", "Remix",
];

/// Deterministic mixed-script names
fn synthetic_entities(count: usize) -> Vec<Entity> {
    (0..count)
        .map(|i| {
            let name = format!(
                "{}{} {}",
                HAN[i % HAN.len()],
                KANA[(i / HAN.len()) % KANA.len()],
                LATIN[(i / 7) % LATIN.len()]
            );
            Entity::new(i as i64 + 1, name)
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let entities = synthetic_entities(20_000);
    let mut group = c.benchmark_group("build");
    group.sample_size(10);
    group.bench_function("index_20k", |b| {
        b.iter(|| SearchIndex::build(entities.clone()));
    });
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let index = SearchIndex::build(synthetic_entities(20_000));

    let queries = vec![
        ("exact_han", "千本桜ミク Miku"),
        ("exact_latin", "melt"),
        ("prefix_kana", "メル"),
        ("pinyin", "qianben"),
        ("romaji", "miku"),
        ("fuzzy_typo", "wrold"),
        ("no_match", "zzzzzz"),
    ];

    let mut group = c.benchmark_group("search");
    group.sample_size(20);

    for (name, query) in queries {
        group.bench_function(name, |b| {
            b.iter(|| search_in_index(&index, query, 500));
        });
    }
    group.finish();
}

fn bench_suggest(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let source = StaticEntitySource::new()
        .with(Category::Song, synthetic_entities(10_000))
        .with(Category::Vocalist, synthetic_entities(500))
        .with(Category::Producer, synthetic_entities(2_000));
    let store = SearchStore::new(Arc::new(source), StoreConfig::default());
    rt.block_on(async {
        for category in [Category::Song, Category::Vocalist, Category::Producer] {
            store.ensure_index(category).await.unwrap();
        }
    });

    c.bench_function("suggest_default_categories", |b| {
        b.iter(|| rt.block_on(async { store.suggest("miku", &[], 10).await.unwrap() }));
    });

    rt.block_on(store.shutdown());
}

criterion_group!(benches, bench_build, bench_search, bench_suggest);
criterion_main!(benches);
