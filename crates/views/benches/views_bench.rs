use criterion::{Criterion, criterion_group, criterion_main};
use doc_store::{DbName, DocId, DocumentStore, InMemoryBaseStore, InMemoryChangeQueue};
use serde_json::json;
use views::{EngineConfig, MapFunction, ScriptBudget, ViewEngine};

fn bench_map_function(c: &mut Criterion) {
    let map = MapFunction::compile(
        "function(doc){ for (const t of doc.tags) emit([doc.type, t.toLowerCase()], doc.n) }",
    )
    .unwrap();
    let doc = json!({"type": "post", "n": 1, "tags": ["A", "B", "C", "D"]});
    let budget = ScriptBudget::default();

    c.bench_function("views/map_function_run", |b| {
        b.iter(|| map.run(&doc, &budget).unwrap());
    });
}

fn bench_design_cascade_500_docs(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let db = DbName::parse("bench").unwrap();
    let store = InMemoryBaseStore::new();
    let docs = DocumentStore::new(store.clone(), InMemoryChangeQueue::new());
    let engine = ViewEngine::new(store, EngineConfig::default());

    let design = rt.block_on(async {
        for n in 0..500 {
            docs.create(&db, json!({"type": "a", "n": n})).await.unwrap();
        }
        docs.put(
            &db,
            &DocId::parse("_design/d1").unwrap(),
            json!({"views": {"byType": {"map": "function(doc){ emit(doc.type, doc.n) }"}}}),
        )
        .await
        .unwrap()
        .change
    });

    c.bench_function("views/design_cascade_500_docs", |b| {
        b.iter(|| {
            rt.block_on(async {
                engine.process(&design).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_map_function, bench_design_cascade_500_docs);
criterion_main!(benches);
