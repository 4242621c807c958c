use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cmpmgr::parser::{BlockId, LineEnding, SheetText};
use cmpmgr::prelude::*;
use cmpmgr::FormatVersion;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn amplifier_sheet() -> SheetText {
    let text = std::fs::read_to_string(fixture_path("amplifier.sch")).expect("fixture");
    SheetText::new(0, "amplifier.sch", text)
}

fn bench_parse_components(c: &mut Criterion) {
    let sheet = amplifier_sheet();

    c.bench_function("parse_components", |b| {
        b.iter(|| {
            for (block, body) in sheet.blocks() {
                let _ = Component::parse(black_box(body), block, FormatVersion(4));
            }
        });
    });
}

fn bench_render_component(c: &mut Criterion) {
    let sheet = amplifier_sheet();
    let body = sheet.block_text(0).expect("block");
    let component = Component::parse(body, BlockId::new(0, 0), FormatVersion(4)).expect("parse");

    c.bench_function("render_component", |b| {
        b.iter(|| black_box(&component).render(LineEnding::Lf));
    });
}

fn bench_load_project(c: &mut Criterion) {
    c.bench_function("load_project", |b| {
        b.iter(|| cmpmgr::load_schematic(black_box(&fixture_path("amplifier.sch"))));
    });
}

criterion_group!(
    benches,
    bench_parse_components,
    bench_render_component,
    bench_load_project
);
criterion_main!(benches);
