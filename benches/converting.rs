use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use emlrender::convert::{Converter, Operation};

fn fixture_bytes(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(path).unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let raw = fixture_bytes("nested_pdf.eml");

    c.bench_function("parse_nested_pdf", |b| {
        b.iter(|| emlrender::parser::eml::parse_message(&raw).unwrap())
    });
}

fn bench_convert(c: &mut Criterion) {
    let inline = emlrender::parser::eml::parse_message(&fixture_bytes("html_inline.eml")).unwrap();
    let chain =
        emlrender::parser::eml::parse_message(&fixture_bytes("forwarded_chain.eml")).unwrap();
    let converter = Converter::default();

    c.bench_function("render_inline_images", |b| {
        b.iter(|| converter.convert(&inline, &Operation::RenderHtml).unwrap())
    });
    c.bench_function("render_forwarded_chain", |b| {
        b.iter(|| converter.convert(&chain, &Operation::RenderHtml).unwrap())
    });
}

criterion_group!(benches, bench_parse, bench_convert);
criterion_main!(benches);
