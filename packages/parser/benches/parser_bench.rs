use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tenniarb_parser::{parse, print, tokenize};

const SMALL: &str = r#"
element "Root" {
    item "Client" {
        pos 10 20
    }
    item "Server" {
        pos 200 20
        color lightblue
    }
    link "Client" "Server" {
        label "request"
    }
}
"#;

/// A larger document built from many repeated elements
fn large_document() -> String {
    let mut source = String::new();
    for i in 0..200 {
        source.push_str(&format!(
            r#"element "Group {i}" {{
    description "Generated group {i}"
    style {{
        font-size 12
        display "${{x}} items"
    }}
    item "Node {i}" {{
        pos {x} {y}
        value $(rand(1, {i}))
        notes %{{ # Heading {i}

some *markdown* text }}
    }}
    item "Other {i}"
    link "Node {i}" "Other {i}"
}}
"#,
            x = i * 10,
            y = i * 5,
        ));
    }
    source
}

fn lex_small(c: &mut Criterion) {
    c.bench_function("lex_small", |b| b.iter(|| tokenize(black_box(SMALL))));
}

fn parse_small(c: &mut Criterion) {
    c.bench_function("parse_small", |b| b.iter(|| parse(black_box(SMALL))));
}

fn parse_large(c: &mut Criterion) {
    let source = large_document();
    c.bench_function("parse_large", |b| b.iter(|| parse(black_box(&source))));
}

fn print_large(c: &mut Criterion) {
    let source = large_document();
    let Ok(node) = parse(&source) else {
        panic!("benchmark document does not parse");
    };
    c.bench_function("print_large", |b| b.iter(|| print(black_box(&node))));
}

criterion_group!(benches, lex_small, parse_small, parse_large, print_large);
criterion_main!(benches);
