use crate::*;
use proptest::prelude::*;

fn assert_round_trip(source: &str) {
    let first = parse(source).unwrap_or_else(|e| panic!("failed to parse {source:?}: {e}"));
    let printed = print(&first);
    let second = parse(&printed).unwrap_or_else(|e| panic!("failed to reparse {printed:?}: {e}"));
    assert_eq!(first, second, "printed form:\n{printed}");
}

#[test]
fn test_round_trip_documents() {
    let sources = [
        "a",
        "a b c 1 2.5 -3",
        "name \"with \\\"quotes\\\"\"",
        "name 'single \"double\" inside'",
        "text \"line one\nline two\"",
        "value $(max(a, b)) ${ if (x) { y } }",
        "doc %{ # Title\n\n*bold* {braces} }",
        "element \"Root\" {\n    item \"A\" {\n        pos 1 2\n    }\n    link \"A\" \"B\" {}\n}",
        "x { }; y { z { w 1 } }",
        "emoji 🎉 \"🎉\"",
        "x 'a' + \"b\"",
        "x 'a' +\n\"b\"",
        "x \"a\" + 'b' + \"c\"",
        "x \"a\"\n+ 'b'",
    ];
    for source in sources {
        assert_round_trip(source);
    }
}

#[test]
fn test_canonical_layout() {
    let node = parse("element \"Root\" { item \"A\" { pos 1 2 }; color red }").unwrap();
    let expected = "element \"Root\" {\n    item \"A\" {\n        pos 1 2\n    }\n    color red\n}";
    assert_eq!(print(&node), expected);
}

#[test]
fn test_printing_is_idempotent() {
    let node = parse("a {b {c 1}\n d \"x\"}\n\n\ne").unwrap();
    let once = print(&node);
    let twice = print(&parse(&once).unwrap());
    assert_eq!(once, twice);
}

#[test]
fn test_empty_block_layout() {
    let node = TennNode::command("props", [TennNode::block([])]);
    assert_eq!(node.to_str(0, false), "props {\n}");
    assert_eq!(node.to_str(1, false), "    props {\n    }");
}

#[test]
fn test_string_escaping() {
    let node = parse(r#"name "a\"b""#).unwrap();
    assert_eq!(print(&node), r#"name "a\"b""#);
}

#[test]
fn test_clean_mode_writes_bare_strings() {
    let node = TennNode::command("title", [TennNode::string("a \"b\"")]);
    assert_eq!(node.to_str(0, true), "title a \"b\"");
    assert_eq!(node.to_str(0, false), "title \"a \\\"b\\\"\"");
}

#[test]
fn test_embedded_payloads_preserved() {
    let node = TennNode::command(
        "v",
        [
            TennNode::expression(" a+b "),
            TennNode::expression_block("\n  x\n"),
            TennNode::markdown(" **m** "),
            TennNode::image("iVBORw0KGgo="),
        ],
    );
    assert_eq!(
        print(&node),
        "v $( a+b ) ${\n  x\n} %{ **m** } @(iVBORw0KGgo=)"
    );
}

#[test]
fn test_display_matches_print() {
    let node = TennNode::statements([
        TennNode::command("a", [TennNode::int(1)]),
        TennNode::command("b", [TennNode::float(2.0)]),
    ]);
    assert_eq!(node.to_string(), "a 1\nb 2.0");
}

#[test]
fn test_string_after_plus_switches_quote() {
    let node = parse("x 'a' + \"b\"").unwrap();
    assert_eq!(node.children()[0].children().len(), 4);
    assert_eq!(print(&node), "x \"a\" + 'b'");

    let node = parse("x \"a\" + 'b' + \"c\"").unwrap();
    assert_eq!(node.children()[0].children().len(), 6);
    assert_eq!(print(&node), "x \"a\" + 'b' + \"c\"");
}

#[test]
fn test_switched_quote_is_escaped() {
    let node = TennNode::command(
        "x",
        [
            TennNode::string("a"),
            TennNode::ident("+"),
            TennNode::string("it's"),
        ],
    );
    assert_eq!(print(&node), r#"x "a" + 'it\'s'"#);
    assert_eq!(parse(&print(&node)).unwrap(), TennNode::statements([node]));
}

fn quoted(quote: char, body: &str) -> String {
    let mut out = String::new();
    out.push(quote);
    for c in body.chars() {
        if c == quote {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(quote);
    out
}

fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec![
            "a", "b2", "+", "-", "x.y", "1", "-2", "3.5", "{", "}", "{}", "$(f(x))", "%{ *md* }",
        ])
        .prop_map(str::to_string),
        (
            prop::sample::select(vec!['"', '\'']),
            "[a-z \"'+{};\\\\\n]{0,6}",
        )
            .prop_map(|(quote, body)| quoted(quote, &body)),
    ]
}

fn document() -> impl Strategy<Value = String> {
    let separator = prop::sample::select(vec![" ", " + ", "\n", "\n+ ", ";\n", " +\n"]);
    prop::collection::vec((fragment(), separator), 1..12).prop_map(|parts| {
        let mut source = String::from("cmd ");
        for (fragment, separator) in parts {
            source.push_str(&fragment);
            source.push_str(separator);
        }
        source
    })
}

proptest! {
    #[test]
    fn printed_documents_parse_to_the_same_tree(source in document()) {
        // Only sources that parse cleanly are required to round-trip
        let Ok(first) = parse(&source) else {
            return Ok(());
        };
        let printed = print(&first);
        let second = parse(&printed);
        prop_assert!(second.is_ok(), "reparse of {:?} failed: {:?}", printed, second);
        prop_assert_eq!(first, second.unwrap(), "source {:?} printed as {:?}", source, printed);
    }
}
