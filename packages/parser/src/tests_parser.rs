use crate::lexer::{LexError, TokenSource};
use crate::*;

fn command_names(node: &TennNode) -> Vec<&str> {
    node.commands().map(|(name, _)| name).collect()
}

#[test]
fn test_empty_source() {
    let node = parse("").unwrap();
    assert_eq!(node.kind(), NodeKind::Statements);
    assert!(node.is_empty());
}

#[test]
fn test_commands_split_by_newlines_and_semicolons() {
    let node = parse("a 1\nb 2; c 3\n\n\nd").unwrap();
    assert_eq!(command_names(&node), vec!["a", "b", "c", "d"]);
    assert_eq!(node.int_at(&[0, 1]), Some(1));
    assert_eq!(node.int_at(&[2, 1]), Some(3));
}

#[test]
fn test_argument_kinds() {
    let node = parse("cmd sym 42 -1.5 \"str\" %{md} $(expr) ${block}").unwrap();
    let kinds: Vec<_> = node.children()[0].children().iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::Ident,
            NodeKind::Ident,
            NodeKind::IntLit,
            NodeKind::FloatLit,
            NodeKind::StringLit,
            NodeKind::MarkdownLit,
            NodeKind::Expression,
            NodeKind::ExpressionBlock,
        ]
    );
    assert_eq!(node.float_at(&[0, 3]), Some(-1.5));
}

#[test]
fn test_continuation_before_block() {
    let node = parse("item \"A\" {\n pos 1 2\n}").unwrap();
    assert_eq!(node.len(), 1);

    let expected = TennNode::statements([TennNode::command(
        "item",
        [
            TennNode::string("A"),
            TennNode::block([TennNode::command(
                "pos",
                [TennNode::int(1), TennNode::int(2)],
            )]),
        ],
    )]);
    assert_eq!(node, expected);
}

#[test]
fn test_block_on_next_line_continues_command() {
    let node = parse("link \"a\" \"b\"\n\n{\n    label \"x\"\n}\nitem \"c\"").unwrap();
    assert_eq!(command_names(&node), vec!["link", "item"]);
    let link = &node.children()[0];
    assert_eq!(link.len(), 4);
    assert_eq!(link.children()[3].kind(), NodeKind::BlockExpr);
}

#[test]
fn test_string_on_next_line_continues_command() {
    let node = parse("name\n\"Multi\"\nnext").unwrap();
    assert_eq!(command_names(&node), vec!["name", "next"]);
    assert_eq!(node.ident_at(&[0, 1]), Some("Multi"));
}

#[test]
fn test_symbol_on_next_line_starts_new_command() {
    let node = parse("first \"a\"\n\nsecond b").unwrap();
    assert_eq!(command_names(&node), vec!["first", "second"]);
    assert_eq!(node.children()[0].len(), 2);
}

#[test]
fn test_nested_blocks() {
    let source = "element \"Root\" {\n    item \"A\" {\n        pos 10 20\n    }\n}";
    let node = parse(source).unwrap();
    let block = &node.children()[0].children()[2];
    assert_eq!(block.kind(), NodeKind::BlockExpr);
    let item = block.get_named("item").unwrap();
    let inner = &item.children()[2];
    assert_eq!(inner.get_named("pos").unwrap().int_at(&[2]), Some(20));
}

#[test]
fn test_block_items_on_one_line() {
    let node = parse("style { color red; width 2 }").unwrap();
    let block = &node.children()[0].children()[1];
    assert_eq!(command_names(block), vec!["color", "width"]);
}

#[test]
fn test_empty_block() {
    let node = parse("props {}").unwrap();
    let block = &node.children()[0].children()[1];
    assert_eq!(block.kind(), NodeKind::BlockExpr);
    assert!(block.is_empty());
}

#[test]
fn test_comments_are_not_part_of_tree() {
    let node = parse("// header\na 1 /* inline */ 2\n/* block\n comment */\nb").unwrap();
    assert_eq!(command_names(&node), vec!["a", "b"]);
    assert_eq!(node.children()[0].len(), 3);
}

#[test]
fn test_escaped_quote() {
    let node = parse(r#"name "a\"b""#).unwrap();
    assert_eq!(node.ident_at(&[0, 1]), Some("a\"b"));
}

#[test]
fn test_unterminated_string_reports_error() {
    let errors = parse("name \"abc").unwrap_err();
    assert!(errors.has_code(ErrorCode::EndOfFileDuringStringRead));
}

#[test]
fn test_partial_tree_kept_on_error() {
    let mut parser = Parser::new();
    let node = parser.parse("first 1\nsecond \"abc");
    assert!(parser.has_errors());
    assert_eq!(node.children()[0].ident_at(&[0]), Some("first"));
}

#[test]
fn test_unclosed_block() {
    let errors = parse("element \"a\" {\n item \"b\"\n").unwrap_err();
    assert!(errors.has_code(ErrorCode::WrongBlockTerminator));
}

#[test]
fn test_unclosed_expression() {
    let errors = parse("value $(a + (b)").unwrap_err();
    assert!(errors.has_code(ErrorCode::WrongBlockTerminator));
}

#[test]
fn test_invalid_command_start() {
    let errors = parse("\"string\" first").unwrap_err();
    assert_eq!(errors.len(), 1);
    let error = &errors.errors[0];
    assert_eq!(error.code, ErrorCode::InvalidCommandStart);
    assert_eq!((error.line, error.col), (0, 0));
}

#[test]
fn test_numbers_cannot_start_commands() {
    let errors = parse("a\n42 b").unwrap_err();
    assert!(errors.has_code(ErrorCode::InvalidCommandStart));
    assert_eq!(errors.errors[0].line, 1);
}

#[test]
fn test_invalid_utf8() {
    let errors = parse_bytes(b"name \xC3\x28").unwrap_err();
    assert!(errors.has_code(ErrorCode::Utf8Error));
}

#[test]
fn test_valid_bytes() {
    let node = parse_bytes("name \"ü\"".as_bytes()).unwrap();
    assert_eq!(node.ident_at(&[0, 1]), Some("ü"));
}

#[test]
fn test_parser_resets_between_runs() {
    let mut parser = Parser::new();
    parser.parse("bad \"");
    assert!(parser.has_errors());
    parser.parse("good 1");
    assert!(!parser.has_errors());
}

#[test]
fn test_error_display_is_one_based() {
    let errors = parse("a\n  \"x\"\n; 5").unwrap_err();
    let message = errors.to_string();
    assert!(message.starts_with("invalid command start at 3:3"), "{message}");
}

/// Replays a fixed token list, counting reverts
struct Replay {
    tokens: Vec<Token>,
    reverts: usize,
}

impl TokenSource for Replay {
    fn next_token(&mut self) -> Option<Token> {
        if self.tokens.is_empty() {
            None
        } else {
            Some(self.tokens.remove(0))
        }
    }

    fn revert(&mut self, token: Token) {
        self.reverts += 1;
        self.tokens.insert(0, token);
    }

    fn take_errors(&mut self) -> Vec<LexError> {
        Vec::new()
    }
}

#[test]
fn test_separators_pushed_back_in_order() {
    let mut source = Replay {
        tokens: vec![
            Token::new(TokenKind::Symbol, "a"),
            Token::new(TokenKind::Separator, "\n"),
            Token::new(TokenKind::Separator, "\n"),
            Token::new(TokenKind::Symbol, "b"),
            Token::new(TokenKind::Eof, ""),
        ],
        reverts: 0,
    };
    let mut parser = Parser::new();
    let node = parser.parse_tokens(&mut source);
    assert!(!parser.has_errors());
    assert_eq!(command_names(&node), vec!["a", "b"]);
    // `b`, then the second separator
    assert_eq!(source.reverts, 2);
}

#[test]
fn test_missing_eof_token() {
    let mut source = Replay {
        tokens: vec![],
        reverts: 0,
    };
    let mut parser = Parser::new();
    parser.parse_tokens(&mut source);
    assert!(parser.errors().has_code(ErrorCode::UnexpectedInput));
}
