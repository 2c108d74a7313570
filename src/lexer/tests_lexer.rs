//! Scanner tests.

use super::*;

fn kinds(source: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new(source);
    let mut kinds = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.kind == TokenKind::Eof;
        kinds.push(token.kind);
        if done {
            return kinds;
        }
    }
}

#[test]
fn keywords_and_identifiers() {
    let tokens = kinds("int x; double why; while whiled");
    assert_eq!(tokens[0], TokenKind::Int);
    assert!(matches!(tokens[1], TokenKind::Identifier(_)));
    assert_eq!(tokens[2], TokenKind::Semicolon);
    assert_eq!(tokens[3], TokenKind::Double);
    assert_eq!(tokens[6], TokenKind::While);
    // A keyword prefix does not make a keyword.
    assert!(matches!(tokens[7], TokenKind::Identifier(_)));
}

#[test]
fn two_character_operators() {
    assert_eq!(
        kinds("<= >= == != && ||"),
        vec![
            TokenKind::LessEqual,
            TokenKind::GreaterEqual,
            TokenKind::Equal,
            TokenKind::NotEqual,
            TokenKind::LogicAnd,
            TokenKind::LogicOr,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn single_character_operators() {
    assert_eq!(
        kinds("+-*/%&!=<>()[]{},;"),
        vec![
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::Amp,
            TokenKind::NotEqual,
            TokenKind::Less,
            TokenKind::Greater,
            TokenKind::LeftParen,
            TokenKind::RightParen,
            TokenKind::LeftBracket,
            TokenKind::RightBracket,
            TokenKind::LeftBrace,
            TokenKind::RightBrace,
            TokenKind::Comma,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn integer_and_real_literals() {
    let tokens = kinds("42 0x1f 017 10u 3.5 1. 2e10 1e-3");
    assert!(matches!(tokens[0], TokenKind::Integer(s) if s.as_str() == "42"));
    assert!(matches!(tokens[1], TokenKind::Integer(s) if s.as_str() == "0x1f"));
    assert!(matches!(tokens[2], TokenKind::Integer(s) if s.as_str() == "017"));
    assert!(matches!(tokens[3], TokenKind::Integer(s) if s.as_str() == "10u"));
    assert!(matches!(tokens[4], TokenKind::Real(s) if s.as_str() == "3.5"));
    assert!(matches!(tokens[5], TokenKind::Real(s) if s.as_str() == "1."));
    assert!(matches!(tokens[6], TokenKind::Real(s) if s.as_str() == "2e10"));
    assert!(matches!(tokens[7], TokenKind::Real(s) if s.as_str() == "1e-3"));
}

#[test]
fn string_lexeme_keeps_quotes() {
    let tokens = kinds(r#"f("hello, %d\n")"#);
    assert!(matches!(tokens[1], TokenKind::LeftParen));
    assert!(matches!(tokens[2], TokenKind::StringLit(s) if s.as_str() == r#""hello, %d\n""#));
}

#[test]
fn comments_are_skipped() {
    let tokens = kinds("int /* a comment\nacross lines */ x; // trailing\n;");
    assert_eq!(tokens[0], TokenKind::Int);
    assert!(matches!(tokens[1], TokenKind::Identifier(_)));
    assert_eq!(tokens[2], TokenKind::Semicolon);
    assert_eq!(tokens[3], TokenKind::Semicolon);
    assert_eq!(tokens[4], TokenKind::Eof);
}

#[test]
fn stray_character_becomes_unknown() {
    let tokens = kinds("int @");
    assert!(matches!(tokens[1], TokenKind::Unknown(s) if s.as_str() == "@"));
}

#[test]
fn unterminated_string_becomes_unknown() {
    let tokens = kinds("\"no end");
    assert!(matches!(tokens[0], TokenKind::Unknown(_)));
}

#[test]
fn parses_integer_spellings() {
    assert_eq!(parse_integer("10"), 10);
    assert_eq!(parse_integer("0x10"), 16);
    assert_eq!(parse_integer("010"), 8);
    assert_eq!(parse_integer("12ul"), 12);
    assert_eq!(parse_integer("0"), 0);
}
