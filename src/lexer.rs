//! Lexical analysis for Simple C.
//!
//! A hand-written scanner over the source text. Identifier, number and
//! string spellings are interned so tokens stay small and copyable.
//! String lexemes keep their surrounding quotes; escape sequences are
//! passed through verbatim for the assembler to interpret.

use std::fmt;
use std::sync::OnceLock;

use hashbrown::HashMap;
use symbol_table::GlobalSymbol as Name;

/// Token kinds for the Simple C lexical analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Int,
    Double,
    Void,
    If,
    Else,
    While,
    Return,
    Sizeof,

    // Literals and identifiers
    Identifier(Name),
    Integer(Name),
    Real(Name),
    StringLit(Name),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Not,
    Assign,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    LogicAnd,
    LogicOr,

    // Punctuation
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Semicolon,

    Eof,
    /// A stray or unterminated construct; the parser reports a syntax
    /// error at its lexeme.
    Unknown(Name),
}

impl TokenKind {
    /// The lexeme as it appeared in the source, for diagnostics.
    pub fn lexeme(&self) -> String {
        match self {
            TokenKind::Identifier(s)
            | TokenKind::Integer(s)
            | TokenKind::Real(s)
            | TokenKind::StringLit(s)
            | TokenKind::Unknown(s) => s.to_string(),
            other => other.fixed_spelling().to_string(),
        }
    }

    fn fixed_spelling(&self) -> &'static str {
        match self {
            TokenKind::Int => "int",
            TokenKind::Double => "double",
            TokenKind::Void => "void",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Return => "return",
            TokenKind::Sizeof => "sizeof",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Amp => "&",
            TokenKind::Not => "!",
            TokenKind::Assign => "=",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEqual => "<=",
            TokenKind::GreaterEqual => ">=",
            TokenKind::Equal => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::LogicAnd => "&&",
            TokenKind::LogicOr => "||",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Eof => "<eof>",
            _ => unreachable!("interned lexeme"),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lexeme())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
}

static KEYWORDS: OnceLock<HashMap<&'static str, TokenKind>> = OnceLock::new();

fn keywords() -> &'static HashMap<&'static str, TokenKind> {
    KEYWORDS.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert("int", TokenKind::Int);
        map.insert("double", TokenKind::Double);
        map.insert("void", TokenKind::Void);
        map.insert("if", TokenKind::If);
        map.insert("else", TokenKind::Else);
        map.insert("while", TokenKind::While);
        map.insert("return", TokenKind::Return);
        map.insert("sizeof", TokenKind::Sizeof);
        map
    })
}

/// Parse an integer spelling (decimal, octal `0…`, or hex `0x…`,
/// optionally suffixed with `u`/`l` in any combination). Used for
/// array lengths; returns 0 for a malformed spelling, which the
/// scanner never produces.
pub fn parse_integer(text: &str) -> u32 {
    let trimmed = text.trim_end_matches(|c| matches!(c, 'u' | 'U' | 'l' | 'L'));

    let (digits, radix) = if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        (hex, 16)
    } else if trimmed.len() > 1 && trimmed.starts_with('0') {
        (&trimmed[1..], 8)
    } else {
        (trimmed, 10)
    };

    u32::from_str_radix(digits, radix).unwrap_or(0)
}

/// The scanner. Produces one token at a time; the parser layers its
/// own lookahead and peek on top.
pub struct Lexer<'src> {
    src: &'src str,
    bytes: &'src [u8],
    pos: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            src: source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let Some(&byte) = self.bytes.get(self.pos) else {
            return Token { kind: TokenKind::Eof };
        };

        let kind = match byte {
            b'0'..=b'9' => self.scan_number(),
            b'"' => self.scan_string(),
            b'_' | b'a'..=b'z' | b'A'..=b'Z' => self.scan_identifier(),
            _ => self.scan_punctuation(),
        };

        Token { kind }
    }

    fn skip_trivia(&mut self) {
        loop {
            while self.bytes.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
                self.pos += 1;
            }

            match (
                self.bytes.get(self.pos).copied(),
                self.bytes.get(self.pos + 1).copied(),
            ) {
                (Some(b'/'), Some(b'/')) => {
                    while !matches!(self.bytes.get(self.pos).copied(), None | Some(b'\n')) {
                        self.pos += 1;
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    self.pos += 2;
                    while self.pos < self.bytes.len() {
                        if self.bytes[self.pos] == b'*' && self.bytes.get(self.pos + 1) == Some(&b'/') {
                            self.pos += 2;
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => return,
            }
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
        {
            self.pos += 1;
        }

        let text = &self.src[start..self.pos];
        keywords()
            .get(text)
            .copied()
            .unwrap_or_else(|| TokenKind::Identifier(Name::new(text)))
    }

    /// Numbers: a decimal point or exponent makes a real; a leading
    /// `0x` makes a hex integer; integer suffixes are part of the
    /// spelling.
    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;
        let mut real = false;

        if self.bytes[self.pos] == b'0'
            && matches!(self.bytes.get(self.pos + 1).copied(), Some(b'x' | b'X'))
        {
            self.pos += 2;
            while self.bytes.get(self.pos).is_some_and(u8::is_ascii_hexdigit) {
                self.pos += 1;
            }
        } else {
            while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
                self.pos += 1;
            }

            if self.bytes.get(self.pos) == Some(&b'.') {
                real = true;
                self.pos += 1;
                while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
                    self.pos += 1;
                }
            }

            if matches!(self.bytes.get(self.pos).copied(), Some(b'e' | b'E')) {
                let mut end = self.pos + 1;
                if matches!(self.bytes.get(end).copied(), Some(b'+' | b'-')) {
                    end += 1;
                }
                if self.bytes.get(end).is_some_and(u8::is_ascii_digit) {
                    real = true;
                    self.pos = end;
                    while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
                        self.pos += 1;
                    }
                }
            }
        }

        if !real {
            while matches!(
                self.bytes.get(self.pos).copied(),
                Some(b'u' | b'U' | b'l' | b'L')
            ) {
                self.pos += 1;
            }
        }

        let spelling = Name::new(&self.src[start..self.pos]);
        if real {
            TokenKind::Real(spelling)
        } else {
            TokenKind::Integer(spelling)
        }
    }

    fn scan_string(&mut self) -> TokenKind {
        let start = self.pos;
        self.pos += 1;

        while let Some(&byte) = self.bytes.get(self.pos) {
            match byte {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return TokenKind::StringLit(Name::new(&self.src[start..self.pos]));
                }
                b'\n' => break,
                _ => self.pos += 1,
            }
        }

        // Unterminated; hand the rest of the line to the parser as-is.
        let mut end = self.pos.min(self.bytes.len());
        while !self.src.is_char_boundary(end) {
            end -= 1;
        }
        self.pos = end;
        TokenKind::Unknown(Name::new(&self.src[start..end]))
    }

    fn scan_punctuation(&mut self) -> TokenKind {
        let byte = self.bytes[self.pos];
        let next = self.bytes.get(self.pos + 1).copied();
        self.pos += 1;

        let two = |lexer: &mut Self, kind| {
            lexer.pos += 1;
            kind
        };

        match (byte, next) {
            (b'<', Some(b'=')) => two(self, TokenKind::LessEqual),
            (b'>', Some(b'=')) => two(self, TokenKind::GreaterEqual),
            (b'=', Some(b'=')) => two(self, TokenKind::Equal),
            (b'!', Some(b'=')) => two(self, TokenKind::NotEqual),
            (b'&', Some(b'&')) => two(self, TokenKind::LogicAnd),
            (b'|', Some(b'|')) => two(self, TokenKind::LogicOr),
            (b'+', _) => TokenKind::Plus,
            (b'-', _) => TokenKind::Minus,
            (b'*', _) => TokenKind::Star,
            (b'/', _) => TokenKind::Slash,
            (b'%', _) => TokenKind::Percent,
            (b'&', _) => TokenKind::Amp,
            (b'!', _) => TokenKind::Not,
            (b'=', _) => TokenKind::Assign,
            (b'<', _) => TokenKind::Less,
            (b'>', _) => TokenKind::Greater,
            (b'(', _) => TokenKind::LeftParen,
            (b')', _) => TokenKind::RightParen,
            (b'[', _) => TokenKind::LeftBracket,
            (b']', _) => TokenKind::RightBracket,
            (b'{', _) => TokenKind::LeftBrace,
            (b'}', _) => TokenKind::RightBrace,
            (b',', _) => TokenKind::Comma,
            (b';', _) => TokenKind::Semicolon,
            _ => {
                let start = self.pos - 1;
                let len = self.src[start..].chars().next().map_or(1, char::len_utf8);
                self.pos = start + len;
                TokenKind::Unknown(Name::new(&self.src[start..self.pos]))
            }
        }
    }
}

#[cfg(test)]
mod tests_lexer;
