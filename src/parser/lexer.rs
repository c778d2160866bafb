//! Lexer for recipe files
//!
//! The lexer tokenizes input into a stream of tokens that the parser
//! consumes. It handles:
//! - Quoted strings with escape sequences and line continuations
//! - Backtick command captures
//! - Integer literals in decimal, hex and binary
//! - Comments (including a leading shebang)
//!
//! Whitespace is insignificant; semicolons are treated as whitespace.

/// Token types produced by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // End of input
    Eof,

    // Literals
    Ident,
    Str,
    Backtick,
    Number,
    Boolean,

    // Operators
    Assign,  // =
    LAssign, // =>

    // Delimiters
    Comma,
    LParen,
    RParen,
    LSquare,
    RSquare,
    LBrace,
    RBrace,

    // Anything the lexer could not turn into a token
    Illegal,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eof => "EOF",
            Self::Ident => "IDENT",
            Self::Str => "STRING",
            Self::Backtick => "BACKTICK",
            Self::Number => "NUMBER",
            Self::Boolean => "BOOLEAN",
            Self::Assign => "=",
            Self::LAssign => "=>",
            Self::Comma => ",",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LSquare => "[",
            Self::RSquare => "]",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::Illegal => "ILLEGAL",
        }
    }
}

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            literal: literal.into(),
            line,
            column,
        }
    }

    pub fn eof(line: usize, column: usize) -> Self {
        Self::new(TokenKind::Eof, "", line, column)
    }
}

/// Characters that terminate an identifier run.
fn is_special(c: char) -> bool {
    matches!(
        c,
        ',' | '(' | ')' | '=' | '{' | '}' | '[' | ']' | '`' | '"' | ';' | '#' | '\0'
    )
}

fn is_ident_char(c: char) -> bool {
    !c.is_whitespace() && !is_special(c)
}

/// Try to read an identifier run as an integer literal.
///
/// Accepts decimal, `0x…` hex and `0b…` binary, with an optional sign.
/// The returned value stringifies back to decimal.
fn parse_number(s: &str) -> Option<i64> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if body.is_empty() {
        return None;
    }

    let value = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else {
        body.parse::<i64>().ok()?
    };

    Some(if negative { -value } else { value })
}

/// The lexer walks the input one character at a time, producing tokens on
/// demand via [`Lexer::next_token`]. Once the end of input is reached it
/// yields `Eof` forever.
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Skip whitespace, semicolons, and `#` comments.
    fn skip_insignificant(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == ';' {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    /// Produce the next token. Returns `Eof` forever once exhausted.
    pub fn next_token(&mut self) -> Token {
        self.skip_insignificant();

        let line = self.line;
        let column = self.column;

        let c = match self.peek() {
            Some(c) => c,
            None => return Token::eof(line, column),
        };

        match c {
            '=' => {
                self.bump();
                if self.peek() == Some('>') {
                    self.bump();
                    Token::new(TokenKind::LAssign, "=>", line, column)
                } else {
                    Token::new(TokenKind::Assign, "=", line, column)
                }
            }
            ',' => self.single(TokenKind::Comma, line, column),
            '(' => self.single(TokenKind::LParen, line, column),
            ')' => self.single(TokenKind::RParen, line, column),
            '[' => self.single(TokenKind::LSquare, line, column),
            ']' => self.single(TokenKind::RSquare, line, column),
            '{' => self.single(TokenKind::LBrace, line, column),
            '}' => self.single(TokenKind::RBrace, line, column),
            '"' => self.read_string(line, column),
            '`' => self.read_backtick(line, column),
            _ => self.read_identifier(line, column),
        }
    }

    fn single(&mut self, kind: TokenKind, line: usize, column: usize) -> Token {
        let c = self.bump().unwrap_or('\0');
        Token::new(kind, c.to_string(), line, column)
    }

    /// Read a `"…"` string literal, processing escape sequences.
    fn read_string(&mut self, line: usize, column: usize) -> Token {
        self.bump(); // opening quote
        let mut out = String::new();

        loop {
            let c = match self.bump() {
                Some(c) => c,
                None => {
                    return Token::new(
                        TokenKind::Illegal,
                        format!("unterminated string starting at line {}", line),
                        line,
                        column,
                    );
                }
            };

            match c {
                '"' => return Token::new(TokenKind::Str, out, line, column),
                '\\' => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    // Line continuation: both characters are suppressed.
                    Some('\n') => {}
                    Some(other) => out.push(other),
                    None => {
                        return Token::new(
                            TokenKind::Illegal,
                            format!("unterminated string starting at line {}", line),
                            line,
                            column,
                        );
                    }
                },
                _ => out.push(c),
            }
        }
    }

    /// Read a `` `…` `` command capture. No escape handling.
    fn read_backtick(&mut self, line: usize, column: usize) -> Token {
        self.bump(); // opening backtick
        let mut out = String::new();

        loop {
            match self.bump() {
                Some('`') => return Token::new(TokenKind::Backtick, out, line, column),
                Some(c) => out.push(c),
                None => {
                    return Token::new(
                        TokenKind::Illegal,
                        format!("unterminated backtick starting at line {}", line),
                        line,
                        column,
                    );
                }
            }
        }
    }

    /// Read a maximal identifier run, then reclassify booleans and numbers.
    fn read_identifier(&mut self, line: usize, column: usize) -> Token {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !is_ident_char(c) {
                break;
            }
            out.push(c);
            self.bump();
        }

        if out.is_empty() {
            // A character that is neither a delimiter nor an identifier
            // character (only NUL qualifies).
            let c = self.bump().unwrap_or('\0');
            return Token::new(TokenKind::Illegal, c.to_string(), line, column);
        }

        if out == "true" || out == "false" {
            return Token::new(TokenKind::Boolean, out, line, column);
        }

        if let Some(n) = parse_number(&out) {
            return Token::new(TokenKind::Number, n.to_string(), line, column);
        }

        Token::new(TokenKind::Ident, out, line, column)
    }

    /// Collect every remaining token, including the trailing `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                return tokens;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).tokenize().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_rule() {
        let tokens = Lexer::new("shell { command => \"true\" }").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].literal, "shell");
        assert_eq!(tokens[1].kind, TokenKind::LBrace);
        assert_eq!(tokens[2].kind, TokenKind::Ident);
        assert_eq!(tokens[2].literal, "command");
        assert_eq!(tokens[3].kind, TokenKind::LAssign);
        assert_eq!(tokens[4].kind, TokenKind::Str);
        assert_eq!(tokens[4].literal, "true");
        assert_eq!(tokens[5].kind, TokenKind::RBrace);
        assert_eq!(tokens[6].kind, TokenKind::Eof);
    }

    #[test]
    fn test_assign_vs_fat_arrow() {
        assert_eq!(
            kinds("let a = 3"),
            vec![
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
        let tokens = Lexer::new("a => b").tokenize();
        assert_eq!(tokens[1].kind, TokenKind::LAssign);
        assert_eq!(tokens[1].literal, "=>");
    }

    #[test]
    fn test_number_normalisation() {
        let tokens = Lexer::new("10 0x10 0b11 -3").tokenize();
        assert_eq!(tokens[0].literal, "10");
        assert_eq!(tokens[1].literal, "16");
        assert_eq!(tokens[2].literal, "3");
        assert_eq!(tokens[3].literal, "-3");
        assert!(tokens[..4].iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn test_bad_hex_stays_ident() {
        let tokens = Lexer::new("0xzz").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].literal, "0xzz");
    }

    #[test]
    fn test_booleans() {
        let tokens = Lexer::new("true false truthy").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Boolean);
        assert_eq!(tokens[1].kind, TokenKind::Boolean);
        assert_eq!(tokens[2].kind, TokenKind::Ident);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = Lexer::new(r#""a\tb\n\"q\"\\""#).tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].literal, "a\tb\n\"q\"\\");
    }

    #[test]
    fn test_line_continuation() {
        let tokens = Lexer::new("\"one \\\ntwo\"").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].literal, "one two");
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = Lexer::new("\"oops").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Illegal);
        assert!(tokens[0].literal.contains("unterminated string"));
    }

    #[test]
    fn test_backtick() {
        let tokens = Lexer::new("`uname -a`").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Backtick);
        assert_eq!(tokens[0].literal, "uname -a");
    }

    #[test]
    fn test_unterminated_backtick() {
        let tokens = Lexer::new("`oops").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Illegal);
        assert!(tokens[0].literal.contains("unterminated backtick"));
    }

    #[test]
    fn test_comments_and_shebang() {
        let input = "#!/usr/bin/env rigger\n# a comment\nlet a = 1 # trailing\n";
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_semicolons_are_whitespace() {
        assert_eq!(
            kinds("let a = 1; let b = 2"),
            kinds("let a = 1 let b = 2")
        );
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("let a = 1\nlet b = 2").tokenize();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[0].column, 1);
        assert_eq!(tokens[4].literal, "let");
        assert_eq!(tokens[4].line, 2);
        assert_eq!(tokens[4].column, 1);
    }

    #[test]
    fn test_list_tokens() {
        assert_eq!(
            kinds("[\"a\", \"b\"]"),
            vec![
                TokenKind::LSquare,
                TokenKind::Str,
                TokenKind::Comma,
                TokenKind::Str,
                TokenKind::RSquare,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut lexer = Lexer::new("a");
        assert_eq!(lexer.next_token().kind, TokenKind::Ident);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    /// Render a token stream back to equivalent source text.
    fn render(tokens: &[Token]) -> String {
        let mut out = String::new();
        for t in tokens {
            match t.kind {
                TokenKind::Str => {
                    let escaped = t
                        .literal
                        .replace('\\', "\\\\")
                        .replace('"', "\\\"")
                        .replace('\n', "\\n")
                        .replace('\r', "\\r")
                        .replace('\t', "\\t");
                    out.push_str(&format!("\"{}\" ", escaped));
                }
                TokenKind::Backtick => out.push_str(&format!("`{}` ", t.literal)),
                TokenKind::Eof => {}
                _ => {
                    out.push_str(&t.literal);
                    out.push(' ');
                }
            }
        }
        out
    }

    #[test]
    fn test_token_stream_round_trips() {
        let input =
            "let a = \"x\\ty\"\nshell { command => `ls -l`, count => 0x10, flag => true }";
        let first = Lexer::new(input).tokenize();
        let rebuilt = render(&first);
        let second = Lexer::new(&rebuilt).tokenize();
        let strip = |ts: &[Token]| -> Vec<(TokenKind, String)> {
            ts.iter().map(|t| (t.kind, t.literal.clone())).collect()
        };
        assert_eq!(strip(&first), strip(&second));
    }

    #[test]
    fn test_idents_may_contain_punctuation() {
        let tokens = Lexer::new("/usr/bin/apt-get foo.bar").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].literal, "/usr/bin/apt-get");
        assert_eq!(tokens[1].literal, "foo.bar");
    }
}
