use crate::error::{ErrorCode, SyntaxError};
use crate::syntax::token::{Token, TokenKind, keyword_or_ident};

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source: source.as_bytes(), pos: 0, line: 1, column: 1 }
    }

    /// Stops at the first error; the parser is fail-fast and so is this.
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia();

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, self.line, self.column, 0));
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, SyntaxError> {
        let start = self.pos;
        let line = self.line;
        let col = self.column;
        let ch = self.advance();

        let kind = match ch {
            b'+' => {
                if self.peek() == b'+' { self.advance(); TokenKind::PlusPlus }
                else { TokenKind::Plus }
            }
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'^' => TokenKind::Caret,
            b':' => TokenKind::Colon,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,

            b'=' => {
                if self.peek() == b'=' { self.advance(); TokenKind::EqEq }
                else if self.peek() == b'>' { self.advance(); TokenKind::FatArrow }
                else { TokenKind::Eq }
            }
            b'!' => {
                if self.peek() == b'=' { self.advance(); TokenKind::BangEq }
                else { TokenKind::Bang }
            }
            b'<' => {
                if self.peek() == b'=' { self.advance(); TokenKind::LtEq }
                else { TokenKind::Lt }
            }
            b'>' => {
                if self.peek() == b'=' { self.advance(); TokenKind::GtEq }
                else { TokenKind::Gt }
            }
            b'|' => match self.peek() {
                b'|' => { self.advance(); TokenKind::PipePipe }
                b'>' => { self.advance(); TokenKind::PipeGt }
                b'*' => { self.advance(); TokenKind::PipeStar }
                _ => TokenKind::Pipe,
            },

            b'0'..=b'9' => TokenKind::Number(self.read_number(start, line, col)?),
            b'.' if self.peek().is_ascii_digit() => TokenKind::Number(self.read_number(start, line, col)?),
            b'a'..=b'z' | b'A'..=b'Z' | b'$' => keyword_or_ident(self.read_ident(start)),

            other => {
                return Err(SyntaxError::new(ErrorCode::L001, line, col,
                    format!("unexpected character `{}`", other as char)));
            }
        };

        Ok(Token::new(kind, line, col, self.pos - start))
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.pos];
        self.pos += 1;
        if ch == b'\n' { self.line += 1; self.column = 1; }
        else { self.column += 1; }
        ch
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() { 0 } else { self.source[self.pos] }
    }

    fn peek_next(&self) -> u8 {
        if self.pos + 1 >= self.source.len() { 0 } else { self.source[self.pos + 1] }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Whitespace and `#` line comments.
    fn skip_trivia(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\n' => { self.advance(); }
                b'#' => {
                    while !self.is_at_end() && self.peek() != b'\n' { self.advance(); }
                }
                _ => break,
            }
        }
    }

    fn skip_digits(&mut self) {
        while self.peek().is_ascii_digit() { self.advance(); }
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    /// `start` points at the first byte of the literal, which has already been consumed.
    fn read_number(&mut self, start: usize, line: usize, col: usize) -> Result<f64, SyntaxError> {
        if self.source[start] == b'.' {
            self.skip_digits();
        } else {
            self.skip_digits();
            if self.peek() == b'.' {
                if !self.peek_next().is_ascii_digit() {
                    return Err(SyntaxError::new(ErrorCode::L002, line, col,
                        "malformed number: expected digits after `.`"));
                }
                self.advance();
                self.skip_digits();
            }
        }

        // exponent is only taken when digits follow, so `2E` stays `2` then `E`
        if matches!(self.peek(), b'e' | b'E') {
            let after = self.peek_next();
            let signed = matches!(after, b'+' | b'-')
                && self.source.get(self.pos + 2).is_some_and(u8::is_ascii_digit);
            if after.is_ascii_digit() || signed {
                self.advance();
                if signed { self.advance(); }
                self.skip_digits();
            }
        }

        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or_default();
        text.parse::<f64>().map_err(|_| {
            SyntaxError::new(ErrorCode::L002, line, col, format!("malformed number `{text}`"))
        })
    }

    fn read_ident(&mut self, start: usize) -> String {
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'?' | b'\'') {
            self.advance();
        }
        String::from_utf8_lossy(&self.source[start..self.pos]).into_owned()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
