use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};

#[derive(Clone, Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub fn lex(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let lexer = Lexer::new(source);
    lexer.run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    current: Option<char>,
    offset: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let mut chars = src.chars();
        let current = chars.next();
        Self {
            src,
            chars,
            current,
            offset: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, Vec<LexError>> {
        while let Some(ch) = self.current {
            match ch {
                '/' if self.peek() == Some('/') => self.eat_line_comment(),
                '/' if self.peek() == Some('*') => self.eat_block_comment(),
                ch if ch.is_whitespace() => {
                    self.bump();
                }
                'b' if self.peek() == Some('\'') => self.lex_byte(),
                'b' if self.peek() == Some('"') => self.lex_byte_string(),
                'b' if self.peek() == Some('r') && matches!(self.peek_nth(1), Some('"' | '#')) => {
                    self.lex_raw_string(true)
                }
                'r' if matches!(self.peek(), Some('"'))
                    || (self.peek() == Some('#') && matches!(self.peek_nth(1), Some('"' | '#'))) =>
                {
                    self.lex_raw_string(false)
                }
                ch if is_ident_start(ch) => self.lex_identifier(),
                ch if ch.is_ascii_digit() => self.lex_number(),
                '"' => self.lex_string(),
                '\'' => self.lex_quote(),
                _ => self.lex_symbol(),
            }
        }
        self.push_token(TokenKind::Eof, self.offset, self.offset);

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    fn bump(&mut self) -> Option<char> {
        if let Some(ch) = self.current {
            self.offset += ch.len_utf8();
        }
        self.current = self.chars.next();
        self.current
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.clone().nth(n)
    }

    fn push_token(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
    }

    fn error(&mut self, start: usize, end: usize, message: impl Into<String>) {
        self.errors.push(LexError {
            message: message.into(),
            span: Span::new(start, end),
        });
    }

    fn eat_line_comment(&mut self) {
        self.bump();
        self.bump();
        while let Some(ch) = self.current {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn eat_block_comment(&mut self) {
        let start = self.offset;
        self.bump();
        self.bump();
        let mut depth = 1usize;
        while let Some(ch) = self.current {
            if ch == '/' && self.peek() == Some('*') {
                self.bump();
                self.bump();
                depth += 1;
                continue;
            }
            if ch == '*' && self.peek() == Some('/') {
                self.bump();
                self.bump();
                depth -= 1;
                if depth == 0 {
                    return;
                }
                continue;
            }
            self.bump();
        }
        self.error(start, self.offset, "Unterminated block comment");
    }

    fn lex_identifier(&mut self) {
        let start = self.offset;
        if self.current == Some('r') && self.peek() == Some('#') {
            // raw identifier, kept verbatim so it renders back unchanged
            self.bump();
            self.bump();
        }
        while let Some(ch) = self.current {
            if is_ident_continue(ch) {
                self.bump();
            } else {
                break;
            }
        }

        let end = self.offset;
        let slice = &self.src[start..end];
        let kind = TokenKind::keyword(slice).unwrap_or_else(|| TokenKind::Identifier(slice.to_string()));
        self.push_token(kind, start, end);
    }

    fn lex_number(&mut self) {
        let start = self.offset;
        let radix = if self.current == Some('0') {
            match self.peek() {
                Some('x') => 16,
                Some('o') => 8,
                Some('b') => 2,
                _ => 10,
            }
        } else {
            10
        };
        if radix != 10 {
            self.bump();
            self.bump();
        }

        let mut digits = String::new();
        while let Some(ch) = self.current {
            if ch == '_' {
                self.bump();
            } else if ch.is_digit(radix) || (radix == 16 && ch.is_ascii_hexdigit()) {
                digits.push(ch);
                self.bump();
            } else {
                break;
            }
        }

        let mut is_float = false;
        if radix == 10 && self.current == Some('.') {
            let next = self.peek();
            // `1..2` is a range and `1.foo()` a method call
            if next != Some('.') && !next.is_some_and(is_ident_start) {
                is_float = true;
                digits.push('.');
                self.bump();
                while let Some(ch) = self.current {
                    if ch == '_' {
                        self.bump();
                    } else if ch.is_ascii_digit() {
                        digits.push(ch);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }

        if radix == 10 && matches!(self.current, Some('e') | Some('E')) {
            let next = self.peek();
            if next.is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-') {
                is_float = true;
                digits.push('e');
                self.bump();
                if let Some(sign @ ('+' | '-')) = self.current {
                    digits.push(sign);
                    self.bump();
                }
                while let Some(ch) = self.current {
                    if ch.is_ascii_digit() {
                        digits.push(ch);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }

        let suffix_start = self.offset;
        while let Some(ch) = self.current {
            if is_ident_continue(ch) {
                self.bump();
            } else {
                break;
            }
        }
        let suffix = &self.src[suffix_start..self.offset];
        let end = self.offset;

        if is_float || matches!(suffix, "f32" | "f64") {
            let mut text = self.src[start..suffix_start].to_string();
            text.retain(|c| c != '_');
            if !suffix.is_empty() {
                text.push_str(suffix);
            }
            self.push_token(TokenKind::Float(text), start, end);
            return;
        }

        match u128::from_str_radix(&digits, radix) {
            Ok(value) => {
                let suffix = (!suffix.is_empty()).then(|| suffix.to_string());
                self.push_token(TokenKind::Integer { value, suffix }, start, end);
            }
            Err(_) => self.error(start, end, "Invalid integer literal"),
        }
    }

    fn lex_string(&mut self) {
        let start = self.offset;
        self.bump();
        let mut value = String::new();
        while let Some(ch) = self.current {
            match ch {
                '"' => {
                    self.bump();
                    let end = self.offset;
                    self.push_token(TokenKind::Str(value), start, end);
                    return;
                }
                '\\' => {
                    if let Some(escaped) = self.lex_escape(false) {
                        value.push(escaped);
                    }
                }
                _ => {
                    value.push(ch);
                    self.bump();
                }
            }
        }
        self.error(start, self.offset, "Unterminated string literal");
    }

    fn lex_byte_string(&mut self) {
        let start = self.offset;
        self.bump(); // b
        self.bump(); // "
        let mut value = Vec::new();
        while let Some(ch) = self.current {
            match ch {
                '"' => {
                    self.bump();
                    let end = self.offset;
                    self.push_token(TokenKind::ByteStr(value), start, end);
                    return;
                }
                '\\' => {
                    if let Some(escaped) = self.lex_escape(true) {
                        value.push(escaped as u8);
                    }
                }
                ch if ch.is_ascii() => {
                    value.push(ch as u8);
                    self.bump();
                }
                _ => {
                    let at = self.offset;
                    self.bump();
                    self.error(at, self.offset, "Non-ASCII character in byte string literal");
                }
            }
        }
        self.error(start, self.offset, "Unterminated byte string literal");
    }

    fn lex_raw_string(&mut self, byte: bool) {
        let start = self.offset;
        if byte {
            self.bump();
        }
        self.bump(); // r
        let mut hashes = 0usize;
        while self.current == Some('#') {
            hashes += 1;
            self.bump();
        }
        if self.current != Some('"') {
            self.error(start, self.offset, "Expected '\"' in raw string literal");
            return;
        }
        self.bump();
        let content_start = self.offset;
        while let Some(ch) = self.current {
            if ch == '"' {
                let content_end = self.offset;
                let closes = (0..hashes).all(|idx| self.peek_nth(idx) == Some('#'));
                if closes {
                    self.bump();
                    for _ in 0..hashes {
                        self.bump();
                    }
                    let text = &self.src[content_start..content_end];
                    let kind = if byte {
                        TokenKind::ByteStr(text.as_bytes().to_vec())
                    } else {
                        TokenKind::Str(text.to_string())
                    };
                    self.push_token(kind, start, self.offset);
                    return;
                }
            }
            self.bump();
        }
        self.error(start, self.offset, "Unterminated raw string literal");
    }

    fn lex_byte(&mut self) {
        let start = self.offset;
        self.bump(); // b
        self.bump(); // '
        let value = match self.current {
            Some('\\') => self.lex_escape(true),
            Some(ch) if ch.is_ascii() && ch != '\'' => {
                self.bump();
                Some(ch)
            }
            _ => None,
        };
        if self.current != Some('\'') {
            self.error(start, self.offset, "Unterminated byte literal");
            return;
        }
        self.bump();
        match value {
            Some(ch) => self.push_token(TokenKind::Byte(ch as u8), start, self.offset),
            None => self.error(start, self.offset, "Invalid byte literal"),
        }
    }

    /// Either a lifetime (`'a`) or a character literal (`'a'`).
    fn lex_quote(&mut self) {
        let start = self.offset;
        let first = self.peek();
        let second = self.peek_nth(1);
        if first.is_some_and(is_ident_start) && second != Some('\'') {
            self.bump(); // '
            while let Some(ch) = self.current {
                if is_ident_continue(ch) {
                    self.bump();
                } else {
                    break;
                }
            }
            let name = self.src[start..self.offset].to_string();
            self.push_token(TokenKind::Lifetime(name), start, self.offset);
            return;
        }

        self.bump(); // '
        let value = match self.current {
            Some('\\') => self.lex_escape(false),
            Some(ch) if ch != '\'' => {
                self.bump();
                Some(ch)
            }
            _ => None,
        };
        if self.current != Some('\'') {
            self.error(start, self.offset, "Unterminated character literal");
            return;
        }
        self.bump();
        match value {
            Some(ch) => self.push_token(TokenKind::Char(ch), start, self.offset),
            None => self.error(start, self.offset, "Invalid character literal"),
        }
    }

    /// Consumes an escape sequence starting at the backslash.
    fn lex_escape(&mut self, byte: bool) -> Option<char> {
        let start = self.offset;
        self.bump(); // backslash
        let escaped = self.current?;
        self.bump();
        let value = match escaped {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '\\' => '\\',
            '0' => '\0',
            '\'' => '\'',
            '"' => '"',
            'x' => {
                let mut digits = String::new();
                for _ in 0..2 {
                    match self.current {
                        Some(ch) if ch.is_ascii_hexdigit() => {
                            digits.push(ch);
                            self.bump();
                        }
                        _ => break,
                    }
                }
                let value = u8::from_str_radix(&digits, 16).ok();
                match value {
                    Some(value) if byte || value <= 0x7f => value as char,
                    _ => {
                        self.error(start, self.offset, "Invalid \\x escape");
                        return None;
                    }
                }
            }
            'u' if !byte => {
                if self.current != Some('{') {
                    self.error(start, self.offset, "Expected '{' in unicode escape");
                    return None;
                }
                self.bump();
                let mut digits = String::new();
                while let Some(ch) = self.current {
                    if ch == '}' {
                        break;
                    }
                    if ch != '_' {
                        digits.push(ch);
                    }
                    self.bump();
                }
                if self.current == Some('}') {
                    self.bump();
                }
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(ch) => ch,
                    None => {
                        self.error(start, self.offset, "Invalid unicode escape");
                        return None;
                    }
                }
            }
            '\n' => {
                // line continuation swallows the following whitespace
                while self.current.is_some_and(char::is_whitespace) {
                    self.bump();
                }
                return None;
            }
            other => {
                self.error(start, self.offset, format!("Unknown escape '\\{other}'"));
                return None;
            }
        };
        Some(value)
    }

    fn lex_symbol(&mut self) {
        let start = self.offset;
        let ch = self.current;
        match ch {
            Some('(') => self.single(TokenKind::LParen),
            Some(')') => self.single(TokenKind::RParen),
            Some('{') => self.single(TokenKind::LBrace),
            Some('}') => self.single(TokenKind::RBrace),
            Some('[') => self.single(TokenKind::LBracket),
            Some(']') => self.single(TokenKind::RBracket),
            Some(',') => self.single(TokenKind::Comma),
            Some('.') => {
                self.bump();
                if self.current == Some('.') {
                    self.bump();
                    self.push_token(TokenKind::DotDot, start, self.offset);
                } else {
                    self.push_token(TokenKind::Dot, start, self.offset);
                }
            }
            Some(':') => {
                self.bump();
                if self.current == Some(':') {
                    self.bump();
                    self.push_token(TokenKind::ColonColon, start, self.offset);
                } else {
                    self.push_token(TokenKind::Colon, start, self.offset);
                }
            }
            Some(';') => self.single(TokenKind::Semi),
            Some('%') => self.single(TokenKind::Percent),
            Some('?') => self.single(TokenKind::Question),
            Some('#') => self.single(TokenKind::Pound),
            Some('$') => self.single(TokenKind::Dollar),
            Some('@') => self.single(TokenKind::At),
            Some('+') => self.single(TokenKind::Plus),
            Some('*') => self.single(TokenKind::Star),
            Some('^') => self.single(TokenKind::Caret),
            Some('/') => self.single(TokenKind::Slash),
            Some('&') => {
                self.bump();
                if self.current == Some('&') {
                    self.bump();
                    self.push_token(TokenKind::AmpersandAmpersand, start, self.offset);
                } else {
                    self.push_token(TokenKind::Ampersand, start, self.offset);
                }
            }
            Some('|') => {
                self.bump();
                if self.current == Some('|') {
                    self.bump();
                    self.push_token(TokenKind::PipePipe, start, self.offset);
                } else {
                    self.push_token(TokenKind::Pipe, start, self.offset);
                }
            }
            Some('!') => {
                self.bump();
                if self.current == Some('=') {
                    self.bump();
                    self.push_token(TokenKind::BangEq, start, self.offset);
                } else {
                    self.push_token(TokenKind::Bang, start, self.offset);
                }
            }
            Some('=') => {
                self.bump();
                if self.current == Some('>') {
                    self.bump();
                    self.push_token(TokenKind::FatArrow, start, self.offset);
                } else if self.current == Some('=') {
                    self.bump();
                    self.push_token(TokenKind::EqEq, start, self.offset);
                } else {
                    self.push_token(TokenKind::Eq, start, self.offset);
                }
            }
            Some('<') => {
                self.bump();
                if self.current == Some('=') {
                    self.bump();
                    self.push_token(TokenKind::LtEq, start, self.offset);
                } else {
                    self.push_token(TokenKind::Lt, start, self.offset);
                }
            }
            // `>>` and `>=` stay split so nested generic lists close cleanly;
            // the parser re-joins adjacent tokens in expression position.
            Some('>') => self.single(TokenKind::Gt),
            Some('-') => {
                self.bump();
                if self.current == Some('>') {
                    self.bump();
                    self.push_token(TokenKind::Arrow, start, self.offset);
                } else {
                    self.push_token(TokenKind::Minus, start, self.offset);
                }
            }
            Some(ch) => {
                self.bump();
                self.error(start, self.offset, format!("Unexpected character '{}'", ch));
            }
            None => {}
        }
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.offset;
        self.bump();
        self.push_token(kind, start, self.offset);
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}
