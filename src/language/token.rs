use crate::language::span::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Lifetime(String),
    Integer { value: u128, suffix: Option<String> },
    Float(String),
    Char(char),
    Byte(u8),
    Str(String),
    ByteStr(Vec<u8>),

    As,
    Async,
    Const,
    Crate,
    Dyn,
    Else,
    Enum,
    Extern,
    False,
    Fn,
    For,
    If,
    Impl,
    In,
    Let,
    Mod,
    Move,
    Mut,
    Pub,
    Ref,
    Return,
    SelfLower,
    SelfUpper,
    Static,
    Struct,
    Super,
    Trait,
    True,
    Type,
    Underscore,
    Unsafe,
    Use,
    Where,

    Ampersand,
    AmpersandAmpersand,
    PipePipe,
    Pipe,
    Caret,
    Bang,
    BangEq,
    Eq,
    EqEq,
    Lt,
    LtEq,
    Gt,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    DotDot,
    Comma,
    Colon,
    ColonColon,
    Semi,
    Question,
    Pound,
    Dollar,
    At,

    Arrow,    // ->
    FatArrow, // =>

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,
}

impl TokenKind {
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "as" => TokenKind::As,
            "async" => TokenKind::Async,
            "const" => TokenKind::Const,
            "crate" => TokenKind::Crate,
            "dyn" => TokenKind::Dyn,
            "else" => TokenKind::Else,
            "enum" => TokenKind::Enum,
            "extern" => TokenKind::Extern,
            "false" => TokenKind::False,
            "fn" => TokenKind::Fn,
            "for" => TokenKind::For,
            "if" => TokenKind::If,
            "impl" => TokenKind::Impl,
            "in" => TokenKind::In,
            "let" => TokenKind::Let,
            "mod" => TokenKind::Mod,
            "move" => TokenKind::Move,
            "mut" => TokenKind::Mut,
            "pub" => TokenKind::Pub,
            "ref" => TokenKind::Ref,
            "return" => TokenKind::Return,
            "self" => TokenKind::SelfLower,
            "Self" => TokenKind::SelfUpper,
            "static" => TokenKind::Static,
            "struct" => TokenKind::Struct,
            "super" => TokenKind::Super,
            "trait" => TokenKind::Trait,
            "true" => TokenKind::True,
            "type" => TokenKind::Type,
            "_" => TokenKind::Underscore,
            "unsafe" => TokenKind::Unsafe,
            "use" => TokenKind::Use,
            "where" => TokenKind::Where,
            _ => return None,
        };
        Some(kind)
    }

    /// Keywords that may start or appear inside a path.
    pub fn path_keyword_text(&self) -> Option<&'static str> {
        match self {
            TokenKind::SelfLower => Some("self"),
            TokenKind::SelfUpper => Some("Self"),
            TokenKind::Super => Some("super"),
            TokenKind::Crate => Some("crate"),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier(name) => format!("identifier `{name}`"),
            TokenKind::Lifetime(name) => format!("lifetime `{name}`"),
            TokenKind::Integer { .. } | TokenKind::Float(_) => "number".into(),
            TokenKind::Char(_) | TokenKind::Byte(_) => "character literal".into(),
            TokenKind::Str(_) | TokenKind::ByteStr(_) => "string literal".into(),
            TokenKind::Eof => "end of input".into(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::As => "as",
            TokenKind::Async => "async",
            TokenKind::Const => "const",
            TokenKind::Crate => "crate",
            TokenKind::Dyn => "dyn",
            TokenKind::Else => "else",
            TokenKind::Enum => "enum",
            TokenKind::Extern => "extern",
            TokenKind::False => "false",
            TokenKind::Fn => "fn",
            TokenKind::For => "for",
            TokenKind::If => "if",
            TokenKind::Impl => "impl",
            TokenKind::In => "in",
            TokenKind::Let => "let",
            TokenKind::Mod => "mod",
            TokenKind::Move => "move",
            TokenKind::Mut => "mut",
            TokenKind::Pub => "pub",
            TokenKind::Ref => "ref",
            TokenKind::Return => "return",
            TokenKind::SelfLower => "self",
            TokenKind::SelfUpper => "Self",
            TokenKind::Static => "static",
            TokenKind::Struct => "struct",
            TokenKind::Super => "super",
            TokenKind::Trait => "trait",
            TokenKind::True => "true",
            TokenKind::Type => "type",
            TokenKind::Underscore => "_",
            TokenKind::Unsafe => "unsafe",
            TokenKind::Use => "use",
            TokenKind::Where => "where",
            TokenKind::Ampersand => "&",
            TokenKind::AmpersandAmpersand => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Bang => "!",
            TokenKind::BangEq => "!=",
            TokenKind::Eq => "=",
            TokenKind::EqEq => "==",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Dot => ".",
            TokenKind::DotDot => "..",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::ColonColon => "::",
            TokenKind::Semi => ";",
            TokenKind::Question => "?",
            TokenKind::Pound => "#",
            TokenKind::Dollar => "$",
            TokenKind::At => "@",
            TokenKind::Arrow => "->",
            TokenKind::FatArrow => "=>",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Identifier(_)
            | TokenKind::Lifetime(_)
            | TokenKind::Integer { .. }
            | TokenKind::Float(_)
            | TokenKind::Char(_)
            | TokenKind::Byte(_)
            | TokenKind::Str(_)
            | TokenKind::ByteStr(_)
            | TokenKind::Eof => "",
        }
    }
}
