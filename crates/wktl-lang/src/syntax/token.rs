use crate::geometry::GeometryKind;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    Bool(bool),
    Ident(String),

    // Keywords (matched case-insensitively against the whole identifier)
    Geometry(GeometryKind),
    Function,
    Generate,
    If,
    Then,
    Else,
    And,
    Or,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Caret,      // ^
    PlusPlus,   // ++
    Eq,         // =
    EqEq,       // ==
    Bang,       // !
    BangEq,     // !=
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=
    FatArrow,   // =>
    Pipe,       // |
    PipePipe,   // ||
    PipeGt,     // |>
    PipeStar,   // |*

    // Punctuation
    Colon,      // :
    Comma,      // ,
    Semicolon,  // ;
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }

    Eof,
}

impl TokenKind {
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Plus | Self::Minus | Self::Star | Self::Slash | Self::Percent | Self::Caret)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, Self::Lt | Self::LtEq | Self::Gt | Self::GtEq)
    }

    pub fn is_pipeline(&self) -> bool {
        matches!(self, Self::Pipe | Self::PipePipe | Self::PipeGt | Self::PipeStar | Self::PlusPlus)
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::Geometry(_) | Self::Function | Self::Generate | Self::If | Self::Then
            | Self::Else | Self::And | Self::Or | Self::Bool(_)
        )
    }

    /// Short human-readable form used in parse error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number `{n}`"),
            Self::Bool(b) => format!("`{b}`"),
            Self::Ident(s) => format!("identifier `{s}`"),
            Self::Geometry(k) => format!("`{}`", k.keyword()),
            Self::Eof => "end of input".to_string(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Self::Function => "Function",
            Self::Generate => "Generate",
            Self::If => "if",
            Self::Then => "then",
            Self::Else => "else",
            Self::And => "and",
            Self::Or => "or",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Caret => "^",
            Self::PlusPlus => "++",
            Self::Eq => "=",
            Self::EqEq => "==",
            Self::Bang => "!",
            Self::BangEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::FatArrow => "=>",
            Self::Pipe => "|",
            Self::PipePipe => "||",
            Self::PipeGt => "|>",
            Self::PipeStar => "|*",
            Self::Colon => ":",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::Number(_) | Self::Bool(_) | Self::Ident(_) | Self::Geometry(_) | Self::Eof => "",
        }
    }
}

/// Maps identifier text to its keyword token, or returns `Ident`.
/// Keywords only match the whole word, so `pointA` stays an identifier.
pub fn keyword_or_ident(s: String) -> TokenKind {
    if let Some(kind) = GeometryKind::from_keyword(&s) {
        return TokenKind::Geometry(kind);
    }
    match s.to_ascii_lowercase().as_str() {
        "function" => TokenKind::Function,
        "generate" => TokenKind::Generate,
        "if"       => TokenKind::If,
        "then"     => TokenKind::Then,
        "else"     => TokenKind::Else,
        "and"      => TokenKind::And,
        "or"       => TokenKind::Or,
        "true"     => TokenKind::Bool(true),
        "false"    => TokenKind::Bool(false),
        _          => TokenKind::Ident(s),
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
    /// Byte length of the source text this token covers.
    pub len: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize, len: usize) -> Self {
        Self { kind, line, column, len }
    }

    /// True when `next` starts on the same line right where this token ends.
    pub fn touches(&self, next: &Token) -> bool {
        self.line == next.line && self.column + self.len == next.column
    }
}
