//! Token types for the Latte layout scanner.

use latte_core::Span;
use std::fmt;

/// A token from the source code.
///
/// The `'ast` lifetime refers to the arena holding the token text. String
/// literals are stored unescaped, backtick names without their quotes.
#[derive(Clone, Copy)]
pub struct Token<'ast> {
    pub kind: TokenKind,
    pub text: &'ast str,
    pub span: Span,
}

impl<'ast> Token<'ast> {
    #[inline]
    pub fn new(kind: TokenKind, text: &'ast str, span: Span) -> Self {
        Self { kind, text, span }
    }

    /// Whether this is the symbol `s` (operators, `:`, `->` ...).
    #[inline]
    pub fn is_symbol(&self, s: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == s
    }

    #[inline]
    pub fn is_keyword(&self, s: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == s
    }

    #[inline]
    pub fn is_modifier(&self) -> bool {
        self.kind == TokenKind::Modifier
    }

    /// Names, and keywords or modifiers used in name position.
    #[inline]
    pub fn is_name(&self) -> bool {
        self.kind == TokenKind::Name
    }
}

/// Token equality ignores the span: two scans of the same program in
/// different layouts produce equal tokens.
impl PartialEq for Token<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.text == other.text
    }
}

impl Eq for Token<'_> {}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.text, self.span)
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Str => write!(f, "{:?}", self.text),
            _ => f.write_str(self.text),
        }
    }
}

/// Bracket pairs. `{ }` delimits blocks, the other two enclose nested layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    Paren,
    Bracket,
    Brace,
}

impl Delimiter {
    pub fn open(self) -> char {
        match self {
            Delimiter::Paren => '(',
            Delimiter::Bracket => '[',
            Delimiter::Brace => '{',
        }
    }

    pub fn close(self) -> char {
        match self {
            Delimiter::Paren => ')',
            Delimiter::Bracket => ']',
            Delimiter::Brace => '}',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier or backtick-quoted name.
    Name,
    Keyword,
    Modifier,
    /// `true`, `false`, `yes`, `no`
    Bool,
    /// Numeric literal, kept as written.
    Number,
    /// String literal, unescaped.
    Str,
    /// Operators and punctuation other than separators.
    Symbol,
    /// `,` or `;`
    Separator,
    Open(Delimiter),
    Close(Delimiter),
}

/// Keywords, including the Java ones Latte reserves.
pub const KEYWORDS: &[&str] = &[
    "is", "not", "type", "as", "in", "elseif", "package", "import", "break", "continue",
    "return", "fun", "require", "new", "object", "match", "case", "class", "interface", "if",
    "else", "while", "for", "do", "try", "catch", "finally", "throw", "null", "this", "super",
    "static", "annotation", "extends", "implements", "instanceof",
];

pub const MODIFIERS: &[&str] = &[
    "public", "protected", "private", "internal", "abstract", "val", "native", "synchronized",
    "transient", "volatile", "strictfp", "data", "var", "def", "nonnull", "nonempty", "implicit",
    "final",
];

pub const BOOLEANS: &[&str] = &["true", "false", "yes", "no"];

/// Multi- and single-character symbols, longest first so that the first
/// prefix match is the longest one.
pub const SYMBOLS: &[&str] = &[
    ">>>=", ":::", "...", "!==", "===", ">>>", "<<=", ">>=", "::", "->", "=>", ":=", "<-", "^^",
    "&&", "||", "!=", "==", "<=", ">=", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=",
    "^=", "<<", ">>", ".", ":", "=", "!", "<", ">", "+", "-", "*", "/", "%", "@", "#", "&", "^",
    "|", "~", "?",
];

/// Classify a scanned word.
pub fn classify_word(word: &str) -> TokenKind {
    if BOOLEANS.contains(&word) {
        TokenKind::Bool
    } else if MODIFIERS.contains(&word) {
        TokenKind::Modifier
    } else if KEYWORDS.contains(&word) {
        TokenKind::Keyword
    } else {
        TokenKind::Name
    }
}

/// The longest symbol the input starts with.
pub fn match_symbol(input: &str) -> Option<&'static str> {
    SYMBOLS.iter().copied().find(|s| input.starts_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_longest_first() {
        for (i, a) in SYMBOLS.iter().enumerate() {
            for b in &SYMBOLS[i + 1..] {
                assert!(
                    !(b.starts_with(a) && b.len() > a.len()),
                    "{b} must come before {a}"
                );
            }
        }
    }

    #[test]
    fn longest_match_wins() {
        assert_eq!(match_symbol("::X"), Some("::"));
        assert_eq!(match_symbol(":::"), Some(":::"));
        assert_eq!(match_symbol(">>>= 1"), Some(">>>="));
        assert_eq!(match_symbol("->x"), Some("->"));
        assert_eq!(match_symbol("$"), None);
    }

    #[test]
    fn word_classes() {
        assert_eq!(classify_word("elseif"), TokenKind::Keyword);
        assert_eq!(classify_word("synchronized"), TokenKind::Modifier);
        assert_eq!(classify_word("yes"), TokenKind::Bool);
        assert_eq!(classify_word("Thread"), TokenKind::Name);
    }

    #[test]
    fn equality_ignores_span() {
        let a = Token::new(TokenKind::Name, "x", Span::new(1, 1, 1));
        let b = Token::new(TokenKind::Name, "x", Span::new(9, 4, 1));
        assert_eq!(a, b);
    }
}
