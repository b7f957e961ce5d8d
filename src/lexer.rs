//! Indentation-sensitive lexer.
//!
//! Source text is scanned line by line. Blank lines and `//`-comment lines never affect the
//! indent stack. Each remaining line's leading whitespace is measured (space = 1, tab = 4) and
//! compared against the stack top to emit `INDENT`/`DEDENT` markers, then its lexemes are
//! scanned left to right using an ordered, first-match pattern set — the same precedence the
//! originating implementation bakes into its pattern list order (`<-` before `<`, `...` before
//! `.`, `REAL` before `INTEGER`, and so on).

use nom::branch::alt;
use nom::bytes::complete::{escaped, is_not, tag, take_while1};
use nom::character::complete::{char as nom_char, digit1, one_of};
use nom::combinator::recognize;
use nom::sequence::{preceded, terminated};
use nom::{IResult, Parser};

use crate::error::LexError;
use crate::token::{keyword_for, Token, TokenKind};

pub struct Lexer;

impl Lexer {
    pub fn new() -> Self {
        Lexer
    }

    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, LexError> {
        let lines: Vec<&str> = source.split('\n').collect();
        let mut tokens = Vec::new();
        let mut indent_stack = vec![0usize];

        for (idx, line) in lines.iter().enumerate() {
            let line_num = idx + 1;

            if line.trim().is_empty() {
                continue;
            }

            let indent = count_indent(line);
            let stripped = line.trim_start();

            if stripped.starts_with("//") {
                continue;
            }

            let top = *indent_stack.last().unwrap();
            if indent > top {
                tokens.push(Token::new(TokenKind::Indent, "<INDENT>", line_num, indent));
                indent_stack.push(indent);
            } else if indent < top {
                while *indent_stack.last().unwrap() > indent {
                    tokens.push(Token::new(TokenKind::Dedent, "<DEDENT>", line_num, indent));
                    indent_stack.pop();
                }
                if *indent_stack.last().unwrap() != indent {
                    return Err(LexError::indentation(line_num));
                }
            }

            if tokens
                .last()
                .map(|t: &Token| t.kind != TokenKind::Newline)
                .unwrap_or(false)
            {
                tokens.push(Token::new(TokenKind::Newline, "\\n", line_num, 0));
            }

            scan_line(line, line_num, &mut tokens)?;
        }

        if tokens
            .last()
            .map(|t| t.kind != TokenKind::Newline)
            .unwrap_or(false)
        {
            tokens.push(Token::new(TokenKind::Newline, "\\n", lines.len(), 0));
        }

        while indent_stack.len() > 1 {
            tokens.push(Token::new(TokenKind::Dedent, "<DEDENT>", lines.len(), 0));
            indent_stack.pop();
        }

        tokens.push(Token::new(TokenKind::Eof, "<EOF>", lines.len(), 0));

        Ok(tokens)
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

fn count_indent(line: &str) -> usize {
    let mut indent = 0;
    for ch in line.chars() {
        match ch {
            ' ' => indent += 1,
            '\t' => indent += 4,
            _ => break,
        }
    }
    indent
}

fn scan_line(line: &str, line_num: usize, tokens: &mut Vec<Token>) -> Result<(), LexError> {
    let bytes: Vec<char> = line.chars().collect();
    let mut col = 0usize;

    while col < bytes.len() {
        let ch = bytes[col];
        if ch == ' ' || ch == '\t' {
            col += 1;
            continue;
        }

        let rest: String = bytes[col..].iter().collect();

        if rest.starts_with("//") {
            break;
        }

        match lex_token(&rest) {
            Some((name, consumed, kind)) => {
                tokens.push(Token::new(kind, name, line_num, col));
                col += consumed;
            }
            None => return Err(LexError::unexpected(ch, line_num, col)),
        }
    }

    Ok(())
}

/// Attempts every lexeme pattern in priority order and returns the lexeme text, the number of
/// *characters* consumed, and the resulting token kind. `None` means no pattern matched at all.
fn lex_token(input: &str) -> Option<(String, usize, TokenKind)> {
    if let Ok((rem, matched)) = real_literal(input) {
        return Some(finish(input, rem, TokenKind::Real(matched.parse().unwrap())));
    }
    if let Ok((rem, matched)) = integer_literal(input) {
        return Some(finish(input, rem, TokenKind::Integer(matched.parse().unwrap())));
    }
    if let Ok((rem, matched)) = string_literal(input) {
        let inner = &matched[1..matched.len() - 1];
        return Some(finish(input, rem, TokenKind::StringLit(unescape(inner))));
    }
    if let Ok((rem, matched)) = char_literal(input) {
        let inner = &matched[1..matched.len() - 1];
        let unescaped = unescape(inner);
        let c = unescaped.chars().next().unwrap_or(' ');
        return Some(finish(input, rem, TokenKind::CharLit(c)));
    }

    for (tag_str, kind) in OPERATORS {
        if let Ok((rem, _)) = tag::<_, _, nom::error::Error<&str>>(*tag_str)(input) {
            return Some(finish(input, rem, kind.clone()));
        }
    }

    if let Ok((rem, matched)) = identifier(input) {
        let upper = matched.to_uppercase();
        let kind = keyword_for(&upper).unwrap_or_else(|| TokenKind::Name(matched.to_string()));
        return Some(finish(input, rem, kind));
    }

    None
}

/// Multi-character operators must be tried before the single-character prefixes they extend.
const OPERATORS: &[(&str, TokenKind)] = &[
    ("<-", TokenKind::Arrow),
    ("<=", TokenKind::Le),
    (">=", TokenKind::Ge),
    ("<>", TokenKind::Ne),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("=", TokenKind::Eq),
    ("...", TokenKind::Range),
    (".", TokenKind::Dot),
    (":", TokenKind::Colon),
    (",", TokenKind::Comma),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Multiply),
    ("/", TokenKind::Divide),
    ("^", TokenKind::Power),
    ("&", TokenKind::Ampersand),
];

fn finish(input: &str, remainder: &str, kind: TokenKind) -> (String, usize, TokenKind) {
    let consumed_bytes = input.len() - remainder.len();
    let lexeme = input[..consumed_bytes].to_string();
    (lexeme.clone(), lexeme.chars().count(), kind)
}

fn real_literal(input: &str) -> IResult<&str, &str> {
    recognize(terminated(digit1, preceded(nom_char('.'), digit1))).parse(input)
}

fn integer_literal(input: &str) -> IResult<&str, &str> {
    digit1(input)
}

fn string_literal(input: &str) -> IResult<&str, &str> {
    recognize(preceded(
        nom_char('"'),
        terminated(
            alt((escaped(is_not("\"\\"), '\\', one_of("\"\\ntr")), tag(""))),
            nom_char('"'),
        ),
    ))
    .parse(input)
}

fn char_literal(input: &str) -> IResult<&str, &str> {
    recognize(preceded(
        nom_char('\''),
        terminated(
            alt((escaped(is_not("'\\"), '\\', one_of("'\\ntr")), tag(""))),
            nom_char('\''),
        ),
    ))
    .parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    let (rem, first) = take_while1(|c: char| c.is_ascii_alphabetic())(input)?;
    let (rem2, restpart) = nom::bytes::complete::take_while(|c: char| c.is_ascii_alphanumeric() || c == '_')(rem)?;
    let total_len = first.len() + restpart.len();
    Ok((rem2, &input[..total_len]))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('"') => out.push('"'),
                Some('\'') => out.push('\''),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new()
            .tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn simple_declare_and_assign() {
        let k = kinds("DECLARE x : INTEGER\nx <- 5\n");
        assert_eq!(
            k,
            vec![
                TokenKind::Declare,
                TokenKind::Name("x".into()),
                TokenKind::Colon,
                TokenKind::Integer_,
                TokenKind::Newline,
                TokenKind::Name("x".into()),
                TokenKind::Arrow,
                TokenKind::Integer(5),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn indent_dedent_balanced() {
        let src = "IF x = 1\n    OUTPUT x\nENDIF\n";
        let toks = Lexer::new().tokenize(src).unwrap();
        let indents = toks.iter().filter(|t| t.kind == TokenKind::Indent).count();
        let dedents = toks.iter().filter(|t| t.kind == TokenKind::Dedent).count();
        assert_eq!(indents, dedents);
        assert_eq!(indents, 1);
    }

    #[test]
    fn blank_and_comment_lines_are_indent_neutral() {
        let src = "DECLARE x : INTEGER\n\n// a comment\nx <- 1\n";
        let toks = Lexer::new().tokenize(src).unwrap();
        assert!(toks.iter().all(|t| t.kind != TokenKind::Indent));
    }

    #[test]
    fn range_before_dot() {
        let k = kinds("1...5\n");
        assert_eq!(
            k,
            vec![
                TokenKind::Integer(1),
                TokenKind::Range,
                TokenKind::Integer(5),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn arrow_before_lt() {
        let k = kinds("x <- 1\n");
        assert!(k.contains(&TokenKind::Arrow));
        assert!(!k.contains(&TokenKind::Lt));
    }

    #[test]
    fn real_before_integer() {
        let k = kinds("3.14\n");
        assert_eq!(k[0], TokenKind::Real(3.14));
    }

    #[test]
    fn string_with_escape() {
        let k = kinds("\"a\\\"b\"\n");
        assert_eq!(k[0], TokenKind::StringLit("a\"b".to_string()));
    }

    #[test]
    fn keyword_case_insensitive() {
        let k = kinds("declare X : integer\n");
        assert_eq!(k[0], TokenKind::Declare);
        assert_eq!(k[3], TokenKind::Integer_);
    }

    #[test]
    fn unmatched_char_is_lex_error() {
        let err = Lexer::new().tokenize("x <- 1 @ 2\n").unwrap_err();
        assert!(matches!(err, LexError::Unexpected { ch: '@', .. }));
    }

    #[test]
    fn dedent_mismatch_is_indentation_error() {
        let src = "IF x = 1\n    OUTPUT x\n  OUTPUT y\n";
        let err = Lexer::new().tokenize(src).unwrap_err();
        assert!(matches!(err, LexError::Indentation { .. }));
    }
}
