//! Expression lexer.
//!
//! Turns binding-expression source into spanned tokens. The token set is
//! the whole surface of the grammar: anything that does not lex here (`=`,
//! `{`, `;`, backticks) fails before the parser ever sees it.

use chumsky::prelude::*;
use std::fmt;

use super::ast::{Span, Spanned};

/// A lexing error, positioned in the expression source.
pub type LexError<'src> = Rich<'src, char, Span>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'src> {
    Number(f64),
    /// A quoted string; either quote style, no escapes.
    Str(&'src str),
    Identifier(&'src str),
    True,
    False,
    Null,
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    EqEq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    AndAnd,
    OrOr,
    Question,
    Colon,
    Dot,
    BracketOpen,
    BracketClose,
    ParenOpen,
    ParenClose,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Identifier(name) => f.write_str(name),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::Null => f.write_str("null"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Bang => f.write_str("!"),
            Token::EqEq => f.write_str("=="),
            Token::NotEq => f.write_str("!="),
            Token::Less => f.write_str("<"),
            Token::LessEq => f.write_str("<="),
            Token::Greater => f.write_str(">"),
            Token::GreaterEq => f.write_str(">="),
            Token::AndAnd => f.write_str("&&"),
            Token::OrOr => f.write_str("||"),
            Token::Question => f.write_str("?"),
            Token::Colon => f.write_str(":"),
            Token::Dot => f.write_str("."),
            Token::BracketOpen => f.write_str("["),
            Token::BracketClose => f.write_str("]"),
            Token::ParenOpen => f.write_str("("),
            Token::ParenClose => f.write_str(")"),
        }
    }
}

pub fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<Spanned<Token<'src>>>, extra::Err<LexError<'src>>> {
    let number = text::int(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .from_str()
        .unwrapped()
        .map(Token::Number);

    let single_quoted = just('\'')
        .ignore_then(none_of('\'').repeated().to_slice())
        .then_ignore(just('\''))
        .map(Token::Str);

    let double_quoted = just('"')
        .ignore_then(none_of('"').repeated().to_slice())
        .then_ignore(just('"'))
        .map(Token::Str);

    // `!=` must win over `!`, `<=` over `<`: longest first.
    let comparator = choice((
        just("==").to(Token::EqEq),
        just("!=").to(Token::NotEq),
        just("<=").to(Token::LessEq),
        just(">=").to(Token::GreaterEq),
        just('<').to(Token::Less),
        just('>').to(Token::Greater),
    ));

    let logical = choice((
        just("&&").to(Token::AndAnd),
        just("||").to(Token::OrOr),
        just('!').to(Token::Bang),
    ));

    let arithmetic = choice((
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
    ));

    let punctuation = choice((
        just('?').to(Token::Question),
        just(':').to(Token::Colon),
        just('.').to(Token::Dot),
        just('[').to(Token::BracketOpen),
        just(']').to(Token::BracketClose),
        just('(').to(Token::ParenOpen),
        just(')').to(Token::ParenClose),
    ));

    let word = any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_' || *c == '$')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
                .repeated(),
        )
        .to_slice()
        .map(|ident: &str| match ident {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            ident => Token::Identifier(ident),
        });

    let token = choice((
        number,
        single_quoted,
        double_quoted,
        comparator,
        logical,
        arithmetic,
        punctuation,
        word,
    ));

    token
        .map_with(|token, extra| Spanned {
            node: token,
            span: extra.span(),
        })
        .padded()
        .repeated()
        .collect()
        .then_ignore(end())
}
