//! Expression parser.
//!
//! A Pratt parser over the lexer's token stream. Member and index access
//! bind tightest, then unary operators, then the infix ladder
//! (multiplicative, additive, comparisons, equality, `&&`, `||`), with the
//! ternary at the top.
//!
//! Call syntax never reaches the grammar: a `(` in call position is
//! rejected by a token-level scan before parsing, with a diagnostic that
//! names the real problem instead of a generic "unexpected token".

use chumsky::{input::ValueInput, pratt::*, prelude::*};

use super::ast::{BinaryOp, CompareOp, Expr, Literal, Span, Spanned, UnaryOp};
use super::lexer::{lexer, Token};
use crate::error::Error;

/// A parsing error over the token stream.
pub type ParseError<'src> = Rich<'src, Token<'src>, Span>;

enum Accessor {
    Member(String),
    Index(Spanned<Expr>),
}

fn parser<'src, I>() -> impl Parser<'src, I, Spanned<Expr>, extra::Err<ParseError<'src>>>
where
    I: ValueInput<'src, Token = Token<'src>, Span = Span>,
{
    recursive(|expression| {
        let literal = select! {
            Token::Number(n) => Literal::Number(n),
            Token::Str(s) => Literal::Str(s.to_string()),
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Null => Literal::Null,
        };

        let identifier = select! { Token::Identifier(name) => name };

        let atom = choice((
            literal.map(Expr::Literal),
            identifier.map(|name: &str| Expr::Identifier(name.to_string())),
        ))
        .map_with(|node, extra| Spanned {
            node,
            span: extra.span(),
        })
        .or(expression
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)));

        let accessor = choice((
            just(Token::Dot)
                .ignore_then(identifier)
                .map(|name: &str| Accessor::Member(name.to_string())),
            expression
                .clone()
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
                .map(Accessor::Index),
        ))
        .map_with(|accessor, extra| (accessor, extra.span()));

        let member = atom
            .then(accessor.repeated().collect::<Vec<_>>())
            .map(|(base, accessors)| {
                accessors.into_iter().fold(base, |object, (accessor, span): (Accessor, Span)| {
                    let span: Span = (object.span.start..span.end).into();
                    let node = match accessor {
                        Accessor::Member(property) => Expr::Member {
                            object: Box::new(object),
                            property,
                        },
                        Accessor::Index(index) => Expr::Index {
                            object: Box::new(object),
                            index: Box::new(index),
                        },
                    };
                    Spanned { node, span }
                })
            });

        let unary = choice((
            just(Token::Bang).to(UnaryOp::Not),
            just(Token::Minus).to(UnaryOp::Neg),
        ))
        .map_with(|op, extra| (op, extra.span()))
        .repeated()
        .collect::<Vec<_>>()
        .then(member)
        .map(|(ops, operand)| {
            ops.into_iter().rev().fold(operand, |operand, (op, span): (UnaryOp, Span)| {
                let span: Span = (span.start..operand.span.end).into();
                Spanned {
                    node: Expr::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                }
            })
        });

        let operators = unary.pratt((
            // Precedence 1 (loosest): ||
            infix(left(1), just(Token::OrOr), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expr::Binary {
                    op: BinaryOp::Or,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                },
            }),
            // Precedence 2: &&
            infix(left(2), just(Token::AndAnd), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expr::Binary {
                    op: BinaryOp::And,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                },
            }),
            // Precedence 3: equality
            infix(left(3), just(Token::EqEq), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expr::Comparison {
                    op: CompareOp::Eq,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                },
            }),
            infix(left(3), just(Token::NotEq), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expr::Comparison {
                    op: CompareOp::NotEq,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                },
            }),
            // Precedence 4: ordering
            infix(left(4), just(Token::Less), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expr::Comparison {
                    op: CompareOp::Less,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                },
            }),
            infix(left(4), just(Token::LessEq), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expr::Comparison {
                    op: CompareOp::LessEq,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                },
            }),
            infix(left(4), just(Token::Greater), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expr::Comparison {
                    op: CompareOp::Greater,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                },
            }),
            infix(left(4), just(Token::GreaterEq), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expr::Comparison {
                    op: CompareOp::GreaterEq,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                },
            }),
            // Precedence 5: additive
            infix(left(5), just(Token::Plus), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expr::Binary {
                    op: BinaryOp::Add,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                },
            }),
            infix(left(5), just(Token::Minus), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expr::Binary {
                    op: BinaryOp::Sub,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                },
            }),
            // Precedence 6 (tightest): multiplicative
            infix(left(6), just(Token::Star), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                },
            }),
            infix(left(6), just(Token::Slash), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expr::Binary {
                    op: BinaryOp::Div,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                },
            }),
        ));

        // Ternary sits above everything; the else branch recurses, so
        // `a ? b : c ? d : e` associates to the right.
        operators
            .then(
                just(Token::Question)
                    .ignore_then(expression.clone())
                    .then_ignore(just(Token::Colon))
                    .then(expression)
                    .or_not(),
            )
            .map_with(|(condition, branches), extra| match branches {
                None => condition,
                Some((then_branch, else_branch)) => Spanned {
                    span: extra.span(),
                    node: Expr::Ternary {
                        condition: Box::new(condition),
                        then_branch: Box::new(then_branch),
                        else_branch: Box::new(else_branch),
                    },
                },
            })
    })
}

/// Parse binding-expression source into an AST.
///
/// # Errors
///
/// [`Error::Syntax`] for anything outside the grammar, carrying the byte
/// span of the offending token. Call syntax gets a dedicated diagnostic.
pub fn parse(source: &str) -> Result<Spanned<Expr>, Error> {
    let tokens = lexer()
        .parse(source)
        .into_result()
        .map_err(rich_to_error)?;

    reject_call_syntax(&tokens)?;

    let input = tokens.map(Span::splat(source.len()), |Spanned { node, span }| {
        (node, span)
    });

    let result = parser()
        .then_ignore(end())
        .parse(input)
        .into_result()
        .map_err(rich_to_error);
    result
}

/// A `(` directly after something that can end an expression is a call.
/// The grammar has no calls; say so instead of "unexpected token".
fn reject_call_syntax(tokens: &[Spanned<Token<'_>>]) -> Result<(), Error> {
    let mut previous: Option<&Token<'_>> = None;
    for spanned in tokens {
        if spanned.node == Token::ParenOpen {
            if let Some(prev) = previous {
                let ends_expression = matches!(
                    prev,
                    Token::Identifier(_)
                        | Token::Str(_)
                        | Token::Number(_)
                        | Token::True
                        | Token::False
                        | Token::Null
                        | Token::BracketClose
                        | Token::ParenClose
                );
                if ends_expression {
                    return Err(Error::syntax(
                        spanned.span,
                        "call syntax is not part of the binding grammar",
                    ));
                }
            }
        }
        previous = Some(&spanned.node);
    }
    Ok(())
}

fn rich_to_error<T: std::fmt::Display>(errors: Vec<Rich<'_, T, Span>>) -> Error {
    match errors.into_iter().next() {
        Some(error) => {
            let span = error.span();
            Error::Syntax {
                start: span.start,
                end: span.end,
                message: error.to_string(),
            }
        }
        None => Error::Syntax {
            start: 0,
            end: 0,
            message: "malformed expression".into(),
        },
    }
}
