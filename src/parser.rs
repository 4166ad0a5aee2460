//! The expression parser.
//!
//! A top-down operator-precedence parser. Every token has a left binding
//! power ([`Token::lbp`]); `expression(rbp)` consumes prefix forms through
//! `nud` and keeps extending the left operand through `led` while the next
//! token binds tighter than `rbp`.
//!
//! Projections are the subtle part: `[*]`, `.*`, `[?…]`, `[a:b:c]` and
//! `[]` each produce a projection node whose right child absorbs the rest
//! of the expression, but only as long as the next token binds at least as
//! tightly as [`PROJECTION_STOP`]. A pipe binds weaker and therefore ends
//! the projection body.

use std::sync::Arc;

use crate::ast::{Ast, Comparator, Slice};
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};

/// Tokens binding weaker than this end a projection body.
const PROJECTION_STOP: usize = 10;

/// Parse an expression into an AST.
pub(crate) fn parse(input: &str) -> Result<Ast> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser { tokens, index: 0 };
    let ast = parser.expression(0)?;
    let (pos, token) = parser.peek(0);
    if *token != Token::Eof {
        return Err(Error::syntax(*pos, format!("unexpected trailing {token}")));
    }
    Ok(ast)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    index: usize,
}

enum Bracket {
    Index(i64),
    Slice(Slice),
}

impl Parser {
    /// The token `offset` positions ahead. The token stream always ends
    /// with `Eof`, which is returned once the stream is exhausted.
    fn peek(&self, offset: usize) -> &(usize, Token) {
        self.tokens
            .get(self.index + offset)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with eof"))
    }

    fn advance(&mut self) -> (usize, Token) {
        let entry = self.peek(0).clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        entry
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        let (pos, token) = self.advance();
        if token == *expected {
            Ok(())
        } else {
            Err(Error::syntax(pos, format!("expected {expected}, found {token}")))
        }
    }

    fn expression(&mut self, rbp: usize) -> Result<Ast> {
        let (pos, token) = self.advance();
        let mut left = self.nud(pos, token)?;
        while rbp < self.peek(0).1.lbp() {
            let (pos, token) = self.advance();
            left = self.led(left, pos, token)?;
        }
        Ok(left)
    }

    /// Prefix (null denotation) forms.
    fn nud(&mut self, pos: usize, token: Token) -> Result<Ast> {
        match token {
            Token::Identifier(name) => {
                if self.peek(0).1 == Token::Lparen {
                    self.advance();
                    let args = self.function_args()?;
                    Ok(Ast::Function { name, args })
                } else {
                    Ok(Ast::Field { name })
                }
            }
            Token::QuotedIdentifier(name) => {
                if self.peek(0).1 == Token::Lparen {
                    return Err(Error::syntax(
                        pos,
                        "quoted identifiers cannot be used as function names",
                    ));
                }
                Ok(Ast::Field { name })
            }
            Token::RawString(s) => Ok(Ast::Literal {
                value: crate::value::Value::String(s),
            }),
            Token::Literal(value) => Ok(Ast::Literal { value }),
            Token::At => Ok(Ast::Identity),
            Token::Dollar => Ok(Ast::Root),
            Token::Star => {
                let rhs = self.projection_rhs(Token::Star.lbp())?;
                Ok(Ast::object_projection(Ast::Identity, rhs))
            }
            Token::Filter => self.filter_projection(Ast::Identity),
            Token::Flatten => {
                let lhs = Ast::Flatten {
                    expr: Box::new(Ast::Identity),
                };
                let rhs = self.projection_rhs(Token::Flatten.lbp())?;
                Ok(Ast::projection(lhs, rhs))
            }
            Token::Not => {
                let expr = self.expression(Token::Not.lbp())?;
                Ok(Ast::Not {
                    expr: Box::new(expr),
                })
            }
            Token::Lbracket => match self.peek(0).1.clone() {
                Token::Number(_) | Token::Colon => match self.bracket_contents()? {
                    Bracket::Index(index) => Ok(Ast::Index { index }),
                    Bracket::Slice(slice) => {
                        let rhs = self.projection_rhs(Token::Star.lbp())?;
                        Ok(Ast::SliceProjection {
                            lhs: Box::new(Ast::Identity),
                            slice,
                            rhs: Box::new(rhs),
                        })
                    }
                },
                Token::Star if self.peek(1).1 == Token::Rbracket => {
                    self.advance();
                    self.advance();
                    let rhs = self.projection_rhs(Token::Star.lbp())?;
                    Ok(Ast::projection(Ast::Identity, rhs))
                }
                _ => self.multi_select_list(),
            },
            Token::Lbrace => self.multi_select_hash(),
            Token::Lparen => {
                let expr = self.expression(0)?;
                self.expect(&Token::Rparen)?;
                Ok(expr)
            }
            Token::Ampersand => {
                let expr = self.expression(0)?;
                Ok(Ast::Expref {
                    expr: Arc::new(expr),
                })
            }
            Token::Eof => Err(Error::syntax(pos, "unexpected end of expression")),
            other => Err(Error::syntax(pos, format!("unexpected {other}"))),
        }
    }

    /// Infix (left denotation) forms.
    fn led(&mut self, left: Ast, pos: usize, token: Token) -> Result<Ast> {
        match token {
            Token::Dot => {
                if self.peek(0).1 == Token::Star {
                    self.advance();
                    let rhs = self.projection_rhs(Token::Star.lbp())?;
                    Ok(Ast::object_projection(left, rhs))
                } else {
                    let rhs = self.dot_rhs(Token::Dot.lbp())?;
                    Ok(Ast::subexpression(left, rhs))
                }
            }
            Token::Pipe => {
                let rhs = self.expression(Token::Pipe.lbp())?;
                Ok(Ast::Pipe {
                    lhs: Box::new(left),
                    rhs: Box::new(rhs),
                })
            }
            Token::Or => {
                let rhs = self.expression(Token::Or.lbp())?;
                Ok(Ast::Or {
                    lhs: Box::new(left),
                    rhs: Box::new(rhs),
                })
            }
            Token::And => {
                let rhs = self.expression(Token::And.lbp())?;
                Ok(Ast::And {
                    lhs: Box::new(left),
                    rhs: Box::new(rhs),
                })
            }
            Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge => {
                let op = match token {
                    Token::Eq => Comparator::Eq,
                    Token::Ne => Comparator::Ne,
                    Token::Lt => Comparator::Lt,
                    Token::Le => Comparator::Le,
                    Token::Gt => Comparator::Gt,
                    _ => Comparator::Ge,
                };
                let rhs = self.expression(token.lbp())?;
                Ok(Ast::Comparison {
                    op,
                    lhs: Box::new(left),
                    rhs: Box::new(rhs),
                })
            }
            Token::Flatten => {
                let lhs = Ast::Flatten {
                    expr: Box::new(left),
                };
                let rhs = self.projection_rhs(Token::Flatten.lbp())?;
                Ok(Ast::projection(lhs, rhs))
            }
            Token::Filter => self.filter_projection(left),
            Token::Lbracket => match self.peek(0).1.clone() {
                Token::Number(_) | Token::Colon => match self.bracket_contents()? {
                    Bracket::Index(index) => Ok(Ast::subexpression(left, Ast::Index { index })),
                    Bracket::Slice(slice) => {
                        let rhs = self.projection_rhs(Token::Star.lbp())?;
                        Ok(Ast::SliceProjection {
                            lhs: Box::new(left),
                            slice,
                            rhs: Box::new(rhs),
                        })
                    }
                },
                Token::Star if self.peek(1).1 == Token::Rbracket => {
                    self.advance();
                    self.advance();
                    let rhs = self.projection_rhs(Token::Star.lbp())?;
                    Ok(Ast::projection(left, rhs))
                }
                other => Err(Error::syntax(
                    self.peek(0).0,
                    format!("expected number, ':' or '*' in brackets, found {other}"),
                )),
            },
            Token::Lparen => Err(Error::syntax(pos, "invalid function call")),
            other => Err(Error::syntax(pos, format!("unexpected {other}"))),
        }
    }

    /// `[?predicate]rhs` with an already-parsed left side.
    fn filter_projection(&mut self, lhs: Ast) -> Result<Ast> {
        let predicate = self.expression(0)?;
        self.expect(&Token::Rbracket)?;
        let rhs = self.projection_rhs(Token::Filter.lbp())?;
        Ok(Ast::FilterProjection {
            lhs: Box::new(lhs),
            predicate: Box::new(predicate),
            rhs: Box::new(rhs),
        })
    }

    /// The contents of `[…]` when it starts with a number or a colon:
    /// either a plain index or a slice triple. The opening bracket has
    /// already been consumed; this consumes through the closing bracket.
    fn bracket_contents(&mut self) -> Result<Bracket> {
        let mut parts: [Option<i64>; 3] = [None; 3];
        let mut colons = 0;
        loop {
            let (pos, token) = self.advance();
            match token {
                Token::Rbracket => break,
                Token::Colon => {
                    colons += 1;
                    if colons > 2 {
                        return Err(Error::syntax(pos, "too many colons in slice"));
                    }
                }
                Token::Number(n) => {
                    if parts[colons].is_some() {
                        return Err(Error::syntax(pos, "unexpected number in slice"));
                    }
                    parts[colons] = Some(n);
                }
                other => {
                    return Err(Error::syntax(
                        pos,
                        format!("expected number, ':' or ']', found {other}"),
                    ));
                }
            }
        }
        if colons == 0 {
            let pos = self.peek(0).0;
            let index = parts[0]
                .ok_or_else(|| Error::syntax(pos, "expected number in brackets"))?;
            Ok(Bracket::Index(index))
        } else {
            Ok(Bracket::Slice(Slice {
                start: parts[0],
                stop: parts[1],
                step: parts[2],
            }))
        }
    }

    /// The expression absorbed by a projection. Stops before any token
    /// binding weaker than [`PROJECTION_STOP`].
    fn projection_rhs(&mut self, rbp: usize) -> Result<Ast> {
        let (pos, token) = self.peek(0).clone();
        if token.lbp() < PROJECTION_STOP {
            return Ok(Ast::Identity);
        }
        match token {
            Token::Lbracket | Token::Filter => self.expression(rbp),
            Token::Dot => {
                self.advance();
                self.dot_rhs(rbp)
            }
            other => Err(Error::syntax(
                pos,
                format!("unexpected {other} after projection"),
            )),
        }
    }

    /// The right-hand side of a `.`: an identifier, `*`, a multi-select
    /// list or a multi-select hash.
    fn dot_rhs(&mut self, rbp: usize) -> Result<Ast> {
        let (pos, token) = self.peek(0).clone();
        match token {
            Token::Identifier(_) | Token::QuotedIdentifier(_) | Token::Star => {
                self.expression(rbp)
            }
            Token::Lbracket => {
                self.advance();
                self.multi_select_list()
            }
            Token::Lbrace => {
                self.advance();
                self.multi_select_hash()
            }
            other => Err(Error::syntax(
                pos,
                format!("expected identifier, '*', '[' or '{{' after '.', found {other}"),
            )),
        }
    }

    /// `[a, b, …]` with the opening bracket already consumed.
    fn multi_select_list(&mut self) -> Result<Ast> {
        let mut elements = vec![self.expression(0)?];
        while self.peek(0).1 == Token::Comma {
            self.advance();
            elements.push(self.expression(0)?);
        }
        self.expect(&Token::Rbracket)?;
        Ok(Ast::MultiSelectList { elements })
    }

    /// `{k: v, …}` with the opening brace already consumed.
    fn multi_select_hash(&mut self) -> Result<Ast> {
        let mut entries = Vec::new();
        loop {
            let (pos, token) = self.advance();
            let key = match token {
                Token::Identifier(name) | Token::QuotedIdentifier(name) => name,
                other => {
                    return Err(Error::syntax(pos, format!("expected key name, found {other}")));
                }
            };
            self.expect(&Token::Colon)?;
            let value = self.expression(0)?;
            entries.push((key, value));
            let (pos, token) = self.advance();
            match token {
                Token::Comma => continue,
                Token::Rbrace => break,
                other => {
                    return Err(Error::syntax(pos, format!("expected ',' or '}}', found {other}")));
                }
            }
        }
        Ok(Ast::MultiSelectHash { entries })
    }

    /// Function arguments with the opening paren already consumed.
    fn function_args(&mut self) -> Result<Vec<Ast>> {
        let mut args = Vec::new();
        if self.peek(0).1 != Token::Rparen {
            args.push(self.expression(0)?);
            while self.peek(0).1 == Token::Comma {
                self.advance();
                args.push(self.expression(0)?);
            }
        }
        self.expect(&Token::Rparen)?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::parse;

    #[track_caller]
    fn test1(input: &str, display: &str) {
        let ast = parse(input).unwrap();
        assert_eq!(ast.to_string(), display);
    }

    #[track_caller]
    fn test_err(input: &str, column: usize) {
        let err = parse(input).unwrap_err();
        assert_eq!(err.column(), Some(column), "{err}");
    }

    #[test]
    fn fields_and_indices() {
        test1("foo", "foo");
        test1("foo.bar", "foo.bar");
        test1("foo.bar.baz", "foo.bar.baz");
        test1(r#""foo bar""#, "foo bar");
        test1("foo[0]", "foo.[0]");
        test1("[1]", "[1]");
        test1("foo[-1].bar", "foo.[-1].bar");
    }

    #[test]
    fn projections_absorb_until_pipe() {
        test1("foo[*]", "foo[*].@");
        test1("foo[*].bar", "foo[*].bar");
        test1("foo[*].bar.baz", "foo[*].bar.baz");
        test1("foo[*].bar | [0]", "(foo[*].bar | [0])");
        test1("foo.*.bar", "foo.*.bar");
        test1("*.bar", "@.*.bar");
        test1("foo[]", "foo[][*].@");
        test1("foo[].bar", "foo[][*].bar");
    }

    #[test]
    fn slices() {
        test1("foo[0:5]", "foo[0:5:].@");
        test1("foo[::2]", "foo[::2].@");
        test1("foo[::-1].bar", "foo[::-1].bar");
        test1("[:3]", "@[:3:].@");
        test_err("foo[0:1:2:3]", 9);
        test_err("foo[]]", 5);
    }

    #[test]
    fn filters_and_comparisons() {
        test1("foo[?a > b]", "foo[?(a > b)].@");
        test1("foo[?a == `1`].b", "foo[?(a == `1`)].b");
        test1("foo[?a] | [0]", "(foo[?a].@ | [0])");
    }

    #[test]
    fn boolean_operators() {
        test1("a && b || c", "((a && b) || c)");
        test1("a || b && c", "(a || (b && c))");
        test1("!a.b", "!(a).b");
        test1("!(a.b)", "!(a.b)");
    }

    #[test]
    fn multi_selects() {
        test1("foo.[a, b]", "foo.[a, b]");
        test1("foo.{a: b, c: d.e}", "foo.{a: b, c: d.e}");
        test1("{a: foo}", "{a: foo}");
    }

    #[test]
    fn functions_and_exprefs() {
        test1("length(@)", "length(@)");
        test1("sort_by(foo, &bar)", "sort_by(foo, &bar)");
        test1("max_by(a, &b.c)", "max_by(a, &b.c)");
        test1("not_null(a, b, `1`)", "not_null(a, b, `1`)");
        test_err("foo(&)", 5);
        test_err("f(", 2);
    }

    #[test]
    fn current_and_root() {
        test1("@", "@");
        test1("$", "$");
        test1("$.foo", "$.foo");
        test1("@.bar", "@.bar");
    }

    #[test]
    fn trailing_and_premature_input() {
        test_err("", 0);
        test_err("foo bar", 4);
        test_err("foo.", 4);
        test_err("foo |", 5);
        test_err("(foo", 4);
    }
}
