//! A small recursive-descent parser for the textual form of `TypeExpr`.
//!
//! Grammar:
//!
//! ```text
//! type     := wildcard | named ("[" "]")*
//! wildcard := "?" (("extends" | "super") bounds)?
//! bounds   := type ("&" type)*
//! named    := ident ("<" type ("," type)* ">")?
//! ```
//!
//! Identifiers that match a variable in the supplied scope resolve to that
//! variable; every other identifier is a concrete type name.

use super::error::TypeError;
use super::expr::{TypeExpr, TypeVariable};
use std::str::FromStr;

/// Deepest nesting of type arguments and wildcard bounds accepted.
const MAX_DEPTH: usize = 64;

/// Parses `input`, resolving bare identifiers against `scope`.
pub fn parse_type(input: &str, scope: &[TypeVariable]) -> Result<TypeExpr, TypeError> {
    let mut parser = Parser { input, bytes: input.as_bytes(), pos: 0, depth: 0, scope };
    let ty = parser.parse_type()?;
    match parser.peek() {
        None => Ok(ty),
        Some(_) => Err(parser.error("unexpected trailing input")),
    }
}

impl FromStr for TypeExpr {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_type(s, &[])
    }
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    scope: &'a [TypeVariable],
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'.'
}

impl<'a> Parser<'a> {
    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: u8) -> Result<(), TypeError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected as char)))
        }
    }

    /// Consumes `word` only if it stands alone as an identifier.
    fn keyword(&mut self, word: &str) -> bool {
        self.skip_whitespace();
        let end = self.pos + word.len();
        let matches = self.input.get(self.pos..end) == Some(word)
            && !self.bytes.get(end).copied().is_some_and(is_ident_continue);
        if matches {
            self.pos = end;
        }
        matches
    }

    fn error(&self, message: &str) -> TypeError {
        TypeError::Malformed {
            input: self.input.to_string(),
            offset: self.pos,
            message: message.to_string(),
        }
    }

    /// A byte no type form starts with. Non-ASCII text is malformed rather
    /// than an unsupported form.
    fn unexpected(&self, b: u8) -> TypeError {
        if b.is_ascii() {
            TypeError::UnsupportedTypeExpression { expression: self.input.to_string() }
        } else {
            self.error("non-ASCII character")
        }
    }

    fn identifier(&mut self) -> Result<&'a str, TypeError> {
        self.skip_whitespace();
        let start = self.pos;
        match self.bytes.get(self.pos) {
            Some(&b) if is_ident_start(b) => self.pos += 1,
            Some(&b) => return Err(self.unexpected(b)),
            None => return Err(self.error("unexpected end of input")),
        }
        while self.bytes.get(self.pos).copied().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        Ok(&self.input[start..self.pos])
    }

    fn parse_type(&mut self) -> Result<TypeExpr, TypeError> {
        if self.depth == MAX_DEPTH {
            return Err(self.error("type expression nested too deeply"));
        }
        self.depth += 1;
        let ty = self.parse_nested();
        self.depth -= 1;
        ty
    }

    fn parse_nested(&mut self) -> Result<TypeExpr, TypeError> {
        match self.peek() {
            Some(b'?') => {
                self.pos += 1;
                self.parse_wildcard()
            }
            Some(b) if is_ident_start(b) => {
                let mut ty = self.parse_named()?;
                while self.eat(b'[') {
                    self.expect(b']')?;
                    ty = TypeExpr::array_of(ty);
                }
                Ok(ty)
            }
            // Tuples, function arrows, pointers and the like have no variant.
            Some(b) => Err(self.unexpected(b)),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_wildcard(&mut self) -> Result<TypeExpr, TypeError> {
        if self.keyword("extends") {
            let upper = self.parse_bounds()?;
            Ok(TypeExpr::Wildcard { lower: Vec::new(), upper })
        } else if self.keyword("super") {
            let lower = self.parse_bounds()?;
            Ok(TypeExpr::Wildcard { lower, upper: Vec::new() })
        } else {
            Ok(TypeExpr::wildcard())
        }
    }

    fn parse_bounds(&mut self) -> Result<Vec<TypeExpr>, TypeError> {
        let mut bounds = vec![self.parse_type()?];
        while self.eat(b'&') {
            bounds.push(self.parse_type()?);
        }
        Ok(bounds)
    }

    fn parse_named(&mut self) -> Result<TypeExpr, TypeError> {
        let name = self.identifier()?;
        let variable = self.scope.iter().find(|var| var.name() == name);

        if !self.eat(b'<') {
            return Ok(match variable {
                Some(var) => TypeExpr::Variable(var.clone()),
                None => TypeExpr::concrete(name),
            });
        }
        if variable.is_some() {
            return Err(self.error("a type variable cannot take type arguments"));
        }

        let mut args = vec![self.parse_type()?];
        while self.eat(b',') {
            args.push(self.parse_type()?);
        }
        self.expect(b'>')?;
        Ok(TypeExpr::parameterized(name, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_system::expr::GenericDeclarationContext;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("String")]
    #[case("java.lang.String")]
    #[case("List<String>")]
    #[case("Map<String, List<Integer>>")]
    #[case("int[][]")]
    #[case("List<?>")]
    #[case("List<? extends Number & Comparable<Number>>")]
    #[case("Consumer<? super Integer>")]
    fn test_display_round_trip(#[case] text: &str) {
        let ty: TypeExpr = text.parse().unwrap();
        assert_eq!(ty.to_string(), text);
    }

    #[test]
    fn test_scope_resolves_variables() {
        let ctx = GenericDeclarationContext::new();
        let t = ctx.variable("T");
        let ty = parse_type("List<T>", std::slice::from_ref(&t)).unwrap();
        assert_eq!(ty, TypeExpr::parameterized("List", [TypeExpr::Variable(t)]));
    }

    #[test]
    fn test_variable_with_arguments_is_malformed() {
        let t = GenericDeclarationContext::new().variable("T");
        let err = parse_type("T<String>", &[t]).unwrap_err();
        assert!(matches!(err, TypeError::Malformed { .. }), "{:?}", err);
    }

    #[rstest]
    #[case("(A) -> B")]
    #[case("*String")]
    #[case("List<|A>")]
    fn test_unsupported_forms(#[case] text: &str) {
        let err = parse_type(text, &[]).unwrap_err();
        assert!(matches!(err, TypeError::UnsupportedTypeExpression { .. }), "{:?}", err);
    }

    #[rstest]
    #[case("")]
    #[case("List<String")]
    #[case("List<String>>")]
    #[case("int[")]
    #[case("? extends")]
    #[case("List<Ä>")]
    #[case("Ünicode")]
    #[case("List<String, Ä>")]
    fn test_malformed_input(#[case] text: &str) {
        let err = parse_type(text, &[]).unwrap_err();
        assert!(matches!(err, TypeError::Malformed { .. }), "{:?}", err);
    }

    #[test]
    fn test_nesting_depth_is_limited() {
        let nested = |depth: usize| format!("{}String{}", "List<".repeat(depth), ">".repeat(depth));
        assert!(parse_type(&nested(MAX_DEPTH - 1), &[]).is_ok());

        let err = parse_type(&nested(100_000), &[]).unwrap_err();
        assert!(
            matches!(err, TypeError::Malformed { offset, .. } if offset == MAX_DEPTH * "List<".len()),
            "{:?}",
            err
        );
    }
}
