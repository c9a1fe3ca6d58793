//! Parses a JSONPath expression string into a [`CompiledPath`] once.
//!
//! Per the Design Notes' "Filter parser re-scan" recommendation, filter
//! sub-expressions are parsed into a [`FilterExpr`] tree here, not re-scanned
//! text evaluated per candidate element (that is [`super::eval`]'s job).

use super::ast::{CompareOp, CompiledPath, CurrentStep, FilterExpr, FilterTerm, Step};
use crate::error::JsonPathError;
use crate::value::Value;

pub fn compile(expr: &str) -> Result<CompiledPath, JsonPathError> {
    let mut sc = Scanner::new(expr);
    sc.skip_ws();
    if !sc.consume_byte(b'$') {
        return Err(JsonPathError::ExpectedRoot { pos: sc.pos });
    }

    let mut steps = Vec::new();
    loop {
        sc.skip_ws();
        if sc.eof() {
            break;
        }
        if sc.consume_byte(b'.') {
            if sc.consume_byte(b'.') {
                let inner = parse_descent_selector(&mut sc)?;
                steps.push(Step::RecursiveDescent(Box::new(inner)));
                continue;
            }
            if sc.consume_byte(b'*') {
                steps.push(Step::Wildcard);
                continue;
            }
            let name = parse_identifier(&mut sc)?;
            steps.push(Step::Child(name));
            continue;
        }
        if sc.peek() == Some(b'[') {
            sc.advance();
            steps.push(parse_bracket_selector(&mut sc)?);
            continue;
        }
        // Every valid continuation of a path starts with `.` or `[`; a
        // byte that does neither is trailing content after an otherwise
        // complete expression (`$.a` followed by stray characters, `$x`,
        // and so on) rather than a malformed construct mid-parse.
        return Err(JsonPathError::TrailingInput { pos: sc.pos });
    }

    Ok(CompiledPath { steps })
}

fn parse_descent_selector(sc: &mut Scanner) -> Result<Step, JsonPathError> {
    if sc.consume_byte(b'*') {
        return Ok(Step::Wildcard);
    }
    if sc.peek() == Some(b'[') {
        sc.advance();
        return parse_bracket_selector(sc);
    }
    let name = parse_identifier(sc)?;
    Ok(Step::Child(name))
}

fn parse_bracket_selector(sc: &mut Scanner) -> Result<Step, JsonPathError> {
    sc.skip_ws();
    if sc.consume_byte(b'*') {
        sc.skip_ws();
        sc.expect_byte(b']')?;
        return Ok(Step::Wildcard);
    }

    if sc.consume_byte(b'?') {
        sc.skip_ws();
        sc.expect_byte(b'(')?;
        let expr = parse_filter_or(sc)?;
        sc.skip_ws();
        sc.expect_byte(b')')?;
        sc.skip_ws();
        sc.expect_byte(b']')?;
        return Ok(Step::Filter(expr));
    }

    if matches!(sc.peek(), Some(b'\'') | Some(b'"')) {
        let mut names = vec![parse_quoted(sc)?];
        sc.skip_ws();
        while sc.consume_byte(b',') {
            sc.skip_ws();
            names.push(parse_quoted(sc)?);
            sc.skip_ws();
        }
        sc.expect_byte(b']')?;
        return Ok(if names.len() == 1 {
            Step::Child(names.into_iter().next().unwrap())
        } else {
            Step::Keys(names)
        });
    }

    // A slice's start is optional (`[:2]`, `[::2]`), so a leading `:` has to
    // be checked for before ever requiring an integer.
    if sc.consume_byte(b':') {
        return parse_slice_tail(sc, None);
    }

    let first = parse_int(sc)?;
    sc.skip_ws();
    if sc.consume_byte(b':') {
        return parse_slice_tail(sc, Some(first));
    }

    let mut indices = vec![first];
    sc.skip_ws();
    while sc.consume_byte(b',') {
        sc.skip_ws();
        indices.push(parse_int(sc)?);
        sc.skip_ws();
    }
    sc.expect_byte(b']')?;
    Ok(Step::Indices(indices))
}

/// Parses the `end? (':' step)? ']'` tail of a slice selector, given a
/// `start` that has already been consumed (or omitted).
fn parse_slice_tail(sc: &mut Scanner, start: Option<i64>) -> Result<Step, JsonPathError> {
    let end = if matches!(sc.peek(), Some(b']') | Some(b':')) {
        None
    } else {
        Some(parse_int(sc)?)
    };
    sc.skip_ws();
    let step = if sc.consume_byte(b':') {
        sc.skip_ws();
        parse_int(sc)?
    } else {
        1
    };
    sc.skip_ws();
    sc.expect_byte(b']')?;
    Ok(Step::Slice { start, end, step })
}

fn parse_filter_or(sc: &mut Scanner) -> Result<FilterExpr, JsonPathError> {
    let mut left = parse_filter_and(sc)?;
    loop {
        sc.skip_ws();
        if sc.consume_lit("||") {
            let right = parse_filter_and(sc)?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        } else {
            break;
        }
    }
    Ok(left)
}

fn parse_filter_and(sc: &mut Scanner) -> Result<FilterExpr, JsonPathError> {
    let mut left = parse_filter_unary(sc)?;
    loop {
        sc.skip_ws();
        if sc.consume_lit("&&") {
            let right = parse_filter_unary(sc)?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        } else {
            break;
        }
    }
    Ok(left)
}

fn parse_filter_unary(sc: &mut Scanner) -> Result<FilterExpr, JsonPathError> {
    sc.skip_ws();
    if sc.consume_byte(b'!') {
        let inner = parse_filter_unary(sc)?;
        return Ok(FilterExpr::Not(Box::new(inner)));
    }
    parse_filter_cmp(sc)
}

fn parse_filter_cmp(sc: &mut Scanner) -> Result<FilterExpr, JsonPathError> {
    let lhs = parse_filter_term(sc)?;
    sc.skip_ws();
    let op = if sc.consume_lit("==") {
        Some(CompareOp::Eq)
    } else if sc.consume_lit("!=") {
        Some(CompareOp::Ne)
    } else if sc.consume_lit("<=") {
        Some(CompareOp::Le)
    } else if sc.consume_lit(">=") {
        Some(CompareOp::Ge)
    } else if sc.consume_lit("<") {
        Some(CompareOp::Lt)
    } else if sc.consume_lit(">") {
        Some(CompareOp::Gt)
    } else {
        None
    };

    match op {
        None => Ok(FilterExpr::Truthy(lhs)),
        Some(op) => {
            sc.skip_ws();
            let rhs = parse_filter_term(sc)?;
            Ok(FilterExpr::Compare(op, lhs, rhs))
        }
    }
}

fn parse_filter_term(sc: &mut Scanner) -> Result<FilterTerm, JsonPathError> {
    sc.skip_ws();
    if sc.peek() == Some(b'@') {
        sc.advance();
        return parse_current_chain(sc);
    }
    parse_literal(sc).map(FilterTerm::Literal)
}

fn parse_current_chain(sc: &mut Scanner) -> Result<FilterTerm, JsonPathError> {
    let mut steps = Vec::new();
    loop {
        if sc.peek() == Some(b'.') {
            let save = sc.pos;
            sc.advance();
            if sc.peek() == Some(b'.') {
                sc.pos = save;
                return Ok(FilterTerm::UnsupportedRecursive);
            }
            let name = parse_identifier(sc)?;
            steps.push(CurrentStep::Name(name));
            continue;
        }
        if sc.peek() == Some(b'[') {
            sc.advance();
            sc.skip_ws();
            if matches!(sc.peek(), Some(b'\'') | Some(b'"')) {
                let name = parse_quoted(sc)?;
                sc.skip_ws();
                sc.expect_byte(b']')?;
                steps.push(CurrentStep::Name(name));
                continue;
            }
            let idx = parse_int(sc)?;
            sc.skip_ws();
            sc.expect_byte(b']')?;
            steps.push(CurrentStep::Index(idx));
            continue;
        }
        break;
    }
    Ok(FilterTerm::Current(steps))
}

fn parse_literal(sc: &mut Scanner) -> Result<Value, JsonPathError> {
    sc.skip_ws();
    if sc.consume_lit("true") {
        return Ok(Value::Bool(true));
    }
    if sc.consume_lit("false") {
        return Ok(Value::Bool(false));
    }
    if sc.consume_lit("null") {
        return Ok(Value::Null);
    }
    if matches!(sc.peek(), Some(b'\'') | Some(b'"')) {
        return Ok(Value::String(parse_quoted(sc)?));
    }
    parse_number(sc).map(Value::Number)
}

fn parse_number(sc: &mut Scanner) -> Result<f64, JsonPathError> {
    let start = sc.pos;
    if matches!(sc.peek(), Some(b'-') | Some(b'+')) {
        sc.advance();
    }
    let mut saw_digit = false;
    while matches!(sc.peek(), Some(b'0'..=b'9')) {
        sc.advance();
        saw_digit = true;
    }
    if sc.peek() == Some(b'.') {
        sc.advance();
        while matches!(sc.peek(), Some(b'0'..=b'9')) {
            sc.advance();
            saw_digit = true;
        }
    }
    if !saw_digit {
        return Err(JsonPathError::MalformedFilter { pos: start });
    }
    let text = sc.slice(start, sc.pos);
    text.parse::<f64>()
        .map_err(|_| JsonPathError::MalformedFilter { pos: start })
}

fn parse_int(sc: &mut Scanner) -> Result<i64, JsonPathError> {
    let start = sc.pos;
    if matches!(sc.peek(), Some(b'-') | Some(b'+')) {
        sc.advance();
    }
    let mut saw_digit = false;
    while matches!(sc.peek(), Some(b'0'..=b'9')) {
        sc.advance();
        saw_digit = true;
    }
    if !saw_digit {
        return Err(JsonPathError::MalformedSelector { pos: start });
    }
    sc.slice(start, sc.pos)
        .parse::<i64>()
        .map_err(|_| JsonPathError::MalformedSelector { pos: start })
}

fn parse_identifier(sc: &mut Scanner) -> Result<String, JsonPathError> {
    let start = sc.pos;
    match sc.peek() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => sc.advance(),
        _ => return Err(JsonPathError::ExpectedName { pos: start }),
    };
    while matches!(sc.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
        sc.advance();
    }
    Ok(sc.slice(start, sc.pos).to_string())
}

fn parse_quoted(sc: &mut Scanner) -> Result<String, JsonPathError> {
    let quote_pos = sc.pos;
    let quote = sc.advance().ok_or(JsonPathError::UnexpectedEof)?;
    if quote != b'\'' && quote != b'"' {
        return Err(JsonPathError::MalformedSelector { pos: quote_pos });
    }
    let mut out = String::new();
    loop {
        match sc.advance() {
            None => return Err(JsonPathError::UnexpectedEof),
            Some(b) if b == quote => break,
            Some(b'\\') => {
                let esc = sc.advance().ok_or(JsonPathError::UnexpectedEof)?;
                out.push(esc as char);
            }
            Some(b) => out.push(b as char),
        }
    }
    Ok(out)
}

struct Scanner<'a> {
    buf: &'a [u8],
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Scanner {
            buf: src.as_bytes(),
            src,
            pos: 0,
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')) {
            self.pos += 1;
        }
    }

    fn consume_byte(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn consume_lit(&mut self, lit: &str) -> bool {
        if self.buf[self.pos..].starts_with(lit.as_bytes()) {
            self.pos += lit.len();
            true
        } else {
            false
        }
    }

    fn expect_byte(&mut self, b: u8) -> Result<(), JsonPathError> {
        if self.consume_byte(b) {
            Ok(())
        } else {
            Err(JsonPathError::MalformedSelector { pos: self.pos })
        }
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.src[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_simple_child_path() {
        let p = compile("$.store.book").unwrap();
        assert_eq!(
            p.steps,
            vec![Step::Child("store".to_string()), Step::Child("book".to_string())]
        );
    }

    #[test]
    fn compiles_recursive_descent() {
        let p = compile("$..author").unwrap();
        assert_eq!(
            p.steps,
            vec![Step::RecursiveDescent(Box::new(Step::Child("author".to_string())))]
        );
    }

    #[test]
    fn compiles_wildcard_and_index() {
        let p = compile("$.store.book[0]").unwrap();
        assert_eq!(
            p.steps,
            vec![
                Step::Child("store".to_string()),
                Step::Child("book".to_string()),
                Step::Indices(vec![0]),
            ]
        );
    }

    #[test]
    fn compiles_slice() {
        let p = compile("$.store.book[0:2]").unwrap();
        assert_eq!(
            p.steps[2],
            Step::Slice {
                start: Some(0),
                end: Some(2),
                step: 1,
            }
        );
    }

    #[test]
    fn compiles_slice_with_omitted_start() {
        let p = compile("$.store.book[:2]").unwrap();
        assert_eq!(
            p.steps[2],
            Step::Slice {
                start: None,
                end: Some(2),
                step: 1,
            }
        );
    }

    #[test]
    fn compiles_slice_with_omitted_start_and_explicit_step() {
        let p = compile("$.store.book[::2]").unwrap();
        assert_eq!(
            p.steps[2],
            Step::Slice {
                start: None,
                end: None,
                step: 2,
            }
        );
    }

    #[test]
    fn compiles_filter() {
        let p = compile("$.store.book[?(@.price<10)]").unwrap();
        match &p.steps[2] {
            Step::Filter(FilterExpr::Compare(CompareOp::Lt, FilterTerm::Current(steps), FilterTerm::Literal(Value::Number(n)))) => {
                assert_eq!(steps, &vec![CurrentStep::Name("price".to_string())]);
                assert_eq!(*n, 10.0);
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_root() {
        assert!(compile("store.book").is_err());
    }

    #[test]
    fn trailing_characters_after_a_complete_path_are_rejected() {
        let err = compile("$.a stray").unwrap_err();
        assert!(matches!(err, JsonPathError::TrailingInput { .. }));
    }

    #[test]
    fn at_dotdot_in_filter_is_unsupported_recursive() {
        let p = compile("$.a[?(@..b == 1)]").unwrap();
        match &p.steps[1] {
            Step::Filter(FilterExpr::Compare(_, FilterTerm::UnsupportedRecursive, _)) => {}
            other => panic!("unexpected step: {other:?}"),
        }
    }
}
