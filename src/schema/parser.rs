//! Tokenizer and recursive-descent parser for the schema language.
//!
//! Named references are first parsed as record references and then resolved
//! against the complete set of definitions, so definitions may appear in any
//! order.

use std::collections::HashMap;
use std::fmt;

use objectify_core::{Field, Literal, TupleDescriptor, TypeDescriptor};
use tracing::debug;

use super::{Definition, ParseError, Schema};

/// Names the type grammar claims for itself.
const RESERVED: &[&str] = &[
    "string", "str", "int", "float", "bool", "none", "list", "set", "dict", "tuple", "literal", "union",
    "optional",
];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Symbol(char),
    Str(String),
    Int(i64),
    Ellipsis,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => f.write_str(name),
            Token::Symbol(ch) => write!(f, "{ch}"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::Int(i) => write!(f, "{i}"),
            Token::Ellipsis => f.write_str("..."),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

/// Parse a complete schema source.
pub fn parse_schema(src: &str) -> Result<Schema, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::new(tokens);
    let mut definitions = Vec::new();

    while !parser.is_eof() {
        if parser.accept_symbol(';') {
            continue;
        }

        let line = parser.line();
        let keyword = parser.expect_ident()?;
        match keyword.as_str() {
            "record" => definitions.push(parse_record(&mut parser)?),
            "type" => definitions.push(parse_alias(&mut parser)?),
            _ => return Err(ParseError::UnexpectedToken { token: keyword, line }),
        }
    }

    let schema = resolve(definitions)?;
    debug!(definitions = schema.definitions().len(), "parsed schema");
    Ok(schema)
}

/// Parse a standalone type expression, resolving names against `schema`.
pub fn parse_type(src: &str, schema: &Schema) -> Result<TypeDescriptor, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::new(tokens);
    let mut ty = parse_type_expr(&mut parser)?;
    parser.expect_eof()?;

    resolve_names(&mut ty, &|name: &str| {
        if schema.is_record(name) {
            Some(NameKind::Record)
        } else if schema.is_alias(name) {
            Some(NameKind::Alias)
        } else {
            None
        }
    })?;
    Ok(ty)
}

// ============================================================================
// Name resolution
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameKind {
    Record,
    Alias,
}

fn resolve(mut definitions: Vec<Definition>) -> Result<Schema, ParseError> {
    let mut names = HashMap::new();
    for definition in &definitions {
        let name = definition.name();
        if RESERVED.contains(&name) {
            return Err(ParseError::ReservedName(name.to_string()));
        }
        let kind = match definition {
            Definition::Record { .. } => NameKind::Record,
            Definition::Alias { .. } => NameKind::Alias,
        };
        if names.insert(name.to_string(), kind).is_some() {
            return Err(ParseError::DuplicateDefinition(name.to_string()));
        }
    }

    let lookup = |name: &str| names.get(name).copied();
    for definition in &mut definitions {
        match definition {
            Definition::Record { fields, .. } => {
                for field in fields {
                    resolve_names(&mut field.ty, &lookup)?;
                }
            }
            Definition::Alias { target, .. } => resolve_names(target, &lookup)?,
        }
    }

    Ok(Schema::new(definitions))
}

fn resolve_names<F>(ty: &mut TypeDescriptor, lookup: &F) -> Result<(), ParseError>
where
    F: Fn(&str) -> Option<NameKind>,
{
    match ty {
        TypeDescriptor::Primitive(_) | TypeDescriptor::Literal(_) | TypeDescriptor::Alias(_) => Ok(()),
        TypeDescriptor::List(inner)
        | TypeDescriptor::Set(inner)
        | TypeDescriptor::Tuple(TupleDescriptor::Variadic(inner)) => resolve_names(inner, lookup),
        TypeDescriptor::Dict { key, value } => {
            resolve_names(key, lookup)?;
            resolve_names(value, lookup)
        }
        TypeDescriptor::Tuple(TupleDescriptor::Fixed(items)) | TypeDescriptor::Union(items) => items
            .iter_mut()
            .try_for_each(|item| resolve_names(item, lookup)),
        TypeDescriptor::Record(name) => match lookup(name) {
            Some(NameKind::Record) => Ok(()),
            Some(NameKind::Alias) => {
                let name = std::mem::take(name);
                *ty = TypeDescriptor::Alias(name);
                Ok(())
            }
            None => Err(ParseError::UnknownType(name.clone())),
        },
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Deepest nesting of type arguments a type expression may have.
pub const MAX_TYPE_NESTING: usize = 128;

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<(Token, usize)>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map_or(&Token::Eof, |(token, _)| token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |(_, line)| *line)
    }

    fn next(&mut self) -> Token {
        let tok = self.peek().clone();
        if !matches!(tok, Token::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn unexpected(&self, token: Token, line: usize) -> ParseError {
        match token {
            Token::Eof => ParseError::UnexpectedEof,
            other => ParseError::UnexpectedToken {
                token: other.to_string(),
                line,
            },
        }
    }

    fn expect_symbol(&mut self, expected: char) -> Result<(), ParseError> {
        let line = self.line();
        match self.next() {
            Token::Symbol(ch) if ch == expected => Ok(()),
            other => Err(self.unexpected(other, line)),
        }
    }

    fn accept_symbol(&mut self, expected: char) -> bool {
        if matches!(self.peek(), Token::Symbol(ch) if *ch == expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn accept_ellipsis(&mut self) -> bool {
        if matches!(self.peek(), Token::Ellipsis) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        let line = self.line();
        match self.next() {
            Token::Ident(name) => Ok(name),
            other => Err(self.unexpected(other, line)),
        }
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        let line = self.line();
        match self.next() {
            Token::Eof => Ok(()),
            other => Err(self.unexpected(other, line)),
        }
    }
}

fn parse_alias(parser: &mut Parser) -> Result<Definition, ParseError> {
    let name = parser.expect_ident()?;
    parser.expect_symbol('=')?;
    let target = parse_type_expr(parser)?;
    Ok(Definition::Alias { name, target })
}

fn parse_record(parser: &mut Parser) -> Result<Definition, ParseError> {
    let name = parser.expect_ident()?;
    parser.expect_symbol('{')?;
    let mut fields = Vec::new();

    while !parser.accept_symbol('}') {
        let field_name = parser.expect_ident()?;
        parser.expect_symbol(':')?;
        let field_type = parse_type_expr(parser)?;
        fields.push(Field::new(field_name, field_type));
        if !parser.accept_symbol(',') {
            parser.expect_symbol('}')?;
            break;
        }
    }

    Ok(Definition::Record { name, fields })
}

fn parse_type_expr(parser: &mut Parser) -> Result<TypeDescriptor, ParseError> {
    if parser.depth >= MAX_TYPE_NESTING {
        return Err(ParseError::NestingTooDeep(MAX_TYPE_NESTING));
    }
    parser.depth += 1;
    let ty = parse_type_term(parser);
    parser.depth -= 1;
    ty
}

fn parse_type_term(parser: &mut Parser) -> Result<TypeDescriptor, ParseError> {
    let ident = parser.expect_ident()?;
    match ident.as_str() {
        "string" | "str" => Ok(TypeDescriptor::string()),
        "int" => Ok(TypeDescriptor::integer()),
        "float" => Ok(TypeDescriptor::float()),
        "bool" => Ok(TypeDescriptor::boolean()),
        "none" => Ok(TypeDescriptor::none()),
        "list" => parse_single_param(parser, TypeDescriptor::list),
        "set" => parse_single_param(parser, TypeDescriptor::set),
        "optional" => parse_single_param(parser, TypeDescriptor::optional),
        "dict" => {
            parser.expect_symbol('<')?;
            let key = parse_type_expr(parser)?;
            parser.expect_symbol(',')?;
            let value = parse_type_expr(parser)?;
            parser.expect_symbol('>')?;
            Ok(TypeDescriptor::dict(key, value))
        }
        "tuple" => parse_tuple(parser),
        "literal" => parse_literal(parser),
        "union" => {
            parser.expect_symbol('<')?;
            let mut alternatives = vec![parse_type_expr(parser)?];
            while parser.accept_symbol(',') {
                alternatives.push(parse_type_expr(parser)?);
            }
            parser.expect_symbol('>')?;
            Ok(TypeDescriptor::union(alternatives))
        }
        _ => Ok(TypeDescriptor::Record(ident)),
    }
}

fn parse_single_param<F>(parser: &mut Parser, wrap: F) -> Result<TypeDescriptor, ParseError>
where
    F: Fn(TypeDescriptor) -> TypeDescriptor,
{
    parser.expect_symbol('<')?;
    let inner = parse_type_expr(parser)?;
    parser.expect_symbol('>')?;
    Ok(wrap(inner))
}

/// `tuple<>`, `tuple<A, B, ...>` (fixed) or `tuple<A, ...>` (variadic).
fn parse_tuple(parser: &mut Parser) -> Result<TypeDescriptor, ParseError> {
    parser.expect_symbol('<')?;
    let mut items = Vec::new();
    if parser.accept_symbol('>') {
        return Ok(TypeDescriptor::fixed_tuple(items));
    }

    loop {
        items.push(parse_type_expr(parser)?);
        if parser.accept_symbol('>') {
            return Ok(TypeDescriptor::fixed_tuple(items));
        }
        parser.expect_symbol(',')?;

        let line = parser.line();
        if parser.accept_ellipsis() {
            // Only a single element type may repeat.
            if items.len() != 1 {
                return Err(ParseError::UnexpectedToken {
                    token: Token::Ellipsis.to_string(),
                    line,
                });
            }
            parser.expect_symbol('>')?;
            let element = items.remove(0);
            return Ok(TypeDescriptor::variadic_tuple(element));
        }
    }
}

fn parse_literal(parser: &mut Parser) -> Result<TypeDescriptor, ParseError> {
    parser.expect_symbol('<')?;
    let mut allowed = Vec::new();
    loop {
        let line = parser.line();
        let literal = match parser.next() {
            Token::Str(s) => Literal::Str(s),
            Token::Int(i) => Literal::Int(i),
            Token::Ident(name) if name == "true" => Literal::Bool(true),
            Token::Ident(name) if name == "false" => Literal::Bool(false),
            Token::Ident(name) if name == "none" => Literal::Null,
            other => return Err(parser.unexpected(other, line)),
        };
        allowed.push(literal);
        if parser.accept_symbol('>') {
            return Ok(TypeDescriptor::literal(allowed));
        }
        parser.expect_symbol(',')?;
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

fn tokenize(src: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    let mut line = 1;

    while let Some(&ch) = chars.peek() {
        if ch == '\n' {
            line += 1;
            chars.next();
            continue;
        }

        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch == '/' {
            chars.next();
            if matches!(chars.peek(), Some('/')) {
                for next in chars.by_ref() {
                    if next == '\n' {
                        line += 1;
                        break;
                    }
                }
                continue;
            }
            if matches!(chars.peek(), Some('*')) {
                chars.next();
                while let Some(next) = chars.next() {
                    if next == '\n' {
                        line += 1;
                    }
                    if next == '*' && matches!(chars.peek(), Some('/')) {
                        chars.next();
                        break;
                    }
                }
                continue;
            }
            return Err(ParseError::UnexpectedToken {
                token: "/".to_string(),
                line,
            });
        }

        if ch == '"' {
            let start = line;
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('0') => value.push('\0'),
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('u') => value.push(unicode_escape(&mut chars, line)?),
                        Some(_) => return Err(ParseError::InvalidEscape(line)),
                        None => return Err(ParseError::UnterminatedString(start)),
                    },
                    Some(other) => {
                        if other == '\n' {
                            line += 1;
                        }
                        value.push(other);
                    }
                    None => return Err(ParseError::UnterminatedString(start)),
                }
            }
            tokens.push((Token::Str(value), start));
            continue;
        }

        if ch == '-' || ch.is_ascii_digit() {
            let mut digits = String::new();
            digits.push(ch);
            chars.next();
            while let Some(&next) = chars.peek() {
                if next.is_ascii_digit() {
                    digits.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            let value = digits
                .parse::<i64>()
                .map_err(|_| ParseError::InvalidInteger(digits.clone()))?;
            tokens.push((Token::Int(value), line));
            continue;
        }

        if ch == '.' {
            for _ in 0..3 {
                if chars.next() != Some('.') {
                    return Err(ParseError::UnexpectedToken {
                        token: ".".to_string(),
                        line,
                    });
                }
            }
            tokens.push((Token::Ellipsis, line));
            continue;
        }

        if is_ident_start(ch) {
            let mut ident = String::new();
            while let Some(&next) = chars.peek() {
                if is_ident_continue(next) {
                    ident.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push((Token::Ident(ident), line));
            continue;
        }

        if is_symbol(ch) {
            tokens.push((Token::Symbol(ch), line));
            chars.next();
            continue;
        }

        return Err(ParseError::UnexpectedToken {
            token: ch.to_string(),
            line,
        });
    }

    tokens.push((Token::Eof, line));
    Ok(tokens)
}

/// The `{hex}` part of a `\u{hex}` escape.
fn unicode_escape<I>(chars: &mut std::iter::Peekable<I>, line: usize) -> Result<char, ParseError>
where
    I: Iterator<Item = char>,
{
    if chars.next() != Some('{') {
        return Err(ParseError::InvalidEscape(line));
    }
    let mut hex = String::new();
    loop {
        match chars.next() {
            Some('}') => break,
            Some(digit) if digit.is_ascii_hexdigit() && hex.len() < 6 => hex.push(digit),
            _ => return Err(ParseError::InvalidEscape(line)),
        }
    }
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or(ParseError::InvalidEscape(line))
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

fn is_symbol(ch: char) -> bool {
    matches!(ch, '{' | '}' | '<' | '>' | ':' | ',' | '=' | ';')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_may_reference_later_definitions() {
        let src = r#"
            record nested { a: int, b: test, }
            record test { c: string }
        "#;

        let schema = parse_schema(src).expect("parse");
        assert_eq!(schema.definitions().len(), 2);
        match schema.get("nested") {
            Some(Definition::Record { fields, .. }) => {
                assert_eq!(fields[1].ty, TypeDescriptor::record("test"));
            }
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn alias_names_become_alias_references() {
        let src = r#"
            type ids = list<id>
            type id = int
        "#;

        let schema = parse_schema(src).expect("parse");
        match schema.get("ids") {
            Some(Definition::Alias { target, .. }) => {
                assert_eq!(*target, TypeDescriptor::list(TypeDescriptor::alias("id")));
            }
            other => panic!("expected alias, got {other:?}"),
        }
    }

    #[test]
    fn tuple_forms() {
        let schema = Schema::default();
        assert_eq!(
            parse_type("tuple<>", &schema).expect("empty"),
            TypeDescriptor::fixed_tuple(vec![])
        );
        assert_eq!(
            parse_type("tuple<int, ...>", &schema).expect("variadic"),
            TypeDescriptor::variadic_tuple(TypeDescriptor::integer())
        );
        assert_eq!(
            parse_type("tuple<int, float>", &schema).expect("fixed"),
            TypeDescriptor::fixed_tuple(vec![TypeDescriptor::integer(), TypeDescriptor::float()])
        );
        assert!(parse_type("tuple<int, float, ...>", &schema).is_err());
    }

    #[test]
    fn literals_and_optionals() {
        let schema = Schema::default();
        assert_eq!(
            parse_type(r#"literal<"fast", -3, true, none>"#, &schema).expect("literal"),
            TypeDescriptor::literal(vec![
                Literal::Str("fast".into()),
                Literal::Int(-3),
                Literal::Bool(true),
                Literal::Null,
            ])
        );
        assert_eq!(
            parse_type("optional<str>", &schema).expect("optional"),
            TypeDescriptor::union(vec![TypeDescriptor::string(), TypeDescriptor::none()])
        );
    }

    #[test]
    fn comments_are_skipped() {
        let src = "// leading\nrecord a { /* inline */ x: int }\n/* trailing\n */";
        let schema = parse_schema(src).expect("parse");
        assert!(schema.is_record("a"));
    }

    #[test]
    fn unknown_names_fail() {
        let err = parse_schema("record a { b: missing }").expect_err("unknown");
        assert_eq!(err, ParseError::UnknownType("missing".into()));

        let err = parse_type("list<missing>", &Schema::default()).expect_err("unknown");
        assert_eq!(err, ParseError::UnknownType("missing".into()));
    }

    #[test]
    fn duplicate_and_reserved_names_fail() {
        let err = parse_schema("record a {} type a = int").expect_err("duplicate");
        assert_eq!(err, ParseError::DuplicateDefinition("a".into()));

        let err = parse_schema("type list = int").expect_err("reserved");
        assert_eq!(err, ParseError::ReservedName("list".into()));
    }

    #[test]
    fn errors_report_lines() {
        let err = parse_schema("record a {\n  x: int\n  y: int\n}").expect_err("missing comma");
        assert_eq!(
            err,
            ParseError::UnexpectedToken {
                token: "y".into(),
                line: 3
            }
        );

        assert_eq!(parse_schema("record a { x:").expect_err("eof"), ParseError::UnexpectedEof);
    }

    #[test]
    fn display_output_parses_back() {
        let schema = parse_schema("record point { x: int, y: int }").expect("parse");
        let ty = parse_type(r#"dict<string, list<tuple<point, literal<"a", 1>>>>"#, &schema).expect("type");
        assert_eq!(parse_type(&ty.to_string(), &schema).expect("reparse"), ty);

        let awkward = TypeDescriptor::literal(vec![
            Literal::Str("a\rb".into()),
            Literal::Str("nul\0 tab\t quote\" slash\\".into()),
            Literal::Str("bell\u{7} escape\u{1b} del\u{7f} é".into()),
            Literal::Str(String::new()),
        ]);
        assert_eq!(parse_type(&awkward.to_string(), &schema).expect("reparse"), awkward);
    }

    #[test]
    fn string_escapes() {
        let schema = Schema::default();
        assert_eq!(
            parse_type(r#"literal<"\u{48}i\n">"#, &schema).expect("escapes"),
            TypeDescriptor::literal(vec![Literal::Str("Hi\n".into())])
        );
        assert_eq!(
            parse_type(r#"literal<"\q">"#, &schema).expect_err("unknown escape"),
            ParseError::InvalidEscape(1)
        );
        assert_eq!(
            parse_type(r#"literal<"\u{d800}">"#, &schema).expect_err("surrogate"),
            ParseError::InvalidEscape(1)
        );
        assert_eq!(
            parse_type(r#"literal<"\u41">"#, &schema).expect_err("no braces"),
            ParseError::InvalidEscape(1)
        );
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let depth = 200_000;
        let src = format!("type t = {}int{}", "list<".repeat(depth), ">".repeat(depth));
        assert_eq!(
            parse_schema(&src).expect_err("too deep"),
            ParseError::NestingTooDeep(MAX_TYPE_NESTING)
        );

        let at_limit = format!(
            "{}int{}",
            "list<".repeat(MAX_TYPE_NESTING - 1),
            ">".repeat(MAX_TYPE_NESTING - 1)
        );
        parse_type(&at_limit, &Schema::default()).expect("within the limit");

        let record = format!("record r {{ x: {}int{} }}", "set<".repeat(200), ">".repeat(200));
        assert_eq!(
            parse_schema(&record).expect_err("too deep"),
            ParseError::NestingTooDeep(MAX_TYPE_NESTING)
        );
    }
}
