use crate::{
    tokenizer::{tokenize_schema, Token},
    types::{
        CompoundKind, Declaration, EnumKind, EnumValueExpr, Literal, MetaItem, ParsedSchema,
        RawCompound, RawEnum, RawEnumVal, RawField, Spanned,
    },
    utils::{error, quote},
    error::FbsError,
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER:         Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref DOTTED_IDENTIFIER:  Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
    static ref STRING:             Regex = Regex::new(r#"^(?s)".*"$"#).unwrap();
    static ref NUMBER:             Regex = Regex::new(r"^-?(0[xX][0-9A-Fa-f]+|\d+(\.\d+)?([eE][+-]?\d+)?)$").unwrap();
    static ref EQUALS:             Regex = Regex::new(r"^=$").unwrap();
    static ref SEMICOLON:          Regex = Regex::new(r"^;$").unwrap();
    static ref COLON:              Regex = Regex::new(r"^:$").unwrap();
    static ref COMMA:              Regex = Regex::new(r"^,$").unwrap();
    static ref PIPE:               Regex = Regex::new(r"^\|$").unwrap();
    static ref SHIFT_LEFT:         Regex = Regex::new(r"^<<$").unwrap();
    static ref LEFT_BRACE:         Regex = Regex::new(r"^\{$").unwrap();
    static ref RIGHT_BRACE:        Regex = Regex::new(r"^\}$").unwrap();
    static ref LEFT_PAREN:         Regex = Regex::new(r"^\($").unwrap();
    static ref RIGHT_PAREN:        Regex = Regex::new(r"^\)$").unwrap();
    static ref LEFT_BRACKET:       Regex = Regex::new(r"^\[$").unwrap();
    static ref RIGHT_BRACKET:      Regex = Regex::new(r"^\]$").unwrap();
    static ref INCLUDE_KEYWORD:    Regex = Regex::new(r"^include$").unwrap();
    static ref NAMESPACE_KEYWORD:  Regex = Regex::new(r"^namespace$").unwrap();
    static ref ATTRIBUTE_KEYWORD:  Regex = Regex::new(r"^attribute$").unwrap();
    static ref OPTION_KEYWORD:     Regex = Regex::new(r"^option$").unwrap();
    static ref TABLE_KEYWORD:      Regex = Regex::new(r"^table$").unwrap();
    static ref STRUCT_KEYWORD:     Regex = Regex::new(r"^struct$").unwrap();
    static ref ENUM_KEYWORD:       Regex = Regex::new(r"^enum$").unwrap();
    static ref UNION_KEYWORD:      Regex = Regex::new(r"^union$").unwrap();
    static ref ROOT_TYPE_KEYWORD:  Regex = Regex::new(r"^root_type$").unwrap();
    static ref FILE_EXT_KEYWORD:   Regex = Regex::new(r"^file_extension$").unwrap();
    static ref FILE_IDENT_KEYWORD: Regex = Regex::new(r"^file_identifier$").unwrap();
    static ref ITEM_KEYWORD:       Regex = Regex::new(r"^(namespace|attribute|option|table|struct|enum|union)$").unwrap();
    static ref EOF:                Regex = Regex::new(r"^$").unwrap();
}

/// Tokenizes and parses schema text. Grammar only: no file access and no
/// semantic checks.
pub fn parse_schema_text(text: &str) -> Result<ParsedSchema, FbsError> {
    let tokens = tokenize_schema(text)?;
    parse_schema(&tokens)
}

/// Parses a token stream (as produced by `tokenize_schema`) into the ordered
/// declaration list. The three grammar sections (includes, items, trailing
/// file attributes) must appear in that order.
pub fn parse_schema(tokens: &[Token]) -> Result<ParsedSchema, FbsError> {
    let mut cursor = Cursor::new(tokens)?;
    let mut declarations = Vec::new();

    while cursor.eat(&INCLUDE_KEYWORD) {
        let path = cursor.expect_string()?;
        cursor.expect(&SEMICOLON, "\";\"")?;
        declarations.push(Declaration::Include(path));
    }

    while let Some(decl) = parse_item(&mut cursor)? {
        declarations.push(decl);
    }

    while let Some(decl) = parse_trailer(&mut cursor)? {
        declarations.push(decl);
    }

    if !cursor.eat(&EOF) {
        let tok = cursor.current();
        let msg = if INCLUDE_KEYWORD.is_match(&tok.text) {
            "include declarations must precede all other declarations".to_string()
        } else if ITEM_KEYWORD.is_match(&tok.text) {
            format!(
                "{} cannot follow root_type, file_extension or file_identifier",
                quote(&tok.text)
            )
        } else {
            format!("Unexpected token {}", describe(tok))
        };
        return Err(error(&msg, tok.line, tok.column));
    }

    Ok(ParsedSchema { declarations })
}

fn parse_item(cursor: &mut Cursor) -> Result<Option<Declaration>, FbsError> {
    let decl = if cursor.eat(&NAMESPACE_KEYWORD) {
        let name = cursor.expect_spanned(&DOTTED_IDENTIFIER, "namespace name")?;
        cursor.expect(&SEMICOLON, "\";\"")?;
        Declaration::Namespace(name)
    } else if cursor.eat(&ATTRIBUTE_KEYWORD) {
        let name = cursor.expect_string()?;
        cursor.expect(&SEMICOLON, "\";\"")?;
        Declaration::Attribute(name)
    } else if cursor.eat(&OPTION_KEYWORD) {
        let name = cursor.expect_spanned(&IDENTIFIER, "identifier")?;
        cursor.expect(&EQUALS, "\"=\"")?;
        let value = parse_literal(cursor)?;
        cursor.expect(&SEMICOLON, "\";\"")?;
        Declaration::Option { name, value }
    } else if cursor.eat(&TABLE_KEYWORD) {
        Declaration::Compound(parse_compound(cursor, CompoundKind::Table)?)
    } else if cursor.eat(&STRUCT_KEYWORD) {
        Declaration::Compound(parse_compound(cursor, CompoundKind::Struct)?)
    } else if cursor.eat(&ENUM_KEYWORD) {
        Declaration::Enum(parse_enum(cursor, EnumKind::Enum)?)
    } else if cursor.eat(&UNION_KEYWORD) {
        Declaration::Enum(parse_enum(cursor, EnumKind::Union)?)
    } else {
        return Ok(None);
    };
    Ok(Some(decl))
}

fn parse_trailer(cursor: &mut Cursor) -> Result<Option<Declaration>, FbsError> {
    let decl = if cursor.eat(&ROOT_TYPE_KEYWORD) {
        let name = cursor.expect_spanned(&DOTTED_IDENTIFIER, "type name")?;
        Declaration::RootType(name)
    } else if cursor.eat(&FILE_EXT_KEYWORD) {
        Declaration::FileExtension(cursor.expect_string()?)
    } else if cursor.eat(&FILE_IDENT_KEYWORD) {
        Declaration::FileIdentifier(cursor.expect_string()?)
    } else {
        return Ok(None);
    };
    cursor.expect(&SEMICOLON, "\";\"")?;
    Ok(Some(decl))
}

fn parse_compound(cursor: &mut Cursor, kind: CompoundKind) -> Result<RawCompound, FbsError> {
    let name = cursor.expect_spanned(&IDENTIFIER, "identifier")?;
    let metadata = parse_metadata(cursor)?;
    cursor.expect(&LEFT_BRACE, "\"{\"")?;

    let mut fields = Vec::new();
    while !cursor.eat(&RIGHT_BRACE) {
        fields.push(parse_field(cursor)?);
    }

    Ok(RawCompound { kind, name, metadata, fields })
}

fn parse_field(cursor: &mut Cursor) -> Result<RawField, FbsError> {
    let name = cursor.expect_spanned(&IDENTIFIER, "field name")?;
    cursor.expect(&COLON, "\":\"")?;

    let is_array = cursor.eat(&LEFT_BRACKET);
    let type_tok = cursor.expect(&DOTTED_IDENTIFIER, "type name")?;
    if is_array {
        cursor.expect(&RIGHT_BRACKET, "\"]\"")?;
    }

    let default = if cursor.eat(&EQUALS) {
        Some(parse_literal(cursor)?)
    } else {
        None
    };
    let metadata = parse_metadata(cursor)?;
    cursor.expect(&SEMICOLON, "\";\"")?;

    Ok(RawField {
        name,
        type_name: type_tok.text.clone(),
        is_array,
        default,
        metadata,
    })
}

fn parse_enum(cursor: &mut Cursor, kind: EnumKind) -> Result<RawEnum, FbsError> {
    let name = cursor.expect_spanned(&IDENTIFIER, "identifier")?;
    let underlying = if cursor.eat(&COLON) {
        Some(cursor.expect_spanned(&DOTTED_IDENTIFIER, "underlying type")?)
    } else {
        None
    };
    let metadata = parse_metadata(cursor)?;
    cursor.expect(&LEFT_BRACE, "\"{\"")?;

    // Commas separate values; a trailing comma before "}" is allowed.
    let mut values = Vec::new();
    while !cursor.eat(&RIGHT_BRACE) {
        let key = cursor.expect_spanned(&DOTTED_IDENTIFIER, "enum value name")?;
        let value = if cursor.eat(&EQUALS) {
            Some(parse_enum_expr(cursor)?)
        } else {
            None
        };
        values.push(RawEnumVal { key, value });
        if !cursor.eat(&COMMA) {
            cursor.expect(&RIGHT_BRACE, "\",\" or \"}\"")?;
            break;
        }
    }

    Ok(RawEnum { kind, name, underlying, metadata, values })
}

fn parse_enum_expr(cursor: &mut Cursor) -> Result<EnumValueExpr, FbsError> {
    let mut terms = vec![parse_enum_term(cursor)?];
    while cursor.eat(&PIPE) {
        terms.push(parse_enum_term(cursor)?);
    }
    if terms.len() == 1 {
        Ok(terms.remove(0))
    } else {
        Ok(EnumValueExpr::Or(terms))
    }
}

fn parse_enum_term(cursor: &mut Cursor) -> Result<EnumValueExpr, FbsError> {
    let lhs = parse_enum_atom(cursor)?;
    if cursor.eat(&SHIFT_LEFT) {
        let rhs = parse_enum_atom(cursor)?;
        return Ok(EnumValueExpr::Shl(Box::new(lhs), Box::new(rhs)));
    }
    Ok(lhs)
}

fn parse_enum_atom(cursor: &mut Cursor) -> Result<EnumValueExpr, FbsError> {
    let tok = cursor.current();
    if cursor.eat(&NUMBER) {
        Ok(EnumValueExpr::Number(tok.text.clone()))
    } else if cursor.eat(&DOTTED_IDENTIFIER) {
        Ok(EnumValueExpr::Ref(tok.text.clone()))
    } else {
        Err(cursor.expected("integer or enum value name"))
    }
}

fn parse_metadata(cursor: &mut Cursor) -> Result<Vec<MetaItem>, FbsError> {
    let mut items = Vec::new();
    if !cursor.eat(&LEFT_PAREN) {
        return Ok(items);
    }
    loop {
        let key = cursor.expect(&IDENTIFIER, "attribute name")?;
        let value = if cursor.eat(&COLON) {
            Some(parse_literal(cursor)?)
        } else {
            None
        };
        items.push(MetaItem { key: key.text.clone(), value });
        if !cursor.eat(&COMMA) {
            cursor.expect(&RIGHT_PAREN, "\",\" or \")\"")?;
            return Ok(items);
        }
    }
}

fn parse_literal(cursor: &mut Cursor) -> Result<Literal, FbsError> {
    let tok = cursor.current();
    if STRING.is_match(&tok.text) {
        let value = cursor.expect_string()?;
        Ok(Literal::Str(value.text))
    } else if cursor.eat(&NUMBER) {
        Ok(Literal::Number(tok.text.clone()))
    } else if cursor.eat(&DOTTED_IDENTIFIER) {
        Ok(Literal::Ident(tok.text.clone()))
    } else {
        Err(cursor.expected("identifier, number or string"))
    }
}

/// Strips the surrounding quotes and resolves backslash escapes.
fn unquote(text: &str) -> String {
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn describe(tok: &Token) -> String {
    if tok.text.is_empty() {
        "end of file".to_string()
    } else {
        quote(&tok.text)
    }
}

struct Cursor<'a> {
    tokens: &'a [Token],
    index:  usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token]) -> Result<Self, FbsError> {
        if tokens.is_empty() {
            return Err(error("Expected at least an end-of-file token", 0, 0));
        }
        Ok(Cursor { tokens, index: 0 })
    }

    /// Never runs past the trailing EOF token.
    fn current(&self) -> &'a Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.index.min(last)]
    }

    fn eat(&mut self, test: &Regex) -> bool {
        if test.is_match(&self.current().text) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, test: &Regex, expected: &str) -> Result<&'a Token, FbsError> {
        let tok = self.current();
        if !self.eat(test) {
            return Err(self.expected(expected));
        }
        Ok(tok)
    }

    fn expect_spanned(&mut self, test: &Regex, expected: &str) -> Result<Spanned, FbsError> {
        let tok = self.expect(test, expected)?;
        Ok(Spanned {
            text:   tok.text.clone(),
            line:   tok.line,
            column: tok.column,
        })
    }

    fn expect_string(&mut self) -> Result<Spanned, FbsError> {
        let tok = self.expect(&STRING, "string")?;
        Ok(Spanned {
            text:   unquote(&tok.text),
            line:   tok.line,
            column: tok.column,
        })
    }

    fn expected(&self, expected: &str) -> FbsError {
        let tok = self.current();
        error(
            &format!("Expected {} but found {}", expected, describe(tok)),
            tok.line,
            tok.column,
        )
    }
}
