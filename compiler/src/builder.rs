//! Turns raw enum, union, table and struct declarations into typed AST nodes,
//! registering each declared name in the file's type registry.

use std::collections::HashMap;
use tracing::warn;
use crate::{
    error::FbsError,
    registry::{ScalarMatch, TypeKind},
    schema::{CompoundDecl, EnumDecl, EnumVal, FieldDecl, SchemaFile, TypeRef, UnionDecl, UnionMember},
    types::{CompoundKind, EnumValueExpr, RawCompound, RawEnum, RawField, ScalarType},
    verifier::{verify_enum_options, verify_enum_underlying, verify_enum_value, verify_unique_fields},
};

pub fn build_enum(file: &mut SchemaFile, raw: &RawEnum) -> Result<EnumDecl, FbsError> {
    let name = raw.name.text.clone();
    let fully_qualified_name = file.namespace.qualify(&name, ScalarMatch::Exclude);
    file.types.register(fully_qualified_name.clone(), TypeKind::Enum, &file.path)?;

    let underlying = verify_enum_underlying(&name, raw.underlying.as_ref())?;
    let bit_flags = verify_enum_options(&name, &raw.metadata)?;
    let storage = underlying.unwrap_or(ScalarType::Int);

    let mut known: HashMap<&str, i128> = HashMap::new();
    let mut values = Vec::with_capacity(raw.values.len());
    let mut next: i128 = 0;

    for raw_val in &raw.values {
        let key = raw_val.key.text.as_str();
        let resolved = match &raw_val.value {
            Some(expr) => evaluate(expr, &known).map_err(|reason| FbsError::InvalidEnumValue {
                name:   name.clone(),
                key:    key.to_string(),
                reason,
            })?,
            None => next,
        };
        let value = verify_enum_value(&name, key, resolved, storage)?;

        file.types.register(
            format!("{}.{}", fully_qualified_name, key),
            TypeKind::EnumKey { value },
            &file.path,
        )?;
        known.insert(key, resolved);
        next = resolved + 1;

        values.push(EnumVal {
            key:      key.to_string(),
            explicit: raw_val.value.as_ref().map(|v| v.to_string()),
            value,
        });
    }

    Ok(EnumDecl {
        name,
        fully_qualified_name,
        line: raw.name.line,
        column: raw.name.column,
        underlying,
        bit_flags,
        values,
    })
}

pub fn build_union(file: &mut SchemaFile, raw: &RawEnum) -> Result<UnionDecl, FbsError> {
    let name = raw.name.text.clone();
    let fully_qualified_name = file.namespace.qualify(&name, ScalarMatch::Exclude);
    file.types.register(fully_qualified_name.clone(), TypeKind::Union, &file.path)?;

    if let Some(underlying) = &raw.underlying {
        warn!(union = %name, underlying = %underlying.text, "ignoring underlying type on union");
    }
    if !raw.metadata.is_empty() {
        warn!(union = %name, "ignoring metadata on union");
    }

    let members = raw
        .values
        .iter()
        .map(|member| {
            if let Some(value) = &member.value {
                warn!(union = %name, member = %member.key.text, %value, "ignoring explicit union member value");
            }
            UnionMember {
                name:                 member.key.text.clone(),
                fully_qualified_name: file.namespace.qualify(&member.key.text, ScalarMatch::Exclude),
            }
        })
        .collect();

    Ok(UnionDecl {
        name,
        fully_qualified_name,
        line: raw.name.line,
        column: raw.name.column,
        members,
    })
}

/// Builds a table or struct. Field types are recorded here and checked once
/// the whole file has been read.
pub fn build_compound(file: &mut SchemaFile, raw: &RawCompound) -> Result<CompoundDecl, FbsError> {
    let name = raw.name.text.clone();
    let fully_qualified_name = file.namespace.qualify(&name, ScalarMatch::Exclude);
    let kind = match raw.kind {
        CompoundKind::Table  => TypeKind::Table,
        CompoundKind::Struct => TypeKind::Struct,
    };
    file.types.register(fully_qualified_name.clone(), kind, &file.path)?;

    verify_unique_fields(&fully_qualified_name, &raw.fields)?;
    let scope: &SchemaFile = file;
    let fields = raw.fields.iter().map(|f| build_field(scope, f)).collect();

    Ok(CompoundDecl {
        name,
        fully_qualified_name,
        kind: raw.kind,
        line: raw.name.line,
        column: raw.name.column,
        metadata: raw.metadata.clone(),
        fields,
    })
}

fn build_field(file: &SchemaFile, raw: &RawField) -> FieldDecl {
    let element = match ScalarType::from_name(&raw.type_name) {
        Some(scalar) => TypeRef::Scalar(scalar),
        None => TypeRef::Named(file.namespace.qualify(&raw.type_name, ScalarMatch::Exclude)),
    };
    FieldDecl {
        name:      raw.name.text.clone(),
        line:      raw.name.line,
        column:    raw.name.column,
        type_name: raw.type_name.clone(),
        element,
        is_array:  raw.is_array,
        default:   raw.default.clone(),
        metadata:  raw.metadata.clone(),
    }
}

/// Evaluates an enum value expression against the keys declared so far.
fn evaluate(expr: &EnumValueExpr, known: &HashMap<&str, i128>) -> Result<i128, String> {
    match expr {
        EnumValueExpr::Number(text) => parse_integer(text),
        EnumValueExpr::Ref(key) => known
            .get(key.as_str())
            .copied()
            .ok_or_else(|| format!("unknown enum value \"{}\"", key)),
        EnumValueExpr::Shl(lhs, rhs) => {
            let lhs = evaluate(lhs, known)?;
            let rhs = evaluate(rhs, known)?;
            if !(0..64).contains(&rhs) {
                return Err(format!("shift amount {} out of range", rhs));
            }
            lhs.checked_mul(1i128 << rhs)
                .ok_or_else(|| format!("{} << {} overflows", lhs, rhs))
        }
        EnumValueExpr::Or(terms) => terms
            .iter()
            .try_fold(0i128, |acc, term| Ok(acc | evaluate(term, known)?)),
    }
}

fn parse_integer(text: &str) -> Result<i128, String> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i128::from_str_radix(hex, 16),
        None => digits.parse::<i128>(),
    }
    .map_err(|_| format!("\"{}\" is not an integer", text))?;
    Ok(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schema_text;
    use crate::types::Declaration;
    use std::path::Path;

    fn raw_enum(text: &str) -> RawEnum {
        match parse_schema_text(text).unwrap().declarations.remove(0) {
            Declaration::Enum(e) => e,
            other => panic!("unexpected declaration {:?}", other),
        }
    }

    fn raw_compound(text: &str) -> RawCompound {
        match parse_schema_text(text).unwrap().declarations.remove(0) {
            Declaration::Compound(c) => c,
            other => panic!("unexpected declaration {:?}", other),
        }
    }

    #[test]
    fn test_enum_values_auto_increment() {
        let mut file = SchemaFile::new(Path::new("e.fbs"));
        let e = build_enum(&mut file, &raw_enum("enum E : short { A, B = 10, C, D = -3, F }")).unwrap();
        let values: Vec<(&str, i128)> = e.values.iter().map(|v| (v.key.as_str(), v.value)).collect();
        assert_eq!(values, vec![("A", 0), ("B", 10), ("C", 11), ("D", -3), ("F", -2)]);
        assert_eq!(e.values[0].explicit, None);
        assert_eq!(e.values[1].explicit.as_deref(), Some("10"));
        assert_eq!(e.underlying, Some(ScalarType::Short));
        assert!(file.types.contains("E.C"));
        assert_eq!(file.types.get("E.B").unwrap().kind, TypeKind::EnumKey { value: 10 });
    }

    #[test]
    fn test_enum_expressions() {
        let mut file = SchemaFile::new(Path::new("e.fbs"));
        let e = build_enum(
            &mut file,
            &raw_enum("enum Perm : ubyte (bit_flags) { Read = 1 << 0, Write = 1 << 1, Exec = 0x4, All = Read | Write | Exec }"),
        )
        .unwrap();
        assert!(e.bit_flags);
        assert_eq!(e.value_of("All"), Some(7));
        assert_eq!(e.value_of("Exec"), Some(4));
    }

    #[test]
    fn test_ulong_bit_flags_use_the_full_range() {
        let mut file = SchemaFile::new(Path::new("e.fbs"));
        let e = build_enum(
            &mut file,
            &raw_enum("enum Big : ulong (bit_flags) { Low = 1, Top = 1 << 63, Max = 0xFFFFFFFFFFFFFFFF }"),
        )
        .unwrap();
        assert_eq!(e.value_of("Top"), Some(1i128 << 63));
        assert_eq!(e.value_of("Max"), Some(u64::MAX as i128));
        assert_eq!(file.types.get("Big.Max").unwrap().kind, TypeKind::EnumKey { value: u64::MAX as i128 });

        let mut file = SchemaFile::new(Path::new("e.fbs"));
        let err = build_enum(&mut file, &raw_enum("enum Big : long { Top = 1 << 63 }")).unwrap_err();
        assert!(matches!(err, FbsError::InvalidEnumValue { ref key, .. } if key == "Top"));
    }

    #[test]
    fn test_shift_overflow_is_rejected() {
        let mut file = SchemaFile::new(Path::new("e.fbs"));
        let err = build_enum(&mut file, &raw_enum("enum E : long { A = 0x20000000000000000 << 63 }")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for \"E.A\": 36893488147419103232 << 63 overflows"
        );
    }

    #[test]
    fn test_enum_value_errors() {
        let mut file = SchemaFile::new(Path::new("e.fbs"));
        let err = build_enum(&mut file, &raw_enum("enum E : ubyte { A = 255, B }")).unwrap_err();
        assert!(matches!(err, FbsError::InvalidEnumValue { ref key, .. } if key == "B"));

        let mut file = SchemaFile::new(Path::new("e.fbs"));
        let err = build_enum(&mut file, &raw_enum("enum E { A = Missing }")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for \"E.A\": unknown enum value \"Missing\"");

        let mut file = SchemaFile::new(Path::new("e.fbs"));
        let err = build_enum(&mut file, &raw_enum("enum E { A = 1.5 }")).unwrap_err();
        assert!(matches!(err, FbsError::InvalidEnumValue { .. }));
    }

    #[test]
    fn test_duplicate_enum_key_is_a_duplicate_type() {
        let mut file = SchemaFile::new(Path::new("e.fbs"));
        let err = build_enum(&mut file, &raw_enum("enum E { A, A }")).unwrap_err();
        assert!(matches!(err, FbsError::DuplicateType { ref name, .. } if name == "E.A"));
    }

    #[test]
    fn test_compound_fields_are_qualified() {
        let mut file = SchemaFile::new(Path::new("t.fbs"));
        file.namespace = crate::registry::Namespace::new("Game");
        let t = build_compound(
            &mut file,
            &raw_compound("table Monster { pos: Vec3; hp: short = 100; path: [Other.Vec3]; }"),
        )
        .unwrap();
        assert_eq!(t.fully_qualified_name, "Game.Monster");
        assert_eq!(t.fields[0].element, TypeRef::Named("Game.Vec3".into()));
        assert_eq!(t.fields[1].element, TypeRef::Scalar(ScalarType::Short));
        assert_eq!(t.fields[2].element, TypeRef::Named("Other.Vec3".into()));
        assert!(t.fields[2].is_array);
        assert_eq!(file.types.get("Game.Monster").unwrap().kind, TypeKind::Table);
    }

    #[test]
    fn test_duplicate_field_names_are_rejected() {
        let mut file = SchemaFile::new(Path::new("t.fbs"));
        let err = build_compound(&mut file, &raw_compound("struct P { x: int; x: float; }")).unwrap_err();
        assert_eq!(err.to_string(), "Field \"x\" is declared twice in \"P\"");
    }

    #[test]
    fn test_union_members() {
        let mut file = SchemaFile::new(Path::new("u.fbs"));
        file.namespace = crate::registry::Namespace::new("Game");
        let u = build_union(&mut file, &raw_enum("union Equipment { Weapon, Shop.Item }")).unwrap();
        let names: Vec<&str> = u.members.iter().map(|m| m.fully_qualified_name.as_str()).collect();
        assert_eq!(names, vec!["Game.Weapon", "Shop.Item"]);
        assert_eq!(file.types.get("Game.Equipment").unwrap().kind, TypeKind::Union);
    }
}
