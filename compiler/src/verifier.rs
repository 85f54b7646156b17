use std::collections::{HashMap, HashSet};
use crate::{
    error::FbsError,
    registry::{ScalarMatch, TypeKind},
    schema::{CompoundDecl, SchemaFile, TypeRef},
    types::{MetaItem, RawField, ScalarType, Spanned},
};

pub const FILE_IDENTIFIER_LENGTH: usize = 4;
pub const BIT_FLAGS: &str = "bit_flags";

/// Fails if a file-level singleton (`root_type`, `file_extension`,
/// `file_identifier`) was already declared, even with the same value.
pub fn check_singleton(slot: &Option<String>, name: &'static str) -> Result<(), FbsError> {
    match slot {
        Some(previous) => Err(FbsError::DuplicateSingleton {
            name,
            previous: previous.clone(),
        }),
        None => Ok(()),
    }
}

pub fn verify_file_identifier(value: &str) -> Result<(), FbsError> {
    let length = value.len();
    if length != FILE_IDENTIFIER_LENGTH {
        return Err(FbsError::InvalidFileIdentifierLength {
            value: value.to_string(),
            length,
        });
    }
    Ok(())
}

/// Resolves a `root_type` target to its fully-qualified name. Scalars never
/// qualify as root types, and the target must be a table.
pub fn verify_root_type(file: &SchemaFile, name: &str) -> Result<String, FbsError> {
    let qualified = file.namespace.qualify(name, ScalarMatch::Exclude);
    let entry = file.types.resolve(&qualified)?;
    if entry.kind != TypeKind::Table {
        return Err(FbsError::InvalidRootType { name: qualified });
    }
    Ok(qualified)
}

pub fn verify_enum_underlying(enum_name: &str, underlying: Option<&Spanned>) -> Result<Option<ScalarType>, FbsError> {
    let Some(underlying) = underlying else {
        return Ok(None);
    };
    match ScalarType::from_name(&underlying.text) {
        Some(scalar) if scalar.is_integral() => Ok(Some(scalar)),
        _ => Err(FbsError::InvalidEnumUnderlyingType {
            name:       enum_name.to_string(),
            underlying: underlying.text.clone(),
        }),
    }
}

/// Returns whether the enum is a bit-flag set. `(bit_flags)` is the only
/// accepted enum metadata.
pub fn verify_enum_options(enum_name: &str, metadata: &[MetaItem]) -> Result<bool, FbsError> {
    match metadata {
        [] => Ok(false),
        [MetaItem { key, value: None }] if key == BIT_FLAGS => Ok(true),
        _ => Err(FbsError::InvalidEnumOption {
            name: enum_name.to_string(),
        }),
    }
}

pub fn verify_enum_value(enum_name: &str, key: &str, value: i128, storage: ScalarType) -> Result<i128, FbsError> {
    let (min, max) = storage.int_range().unwrap_or((i32::MIN.into(), i32::MAX.into()));
    if value < min || value > max {
        return Err(FbsError::InvalidEnumValue {
            name:   enum_name.to_string(),
            key:    key.to_string(),
            reason: format!("{} does not fit in {} ({}..={})", value, storage, min, max),
        });
    }
    Ok(value)
}

pub fn verify_unique_fields(definition: &str, fields: &[RawField]) -> Result<(), FbsError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name.text.as_str()) {
            return Err(FbsError::DuplicateField {
                definition: definition.to_string(),
                field:      field.name.text.clone(),
            });
        }
    }
    Ok(())
}

/// Runs after the last declaration of a file, since fields and union members
/// may refer to types declared further down.
pub fn verify_references(file: &SchemaFile) -> Result<(), FbsError> {
    let resolves = |name: &str| -> Result<(), FbsError> {
        match file.types.get(name) {
            Some(entry) if entry.kind.is_type() => Ok(()),
            _ => Err(FbsError::UndefinedType { name: name.to_string() }),
        }
    };

    for def in file.tables.iter().chain(&file.structs) {
        for field in &def.fields {
            if let TypeRef::Named(ref target) = field.element {
                resolves(target)?;
            }
        }
    }
    for union in &file.unions {
        for member in &union.members {
            resolves(&member.fully_qualified_name)?;
        }
    }
    Ok(())
}

/// Structs are stored inline, so a struct may not contain itself, directly
/// or through other structs.
pub fn verify_struct_recursion(file: &SchemaFile) -> Result<(), FbsError> {
    let definitions_map: HashMap<&str, &CompoundDecl> = file
        .structs
        .iter()
        .map(|s| (s.fully_qualified_name.as_str(), s))
        .collect();

    // 1 = on the current path, 2 = finished
    let mut state: HashMap<String, u8> = HashMap::new();
    fn check_recursion(
        name: &str,
        definitions_map: &HashMap<&str, &CompoundDecl>,
        state: &mut HashMap<String, u8>,
    ) -> Result<(), FbsError> {
        let definition = match definitions_map.get(name) {
            Some(def) => def,
            None => return Ok(()),
        };
        match state.get(name) {
            Some(1) => {
                return Err(FbsError::RecursiveStruct {
                    name: name.to_string(),
                });
            }
            Some(2) => return Ok(()),
            _ => {}
        }
        state.insert(name.to_string(), 1);
        for field in &definition.fields {
            if let TypeRef::Named(ref ty) = field.element {
                check_recursion(ty, definitions_map, state)?;
            }
        }
        state.insert(name.to_string(), 2);
        Ok(())
    }

    for def in &file.structs {
        check_recursion(&def.fully_qualified_name, &definitions_map, &mut state)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Literal;

    fn spanned(text: &str) -> Spanned {
        Spanned { text: text.into(), line: 1, column: 1 }
    }

    #[test]
    fn test_singleton_is_rejected_even_when_identical() {
        assert!(check_singleton(&None, "root_type").is_ok());
        let err = check_singleton(&Some("Game.Monster".into()), "root_type").unwrap_err();
        assert_eq!(err.to_string(), "root_type already set as \"Game.Monster\"");
    }

    #[test]
    fn test_file_identifier_length() {
        assert!(verify_file_identifier("ABCD").is_ok());
        assert!(matches!(
            verify_file_identifier("AB"),
            Err(FbsError::InvalidFileIdentifierLength { length: 2, .. })
        ));
        assert!(verify_file_identifier("ABCDE").is_err());
        // Four characters, five bytes.
        assert!(matches!(
            verify_file_identifier("ÄBCD"),
            Err(FbsError::InvalidFileIdentifierLength { length: 5, .. })
        ));
    }

    #[test]
    fn test_enum_underlying_must_be_integral() {
        assert_eq!(verify_enum_underlying("Color", None).unwrap(), None);
        assert_eq!(
            verify_enum_underlying("Color", Some(&spanned("ushort"))).unwrap(),
            Some(ScalarType::UShort)
        );
        for bad in ["bool", "float", "double", "string", "Color"] {
            assert!(
                matches!(
                    verify_enum_underlying("Color", Some(&spanned(bad))),
                    Err(FbsError::InvalidEnumUnderlyingType { .. })
                ),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_enum_options() {
        let bit_flags = MetaItem { key: "bit_flags".into(), value: None };
        assert!(!verify_enum_options("E", &[]).unwrap());
        assert!(verify_enum_options("E", &[bit_flags.clone()]).unwrap());

        let other = MetaItem { key: "bit_flags".into(), value: Some(Literal::Ident("yes".into())) };
        assert!(verify_enum_options("E", &[other]).is_err());
        let extra = MetaItem { key: "id".into(), value: None };
        assert!(matches!(
            verify_enum_options("E", &[bit_flags, extra]),
            Err(FbsError::InvalidEnumOption { .. })
        ));
    }

    #[test]
    fn test_enum_value_range() {
        assert_eq!(verify_enum_value("E", "A", 255, ScalarType::UByte).unwrap(), 255);
        assert!(verify_enum_value("E", "A", 256, ScalarType::UByte).is_err());
        assert!(verify_enum_value("E", "A", -1, ScalarType::UInt).is_err());
        assert_eq!(verify_enum_value("E", "A", -128, ScalarType::Byte).unwrap(), -128);
        assert_eq!(
            verify_enum_value("E", "A", u64::MAX.into(), ScalarType::ULong).unwrap(),
            u64::MAX as i128
        );
        assert!(verify_enum_value("E", "A", i128::from(u64::MAX) + 1, ScalarType::ULong).is_err());
        assert!(verify_enum_value("E", "A", 1 << 63, ScalarType::Long).is_err());
    }
}
