use serde::Serialize;
use std::fmt;

/// Built-in scalar types, in the order the schema language lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Bool,
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Long,
    ULong,
    Double,
    String,
}

impl ScalarType {
    pub fn from_name(name: &str) -> Option<ScalarType> {
        let scalar = match name {
            "bool"   => ScalarType::Bool,
            "byte"   => ScalarType::Byte,
            "ubyte"  => ScalarType::UByte,
            "short"  => ScalarType::Short,
            "ushort" => ScalarType::UShort,
            "int"    => ScalarType::Int,
            "uint"   => ScalarType::UInt,
            "float"  => ScalarType::Float,
            "long"   => ScalarType::Long,
            "ulong"  => ScalarType::ULong,
            "double" => ScalarType::Double,
            "string" => ScalarType::String,
            _ => return None,
        };
        Some(scalar)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::Bool   => "bool",
            ScalarType::Byte   => "byte",
            ScalarType::UByte  => "ubyte",
            ScalarType::Short  => "short",
            ScalarType::UShort => "ushort",
            ScalarType::Int    => "int",
            ScalarType::UInt   => "uint",
            ScalarType::Float  => "float",
            ScalarType::Long   => "long",
            ScalarType::ULong  => "ulong",
            ScalarType::Double => "double",
            ScalarType::String => "string",
        }
    }

    /// Integral types are the only legal enum underlying types.
    pub fn is_integral(&self) -> bool {
        self.int_range().is_some()
    }

    /// Inclusive value range of an integral type.
    pub fn int_range(&self) -> Option<(i128, i128)> {
        match self {
            ScalarType::Byte   => Some((i8::MIN.into(), i8::MAX.into())),
            ScalarType::UByte  => Some((0, u8::MAX.into())),
            ScalarType::Short  => Some((i16::MIN.into(), i16::MAX.into())),
            ScalarType::UShort => Some((0, u16::MAX.into())),
            ScalarType::Int    => Some((i32::MIN.into(), i32::MAX.into())),
            ScalarType::UInt   => Some((0, u32::MAX.into())),
            ScalarType::Long   => Some((i64::MIN.into(), i64::MAX.into())),
            ScalarType::ULong  => Some((0, u64::MAX.into())),
            ScalarType::Bool | ScalarType::Float | ScalarType::Double | ScalarType::String => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A piece of source text together with where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

/// A value written after `=` or `:`. Strings are stored unquoted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Literal {
    Ident(String),
    Number(String),
    Str(String),
}

impl Literal {
    pub fn as_str(&self) -> &str {
        match self {
            Literal::Ident(s) | Literal::Number(s) | Literal::Str(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaItem {
    pub key:   String,
    pub value: Option<Literal>,
}

/// Right-hand side of an enum value: `1`, `0x10`, `1 << 3`, `A | B`.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumValueExpr {
    Number(String),
    Ref(String),
    Shl(Box<EnumValueExpr>, Box<EnumValueExpr>),
    Or(Vec<EnumValueExpr>),
}

impl fmt::Display for EnumValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumValueExpr::Number(n) | EnumValueExpr::Ref(n) => f.write_str(n),
            EnumValueExpr::Shl(lhs, rhs) => write!(f, "{} << {}", lhs, rhs),
            EnumValueExpr::Or(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", term)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompoundKind {
    Table,
    Struct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumKind {
    Enum,
    Union,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub name:      Spanned,
    pub type_name: String,
    pub is_array:  bool,
    pub default:   Option<Literal>,
    pub metadata:  Vec<MetaItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawCompound {
    pub kind:     CompoundKind,
    pub name:     Spanned,
    pub metadata: Vec<MetaItem>,
    pub fields:   Vec<RawField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawEnumVal {
    pub key:   Spanned,
    pub value: Option<EnumValueExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawEnum {
    pub kind:       EnumKind,
    pub name:       Spanned,
    pub underlying: Option<Spanned>,
    pub metadata:   Vec<MetaItem>,
    pub values:     Vec<RawEnumVal>,
}

/// One top-level declaration, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Include(Spanned),
    Namespace(Spanned),
    Attribute(Spanned),
    Option { name: Spanned, value: Literal },
    Compound(RawCompound),
    Enum(RawEnum),
    RootType(Spanned),
    FileExtension(Spanned),
    FileIdentifier(Spanned),
}

impl Declaration {
    pub fn keyword(&self) -> &'static str {
        match self {
            Declaration::Include(_)        => "include",
            Declaration::Namespace(_)      => "namespace",
            Declaration::Attribute(_)      => "attribute",
            Declaration::Option { .. }     => "option",
            Declaration::Compound(c) => match c.kind {
                CompoundKind::Table  => "table",
                CompoundKind::Struct => "struct",
            },
            Declaration::Enum(e) => match e.kind {
                EnumKind::Enum  => "enum",
                EnumKind::Union => "union",
            },
            Declaration::RootType(_)       => "root_type",
            Declaration::FileExtension(_)  => "file_extension",
            Declaration::FileIdentifier(_) => "file_identifier",
        }
    }
}

/// Output of the grammar phase: declarations in source order, includes first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedSchema {
    pub declarations: Vec<Declaration>,
}

impl ParsedSchema {
    pub fn includes(&self) -> impl Iterator<Item = &Spanned> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Include(path) => Some(path),
            _ => None,
        })
    }
}
