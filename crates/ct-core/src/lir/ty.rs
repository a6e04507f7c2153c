use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ty {
    I1,
    I8,
    I16,
    I32,
    I64,
    I128,
    F32,
    F64,
    Ptr(Box<Ty>),
    Array(Box<Ty>, u64),
    Struct {
        fields: Vec<Ty>,
        packed: bool,
        name: Option<String>,
    },
    /// Reference to an entry of the module's `type_definitions`. This is how
    /// recursive structs refer to themselves.
    Named(String),
    Function {
        return_type: Box<Ty>,
        param_types: Vec<Ty>,
        is_variadic: bool,
    },
    Vector(Box<Ty>, u32),
    Void,
    Label,
    Token,
    Metadata,
}

impl Ty {
    pub fn ptr(inner: Ty) -> Self {
        Ty::Ptr(Box::new(inner))
    }

    /// The untyped byte pointer (`i8*`) used wherever a generic pointer is expected.
    pub fn i8_ptr() -> Self {
        Ty::ptr(Ty::I8)
    }

    pub fn array(inner: Ty, len: u64) -> Self {
        Ty::Array(Box::new(inner), len)
    }

    pub fn named_struct(name: impl Into<String>, fields: Vec<Ty>) -> Self {
        Ty::Struct {
            fields,
            packed: false,
            name: Some(name.into()),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Ty::Named(name.into())
    }

    pub fn anonymous_struct(fields: Vec<Ty>) -> Self {
        Ty::Struct {
            fields,
            packed: false,
            name: None,
        }
    }

    pub fn function(return_type: Ty, param_types: Vec<Ty>) -> Self {
        Ty::Function {
            return_type: Box::new(return_type),
            param_types,
            is_variadic: false,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Ty::I1 | Ty::I8 | Ty::I16 | Ty::I32 | Ty::I64 | Ty::I128
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Ty::F32 | Ty::F64)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Ty::Ptr(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Ty::Void)
    }

    /// The type a pointer points to, or `None` for non-pointer types.
    pub fn pointee(&self) -> Option<&Ty> {
        match self {
            Ty::Ptr(inner) => Some(inner),
            _ => None,
        }
    }

    /// Deterministic, structure-sensitive rendering of this type, spelled
    /// the way LLVM prints a type on its own.
    ///
    /// A named struct at the top level is followed by `= type` and its body,
    /// so two structs sharing a name but differing in layout never collide.
    /// Named structs nested inside it are referred to by name only. A bare
    /// [`Ty::Named`] cannot be expanded without its module; see
    /// `LirModule::type_string`.
    pub fn canonical_string(&self) -> String {
        match self {
            Ty::Struct {
                fields,
                packed,
                name: Some(name),
            } => format!("%{} = type {}", name, struct_body(fields, *packed)),
            _ => self.to_string(),
        }
    }

    /// Text after `%name = type` in a type definition.
    pub fn definition_body(&self) -> String {
        match self {
            Ty::Struct { fields, packed, .. } => struct_body(fields, *packed),
            _ => self.to_string(),
        }
    }

    pub fn size_in_bits(&self) -> Option<u32> {
        match self {
            Ty::I1 => Some(1),
            Ty::I8 => Some(8),
            Ty::I16 => Some(16),
            Ty::I32 => Some(32),
            Ty::I64 => Some(64),
            Ty::I128 => Some(128),
            Ty::F32 => Some(32),
            Ty::F64 => Some(64),
            Ty::Ptr(_) => Some(64),
            Ty::Array(element_ty, count) => element_ty
                .size_in_bits()
                .and_then(|size| u32::try_from(*count).ok().map(|count| size * count)),
            _ => None,
        }
    }
}

impl Display for Ty {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Ty::I1 => write!(f, "i1"),
            Ty::I8 => write!(f, "i8"),
            Ty::I16 => write!(f, "i16"),
            Ty::I32 => write!(f, "i32"),
            Ty::I64 => write!(f, "i64"),
            Ty::I128 => write!(f, "i128"),
            Ty::F32 => write!(f, "float"),
            Ty::F64 => write!(f, "double"),
            Ty::Void => write!(f, "void"),
            Ty::Label => write!(f, "label"),
            Ty::Token => write!(f, "token"),
            Ty::Metadata => write!(f, "metadata"),
            Ty::Ptr(inner) => write!(f, "{}*", inner),
            Ty::Array(inner, count) => write!(f, "[{} x {}]", count, inner),
            Ty::Vector(inner, count) => write!(f, "<{} x {}>", count, inner),
            Ty::Struct {
                name: Some(name), ..
            }
            | Ty::Named(name) => write!(f, "%{}", name),
            Ty::Struct { fields, packed, .. } => f.write_str(&struct_body(fields, *packed)),
            Ty::Function {
                return_type,
                param_types,
                is_variadic,
            } => {
                let mut params = param_types.iter().map(ToString::to_string).collect_vec();
                if *is_variadic {
                    params.push("...".into());
                }
                write!(f, "{} ({})", return_type, params.join(", "))
            }
        }
    }
}

fn struct_body(fields: &[Ty], packed: bool) -> String {
    let body = if fields.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", fields.iter().join(", "))
    };
    if packed {
        format!("<{}>", body)
    } else {
        body
    }
}
