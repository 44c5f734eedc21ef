//! [`Value`]: the tagged variant every other module in this crate operates
//! on. Large/shared-reference variants (blocks, dictionaries, objects,
//! functions, strings) hold an `Rc`; small variants (integers, logicals,
//! chars) are plain `Copy` payloads, per the data model's lifecycle rules.

use std::{cmp::Ordering, fmt, rc::Rc};

use num_bigint::BigInt;
use num_complex::Complex64;
use num_rational::Ratio;

use crate::{
    block::{Block, Range},
    color::Color,
    dict::Dictionary,
    function::Function,
    numeric::{IntegerValue, RationalValue},
    object::{ObjectInstance, Prototype},
    quantity::{Quantity, Unit},
};

/// A single step of a `Path`/`PathLabel`/`PathLiteral` value: `a\b\2` walks
/// field `a`, then field `b`, then index `2`.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Name(Rc<str>),
    Index(i64),
}

pub type PathSegments = Rc<Vec<PathSegment>>;

/// The three external-resource tags (`Store`, `Database`, `Socket`) are
/// opaque handles: the VM core only carries them around and prints them,
/// never opens or reads through them. The builtins that would do real I/O
/// against the resource a handle names are out of scope for the VM core
/// (see the system overview's out-of-scope list) and are left as the seam a
/// pluggable capability would fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Store,
    Database,
    Socket,
}

#[derive(Debug, Clone)]
pub struct ResourceHandle {
    pub kind: ResourceKind,
    pub id: u64,
    pub label: Rc<str>,
}

impl PartialEq for ResourceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ResourceKind::Store => "store",
            ResourceKind::Database => "database",
            ResourceKind::Socket => "socket",
        };
        write!(f, "<{kind}:{}>", self.label)
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Logical(bool),
    Integer(IntegerValue),
    Floating(f64),
    Complex(Complex64),
    Rational(RationalValue),
    Version(Rc<str>),
    Type(Rc<str>),
    Char(char),
    String(Rc<str>),
    Word(Rc<str>),
    Literal(Rc<str>),
    Label(Rc<str>),
    Attribute(Rc<str>),
    AttributeLabel(Rc<str>),
    Path(PathSegments),
    PathLabel(PathSegments),
    PathLiteral(PathSegments),
    Symbol(Rc<str>),
    SymbolLiteral(Rc<str>),
    Regex(Rc<regex::Regex>),
    Color(Color),
    Date(chrono::DateTime<chrono::Utc>),
    Quantity(Quantity),
    Unit(Unit),
    Binary(Rc<Vec<u8>>),
    Inline(Block),
    Block(Block),
    Range(Range),
    Dictionary(Dictionary),
    Object(ObjectInstance),
    Store(Rc<ResourceHandle>),
    Function(Function),
    Bytecode(Rc<crate::bytecode::code::Code>),
    Database(Rc<ResourceHandle>),
    Socket(Rc<ResourceHandle>),
    Nothing,
    /// The wildcard type tag used by `.as` schemas to mean "no constraint";
    /// never produced by the parser or evaluator as a runtime value.
    Any,
}

impl Value {
    #[must_use]
    pub fn integer_small(v: i64) -> Self {
        Self::Integer(IntegerValue::Small(v))
    }

    #[must_use]
    pub fn integer_big(v: BigInt) -> Self {
        Self::Integer(IntegerValue::big(v))
    }

    #[must_use]
    pub fn rational(num: i64, den: i64) -> Self {
        Self::Rational(RationalValue::new(num, den))
    }

    #[must_use]
    pub fn array(items: Vec<Value>) -> Self {
        Self::Block(Block::new(items))
    }

    #[must_use]
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Self::String(s.into())
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Logical(_) => "logical",
            Self::Integer(_) => "integer",
            Self::Floating(_) => "floating",
            Self::Complex(_) => "complex",
            Self::Rational(_) => "rational",
            Self::Version(_) => "version",
            Self::Type(_) => "type",
            Self::Char(_) => "char",
            Self::String(_) => "string",
            Self::Word(_) => "word",
            Self::Literal(_) => "literal",
            Self::Label(_) => "label",
            Self::Attribute(_) => "attribute",
            Self::AttributeLabel(_) => "attributeLabel",
            Self::Path(_) => "path",
            Self::PathLabel(_) => "pathLabel",
            Self::PathLiteral(_) => "pathLiteral",
            Self::Symbol(_) => "symbol",
            Self::SymbolLiteral(_) => "symbolLiteral",
            Self::Regex(_) => "regex",
            Self::Color(_) => "color",
            Self::Date(_) => "date",
            Self::Quantity(_) => "quantity",
            Self::Unit(_) => "unit",
            Self::Binary(_) => "binary",
            Self::Inline(_) => "inline",
            Self::Block(_) => "block",
            Self::Range(_) => "range",
            Self::Dictionary(_) => "dictionary",
            Self::Object(_) => "object",
            Self::Store(_) => "store",
            Self::Function(_) => "function",
            Self::Bytecode(_) => "bytecode",
            Self::Database(_) => "database",
            Self::Socket(_) => "socket",
            Self::Nothing => "nothing",
            Self::Any => "any",
        }
    }

    #[must_use]
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Self::Block(b) | Self::Inline(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(IntegerValue::Small(v)) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Word(s) | Self::Literal(s) | Self::Label(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn truthy(&self) -> bool {
        !matches!(self, Self::Null | Self::Nothing | Self::Logical(false))
    }

    fn numeric_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(v.to_f64()),
            Self::Floating(v) => Some(*v),
            Self::Rational(v) => Some(v.to_f64()),
            _ => None,
        }
    }

    /// Structural equality within a variant; numeric promotion across
    /// `Integer`/`Floating`/`Rational`; false for every other cross-variant
    /// pair, per the data model's equality invariant.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        use Value::{
            Any, Attribute, AttributeLabel, Binary, Block as BlockV, Bytecode, Char, Color as ColorV,
            Complex as ComplexV, Database, Date as DateV, Dictionary as DictV, Function as FnV, Inline, Integer,
            Label, Literal, Logical, Nothing, Null, Object as ObjV, Path, PathLabel, PathLiteral, Quantity as QtyV,
            Range as RangeV, Rational, Regex as RegexV, Socket, Store, String as StringV, Symbol, SymbolLiteral,
            Type, Unit as UnitV, Version, Word,
        };
        match (self, other) {
            (Integer(_) | Self::Floating(_) | Rational(_), Integer(_) | Self::Floating(_) | Rational(_)) => {
                match (self, other) {
                    (Integer(a), Integer(b)) => a == b,
                    (Rational(a), Rational(b)) => a == b,
                    _ => self.numeric_f64() == other.numeric_f64(),
                }
            }
            (Null, Null) | (Nothing, Nothing) | (Any, Any) => true,
            (Logical(a), Logical(b)) => a == b,
            (ComplexV(a), ComplexV(b)) => a == b,
            (Version(a), Version(b))
            | (Type(a), Type(b))
            | (StringV(a), StringV(b))
            | (Word(a), Word(b))
            | (Literal(a), Literal(b))
            | (Label(a), Label(b))
            | (Attribute(a), Attribute(b))
            | (AttributeLabel(a), AttributeLabel(b))
            | (Symbol(a), Symbol(b))
            | (SymbolLiteral(a), SymbolLiteral(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (Path(a), Path(b)) | (PathLabel(a), PathLabel(b)) | (PathLiteral(a), PathLiteral(b)) => a == b,
            (RegexV(a), RegexV(b)) => a.as_str() == b.as_str(),
            (ColorV(a), ColorV(b)) => a == b,
            (DateV(a), DateV(b)) => a == b,
            (QtyV(a), QtyV(b)) => a == b,
            (UnitV(a), UnitV(b)) => a == b,
            (Binary(a), Binary(b)) => a == b,
            (BlockV(a), BlockV(b)) | (Inline(a), Inline(b)) => a == b,
            (RangeV(a), RangeV(b)) => a == b,
            (DictV(a), DictV(b)) => a == b,
            (ObjV(a), ObjV(b)) => a == b,
            (FnV(a), FnV(b)) => a == b,
            (Store(a), Store(b)) | (Database(a), Database(b)) | (Socket(a), Socket(b)) => Rc::ptr_eq(a, b),
            (Bytecode(a), Bytecode(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Partial ordering: numeric across `Integer`/`Floating`/`Rational`,
    /// lexicographic for text/char, structural via `Ord` for the others that
    /// support it; `None` ("incomparable") for everything else.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        use Value::{Char, Integer, Literal, Rational, String as StringV, Word};
        match (self, other) {
            (Integer(_) | Self::Floating(_) | Rational(_), Integer(_) | Self::Floating(_) | Rational(_)) => {
                match (self, other) {
                    (Integer(a), Integer(b)) => Some(a.cmp(b)),
                    (Rational(a), Rational(b)) => Some(a.cmp(b)),
                    _ => self.numeric_f64().and_then(|a| other.numeric_f64().map(|b| a.partial_cmp(&b))).flatten(),
                }
            }
            (StringV(a), StringV(b)) | (Word(a), Word(b)) | (Literal(a), Literal(b)) => Some(a.cmp(b)),
            (Char(a), Char(b)) => Some(a.cmp(b)),
            _ if self.equals(other) => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// The round-trippable source form used by `codify`/printing a block's
    /// elements. `pretty` adds spacing for readability; `safe_strings`
    /// escapes control characters in string literals.
    #[must_use]
    pub fn codify(&self, safe_strings: bool) -> String {
        match self {
            Self::String(s) if safe_strings => format!("{:?}", s.as_ref()),
            Self::String(s) => format!("\"{s}\""),
            Self::Char(c) => format!("`{c}`"),
            Self::Word(s) => s.to_string(),
            Self::Literal(s) => format!("'{s}"),
            Self::Label(s) => format!("{s}:"),
            Self::Attribute(s) => format!(".{s}"),
            Self::AttributeLabel(s) => format!(".{s}:"),
            Self::Symbol(s) => s.to_string(),
            Self::SymbolLiteral(s) => format!("'{s}"),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Logical(b) => write!(f, "{b}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Floating(v) => write!(f, "{v}"),
            Self::Complex(v) => write!(f, "{}+{}i", v.re, v.im),
            Self::Rational(v) => write!(f, "{v}"),
            Self::Version(v) | Self::Type(v) => write!(f, "{v}"),
            Self::Char(c) => write!(f, "{c}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Word(s) | Self::Symbol(s) => write!(f, "{s}"),
            Self::Literal(s) | Self::SymbolLiteral(s) => write!(f, "'{s}"),
            Self::Label(s) => write!(f, "{s}:"),
            Self::Attribute(s) => write!(f, ".{s}"),
            Self::AttributeLabel(s) => write!(f, ".{s}:"),
            Self::Path(p) | Self::PathLiteral(p) => write_path(f, p),
            Self::PathLabel(p) => {
                write_path(f, p)?;
                write!(f, ":")
            }
            Self::Regex(r) => write!(f, "/{}/", r.as_str()),
            Self::Color(c) => write!(f, "{c}"),
            Self::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Self::Quantity(q) => write!(f, "{q}"),
            Self::Unit(u) => write!(f, "{u}"),
            Self::Binary(b) => {
                write!(f, "0x")?;
                for byte in b.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Self::Inline(b) | Self::Block(b) => write!(f, "{b}"),
            Self::Range(r) => write!(f, "{r}"),
            Self::Dictionary(d) => write!(f, "{d}"),
            Self::Object(o) => write!(f, "{o}"),
            Self::Store(h) | Self::Database(h) | Self::Socket(h) => write!(f, "{h}"),
            Self::Function(fun) => write!(f, "{fun}"),
            Self::Bytecode(_) => write!(f, "<bytecode>"),
            Self::Nothing => write!(f, ""),
            Self::Any => write!(f, ":any"),
        }
    }
}

fn write_path(f: &mut fmt::Formatter<'_>, segments: &[PathSegment]) -> fmt::Result {
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 {
            write!(f, "\\")?;
        }
        match seg {
            PathSegment::Name(n) => write!(f, "{n}")?,
            PathSegment::Index(idx) => write!(f, "{idx}")?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_equality_crosses_variants() {
        assert!(Value::integer_small(2).equals(&Value::Floating(2.0)));
    }

    #[test]
    fn cross_kind_non_numeric_never_equal() {
        assert!(!Value::integer_small(1).equals(&Value::Logical(true)));
    }

    #[test]
    fn incomparable_pairs_return_none() {
        assert_eq!(Value::Null.compare(&Value::integer_small(1)), None);
    }

    #[test]
    fn comparable_numeric_orders_across_variants() {
        assert_eq!(Value::integer_small(1).compare(&Value::Floating(2.0)), Some(Ordering::Less));
    }

    #[test]
    fn truthy_treats_null_nothing_and_false_as_falsy() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Nothing.truthy());
        assert!(!Value::Logical(false).truthy());
        assert!(Value::integer_small(0).truthy());
    }
}
