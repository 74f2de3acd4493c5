//! UNO type descriptors and values as they travel over URP.

use std::fmt;

/// Wire value of a UNO type class (low seven bits of a type byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeClass {
    Void = 0,
    Char = 1,
    Boolean = 2,
    Byte = 3,
    Short = 4,
    UnsignedShort = 5,
    Long = 6,
    UnsignedLong = 7,
    Hyper = 8,
    UnsignedHyper = 9,
    Float = 10,
    Double = 11,
    String = 12,
    Type = 13,
    Any = 14,
    Enum = 15,
    Struct = 17,
    Exception = 19,
    Sequence = 20,
    Interface = 22,
}

impl TypeClass {
    const ALL: [TypeClass; 20] = [
        TypeClass::Void,
        TypeClass::Char,
        TypeClass::Boolean,
        TypeClass::Byte,
        TypeClass::Short,
        TypeClass::UnsignedShort,
        TypeClass::Long,
        TypeClass::UnsignedLong,
        TypeClass::Hyper,
        TypeClass::UnsignedHyper,
        TypeClass::Float,
        TypeClass::Double,
        TypeClass::String,
        TypeClass::Type,
        TypeClass::Any,
        TypeClass::Enum,
        TypeClass::Struct,
        TypeClass::Exception,
        TypeClass::Sequence,
        TypeClass::Interface,
    ];

    pub fn from_wire(byte: u8) -> Option<TypeClass> {
        let raw = byte & 0x7F;
        Self::ALL.iter().copied().find(|tc| *tc as u8 == raw)
    }

    /// Simple classes are encoded as a bare byte and never carry a name.
    pub fn is_simple(self) -> bool {
        (self as u8) <= TypeClass::Any as u8
    }

    /// Best-effort class for an IDL type name, used for sequence elements.
    pub fn for_name(name: &str) -> TypeClass {
        match name {
            "" | "void" => TypeClass::Void,
            "char" => TypeClass::Char,
            "boolean" => TypeClass::Boolean,
            "byte" => TypeClass::Byte,
            "short" => TypeClass::Short,
            "unsigned short" => TypeClass::UnsignedShort,
            "long" => TypeClass::Long,
            "unsigned long" => TypeClass::UnsignedLong,
            "hyper" => TypeClass::Hyper,
            "unsigned hyper" => TypeClass::UnsignedHyper,
            "float" => TypeClass::Float,
            "double" => TypeClass::Double,
            "string" => TypeClass::String,
            "type" => TypeClass::Type,
            "any" => TypeClass::Any,
            n if n.starts_with("[]") => TypeClass::Sequence,
            n => {
                // UNO naming: interfaces are module-qualified and start with X
                let last = n.rsplit('.').next().unwrap_or(n);
                if last.starts_with('X') && last.chars().nth(1).is_some_and(|c| c.is_uppercase())
                {
                    TypeClass::Interface
                } else {
                    TypeClass::Struct
                }
            }
        }
    }
}

/// A type descriptor: class plus IDL name for the non-simple classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    pub class: TypeClass,
    pub name: String,
}

impl Type {
    pub const fn simple(class: TypeClass) -> Self {
        Self {
            class,
            name: String::new(),
        }
    }

    pub fn named(class: TypeClass, name: impl Into<String>) -> Self {
        Self {
            class,
            name: name.into(),
        }
    }

    pub const fn void() -> Self {
        Self::simple(TypeClass::Void)
    }

    pub const fn boolean() -> Self {
        Self::simple(TypeClass::Boolean)
    }

    pub const fn short() -> Self {
        Self::simple(TypeClass::Short)
    }

    pub const fn long() -> Self {
        Self::simple(TypeClass::Long)
    }

    pub const fn string() -> Self {
        Self::simple(TypeClass::String)
    }

    pub const fn any() -> Self {
        Self::simple(TypeClass::Any)
    }

    pub const fn type_of_type() -> Self {
        Self::simple(TypeClass::Type)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::named(TypeClass::Interface, name)
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Self::named(TypeClass::Struct, name)
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::named(TypeClass::Enum, name)
    }

    pub fn sequence_of(element: &str) -> Self {
        Self::named(TypeClass::Sequence, format!("[]{element}"))
    }

    /// Element type of a sequence type, derived from its `[]name` form.
    pub fn element(&self) -> Option<Type> {
        let inner = self.name.strip_prefix("[]")?;
        let class = TypeClass::for_name(inner);
        Some(if class.is_simple() {
            Type::simple(class)
        } else {
            Type::named(class, inner)
        })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{:?}", self.class)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// A value that can be marshalled over URP.
#[derive(Debug, Clone, PartialEq)]
pub enum UnoValue {
    Void,
    Bool(bool),
    Byte(i8),
    Short(i16),
    UnsignedShort(u16),
    Long(i32),
    UnsignedLong(u32),
    Hyper(i64),
    UnsignedHyper(u64),
    Float(f32),
    Double(f64),
    Char(u16),
    String(String),
    Type(Type),
    Any(Box<Any>),
    Enum(i32),
    /// Struct members in declaration order, base members first.
    Struct(Vec<UnoValue>),
    Exception(UnoException),
    Sequence(Vec<UnoValue>),
    /// Object reference by OID; the empty string is the null reference.
    Interface(String),
}

impl UnoValue {
    pub fn null() -> Self {
        UnoValue::Interface(String::new())
    }

    /// Wrap in an `any` carrying the given type.
    pub fn into_any(self, type_desc: Type) -> UnoValue {
        UnoValue::Any(Box::new(Any {
            type_desc,
            value: self,
        }))
    }

    /// Looks through one level of `any`.
    pub fn unwrap_any(&self) -> &UnoValue {
        match self {
            UnoValue::Any(a) => &a.value,
            other => other,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.unwrap_any() {
            UnoValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral value widened to i64, for any of the signed/unsigned integer variants.
    pub fn as_integer(&self) -> Option<i64> {
        match self.unwrap_any() {
            UnoValue::Byte(n) => Some(i64::from(*n)),
            UnoValue::Short(n) => Some(i64::from(*n)),
            UnoValue::UnsignedShort(n) => Some(i64::from(*n)),
            UnoValue::Long(n) => Some(i64::from(*n)),
            UnoValue::UnsignedLong(n) => Some(i64::from(*n)),
            UnoValue::Hyper(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.unwrap_any() {
            UnoValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Non-null OID, either direct or inside an `any`.
    pub fn as_oid(&self) -> Option<&str> {
        match self.unwrap_any() {
            UnoValue::Interface(oid) if !oid.is_empty() => Some(oid),
            _ => None,
        }
    }

    /// The wire type implied by a member value inside a struct.
    ///
    /// Struct members are written without type tags, so only the class
    /// matters here.
    pub fn implied_type(&self) -> Type {
        let class = match self {
            UnoValue::Void => TypeClass::Void,
            UnoValue::Bool(_) => TypeClass::Boolean,
            UnoValue::Byte(_) => TypeClass::Byte,
            UnoValue::Short(_) => TypeClass::Short,
            UnoValue::UnsignedShort(_) => TypeClass::UnsignedShort,
            UnoValue::Long(_) => TypeClass::Long,
            UnoValue::UnsignedLong(_) => TypeClass::UnsignedLong,
            UnoValue::Hyper(_) => TypeClass::Hyper,
            UnoValue::UnsignedHyper(_) => TypeClass::UnsignedHyper,
            UnoValue::Float(_) => TypeClass::Float,
            UnoValue::Double(_) => TypeClass::Double,
            UnoValue::Char(_) => TypeClass::Char,
            UnoValue::String(_) => TypeClass::String,
            UnoValue::Type(_) => TypeClass::Type,
            UnoValue::Any(_) => TypeClass::Any,
            UnoValue::Enum(_) => TypeClass::Enum,
            UnoValue::Struct(_) => TypeClass::Struct,
            UnoValue::Exception(_) => TypeClass::Exception,
            UnoValue::Sequence(_) => TypeClass::Sequence,
            UnoValue::Interface(_) => TypeClass::Interface,
        };
        Type::simple(class)
    }
}

/// A value tagged with its type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Any {
    pub type_desc: Type,
    pub value: UnoValue,
}

/// The `com.sun.star.uno.Exception` part of a thrown exception.
#[derive(Debug, Clone, PartialEq)]
pub struct UnoException {
    pub type_name: String,
    pub message: String,
}

/// IDL names used by the bridge and its callers.
pub mod names {
    pub const X_INTERFACE: &str = "com.sun.star.uno.XInterface";
    pub const X_COMPONENT_CONTEXT: &str = "com.sun.star.uno.XComponentContext";
    pub const X_MULTI_COMPONENT_FACTORY: &str = "com.sun.star.lang.XMultiComponentFactory";
    pub const X_PROTOCOL_PROPERTIES: &str = "com.sun.star.bridge.XProtocolProperties";
    pub const X_COMPONENT_LOADER: &str = "com.sun.star.frame.XComponentLoader";
    pub const X_STORABLE: &str = "com.sun.star.frame.XStorable";
    pub const X_CLOSEABLE: &str = "com.sun.star.util.XCloseable";
    pub const X_PROPERTY_SET: &str = "com.sun.star.beans.XPropertySet";
    pub const X_PROPERTY_SET_INFO: &str = "com.sun.star.beans.XPropertySetInfo";
    pub const X_INDEX_ACCESS: &str = "com.sun.star.container.XIndexAccess";
    pub const X_NAME_ACCESS: &str = "com.sun.star.container.XNameAccess";
    pub const X_STYLE_FAMILIES_SUPPLIER: &str = "com.sun.star.style.XStyleFamiliesSupplier";
    pub const X_SPREADSHEET_DOCUMENT: &str = "com.sun.star.sheet.XSpreadsheetDocument";
    pub const X_SPREADSHEET: &str = "com.sun.star.sheet.XSpreadsheet";
    pub const X_CALCULATABLE: &str = "com.sun.star.sheet.XCalculatable";
    pub const X_SHEET_PAGE_BREAK: &str = "com.sun.star.sheet.XSheetPageBreak";
    pub const X_USED_AREA_CURSOR: &str = "com.sun.star.sheet.XUsedAreaCursor";
    pub const X_CELL_RANGE_ADDRESSABLE: &str = "com.sun.star.sheet.XCellRangeAddressable";
    pub const X_PRINT_AREAS: &str = "com.sun.star.sheet.XPrintAreas";
    pub const X_COLUMN_ROW_RANGE: &str = "com.sun.star.table.XColumnRowRange";
    pub const X_NAMED: &str = "com.sun.star.container.XNamed";
    pub const X_DESKTOP: &str = "com.sun.star.frame.XDesktop";

    pub const PROPERTY_VALUE: &str = "com.sun.star.beans.PropertyValue";
    pub const PROTOCOL_PROPERTY: &str = "com.sun.star.bridge.ProtocolProperty";
    pub const CELL_RANGE_ADDRESS: &str = "com.sun.star.table.CellRangeAddress";

    pub const SERVICE_DESKTOP: &str = "com.sun.star.frame.Desktop";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_round_trips_through_wire_byte() {
        for tc in TypeClass::ALL {
            assert_eq!(TypeClass::from_wire(tc as u8), Some(tc));
            assert_eq!(TypeClass::from_wire(tc as u8 | 0x80), Some(tc));
        }
        assert_eq!(TypeClass::from_wire(16), None);
        assert_eq!(TypeClass::from_wire(21), None);
    }

    #[test]
    fn test_names_map_to_classes() {
        assert_eq!(TypeClass::for_name("short"), TypeClass::Short);
        assert_eq!(TypeClass::for_name(names::X_PRINT_AREAS), TypeClass::Interface);
        assert_eq!(TypeClass::for_name(names::CELL_RANGE_ADDRESS), TypeClass::Struct);
        assert_eq!(TypeClass::for_name("[]string"), TypeClass::Sequence);
    }

    #[test]
    fn test_sequence_element_type() {
        let seq = Type::sequence_of(names::CELL_RANGE_ADDRESS);
        assert_eq!(seq.element(), Some(Type::structure(names::CELL_RANGE_ADDRESS)));
        assert_eq!(Type::sequence_of("long").element(), Some(Type::long()));
        assert_eq!(Type::long().element(), None);
    }

    #[test]
    fn test_accessors_look_through_any() {
        let v = UnoValue::Short(7).into_any(Type::short());
        assert_eq!(v.as_integer(), Some(7));
        assert_eq!(UnoValue::Bool(true).into_any(Type::boolean()).as_bool(), Some(true));
        assert_eq!(UnoValue::null().as_oid(), None);
        assert_eq!(UnoValue::Interface("o1".into()).as_oid(), Some("o1"));
    }
}
