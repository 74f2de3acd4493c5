//! Marshalling of UNO values in URP's binary encoding.
//!
//! Integers are big-endian. Lengths use the compressed form: one byte below
//! 0xFF, otherwise 0xFF followed by a `u32`. Types, OIDs and TIDs may be
//! replaced by an index into the per-direction caches.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::cache::{InboundCache, OutboundCache, NO_INDEX};
use crate::error::{Result, UrpError};
use crate::types::{names, Any, Type, TypeClass, UnoException, UnoValue};

const TYPE_CACHE_FLAG: u8 = 0x80;

/// Caches for values announced by the peer.
pub struct ReadCaches {
    pub types: InboundCache<Type>,
    pub oids: InboundCache<String>,
    pub tids: InboundCache<Vec<u8>>,
}

impl ReadCaches {
    pub fn new() -> Self {
        Self {
            types: InboundCache::new("type"),
            oids: InboundCache::new("oid"),
            tids: InboundCache::new("tid"),
        }
    }
}

impl Default for ReadCaches {
    fn default() -> Self {
        Self::new()
    }
}

/// Caches for values already announced to the peer.
#[derive(Default)]
pub struct WriteCaches {
    pub types: OutboundCache<Type>,
    pub oids: OutboundCache<String>,
    pub tids: OutboundCache<Vec<u8>>,
}

pub fn put_compressed(buf: &mut BytesMut, n: u32) {
    if n < 0xFF {
        buf.put_u8(n as u8);
    } else {
        buf.put_u8(0xFF);
        buf.put_u32(n);
    }
}

pub fn get_compressed(buf: &mut Bytes) -> Result<u32> {
    need(buf, 1, "compressed number")?;
    match buf.get_u8() {
        0xFF => {
            need(buf, 4, "compressed number")?;
            Ok(buf.get_u32())
        }
        n => Ok(u32::from(n)),
    }
}

pub fn put_string(buf: &mut BytesMut, s: &str) {
    put_compressed(buf, s.len() as u32);
    buf.put_slice(s.as_bytes());
}

pub fn get_string(buf: &mut Bytes) -> Result<String> {
    let raw = get_bytes(buf)?;
    String::from_utf8(raw).map_err(|e| UrpError::Malformed(format!("string is not UTF-8: {e}")))
}

/// A byte sequence: compressed length then raw bytes.
pub fn get_bytes(buf: &mut Bytes) -> Result<Vec<u8>> {
    let len = get_compressed(buf)? as usize;
    need(buf, len, "byte sequence")?;
    Ok(buf.copy_to_bytes(len).to_vec())
}

pub fn get_u16(buf: &mut Bytes, what: &str) -> Result<u16> {
    need(buf, 2, what)?;
    Ok(buf.get_u16())
}

/// Writes a type descriptor. Without a cache the full name is always sent.
pub fn put_type(buf: &mut BytesMut, ty: &Type, cache: Option<&mut OutboundCache<Type>>) {
    let class = ty.class as u8;
    if ty.class.is_simple() {
        buf.put_u8(class);
        return;
    }
    let (index, fresh) = match cache {
        Some(cache) => cache.slot_for(ty),
        None => (NO_INDEX, true),
    };
    if fresh {
        buf.put_u8(class | TYPE_CACHE_FLAG);
        buf.put_u16(index);
        put_string(buf, &ty.name);
    } else {
        buf.put_u8(class);
        buf.put_u16(index);
    }
}

pub fn get_type(buf: &mut Bytes, cache: &mut InboundCache<Type>) -> Result<Type> {
    need(buf, 1, "type")?;
    let byte = buf.get_u8();
    let class = TypeClass::from_wire(byte).ok_or(UrpError::UnknownTypeClass(byte & 0x7F))?;
    if class.is_simple() {
        return Ok(Type::simple(class));
    }
    let index = get_u16(buf, "type cache index")?;
    if byte & TYPE_CACHE_FLAG != 0 {
        let ty = Type::named(class, get_string(buf)?);
        cache.remember(index, &ty);
        Ok(ty)
    } else {
        cache.recall(index)
    }
}

pub fn put_oid(buf: &mut BytesMut, oid: &str, cache: &mut OutboundCache<String>) {
    if oid.is_empty() {
        put_string(buf, "");
        buf.put_u16(NO_INDEX);
        return;
    }
    let (index, fresh) = cache.slot_for(&oid.to_string());
    put_string(buf, if fresh { oid } else { "" });
    buf.put_u16(index);
}

pub fn get_oid(buf: &mut Bytes, cache: &mut InboundCache<String>) -> Result<String> {
    let oid = get_string(buf)?;
    let index = get_u16(buf, "oid cache index")?;
    if oid.is_empty() {
        if index == NO_INDEX {
            Ok(oid)
        } else {
            cache.recall(index)
        }
    } else {
        cache.remember(index, &oid);
        Ok(oid)
    }
}

pub fn put_tid(buf: &mut BytesMut, tid: &[u8], cache: &mut OutboundCache<Vec<u8>>) {
    let (index, fresh) = cache.slot_for(&tid.to_vec());
    if fresh {
        put_compressed(buf, tid.len() as u32);
        buf.put_slice(tid);
    } else {
        put_compressed(buf, 0);
    }
    buf.put_u16(index);
}

pub fn get_tid(buf: &mut Bytes, cache: &mut InboundCache<Vec<u8>>) -> Result<Vec<u8>> {
    let tid = get_bytes(buf)?;
    let index = get_u16(buf, "tid cache index")?;
    if tid.is_empty() {
        cache.recall(index)
    } else {
        cache.remember(index, &tid);
        Ok(tid)
    }
}

/// Writes `value` as an instance of `ty`.
pub fn put_value(buf: &mut BytesMut, value: &UnoValue, ty: &Type, oids: &mut OutboundCache<String>) {
    match value {
        UnoValue::Void => {}
        UnoValue::Bool(b) => buf.put_u8(u8::from(*b)),
        UnoValue::Byte(n) => buf.put_i8(*n),
        UnoValue::Short(n) => buf.put_i16(*n),
        UnoValue::UnsignedShort(n) => buf.put_u16(*n),
        UnoValue::Long(n) | UnoValue::Enum(n) => buf.put_i32(*n),
        UnoValue::UnsignedLong(n) => buf.put_u32(*n),
        UnoValue::Hyper(n) => buf.put_i64(*n),
        UnoValue::UnsignedHyper(n) => buf.put_u64(*n),
        UnoValue::Float(f) => buf.put_f32(*f),
        UnoValue::Double(d) => buf.put_f64(*d),
        UnoValue::Char(c) => buf.put_u16(*c),
        UnoValue::String(s) => put_string(buf, s),
        UnoValue::Type(t) => put_type(buf, t, None),
        UnoValue::Any(any) => {
            put_type(buf, &any.type_desc, None);
            put_value(buf, &any.value, &any.type_desc, oids);
        }
        UnoValue::Struct(members) => {
            for member in members {
                put_value(buf, member, &member.implied_type(), oids);
            }
        }
        UnoValue::Exception(exc) => {
            put_string(buf, &exc.message);
            put_oid(buf, "", oids);
        }
        UnoValue::Sequence(items) => {
            put_compressed(buf, items.len() as u32);
            let element = ty.element().unwrap_or_else(Type::void);
            for item in items {
                put_value(buf, item, &element, oids);
            }
        }
        UnoValue::Interface(oid) => put_oid(buf, oid, oids),
    }
}

/// Reads one instance of `ty`.
pub fn get_value(buf: &mut Bytes, ty: &Type, caches: &mut ReadCaches) -> Result<UnoValue> {
    let value = match ty.class {
        TypeClass::Void => UnoValue::Void,
        TypeClass::Boolean => {
            need(buf, 1, "boolean")?;
            UnoValue::Bool(buf.get_u8() != 0)
        }
        TypeClass::Byte => {
            need(buf, 1, "byte")?;
            UnoValue::Byte(buf.get_i8())
        }
        TypeClass::Short => {
            need(buf, 2, "short")?;
            UnoValue::Short(buf.get_i16())
        }
        TypeClass::UnsignedShort => {
            need(buf, 2, "unsigned short")?;
            UnoValue::UnsignedShort(buf.get_u16())
        }
        TypeClass::Long => {
            need(buf, 4, "long")?;
            UnoValue::Long(buf.get_i32())
        }
        TypeClass::UnsignedLong => {
            need(buf, 4, "unsigned long")?;
            UnoValue::UnsignedLong(buf.get_u32())
        }
        TypeClass::Hyper => {
            need(buf, 8, "hyper")?;
            UnoValue::Hyper(buf.get_i64())
        }
        TypeClass::UnsignedHyper => {
            need(buf, 8, "unsigned hyper")?;
            UnoValue::UnsignedHyper(buf.get_u64())
        }
        TypeClass::Float => {
            need(buf, 4, "float")?;
            UnoValue::Float(buf.get_f32())
        }
        TypeClass::Double => {
            need(buf, 8, "double")?;
            UnoValue::Double(buf.get_f64())
        }
        TypeClass::Char => {
            need(buf, 2, "char")?;
            UnoValue::Char(buf.get_u16())
        }
        TypeClass::Enum => {
            need(buf, 4, "enum")?;
            UnoValue::Enum(buf.get_i32())
        }
        TypeClass::String => UnoValue::String(get_string(buf)?),
        TypeClass::Type => UnoValue::Type(get_type(buf, &mut caches.types)?),
        TypeClass::Any => {
            let inner = get_type(buf, &mut caches.types)?;
            let value = get_value(buf, &inner, caches)?;
            UnoValue::Any(Box::new(Any {
                type_desc: inner,
                value,
            }))
        }
        TypeClass::Struct => get_struct(buf, &ty.name, caches)?,
        TypeClass::Exception => {
            let message = get_string(buf)?;
            // Context member; derived exception members are left unread
            get_oid(buf, &mut caches.oids)?;
            UnoValue::Exception(UnoException {
                type_name: ty.name.clone(),
                message,
            })
        }
        TypeClass::Sequence => {
            let count = get_compressed(buf)? as usize;
            let element = ty.element().unwrap_or_else(Type::void);
            let mut items = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                items.push(get_value(buf, &element, caches)?);
            }
            UnoValue::Sequence(items)
        }
        TypeClass::Interface => UnoValue::Interface(get_oid(buf, &mut caches.oids)?),
    };
    Ok(value)
}

fn get_struct(buf: &mut Bytes, name: &str, caches: &mut ReadCaches) -> Result<UnoValue> {
    let member_types = match name {
        names::PROPERTY_VALUE => vec![
            Type::string(),
            Type::long(),
            Type::any(),
            Type::simple(TypeClass::Enum),
        ],
        names::PROTOCOL_PROPERTY => vec![Type::string(), Type::any()],
        names::CELL_RANGE_ADDRESS => vec![
            Type::short(),
            Type::long(),
            Type::long(),
            Type::long(),
            Type::long(),
        ],
        other => return Err(UrpError::UnknownStruct(other.to_string())),
    };
    let members = member_types
        .iter()
        .map(|ty| get_value(buf, ty, caches))
        .collect::<Result<Vec<_>>>()?;
    Ok(UnoValue::Struct(members))
}

/// A `PropertyValue` struct as used in media descriptors.
pub fn property_value(name: &str, value: UnoValue, value_type: Type) -> UnoValue {
    UnoValue::Struct(vec![
        UnoValue::String(name.to_string()),
        UnoValue::Long(0),
        value.into_any(value_type),
        UnoValue::Enum(0),
    ])
}

fn need(buf: &Bytes, n: usize, what: &str) -> Result<()> {
    if buf.remaining() < n {
        Err(UrpError::Malformed(format!(
            "truncated {what}: need {n} bytes, have {}",
            buf.remaining()
        )))
    } else {
        Ok(())
    }
}
