//! URP message headers and the first-level ("last value") caches.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{self, ReadCaches, WriteCaches};
use crate::error::{Result, UrpError};
use crate::types::Type;

const LONG_HEADER: u8 = 0x80;
const REQUEST: u8 = 0x40;
const NEW_TYPE: u8 = 0x20;
const NEW_OID: u8 = 0x10;
const NEW_TID: u8 = 0x08;
const FUNCTION_ID_16: u8 = 0x04;
const MORE_FLAGS: u8 = 0x01;
const EXCEPTION: u8 = 0x20;
const MUST_REPLY: u8 = 0x80;
const SHORT_ID_14: u8 = 0x40;

/// An incoming or outgoing method call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub function_id: u16,
    pub interface: Type,
    pub oid: String,
    pub tid: Vec<u8>,
    pub must_reply: bool,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub tid: Vec<u8>,
    pub exception: bool,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Reply(Reply),
}

/// Decoding state for the receiving direction.
#[derive(Default)]
pub struct Inbound {
    pub caches: ReadCaches,
    last_type: Option<Type>,
    last_oid: Option<String>,
    last_tid: Option<Vec<u8>>,
}

impl Inbound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, mut data: Bytes) -> Result<Message> {
        if data.is_empty() {
            return Err(UrpError::malformed("empty message"));
        }
        let flags = data.get_u8();
        if flags & LONG_HEADER == 0 {
            let function_id = if flags & SHORT_ID_14 != 0 {
                need_byte(&data, "short function id")?;
                (u16::from(flags & 0x3F) << 8) | u16::from(data.get_u8())
            } else {
                u16::from(flags & 0x3F)
            };
            return Ok(Message::Request(Request {
                function_id,
                interface: remembered(&self.last_type, "type")?,
                oid: remembered(&self.last_oid, "oid")?,
                tid: remembered(&self.last_tid, "tid")?,
                must_reply: true,
                body: data,
            }));
        }

        if flags & REQUEST == 0 {
            let tid = if flags & NEW_TID != 0 {
                self.read_tid(&mut data)?
            } else {
                remembered(&self.last_tid, "tid")?
            };
            return Ok(Message::Reply(Reply {
                tid,
                exception: flags & EXCEPTION != 0,
                body: data,
            }));
        }

        let mut must_reply = true;
        if flags & MORE_FLAGS != 0 {
            need_byte(&data, "extra flags")?;
            must_reply = data.get_u8() & MUST_REPLY != 0;
        }
        let function_id = if flags & FUNCTION_ID_16 != 0 {
            codec::get_u16(&mut data, "function id")?
        } else {
            need_byte(&data, "function id")?;
            u16::from(data.get_u8())
        };
        let interface = if flags & NEW_TYPE != 0 {
            let ty = codec::get_type(&mut data, &mut self.caches.types)?;
            self.last_type = Some(ty.clone());
            ty
        } else {
            remembered(&self.last_type, "type")?
        };
        let oid = if flags & NEW_OID != 0 {
            let oid = codec::get_oid(&mut data, &mut self.caches.oids)?;
            self.last_oid = Some(oid.clone());
            oid
        } else {
            remembered(&self.last_oid, "oid")?
        };
        let tid = if flags & NEW_TID != 0 {
            self.read_tid(&mut data)?
        } else {
            remembered(&self.last_tid, "tid")?
        };

        Ok(Message::Request(Request {
            function_id,
            interface,
            oid,
            tid,
            must_reply,
            body: data,
        }))
    }

    fn read_tid(&mut self, data: &mut Bytes) -> Result<Vec<u8>> {
        let tid = codec::get_tid(data, &mut self.caches.tids)?;
        self.last_tid = Some(tid.clone());
        Ok(tid)
    }
}

/// Encoding state for the sending direction.
#[derive(Default)]
pub struct Outbound {
    pub caches: WriteCaches,
    last_type: Option<Type>,
    last_oid: Option<String>,
    last_tid: Option<Vec<u8>>,
}

impl Outbound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames a request. `body` must already be marshalled with `self.caches`.
    pub fn request(
        &mut self,
        function_id: u16,
        interface: &Type,
        oid: &str,
        tid: &[u8],
        must_reply: bool,
        body: &[u8],
    ) -> BytesMut {
        let mut buf = BytesMut::with_capacity(body.len() + 64);
        let new_type = self.last_type.as_ref() != Some(interface);
        let new_oid = self.last_oid.as_deref() != Some(oid);
        let new_tid = self.last_tid.as_deref() != Some(tid);

        if !(new_type || new_oid || new_tid) && must_reply && function_id < 0x4000 {
            if function_id < 0x40 {
                buf.put_u8(function_id as u8);
            } else {
                buf.put_u8(SHORT_ID_14 | (function_id >> 8) as u8);
                buf.put_u8(function_id as u8);
            }
            buf.put_slice(body);
            return buf;
        }

        let mut flags = LONG_HEADER | REQUEST;
        for (set, bit) in [(new_type, NEW_TYPE), (new_oid, NEW_OID), (new_tid, NEW_TID)] {
            if set {
                flags |= bit;
            }
        }
        if function_id > 0xFF {
            flags |= FUNCTION_ID_16;
        }
        if !must_reply {
            flags |= MORE_FLAGS;
        }
        buf.put_u8(flags);
        if !must_reply {
            buf.put_u8(0);
        }
        if function_id > 0xFF {
            buf.put_u16(function_id);
        } else {
            buf.put_u8(function_id as u8);
        }
        if new_type {
            codec::put_type(&mut buf, interface, Some(&mut self.caches.types));
            self.last_type = Some(interface.clone());
        }
        if new_oid {
            codec::put_oid(&mut buf, oid, &mut self.caches.oids);
            self.last_oid = Some(oid.to_string());
        }
        if new_tid {
            codec::put_tid(&mut buf, tid, &mut self.caches.tids);
            self.last_tid = Some(tid.to_vec());
        }
        buf.put_slice(body);
        buf
    }

    pub fn reply(&mut self, tid: &[u8], exception: bool, body: &[u8]) -> BytesMut {
        let mut buf = BytesMut::with_capacity(body.len() + 16);
        let new_tid = self.last_tid.as_deref() != Some(tid);
        let mut flags = LONG_HEADER;
        if exception {
            flags |= EXCEPTION;
        }
        if new_tid {
            flags |= NEW_TID;
        }
        buf.put_u8(flags);
        if new_tid {
            codec::put_tid(&mut buf, tid, &mut self.caches.tids);
            self.last_tid = Some(tid.to_vec());
        }
        buf.put_slice(body);
        buf
    }
}

fn remembered<T: Clone>(slot: &Option<T>, what: &str) -> Result<T> {
    slot.clone()
        .ok_or_else(|| UrpError::Malformed(format!("header reuses {what} before one was sent")))
}

fn need_byte(data: &Bytes, what: &str) -> Result<()> {
    if data.has_remaining() {
        Ok(())
    } else {
        Err(UrpError::Malformed(format!("missing {what}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::names;
    use pretty_assertions::assert_eq;

    fn request(message: Message) -> Request {
        match message {
            Message::Request(r) => r,
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn test_long_then_short_request() {
        let ty = Type::interface(names::X_PRINT_AREAS);
        let mut out = Outbound::new();
        let mut inbound = Inbound::new();

        let first = out.request(4, &ty, "sheet-oid", b"tid-1", true, b"\x01");
        let second = out.request(10, &ty, "sheet-oid", b"tid-1", true, b"\x00");
        assert_eq!(second.as_ref(), &[10, 0]);

        let a = request(inbound.decode(first.freeze()).unwrap());
        let b = request(inbound.decode(second.freeze()).unwrap());
        assert_eq!(a.function_id, 4);
        assert_eq!(b.function_id, 10);
        assert_eq!(b.interface, ty);
        assert_eq!(b.oid, "sheet-oid");
        assert_eq!(b.tid, b"tid-1");
        assert_eq!(b.body.as_ref(), b"\x00");
    }

    #[test]
    fn test_fourteen_bit_short_form() {
        let ty = Type::interface(names::X_INTERFACE);
        let mut out = Outbound::new();
        let mut inbound = Inbound::new();
        inbound.decode(out.request(0, &ty, "o", b"t", true, b"").freeze()).unwrap();

        let encoded = out.request(0x123, &ty, "o", b"t", true, b"");
        assert_eq!(encoded.as_ref(), &[0x41, 0x23]);
        assert_eq!(request(inbound.decode(encoded.freeze()).unwrap()).function_id, 0x123);
    }

    #[test]
    fn test_one_way_request_carries_extra_flags() {
        let ty = Type::interface(names::X_INTERFACE);
        let mut out = Outbound::new();
        let encoded = out.request(2, &ty, "o", b"t", false, b"");
        assert_eq!(encoded[0] & MORE_FLAGS, MORE_FLAGS);
        assert_eq!(encoded[1], 0);
        let decoded = request(Inbound::new().decode(encoded.freeze()).unwrap());
        assert!(!decoded.must_reply);
        assert_eq!(decoded.function_id, 2);
    }

    #[test]
    fn test_reply_reuses_last_tid() {
        let mut out = Outbound::new();
        let mut inbound = Inbound::new();
        let first = out.reply(b"tid-9", false, b"a");
        let second = out.reply(b"tid-9", true, b"b");
        assert_eq!(second[0], LONG_HEADER | EXCEPTION);

        let Message::Reply(a) = inbound.decode(first.freeze()).unwrap() else {
            panic!("expected reply");
        };
        let Message::Reply(b) = inbound.decode(second.freeze()).unwrap() else {
            panic!("expected reply");
        };
        assert_eq!(a.tid, b"tid-9");
        assert!(!a.exception);
        assert_eq!(b.tid, b"tid-9");
        assert!(b.exception);
        assert_eq!(b.body.as_ref(), b"b");
    }

    #[test]
    fn test_short_header_without_context_is_malformed() {
        let err = Inbound::new().decode(Bytes::from_static(&[3])).unwrap_err();
        assert!(matches!(err, UrpError::Malformed(_)));
    }
}
