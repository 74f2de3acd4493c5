//! A URP connection: handshake, synchronous calls and UNO bootstrap.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::codec::{self, ReadCaches};
use crate::error::{Result, UrpError};
use crate::framing::Framed;
use crate::message::{Inbound, Message, Outbound, Reply, Request};
use crate::methods::{
    x_component_context, x_interface, x_multi_component_factory, x_protocol_properties, Method,
};
use crate::types::{names, Type, UnoValue};
use crate::url::UnoUrl;

const PROTOCOL_OID: &str = "UrpProtocolProperties";
const PROTOCOL_TID: &[u8] = b".UrpProtocolPropertiesTid";
const CURRENT_CONTEXT: &str = "CurrentContext";

/// The objects every session starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    pub context: String,
    pub service_manager: String,
    /// The Desktop, already queried for `XComponentLoader`.
    pub desktop: String,
}

/// A client-side URP bridge over one byte stream.
///
/// Calls are strictly sequential: each `call` waits for its own reply before
/// returning, answering or ignoring whatever the peer sends meanwhile.
pub struct Connection<S = TcpStream> {
    framed: Framed<S>,
    inbound: Inbound,
    outbound: Outbound,
    tid: Vec<u8>,
    current_context: bool,
}

impl Connection<TcpStream> {
    /// Opens a TCP connection to the acceptor named by `url` and negotiates.
    pub async fn connect(url: &UnoUrl) -> Result<Self> {
        let stream = TcpStream::connect(url.address()).await?;
        stream.set_nodelay(true)?;
        tracing::debug!(%url, "socket connected");
        Self::handshake(stream).await
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an established stream and runs protocol-property negotiation.
    pub async fn handshake(stream: S) -> Result<Self> {
        let mut conn = Self {
            framed: Framed::new(stream),
            inbound: Inbound::new(),
            outbound: Outbound::new(),
            tid: format!("pagefit-{:016x}", rand::random::<u64>()).into_bytes(),
            current_context: false,
        };
        conn.negotiate().await?;
        Ok(conn)
    }

    /// Whether requests carry a leading `XCurrentContext` argument.
    pub fn current_context_mode(&self) -> bool {
        self.current_context
    }

    async fn send_protocol_request(&mut self, method: &Method, body: &[u8]) -> Result<()> {
        let message = self.outbound.request(
            method.index,
            &method.interface_type(),
            PROTOCOL_OID,
            PROTOCOL_TID,
            true,
            body,
        );
        self.framed.write_block(&message).await
    }

    async fn negotiate(&mut self) -> Result<()> {
        let mut ours: i32 = rand::random();
        self.send_protocol_request(&x_protocol_properties::REQUEST_CHANGE, &ours.to_be_bytes())
            .await?;
        let mut committing = false;

        loop {
            match self.next_message().await? {
                Message::Request(req) if req.oid == PROTOCOL_OID => {
                    if req.function_id == x_protocol_properties::REQUEST_CHANGE.index {
                        let theirs = read_long(&mut self.inbound.caches, req.body)?;
                        let verdict: i32 = match ours.cmp(&theirs) {
                            std::cmp::Ordering::Less => 1,
                            std::cmp::Ordering::Equal => -1,
                            std::cmp::Ordering::Greater => 0,
                        };
                        tracing::trace!(ours, theirs, verdict, "peer requested protocol change");
                        self.send_reply(&req.tid, false, &verdict.to_be_bytes()).await?;
                    } else if req.function_id == x_protocol_properties::COMMIT_CHANGE.index {
                        let ty = x_protocol_properties::COMMIT_CHANGE.params[0].wire_type();
                        let mut body = req.body;
                        let props = codec::get_value(&mut body, &ty, &mut self.inbound.caches)?;
                        self.current_context = names_property(&props, CURRENT_CONTEXT);
                        self.send_reply(&req.tid, false, &[]).await?;
                        tracing::debug!(current_context = self.current_context, "peer committed");
                        return Ok(());
                    } else if req.must_reply {
                        self.send_reply(&req.tid, false, &[]).await?;
                    }
                }
                Message::Request(req) => self.answer_stray(req).await?,
                Message::Reply(reply) if committing => {
                    self.current_context = !reply.exception;
                    tracing::debug!(current_context = self.current_context, "commit acknowledged");
                    return Ok(());
                }
                Message::Reply(reply) => {
                    if reply.exception {
                        tracing::debug!("peer does not support protocol properties");
                        return Ok(());
                    }
                    match read_long(&mut self.inbound.caches, reply.body)? {
                        1 => {
                            let body = commit_body();
                            self.send_protocol_request(&x_protocol_properties::COMMIT_CHANGE, &body)
                                .await?;
                            committing = true;
                        }
                        0 => tracing::trace!("lost protocol negotiation, awaiting commit"),
                        _ => {
                            ours = rand::random();
                            self.send_protocol_request(
                                &x_protocol_properties::REQUEST_CHANGE,
                                &ours.to_be_bytes(),
                            )
                            .await?;
                        }
                    }
                }
            }
        }
    }

    async fn next_message(&mut self) -> Result<Message> {
        let block = self.framed.read_block().await?;
        self.inbound.decode(block)
    }

    async fn send_reply(&mut self, tid: &[u8], exception: bool, body: &[u8]) -> Result<()> {
        let message = self.outbound.reply(tid, exception, body);
        self.framed.write_block(&message).await
    }

    /// Handles a peer request that arrives while a call is outstanding.
    async fn answer_stray(&mut self, req: Request) -> Result<()> {
        if req.function_id == x_interface::RELEASE.index {
            tracing::trace!(oid = %req.oid, "ignoring release");
            return Ok(());
        }
        tracing::debug!(oid = %req.oid, function = req.function_id, "answering unexpected request");
        if req.must_reply {
            self.send_reply(&req.tid, false, &[]).await?;
        }
        Ok(())
    }

    /// Invokes `method` on the object `oid` and waits for the result.
    pub async fn call(&mut self, oid: &str, method: &Method, args: &[UnoValue]) -> Result<UnoValue> {
        if args.len() != method.params.len() {
            return Err(UrpError::Arity {
                method: method.name,
                expected: method.params.len(),
                got: args.len(),
            });
        }

        let mut body = BytesMut::with_capacity(128);
        if self.current_context {
            codec::put_oid(&mut body, "", &mut self.outbound.caches.oids);
        }
        for (arg, shape) in args.iter().zip(method.params) {
            codec::put_value(&mut body, arg, &shape.wire_type(), &mut self.outbound.caches.oids);
        }

        let tid = self.tid.clone();
        let message = self.outbound.request(
            method.index,
            &method.interface_type(),
            oid,
            &tid,
            !method.one_way,
            &body,
        );
        tracing::trace!(oid, method = method.name, "call");
        self.framed.write_block(&message).await?;

        if method.one_way {
            return Ok(UnoValue::Void);
        }

        loop {
            match self.next_message().await? {
                Message::Reply(reply) if reply.tid == tid => return self.finish(method, reply),
                Message::Reply(reply) => {
                    return Err(UrpError::Malformed(format!(
                        "reply for unknown transaction {:?}",
                        String::from_utf8_lossy(&reply.tid)
                    )))
                }
                Message::Request(req) => self.answer_stray(req).await?,
            }
        }
    }

    fn finish(&mut self, method: &Method, reply: Reply) -> Result<UnoValue> {
        let mut body = reply.body;
        if reply.exception {
            let thrown = codec::get_value(&mut body, &Type::any(), &mut self.inbound.caches)?;
            let (type_name, message) = match thrown {
                UnoValue::Any(any) => match any.value {
                    UnoValue::Exception(e) => (e.type_name, e.message),
                    other => (any.type_desc.name, format!("{other:?}")),
                },
                other => (String::from("unknown"), format!("{other:?}")),
            };
            tracing::debug!(method = method.name, %type_name, %message, "remote exception");
            return Err(UrpError::RemoteException { type_name, message });
        }
        codec::get_value(&mut body, &method.returns.wire_type(), &mut self.inbound.caches)
    }

    /// `queryInterface`, returning the OID when the object supports `interface`.
    pub async fn query_interface(&mut self, oid: &str, interface: &str) -> Result<Option<String>> {
        let result = self
            .call(
                oid,
                &x_interface::QUERY_INTERFACE,
                &[UnoValue::Type(Type::interface(interface))],
            )
            .await?;
        Ok(result.as_oid().map(str::to_string))
    }

    /// Like [`query_interface`](Self::query_interface) but a missing interface is an error.
    pub async fn require_interface(&mut self, oid: &str, interface: &'static str) -> Result<String> {
        self.query_interface(oid, interface)
            .await?
            .ok_or_else(|| UrpError::RemoteException {
                type_name: interface.to_string(),
                message: format!("object {oid} does not implement {interface}"),
            })
    }

    /// Resolves `initial_object` and walks ComponentContext -> ServiceManager -> Desktop.
    pub async fn bootstrap(&mut self, initial_object: &str) -> Result<Bootstrap> {
        let context = self
            .require_interface(initial_object, names::X_COMPONENT_CONTEXT)
            .await?;

        let service_manager = self
            .call(&context, &x_component_context::GET_SERVICE_MANAGER, &[])
            .await?
            .as_oid()
            .map(str::to_string)
            .ok_or(UrpError::NullReference("getServiceManager"))?;

        let desktop = self
            .call(
                &service_manager,
                &x_multi_component_factory::CREATE_INSTANCE_WITH_CONTEXT,
                &[
                    UnoValue::String(names::SERVICE_DESKTOP.to_string()),
                    UnoValue::Interface(context.clone()),
                ],
            )
            .await?
            .as_oid()
            .map(str::to_string)
            .ok_or(UrpError::NullReference("createInstanceWithContext"))?;
        let desktop = self
            .require_interface(&desktop, names::X_COMPONENT_LOADER)
            .await?;

        tracing::debug!(%context, %service_manager, %desktop, "bootstrapped");
        Ok(Bootstrap {
            context,
            service_manager,
            desktop,
        })
    }
}

fn read_long(caches: &mut ReadCaches, mut body: bytes::Bytes) -> Result<i32> {
    match codec::get_value(&mut body, &Type::long(), caches)? {
        UnoValue::Long(n) => Ok(n),
        other => Err(UrpError::Malformed(format!("expected long, got {other:?}"))),
    }
}

/// `commitChange` argument: a single `CurrentContext` property with a void value.
fn commit_body() -> BytesMut {
    let mut body = BytesMut::new();
    codec::put_compressed(&mut body, 1);
    codec::put_string(&mut body, CURRENT_CONTEXT);
    body.put_u8(Type::void().class as u8);
    body
}

fn names_property(props: &UnoValue, wanted: &str) -> bool {
    match props {
        UnoValue::Sequence(items) => items.iter().any(|item| match item {
            UnoValue::Struct(members) => members.first().and_then(UnoValue::as_str) == Some(wanted),
            _ => false,
        }),
        _ => false,
    }
}
