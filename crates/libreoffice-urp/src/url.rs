//! UNO connection URLs: `uno:socket,host=H,port=P;urp;ObjectName`.

use std::fmt;
use std::str::FromStr;

use crate::error::UrpError;

pub const COMPONENT_CONTEXT: &str = "StarOffice.ComponentContext";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnoUrl {
    pub host: String,
    pub port: u16,
    /// Name of the initial object exported by the acceptor.
    pub object: String,
}

impl UnoUrl {
    pub fn socket(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            object: COMPONENT_CONTEXT.to_string(),
        }
    }

    /// Value for soffice's `--accept=` option listening on the same socket.
    pub fn acceptor(&self) -> String {
        format!(
            "socket,host={},port={};urp;StarOffice.ServiceManager",
            self.host, self.port
        )
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for UnoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uno:socket,host={},port={};urp;{}",
            self.host, self.port, self.object
        )
    }
}

impl FromStr for UnoUrl {
    type Err = UrpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| UrpError::InvalidUrl {
            url: s.to_string(),
            reason: reason.to_string(),
        };

        let rest = s.strip_prefix("uno:").ok_or_else(|| invalid("missing uno: scheme"))?;
        let mut parts = rest.split(';');
        let connection = parts.next().unwrap_or_default();
        let protocol = parts.next().ok_or_else(|| invalid("missing protocol"))?;
        let object = parts.next().ok_or_else(|| invalid("missing object name"))?;
        if parts.next().is_some() {
            return Err(invalid("too many ';' separated parts"));
        }
        if !protocol.split(',').next().is_some_and(|p| p.trim() == "urp") {
            return Err(invalid("only urp is supported"));
        }

        let mut params = connection.split(',');
        if params.next().map(str::trim) != Some("socket") {
            return Err(invalid("only socket connections are supported"));
        }
        let mut host = None;
        let mut port = None;
        for param in params {
            let (key, value) = param.split_once('=').ok_or_else(|| invalid("malformed parameter"))?;
            match key.trim().to_ascii_lowercase().as_str() {
                "host" => host = Some(value.trim().to_string()),
                "port" => {
                    port = Some(value.trim().parse::<u16>().map_err(|_| invalid("bad port"))?)
                }
                _ => {}
            }
        }

        Ok(Self {
            host: host.ok_or_else(|| invalid("missing host"))?,
            port: port.ok_or_else(|| invalid("missing port"))?,
            object: object.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parses_socket_url() {
        let url: UnoUrl = "uno:socket,host=127.0.0.1,port=2002;urp;StarOffice.ComponentContext"
            .parse()
            .unwrap();
        assert_eq!(url, UnoUrl::socket("127.0.0.1", 2002));
    }

    #[test]
    fn test_display_round_trips() {
        let url = UnoUrl::socket("localhost", 8100);
        assert_eq!(url.to_string().parse::<UnoUrl>().unwrap(), url);
    }

    #[test]
    fn test_acceptor_matches_endpoint() {
        assert_eq!(
            UnoUrl::socket("127.0.0.1", 2002).acceptor(),
            "socket,host=127.0.0.1,port=2002;urp;StarOffice.ServiceManager"
        );
    }

    #[test]
    fn test_rejects_pipes_and_missing_parts() {
        for bad in [
            "socket,host=a,port=1;urp;X",
            "uno:pipe,name=x;urp;StarOffice.ComponentContext",
            "uno:socket,host=a;urp;StarOffice.ComponentContext",
            "uno:socket,host=a,port=99999;urp;StarOffice.ComponentContext",
            "uno:socket,host=a,port=1;iiop;StarOffice.ComponentContext",
            "uno:socket,host=a,port=1;urp",
        ] {
            assert!(bad.parse::<UnoUrl>().is_err(), "{bad} should not parse");
        }
    }
}
