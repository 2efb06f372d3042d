//! Connection descriptors.
//!
//! A [`Source`] is the parsed form of
//! `protocol://server[:port]/database?username=..&password=..`.

use crate::core::{DatabaseError, Result};
use std::fmt;
use std::str::FromStr;

/// Parsed connection descriptor. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Source {
    pub protocol: String,
    pub server: String,
    pub port: Option<u16>,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Source {
    /// Parses a connection URI.
    ///
    /// A missing `/` after the server leaves `database` empty and a missing
    /// `?` leaves the credentials empty. Unknown query keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the `://` separator is missing or
    /// the protocol is empty.
    pub fn parse(uri: &str) -> Result<Source> {
        let (protocol, rest) = uri
            .split_once("://")
            .ok_or_else(|| DatabaseError::config(format!("malformed uri (missing ://): {}", uri)))?;
        if protocol.is_empty() {
            return Err(DatabaseError::config(format!("malformed uri (empty protocol): {}", uri)));
        }

        let mut source = Source {
            protocol: protocol.to_string(),
            ..Source::default()
        };

        let (server, rest) = match rest.split_once('/') {
            Some((server, rest)) => (server, Some(rest)),
            None => (rest, None),
        };
        let (database, query) = match rest {
            Some(rest) => match rest.split_once('?') {
                Some((database, query)) => (database, Some(query)),
                None => (rest, None),
            },
            None => ("", None),
        };

        match server.rsplit_once(':') {
            Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                let port = port
                    .parse()
                    .map_err(|_| DatabaseError::config(format!("invalid port in uri: {}", uri)))?;
                source.server = host.to_string();
                source.port = Some(port);
            }
            _ => source.server = server.to_string(),
        }
        source.database = database.to_string();

        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            if let Some((key, value)) = pair.split_once('=') {
                match key {
                    "username" => source.username = value.to_string(),
                    "password" => source.password = value.to_string(),
                    _ => {}
                }
            }
        }

        Ok(source)
    }

    /// `server[/database]`, the location file-based backends open.
    pub fn path(&self) -> String {
        if self.database.is_empty() {
            self.server.clone()
        } else {
            format!("{}/{}", self.server, self.database)
        }
    }
}

impl FromStr for Source {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self> {
        Source::parse(s)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol, self.server)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        write!(f, "/{}", self.database)
    }
}

/// Builds `protocol://host/database?username=..&password=..`.
pub fn build_uri(protocol: &str, host: &str, database: &str, username: &str, password: &str) -> String {
    format!(
        "{}://{}/{}?username={}&password={}",
        protocol, host, database, username, password
    )
}
