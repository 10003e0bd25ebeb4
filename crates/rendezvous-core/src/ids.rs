//! String newtypes for peer identity and discovery scope.
//!
//! [`PeerId`] and [`OriginKey`] are both plain strings on the wire, but they
//! must never be confused inside the server: a room is keyed by origin, a
//! member of the room by peer id.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id! {
    /// Stable identifier of a connected peer.
    ///
    /// Either resumed from the client's `peerid` cookie or minted fresh.
    PeerId
}

string_id! {
    /// Discovery scope key: the normalized network origin of a peer.
    OriginKey
}

impl PeerId {
    /// Mint a fresh random id (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Canonical form of every loopback address.
pub const LOOPBACK_ORIGIN: &str = "127.0.0.1";

impl OriginKey {
    /// Resolve the origin of a connection.
    ///
    /// The first entry of a comma-separated `X-Forwarded-For` value wins when
    /// present and non-empty; otherwise the socket's remote address is used.
    /// `::1` and `::ffff:127.0.0.1` collapse to `127.0.0.1`.
    pub fn resolve(forwarded_for: Option<&str>, remote_addr: &str) -> Self {
        let forwarded = forwarded_for
            .and_then(|header| header.split(',').next())
            .map(str::trim)
            .filter(|first| !first.is_empty());
        let raw = forwarded.unwrap_or(remote_addr).trim();
        Self(normalize_loopback(raw))
    }
}

fn normalize_loopback(addr: &str) -> String {
    match addr {
        "::1" | "::ffff:127.0.0.1" => LOOPBACK_ORIGIN.to_owned(),
        other => other.to_owned(),
    }
}
