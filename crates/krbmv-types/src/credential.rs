use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::principal::Principal;

/// Realm used by MIT krb5 for cache configuration entries.
const CONFIG_REALM: &[u8] = b"X-CACHECONF:";

/// Validity window of a ticket, in seconds since the Unix epoch.
///
/// Values are kept exactly as they appear on disk (32-bit). A zero value
/// means the field is unset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketTimes {
    pub authtime: u32,
    pub starttime: u32,
    pub endtime: u32,
    pub renew_till: u32,
}

fn to_datetime(secs: u32) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    DateTime::from_timestamp(i64::from(secs), 0)
}

fn fmt_time(f: &mut fmt::Formatter<'_>, label: &str, secs: u32) -> fmt::Result {
    match to_datetime(secs) {
        Some(t) => write!(f, "{label}={}", t.format("%Y-%m-%dT%H:%M:%SZ")),
        None => write!(f, "{label}=-"),
    }
}

impl fmt::Display for TicketTimes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_time(f, "auth", self.authtime)?;
        f.write_str(" ")?;
        fmt_time(f, "start", self.starttime)?;
        f.write_str(" ")?;
        fmt_time(f, "end", self.endtime)?;
        f.write_str(" ")?;
        fmt_time(f, "renew", self.renew_till)
    }
}

/// Session key of a ticket. Never printed.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyBlock {
    pub enctype: u16,
    pub contents: Vec<u8>,
}

impl fmt::Debug for KeyBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBlock")
            .field("enctype", &self.enctype)
            .field("len", &self.contents.len())
            .finish()
    }
}

/// A host address bound to a ticket.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    pub addrtype: u16,
    pub contents: Vec<u8>,
}

/// An authorization-data element attached to a ticket.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AuthData {
    pub ad_type: u16,
    pub contents: Vec<u8>,
}

/// One credential record as stored in a cache.
///
/// Every field of the on-disk record is represented so that a copy writes
/// back exactly what was read.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Credential {
    pub client: Principal,
    pub server: Principal,
    pub keyblock: KeyBlock,
    pub times: TicketTimes,
    pub is_skey: bool,
    pub ticket_flags: u32,
    pub addresses: Vec<Address>,
    pub authdata: Vec<AuthData>,
    pub ticket: Vec<u8>,
    pub second_ticket: Vec<u8>,
}

impl Credential {
    /// A bare credential for `client` to `server`, with empty key and ticket.
    pub fn new(client: Principal, server: Principal, times: TicketTimes) -> Self {
        Self {
            client,
            server,
            keyblock: KeyBlock::default(),
            times,
            is_skey: false,
            ticket_flags: 0,
            addresses: Vec::new(),
            authdata: Vec::new(),
            ticket: Vec::new(),
            second_ticket: Vec::new(),
        }
    }

    /// Whether this record is a cache configuration entry rather than a ticket.
    pub fn is_config_entry(&self) -> bool {
        self.server.realm() == CONFIG_REALM
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::KRB5_NT_UNKNOWN;

    #[test]
    fn times_display() {
        let times = TicketTimes {
            authtime: 1_700_000_000,
            starttime: 0,
            endtime: 1_700_036_000,
            renew_till: 0,
        };
        assert_eq!(
            times.to_string(),
            "auth=2023-11-14T22:13:20Z start=- end=2023-11-15T08:13:20Z renew=-"
        );
    }

    #[test]
    fn keyblock_debug_is_redacted() {
        let kb = KeyBlock {
            enctype: 18,
            contents: vec![0x42; 32],
        };
        let rendered = format!("{kb:?}");
        assert!(rendered.contains("len: 32"));
        assert!(!rendered.contains("66"));
    }

    #[test]
    fn config_entries_detected() {
        let client: Principal = "alice@EXAMPLE.COM".parse().unwrap();
        let conf = Principal::new(
            KRB5_NT_UNKNOWN,
            CONFIG_REALM,
            vec![b"krb5_ccache_conf_data".to_vec(), b"pa_type".to_vec()],
        );
        let tgs: Principal = "krbtgt/EXAMPLE.COM@EXAMPLE.COM".parse().unwrap();
        assert!(Credential::new(client.clone(), conf, TicketTimes::default()).is_config_entry());
        assert!(!Credential::new(client, tgs, TicketTimes::default()).is_config_entry());
    }
}
