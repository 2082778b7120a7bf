use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

/// Name type is unknown.
pub const KRB5_NT_UNKNOWN: u32 = 0;
/// Just the name of the principal, as in DCE or for users.
pub const KRB5_NT_PRINCIPAL: u32 = 1;
/// Service and other unique instance (krbtgt).
pub const KRB5_NT_SRV_INST: u32 = 2;

/// A Kerberos identity such as `user@REALM` or `krbtgt/REALM@REALM`.
///
/// Realm and components are raw bytes as stored in a cache. Equality is
/// structural: name type, realm and components must all match.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    name_type: u32,
    realm: Vec<u8>,
    components: Vec<Vec<u8>>,
}

impl Principal {
    pub fn new(name_type: u32, realm: impl Into<Vec<u8>>, components: Vec<Vec<u8>>) -> Self {
        Self {
            name_type,
            realm: realm.into(),
            components,
        }
    }

    pub fn name_type(&self) -> u32 {
        self.name_type
    }

    pub fn realm(&self) -> &[u8] {
        &self.realm
    }

    pub fn components(&self) -> &[Vec<u8>] {
        &self.components
    }

    /// Render as `comp1/comp2@REALM`, escaping separators.
    pub fn unparse(&self) -> String {
        let mut out = String::new();
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                out.push('/');
            }
            escape_into(&mut out, component, true);
        }
        out.push('@');
        escape_into(&mut out, &self.realm, false);
        out
    }
}

fn escape_into(out: &mut String, bytes: &[u8], in_component: bool) {
    for ch in String::from_utf8_lossy(bytes).chars() {
        match ch {
            '/' if in_component => out.push_str("\\/"),
            '@' => out.push_str("\\@"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.unparse())
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unparse())
    }
}

impl FromStr for Principal {
    type Err = TypeError;

    /// Parse `comp1/comp2@REALM`. A realm is mandatory; there is no
    /// configured default realm to fall back on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TypeError::InvalidPrincipal {
            name: s.to_string(),
            reason: reason.to_string(),
        };

        let mut components = Vec::new();
        let mut current = Vec::new();
        let mut realm: Option<Vec<u8>> = None;
        let mut chars = s.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '\\' => {
                    let escaped = chars.next().ok_or_else(|| invalid("trailing backslash"))?;
                    let unescaped = match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'b' => '\u{8}',
                        '0' => '\0',
                        other => other,
                    };
                    push_char(realm.as_mut().unwrap_or(&mut current), unescaped);
                }
                '/' if realm.is_none() => {
                    components.push(std::mem::take(&mut current));
                }
                '@' if realm.is_none() => {
                    components.push(std::mem::take(&mut current));
                    realm = Some(Vec::new());
                }
                '@' => return Err(invalid("unescaped '@' in realm")),
                c => push_char(realm.as_mut().unwrap_or(&mut current), c),
            }
        }

        let realm = realm.ok_or_else(|| invalid("missing realm"))?;
        if realm.is_empty() {
            return Err(invalid("empty realm"));
        }
        if components.iter().all(|c| c.is_empty()) {
            return Err(invalid("empty name"));
        }

        let name_type = if components.len() == 2 && components[0] == b"krbtgt" {
            KRB5_NT_SRV_INST
        } else {
            KRB5_NT_PRINCIPAL
        };
        Ok(Self::new(name_type, realm, components))
    }
}

fn push_char(target: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    target.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}
