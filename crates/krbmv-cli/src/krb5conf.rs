//! `default_ccache_name` from the Kerberos profile (`krb5.conf`).
//!
//! Only the `[libdefaults]` relation is read. Realm subsections, other
//! sections and `include` directives are skipped.

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context as _};
use nix::unistd::{geteuid, getuid, User};
use tracing::{debug, warn};

const DEFAULT_PROFILE: &str = "/etc/krb5.conf";

/// Values substituted for `%{...}` tokens in a configured name.
#[derive(Clone, Debug)]
pub struct Tokens {
    pub uid: u32,
    pub euid: u32,
    pub username: Option<String>,
    pub temp: String,
}

impl Tokens {
    /// Tokens for the calling process.
    pub fn current() -> Self {
        let euid = geteuid();
        let username = match User::from_uid(euid) {
            Ok(user) => user.map(|u| u.name),
            Err(e) => {
                debug!(error = %e, "user lookup failed");
                None
            }
        };
        Self {
            uid: getuid().as_raw(),
            euid: euid.as_raw(),
            username,
            temp: env::var("TMPDIR")
                .ok()
                .filter(|dir| !dir.is_empty())
                .unwrap_or_else(|| "/tmp".to_string()),
        }
    }
}

/// Profile files in lookup order: `KRB5_CONFIG` (colon separated) or the
/// system profile.
pub fn profile_paths() -> Vec<PathBuf> {
    match env::var_os("KRB5_CONFIG") {
        Some(list) if !list.is_empty() => env::split_paths(&list)
            .filter(|path| !path.as_os_str().is_empty())
            .collect(),
        _ => vec![PathBuf::from(DEFAULT_PROFILE)],
    }
}

/// The expanded `default_ccache_name` of the first profile that sets it.
///
/// Missing files are skipped. A name that fails to expand is ignored with a
/// warning so the caller falls back to the built-in default.
pub fn configured_default(paths: &[PathBuf], tokens: &Tokens) -> Option<String> {
    for path in paths {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read Kerberos profile");
                continue;
            }
        };
        let Some(template) = default_ccache_name(&contents) else {
            continue;
        };
        return match expand(&template, tokens) {
            Ok(name) => {
                debug!(path = %path.display(), %name, "default cache name from profile");
                Some(name)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring default_ccache_name");
                None
            }
        };
    }
    None
}

/// The first top-level `default_ccache_name` in `[libdefaults]`.
pub fn default_ccache_name(contents: &str) -> Option<String> {
    let mut in_libdefaults = false;
    let mut depth = 0usize;

    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[') {
            in_libdefaults = section.split(']').next().map(str::trim) == Some("libdefaults");
            depth = 0;
            continue;
        }
        if line.starts_with('}') {
            depth = depth.saturating_sub(1);
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        if value == "{" {
            depth += 1;
            continue;
        }
        let key = key.trim().trim_end_matches('*').trim_end();
        if in_libdefaults && depth == 0 && key == "default_ccache_name" {
            let value = unquote(value);
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Substitute `%{uid}`, `%{euid}`, `%{USERID}`, `%{username}`, `%{TEMP}`
/// and `%{null}` in `template`.
pub fn expand(template: &str, tokens: &Tokens) -> anyhow::Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("%{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .with_context(|| format!("unterminated token in '{template}'"))?;
        match &after[..end] {
            "uid" => out.push_str(&tokens.uid.to_string()),
            "euid" | "USERID" => out.push_str(&tokens.euid.to_string()),
            "username" => out.push_str(
                tokens
                    .username
                    .as_deref()
                    .with_context(|| format!("no user name for uid {}", tokens.euid))?,
            ),
            "TEMP" => out.push_str(&tokens.temp),
            "null" => {}
            other => bail!("unsupported token %{{{other}}} in '{template}'"),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> Tokens {
        Tokens {
            uid: 1000,
            euid: 1001,
            username: Some("alice".into()),
            temp: "/var/tmp".into(),
        }
    }

    #[test]
    fn reads_libdefaults_relation() {
        let conf = "\
[libdefaults]
    default_realm = EXAMPLE.COM
    default_ccache_name = KEYRING:persistent:%{uid}
";
        assert_eq!(
            default_ccache_name(conf).as_deref(),
            Some("KEYRING:persistent:%{uid}")
        );
    }

    #[test]
    fn other_sections_and_subsections_are_skipped() {
        let conf = "\
# default_ccache_name = FILE:/commented
[realms]
    EXAMPLE.COM = {
        default_ccache_name = FILE:/wrong-section
    }

[libdefaults]
    EXAMPLE.COM = {
        default_ccache_name = FILE:/realm-specific
    }
    ; default_ccache_name = FILE:/also-commented
    default_ccache_name = \"DIR:/run/user/%{uid}/krb5cc\"
    default_ccache_name = FILE:/second
";
        assert_eq!(
            default_ccache_name(conf).as_deref(),
            Some("DIR:/run/user/%{uid}/krb5cc")
        );
    }

    #[test]
    fn absent_relation_is_none() {
        assert_eq!(default_ccache_name("[libdefaults]\n  dns_lookup_kdc = true\n"), None);
        assert_eq!(default_ccache_name(""), None);
    }

    #[test]
    fn expands_tokens() {
        let t = tokens();
        assert_eq!(
            expand("FILE:%{TEMP}/krb5cc_%{uid}", &t).unwrap(),
            "FILE:/var/tmp/krb5cc_1000"
        );
        assert_eq!(expand("DIR:/run/%{euid}/%{USERID}", &t).unwrap(), "DIR:/run/1001/1001");
        assert_eq!(expand("FILE:/tmp/%{username}%{null}", &t).unwrap(), "FILE:/tmp/alice");
        assert_eq!(expand("FILE:/tmp/plain", &t).unwrap(), "FILE:/tmp/plain");
    }

    #[test]
    fn bad_tokens_are_errors() {
        let t = tokens();
        assert!(expand("FILE:/tmp/%{LIBDIR}", &t).is_err());
        assert!(expand("FILE:/tmp/%{uid", &t).is_err());

        let anonymous = Tokens { username: None, ..tokens() };
        assert!(expand("FILE:/tmp/%{username}", &anonymous).is_err());
    }

    #[test]
    fn first_profile_setting_the_name_wins() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.conf");
        let first = dir.path().join("first.conf");
        let second = dir.path().join("second.conf");
        fs::write(&empty, "[libdefaults]\n  default_realm = EXAMPLE.COM\n").unwrap();
        fs::write(&first, "[libdefaults]\n  default_ccache_name = FILE:/tmp/a_%{uid}\n").unwrap();
        fs::write(&second, "[libdefaults]\n  default_ccache_name = FILE:/tmp/b\n").unwrap();

        let paths = vec![dir.path().join("missing.conf"), empty, first, second];
        assert_eq!(
            configured_default(&paths, &tokens()).as_deref(),
            Some("FILE:/tmp/a_1000")
        );
    }

    #[test]
    fn unexpandable_name_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("krb5.conf");
        fs::write(&conf, "[libdefaults]\n  default_ccache_name = FILE:%{LIBDIR}/cc\n").unwrap();
        assert_eq!(configured_default(&[conf], &tokens()), None);
    }
}
