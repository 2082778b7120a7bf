//! Streaming every source record into the write target.
//!
//! The target is initialized once, for the client of the first record, and
//! every record is then stored into it. Records the target already held
//! before the pass, and that survive that initialization, are not stored a
//! second time; duplicates within the source itself are kept.

use std::collections::HashMap;

use krbmv_ccache::{CcacheError, CcacheResult, CredentialCache, CredentialIter};
use krbmv_types::{Credential, Principal, TicketTimes};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{MigrateError, MigrateResult};

/// Counters of one copy pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    /// Credentials stored into the target.
    pub copied: usize,
    /// Source credentials the target already held before the pass.
    pub already_present: usize,
}

/// Identity of a record for the union with the target's prior contents.
type RecordKey = (Principal, Principal, TicketTimes);

fn record_key(credential: &Credential) -> RecordKey {
    (
        credential.client.clone(),
        credential.server.clone(),
        credential.times,
    )
}

/// Copy every credential of `source` into `target`, in source order.
///
/// Any failure aborts the pass; records already stored stay in the target.
pub fn copy<S, T>(source: &S, target: &T) -> MigrateResult<CopyStats>
where
    S: CredentialCache,
    T: CredentialCache,
{
    copy_records(open_source(source)?, target)
}

/// Start enumerating `source`. Failing here means the source cannot be read
/// at all, before anything is written anywhere.
pub fn open_source<S: CredentialCache>(source: &S) -> MigrateResult<CredentialIter<'_>> {
    source
        .credentials()
        .map_err(|e| MigrateError::CacheResolution {
            name: source.name().to_string_lossy(),
            source: e,
        })
}

/// Store already opened source `records` into `target`.
pub fn copy_records<T: CredentialCache>(
    records: CredentialIter<'_>,
    target: &T,
) -> MigrateResult<CopyStats> {
    let copy_error = |source: CcacheError| MigrateError::Copy {
        target: target.name().to_string_lossy(),
        source,
    };

    let mut stats = CopyStats::default();
    let mut holder: Option<Principal> = None;
    let mut prior: HashMap<RecordKey, usize> = HashMap::new();

    for record in records {
        let credential = record.map_err(copy_error)?;

        match &holder {
            None => {
                prior = kept_by_initialize(target, &credential.client).map_err(copy_error)?;
                target.initialize(&credential.client).map_err(copy_error)?;
                holder = Some(credential.client.clone());
            }
            Some(principal) if *principal != credential.client => {
                // Re-initializing would discard what this pass already stored.
                warn!(
                    principal = %principal,
                    client = %credential.client,
                    "credential of another client, storing it alongside the cache principal"
                );
            }
            Some(_) => {}
        }

        if let Some(remaining) = prior.get_mut(&record_key(&credential)) {
            if *remaining > 0 {
                *remaining -= 1;
                stats.already_present += 1;
                debug!(client = %credential.client, server = %credential.server, "credential already in target");
                continue;
            }
        }

        if credential.is_config_entry() {
            debug!(client = %credential.client, server = %credential.server, "copying cache config entry");
        } else {
            info!(
                client = %credential.client,
                server = %credential.server,
                times = %credential.times,
                "copying credential"
            );
        }
        target.store(&credential).map_err(copy_error)?;
        stats.copied += 1;
    }

    Ok(stats)
}

/// Records of `target` that survive `initialize(principal)`: its current
/// contents when it already belongs to `principal`, otherwise none.
fn kept_by_initialize<T: CredentialCache>(
    target: &T,
    principal: &Principal,
) -> CcacheResult<HashMap<RecordKey, usize>> {
    let mut kept = HashMap::new();
    if target.principal()?.as_ref() != Some(principal) {
        return Ok(kept);
    }
    for record in target.credentials()? {
        *kept.entry(record_key(&record?)).or_insert(0) += 1;
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    use krbmv_ccache::{CacheStore, Krb5Context};
    use krbmv_types::{CacheName, CacheType};

    fn alice() -> Principal {
        "alice@EXAMPLE.COM".parse().unwrap()
    }

    fn bob() -> Principal {
        "bob@EXAMPLE.COM".parse().unwrap()
    }

    fn cred(client: Principal, server: &str, end: u32) -> Credential {
        Credential::new(
            client,
            server.parse().unwrap(),
            TicketTimes {
                authtime: 1,
                starttime: 1,
                endtime: end,
                renew_till: 0,
            },
        )
    }

    fn collect(cache: &impl CredentialCache) -> Vec<Credential> {
        cache.credentials().unwrap().collect::<Result<_, _>>().unwrap()
    }

    /// Records every call and fails the store numbered `fail_at`.
    struct Recorder {
        name: CacheName,
        fail_at: Option<usize>,
        initialized: RefCell<Vec<Principal>>,
        stored: RefCell<Vec<Credential>>,
        stores: Cell<usize>,
    }

    impl Recorder {
        fn new(fail_at: Option<usize>) -> Self {
            Self {
                name: CacheName::from("MEMORY:recorder"),
                fail_at,
                initialized: RefCell::new(Vec::new()),
                stored: RefCell::new(Vec::new()),
                stores: Cell::new(0),
            }
        }
    }

    impl CredentialCache for Recorder {
        fn cache_type(&self) -> CacheType {
            CacheType::Memory
        }

        fn name(&self) -> &CacheName {
            &self.name
        }

        fn principal(&self) -> CcacheResult<Option<Principal>> {
            Ok(self.initialized.borrow().last().cloned())
        }

        fn initialize(&self, principal: &Principal) -> CcacheResult<()> {
            self.initialized.borrow_mut().push(principal.clone());
            Ok(())
        }

        fn store(&self, credential: &Credential) -> CcacheResult<()> {
            let n = self.stores.get() + 1;
            self.stores.set(n);
            if self.fail_at == Some(n) {
                return Err(CcacheError::NotInitialized("recorder".into()));
            }
            self.stored.borrow_mut().push(credential.clone());
            Ok(())
        }

        fn credentials(&self) -> CcacheResult<CredentialIter<'_>> {
            let records = self.stored.borrow().clone();
            Ok(Box::new(records.into_iter().map(Ok)))
        }
    }

    fn fill(ctx: &Krb5Context, name: &str, creds: &[Credential]) -> krbmv_ccache::Ccache {
        let cache = ctx.resolve(&CacheName::from(name)).unwrap();
        if let Some(first) = creds.first() {
            cache.initialize(&first.client).unwrap();
        }
        for c in creds {
            cache.store(c).unwrap();
        }
        cache
    }

    fn ctx() -> Krb5Context {
        Krb5Context::new(CacheName::from("MEMORY:default"))
    }

    #[test]
    fn copies_all_records_in_order() {
        let ctx = ctx();
        let creds = vec![
            cred(alice(), "krbtgt/EXAMPLE.COM@EXAMPLE.COM", 10),
            cred(alice(), "host/a.example.com@EXAMPLE.COM", 20),
            cred(alice(), "HTTP/b.example.com@EXAMPLE.COM", 30),
        ];
        let source = fill(&ctx, "MEMORY:source", &creds);
        let target = ctx.resolve(&CacheName::from("MEMORY:target")).unwrap();

        let stats = copy(&source, &target).unwrap();
        assert_eq!(stats, CopyStats { copied: 3, already_present: 0 });
        assert_eq!(collect(&target), creds);
        assert_eq!(target.principal().unwrap(), Some(alice()));
    }

    #[test]
    fn duplicate_source_records_are_kept() {
        let ctx = ctx();
        let tgt = cred(alice(), "krbtgt/EXAMPLE.COM@EXAMPLE.COM", 10);
        let source = fill(&ctx, "MEMORY:source", &[tgt.clone(), tgt.clone()]);
        let target = ctx.resolve(&CacheName::from("MEMORY:target")).unwrap();

        copy(&source, &target).unwrap();
        assert_eq!(collect(&target), vec![tgt.clone(), tgt]);
    }

    #[test]
    fn records_already_in_target_are_not_stored_again() {
        let ctx = ctx();
        let tgt = cred(alice(), "krbtgt/EXAMPLE.COM@EXAMPLE.COM", 10);
        let host = cred(alice(), "host/a.example.com@EXAMPLE.COM", 20);
        let source = fill(&ctx, "MEMORY:source", &[tgt.clone(), host.clone()]);
        let target = fill(&ctx, "MEMORY:target", &[tgt.clone()]);

        let stats = copy(&source, &target).unwrap();
        assert_eq!(stats, CopyStats { copied: 1, already_present: 1 });
        assert_eq!(collect(&target), vec![tgt, host]);
    }

    #[test]
    fn source_duplicates_beyond_target_contents_are_stored() {
        let ctx = ctx();
        let tgt = cred(alice(), "krbtgt/EXAMPLE.COM@EXAMPLE.COM", 10);
        let source = fill(&ctx, "MEMORY:source", &[tgt.clone(), tgt.clone()]);
        let target = fill(&ctx, "MEMORY:target", &[tgt.clone()]);

        let stats = copy(&source, &target).unwrap();
        assert_eq!(stats, CopyStats { copied: 1, already_present: 1 });
        assert_eq!(collect(&target), vec![tgt.clone(), tgt]);
    }

    #[test]
    fn contents_of_another_principal_do_not_suppress_stores() {
        let ctx = ctx();
        let alice_tgt = cred(alice(), "krbtgt/EXAMPLE.COM@EXAMPLE.COM", 10);
        let source = fill(&ctx, "MEMORY:source", &[alice_tgt.clone()]);
        let target = fill(
            &ctx,
            "MEMORY:target",
            &[cred(bob(), "krbtgt/EXAMPLE.COM@EXAMPLE.COM", 10)],
        );

        let stats = copy(&source, &target).unwrap();
        assert_eq!(stats.copied, 1);
        assert_eq!(target.principal().unwrap(), Some(alice()));
        assert_eq!(collect(&target), vec![alice_tgt]);
    }

    #[test]
    fn empty_source_is_a_vacuous_success() {
        let ctx = ctx();
        let source = fill(&ctx, "MEMORY:source", &[]);
        let target = Recorder::new(None);

        let stats = copy(&source, &target).unwrap();
        assert_eq!(stats, CopyStats::default());
        assert_eq!(target.stores.get(), 0);
        assert!(target.initialized.borrow().is_empty());
    }

    #[test]
    fn target_is_initialized_once_for_the_first_client() {
        let ctx = ctx();
        let source = fill(
            &ctx,
            "MEMORY:source",
            &[
                cred(alice(), "krbtgt/EXAMPLE.COM@EXAMPLE.COM", 10),
                cred(alice(), "host/a.example.com@EXAMPLE.COM", 20),
                cred(bob(), "krbtgt/EXAMPLE.COM@EXAMPLE.COM", 30),
            ],
        );
        let target = Recorder::new(None);

        let stats = copy(&source, &target).unwrap();
        assert_eq!(*target.initialized.borrow(), vec![alice()]);
        assert_eq!(stats.copied, 3);
        assert_eq!(target.stored.borrow().len(), 3);
    }

    #[test]
    fn mixed_clients_all_survive_in_the_target() {
        let ctx = ctx();
        let creds = vec![
            cred(alice(), "krbtgt/EXAMPLE.COM@EXAMPLE.COM", 10),
            cred(bob(), "krbtgt/EXAMPLE.COM@EXAMPLE.COM", 20),
        ];
        let source = fill(&ctx, "MEMORY:source", &creds);
        let target = ctx.resolve(&CacheName::from("MEMORY:t")).unwrap();

        let stats = copy(&source, &target).unwrap();
        let stored = collect(&target);
        assert_eq!(stats.copied, stored.len());
        assert_eq!(stored, creds);
    }

    #[test]
    fn store_failure_aborts_without_rollback() {
        let ctx = ctx();
        let source = fill(
            &ctx,
            "MEMORY:source",
            &[
                cred(alice(), "krbtgt/EXAMPLE.COM@EXAMPLE.COM", 10),
                cred(alice(), "host/a.example.com@EXAMPLE.COM", 20),
                cred(alice(), "HTTP/b.example.com@EXAMPLE.COM", 30),
            ],
        );
        let target = Recorder::new(Some(2));

        let err = copy(&source, &target).unwrap_err();
        assert!(matches!(err, MigrateError::Copy { .. }));
        assert_eq!(target.stores.get(), 2, "no further stores after the failure");
        assert_eq!(target.stored.borrow().len(), 1, "first record stays in place");
    }

    #[test]
    fn unreadable_source_is_a_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx();
        let name = CacheName::from(format!("FILE:{}/missing", dir.path().display()).as_str());
        let source = ctx.resolve(&name).unwrap();
        let target = Recorder::new(None);

        assert!(matches!(
            copy(&source, &target),
            Err(MigrateError::CacheResolution { .. })
        ));
        assert_eq!(target.stores.get(), 0);
    }
}
