use std::env;
use std::os::unix::ffi::OsStringExt;

use anyhow::Context as _;
use colored::Colorize;
use krbmv_core::{migrate, CacheName, Krb5Context, MigrateConfig, MigrationReport};
use tracing::debug;

use crate::cli::{Cli, OutputFormat};
use crate::krb5conf::{self, Tokens};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut context = Krb5Context::new(default_cache_name());
    let config = MigrateConfig {
        source: cli.source_cache.map(|name| CacheName::from(name.into_vec())),
        target: cli.target_cache.map(|name| CacheName::from(name.into_vec())),
        force: cli.force,
    };
    debug!(?config, "migration config");

    let report = migrate(&mut context, &config)?;
    print_report(&report, &cli.format)
}

/// `KRB5CCNAME` when set and non-empty, then `default_ccache_name` from the
/// Kerberos profile, then the per-user MIT default.
fn default_cache_name() -> CacheName {
    if let Some(name) = env::var_os("KRB5CCNAME").filter(|name| !name.is_empty()) {
        return CacheName::from(name.into_vec());
    }
    let tokens = Tokens::current();
    match krb5conf::configured_default(&krb5conf::profile_paths(), &tokens) {
        Some(name) => CacheName::from(name.as_str()),
        None => Krb5Context::system_default_name(tokens.uid),
    }
}

fn print_report(report: &MigrationReport, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report).context("serializing report")?;
            println!("{json}");
        }
        OutputFormat::Text => {
            println!(
                "{} Copied {} credential(s)",
                "✓".green().bold(),
                report.copied.to_string().bold()
            );
            if report.already_present > 0 {
                println!(
                    "  {} credential(s) already present in the target",
                    report.already_present
                );
            }
            println!("  Source: {}", report.source.cyan());
            println!("  Target: {} ({})", report.target.cyan(), report.target_type);
            if report.forked {
                if let Some(principal) = &report.existing_principal {
                    println!("  Existing principal: {}", principal.yellow());
                }
                println!("  New cache: {}", report.write_target.green());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use krbmv_core::CacheType;

    fn report(forked: bool) -> MigrationReport {
        MigrationReport {
            source: "FILE:/tmp/krb5cc_1000".into(),
            target: "DIR::/run/krb5cc/tkt".into(),
            write_target: "DIR::/run/krb5cc/tktAbC123".into(),
            target_type: CacheType::Dir,
            forked,
            existing_principal: forked.then(|| "bob@EXAMPLE.COM".into()),
            copied: 2,
            already_present: 1,
        }
    }

    #[test]
    fn prints_both_formats() {
        print_report(&report(true), &OutputFormat::Text).unwrap();
        print_report(&report(false), &OutputFormat::Json).unwrap();
    }

    #[test]
    fn memory_run_end_to_end() {
        let mut context = Krb5Context::new(CacheName::from("MEMORY:login"));
        let config = MigrateConfig::new(CacheName::from("MEMORY:next"));
        let report = migrate(&mut context, &config).unwrap();
        assert_eq!(report.copied, 0);
        assert!(!report.forked);
    }
}
