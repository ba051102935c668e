//! Legacy setting aliases
//!
//! Older deployments configured the database with flat `postgres_*` names
//! and `iam_auth_enabled` (and the matching upper-case environment
//! variables). They are folded into the
//! canonical `pg*` names exactly once, at load time, so the rest of the
//! system only ever sees one representation.

use std::collections::HashMap;
use tracing::warn;

/// Old flat name -> canonical name
pub const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("postgres_user", "pguser"),
    ("postgres_pass", "pgpassword"),
    ("postgres_host_reader", "pghost"),
    ("postgres_host_writer", "pghost_writer"),
    ("postgres_port", "pgport"),
    ("postgres_dbname", "pgdatabase"),
    ("postgres_user_writer", "pguser_writer"),
    ("iam_auth_enabled", "use_iam_auth"),
];

/// Settings older deployments may still carry that have no effect here.
/// Connections are recycled by idle timeout and max lifetime instead.
pub const IGNORED_SETTINGS: &[&str] = &["db_max_queries"];

/// A single alias that was folded into its canonical name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratedAlias {
    pub legacy: String,
    pub canonical: String,
}

/// Rename legacy keys of a `[postgres]` TOML table in place.
///
/// When both the legacy and the canonical key are present the canonical
/// value wins and the legacy one is dropped.
pub fn migrate_table(table: &mut toml::Table) -> Vec<MigratedAlias> {
    let mut migrated = Vec::new();

    for name in IGNORED_SETTINGS {
        if table.remove(*name).is_some() {
            warn!(setting = *name, "unsupported postgres setting is ignored");
        }
    }

    for (legacy, canonical) in LEGACY_ALIASES {
        let Some(value) = table.remove(*legacy) else {
            continue;
        };

        warn!(
            legacy = *legacy,
            canonical = *canonical,
            "deprecated postgres setting, use the canonical name instead"
        );

        if !table.contains_key(*canonical) {
            table.insert((*canonical).to_string(), value);
        }

        migrated.push(MigratedAlias {
            legacy: (*legacy).to_string(),
            canonical: (*canonical).to_string(),
        });
    }

    migrated
}

/// Resolve the canonical environment variables, falling back to the
/// legacy names.
///
/// Returns a map keyed by canonical (lower-case) setting name.
pub fn resolve_env<F>(lookup: F) -> (HashMap<String, String>, Vec<MigratedAlias>)
where
    F: Fn(&str) -> Option<String>,
{
    let mut values = HashMap::new();
    let mut migrated = Vec::new();

    for name in IGNORED_SETTINGS {
        let env_name = name.to_uppercase();
        if lookup(&env_name).is_some() {
            warn!(variable = %env_name, "unsupported environment variable is ignored");
        }
    }

    for (legacy, canonical) in LEGACY_ALIASES {
        let canonical_env = canonical.to_uppercase();
        let legacy_env = legacy.to_uppercase();

        if let Some(value) = lookup(&canonical_env) {
            values.insert((*canonical).to_string(), value);
            continue;
        }

        if let Some(value) = lookup(&legacy_env) {
            warn!(
                legacy = %legacy_env,
                canonical = %canonical_env,
                "deprecated environment variable, use the canonical name instead"
            );
            values.insert((*canonical).to_string(), value);
            migrated.push(MigratedAlias {
                legacy: legacy_env,
                canonical: canonical_env,
            });
        }
    }

    (values, migrated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_table_renames_all_aliases() {
        let mut table: toml::Table = toml::from_str(
            r#"
            postgres_user = "user"
            postgres_pass = "secret"
            postgres_host_reader = "reader.local"
            postgres_host_writer = "writer.local"
            postgres_port = 1111
            postgres_dbname = "pgstac"
            "#,
        )
        .unwrap();

        let migrated = migrate_table(&mut table);

        assert_eq!(migrated.len(), 6);
        assert_eq!(table["pguser"].as_str(), Some("user"));
        assert_eq!(table["pghost"].as_str(), Some("reader.local"));
        assert_eq!(table["pghost_writer"].as_str(), Some("writer.local"));
        assert_eq!(table["pgport"].as_integer(), Some(1111));
        assert!(LEGACY_ALIASES
            .iter()
            .all(|(legacy, _)| !table.contains_key(*legacy)));
    }

    #[test]
    fn test_canonical_key_wins_over_legacy() {
        let mut table: toml::Table = toml::from_str(
            r#"
            pghost = "new.local"
            postgres_host_reader = "old.local"
            "#,
        )
        .unwrap();

        let migrated = migrate_table(&mut table);

        assert_eq!(migrated.len(), 1);
        assert_eq!(table["pghost"].as_str(), Some("new.local"));
        assert!(!table.contains_key("postgres_host_reader"));
    }

    #[test]
    fn test_writer_user_and_iam_flag_are_folded() {
        let mut table: toml::Table = toml::from_str(
            r#"
            postgres_user_writer = "writer"
            iam_auth_enabled = true
            "#,
        )
        .unwrap();

        let migrated = migrate_table(&mut table);

        assert_eq!(migrated.len(), 2);
        assert_eq!(table["pguser_writer"].as_str(), Some("writer"));
        assert_eq!(table["use_iam_auth"].as_bool(), Some(true));
    }

    #[test]
    fn test_ignored_settings_are_dropped() {
        let mut table: toml::Table = toml::from_str(
            r#"
            db_max_queries = 100
            pghost = "db.local"
            "#,
        )
        .unwrap();

        let migrated = migrate_table(&mut table);

        assert!(migrated.is_empty());
        assert!(!table.contains_key("db_max_queries"));
        assert_eq!(table["pghost"].as_str(), Some("db.local"));
    }

    #[test]
    fn test_resolve_env_prefers_canonical_names() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PGHOST", "0.0.0.0"),
            ("POSTGRES_HOST_READER", "ignored"),
            ("POSTGRES_DBNAME", "pgstac"),
        ]);

        let (values, migrated) = resolve_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(values["pghost"], "0.0.0.0");
        assert_eq!(values["pgdatabase"], "pgstac");
        assert_eq!(
            migrated,
            vec![MigratedAlias {
                legacy: "POSTGRES_DBNAME".to_string(),
                canonical: "PGDATABASE".to_string(),
            }]
        );
    }
}
