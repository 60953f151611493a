#[cfg(test)]
mod tests {
    use punchclock::db::migrations::{get_db_version, init_with_migrations, needs_migration, MigrationManager};
    use rusqlite::Connection;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct MigrationTestContext {
        temp_dir: TempDir,
    }

    impl TestContext for MigrationTestContext {
        fn setup() -> Self {
            MigrationTestContext {
                temp_dir: tempfile::tempdir().unwrap(),
            }
        }
    }

    impl MigrationTestContext {
        fn open(&self) -> Connection {
            Connection::open(self.temp_dir.path().join("punchclock.db")).unwrap()
        }
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            > 0
    }

    #[test_context(MigrationTestContext)]
    #[test]
    fn test_fresh_database_is_migrated(ctx: &mut MigrationTestContext) {
        let mut conn = ctx.open();
        init_with_migrations(&mut conn).unwrap();
        assert_eq!(get_db_version(&conn).unwrap(), MigrationManager::new().latest_version());
        assert!(!needs_migration(&conn).unwrap());
        assert!(table_exists(&conn, "documents"));
        assert!(table_exists(&conn, "document_index"));
    }

    #[test_context(MigrationTestContext)]
    #[test]
    fn test_reopening_runs_nothing_new(ctx: &mut MigrationTestContext) {
        {
            let mut conn = ctx.open();
            init_with_migrations(&mut conn).unwrap();
        }
        let mut conn = ctx.open();
        init_with_migrations(&mut conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied as u32, MigrationManager::new().latest_version());
    }

    #[test_context(MigrationTestContext)]
    #[test]
    fn test_versions_are_recorded_in_order(ctx: &mut MigrationTestContext) {
        let mut conn = ctx.open();
        MigrationManager::new().run_migrations(&mut conn).unwrap();

        let mut stmt = conn.prepare("SELECT version FROM migrations ORDER BY id").unwrap();
        let versions: Vec<u32> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let expected: Vec<u32> = (1..=MigrationManager::new().latest_version()).collect();
        assert_eq!(versions, expected);
    }
}
