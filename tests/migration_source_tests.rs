use std::path::Path;

use rls_repair::repair::load_source;
use rls_repair::sql::{split, StatementKind};

#[test]
fn bundled_fix_splits_into_executable_statements() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations/fix_rls_recursion.sql");
    let source = load_source(&path).unwrap();

    let statements = split(&source);

    assert_eq!(statements.len(), 7);
    assert_eq!(
        statements
            .iter()
            .filter(|statement| statement.kind == StatementKind::Drop)
            .count(),
        3
    );
    assert!(statements.iter().all(|statement| statement.text.ends_with(';')));
    assert!(statements.iter().all(|statement| !statement.text.contains("--")));

    let function = &statements[4];
    assert!(function.text.starts_with("CREATE OR REPLACE FUNCTION public.is_admin_safe()"));
    assert!(function.text.ends_with("$$;"));
    assert_eq!(
        statements.iter().map(|statement| statement.index).collect::<Vec<_>>(),
        (1..=7).collect::<Vec<_>>()
    );
}
