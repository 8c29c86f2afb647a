    use super::*;
    use crate::entry::{ActionKind, ExecutionMethod, LogStatus};
    use crate::journal::MemoryJournalStore;
    use futures::future::join_all;
    use tempfile::TempDir;

    fn entry(step: &str) -> ExecutionLogEntry {
        ExecutionLogEntry::new(step, LogStatus::Success)
            .with_action(ActionKind::Navigation)
            .with_method(ExecutionMethod::Command)
    }

    #[tokio::test]
    async fn test_init_activate_log_release() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ContextManager::new(temp_dir.path());

        let context = manager.init("demo").await.unwrap();
        assert_eq!(context.id, "demo");
        assert!(!context.active);
        for sub in WORKSPACE_DIRS {
            assert!(context.workspace.join(sub).is_dir());
        }

        manager.set_context("demo").await.unwrap();
        manager.log(entry("open page")).await.unwrap();
        assert_eq!(manager.release().await.unwrap(), "demo");

        let journal = manager.journal("demo").await.unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].step, "open page");
        assert!(!manager.get("demo").await.unwrap().active);
        assert!(manager.active().await.is_none());
    }

    #[tokio::test]
    async fn test_second_context_conflicts() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ContextManager::new(temp_dir.path());
        manager.init("first").await.unwrap();
        manager.init("second").await.unwrap();

        manager.set_context("first").await.unwrap();
        let err = manager.set_context("second").await.unwrap_err();
        assert!(matches!(
            err,
            ContextError::ContextConflict { ref active, ref requested }
                if active == "first" && requested == "second"
        ));

        assert_eq!(manager.active().await.as_deref(), Some("first"));
        assert!(manager.get("first").await.unwrap().active);
        assert!(!manager.get("second").await.unwrap().active);
    }

    #[tokio::test]
    async fn test_set_context_is_reentrant() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ContextManager::new(temp_dir.path());
        manager.init("demo").await.unwrap();

        manager.set_context("demo").await.unwrap();
        let again = manager.set_context("demo").await.unwrap();
        assert!(again.active);
        assert_eq!(manager.active().await.as_deref(), Some("demo"));
    }

    #[tokio::test]
    async fn test_release_twice() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ContextManager::new(temp_dir.path());
        manager.init("demo").await.unwrap();
        manager.set_context("demo").await.unwrap();

        assert!(manager.release().await.is_ok());
        assert!(matches!(manager.release().await, Err(ContextError::NoActiveContext)));
    }

    #[tokio::test]
    async fn test_log_requires_active_context() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ContextManager::new(temp_dir.path());
        manager.init("demo").await.unwrap();

        let err = manager.log(entry("orphan")).await.unwrap_err();
        assert!(matches!(err, ContextError::NoActiveContext));
        assert!(manager.journal("demo").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_unknown_context() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ContextManager::new(temp_dir.path());

        assert!(matches!(
            manager.set_context("ghost").await,
            Err(ContextError::ContextNotFound(_))
        ));
        assert!(matches!(
            manager.set_context("../escape").await,
            Err(ContextError::ContextNotFound(_))
        ));
        assert!(manager.active().await.is_none());
    }

    #[tokio::test]
    async fn test_init_suffixes_colliding_ids() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ContextManager::new(temp_dir.path());

        assert_eq!(manager.init("Demo Run").await.unwrap().id, "demo-run");
        assert_eq!(manager.init("demo run").await.unwrap().id, "demo-run-2");
        assert_eq!(manager.init("demo-run").await.unwrap().id, "demo-run-3");
        assert!(matches!(
            manager.init("!!!").await,
            Err(ContextError::InvalidDescription(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_inits_get_distinct_ids() {
        let temp_dir = TempDir::new().unwrap();
        let manager = Arc::new(ContextManager::new(temp_dir.path()));

        let inits = (0..8).map(|_| {
            let manager = manager.clone();
            async move { manager.init("batch").await.unwrap().id }
        });
        let mut ids = join_all(inits).await;
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[tokio::test]
    async fn test_at_most_one_active_under_contention() {
        let temp_dir = TempDir::new().unwrap();
        let manager = Arc::new(ContextManager::new(temp_dir.path()));
        for n in 0..16 {
            manager.init(&format!("ctx {}", n)).await.unwrap();
        }

        let handles: Vec<_> = (0..16)
            .map(|n| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.set_context(&format!("ctx-{}", n)).await })
            })
            .collect();

        let mut activated = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => activated += 1,
                Err(ContextError::ContextConflict { .. }) => conflicts += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(activated, 1);
        assert_eq!(conflicts, 15);

        let active: Vec<_> = manager
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.active)
            .collect();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_logs_all_land() {
        let temp_dir = TempDir::new().unwrap();
        let manager = Arc::new(ContextManager::new(temp_dir.path()));
        manager.init("demo").await.unwrap();
        manager.set_context("demo").await.unwrap();

        let logs = (0..20).map(|n| {
            let manager = manager.clone();
            async move { manager.log(entry(&format!("step {}", n))).await.unwrap() }
        });
        join_all(logs).await;

        assert_eq!(manager.journal("demo").await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_open_restores_active_context() {
        let temp_dir = TempDir::new().unwrap();
        {
            let manager = ContextManager::new(temp_dir.path());
            manager.init("resume me").await.unwrap();
            manager.set_context("resume-me").await.unwrap();
        }

        let manager = ContextManager::open(temp_dir.path()).await.unwrap();
        assert_eq!(manager.active().await.as_deref(), Some("resume-me"));
        assert_eq!(manager.current().await.unwrap().id, "resume-me");

        manager.release().await.unwrap();
        let reopened = ContextManager::open(temp_dir.path()).await.unwrap();
        assert!(reopened.active().await.is_none());
    }

    #[tokio::test]
    async fn test_open_clears_stale_marker() {
        let temp_dir = TempDir::new().unwrap();
        let projects = temp_dir.path().join("projects");
        std::fs::create_dir_all(&projects).unwrap();
        std::fs::write(projects.join(".current"), "gone").unwrap();

        let manager = ContextManager::open(temp_dir.path()).await.unwrap();
        assert!(manager.active().await.is_none());
        assert!(!projects.join(".current").exists());
    }

    #[tokio::test]
    async fn test_list_and_journal_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ContextManager::new(temp_dir.path());
        assert!(manager.list().await.unwrap().is_empty());

        manager.init("alpha").await.unwrap();
        manager.init("beta").await.unwrap();
        manager.set_context("beta").await.unwrap();

        let contexts = manager.list().await.unwrap();
        assert_eq!(contexts.len(), 2);
        assert!(contexts.iter().any(|c| c.id == "beta" && c.active));
        assert!(contexts.iter().any(|c| c.id == "alpha" && !c.active));

        assert!(matches!(
            manager.journal("missing").await,
            Err(ContextError::ContextNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_journal_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryJournalStore::new());
        let manager = ContextManager::with_journal(temp_dir.path(), store.clone());
        manager.init("demo").await.unwrap();
        manager.set_context("demo").await.unwrap();

        manager.log(entry("one")).await.unwrap();
        manager.log(entry("two")).await.unwrap();

        let stored = store.read("demo").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].step, "two");
        assert!(!temp_dir.path().join("projects/demo/logs/execution.jsonl").exists());
    }
