// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the filter engine: bootstrap, evaluation and the
//! cross-resource write paths.

#[cfg(test)]
mod tests {
    use crate::clients::ClientPolicy;
    use crate::engine::{Decision, EngineConfig, FilterEngine};
    use crate::errors::EngineError;
    use crate::lists::ListKind;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn config(tmp: &TempDir) -> EngineConfig {
        EngineConfig {
            clients_file: tmp.path().join("clients.json"),
            blocklist_dir: tmp.path().join("blocklists"),
            whitelist_dir: tmp.path().join("whitelists"),
        }
    }

    async fn engine(tmp: &TempDir) -> Arc<FilterEngine> {
        FilterEngine::bootstrap(config(tmp)).await.unwrap()
    }

    fn policy(mode: ListKind, blocklists: &[&str], whitelists: &[&str]) -> ClientPolicy {
        ClientPolicy {
            blocklists: blocklists.iter().map(ToString::to_string).collect(),
            whitelists: whitelists.iter().map(ToString::to_string).collect(),
            mode,
        }
    }

    fn strings(texts: &[&str]) -> Vec<String> {
        texts.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_bootstrap_creates_directories() {
        let tmp = TempDir::new().unwrap();
        let _engine = engine(&tmp).await;
        assert!(tmp.path().join("blocklists").is_dir());
        assert!(tmp.path().join("whitelists").is_dir());
    }

    #[tokio::test]
    async fn test_bootstrap_loads_only_referenced_lists() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("blocklists")).unwrap();
        std::fs::write(tmp.path().join("blocklists").join("ads"), "example.com\n").unwrap();
        std::fs::write(tmp.path().join("blocklists").join("orphan"), "other.com\n").unwrap();
        std::fs::write(
            tmp.path().join("clients.json"),
            r#"{"10.0.0.1": {"blocklists": ["ads"], "whitelists": [], "mode": "blocklist"}}"#,
        )
        .unwrap();

        let engine = engine(&tmp).await;
        let names: Vec<String> = engine
            .list_meta(None)
            .await
            .into_iter()
            .map(|meta| meta.name)
            .collect();
        assert_eq!(names, vec!["ads"]);
    }

    #[tokio::test]
    async fn test_bootstrap_tolerates_dangling_reference() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("clients.json"),
            r#"{"10.0.0.1": {"blocklists": ["ghost"], "whitelists": [], "mode": "blocklist"}}"#,
        )
        .unwrap();

        let engine = engine(&tmp).await;
        // The dangling ref is skipped at evaluation; nothing matches, so
        // blocklist mode allows.
        assert_eq!(
            engine.decide("10.0.0.1", "example.com").await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn test_block_mode_with_exception() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .create_list(ListKind::Block, "ads", &strings(&["example.com !mail"]))
            .await
            .unwrap();
        engine
            .create_client("10.0.0.1", policy(ListKind::Block, &["ads"], &[]))
            .await
            .unwrap();

        assert_eq!(
            engine.decide("10.0.0.1", "example.com").await,
            Decision::Deny
        );
        assert_eq!(
            engine.decide("10.0.0.1", "tracker.example.com").await,
            Decision::Deny
        );
        assert_eq!(
            engine.decide("10.0.0.1", "mail.example.com").await,
            Decision::Allow
        );
        assert_eq!(engine.decide("10.0.0.1", "other.com").await, Decision::Allow);
    }

    #[tokio::test]
    async fn test_whitelist_mode_permits_only_matches() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .create_list(ListKind::Allow, "ok", &strings(&["work.example.com"]))
            .await
            .unwrap();
        engine
            .create_client("10.0.0.2", policy(ListKind::Allow, &[], &["ok"]))
            .await
            .unwrap();

        assert_eq!(
            engine.decide("10.0.0.2", "work.example.com").await,
            Decision::Allow
        );
        assert_eq!(
            engine.decide("10.0.0.2", "deep.work.example.com").await,
            Decision::Allow
        );
        assert_eq!(
            engine.decide("10.0.0.2", "facebook.com").await,
            Decision::Deny
        );
    }

    #[tokio::test]
    async fn test_unknown_client_denied() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        assert_eq!(
            engine.decide("10.0.0.99", "example.com").await,
            Decision::Deny
        );
    }

    #[tokio::test]
    async fn test_client_mode_only_consults_matching_refs() {
        // A blocklist-mode client with only whitelist refs blocks nothing.
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .create_list(ListKind::Allow, "ok", &strings(&["example.com"]))
            .await
            .unwrap();
        engine
            .create_client("10.0.0.3", policy(ListKind::Block, &[], &["ok"]))
            .await
            .unwrap();

        assert_eq!(
            engine.decide("10.0.0.3", "example.com").await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn test_create_list_returns_sorted_entries() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        let domains = engine
            .create_list(
                ListKind::Block,
                "ads",
                &strings(&["b.com", "a.com !x", "# comment"]),
            )
            .await
            .unwrap();
        assert_eq!(domains, vec!["a.com !x", "b.com"]);
    }

    #[tokio::test]
    async fn test_create_list_rejects_bad_entry() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        let err = engine
            .create_list(ListKind::Block, "ads", &strings(&["bad..domain"]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::BadEntry { .. }));
        // Nothing was created.
        assert!(engine.get_list(ListKind::Block, "ads").await.is_err());
    }

    #[tokio::test]
    async fn test_client_create_validates_references() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        let err = engine
            .create_client("10.0.0.1", policy(ListKind::Block, &["ghost"], &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ReferencedListMissing { .. }));
        assert!(engine.get_client("10.0.0.1").await.is_err());
    }

    #[tokio::test]
    async fn test_client_create_loads_on_disk_list_on_reference() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        // Present on disk but unreferenced, so not loaded yet.
        std::fs::write(
            tmp.path().join("blocklists").join("dormant"),
            "example.com\n",
        )
        .unwrap();
        assert!(engine.list_meta(None).await.is_empty());

        engine
            .create_client("10.0.0.1", policy(ListKind::Block, &["dormant"], &[]))
            .await
            .unwrap();

        assert_eq!(engine.list_meta(None).await.len(), 1);
        assert_eq!(
            engine.decide("10.0.0.1", "example.com").await,
            Decision::Deny
        );
    }

    #[tokio::test]
    async fn test_client_duplicate_create_rejected() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .create_client("10.0.0.1", policy(ListKind::Block, &[], &[]))
            .await
            .unwrap();
        let err = engine
            .create_client("10.0.0.1", policy(ListKind::Block, &[], &[]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_client_update_requires_existing() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        let err = engine
            .update_client("10.0.0.1", policy(ListKind::Block, &[], &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_list_repairs_client_refs() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .create_list(ListKind::Block, "x", &strings(&["example.com"]))
            .await
            .unwrap();
        engine
            .create_client("10.0.0.1", policy(ListKind::Block, &["x"], &[]))
            .await
            .unwrap();

        engine.delete_list(ListKind::Block, "x").await.unwrap();

        let repaired = engine.get_client("10.0.0.1").await.unwrap();
        assert!(repaired.blocklists.is_empty());

        // The on-disk document reflects the repair.
        let text = std::fs::read_to_string(tmp.path().join("clients.json")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["10.0.0.1"]["blocklists"], serde_json::json!([]));

        // And the formerly blocked name now resolves.
        assert_eq!(
            engine.decide("10.0.0.1", "example.com").await,
            Decision::Allow
        );
    }

    #[tokio::test]
    async fn test_update_list_visible_to_next_decision() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .create_list(ListKind::Block, "ads", &strings(&["old.com"]))
            .await
            .unwrap();
        engine
            .create_client("10.0.0.1", policy(ListKind::Block, &["ads"], &[]))
            .await
            .unwrap();
        assert_eq!(engine.decide("10.0.0.1", "old.com").await, Decision::Deny);

        engine
            .update_list(ListKind::Block, "ads", &strings(&["new.com"]))
            .await
            .unwrap();
        assert_eq!(engine.decide("10.0.0.1", "old.com").await, Decision::Allow);
        assert_eq!(engine.decide("10.0.0.1", "new.com").await, Decision::Deny);
    }

    #[tokio::test]
    async fn test_add_and_remove_domains() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .create_list(ListKind::Block, "ads", &strings(&[]))
            .await
            .unwrap();
        engine
            .add_domains(ListKind::Block, "ads", &strings(&["a.com", "b.com !x"]))
            .await
            .unwrap();
        assert_eq!(
            engine.get_list(ListKind::Block, "ads").await.unwrap(),
            vec!["a.com", "b.com !x"]
        );

        let remaining = engine
            .remove_domains(ListKind::Block, "ads", &strings(&["a.com"]))
            .await
            .unwrap();
        assert_eq!(remaining, vec!["b.com !x"]);
    }

    #[tokio::test]
    async fn test_concurrent_decisions_share_snapshot() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp).await;
        engine
            .create_list(ListKind::Block, "ads", &strings(&["example.com"]))
            .await
            .unwrap();
        engine
            .create_client("10.0.0.1", policy(ListKind::Block, &["ads"], &[]))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.decide("10.0.0.1", "sub.example.com").await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Decision::Deny);
        }
    }
}
