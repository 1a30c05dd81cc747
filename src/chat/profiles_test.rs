use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;

use super::*;
use crate::store::{Fields, MemoryStore};

fn profile_fields(name: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("displayName".into(), json!(name));
    fields.insert("favoriteEmoji".into(), json!("🌙"));
    fields
}

#[test]
fn claim_missing_returns_each_author_once() {
    let mut cache = ProfileCache::new();
    let first = cache.claim_missing(["a", "b", "a", ""]);
    assert_eq!(first, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(cache.entry("a"), Some(&ProfileEntry::Pending));

    let second = cache.claim_missing(["a", "b", "c"]);
    assert_eq!(second, vec!["c".to_string()]);
}

#[test]
fn resolved_authors_are_not_claimed_again() {
    let mut cache = ProfileCache::new();
    cache.claim_missing(["a"]);
    cache.resolve("a", None);
    assert_eq!(cache.entry("a"), Some(&ProfileEntry::Missing));
    assert!(cache.claim_missing(["a"]).is_empty());
}

#[test]
fn label_prefers_profile_name_then_email_then_id() {
    let mut cache = ProfileCache::new();
    assert_eq!(cache.label("uid-1", Some("ayse@example.com")), "ayse");
    assert_eq!(cache.label("uid-1", None), "uid-1");

    let profile = Profile { display_name: Some("Ayşe".into()), ..Profile::default() };
    cache.resolve("uid-1", Some(profile));
    assert_eq!(cache.label("uid-1", Some("ayse@example.com")), "Ayşe");
    assert_eq!(cache.get("uid-1").and_then(Profile::name), Some("Ayşe"));
}

#[tokio::test]
async fn fetch_profile_reads_document() {
    let store = MemoryStore::new();
    store.set(PROFILES, "uid-1", profile_fields("Deniz")).await.unwrap();

    let profile = fetch_profile(&store, "uid-1").await.unwrap().unwrap();
    assert_eq!(profile.uid, "uid-1");
    assert_eq!(profile.name(), Some("Deniz"));
    assert_eq!(profile.favorite_emoji.as_deref(), Some("🌙"));
    assert!(fetch_profile(&store, "nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn spawned_fetch_reports_through_channel() {
    let store = MemoryStore::new();
    store.set(PROFILES, "uid-1", profile_fields("Deniz")).await.unwrap();
    let (tx, mut rx) = mpsc::channel(4);

    spawn_profile_fetch(Arc::new(store.clone()), "uid-1".into(), tx.clone());
    spawn_profile_fetch(Arc::new(store.clone()), "uid-2".into(), tx);

    let mut results = Vec::new();
    for _ in 0..2 {
        let event = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        if let FeedEvent::Profile { uid, profile } = event {
            results.push((uid, profile.and_then(|p| p.display_name)));
        }
    }
    results.sort();
    assert_eq!(
        results,
        vec![("uid-1".to_string(), Some("Deniz".to_string())), ("uid-2".to_string(), None)]
    );
}

#[tokio::test]
async fn failed_fetch_reports_missing() {
    let store = MemoryStore::new();
    store.set_offline(true);
    let (tx, mut rx) = mpsc::channel(1);
    spawn_profile_fetch(Arc::new(store), "uid-1".into(), tx);

    let event = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(event, FeedEvent::Profile { uid: "uid-1".into(), profile: None });
}

#[tokio::test]
async fn late_result_after_session_drop_is_discarded() {
    let store = MemoryStore::new();
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    // Must not panic when the receiver is gone.
    spawn_profile_fetch(Arc::new(store), "uid-1".into(), tx);
    tokio::time::sleep(Duration::from_millis(20)).await;
}
