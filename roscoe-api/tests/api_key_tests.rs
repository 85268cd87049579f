//! API key registry tests against an in-memory SQLite store.

use roscoe_api::ApiKeyService;
use roscoe_core::KeyError;
use roscoe_test_utils::memory_store;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
async fn added_key_validates_until_removed() -> TestResult {
    let store = memory_store().await?;
    let keys = ApiKeyService::new(store.clone());

    let key = keys.add("moderation bot").await?;
    assert_eq!(key.len(), 43);
    assert!(keys.validate(&key).await?);

    keys.remove(&key).await?;
    assert!(!keys.validate(&key).await?);
    Ok(())
}

#[tokio::test]
async fn removing_unknown_key_is_not_found() -> TestResult {
    let store = memory_store().await?;
    let keys = ApiKeyService::new(store.clone());

    assert_eq!(keys.remove("missing").await, Err(KeyError::NotFound));
    Ok(())
}

#[tokio::test]
async fn empty_key_never_validates() -> TestResult {
    let store = memory_store().await?;
    let keys = ApiKeyService::new(store.clone());
    keys.add_with_key("", "blank").await?;

    assert!(!keys.validate("").await?);
    Ok(())
}

#[tokio::test]
async fn list_returns_newest_first() -> TestResult {
    let store = memory_store().await?;
    let keys = ApiKeyService::new(store.clone());
    keys.add_with_key("first", "one").await?;
    keys.add_with_key("second", "two").await?;

    let listed = keys.list().await?;
    let names: Vec<&str> = listed.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(names, vec!["second", "first"]);
    assert_eq!(listed[0].description, "two");
    assert!(listed[0].created_at_utc().is_some());
    Ok(())
}
