//! Cross-context reconciliation tests
//!
//! Every context is a separate storage handle over the same medium or
//! directory, the way separate `ct` processes share one store.
//!
//! Run with: cargo test --test sync_test -- --nocapture

use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use chronotalk_core::adapters::file::FileStorage;
use chronotalk_core::adapters::memory::MemoryMedium;
use chronotalk_core::ports::{DurableStore, StorageEvent, SystemClock};
use chronotalk_core::services::{FeedStore, SyncListener, SyncOutcome, POSTS_KEY};
use chronotalk_core::{Category, Post, User};

fn open(storage: Arc<dyn DurableStore>) -> FeedStore {
    FeedStore::open(storage, Arc::new(SystemClock))
}

/// Keep applying notifications until `done` holds or the deadline passes
fn wait_until(
    listener: &SyncListener,
    store: &mut FeedStore,
    done: impl Fn(&FeedStore) -> bool,
) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done(store) {
            return true;
        }
        listener.wait(store, Duration::from_millis(50));
    }
    done(store)
}

#[test]
fn test_latest_value_replaces_feed_without_merge() {
    let medium = MemoryMedium::new();
    let mut a = open(Arc::new(medium.context()));
    let mut b = open(Arc::new(medium.context()));

    // B has local state that is in neither V1 nor V2
    b.create_post("solo B", "local", Category::Other).unwrap();

    let first = a.create_post("v1", "one", Category::Tools).unwrap();
    let v1 = a.posts().to_vec();
    a.like_post(&first.id).unwrap();
    a.create_post("v2", "two", Category::Tools).unwrap();
    let v2 = a.posts().to_vec();
    assert_ne!(v1, v2);

    // B only hears about V2
    let event = StorageEvent {
        key: POSTS_KEY.to_string(),
        new_value: Some(serde_json::to_string(&v2).unwrap()),
    };
    assert_eq!(
        SyncListener::apply(&mut b, &event),
        SyncOutcome::Applied { posts: 2 }
    );
    assert_eq!(b.posts(), v2.as_slice());
}

#[test]
fn test_burst_of_writes_ends_on_last() {
    let medium = MemoryMedium::new();
    let mut a = open(Arc::new(medium.context()));
    let b_storage: Arc<dyn DurableStore> = Arc::new(medium.context());
    let mut b = open(Arc::clone(&b_storage));
    let listener = SyncListener::attach(b_storage.as_ref()).unwrap();

    for i in 0..5 {
        a.create_post(&format!("p{}", i), "c", Category::Mindfulness)
            .unwrap();
    }

    let outcomes = listener.poll(&mut b);
    assert_eq!(outcomes.len(), 5);
    assert_eq!(outcomes.last(), Some(&SyncOutcome::Applied { posts: 5 }));
    assert_eq!(b.posts(), a.posts());
}

#[test]
fn test_file_contexts_converge() {
    let dir = TempDir::new().unwrap();
    let poll = Duration::from_millis(10);
    let a_storage: Arc<dyn DurableStore> = Arc::new(FileStorage::new(dir.path(), poll).unwrap());
    let b_storage: Arc<dyn DurableStore> = Arc::new(FileStorage::new(dir.path(), poll).unwrap());

    let mut a = open(Arc::clone(&a_storage));
    let mut b = open(Arc::clone(&b_storage));
    let listener = SyncListener::attach(b_storage.as_ref()).unwrap();

    let post = a.create_post("v1", "one", Category::Tools).unwrap();
    a.add_comment(&post.id, "v2", false).unwrap();

    let expected: Vec<Post> = a.posts().to_vec();
    assert!(wait_until(&listener, &mut b, |s| s.posts() == expected.as_slice()));

    // And back the other way, last writer wins
    b.like_post(&post.id).unwrap();
    let a_listener = SyncListener::attach(a_storage.as_ref()).unwrap();
    b.like_post(&post.id).unwrap();
    let expected = b.posts().to_vec();
    assert!(wait_until(&a_listener, &mut a, |s| s.posts() == expected.as_slice()));
    assert_eq!(a.get_post(&post.id).unwrap().likes, 2);
}

#[test]
fn test_identity_stays_per_context() {
    let medium = MemoryMedium::new();
    let a_storage: Arc<dyn DurableStore> = Arc::new(medium.context());
    let mut a = open(Arc::clone(&a_storage));
    let mut b = open(Arc::new(medium.context()));
    let listener = SyncListener::attach(a_storage.as_ref()).unwrap();

    let post = a.create_post("t", "c", Category::WorkLife).unwrap();
    a.add_comment(&post.id, "mine", false).unwrap();
    let a_user = a.current_user().clone();

    let mut renamed = b.current_user().clone();
    renamed.name = "Otro nombre".to_string();
    b.update_profile(renamed).unwrap();

    let mut edited = a_user.clone();
    edited.name = "Nuevo".to_string();
    a.update_profile(edited).unwrap();

    listener.poll(&mut a);
    assert_eq!(a.current_user().name, "Nuevo");
    assert_ne!(b.current_user().name, "Nuevo");

    // Snapshots embedded earlier keep the old name
    let stored = a.get_post(&post.id).unwrap();
    assert_eq!(stored.author, a_user);
    assert_eq!(stored.comments[0].author, a_user);
}

#[test]
fn test_removed_posts_clear_other_contexts() {
    let medium = MemoryMedium::new();
    let mut a = open(Arc::new(medium.context()));
    let b_storage: Arc<dyn DurableStore> = Arc::new(medium.context());
    let mut b = open(Arc::clone(&b_storage));

    a.create_post("t", "c", Category::Tools).unwrap();
    b.reconcile_posts(a.posts().to_vec());
    let listener = SyncListener::attach(b_storage.as_ref()).unwrap();

    medium.context().remove_item(POSTS_KEY).unwrap();

    assert_eq!(listener.poll(&mut b), vec![SyncOutcome::Cleared]);
    assert!(b.posts().is_empty());
    assert_ne!(b.current_user(), &User::chrono_bot());
}

#[test]
fn test_write_during_slow_draft_is_kept() {
    let medium = MemoryMedium::new();
    let a_storage: Arc<dyn DurableStore> = Arc::new(medium.context());
    let mut a = open(Arc::clone(&a_storage));
    let mut b = open(Arc::new(medium.context()));
    let listener = SyncListener::attach(a_storage.as_ref()).unwrap();

    // B publishes while A is waiting on the assistant
    b.create_post("from B", "c", Category::Tools).unwrap();

    listener.catch_up(&mut a, a_storage.as_ref()).unwrap();
    a.create_post("from A", "drafted", Category::Tools).unwrap();

    let stored: Vec<Post> =
        serde_json::from_str(&medium.context().get_item(POSTS_KEY).unwrap().unwrap()).unwrap();
    let titles: Vec<&str> = stored.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["from A", "from B"]);
}

#[test]
fn test_catch_up_beats_slow_file_watcher() {
    let dir = TempDir::new().unwrap();
    // The watcher will not report anything within this test
    let poll = Duration::from_secs(60);
    let a_storage: Arc<dyn DurableStore> = Arc::new(FileStorage::new(dir.path(), poll).unwrap());
    let b_storage: Arc<dyn DurableStore> = Arc::new(FileStorage::new(dir.path(), poll).unwrap());

    let mut a = open(Arc::clone(&a_storage));
    let mut b = open(Arc::clone(&b_storage));
    let listener = SyncListener::attach(a_storage.as_ref()).unwrap();

    b.create_post("from B", "c", Category::Tools).unwrap();

    let outcomes = listener.catch_up(&mut a, a_storage.as_ref()).unwrap();
    assert_eq!(outcomes, vec![SyncOutcome::Applied { posts: 1 }]);

    a.create_post("from A", "c", Category::Tools).unwrap();
    let reread = open(Arc::new(FileStorage::new(dir.path(), poll).unwrap()));
    assert_eq!(reread.posts().len(), 2);
}

#[test]
fn test_subscribing_after_load_misses_nothing() {
    let dir = TempDir::new().unwrap();
    let poll = Duration::from_millis(10);
    let a_storage: Arc<dyn DurableStore> = Arc::new(FileStorage::new(dir.path(), poll).unwrap());
    let b_storage: Arc<dyn DurableStore> = Arc::new(FileStorage::new(dir.path(), poll).unwrap());

    // A loads, then B writes before A subscribes
    let mut a = open(Arc::clone(&a_storage));
    let mut b = open(Arc::clone(&b_storage));
    b.create_post("early", "c", Category::Other).unwrap();

    let listener = SyncListener::attach(a_storage.as_ref()).unwrap();
    listener.catch_up(&mut a, a_storage.as_ref()).unwrap();
    assert_eq!(a.posts(), b.posts());

    // Later writes still arrive through the subscription
    b.create_post("late", "c", Category::Other).unwrap();
    let expected = b.posts().to_vec();
    assert!(wait_until(&listener, &mut a, |s| s.posts() == expected.as_slice()));
}
