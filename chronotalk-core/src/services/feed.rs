//! Feed store - the post collection and local identity of one context
//!
//! Every mutation is prepared on a copy, written to the durable store as a
//! whole value, and only then committed in memory. A failed write leaves the
//! in-memory state equal to the last value written.
//!
//! Whole-collection writes make each mutation O(feed size); that is the
//! scalability ceiling of this design.

use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::{random_base36, AuthoredComment, Category, Comment, Post, User, DEFAULT_AVATAR};
use crate::ports::{Clock, DurableStore};

/// Storage key holding the JSON array of posts
pub const POSTS_KEY: &str = "chronotalk_posts_data";

/// Storage key holding the local identity
pub const USER_KEY: &str = "chronotalk_current_user";

/// Read the persisted posts; missing or malformed data yields an empty feed
pub fn load_initial_posts(storage: &dyn DurableStore) -> Vec<Post> {
    match storage.get_item(POSTS_KEY) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(error = %e, "persisted posts are malformed, starting empty");
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read persisted posts, starting empty");
            Vec::new()
        }
    }
}

/// Read the persisted identity; missing or malformed data yields a new random one
pub fn load_initial_user(storage: &dyn DurableStore) -> User {
    read_user(storage).unwrap_or_else(User::random)
}

fn read_user(storage: &dyn DurableStore) -> Option<User> {
    let raw = match storage.get_item(USER_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read persisted identity");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(error = %e, "persisted identity is malformed");
            None
        }
    }
}

fn highest_numeric_id(posts: &[Post]) -> u64 {
    posts
        .iter()
        .filter_map(|p| p.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

/// Totals shown by `ct status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedStats {
    pub posts: usize,
    pub comments: usize,
    pub likes: u64,
}

/// Single source of truth for one context
pub struct FeedStore {
    storage: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    posts: Vec<Post>,
    user: User,
    last_post_id: u64,
}

impl FeedStore {
    /// Load persisted state, or start empty with a fresh identity
    ///
    /// A freshly generated identity is persisted right away so it stays the
    /// same across runs; failing to do so only costs that stability.
    pub fn open(storage: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        let posts = load_initial_posts(storage.as_ref());
        let user = match read_user(storage.as_ref()) {
            Some(user) => user,
            None => {
                let user = User::random();
                if let Err(e) = write_user(storage.as_ref(), &user) {
                    tracing::warn!(error = %e, "failed to persist new identity");
                }
                user
            }
        };
        let last_post_id = highest_numeric_id(&posts);

        Self {
            storage,
            clock,
            posts,
            user,
            last_post_id,
        }
    }

    // === Queries ===

    /// Posts, newest insertion first
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn current_user(&self) -> &User {
        &self.user
    }

    pub fn get_post(&self, post_id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    /// Posts in `category` (all when `None`) whose title or content contains `query`
    pub fn filter_posts(&self, category: Option<Category>, query: &str) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .filter(|p| p.matches_query(query))
            .collect()
    }

    /// Posts whose author snapshot carries `user_id`
    pub fn posts_by(&self, user_id: &str) -> Vec<&Post> {
        self.posts.iter().filter(|p| p.author.id == user_id).collect()
    }

    /// Comments whose author snapshot carries `user_id`, feed order
    pub fn comments_by(&self, user_id: &str) -> Vec<AuthoredComment> {
        self.posts
            .iter()
            .flat_map(|post| {
                post.comments
                    .iter()
                    .filter(|c| c.author.id == user_id)
                    .map(|c| AuthoredComment {
                        post_id: post.id.clone(),
                        post_title: post.title.clone(),
                        comment: c.clone(),
                    })
            })
            .collect()
    }

    pub fn stats(&self) -> FeedStats {
        FeedStats {
            posts: self.posts.len(),
            comments: self.posts.iter().map(|p| p.comments.len()).sum(),
            likes: self.posts.iter().map(|p| p.likes).sum(),
        }
    }

    // === Mutations ===

    /// Create a post and put it at the top of the feed
    pub fn create_post(&mut self, title: &str, content: &str, category: Category) -> Result<Post> {
        if title.trim().is_empty() {
            return Err(Error::validation("Title cannot be empty"));
        }
        if content.trim().is_empty() {
            return Err(Error::validation("Content cannot be empty"));
        }

        let id = self.next_post_id();
        let post = Post::new(
            id.to_string(),
            title,
            content,
            category,
            self.user.clone(),
            self.clock.now_ms(),
        );

        let mut posts = Vec::with_capacity(self.posts.len() + 1);
        posts.push(post.clone());
        posts.extend(self.posts.iter().cloned());
        self.commit_posts(posts)?;

        tracing::debug!(post_id = %post.id, "post created");
        Ok(post)
    }

    /// Append a comment; `Ok(None)` when the post does not exist
    pub fn add_comment(
        &mut self,
        post_id: &str,
        content: &str,
        is_ai_generated: bool,
    ) -> Result<Option<Comment>> {
        if content.trim().is_empty() {
            return Err(Error::validation("Comment cannot be empty"));
        }
        let Some(index) = self.position(post_id) else {
            tracing::debug!(post_id, "comment target not found");
            return Ok(None);
        };

        let now = self.clock.now_ms();
        let comment = Comment {
            id: format!("{}{}", now, random_base36(9)),
            author: if is_ai_generated {
                User::chrono_bot()
            } else {
                self.user.clone()
            },
            content: content.to_string(),
            timestamp: now,
            is_ai_generated,
        };

        let mut posts = self.posts.clone();
        posts[index].comments.push(comment.clone());
        self.commit_posts(posts)?;

        Ok(Some(comment))
    }

    /// Add one like; returns the new count, `Ok(None)` when the post does not exist
    ///
    /// Likes are not deduplicated per user.
    pub fn like_post(&mut self, post_id: &str) -> Result<Option<u64>> {
        let Some(index) = self.position(post_id) else {
            tracing::debug!(post_id, "like target not found");
            return Ok(None);
        };

        let mut posts = self.posts.clone();
        posts[index].likes += 1;
        let likes = posts[index].likes;
        self.commit_posts(posts)?;

        Ok(Some(likes))
    }

    /// Replace the local identity
    ///
    /// Callers keep the id; a different one is accepted but logged. Past
    /// author snapshots are left untouched.
    pub fn update_profile(&mut self, user: User) -> Result<User> {
        let name = user.name.trim();
        if name.is_empty() {
            return Err(Error::validation("Name cannot be empty"));
        }

        let avatar = user.avatar.trim();
        let avatar = if avatar.is_empty() {
            DEFAULT_AVATAR.to_string()
        } else {
            Url::parse(avatar)
                .map_err(|e| Error::validation(format!("Invalid avatar URL: {}", e)))?;
            avatar.to_string()
        };

        if user.id != self.user.id {
            tracing::warn!(old = %self.user.id, new = %user.id, "profile update changes the user id");
        }

        let updated = User::new(user.id, name, avatar);
        write_user(self.storage.as_ref(), &updated)?;
        self.user = updated.clone();
        Ok(updated)
    }

    /// Discard the current identity and install a brand-new random one
    ///
    /// Irreversible: nothing links the old identity's posts to the new one.
    pub fn switch_identity(&mut self) -> Result<User> {
        let user = User::random();
        write_user(self.storage.as_ref(), &user)?;
        tracing::info!(old = %self.user.id, new = %user.id, "identity switched");
        self.user = user.clone();
        Ok(user)
    }

    /// Replace the in-memory feed with a value another context wrote
    ///
    /// Nothing is written back.
    pub fn reconcile_posts(&mut self, posts: Vec<Post>) {
        self.last_post_id = self.last_post_id.max(highest_numeric_id(&posts));
        self.posts = posts;
    }

    // === Internals ===

    fn position(&self, post_id: &str) -> Option<usize> {
        self.posts.iter().position(|p| p.id == post_id)
    }

    /// Epoch-ms id, bumped past anything already issued or loaded
    fn next_post_id(&mut self) -> u64 {
        let now = self.clock.now_ms().max(0) as u64;
        let id = match self.last_post_id.checked_add(1) {
            Some(bumped) => bumped.max(now),
            // Floor pinned at u64::MAX by a loaded id: go back to the clock
            None => {
                let mut candidate = now;
                while self.posts.iter().any(|p| p.id == candidate.to_string()) {
                    candidate = candidate.wrapping_add(1);
                }
                candidate
            }
        };
        self.last_post_id = id;
        id
    }

    fn commit_posts(&mut self, posts: Vec<Post>) -> Result<()> {
        let json = serde_json::to_string(&posts)?;
        self.storage.set_item(POSTS_KEY, &json)?;
        self.posts = posts;
        Ok(())
    }
}

fn write_user(storage: &dyn DurableStore, user: &User) -> Result<()> {
    let json = serde_json::to_string(user)?;
    storage.set_item(USER_KEY, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    use crate::adapters::memory::MemoryMedium;
    use crate::ports::{StorageEvents, SystemClock};

    struct ManualClock(AtomicI64);

    impl ManualClock {
        fn at(ms: i64) -> Arc<Self> {
            Arc::new(Self(AtomicI64::new(ms)))
        }

        fn set(&self, ms: i64) {
            self.0.store(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Reads succeed, writes always fail
    struct ReadOnlyStorage;

    impl DurableStore for ReadOnlyStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::storage("quota exceeded"))
        }
        fn remove_item(&self, _key: &str) -> Result<()> {
            Ok(())
        }
        fn subscribe(&self) -> Result<StorageEvents> {
            Err(Error::storage("not supported"))
        }
    }

    fn open_store() -> (MemoryMedium, FeedStore) {
        let medium = MemoryMedium::new();
        let store = FeedStore::open(Arc::new(medium.context()), Arc::new(SystemClock));
        (medium, store)
    }

    #[test]
    fn test_empty_storage_scenario() {
        let (_medium, mut store) = open_store();

        let post = store
            .create_post("T", "C", "Productividad".parse().unwrap())
            .unwrap();
        store.add_comment(&post.id, "hi", false).unwrap();
        store.like_post(&post.id).unwrap();

        assert_eq!(store.posts().len(), 1);
        let post = &store.posts()[0];
        assert_eq!(post.title, "T");
        assert_eq!(post.likes, 1);
        assert_eq!(post.comments.len(), 1);
        assert_eq!(post.comments[0].content, "hi");
        assert_eq!(&post.comments[0].author, store.current_user());
        assert!(!post.comments[0].is_ai_generated);
    }

    #[test]
    fn test_order_follows_calls_not_timestamps() {
        let medium = MemoryMedium::new();
        let clock = ManualClock::at(5_000);
        let mut store = FeedStore::open(Arc::new(medium.context()), clock.clone());

        let first = store.create_post("a", "a", Category::Other).unwrap();
        clock.set(1_000);
        let second = store.create_post("b", "b", Category::Other).unwrap();
        clock.set(3_000);
        let third = store.create_post("c", "c", Category::Other).unwrap();

        let ids: Vec<_> = store.posts().iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec![third.id.clone(), second.id.clone(), first.id.clone()]);
        assert_eq!(second.timestamp, 1_000);
        // ids stay unique even with the clock running backwards
        assert_ne!(first.id, second.id);
        assert_ne!(second.id, third.id);
    }

    #[test]
    fn test_ids_bumped_within_same_millisecond() {
        let medium = MemoryMedium::new();
        let mut store = FeedStore::open(Arc::new(medium.context()), ManualClock::at(42));

        let a = store.create_post("a", "a", Category::Tools).unwrap();
        let b = store.create_post("b", "b", Category::Tools).unwrap();
        assert_eq!(a.id, "42");
        assert_eq!(b.id, "43");
    }

    #[test]
    fn test_like_counts_every_call() {
        let (_medium, mut store) = open_store();
        let post = store.create_post("t", "c", Category::Mindfulness).unwrap();

        for _ in 0..5 {
            store.like_post(&post.id).unwrap();
        }
        assert_eq!(store.like_post(&post.id).unwrap(), Some(6));
        assert_eq!(store.get_post(&post.id).unwrap().likes, 6);
    }

    #[test]
    fn test_missing_post_is_reported_and_not_written() {
        let (medium, mut store) = open_store();
        store.create_post("t", "c", Category::Other).unwrap();
        let reader = medium.context();
        let before = reader.get_item(POSTS_KEY).unwrap();

        assert_eq!(store.add_comment("nonexistent", "x", false).unwrap(), None);
        assert_eq!(store.like_post("nonexistent").unwrap(), None);

        assert_eq!(reader.get_item(POSTS_KEY).unwrap(), before);
        assert_eq!(serde_json::to_string(store.posts()).unwrap(), before.unwrap());
    }

    #[test]
    fn test_ai_comment_uses_bot_identity() {
        let (_medium, mut store) = open_store();
        let post = store.create_post("t", "c", Category::Other).unwrap();

        let comment = store.add_comment(&post.id, "🤖", true).unwrap().unwrap();
        assert_eq!(comment.author, User::chrono_bot());
        assert!(comment.is_ai_generated);
    }

    #[test]
    fn test_blank_input_rejected() {
        let (_medium, mut store) = open_store();
        assert!(matches!(
            store.create_post("  ", "c", Category::Other),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.create_post("t", "\n", Category::Other),
            Err(Error::Validation(_))
        ));
        let post = store.create_post("t", "c", Category::Other).unwrap();
        assert!(matches!(
            store.add_comment(&post.id, " ", false),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_round_trip_through_storage() {
        let medium = MemoryMedium::new();
        let mut store = FeedStore::open(Arc::new(medium.context()), Arc::new(SystemClock));
        let post = store.create_post("t", "c", Category::WorkLife).unwrap();
        store.add_comment(&post.id, "uno", false).unwrap();
        store.add_comment(&post.id, "dos", true).unwrap();
        store.like_post(&post.id).unwrap();

        let reloaded = load_initial_posts(&medium.context());
        assert_eq!(reloaded, store.posts());
    }

    #[test]
    fn test_malformed_storage_falls_back() {
        let medium = MemoryMedium::new();
        let ctx = medium.context();
        ctx.set_item(POSTS_KEY, "{not json").unwrap();
        ctx.set_item(USER_KEY, "42").unwrap();

        assert!(load_initial_posts(&ctx).is_empty());
        let user = load_initial_user(&ctx);
        assert!(user.id.starts_with("u_"));
    }

    #[test]
    fn test_identity_persisted_on_first_open() {
        let medium = MemoryMedium::new();
        let first = FeedStore::open(Arc::new(medium.context()), Arc::new(SystemClock));
        let second = FeedStore::open(Arc::new(medium.context()), Arc::new(SystemClock));
        assert_eq!(first.current_user(), second.current_user());
    }

    #[test]
    fn test_profile_update_keeps_snapshots() {
        let (_medium, mut store) = open_store();
        let original = store.current_user().clone();
        let post = store.create_post("t", "c", Category::Other).unwrap();
        store.add_comment(&post.id, "hola", false).unwrap();

        let mut edited = original.clone();
        edited.name = "  Nueva Yo  ".to_string();
        edited.avatar = String::new();
        let updated = store.update_profile(edited).unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.name, "Nueva Yo");
        assert_eq!(updated.avatar, DEFAULT_AVATAR);
        let post = store.get_post(&post.id).unwrap();
        assert_eq!(post.author, original);
        assert_eq!(post.comments[0].author, original);
    }

    #[test]
    fn test_profile_update_validation() {
        let (_medium, mut store) = open_store();
        let mut user = store.current_user().clone();

        user.name = "   ".to_string();
        assert!(matches!(store.update_profile(user.clone()), Err(Error::Validation(_))));

        user.name = "Ok".to_string();
        user.avatar = "not a url".to_string();
        assert!(matches!(store.update_profile(user), Err(Error::Validation(_))));
    }

    #[test]
    fn test_switch_identity_replaces_user() {
        let (medium, mut store) = open_store();
        let before = store.current_user().clone();
        let post = store.create_post("t", "c", Category::Other).unwrap();

        let after = store.switch_identity().unwrap();
        assert_ne!(before.id, after.id);
        assert_eq!(store.get_post(&post.id).unwrap().author, before);
        assert!(store.posts_by(&after.id).is_empty());
        assert_eq!(load_initial_user(&medium.context()), after);
    }

    #[test]
    fn test_write_failure_leaves_state_unchanged() {
        let mut store = FeedStore::open(Arc::new(ReadOnlyStorage), Arc::new(SystemClock));
        let user = store.current_user().clone();

        assert!(matches!(
            store.create_post("t", "c", Category::Other),
            Err(Error::Storage(_))
        ));
        assert!(store.posts().is_empty());

        assert!(store.switch_identity().is_err());
        assert_eq!(store.current_user(), &user);
    }

    #[test]
    fn test_filter_and_authored_queries() {
        let (_medium, mut store) = open_store();
        let me = store.current_user().id.clone();
        let a = store
            .create_post("Pomodoro", "25 minutos", Category::Productivity)
            .unwrap();
        store
            .create_post("Siesta", "Dormir es productivo", Category::Mindfulness)
            .unwrap();
        store.add_comment(&a.id, "¡Funciona!", false).unwrap();
        store.add_comment(&a.id, "bot", true).unwrap();

        assert_eq!(store.filter_posts(None, "").len(), 2);
        assert_eq!(store.filter_posts(None, "PRODUCTIVO").len(), 1);
        assert_eq!(store.filter_posts(Some(Category::Productivity), "").len(), 1);
        assert!(store.filter_posts(Some(Category::Tools), "").is_empty());

        assert_eq!(store.posts_by(&me).len(), 2);
        let mine = store.comments_by(&me);
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].post_title, "Pomodoro");

        assert_eq!(
            store.stats(),
            FeedStats {
                posts: 2,
                comments: 2,
                likes: 0
            }
        );
    }

    #[test]
    fn test_reconcile_advances_id_floor() {
        let medium = MemoryMedium::new();
        let mut store = FeedStore::open(Arc::new(medium.context()), ManualClock::at(10));
        let foreign = Post::new("500", "x", "y", Category::Other, User::random(), 500);

        store.reconcile_posts(vec![foreign]);
        let post = store.create_post("t", "c", Category::Other).unwrap();
        assert_eq!(post.id, "501");
        assert_eq!(store.posts().len(), 2);
    }

    #[test]
    fn test_id_floor_at_max_falls_back_to_clock() {
        let medium = MemoryMedium::new();
        let pinned = Post::new(
            u64::MAX.to_string(),
            "x",
            "y",
            Category::Other,
            User::random(),
            0,
        );
        medium
            .context()
            .set_item(POSTS_KEY, &serde_json::to_string(&vec![pinned]).unwrap())
            .unwrap();

        let mut store = FeedStore::open(Arc::new(medium.context()), ManualClock::at(1_000));
        let first = store.create_post("a", "b", Category::Other).unwrap();
        let second = store.create_post("c", "d", Category::Other).unwrap();
        assert_eq!(first.id, "1000");
        assert_eq!(second.id, "1001");
        assert_eq!(store.posts().len(), 3);

        // A foreign write carrying the same id pins the floor again
        let reloaded = load_initial_posts(&medium.context());
        store.reconcile_posts(reloaded);
        let third = store.create_post("e", "f", Category::Other).unwrap();
        assert_eq!(third.id, "1002");
    }
}
