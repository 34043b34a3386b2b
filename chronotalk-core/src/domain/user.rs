//! User domain model

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Avatar used when a profile is saved without one
pub const DEFAULT_AVATAR: &str = "https://api.dicebear.com/7.x/avataaars/svg?seed=Felix";

const AVATAR_BASE: &str = "https://api.dicebear.com/7.x/avataaars/svg?seed=";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

const NAME_NOUNS: &[&str] = &[
    "Cronista",
    "Viajero",
    "Guardián",
    "Relojero",
    "Maestro",
    "Explorador",
];

const NAME_TRAITS: &[&str] = &[
    "Puntual",
    "Sereno",
    "Veloz",
    "Paciente",
    "Curioso",
    "Eficiente",
];

/// A locally generated identity
///
/// Nothing validates uniqueness; ids are random and scoped to the local
/// store. Posts and comments embed a copy of this struct (an author
/// snapshot), so later profile edits never reach them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: avatar.into(),
        }
    }

    /// Generate a fresh random identity
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let noun = NAME_NOUNS.choose(&mut rng).copied().unwrap_or("Viajero");
        let adjective = NAME_TRAITS.choose(&mut rng).copied().unwrap_or("Puntual");
        let number: u8 = rng.gen_range(10..100);

        Self {
            id: format!("u_{}", random_base36(9)),
            name: format!("{} {} {}", noun, adjective, number),
            avatar: format!("{}{}", AVATAR_BASE, random_base36(9)),
        }
    }

    /// The pseudo-identity used for AI-generated comments
    pub fn chrono_bot() -> Self {
        Self::new("ai", "ChronoBot", "")
    }

    pub fn is_ai(&self) -> bool {
        self.id == "ai"
    }
}

/// Random lowercase base-36 string of the given length
pub(crate) fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("u_me", "Yo", DEFAULT_AVATAR);
        assert_eq!(user.id, "u_me");
        assert_eq!(user.name, "Yo");
        assert_eq!(user.avatar, DEFAULT_AVATAR);
    }

    #[test]
    fn test_random_user_shape() {
        let user = User::random();
        assert!(user.id.starts_with("u_"));
        assert_eq!(user.id.len(), 11);
        assert!(user.avatar.starts_with(AVATAR_BASE));
        assert_eq!(user.name.split(' ').count(), 3);
    }

    #[test]
    fn test_random_users_differ() {
        assert_ne!(User::random().id, User::random().id);
    }

    #[test]
    fn test_chrono_bot() {
        let bot = User::chrono_bot();
        assert!(bot.is_ai());
        assert_eq!(bot.name, "ChronoBot");
        assert!(bot.avatar.is_empty());
    }

    #[test]
    fn test_base36_alphabet() {
        let s = random_base36(64);
        assert!(s.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
    }
}
