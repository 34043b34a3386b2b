//! Post categories

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::Error;

/// Topic a post is filed under
///
/// Serialized as the display label, which is what the persisted feed has
/// always stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Productividad")]
    Productivity,
    #[serde(rename = "Procrastinación")]
    Procrastination,
    #[serde(rename = "Vida y Trabajo")]
    WorkLife,
    #[serde(rename = "Mindfulness")]
    Mindfulness,
    #[serde(rename = "Herramientas")]
    Tools,
    #[serde(rename = "Otros")]
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Productivity,
        Category::Procrastination,
        Category::WorkLife,
        Category::Mindfulness,
        Category::Tools,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Productivity => "Productividad",
            Category::Procrastination => "Procrastinación",
            Category::WorkLife => "Vida y Trabajo",
            Category::Mindfulness => "Mindfulness",
            Category::Tools => "Herramientas",
            Category::Other => "Otros",
        }
    }

    /// ASCII name accepted on the command line
    pub fn slug(&self) -> &'static str {
        match self {
            Category::Productivity => "productivity",
            Category::Procrastination => "procrastination",
            Category::WorkLife => "work-life",
            Category::Mindfulness => "mindfulness",
            Category::Tools => "tools",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Category::ALL
            .iter()
            .find(|c| c.label().to_lowercase() == needle || c.slug() == needle)
            .copied()
            .ok_or_else(|| {
                let valid: Vec<_> = Category::ALL.iter().map(|c| c.slug()).collect();
                Error::validation(format!(
                    "Unknown category '{}'. Valid: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}
