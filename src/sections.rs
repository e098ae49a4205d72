// src/sections.rs
use serde::{Deserialize, Serialize};

/// Page sections reachable through `#<section>` anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Home,
    About,
    Projects,
    Research,
    Contact,
}

/// Which decorative scene is drawn behind a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backdrop {
    Network,
    Particles,
    Grid,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Home,
        Section::About,
        Section::Projects,
        Section::Research,
        Section::Contact,
    ];

    /// Resolves `"#research"` (or `"research"`) to its section.
    /// `"#"`, empty and unknown fragments resolve to `None`.
    pub fn from_fragment(fragment: &str) -> Option<Self> {
        let id = fragment.trim().trim_start_matches('#');
        Self::ALL.into_iter().find(|s| s.id().eq_ignore_ascii_case(id))
    }

    pub fn id(self) -> &'static str {
        match self {
            Section::Home => "home",
            Section::About => "about",
            Section::Projects => "projects",
            Section::Research => "research",
            Section::Contact => "contact",
        }
    }

    pub fn backdrop(self, fallback: Backdrop) -> Backdrop {
        match self {
            Section::Home => Backdrop::Network,
            Section::Research => Backdrop::Particles,
            _ => fallback,
        }
    }
}
