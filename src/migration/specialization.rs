//! Specialization → default values lookup table.
//!
//! Legacy specs declare at most a specialization label.  The migration maps
//! that label onto a fixed set of weighted values (and fallback traits) from
//! this table.  Unknown or absent specializations get [`GENERIC`].

use crate::spec::model::ValueItem;

/// One weighted value with its implicating keywords.
#[derive(Debug, Clone, Copy)]
pub struct DefaultValue {
    pub name: &'static str,
    pub weight: f64,
    pub keywords: &'static [&'static str],
}

impl DefaultValue {
    pub fn to_value_item(&self) -> ValueItem {
        ValueItem::new(self.name, self.weight).with_keywords(self.keywords.iter().copied())
    }
}

/// Defaults for one specialization.
#[derive(Debug, Clone, Copy)]
pub struct SpecializationProfile {
    /// Canonical key.
    pub key: &'static str,
    /// Other labels that map here (normalized form).
    pub aliases: &'static [&'static str],
    /// Traits used only when the description yields none.
    pub traits: &'static [&'static str],
    /// Values in descending weight.
    pub values: &'static [DefaultValue],
}

impl SpecializationProfile {
    pub fn value_items(&self) -> Vec<ValueItem> {
        self.values.iter().map(DefaultValue::to_value_item).collect()
    }
}

macro_rules! v {
    ($name:literal, $weight:literal, [$($kw:literal),* $(,)?]) => {
        DefaultValue { name: $name, weight: $weight, keywords: &[$($kw),*] }
    };
}

/// Fallback for absent or unrecognised specializations.
pub static GENERIC: SpecializationProfile = SpecializationProfile {
    key: "generic",
    aliases: &[],
    traits: &["helpful"],
    values: &[
        v!("honesty", 9.0, ["honest", "truth", "true", "lie", "candid"]),
        v!("helpfulness", 8.0, ["help", "helpful", "assist", "support"]),
        v!("respect", 7.0, ["respect", "polite", "boundary", "boundaries"]),
        v!("clarity", 6.0, ["clear", "clarify", "explain", "confusing"]),
    ],
};

/// The fixed table. Keys and aliases are matched after normalization.
pub static SPECIALIZATIONS: &[SpecializationProfile] = &[
    SpecializationProfile {
        key: "coaching",
        aliases: &["coach", "career_coaching", "life_coaching"],
        traits: &["supportive", "goal-oriented"],
        values: &[
            v!("growth", 9.0, ["grow", "growth", "improve", "learn", "career"]),
            v!("accountability", 8.0, ["commit", "deadline", "accountable", "follow"]),
            v!("empathy", 7.0, ["feel", "stressed", "anxious", "overwhelmed"]),
            v!("honesty", 6.0, ["honest", "truth", "feedback", "candid"]),
        ],
    },
    SpecializationProfile {
        key: "consulting",
        aliases: &["consultant", "advisory", "strategy"],
        traits: &["analytical", "structured"],
        values: &[
            v!("clarity", 9.0, ["clear", "clarify", "explain", "confusing"]),
            v!("pragmatism", 8.0, ["practical", "realistic", "budget", "cost"]),
            v!("honesty", 7.0, ["honest", "truth", "risk", "candid"]),
            v!("efficiency", 6.0, ["fast", "quick", "efficient", "time"]),
        ],
    },
    SpecializationProfile {
        key: "engineering",
        aliases: &["engineer", "software", "technical", "developer"],
        traits: &["precise", "methodical"],
        values: &[
            v!("correctness", 9.0, ["bug", "correct", "test", "error"]),
            v!("simplicity", 8.0, ["simple", "complex", "refactor", "clean"]),
            v!("safety", 7.0, ["safe", "security", "vulnerability", "unsafe"]),
            v!("transparency", 6.0, ["why", "explain", "tradeoff", "document"]),
        ],
    },
    SpecializationProfile {
        key: "finance",
        aliases: &["financial", "investing", "accounting"],
        traits: &["careful", "numerate"],
        values: &[
            v!("prudence", 9.0, ["risk", "loss", "save", "debt"]),
            v!("accuracy", 8.0, ["number", "calculate", "exact", "figure"]),
            v!("compliance", 7.0, ["tax", "law", "regulation", "legal"]),
            v!("transparency", 6.0, ["fee", "fees", "disclose", "hidden"]),
        ],
    },
    SpecializationProfile {
        key: "health",
        aliases: &["wellness", "fitness", "nutrition", "healthcare"],
        traits: &["caring", "evidence-based"],
        values: &[
            v!("safety", 9.0, ["pain", "injury", "dose", "symptom"]),
            v!("empathy", 8.0, ["feel", "stressed", "anxious", "tired"]),
            v!("accuracy", 7.0, ["study", "evidence", "research", "proof"]),
            v!("privacy", 6.0, ["private", "share", "record", "confidential"]),
        ],
    },
    SpecializationProfile {
        key: "education",
        aliases: &["teaching", "tutoring", "teacher", "tutor"],
        traits: &["patient", "encouraging"],
        values: &[
            v!("clarity", 9.0, ["explain", "understand", "confused", "clear"]),
            v!("patience", 8.0, ["again", "slow", "stuck", "repeat"]),
            v!("curiosity", 7.0, ["why", "how", "wonder", "explore"]),
            v!("honesty", 6.0, ["wrong", "mistake", "honest", "grade"]),
        ],
    },
    SpecializationProfile {
        key: "sales",
        aliases: &["business_development", "account_management"],
        traits: &["persuasive", "responsive"],
        values: &[
            v!("trust", 9.0, ["trust", "reliable", "promise", "guarantee"]),
            v!("responsiveness", 8.0, ["urgent", "asap", "today", "quick"]),
            v!("honesty", 7.0, ["honest", "truth", "discount", "price"]),
            v!("persuasion", 6.0, ["convince", "deal", "close", "buy"]),
        ],
    },
];

/// Lowercase, collapse every run of non-alphanumerics to one underscore.
pub fn normalize_key(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut last_was_sep = true;
    for ch in label.trim().chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// The table row for a declared specialization, if any.
pub fn find(specialization: &str) -> Option<&'static SpecializationProfile> {
    let key = normalize_key(specialization);
    SPECIALIZATIONS
        .iter()
        .find(|p| p.key == key || p.aliases.contains(&key.as_str()))
}

/// The table row for a declared specialization, falling back to [`GENERIC`].
pub fn profile_for(specialization: Option<&str>) -> &'static SpecializationProfile {
    specialization.and_then(find).unwrap_or(&GENERIC)
}
