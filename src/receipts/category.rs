use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fixed set of expense categories receipts are sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Food,
    Transport,
    Entertainment,
    Shopping,
    Bills,
    Healthcare,
    Education,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 8] = [
        Self::Food,
        Self::Transport,
        Self::Entertainment,
        Self::Shopping,
        Self::Bills,
        Self::Healthcare,
        Self::Education,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transport => "Transport",
            Self::Entertainment => "Entertainment",
            Self::Shopping => "Shopping",
            Self::Bills => "Bills",
            Self::Healthcare => "Healthcare",
            Self::Education => "Education",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Ordered: on a tie the earlier category wins.
const KEYWORDS: &[(ExpenseCategory, &str)] = &[
    (
        ExpenseCategory::Food,
        r"food|restaurants?|grocer(?:y|ies)|cafe|café|coffee|dining|diner|meals?|tiffin|sweets?|bakery|street food|pizza|burger|swiggy|zomato",
    ),
    (
        ExpenseCategory::Transport,
        r"transport|petrol|fuel|diesel|parking|uber|ola|taxi|cab|auto|metro|bus|trains?|railways?",
    ),
    (
        ExpenseCategory::Entertainment,
        r"entertainment|movies?|cinema|games?|gaming|concerts?|sports?|books?|netflix|streaming",
    ),
    (
        ExpenseCategory::Shopping,
        r"shopping|retail|store|clothing|apparel|electronics|mall|amazon|flipkart",
    ),
    (
        ExpenseCategory::Bills,
        r"bills?|utility|utilities|subscriptions?|insurance|rent|electricity|phone|internet|broadband|dth|maintenance",
    ),
    (
        ExpenseCategory::Healthcare,
        r"health|healthcare|medical|pharmacy|chemist|doctor|dental|hospital|clinic|medicines?",
    ),
    (
        ExpenseCategory::Education,
        r"education|school|courses?|tuition|training|university|college|coaching",
    ),
];

fn keyword_patterns() -> &'static [(ExpenseCategory, Regex)] {
    static PATTERNS: OnceLock<Vec<(ExpenseCategory, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        KEYWORDS
            .iter()
            .map(|(category, words)| {
                let pattern = format!(r"(?i)\b(?:{})\b", words);
                (*category, Regex::new(&pattern).expect("static category pattern"))
            })
            .collect()
    })
}

/// Maps free text (a model's category guess, a merchant name or a whole
/// receipt) onto [`ExpenseCategory`]. Exact names win; otherwise the category
/// with the most keyword hits is chosen, and `Other` when nothing matches.
pub fn classify_category(text: &str) -> ExpenseCategory {
    let trimmed = text.trim();
    if let Some(exact) = ExpenseCategory::ALL
        .iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
    {
        return *exact;
    }

    let mut best = ExpenseCategory::Other;
    let mut best_hits = 0;
    for (category, pattern) in keyword_patterns() {
        let hits = pattern.find_iter(trimmed).count();
        if hits > best_hits {
            best = *category;
            best_hits = hits;
        }
    }
    best
}
