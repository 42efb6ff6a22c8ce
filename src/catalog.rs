//! Prohibited content catalog.
//!
//! Maps each content category to the exact model labels that count as
//! prohibited. Matching is case-sensitive string equality.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Weapons,
    Violence,
    Explicit,
    Explosives,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Weapons,
        Category::Violence,
        Category::Explicit,
        Category::Explosives,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Weapons => "weapons",
            Category::Violence => "violence",
            Category::Explicit => "explicit",
            Category::Explosives => "explosives",
        }
    }

    fn default_labels(&self) -> &'static [&'static str] {
        match self {
            Category::Weapons => &["knife", "knives", "gun", "guns", "pistol", "rifle", "sword"],
            Category::Violence => &["fight", "punch", "kick"],
            Category::Explicit => &["nude", "sexual", "porn", "sex"],
            Category::Explosives => &["bomb", "grenade", "explosive", "tnt", "dynamite"],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| anyhow!("unknown content category '{}'", s))
    }
}

/// Static category -> label table. Read-only once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProhibitedCatalog {
    categories: BTreeMap<Category, BTreeSet<String>>,
}

impl ProhibitedCatalog {
    /// Build a catalog from explicit label lists. Empty labels are rejected.
    pub fn from_map(categories: BTreeMap<Category, Vec<String>>) -> Result<Self> {
        let mut built = BTreeMap::new();
        for (category, labels) in categories {
            if labels.iter().any(|l| l.trim().is_empty()) {
                return Err(anyhow!(
                    "catalog category '{}' contains an empty label",
                    category
                ));
            }
            built.insert(category, labels.into_iter().collect());
        }
        Ok(Self { categories: built })
    }

    /// Labels accepted for a category, if the catalog defines it.
    pub fn labels(&self, category: Category) -> Option<&BTreeSet<String>> {
        self.categories.get(&category)
    }

    /// Union of every category's labels.
    pub fn all_labels(&self) -> BTreeSet<&str> {
        self.categories
            .values()
            .flat_map(|labels| labels.iter().map(String::as_str))
            .collect()
    }
}

impl Default for ProhibitedCatalog {
    fn default() -> Self {
        let categories = Category::ALL
            .into_iter()
            .map(|category| {
                let labels = category
                    .default_labels()
                    .iter()
                    .map(|l| l.to_string())
                    .collect();
                (category, labels)
            })
            .collect();
        Self { categories }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_covers_every_category() {
        let catalog = ProhibitedCatalog::default();
        for category in Category::ALL {
            assert!(catalog.labels(category).is_some_and(|l| !l.is_empty()));
        }
        let weapons = catalog.labels(Category::Weapons).unwrap();
        assert!(weapons.contains("knife"));
        assert!(weapons.contains("guns"));
        assert_eq!(catalog.all_labels().len(), 19);
    }

    #[test]
    fn label_matching_is_case_sensitive() {
        let catalog = ProhibitedCatalog::default();
        let all = catalog.all_labels();
        assert!(all.contains("bomb"));
        assert!(!all.contains("Bomb"));
        assert!(!all.contains("person"));
    }

    #[test]
    fn categories_parse_from_lowercase_names() -> Result<()> {
        assert_eq!("explosives".parse::<Category>()?, Category::Explosives);
        assert!("Weapons".parse::<Category>().is_err());
        let json = serde_json::to_string(&Category::Violence)?;
        assert_eq!(json, "\"violence\"");
        Ok(())
    }

    #[test]
    fn custom_catalog_rejects_blank_labels() {
        let mut map = BTreeMap::new();
        map.insert(Category::Weapons, vec!["axe".to_string(), " ".to_string()]);
        assert!(ProhibitedCatalog::from_map(map).is_err());
    }
}
