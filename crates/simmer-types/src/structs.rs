//! Static catalog data: recipes, their ingredients, and item metadata.
//!
//! These values are loaded once at startup and never mutated. Field names
//! accept both the canonical snake_case spelling and the camelCase spelling
//! used by older catalog files (`recipeName`, `energyCost`, ...).

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::ids::ItemId;

/// One ingredient requirement of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// The inventory item consumed.
    pub id: ItemId,
    /// How many units the recipe consumes.
    pub amount: u32,
}

impl Ingredient {
    /// Create an ingredient requirement.
    pub fn new(id: impl Into<ItemId>, amount: u32) -> Self {
        Self {
            id: id.into(),
            amount,
        }
    }
}

/// A cooking recipe.
///
/// `name` is the unique key used to reference the recipe from persisted
/// session records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique recipe name.
    #[serde(alias = "recipeName")]
    pub name: String,
    /// Energy spent when cooking starts.
    #[serde(default, alias = "energyCost")]
    pub cost: u32,
    /// Items consumed when cooking starts.
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    /// Item credited (one unit) when cooking completes.
    #[serde(alias = "resultId")]
    pub result_id: ItemId,
    /// Cooking time in seconds. Must be greater than zero.
    #[serde(alias = "cookingTimeSeconds")]
    pub duration_seconds: u32,
    /// Display-only rating.
    #[serde(default, alias = "starRating")]
    pub star_rating: u8,
}

impl Recipe {
    /// The cooking time as a [`TimeDelta`].
    pub fn duration(&self) -> TimeDelta {
        TimeDelta::try_seconds(i64::from(self.duration_seconds)).unwrap_or_else(TimeDelta::zero)
    }
}

/// Display metadata for an inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    /// Item identifier, matching ledger keys and recipe ingredient ids.
    pub id: ItemId,
    /// Human-readable name.
    pub name: String,
    /// Path of the item's icon asset. Carried as data only.
    #[serde(default, alias = "iconPath")]
    pub icon_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_accepts_camel_case_fields() {
        let json = r#"{
            "recipeName": "Omelette",
            "energyCost": 5,
            "ingredients": [{ "id": "egg", "amount": 2 }],
            "resultId": "omelette",
            "cookingTimeSeconds": 30,
            "starRating": 2
        }"#;
        let recipe: Recipe = serde_json::from_str(json).unwrap_or_else(|_| Recipe {
            name: String::new(),
            cost: 0,
            ingredients: Vec::new(),
            result_id: ItemId::from(""),
            duration_seconds: 0,
            star_rating: 0,
        });
        assert_eq!(recipe.name, "Omelette");
        assert_eq!(recipe.cost, 5);
        assert_eq!(recipe.ingredients, vec![Ingredient::new("egg", 2)]);
        assert_eq!(recipe.result_id.as_str(), "omelette");
        assert_eq!(recipe.duration_seconds, 30);
        assert_eq!(recipe.star_rating, 2);
    }

    #[test]
    fn recipe_optional_fields_default() {
        let json = r#"{ "name": "Tea", "result_id": "tea", "duration_seconds": 4 }"#;
        let recipe: Result<Recipe, _> = serde_json::from_str(json);
        assert!(recipe.is_ok());
        if let Ok(recipe) = recipe {
            assert_eq!(recipe.cost, 0);
            assert!(recipe.ingredients.is_empty());
            assert_eq!(recipe.star_rating, 0);
            assert_eq!(recipe.duration(), TimeDelta::seconds(4));
        }
    }

    #[test]
    fn item_info_icon_path_alias() {
        let json = r#"{ "id": "egg", "name": "Egg", "iconPath": "Icons/egg" }"#;
        let info: Result<ItemInfo, _> = serde_json::from_str(json);
        assert_eq!(info.ok().map(|i| i.icon_path), Some("Icons/egg".to_owned()));
    }
}
