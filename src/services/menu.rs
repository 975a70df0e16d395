//! Structured menus assembled from menu items.

use super::venues::MenuItem;
use crate::error::{ConciergeError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Section name for items without a category.
pub const UNCATEGORISED: &str = "Other";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display price, kept as text since menus mix formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dietary_info: Vec<String>,
}

impl Dish {
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConciergeError::InvalidInput("Dish name must not be empty".to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            description: None,
            price: None,
            special_notes: None,
            image_url: None,
            dietary_info: Vec::new(),
        })
    }

    fn from_item(item: &MenuItem, currency: Option<&str>) -> Result<Self> {
        let mut dish = Self::new(&item.title)?;
        dish.description = item.description.clone().filter(|d| !d.trim().is_empty());
        dish.price = item.price.map(|p| match currency {
            Some(c) => format!("{} {:.2}", c, p),
            None => format!("{:.2}", p),
        });
        dish.dietary_info = item.tags.clone();
        Ok(dish)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuSection {
    pub section_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub dishes: Vec<Dish>,
}

impl MenuSection {
    pub fn new(section_name: &str) -> Result<Self> {
        let section_name = section_name.trim();
        if section_name.is_empty() {
            return Err(ConciergeError::InvalidInput("Section name must not be empty".to_string()));
        }
        Ok(Self {
            section_name: section_name.to_string(),
            description: None,
            dishes: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub restaurant_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub extracted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub sections: Vec<MenuSection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub special_features: Vec<String>,
}

impl Menu {
    pub fn new(restaurant_name: &str) -> Result<Self> {
        let restaurant_name = restaurant_name.trim();
        if restaurant_name.is_empty() {
            return Err(ConciergeError::InvalidInput("Restaurant name must not be empty".to_string()));
        }
        Ok(Self {
            restaurant_name: restaurant_name.to_string(),
            url: None,
            extracted_at: Utc::now(),
            language: None,
            currency: None,
            sections: Vec::new(),
            special_features: Vec::new(),
        })
    }

    /// Group items into sections by category, in order of first appearance.
    pub fn from_items(restaurant_name: &str, items: &[MenuItem], currency: Option<&str>) -> Result<Self> {
        let mut menu = Self::new(restaurant_name)?;
        menu.currency = currency.map(String::from);

        for item in items {
            let section_name = item
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(UNCATEGORISED);
            let dish = Dish::from_item(item, currency)?;

            match menu.sections.iter_mut().find(|s| s.section_name == section_name) {
                Some(section) => section.dishes.push(dish),
                None => {
                    let mut section = MenuSection::new(section_name)?;
                    section.dishes.push(dish);
                    menu.sections.push(section);
                }
            }
        }
        Ok(menu)
    }

    pub fn dish_count(&self) -> usize {
        self.sections.iter().map(|s| s.dishes.len()).sum()
    }

    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n", self.restaurant_name);
        if self.sections.is_empty() {
            out.push_str("\nNo menu items available.\n");
            return out;
        }

        for section in &self.sections {
            out.push_str(&format!("\n## {}\n", section.section_name));
            if let Some(description) = &section.description {
                out.push_str(&format!("{}\n", description));
            }
            for dish in &section.dishes {
                out.push_str(&format!("- **{}**", dish.name));
                if let Some(price) = &dish.price {
                    out.push_str(&format!(" ({})", price));
                }
                if let Some(description) = &dish.description {
                    out.push_str(&format!(": {}", description));
                }
                if !dish.dietary_info.is_empty() {
                    out.push_str(&format!(" [{}]", dish.dietary_info.join(", ")));
                }
                out.push('\n');
            }
        }

        if !self.special_features.is_empty() {
            out.push_str(&format!("\nSpecial features: {}\n", self.special_features.join(", ")));
        }
        out
    }
}
