use serde::{Deserialize, Deserializer, Serialize};

/// Opaque pricebook identifier.
///
/// The remote API hands out numeric ids, but nothing in the engine depends on
/// that, so string ids are accepted as well and round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A purchasable material from the pricebook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: ItemId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub display_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub code: String,
}

impl CatalogItem {
    #[must_use]
    pub fn new(id: impl Into<ItemId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: String::new(),
            code: String::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// The fields a description is compared against, in a fixed order.
    pub fn fields(&self) -> [(ItemField, &str); 3] {
        [
            (ItemField::DisplayName, self.display_name.as_str()),
            (ItemField::Description, self.description.as_str()),
            (ItemField::Code, self.code.as_str()),
        ]
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    DisplayName,
    Description,
    Code,
}

impl ItemField {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DisplayName => "display_name",
            Self::Description => "description",
            Self::Code => "code",
        }
    }
}

impl std::fmt::Display for ItemField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical line of a materials note.
///
/// `quantity` is always at least 1; the line parser never produces anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEntry {
    pub quantity: u32,
    pub description: String,
}

impl ParsedEntry {
    /// Returns `None` for a zero quantity or a blank description.
    #[must_use]
    pub fn new(quantity: u32, description: impl Into<String>) -> Option<Self> {
        let description = description.into().trim().to_string();
        if quantity == 0 || description.is_empty() {
            return None;
        }
        Some(Self {
            quantity,
            description,
        })
    }

    #[must_use]
    pub fn single(description: impl Into<String>) -> Self {
        Self {
            quantity: 1,
            description: description.into().trim().to_string(),
        }
    }
}

/// Outcome of ranking one entry against a catalog.
///
/// `item_id` is `None` when nothing cleared the confidence threshold; that is an
/// ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub item_id: Option<ItemId>,
    pub item_name: Option<String>,
    pub score: f64,
}

impl MatchResult {
    #[must_use]
    pub fn matched(item: &CatalogItem, score: f64) -> Self {
        Self {
            item_id: Some(item.id.clone()),
            item_name: Some(item.display_name.clone()),
            score,
        }
    }

    #[must_use]
    pub fn no_match() -> Self {
        Self {
            item_id: None,
            item_name: None,
            score: 0.0,
        }
    }

    pub fn is_match(&self) -> bool {
        self.item_id.is_some()
    }
}
