use crate::error::CatalogError;
use serde::{Deserialize, Deserializer, Serialize};

/// A single catalog entry as it is stored on disk and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Assigned by the catalog on creation, never changed afterwards.
    pub id: String,

    pub title: String,

    pub description: String,

    /// Either a managed asset reference (`/products/<file>`) or an external path.
    pub image: String,

    /// Free-form display date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Display order matters, duplicates are allowed.
    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    /// Records written before this field existed are shown on the homepage.
    #[serde(default = "default_true")]
    pub show_on_homepage: bool,
}

fn default_true() -> bool {
    true
}

/// The fields of a [`Product`] supplied by the caller on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default = "default_true")]
    pub show_on_homepage: bool,
}

impl ProductDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            image: image.into(),
            date: None,
            categories: Vec::new(),
            brand: None,
            show_on_homepage: true,
        }
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        require("title", &self.title)?;
        require("description", &self.description)?;
        require("image", &self.image)
    }

    pub fn into_product(self, id: String) -> Product {
        Product {
            id,
            title: self.title,
            description: self.description,
            image: self.image,
            date: self.date,
            categories: self.categories,
            brand: self.brand,
            show_on_homepage: self.show_on_homepage,
        }
    }
}

/// A partial update. Absent fields are left untouched.
///
/// For the optional fields (`date`, `brand`) an explicit `null` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub brand: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_on_homepage: Option<bool>,
}

// Distinguishes `"field": null` (Some(None)) from a missing field (None).
fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl ProductPatch {
    pub fn validate(&self) -> Result<(), CatalogError> {
        [
            ("title", &self.title),
            ("description", &self.description),
            ("image", &self.image),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .try_for_each(|(name, value)| require(name, value))
    }

    /// Shallow merge over `product`. `categories` is replaced wholesale.
    pub fn apply(self, product: &mut Product) {
        if let Some(title) = self.title {
            product.title = title;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(image) = self.image {
            product.image = image;
        }
        if let Some(date) = self.date {
            product.date = date;
        }
        if let Some(categories) = self.categories {
            product.categories = categories;
        }
        if let Some(brand) = self.brand {
            product.brand = brand;
        }
        if let Some(show) = self.show_on_homepage {
            product.show_on_homepage = show;
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        Err(CatalogError::Validation(format!("`{field}` must not be empty")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Product {
        ProductDraft {
            categories: vec!["c1".into(), "c2".into()],
            brand: Some("Acme".into()),
            date: Some("2024-05".into()),
            ..ProductDraft::new("A", "d", "/products/x.jpg")
        }
        .into_product("1".into())
    }

    #[test]
    fn missing_show_on_homepage_defaults_to_true() {
        let product: Product = serde_json::from_str(
            r#"{"id":"1","title":"A","description":"d","image":"/x.jpg","categories":[]}"#,
        )
        .unwrap();
        assert!(product.show_on_homepage);
        assert_eq!(product.date, None);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["showOnHomepage"], true);
        assert_eq!(json["categories"][1], "c2");
    }

    #[test]
    fn patch_changes_only_supplied_fields() {
        let mut product = sample();
        let patch: ProductPatch = serde_json::from_str(r#"{"title":"T"}"#).unwrap();
        patch.apply(&mut product);

        let mut expected = sample();
        expected.title = "T".into();
        assert_eq!(product, expected);
    }

    #[test]
    fn patch_replaces_categories_wholesale() {
        let mut product = sample();
        let patch: ProductPatch = serde_json::from_str(r#"{"categories":["z"]}"#).unwrap();
        patch.apply(&mut product);
        assert_eq!(product.categories, vec!["z".to_string()]);
    }

    #[test]
    fn patch_null_clears_optional_fields() {
        let mut product = sample();
        let patch: ProductPatch = serde_json::from_str(r#"{"brand":null}"#).unwrap();
        assert_eq!(patch.brand, Some(None));
        patch.apply(&mut product);
        assert_eq!(product.brand, None);
        assert_eq!(product.date.as_deref(), Some("2024-05"));
    }

    #[test]
    fn patch_ignores_id() {
        let mut product = sample();
        let patch: ProductPatch = serde_json::from_str(r#"{"id":"other"}"#).unwrap();
        patch.apply(&mut product);
        assert_eq!(product.id, "1");
    }

    #[test]
    fn validation_rejects_blank_required_fields() {
        let draft = ProductDraft::new(" ", "d", "/x.jpg");
        assert!(matches!(draft.validate(), Err(CatalogError::Validation(_))));

        let patch = ProductPatch {
            image: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(CatalogError::Validation(_))));
        assert!(ProductPatch::default().validate().is_ok());
    }
}
