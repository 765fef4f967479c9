//! Shapes persisted rows into the document returned by Read and Write

use serde_json::{json, Map, Value};

use crate::database::models::tables;
use crate::database::{Row, StoreError, TableStore};
use crate::filter::FilterData;

/// Store column names exposed under a different external name, per table
const RENAMES: &[(&str, &str, &str)] = &[
    (tables::BANNERS, "is_active", "is_enabled"),
    (tables::BANNERS, "open_state", "openState"),
    (tables::COOKIE_SERVICES, "active", "enabled"),
];

/// Every persisted row that makes up one organization's document
#[derive(Debug, Default)]
pub struct SiteRows {
    pub organization: Row,
    pub settings: Option<Row>,
    pub hero: Option<Row>,
    pub menu_items: Vec<Row>,
    pub submenu_items: Vec<Row>,
    pub blog_posts: Vec<Row>,
    pub products: Vec<Row>,
    pub features: Vec<Row>,
    pub faqs: Vec<Row>,
    pub banners: Vec<Row>,
    pub cookie_services: Vec<Row>,
    pub cookie_categories: Vec<Row>,
    pub cookie_consents: Vec<Row>,
}

impl SiteRows {
    /// Load the organization's rows; `None` when the organization does not exist
    pub async fn load(
        store: &dyn TableStore,
        organization_id: &str,
        consent_page_size: i32,
    ) -> Result<Option<Self>, StoreError> {
        let Some(organization) = store
            .select_one(tables::ORGANIZATIONS, FilterData::by("id", organization_id))
            .await?
        else {
            return Ok(None);
        };

        let scoped = || FilterData::by("organization_id", organization_id);

        Ok(Some(Self {
            organization,
            settings: store.select_one(tables::SETTINGS, scoped().order_by("id asc")).await?,
            hero: store.select_one(tables::HERO, scoped().order_by("id asc")).await?,
            menu_items: store.select(tables::MENU_ITEMS, scoped().order_by("order asc")).await?,
            submenu_items: store.select(tables::SUBMENU_ITEMS, scoped().order_by("order asc")).await?,
            blog_posts: store.select(tables::BLOG_POSTS, scoped().order_by("order asc")).await?,
            products: store.select(tables::PRODUCTS, scoped().order_by("order asc")).await?,
            features: store.select(tables::FEATURES, scoped().order_by("order asc")).await?,
            faqs: store.select(tables::FAQS, scoped().order_by("order asc")).await?,
            banners: store.select(tables::BANNERS, scoped().order_by("priority desc")).await?,
            cookie_services: store.select(tables::COOKIE_SERVICES, scoped().order_by("id asc")).await?,
            cookie_categories: store
                .select(tables::COOKIE_CATEGORIES, FilterData::default().order_by("id asc"))
                .await?,
            cookie_consents: store
                .select(
                    tables::COOKIE_CONSENTS,
                    scoped().order_by("created_at desc").limit(consent_page_size),
                )
                .await?,
        }))
    }

    /// Build the external document. Pure; identical for Read and Write.
    pub fn into_document(self) -> Value {
        let menu_items: Vec<Value> = self
            .menu_items
            .into_iter()
            .map(|mut menu| {
                let children: Vec<Value> = self
                    .submenu_items
                    .iter()
                    .filter(|sub| same_key(sub.get("menu_item_id"), menu.get("id")))
                    .cloned()
                    .map(Value::Object)
                    .collect();
                menu.insert("submenu_items".to_string(), Value::Array(children));
                Value::Object(menu)
            })
            .collect();

        json!({
            "organization": self.organization,
            "settings": self.settings,
            "website_hero": self.hero,
            "menu_items": menu_items,
            "submenu_items": self.submenu_items,
            "blog_posts": self.blog_posts,
            "products": self.products,
            "features": self.features,
            "faqs": self.faqs,
            "banners": external(tables::BANNERS, self.banners),
            "cookie_services": external(tables::COOKIE_SERVICES, self.cookie_services),
            "cookie_categories": self.cookie_categories,
            "cookie_consent_records": self.cookie_consents,
        })
    }
}

fn same_key(reference: Option<&Value>, key: Option<&Value>) -> bool {
    match (reference, key) {
        (Some(Value::Null), _) | (None, _) | (_, None) => false,
        (Some(a), Some(b)) => a == b || scalar(a) == scalar(b),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn external(table: &str, rows: Vec<Row>) -> Vec<Value> {
    rows.into_iter()
        .map(|row| {
            let mut out = Map::with_capacity(row.len());
            for (column, value) in row {
                let name = RENAMES
                    .iter()
                    .find(|(t, internal, _)| *t == table && *internal == column.as_str())
                    .map(|(_, _, external)| external.to_string())
                    .unwrap_or(column);
                out.insert(name, value);
            }
            Value::Object(out)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn nests_submenus_under_their_menu() {
        let rows = SiteRows {
            organization: row(json!({ "id": "org-1" })),
            menu_items: vec![row(json!({ "id": 1, "display_name": "A" })), row(json!({ "id": 2, "display_name": "B" }))],
            submenu_items: vec![
                row(json!({ "id": 10, "menu_item_id": 2, "name": "b1" })),
                row(json!({ "id": 11, "menu_item_id": "1", "name": "a1" })),
                row(json!({ "id": 12, "menu_item_id": null, "name": "loose" })),
            ],
            ..Default::default()
        };
        let doc = rows.into_document();

        assert_eq!(doc["menu_items"][0]["submenu_items"][0]["name"], json!("a1"));
        assert_eq!(doc["menu_items"][1]["submenu_items"][0]["name"], json!("b1"));
        assert_eq!(doc["submenu_items"].as_array().unwrap().len(), 3);
        assert_eq!(doc["settings"], Value::Null);
    }

    #[test]
    fn renames_internal_columns() {
        let rows = SiteRows {
            organization: row(json!({ "id": "org-1" })),
            banners: vec![row(json!({ "id": "b", "is_active": true, "open_state": "open", "position": "top" }))],
            cookie_services: vec![row(json!({ "id": 1, "active": false, "name": "Ads" }))],
            ..Default::default()
        };
        let doc = rows.into_document();

        assert_eq!(doc["banners"][0], json!({ "id": "b", "is_enabled": true, "openState": "open", "position": "top" }));
        assert_eq!(doc["cookie_services"][0], json!({ "id": 1, "enabled": false, "name": "Ads" }));
    }

    #[tokio::test]
    async fn consents_are_capped_most_recent_first() {
        let store = MemoryStore::with_site_schema();
        store.seed(tables::ORGANIZATIONS, vec![json!({ "id": "org-1", "name": "One" })]).await;
        store
            .seed(
                tables::COOKIE_CONSENTS,
                vec![
                    json!({ "organization_id": "org-1", "created_at": "2024-01-01T00:00:00Z" }),
                    json!({ "organization_id": "org-1", "created_at": "2024-03-01T00:00:00Z" }),
                    json!({ "organization_id": "org-2", "created_at": "2024-04-01T00:00:00Z" }),
                    json!({ "organization_id": "org-1", "created_at": "2024-02-01T00:00:00Z" }),
                ],
            )
            .await;
        store.seed(tables::COOKIE_CATEGORIES, vec![json!({ "name": "Essential" })]).await;

        let doc = SiteRows::load(&store, "org-1", 2).await.unwrap().unwrap().into_document();
        let consents = doc["cookie_consent_records"].as_array().unwrap();
        assert_eq!(consents.len(), 2);
        assert_eq!(consents[0]["created_at"], json!("2024-03-01T00:00:00Z"));
        assert_eq!(consents[1]["created_at"], json!("2024-02-01T00:00:00Z"));
        assert_eq!(doc["cookie_categories"][0]["name"], json!("Essential"));
    }

    #[tokio::test]
    async fn unknown_organization_loads_nothing() {
        let store = MemoryStore::with_site_schema();
        assert!(SiteRows::load(&store, "missing", 10).await.unwrap().is_none());
    }
}
