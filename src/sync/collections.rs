//! Client shapes of the per-organization collections and their mapping to store rows

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::loose::{normalize_bool, present, text_or_null, LooseBool, LooseInt};
use crate::database::models::tables;
use crate::database::{KeyKind, Row};

/// One reconcilable child collection.
///
/// Items are deserialized leniently from the client payload; anything that fails to
/// deserialize or fails [`Collection::is_valid`] is dropped without error.
pub trait Collection: DeserializeOwned + Send {
    /// Payload key and report name
    const NAME: &'static str;
    const TABLE: &'static str;
    const KEY: KeyKind = KeyKind::Serial;
    const ORDER: &'static str = "order asc";

    fn is_valid(&self) -> bool;

    /// Store columns, excluding `id` and `organization_id`
    fn to_row(&self) -> Row;
}

fn json_or_null(value: &Option<Value>) -> Value {
    value.clone().unwrap_or(Value::Null)
}

/// Optional integer columns are only written when they parse
fn put_int(row: &mut Row, column: &str, value: &Option<LooseInt>) {
    if let Some(v) = value.as_ref().and_then(LooseInt::value) {
        row.insert(column.to_string(), Value::from(v));
    }
}

fn put(row: &mut Row, column: &str, value: Value) {
    row.insert(column.to_string(), value);
}

fn prefer<T: Clone>(first: &Option<T>, fallback: &Option<T>) -> Option<T> {
    first.clone().or_else(|| fallback.clone())
}

#[derive(Debug, Deserialize)]
pub struct MenuItem {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub display_name_translation: Option<Value>,
    #[serde(default)]
    pub url_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_translation: Option<Value>,
    #[serde(default)]
    pub is_displayed: Option<LooseBool>,
    #[serde(default)]
    pub is_displayed_on_footer: Option<LooseBool>,
    #[serde(default)]
    pub menu_items_are_text: Option<LooseBool>,
    #[serde(default)]
    pub react_icon_id: Option<LooseInt>,
    #[serde(default)]
    pub order: Option<LooseInt>,
}

impl Collection for MenuItem {
    const NAME: &'static str = "menu_items";
    const TABLE: &'static str = tables::MENU_ITEMS;

    fn is_valid(&self) -> bool {
        present(&self.display_name)
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        put(&mut row, "display_name", text_or_null(&self.display_name));
        put(&mut row, "display_name_translation", json_or_null(&self.display_name_translation));
        put(&mut row, "url_name", text_or_null(&self.url_name));
        put(&mut row, "description", text_or_null(&self.description));
        put(&mut row, "description_translation", json_or_null(&self.description_translation));
        put(&mut row, "is_displayed", normalize_bool(&self.is_displayed));
        put(&mut row, "is_displayed_on_footer", normalize_bool(&self.is_displayed_on_footer));
        put(&mut row, "menu_items_are_text", normalize_bool(&self.menu_items_are_text));
        put_int(&mut row, "react_icon_id", &self.react_icon_id);
        put_int(&mut row, "order", &self.order);
        row
    }
}

#[derive(Debug, Deserialize)]
pub struct SubMenuItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub name_translation: Option<Value>,
    #[serde(default)]
    pub url_name: Option<String>,
    #[serde(default)]
    pub order: Option<LooseInt>,
    #[serde(default)]
    pub menu_item_id: Option<LooseInt>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_translation: Option<Value>,
    #[serde(default)]
    pub is_displayed: Option<LooseBool>,
    #[serde(default)]
    pub image: Option<String>,
}

impl Collection for SubMenuItem {
    const NAME: &'static str = "submenu_items";
    const TABLE: &'static str = tables::SUBMENU_ITEMS;

    fn is_valid(&self) -> bool {
        present(&self.name) && self.menu_item_id.as_ref().and_then(LooseInt::value).is_some()
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        put(&mut row, "name", text_or_null(&self.name));
        put(&mut row, "name_translation", json_or_null(&self.name_translation));
        put(&mut row, "url_name", text_or_null(&self.url_name));
        put(&mut row, "description", text_or_null(&self.description));
        put(&mut row, "description_translation", json_or_null(&self.description_translation));
        put(&mut row, "is_displayed", normalize_bool(&self.is_displayed));
        put(&mut row, "image", text_or_null(&self.image));
        put_int(&mut row, "menu_item_id", &self.menu_item_id);
        put_int(&mut row, "order", &self.order);
        row
    }
}

#[derive(Debug, Deserialize)]
pub struct BlogPost {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub order: Option<LooseInt>,
    #[serde(default)]
    pub display_this_post: Option<LooseBool>,
    #[serde(default)]
    pub display_as_blog_post: Option<LooseBool>,
}

impl Collection for BlogPost {
    const NAME: &'static str = "blog_posts";
    const TABLE: &'static str = tables::BLOG_POSTS;

    fn is_valid(&self) -> bool {
        present(&self.title) && present(&self.slug)
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        put(&mut row, "title", text_or_null(&self.title));
        put(&mut row, "slug", text_or_null(&self.slug));
        put(&mut row, "description", text_or_null(&self.description));
        put(&mut row, "content", text_or_null(&self.content));
        put(&mut row, "display_this_post", normalize_bool(&self.display_this_post));
        put(&mut row, "display_as_blog_post", normalize_bool(&self.display_as_blog_post));
        put_int(&mut row, "order", &self.order);
        row
    }
}

#[derive(Debug, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub product_description: Option<String>,
    #[serde(default)]
    pub links_to_image: Option<String>,
    #[serde(default)]
    pub order: Option<LooseInt>,
    #[serde(default)]
    pub is_displayed: Option<LooseBool>,
    #[serde(default)]
    pub price_manual: Option<Value>,
    #[serde(default)]
    pub currency_manual_symbol: Option<String>,
    #[serde(default)]
    pub product_tax_code: Option<String>,
    #[serde(default)]
    pub product_sub_type_id: Option<LooseInt>,
    #[serde(default)]
    pub attrs: Option<Value>,
}

impl Collection for Product {
    const NAME: &'static str = "products";
    const TABLE: &'static str = tables::PRODUCTS;

    fn is_valid(&self) -> bool {
        present(&self.product_name)
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        put(&mut row, "product_name", text_or_null(&self.product_name));
        put(&mut row, "slug", text_or_null(&self.slug));
        put(&mut row, "product_description", text_or_null(&self.product_description));
        put(&mut row, "links_to_image", text_or_null(&self.links_to_image));
        put(&mut row, "is_displayed", normalize_bool(&self.is_displayed));
        put(&mut row, "price_manual", json_or_null(&self.price_manual));
        put(&mut row, "currency_manual_symbol", text_or_null(&self.currency_manual_symbol));
        put(&mut row, "product_tax_code", text_or_null(&self.product_tax_code));
        put(&mut row, "attrs", json_or_null(&self.attrs));
        put_int(&mut row, "product_sub_type_id", &self.product_sub_type_id);
        put_int(&mut row, "order", &self.order);
        row
    }
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub feature_image: Option<String>,
    #[serde(default)]
    pub display_content: Option<LooseBool>,
    #[serde(default)]
    pub display_on_product_card: Option<LooseBool>,
    #[serde(default, rename = "type")]
    pub feature_type: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub order: Option<LooseInt>,
}

impl Collection for Feature {
    const NAME: &'static str = "features";
    const TABLE: &'static str = tables::FEATURES;

    fn is_valid(&self) -> bool {
        present(&self.name)
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        put(&mut row, "name", text_or_null(&self.name));
        put(&mut row, "slug", text_or_null(&self.slug));
        put(&mut row, "content", text_or_null(&self.content));
        put(&mut row, "feature_image", text_or_null(&self.feature_image));
        put(&mut row, "display_content", normalize_bool(&self.display_content));
        put(&mut row, "display_on_product_card", normalize_bool(&self.display_on_product_card));
        put(&mut row, "type", text_or_null(&self.feature_type));
        put(&mut row, "package", text_or_null(&self.package));
        put_int(&mut row, "order", &self.order);
        row
    }
}

#[derive(Debug, Deserialize)]
pub struct Faq {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub order: Option<LooseInt>,
    #[serde(default)]
    pub display_order: Option<LooseInt>,
    #[serde(default)]
    pub display_home_page: Option<LooseBool>,
    #[serde(default)]
    pub product_sub_type_id: Option<LooseInt>,
}

impl Collection for Faq {
    const NAME: &'static str = "faqs";
    const TABLE: &'static str = tables::FAQS;

    fn is_valid(&self) -> bool {
        present(&self.question)
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        put(&mut row, "question", text_or_null(&self.question));
        put(&mut row, "answer", text_or_null(&self.answer));
        put(&mut row, "section", text_or_null(&self.section));
        put(&mut row, "display_home_page", normalize_bool(&self.display_home_page));
        put_int(&mut row, "display_order", &self.display_order);
        put_int(&mut row, "product_sub_type_id", &self.product_sub_type_id);
        put_int(&mut row, "order", &self.order);
        row
    }
}

/// Banners are UUID-keyed and accept the external names produced by the assembler.
///
/// When a body carries both spellings of a field, the external one wins.
#[derive(Debug, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default, rename = "type")]
    pub banner_type: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub is_active: Option<LooseBool>,
    #[serde(default)]
    pub is_enabled: Option<LooseBool>,
    #[serde(default)]
    pub open_state: Option<String>,
    #[serde(default, rename = "openState")]
    pub open_state_external: Option<String>,
    #[serde(default)]
    pub landing_content: Option<Value>,
    #[serde(default)]
    pub page_paths: Option<Value>,
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub end_at: Option<String>,
    #[serde(default)]
    pub priority: Option<LooseInt>,
    #[serde(default)]
    pub target_audience: Option<Value>,
    #[serde(default)]
    pub dismissal_duration: Option<LooseInt>,
    #[serde(default)]
    pub is_fixed_above_navbar: Option<LooseBool>,
    #[serde(default)]
    pub end_date_promotion: Option<String>,
    #[serde(default)]
    pub end_date_promotion_is_displayed: Option<LooseBool>,
}

impl Collection for Banner {
    const NAME: &'static str = "banners";
    const TABLE: &'static str = tables::BANNERS;
    const KEY: KeyKind = KeyKind::Uuid;
    const ORDER: &'static str = "priority desc";

    fn is_valid(&self) -> bool {
        true
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        put(&mut row, "position", text_or_null(&self.position));
        put(&mut row, "type", text_or_null(&self.banner_type));
        put(&mut row, "content", json_or_null(&self.content));
        put(&mut row, "is_active", normalize_bool(&prefer(&self.is_enabled, &self.is_active)));
        put(&mut row, "open_state", text_or_null(&prefer(&self.open_state_external, &self.open_state)));
        put(&mut row, "landing_content", json_or_null(&self.landing_content));
        put(&mut row, "page_paths", json_or_null(&self.page_paths));
        put(&mut row, "start_at", text_or_null(&self.start_at));
        put(&mut row, "end_at", text_or_null(&self.end_at));
        put(&mut row, "target_audience", json_or_null(&self.target_audience));
        put(&mut row, "is_fixed_above_navbar", normalize_bool(&self.is_fixed_above_navbar));
        put(&mut row, "end_date_promotion", text_or_null(&self.end_date_promotion));
        put(
            &mut row,
            "end_date_promotion_is_displayed",
            normalize_bool(&self.end_date_promotion_is_displayed),
        );
        put_int(&mut row, "priority", &self.priority);
        put_int(&mut row, "dismissal_duration", &self.dismissal_duration);
        row
    }
}

#[derive(Debug, Deserialize)]
pub struct CookieService {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: Option<LooseBool>,
    #[serde(default)]
    pub enabled: Option<LooseBool>,
    #[serde(default)]
    pub category_id: Option<LooseInt>,
}

impl Collection for CookieService {
    const NAME: &'static str = "cookie_services";
    const TABLE: &'static str = tables::COOKIE_SERVICES;
    const ORDER: &'static str = "id asc";

    fn is_valid(&self) -> bool {
        present(&self.name)
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        put(&mut row, "name", text_or_null(&self.name));
        put(&mut row, "description", text_or_null(&self.description));
        put(&mut row, "active", normalize_bool(&prefer(&self.enabled, &self.active)));
        put_int(&mut row, "category_id", &self.category_id);
        row
    }
}

/// Payload keys of every reconciled collection, in processing order
pub const COLLECTION_KEYS: [&str; 8] = [
    MenuItem::NAME,
    SubMenuItem::NAME,
    BlogPost::NAME,
    Product::NAME,
    Feature::NAME,
    Faq::NAME,
    Banner::NAME,
    CookieService::NAME,
];
