//! Table names of the site schema

use crate::database::memory::KeyKind;

pub const ORGANIZATIONS: &str = "organizations";
pub const PROFILES: &str = "profiles";
pub const SETTINGS: &str = "settings";
pub const HERO: &str = "website_hero";
pub const MENU_ITEMS: &str = "website_menuitem";
pub const SUBMENU_ITEMS: &str = "website_submenuitem";
pub const BLOG_POSTS: &str = "blog_post";
pub const PRODUCTS: &str = "product";
pub const FEATURES: &str = "feature";
pub const FAQS: &str = "faq";
pub const BANNERS: &str = "banners";
pub const COOKIE_SERVICES: &str = "cookie_service";
pub const COOKIE_CATEGORIES: &str = "cookie_category";
pub const COOKIE_CONSENTS: &str = "cookie_consent";
pub const ACTIVITY_LOGS: &str = "activity_logs";

/// Primary key kind per table; anything unlisted is serial
pub const KEY_KINDS: &[(&str, KeyKind)] = &[
    (ORGANIZATIONS, KeyKind::Uuid),
    (PROFILES, KeyKind::Uuid),
    (SETTINGS, KeyKind::Serial),
    (HERO, KeyKind::Serial),
    (MENU_ITEMS, KeyKind::Serial),
    (SUBMENU_ITEMS, KeyKind::Serial),
    (BLOG_POSTS, KeyKind::Serial),
    (PRODUCTS, KeyKind::Serial),
    (FEATURES, KeyKind::Serial),
    (FAQS, KeyKind::Serial),
    (BANNERS, KeyKind::Uuid),
    (COOKIE_SERVICES, KeyKind::Serial),
    (COOKIE_CATEGORIES, KeyKind::Serial),
    (COOKIE_CONSENTS, KeyKind::Serial),
    (ACTIVITY_LOGS, KeyKind::Serial),
];

/// (table, column, referenced table) foreign keys enforced on delete
pub const FOREIGN_KEYS: &[(&str, &str, &str)] = &[
    (SUBMENU_ITEMS, "menu_item_id", MENU_ITEMS),
    (PROFILES, "organization_id", ORGANIZATIONS),
    (COOKIE_SERVICES, "category_id", COOKIE_CATEGORIES),
    ("pricingplan", "product_id", PRODUCTS),
    ("product_feature", "feature_id", FEATURES),
];
