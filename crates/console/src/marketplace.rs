//! Built-in menu and route declarations for the marketplace back office.

use marketadmin_auth::{MenuEntry, Permission, RouteRequirement};

use crate::routes::{ProtectedRoute, RouteTable};

pub const SUB_ADMINS_LINK: &str = "/sub-admins";

pub fn menu() -> Vec<MenuEntry> {
    vec![
        MenuEntry::new("Dashboard", "/dashboard").requires("dashboard.view"),
        MenuEntry::new("Users", "/users").with_children(vec![
            MenuEntry::new("Buyers", "/users/buyers").requires("users.view"),
            MenuEntry::new("Sellers", "/users/sellers").requires("users.view"),
        ]),
        MenuEntry::new("Orders", "/orders").requires("orders.view"),
        MenuEntry::new("Transactions", "/transactions").requires("transactions.view"),
        MenuEntry::new("Chats", "/chats").requires("chats.view"),
        MenuEntry::new("Social Feed", "/social-feed").requires("social_feed.view"),
        MenuEntry::new("Subscriptions", "/subscriptions").requires("subscriptions.view"),
        MenuEntry::new("Sub Admins", SUB_ADMINS_LINK).requires("sub_admins.view"),
        MenuEntry::new("Profile", "/profile"),
    ]
}

pub fn routes() -> RouteTable {
    let guarded = |path: &str, permission: &'static str| {
        ProtectedRoute::new(path, Some(Permission::new(permission)))
    };

    RouteTable::new(vec![
        guarded("/dashboard", "dashboard.view"),
        guarded("/users/buyers", "users.view"),
        guarded("/users/sellers", "users.view"),
        guarded("/orders", "orders.view"),
        ProtectedRoute {
            path: "/orders/refunds".to_string(),
            requirement: RouteRequirement::permission("orders.refund")
                .with_fallback("orders-readonly"),
        },
        guarded("/transactions", "transactions.view"),
        guarded("/chats", "chats.view"),
        guarded("/social-feed", "social_feed.view"),
        guarded("/subscriptions", "subscriptions.view"),
        guarded(SUB_ADMINS_LINK, "sub_admins.view"),
        ProtectedRoute::new("/profile", None),
    ])
}
