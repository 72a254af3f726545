pub use super::items::Entity as Items;
pub use super::price_history::Entity as PriceHistory;
