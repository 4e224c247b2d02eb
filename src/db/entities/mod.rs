//! Database entities

pub mod category;
pub mod claim;
pub mod item;
pub mod item_image;
pub mod location;
pub mod report;
pub mod status;
pub mod user;

pub use category::Entity as Category;
pub use claim::Entity as Claim;
pub use item::Entity as Item;
pub use item_image::Entity as ItemImage;
pub use location::Entity as Location;
pub use report::Entity as Report;
pub use user::Entity as User;
