//! Domain models shared by repositories, services and handlers.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod content;
pub mod dashboard;
pub mod order;
pub mod pagination;
pub mod session;
pub mod user;

pub use account::{Address, AddressDetails, PaymentDetails, PaymentMethod};
pub use cart::{Cart, CartLine, CartView, CartViewLine};
pub use catalog::{
    Category, CategoryFields, CategoryWithProducts, Product, ProductFields, ProductFilter,
};
pub use content::{ContactMessage, HeroSlide, MainMessage};
pub use order::{Order, OrderDetail, OrderItem, OrderWithCustomer};
pub use pagination::{Page, PageParams, Pagination};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
