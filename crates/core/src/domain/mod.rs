pub mod deal;
pub mod product;
pub mod profile;
pub mod purchase;
