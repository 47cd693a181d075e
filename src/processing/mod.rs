pub mod align;
pub mod filter;
pub mod metadata;
