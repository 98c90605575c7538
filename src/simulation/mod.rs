pub mod types;
pub mod reshaper;
