pub mod header;
pub mod utils;
