pub mod post_detail;
pub mod posts;
