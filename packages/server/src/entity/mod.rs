pub mod metadata;
pub mod sample;
pub mod sample_like;
pub mod sample_tag;
pub mod source;
pub mod tag;
pub mod tag_category;
pub mod user;
