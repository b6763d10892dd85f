mod cache;
mod find;

pub use cache::{cmd_clean, cmd_clear, cmd_links, cmd_lookup};
pub use find::{cmd_batch, cmd_find};
