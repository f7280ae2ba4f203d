pub mod feed_handlers;
pub mod scrape_handlers;
