//! Page tools for the sleuth agent: scraper, fetcher, parser and summarize.

pub mod fetcher;
pub mod html;
pub mod page;
pub mod page_scraper;
pub mod parser;
pub mod summarize;

pub use fetcher::{FetcherArgs, FetcherTool};
#[cfg(feature = "http")]
pub use page::HttpPageFetcher;
pub use page::{normalize_url, FetchedPage, PageFetcher};
pub use page_scraper::{ScraperArgs, ScraperTool};
pub use parser::{ParseMode, ParserArgs, ParserTool};
pub use summarize::{SummarizeArgs, SummarizeTool};
