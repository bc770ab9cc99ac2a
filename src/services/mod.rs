pub mod file_service;
pub mod filter_service;
pub mod indexing_service;
pub mod metadata_service;
pub mod navigation_service;
pub mod path_resolver;
pub mod preview_service;
pub mod search_service;
pub mod watch_service;
