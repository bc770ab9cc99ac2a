pub mod file_node;
pub mod search;
