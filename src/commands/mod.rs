pub mod file_commands;
pub mod indexing_commands;
pub mod search_commands;
