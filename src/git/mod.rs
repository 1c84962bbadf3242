pub mod command;
pub mod history_provider;
pub mod log_parser;

pub use command::GitCommand;
pub use history_provider::GitHistoryProvider;
