pub mod cli;
pub mod git;
pub mod infrastructure;
pub mod report;
pub mod scm;
