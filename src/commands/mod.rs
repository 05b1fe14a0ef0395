pub mod delete;
pub mod list;
pub mod run;
pub mod show;
pub mod trend;
