pub mod info;
pub mod search;
pub mod setup;
pub mod ui;
