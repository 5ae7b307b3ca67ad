#[path = "../common/mod.rs"]
mod common;

mod dependency_order;
