//! Derived views over a built [`Waterfall`](crate::model::Waterfall).

pub mod critical_path;
pub mod trace_tree;
