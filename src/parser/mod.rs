//! Message loading: `.eml` bytes into the typed message tree.

pub mod eml;
