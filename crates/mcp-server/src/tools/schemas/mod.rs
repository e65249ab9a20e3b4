pub(crate) mod analyze_diff;
pub(crate) mod find;
pub(crate) mod index;
pub(crate) mod module_structure;
pub(crate) mod search;
pub(crate) mod trace;
