pub mod backfill;
pub mod r#do;
pub mod routine;
pub mod skip;
pub mod timeline;
