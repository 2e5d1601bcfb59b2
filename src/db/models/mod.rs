//! Database models, one file per table group, re-exported at `crate::db::models`.

pub mod admin;
pub mod member;
pub mod shift;

pub use self::admin::*;
pub use self::member::*;
pub use self::shift::*;
