#![allow(dead_code, unused_imports)]
pub mod lti_helpers;
pub mod test_db;

pub use lti_helpers::*;
pub use test_db::*;
