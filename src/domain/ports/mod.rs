pub mod assignment_repository;
pub mod lti1p3;
pub mod lti_instance_repository;

pub use assignment_repository::*;
pub use lti1p3::*;
pub use lti_instance_repository::*;
