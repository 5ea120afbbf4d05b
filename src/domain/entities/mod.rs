pub mod assignment;
pub mod bulk;
pub mod line_item;
pub mod lti_instance;
pub mod registration;
pub mod user;

pub use assignment::*;
pub use bulk::*;
pub use line_item::*;
pub use lti_instance::*;
pub use registration::*;
pub use user::*;
