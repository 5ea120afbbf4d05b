pub mod configured_registration;
pub mod oidc_launch;

pub use configured_registration::*;
pub use oidc_launch::*;
