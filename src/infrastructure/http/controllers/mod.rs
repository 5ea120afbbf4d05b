pub mod bulk;
pub mod instances;
pub mod launch;
pub mod outcome;
