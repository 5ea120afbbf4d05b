pub mod assignment_lifecycle;
pub mod group_id_allocator;
pub mod instance_selector;

pub use group_id_allocator::generate_group_ids;
pub use instance_selector::{select, select_index, LoadBalancingStrategy};
