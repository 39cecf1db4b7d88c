pub mod aggregation;
pub mod forward_pass;
pub mod precedence;

pub use forward_pass::ForwardPass;
