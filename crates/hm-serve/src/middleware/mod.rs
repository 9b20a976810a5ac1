pub mod correlation;
pub mod identity;
