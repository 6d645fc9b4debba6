pub mod math;
pub mod observer;
