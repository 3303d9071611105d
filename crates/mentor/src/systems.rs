pub mod practice;
mod system;

pub use system::System;
