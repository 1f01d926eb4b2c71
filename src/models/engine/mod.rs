pub mod constants;
pub mod hit_window;

pub use constants::*;
pub use hit_window::HitWindow;
