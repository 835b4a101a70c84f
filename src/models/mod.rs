pub mod account;
pub mod application;
pub mod audit;
pub mod booking;
pub mod class;
pub mod organisation;

pub use account::*;
pub use application::*;
pub use audit::*;
pub use booking::*;
pub use class::*;
pub use organisation::*;
