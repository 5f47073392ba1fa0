pub mod clock;
pub mod deploy;
pub mod error;
pub mod logs;
pub mod product;
pub mod service;
pub mod traits;
pub mod trigger;

pub mod prelude {
    pub use super::deploy::*;
    pub use super::error::*;
    pub use super::logs::*;
    pub use super::product::*;
    pub use super::service::*;
    pub use super::traits::*;
    pub use super::trigger::*;
}
