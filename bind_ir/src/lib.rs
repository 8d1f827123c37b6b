pub mod error;
pub mod member;
pub mod ty;
pub mod unit;
pub mod validate;

pub use self::error::*;
pub use self::member::*;
pub use self::ty::*;
pub use self::unit::*;
pub use self::validate::validate;
