mod resolve_addresses;

pub use self::resolve_addresses::*;
pub use crate::error::Error;

type Result<T> = std::result::Result<T, Error>;
