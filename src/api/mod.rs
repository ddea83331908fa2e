//! Provider transports. Each client turns a URL into a parsed JSON document
//! or `None`; a failed fetch is never a hard abort, the drivers skip the
//! entity and continue.

pub mod fotmob;
pub mod scoresway;
pub mod sofascore;

/// Courtesy throttle applied after every fetch. Constant, not adaptive.
pub const REQUEST_DELAY_SECS: u64 = 3;
