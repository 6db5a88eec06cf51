//! Numeric replies the client reacts to.

use std::fmt;

/// A three-digit server numeric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Response(pub u16);

#[allow(missing_docs)]
impl Response {
    pub const RPL_WELCOME: Response = Response(1);
    pub const ERR_ERRONEUSNICKNAME: Response = Response(432);
    pub const ERR_NICKNAMEINUSE: Response = Response(433);
    pub const ERR_NICKCOLLISION: Response = Response(436);
    pub const ERR_UNAVAILRESOURCE: Response = Response(437);

    /// Numeric value.
    pub fn code(self) -> u16 {
        self.0
    }

    /// True for the numerics that reject the nick we registered with.
    pub fn is_nick_rejection(self) -> bool {
        matches!(
            self,
            Self::ERR_ERRONEUSNICKNAME
                | Self::ERR_NICKNAMEINUSE
                | Self::ERR_NICKCOLLISION
                | Self::ERR_UNAVAILRESOURCE
        )
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}
