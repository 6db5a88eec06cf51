//! Channel name utilities.

/// Extension trait for checking if a string is an IRC channel name.
pub trait ChannelExt {
    /// Check if this string names a channel rather than a nick.
    ///
    /// Channel names start with `#` or `&` and contain no space, comma,
    /// BEL or other control characters.
    fn is_channel_name(&self) -> bool;
}

impl ChannelExt for str {
    fn is_channel_name(&self) -> bool {
        let mut chars = self.chars();

        match chars.next() {
            Some('#') | Some('&') => {}
            _ => return false,
        }

        chars.all(|c| c != ' ' && c != ',' && !c.is_control())
    }
}

impl ChannelExt for String {
    fn is_channel_name(&self) -> bool {
        self.as_str().is_channel_name()
    }
}
