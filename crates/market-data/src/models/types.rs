use std::borrow::Cow;

/// Source identifier - mostly static constants
pub type SourceId = Cow<'static, str>;

/// Symbol of the tracked asset as known by one source (e.g. "ripple", "XRPUSDT")
pub type SourceSymbol = String;
