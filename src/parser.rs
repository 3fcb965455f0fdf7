//! ==============================================================================
//! parser.rs - `key=value` line decoder
//! ==============================================================================
//!
//! purpose:
//!     turns the station's cgiLastData body into a string map.
//!
//! format:
//!     one pair per line. only the first segment after the separator is kept,
//!     so `a=b=c` maps `a` to `b`. lines without a separator are ignored.
//!
//! ```text
//!     cwinfo=Serial: 2058, FW: 5.89
//!     clouds=-18.500000
//!     cloudsSafe=1
//! ```
//!
//! relationships:
//!     - used by: poller.rs (fetch cycle)
//!     - feeds: snapshot.rs (commit)
//!
//! ==============================================================================

use std::collections::HashMap;

use crate::error::{DeviceError, Result};

/// Separator used by the station between key and value.
pub const FIELD_SEPARATOR: char = '=';

/// Raw decoded fields of one response. Lives for a single fetch cycle.
pub type FieldMap = HashMap<String, String>;

/// Split `text` into lines and each line into a key and its first value segment.
///
/// ```
/// use cloudwatcher::parser::{parse_fields, FIELD_SEPARATOR};
///
/// let fields = parse_fields("cloudsSafe=1\r\nnoise\na=b=c\n", FIELD_SEPARATOR)?;
/// assert_eq!(fields["cloudsSafe"], "1");
/// assert_eq!(fields["a"], "b");
/// assert!(!fields.contains_key("noise"));
/// # Ok::<(), cloudwatcher::DeviceError>(())
/// ```
pub fn parse_fields(text: &str, separator: char) -> Result<FieldMap> {
    if text.is_empty() {
        return Err(DeviceError::ParseFailed);
    }

    let mut fields = FieldMap::new();
    for line in text.lines() {
        let mut segments = line.split(separator);
        let key = segments.next().unwrap_or_default();
        // no separator on this line
        let Some(value) = segments.next() else {
            continue;
        };
        fields.insert(key.to_string(), value.to_string());
    }

    if fields.is_empty() {
        return Err(DeviceError::ParseFailed);
    }
    Ok(fields)
}
