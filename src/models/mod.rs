//! Klocwork API model types.

mod build;
mod issue;
mod metric;
mod module;
mod project;
mod user;
mod view;

pub use build::*;
pub use issue::*;
pub use metric::*;
pub use module::*;
pub use project::*;
pub use user::*;
pub use view::*;

use chrono::{DateTime, Local, Utc};

/// `ctime(3)` layout used for the human-readable `created` fields.
pub const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Format an epoch-millisecond timestamp as local time, dropping sub-second precision.
pub fn format_epoch_millis(epoch_ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|utc| utc.with_timezone(&Local).format(CTIME_FORMAT).to_string())
}

fn created_from_millis(field: &str, epoch_ms: i64) -> serde_json::Result<String> {
    use serde::de::Error as _;
    format_epoch_millis(epoch_ms).ok_or_else(|| {
        serde_json::Error::custom(format!("`{field}` value {epoch_ms} is out of range"))
    })
}

/// Anything that can stand in for a view, build or module name in a query.
///
/// Lets callers pass either `"critical"` or an already fetched [`View`].
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for str {
    fn name(&self) -> &str {
        self
    }
}

impl Named for String {
    fn name(&self) -> &str {
        self
    }
}

impl<T: Named + ?Sized> Named for &T {
    fn name(&self) -> &str {
        (**self).name()
    }
}
