//! Portal rendering
//!
//! ```text
//! #Portal<
//!      orange <=> blue
//!   [1, 2, 3] <=> []
//! >
//! ```
//!
//! The left door is shown in insertion order (its contents reversed), the
//! right door as stored. Both left columns are right-aligned to the wider
//! of the two.

use crate::door::Item;
use crate::error::Result;
use crate::portal::{Portal, PortalSnapshot};
use std::fmt;

/// Read both doors of `portal` and format them
pub async fn render<T: Item>(portal: &Portal<T>) -> Result<String> {
    Ok(portal.snapshot().await?.to_string())
}

impl<T: fmt::Debug> fmt::Display for PortalSnapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let left_label = self.left_color.as_str();
        let right_label = self.right_color.as_str();
        let left_data = format!("{:?}", self.left.iter().rev().collect::<Vec<_>>());
        let right_data = format!("{:?}", self.right);

        let width = left_label.chars().count().max(left_data.chars().count());

        writeln!(f, "#Portal<")?;
        writeln!(f, "  {:>width$} <=> {}", left_label, right_label, width = width)?;
        writeln!(f, "  {:>width$} <=> {}", left_data, right_data, width = width)?;
        write!(f, ">")
    }
}
