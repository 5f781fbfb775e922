// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.


use indenter::Indented;
use std::fmt::{self, Display, Formatter, Write};

/// Sets the indentation level of an indented formatter. Each level is four spaces.
pub fn set_indentation<'a, 'b>(
    indent: Indented<'a, Formatter<'b>>,
    level: usize,
) -> Indented<'a, Formatter<'b>> {
    match level {
        0 => indent.with_str(""),
        1 => indent.with_str("    "),
        2 => indent.with_str("        "),
        3 => indent.with_str("            "),
        _ => unimplemented!("indentation level not supported"),
    }
}

/// Writes the items separated by `", "`.
pub fn write_list<T: Display>(
    f: &mut impl Write,
    items: impl IntoIterator<Item = T>,
) -> fmt::Result {
    for (index, item) in items.into_iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Displays the items as a bracketed, comma separated list.
pub struct Bracketed<'a, T>(pub &'a [T]);

impl<T: Display> Display for Bracketed<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        write_list(f, self.0)?;
        write!(f, "]")
    }
}
