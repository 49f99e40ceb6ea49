use std::cell::Cell;
use std::fmt;

/// Adapts a formatting closure into a [`fmt::Display`] value.
#[derive(Debug, Clone)]
pub struct DisplayFn<F>(F);

impl<F> DisplayFn<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> fmt::Display for DisplayFn<F>
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0(f)
    }
}

/// Displays the items separated by `sep`. The iterator is consumed on the first use, any later
/// use renders nothing.
pub fn sep_by<I>(iter: I, sep: &str) -> impl fmt::Display + use<'_, I>
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    let iter = Cell::new(Some(iter));
    DisplayFn::new(move |f: &mut fmt::Formatter<'_>| {
        let Some(iter) = iter.take() else {
            return Ok(());
        };
        iter.into_iter().enumerate().try_for_each(|(i, item)| {
            if i > 0 {
                f.write_str(sep)?;
            }
            write!(f, "{item}")
        })
    })
}

/// Two spaces per nesting level.
pub fn indent(level: usize) -> impl fmt::Display {
    DisplayFn::new(move |f: &mut fmt::Formatter<'_>| write!(f, "{:1$}", "", level * 2))
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn separated_items() {
        assert_eq!(sep_by(["a", "b", "c"], ", ").to_string(), "a, b, c");
        assert_eq!(sep_by(Vec::<u8>::new(), ", ").to_string(), "");
        assert_eq!(format!("{}|", indent(2)), "    |");
    }
}
