use bon::bon;

/// Knobs that change what the lowering passes generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowerOptions {
    enable_assertions: bool,
    class_metadata: bool,
    max_suggestions: usize,
}

#[bon]
impl LowerOptions {
    #[builder(finish_fn = build)]
    pub fn new(
        #[builder(default)] enable_assertions: bool,
        #[builder(default = true)] class_metadata: bool,
        #[builder(default = 5)] max_suggestions: usize,
    ) -> Self {
        Self {
            enable_assertions,
            class_metadata,
            max_suggestions,
        }
    }

    /// The value returned by `Class.desiredAssertionStatus()`.
    #[inline]
    pub fn enable_assertions(&self) -> bool {
        self.enable_assertions
    }

    /// When disabled, `Class.isClassMetadataEnabled()` is implemented to return `false`.
    #[inline]
    pub fn class_metadata(&self) -> bool {
        self.class_metadata
    }

    /// The maximum number of candidates listed for an unresolved foreign reference.
    #[inline]
    pub fn max_suggestions(&self) -> usize {
        self.max_suggestions
    }
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn defaults() {
        let options = LowerOptions::default();
        assert!(!options.enable_assertions());
        assert!(options.class_metadata());
        assert_eq!(options.max_suggestions(), 5);
    }
}
