use std::borrow::Cow;

use crate::IndexSet;
use crate::ir::LabelId;

/// Labels of a single method body, keyed by name.
///
/// A label is created by whichever of its labeled statement or a jump to it is lowered first,
/// every later lookup returns the same id.
#[derive(Debug, Default)]
pub(super) struct LabelTable<'ctx> {
    names: IndexSet<Cow<'ctx, str>>,
}

impl<'ctx> LabelTable<'ctx> {
    pub fn get_or_create(&mut self, name: &Cow<'ctx, str>) -> LabelId {
        let index = match self.names.get_index_of(name) {
            Some(index) => index,
            None => self.names.insert_full(name.clone()).0,
        };
        LabelId::new(u16::try_from(index).expect("label count should fit in u16"))
    }

    pub fn into_names(self) -> Vec<Cow<'ctx, str>> {
        self.names.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn labels_are_shared_by_name() {
        let mut table = LabelTable::default();
        let outer = table.get_or_create(&"outer".into());
        let inner = table.get_or_create(&"inner".into());
        let again = table.get_or_create(&Cow::Owned("outer".to_owned()));

        assert_eq!(outer, again);
        assert_ne!(outer, inner);
        assert_eq!(table.into_names(), ["outer", "inner"]);
    }
}
