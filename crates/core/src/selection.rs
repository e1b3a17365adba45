/// Task ids marked for bulk action, kept in the order they were selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` when absent, remove it when present. Returns whether it is now selected.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.remove(id) {
            false
        } else {
            self.ids.push(id.to_string());
            true
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|selected| selected == id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|selected| selected != id);
        self.ids.len() != before
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(vec![])]
    #[case(vec!["a"])]
    #[case(vec!["b", "a", "c"])]
    fn double_toggle_restores_membership(#[case] initial: Vec<&str>) {
        let mut selection = Selection::new();
        for id in initial {
            selection.toggle(id);
        }
        let was_selected = selection.contains("a");

        selection.toggle("a");
        assert_ne!(selection.contains("a"), was_selected);
        selection.toggle("a");
        assert_eq!(selection.contains("a"), was_selected);
    }

    #[test]
    fn keeps_selection_order_and_clears() {
        let mut selection = Selection::new();
        assert!(selection.toggle("t2"));
        assert!(selection.toggle("t1"));
        assert_eq!(selection.ids().to_vec(), vec!["t2", "t1"]);
        assert_eq!(selection.len(), 2);

        assert!(!selection.remove("missing"));
        selection.clear();
        assert!(selection.is_empty());
    }
}
