use crate::ScreenId;

/// Handle to an entity that has to be recomputed when its upstream changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependent {
    Margin,
    Grid,
    Cell(u32),
    Screen(ScreenId),
}

/// Ordered dependents of one entity. Propagation walks them in
/// registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependents {
    order: Vec<Dependent>,
}

impl Dependents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering the same handle twice is a no-op.
    pub fn register(&mut self, dep: Dependent) {
        if !self.order.contains(&dep) {
            self.order.push(dep);
        }
    }

    pub fn unregister(&mut self, dep: Dependent) -> bool {
        let before = self.order.len();
        self.order.retain(|d| *d != dep);
        before != self.order.len()
    }

    pub fn retain(&mut self, keep: impl FnMut(&Dependent) -> bool) {
        self.order.retain(keep);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dependent> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// An entity whose derived values are a pure function of its own pixel
/// values plus the already-recomputed upstream.
pub trait Recompute {
    type Upstream: ?Sized;

    fn recompute(&mut self, upstream: &Self::Upstream);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_registration_order_without_duplicates() {
        let mut deps = Dependents::new();
        deps.register(Dependent::Cell(2));
        deps.register(Dependent::Screen(ScreenId(7)));
        deps.register(Dependent::Cell(1));
        deps.register(Dependent::Cell(2));

        let order: Vec<_> = deps.iter().copied().collect();
        assert_eq!(
            order,
            vec![
                Dependent::Cell(2),
                Dependent::Screen(ScreenId(7)),
                Dependent::Cell(1)
            ]
        );
    }

    #[test]
    fn unregister_reports_whether_anything_went() {
        let mut deps = Dependents::new();
        deps.register(Dependent::Grid);
        assert!(deps.unregister(Dependent::Grid));
        assert!(!deps.unregister(Dependent::Grid));
        assert!(deps.is_empty());
    }
}
