/// Smallest non-negative integer missing from `sorted`, which must be
/// ascending without duplicates.
pub fn allocate(sorted: &[u32]) -> u32 {
    for (index, &value) in sorted.iter().enumerate() {
        if value != index as u32 {
            return index as u32;
        }
    }
    sorted.last().map_or(0, |last| last + 1)
}

/// Set of media-input layers in use by live screens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layers {
    in_use: Vec<u32>,
}

impl Layers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer: u32) {
        if let Err(pos) = self.in_use.binary_search(&layer) {
            self.in_use.insert(pos, layer);
        }
    }

    pub fn remove(&mut self, layer: u32) -> bool {
        match self.in_use.binary_search(&layer) {
            Ok(pos) => {
                self.in_use.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn next_free(&self) -> u32 {
        allocate(&self.in_use)
    }

    /// Allocates the next free layer and marks it used.
    pub fn take(&mut self) -> u32 {
        let layer = self.next_free();
        self.insert(layer);
        layer
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.in_use
    }
}

impl FromIterator<u32> for Layers {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut in_use: Vec<u32> = iter.into_iter().collect();
        in_use.sort_unstable();
        in_use.dedup();
        Self { in_use }
    }
}
