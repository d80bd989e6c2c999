use super::phoneme::{PhonemeInventory, PhonemeSequence};
use super::probability_matrix::ClassProbabilityMatrix;

/// Greedy (best-path) CTC decoder.
///
/// Takes the arg-max class per frame, collapses consecutive repeats, then
/// drops the blank class. No beam search.
#[derive(Clone, Debug, Default)]
pub struct GreedyDecoder {
    inventory: PhonemeInventory,
}

impl GreedyDecoder {
    pub fn new(inventory: PhonemeInventory) -> Self {
        Self { inventory }
    }

    pub fn inventory(&self) -> &PhonemeInventory {
        &self.inventory
    }

    /// Arg-max class per frame. Ties go to the lowest class index.
    pub fn best_path(&self, matrix: &ClassProbabilityMatrix) -> Vec<usize> {
        matrix
            .view()
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (class, &score) in row.iter().enumerate().skip(1) {
                    if score > row[best] {
                        best = class;
                    }
                }
                best
            })
            .collect()
    }

    pub fn decode(&self, matrix: &ClassProbabilityMatrix) -> PhonemeSequence {
        let path = self.best_path(matrix);
        self.collapse(&path)
    }

    /// Decode each utterance of a batch independently.
    pub fn decode_batch(&self, batch: &[ClassProbabilityMatrix]) -> Vec<PhonemeSequence> {
        batch.iter().map(|m| self.decode(m)).collect()
    }

    /// Collapse repeats, then remove blanks, then map to symbols.
    pub fn collapse(&self, path: &[usize]) -> PhonemeSequence {
        let blank = self.inventory.blank_index();
        let mut collapsed: Vec<usize> = Vec::with_capacity(path.len());
        for &class in path {
            if collapsed.last() != Some(&class) {
                collapsed.push(class);
            }
        }
        collapsed
            .into_iter()
            .filter(|&class| class != blank)
            .filter_map(|class| self.inventory.symbol(class))
            .collect()
    }
}
