//! Ternary clauses.

use satcore_formula::Lit;

/// Ternary clauses.
///
/// Stored as per-literal occurrence lists, similar to [`BinaryClauses`](crate::binary::BinaryClauses)
/// but with two remaining literals per entry instead of one. Unlike the two-watched-literal scheme
/// used for longer clauses, every occurrence of a falsified literal rescans both remaining literals
/// of the clause, which is simple and always correct at the cost of not skipping already-satisfied
/// clauses as cheaply as a watch scheme would.
#[derive(Default)]
pub struct TernaryClauses {
    by_lit: Vec<Vec<[Lit; 2]>>,
    count: usize,
}

impl TernaryClauses {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.by_lit.resize(count * 2, vec![]);
    }

    /// Add a ternary clause.
    pub fn add_ternary_clause(&mut self, lits: [Lit; 3]) {
        for i in 0..3 {
            let mut rest = [Lit::from_code(0); 2];
            let mut k = 0;
            for (j, &lit) in lits.iter().enumerate() {
                if j != i {
                    rest[k] = lit;
                    k += 1;
                }
            }
            self.by_lit[(!lits[i]).code()].push(rest);
        }
        self.count += 1;
    }

    /// The pairs of remaining literals for all ternary clauses containing `!lit`.
    pub fn containing_negation(&self, lit: Lit) -> &[[Lit; 2]] {
        &self.by_lit[lit.code()]
    }

    /// Number of ternary clauses.
    pub fn count(&self) -> usize {
        self.count
    }
}
