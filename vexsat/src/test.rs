//! Formula generators for solver tests.
use proptest::{collection, prelude::*};

use vexsat_formula::{CnfFormula, Lit, Var};

/// Generate a satisfiable formula.
///
/// Plants a random full assignment and only emits clauses containing at least one literal the
/// planted assignment satisfies. The formula is satisfiable by construction, but the witness
/// literals are not marked in any way, so the solver still has to find a model on its own.
///
/// `vars` must produce at least 1.
pub fn sat_formula(
    vars: impl Strategy<Value = usize>,
    clause_count: impl Strategy<Value = usize>,
) -> impl Strategy<Value = CnfFormula> {
    (vars, clause_count).prop_flat_map(|(vars, clause_count)| {
        let planted = collection::vec(any::<bool>(), vars);

        // Each clause is one witness variable plus up to five filler literals of random polarity.
        let clauses = collection::vec(
            (0..vars, collection::vec((0..vars, any::<bool>()), 0..6)),
            clause_count,
        )
        .prop_shuffle();

        (planted, clauses).prop_map(|(planted, clauses)| {
            let mut formula = CnfFormula::new();
            formula.set_var_count(planted.len());

            for (witness, filler) in clauses {
                let mut clause = vec![Lit::new(Var::from_index(witness), planted[witness])];
                clause.extend(
                    filler
                        .into_iter()
                        .map(|(index, value)| Lit::new(Var::from_index(index), value)),
                );
                formula.add_clause(clause);
            }

            formula
        })
    })
}

/// Generate a shuffled pigeonhole formula, which is unsatisfiable.
///
/// One variable per pigeon and hole pair: each of `holes + 1` pigeons must sit in some hole, and
/// no two pigeons may share a hole. The clause order is randomized so the search does not always
/// encounter the constraints in the same sequence.
///
/// `holes` must produce at least 1.
pub fn pigeonhole_formula(
    holes: impl Strategy<Value = usize>,
) -> impl Strategy<Value = CnfFormula> {
    holes.prop_flat_map(|holes| {
        let pigeons = holes + 1;
        let sits_in =
            move |pigeon: usize, hole: usize| Lit::new(Var::from_index(pigeon * holes + hole), true);

        let mut clauses: Vec<Vec<Lit>> = vec![];

        for pigeon in 0..pigeons {
            clauses.push((0..holes).map(|hole| sits_in(pigeon, hole)).collect());
        }

        for hole in 0..holes {
            for pigeon_a in 0..pigeons {
                for pigeon_b in 0..pigeon_a {
                    clauses.push(vec![!sits_in(pigeon_a, hole), !sits_in(pigeon_b, hole)]);
                }
            }
        }

        Just(clauses).prop_shuffle().prop_map(CnfFormula::from)
    })
}
