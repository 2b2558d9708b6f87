//! MiMC hash and Merkle aggregation inside a circuit

use crate::builder::{CircuitBuilder, Variable};
use crate::hashing::mimc_constants;

fn pow5<B: CircuitBuilder>(b: &mut B, x: Variable) -> Variable {
    let x2 = b.mul(x, x);
    let x4 = b.mul(x2, x2);
    b.mul(x4, x)
}

fn encrypt<B: CircuitBuilder>(b: &mut B, message: Variable, key: Variable) -> Variable {
    let mut x = message;
    for c in mimc_constants() {
        let t = b.add(x, key);
        let t = b.add_const(t, *c);
        x = pow5(b, t);
    }
    b.add(x, key)
}

/// Same function as [`crate::hashing::mimc_hash`].
pub fn mimc_hash<B: CircuitBuilder>(b: &mut B, elements: &[Variable]) -> Variable {
    let mut h = b.zero();
    for m in elements {
        let e = encrypt(b, *m, h);
        let t = b.add(e, h);
        h = b.add(t, *m);
    }
    h
}

/// Same function as [`crate::hashing::merkle_root`].
pub fn merkle_root<B: CircuitBuilder>(b: &mut B, leaves: &[Variable]) -> Variable {
    assert!(
        leaves.len().is_power_of_two(),
        "merkle tree needs a power-of-two leaf count, got {}",
        leaves.len()
    );
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| mimc_hash(b, &[pair[0], pair[1]]))
            .collect();
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Fr;
    use crate::hashing;
    use crate::solver::Solver;

    #[test]
    fn test_mimc_matches_native() {
        let inputs = [Fr::from(3u64), -Fr::ONE, Fr::from(1u64 << 40)];
        let mut s = Solver::new();
        let vars: Vec<Variable> = inputs.iter().map(|v| s.secret_input(*v)).collect();
        let h = mimc_hash(&mut s, &vars);
        assert_eq!(s.value(h), Some(hashing::mimc_hash(&inputs)));
    }

    #[test]
    fn test_merkle_matches_native() {
        let leaves: Vec<Fr> = (10..18u64).map(Fr::from).collect();
        let mut s = Solver::new();
        let vars: Vec<Variable> = leaves.iter().map(|v| s.secret_input(*v)).collect();
        let root = merkle_root(&mut s, &vars);
        assert_eq!(s.value(root), Some(hashing::merkle_root(&leaves)));
        assert!(s.is_satisfied());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::field::Fr;
    use crate::hashing;
    use crate::solver::Solver;
    use crate::types::U256;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_mimc_gadget_agrees(raw in proptest::collection::vec(any::<[u64; 4]>(), 0..4)) {
            let inputs: Vec<Fr> = raw
                .into_iter()
                .map(|limbs| Fr::from_u256_reduced(U256::from_limbs(limbs)))
                .collect();
            let mut s = Solver::new();
            let vars: Vec<Variable> = inputs.iter().map(|v| s.secret_input(*v)).collect();
            let h = mimc_hash(&mut s, &vars);
            prop_assert_eq!(s.value(h), Some(hashing::mimc_hash(&inputs)));
        }
    }
}
